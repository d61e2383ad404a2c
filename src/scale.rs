use image::imageops::{self, FilterType};

use crate::decode::Frame;
use crate::foundation::core::FrameSize;
use crate::foundation::error::{TimewarpError, TimewarpResult};

/// Independent positive multipliers for width and height.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ScaleFactor {
    pub x: f64,
    pub y: f64,
}

impl ScaleFactor {
    pub fn new(x: f64, y: f64) -> TimewarpResult<Self> {
        for (name, v) in [("x", x), ("y", y)] {
            if !v.is_finite() || v <= 0.0 {
                return Err(TimewarpError::validation(format!(
                    "scale {name} must be a positive finite number, got {v}"
                )));
            }
        }
        Ok(Self { x, y })
    }

    pub fn uniform(s: f64) -> TimewarpResult<Self> {
        Self::new(s, s)
    }

    pub fn identity() -> Self {
        Self { x: 1.0, y: 1.0 }
    }

    pub fn is_identity(self) -> bool {
        self.x == 1.0 && self.y == 1.0
    }

    /// Scale each axis independently (truncating), then round down to even.
    pub fn apply(self, size: FrameSize) -> FrameSize {
        FrameSize::new(
            (f64::from(size.width) * self.x) as u32,
            (f64::from(size.height) * self.y) as u32,
        )
        .even()
    }
}

impl Default for ScaleFactor {
    fn default() -> Self {
        Self::identity()
    }
}

/// Resampling used when a frame changes size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Interpolation {
    /// Box/area averaging; suited to downscaling.
    Area,
    /// Bilinear.
    Linear,
    /// Catmull-Rom cubic; suited to upscaling.
    Cubic,
}

/// Resize `frame` to `size`. Frames already at `size` are returned as-is.
pub fn rescale(frame: Frame, size: FrameSize, interp: Interpolation) -> Frame {
    if frame.width() == size.width && frame.height() == size.height {
        return frame;
    }
    match interp {
        Interpolation::Area => imageops::thumbnail(&frame, size.width, size.height),
        Interpolation::Linear => {
            imageops::resize(&frame, size.width, size.height, FilterType::Triangle)
        }
        Interpolation::Cubic => {
            imageops::resize(&frame, size.width, size.height, FilterType::CatmullRom)
        }
    }
}
