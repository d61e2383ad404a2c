use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::foundation::core::{FourCc, Fps, FrameRange, FrameSize};
use crate::foundation::error::{TimewarpError, TimewarpResult};
use crate::scale::ScaleFactor;

fn default_axis() -> String {
    "x".to_string()
}

fn default_preview_path() -> PathBuf {
    PathBuf::from("preview.png")
}

fn default_true() -> bool {
    true
}

/// Twice as wide, same height.
fn default_out_scale() -> ScaleFactor {
    ScaleFactor { x: 2.0, y: 1.0 }
}

fn default_scale() -> f64 {
    1.0
}

/// Settings for one time-warp run.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WarpConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    #[serde(default)]
    pub codec: FourCc,
    /// Spatial axis to swap with time: `x` or `y`. Anything else leaves frames unwarped.
    #[serde(default = "default_axis")]
    pub axis: String,
    /// Applied to the warped frames on output.
    #[serde(default = "default_out_scale")]
    pub out_scale: ScaleFactor,
    /// Applied to source frames while reading.
    #[serde(default)]
    pub read_scale: ScaleFactor,
    #[serde(default)]
    pub fps: Fps,
    #[serde(default)]
    pub preview: bool,
    #[serde(default = "default_preview_path")]
    pub preview_path: PathBuf,
    #[serde(default = "default_true")]
    pub write: bool,
    #[serde(default = "default_true")]
    pub overwrite: bool,
}

impl WarpConfig {
    /// Config with the usual defaults: H264, axis `x`, 2x horizontal output scale, 30 fps.
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            codec: FourCc::default(),
            axis: default_axis(),
            out_scale: default_out_scale(),
            read_scale: ScaleFactor::identity(),
            fps: Fps::default(),
            preview: false,
            preview_path: default_preview_path(),
            write: true,
            overwrite: true,
        }
    }

    pub fn validate(&self) -> TimewarpResult<()> {
        if self.input.as_os_str().is_empty() {
            return Err(TimewarpError::validation("input path must not be empty"));
        }
        if self.write && self.output.as_os_str().is_empty() {
            return Err(TimewarpError::validation("output path must not be empty"));
        }
        ScaleFactor::new(self.out_scale.x, self.out_scale.y)?;
        ScaleFactor::new(self.read_scale.x, self.read_scale.y)?;
        Fps::new(self.fps.num, self.fps.den)?;
        Ok(())
    }
}

/// Settings for one cut run.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CutConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    #[serde(default)]
    pub codec: FourCc,
    /// Explicit output width; used only together with `height`.
    #[serde(default)]
    pub width: Option<u32>,
    /// Explicit output height; used only together with `width`.
    #[serde(default)]
    pub height: Option<u32>,
    /// Uniform scale applied to the source size when no explicit size is given.
    #[serde(default = "default_scale")]
    pub scale: f64,
    #[serde(default)]
    pub fps: Fps,
    #[serde(default)]
    pub range: FrameRange,
    /// Only report input metadata; open no output.
    #[serde(default)]
    pub stats_only: bool,
    #[serde(default = "default_true")]
    pub overwrite: bool,
}

impl CutConfig {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            codec: FourCc::default(),
            width: None,
            height: None,
            scale: default_scale(),
            fps: Fps::default(),
            range: FrameRange::unbounded(),
            stats_only: false,
            overwrite: true,
        }
    }

    pub fn validate(&self) -> TimewarpResult<()> {
        if self.input.as_os_str().is_empty() {
            return Err(TimewarpError::validation("input path must not be empty"));
        }
        if !self.stats_only && self.output.as_os_str().is_empty() {
            return Err(TimewarpError::validation("output path must not be empty"));
        }
        ScaleFactor::uniform(self.scale)?;
        Fps::new(self.fps.num, self.fps.den)?;
        FrameRange::new(self.range.first, self.range.last)?;
        if self.width == Some(0) || self.height == Some(0) {
            return Err(TimewarpError::validation("explicit size must be non-zero"));
        }
        Ok(())
    }

    /// Explicit size when both axes are given, otherwise the scaled source size; always even.
    pub fn target_size(&self, source: FrameSize) -> FrameSize {
        match (self.width, self.height) {
            (Some(w), Some(h)) => FrameSize::new(w, h).even(),
            _ => ScaleFactor {
                x: self.scale,
                y: self.scale,
            }
            .apply(source),
        }
    }
}

/// Load a JSON config file.
pub fn load_json<T: serde::de::DeserializeOwned>(path: &Path) -> TimewarpResult<T> {
    let f = std::fs::File::open(path)
        .with_context(|| format!("open config '{}'", path.display()))?;
    let cfg = serde_json::from_reader(std::io::BufReader::new(f))
        .with_context(|| format!("parse config '{}'", path.display()))?;
    Ok(cfg)
}
