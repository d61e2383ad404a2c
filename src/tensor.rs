use image::imageops;
use ndarray::{Array4, ArrayD, ArrayView3, Axis, Ix4, Slice};

use crate::decode::{Frame, FrameSource, Frames};
use crate::foundation::core::FrameSize;
use crate::foundation::error::{TimewarpError, TimewarpResult};
use crate::scale::{Interpolation, ScaleFactor, rescale};

/// Channels per pixel (RGB).
pub const CHANNELS: usize = 3;

/// Upper bound on the zero-filled store created from a declared frame count.
///
/// Declared counts come from container metadata and can be wildly off; past this size the
/// buffer grows on demand instead.
pub const MAX_PREALLOC_BYTES: usize = 1 << 31;

/// Dense `[T, H, W, C]` frame store, `u8` elements, standard (row-major) layout.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameTensor {
    data: Array4<u8>,
}

impl FrameTensor {
    pub fn from_array(data: Array4<u8>) -> Self {
        let data = if data.is_standard_layout() {
            data
        } else {
            data.as_standard_layout().into_owned()
        };
        Self { data }
    }

    /// Accept a dynamically-shaped array; anything other than 4-D is a format error.
    pub fn from_dyn(data: ArrayD<u8>) -> TimewarpResult<Self> {
        let ndim = data.ndim();
        let data = data.into_dimensionality::<Ix4>().map_err(|_| {
            TimewarpError::format(format!("expected a 4-D tensor, got {ndim} dimension(s)"))
        })?;
        Ok(Self::from_array(data))
    }

    /// `(T, H, W, C)`.
    pub fn shape(&self) -> (usize, usize, usize, usize) {
        self.data.dim()
    }

    pub fn len_frames(&self) -> usize {
        self.data.len_of(Axis(0))
    }

    pub fn frame_size(&self) -> FrameSize {
        let (_, h, w, _) = self.shape();
        FrameSize::new(w as u32, h as u32)
    }

    pub fn as_array(&self) -> &Array4<u8> {
        &self.data
    }

    /// Copy frame `idx` out as an image. `None` when out of range or not 3-channel.
    pub fn frame(&self, idx: usize) -> Option<Frame> {
        let (t, h, w, c) = self.shape();
        if idx >= t || c != CHANNELS {
            return None;
        }
        let view = self.data.index_axis(Axis(0), idx);
        let raw: Vec<u8> = match view.as_slice() {
            Some(slice) => slice.to_vec(),
            None => view.iter().copied().collect(),
        };
        Frame::from_raw(w as u32, h as u32, raw)
    }

    /// Frames in temporal order.
    pub fn iter_frames(&self) -> impl Iterator<Item = Frame> + '_ {
        (0..self.len_frames()).filter_map(|i| self.frame(i))
    }

    /// A well-formed tensor has three channels and no empty axis.
    pub fn validate(&self) -> TimewarpResult<()> {
        let (t, h, w, c) = self.shape();
        if c != CHANNELS {
            return Err(TimewarpError::format(format!(
                "expected {CHANNELS} channels, got {c}"
            )));
        }
        if t == 0 || h == 0 || w == 0 {
            return Err(TimewarpError::format(format!(
                "tensor has an empty axis: ({t}, {h}, {w}, {c})"
            )));
        }
        Ok(())
    }
}

/// Growable ingestion store for the warp workflow.
///
/// Owned by the ingestion loop and consumed by [`TensorBuffer::finalize`].
#[derive(Debug)]
pub struct TensorBuffer {
    data: Array4<u8>,
}

impl TensorBuffer {
    /// Zero-filled store for `estimated` frames of `height x width` RGB.
    pub fn preallocate(estimated: usize, height: usize, width: usize) -> Self {
        Self {
            data: Array4::zeros((estimated, height, width, CHANNELS)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.data.len_of(Axis(0))
    }

    /// Per-frame `(H, W, C)` every appended frame must match.
    pub fn frame_shape(&self) -> (usize, usize, usize) {
        let (_, h, w, c) = self.data.dim();
        (h, w, c)
    }

    /// Store `frame` at `index`, growing the store when `index` is past capacity.
    ///
    /// A frame of the wrong geometry is rejected with [`TimewarpError::ShapeMismatch`] and leaves
    /// the store untouched.
    pub fn append(&mut self, frame: &Frame, index: usize) -> TimewarpResult<()> {
        let expected = self.frame_shape();
        let got = (frame.height() as usize, frame.width() as usize, CHANNELS);
        if got != expected {
            return Err(TimewarpError::ShapeMismatch { got, expected });
        }

        if index >= self.capacity() {
            self.grow(index + 1);
        }

        let src = ArrayView3::from_shape(got, frame.as_raw().as_slice())
            .map_err(|e| TimewarpError::Other(anyhow::Error::new(e)))?;
        self.data.index_axis_mut(Axis(0), index).assign(&src);
        Ok(())
    }

    fn grow(&mut self, min_frames: usize) {
        let cap = self.capacity();
        let new_cap = min_frames.max(cap * 2);
        let (h, w, c) = self.frame_shape();
        let mut grown = Array4::<u8>::zeros((new_cap, h, w, c));
        grown
            .slice_axis_mut(Axis(0), Slice::from(..cap))
            .assign(&self.data);
        tracing::debug!(from = cap, to = new_cap, "grew frame buffer");
        self.data = grown;
    }

    /// Copy of the frame stored at `index`.
    pub fn get(&self, index: usize) -> Option<Frame> {
        if index >= self.capacity() {
            return None;
        }
        let (h, w, _) = self.frame_shape();
        let raw: Vec<u8> = self.data.index_axis(Axis(0), index).iter().copied().collect();
        Frame::from_raw(w as u32, h as u32, raw)
    }

    /// Trim to the first `true_count` frames and hand the result off.
    pub fn finalize(self, true_count: usize) -> FrameTensor {
        let n = true_count.min(self.capacity());
        if n == self.capacity() {
            return FrameTensor::from_array(self.data);
        }
        FrameTensor::from_array(self.data.slice_axis(Axis(0), Slice::from(..n)).to_owned())
    }
}

/// Frame counts from one ingestion pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Frame count the container declared.
    pub expected: u64,
    /// Frames the decoder produced.
    pub read: u64,
    /// Frames kept in the tensor.
    pub stored: u64,
    /// Frames dropped for a shape mismatch.
    pub skipped: u64,
}

/// Read every frame of `source` into a tensor.
///
/// Frames are resized to the even target when `read_scale` is not identity; otherwise an odd
/// trailing row/column is cropped. Shape mismatches skip the frame and keep going.
#[tracing::instrument(skip(source), fields(path = %source.info().path.display()))]
pub fn ingest<S: FrameSource + ?Sized>(
    source: &mut S,
    read_scale: ScaleFactor,
) -> (FrameTensor, IngestReport) {
    let info = source.info().clone();
    let target = read_scale.apply(info.size());
    let resize = !read_scale.is_identity();

    let mut report = IngestReport {
        expected: info.expected_frames,
        ..IngestReport::default()
    };
    let frame_bytes = (target.width as usize * target.height as usize * CHANNELS).max(1);
    let prealloc = (info.expected_frames as usize).min(MAX_PREALLOC_BYTES / frame_bytes);
    let mut buffer =
        TensorBuffer::preallocate(prealloc, target.height as usize, target.width as usize);

    for frame in Frames::new(&mut *source) {
        report.read += 1;
        let frame = conform(frame, target, resize);
        match buffer.append(&frame, report.stored as usize) {
            Ok(()) => report.stored += 1,
            Err(e) => {
                tracing::warn!(frame = report.read - 1, error = %e, "skipping frame");
                report.skipped += 1;
            }
        }
    }
    source.close();

    let tensor = buffer.finalize(report.stored as usize);
    tracing::info!(
        expected = report.expected,
        read = report.read,
        stored = report.stored,
        skipped = report.skipped,
        shape = ?tensor.shape(),
        "read frames"
    );
    (tensor, report)
}

fn conform(frame: Frame, target: FrameSize, resize: bool) -> Frame {
    if resize {
        return rescale(frame, target, Interpolation::Linear);
    }
    let (w, h) = frame.dimensions();
    if (w, h) != (target.width, target.height)
        && w & !1 == target.width
        && h & !1 == target.height
    {
        return imageops::crop_imm(&frame, 0, 0, target.width, target.height).to_image();
    }
    frame
}
