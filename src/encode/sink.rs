use crate::decode::Frame;
use crate::foundation::core::{FourCc, Fps, FrameIndex, FrameSize};
use crate::foundation::error::{TimewarpError, TimewarpResult};

/// Configuration provided to a [`FrameSink`] before the first frame.
#[derive(Debug, Clone, PartialEq)]
pub struct SinkConfig {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Output frames-per-second.
    pub fps: Fps,
    /// Requested codec.
    pub codec: FourCc,
}

impl SinkConfig {
    pub fn size(&self) -> FrameSize {
        FrameSize::new(self.width, self.height)
    }
}

/// Destination for emitted frames.
///
/// Ordering contract: `push_frame` is called in strictly increasing `FrameIndex` order between
/// one `begin` and one `end`. `begin` failures are open errors; `push_frame` and `end` failures
/// are write failures.
pub trait FrameSink: Send {
    /// Called once before any frames are pushed.
    fn begin(&mut self, cfg: SinkConfig) -> TimewarpResult<()>;
    /// Push one frame.
    fn push_frame(&mut self, idx: FrameIndex, frame: &Frame) -> TimewarpResult<()>;
    /// Called once after the last frame is pushed, including after a failed push.
    fn end(&mut self) -> TimewarpResult<()>;
}

/// In-memory sink for tests and debugging.
#[derive(Debug, Default)]
pub struct InMemorySink {
    cfg: Option<SinkConfig>,
    ended: bool,
    /// Frames in emission order.
    pub(crate) frames: Vec<(FrameIndex, Frame)>,
}

impl InMemorySink {
    /// Create a new in-memory sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the sink configuration captured in `begin`, if any.
    pub fn config(&self) -> Option<SinkConfig> {
        self.cfg.clone()
    }

    /// Borrow the captured frames.
    pub fn frames(&self) -> &[(FrameIndex, Frame)] {
        &self.frames
    }

    /// `true` once `end` has been called.
    pub fn is_ended(&self) -> bool {
        self.ended
    }
}

impl FrameSink for InMemorySink {
    fn begin(&mut self, cfg: SinkConfig) -> TimewarpResult<()> {
        if cfg.size().is_empty() {
            return Err(TimewarpError::open("sink width/height must be non-zero"));
        }
        self.cfg = Some(cfg);
        self.frames.clear();
        self.ended = false;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &Frame) -> TimewarpResult<()> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| TimewarpError::write_failure("in-memory sink not started"))?;
        if frame.dimensions() != (cfg.width, cfg.height) {
            return Err(TimewarpError::write_failure(format!(
                "frame size mismatch: got {}x{}, expected {}",
                frame.width(),
                frame.height(),
                cfg.size()
            )));
        }
        self.frames.push((idx, frame.clone()));
        Ok(())
    }

    fn end(&mut self) -> TimewarpResult<()> {
        self.ended = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(w: u32, h: u32) -> SinkConfig {
        SinkConfig {
            width: w,
            height: h,
            fps: Fps::default(),
            codec: FourCc::default(),
        }
    }

    #[test]
    fn in_memory_sink_captures_frames_in_order() {
        let mut sink = InMemorySink::new();
        sink.begin(cfg(2, 2)).unwrap();
        for i in 0..3 {
            let f = Frame::from_pixel(2, 2, image::Rgb([i as u8, 0, 0]));
            sink.push_frame(FrameIndex(i), &f).unwrap();
        }
        sink.end().unwrap();
        assert!(sink.is_ended());
        let idx: Vec<u64> = sink.frames().iter().map(|(i, _)| i.0).collect();
        assert_eq!(idx, vec![0, 1, 2]);
    }

    #[test]
    fn in_memory_sink_rejects_wrong_size_and_unstarted_push() {
        let mut sink = InMemorySink::new();
        let f = Frame::new(4, 4);
        assert!(sink.push_frame(FrameIndex(0), &f).is_err());
        assert!(sink.begin(cfg(0, 2)).is_err());
        sink.begin(cfg(2, 2)).unwrap();
        let err = sink.push_frame(FrameIndex(0), &f).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::WriteFailure);
    }
}
