use std::path::PathBuf;

use crate::foundation::core::{FourCc, Fps, FrameSize, StreamState};

/// One decoded frame: packed RGB8, row-major.
pub type Frame = image::RgbImage;

/// Metadata read once when a source is opened.
///
/// `expected_frames` comes from container metadata and may be wrong in either direction.
#[derive(Clone, Debug)]
pub struct StreamInfo {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub fps: Fps,
    /// Packed codec tag; zero when the container does not carry one.
    pub fourcc: FourCc,
    /// Backend codec name (`h264`, `mjpeg`, ...).
    pub codec_name: String,
    pub expected_frames: u64,
}

impl StreamInfo {
    pub fn size(&self) -> FrameSize {
        FrameSize::new(self.width, self.height)
    }

    /// Human-readable codec label: the FourCC, or the codec name when no tag is present.
    pub fn codec_label(&self) -> String {
        if self.fourcc.is_zero() {
            self.codec_name.to_ascii_uppercase()
        } else {
            self.fourcc.to_string()
        }
    }
}

/// A finite, non-restartable stream of frames.
///
/// `read_frame` returns `None` at end of stream and on any decode failure; frames already
/// returned stay valid. Once `None` is returned the source is closed for good.
pub trait FrameSource {
    /// Metadata captured at open time.
    fn info(&self) -> &StreamInfo;
    /// Pull the next frame in stream order.
    fn read_frame(&mut self) -> Option<Frame>;
    /// Current lifecycle state.
    fn state(&self) -> StreamState;
    /// Release the underlying handle. Idempotent.
    fn close(&mut self);

    /// Lazy iterator over the remaining frames.
    fn frames(&mut self) -> Frames<'_, Self>
    where
        Self: Sized,
    {
        Frames { source: self }
    }
}

/// Iterator adapter returned by [`FrameSource::frames`].
pub struct Frames<'a, S: FrameSource + ?Sized> {
    source: &'a mut S,
}

impl<S: FrameSource + ?Sized> Iterator for Frames<'_, S> {
    type Item = Frame;

    fn next(&mut self) -> Option<Frame> {
        self.source.read_frame()
    }
}

impl<'a, S: FrameSource + ?Sized> Frames<'a, S> {
    /// Iterate any source, including `dyn FrameSource`.
    pub fn new(source: &'a mut S) -> Self {
        Self { source }
    }
}

/// Source over frames already in memory.
///
/// The declared frame count is independent of the real one so callers can model containers
/// that misreport their length.
#[derive(Debug)]
pub struct InMemorySource {
    info: StreamInfo,
    frames: std::vec::IntoIter<Frame>,
    fail_at: Option<u64>,
    pulled: u64,
    state: StreamState,
}

impl InMemorySource {
    /// Build a source whose declared count matches `frames.len()`.
    ///
    /// Width and height come from the first frame (0x0 when empty).
    pub fn new(frames: Vec<Frame>, fps: Fps) -> Self {
        let (width, height) = frames.first().map(|f| f.dimensions()).unwrap_or((0, 0));
        let info = StreamInfo {
            path: PathBuf::from("<memory>"),
            width,
            height,
            fps,
            fourcc: FourCc(*b"RAW "),
            codec_name: "rawvideo".to_string(),
            expected_frames: frames.len() as u64,
        };
        Self {
            info,
            frames: frames.into_iter(),
            fail_at: None,
            pulled: 0,
            state: StreamState::Open,
        }
    }

    /// Override the declared frame count.
    pub fn with_declared_frames(mut self, expected: u64) -> Self {
        self.info.expected_frames = expected;
        self
    }

    /// Simulate a decode failure when frame `idx` is pulled.
    pub fn with_decode_failure_at(mut self, idx: u64) -> Self {
        self.fail_at = Some(idx);
        self
    }
}

impl FrameSource for InMemorySource {
    fn info(&self) -> &StreamInfo {
        &self.info
    }

    fn read_frame(&mut self) -> Option<Frame> {
        if self.state.is_closed() {
            return None;
        }
        if self.fail_at == Some(self.pulled) {
            tracing::warn!(frame = self.pulled, "decode failed; ending stream early");
            self.close();
            return None;
        }
        match self.frames.next() {
            Some(frame) => {
                self.state.advance(StreamState::Streaming);
                self.pulled += 1;
                Some(frame)
            }
            None => {
                self.close();
                None
            }
        }
    }

    fn state(&self) -> StreamState {
        self.state
    }

    fn close(&mut self) {
        self.state.advance(StreamState::Closed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(n: u8) -> Frame {
        Frame::from_pixel(4, 2, image::Rgb([n, n, n]))
    }

    #[test]
    fn in_memory_source_yields_in_order_then_closes() {
        let mut src = InMemorySource::new(vec![solid(0), solid(1), solid(2)], Fps::default());
        assert_eq!(src.state(), StreamState::Open);
        assert_eq!(src.info().size(), FrameSize::new(4, 2));

        let seen: Vec<u8> = src.frames().map(|f| f.get_pixel(0, 0).0[0]).collect();
        assert_eq!(seen, vec![0, 1, 2]);
        assert!(src.state().is_closed());
        assert!(src.read_frame().is_none());
    }

    #[test]
    fn decode_failure_ends_stream_without_losing_earlier_frames() {
        let mut src = InMemorySource::new((0..5).map(solid).collect(), Fps::default())
            .with_decode_failure_at(3);
        let got: Vec<Frame> = src.frames().collect();
        assert_eq!(got.len(), 3);
        assert_eq!(got[2].get_pixel(0, 0).0, [2, 2, 2]);
        assert!(src.state().is_closed());
        assert!(src.read_frame().is_none());
    }

    #[test]
    fn declared_count_can_disagree_with_reality() {
        let src = InMemorySource::new(vec![solid(0)], Fps::default()).with_declared_frames(100);
        assert_eq!(src.info().expected_frames, 100);
    }

    #[test]
    fn codec_label_falls_back_to_codec_name() {
        let mut info = InMemorySource::new(vec![], Fps::default()).info().clone();
        assert_eq!(info.codec_label(), "RAW ");
        info.fourcc = FourCc::from_packed(0);
        assert_eq!(info.codec_label(), "RAWVIDEO");
    }
}
