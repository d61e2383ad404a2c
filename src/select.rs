use crate::decode::{Frame, FrameSource, Frames};
use crate::emit::{EmitOpts, EmitReport, emit_frames};
use crate::encode::sink::FrameSink;
use crate::foundation::core::{FrameIndex, FrameRange};

/// Streaming filter that forwards frames whose 0-based index falls in an inclusive range.
///
/// Every frame pulled from the inner iterator counts as seen, forwarded or not.
pub struct RangeSelector<I> {
    inner: I,
    range: FrameRange,
    seen: u64,
    forwarded: u64,
}

impl<I> RangeSelector<I> {
    pub fn new(inner: I, range: FrameRange) -> Self {
        Self {
            inner,
            range,
            seen: 0,
            forwarded: 0,
        }
    }

    pub fn seen(&self) -> u64 {
        self.seen
    }

    pub fn forwarded(&self) -> u64 {
        self.forwarded
    }
}

impl<I: Iterator<Item = Frame>> Iterator for RangeSelector<I> {
    type Item = Frame;

    fn next(&mut self) -> Option<Frame> {
        loop {
            let frame = self.inner.next()?;
            let idx = FrameIndex(self.seen);
            self.seen += 1;
            if self.range.contains(idx) {
                self.forwarded += 1;
                return Some(frame);
            }
        }
    }
}

/// Counts from one cut run.
#[derive(Debug)]
pub struct CutReport {
    /// Frame count the source declared.
    pub expected: u64,
    /// Frames pulled from the source.
    pub seen: u64,
    /// Frames inside the range.
    pub forwarded: u64,
    pub emit: EmitReport,
}

/// Stream `source` through the range filter into `sink` without buffering.
///
/// When every output fails the rest of the input is still read, so `seen` is the full frame
/// count. Only a preview quit leaves it short.
#[tracing::instrument(skip(source, opts, sink), fields(path = %source.info().path.display()))]
pub fn cut<S: FrameSource + ?Sized>(
    source: &mut S,
    range: FrameRange,
    opts: &EmitOpts,
    sink: &mut dyn FrameSink,
) -> CutReport {
    let expected = source.info().expected_frames;
    let mut selector = RangeSelector::new(Frames::new(&mut *source), range);
    let emit = emit_frames(&mut selector, None, opts, sink, None);
    if emit.stopped_early && !emit.quit {
        let before = selector.seen();
        selector.by_ref().for_each(drop);
        tracing::debug!(drained = selector.seen() - before, "counted remaining input");
    }
    let (seen, forwarded) = (selector.seen(), selector.forwarded());
    drop(selector);
    source.close();

    tracing::info!(
        written = emit.written,
        forwarded,
        seen,
        expected,
        "written {} of {} frames",
        emit.written,
        seen
    );
    CutReport {
        expected,
        seen,
        forwarded,
        emit,
    }
}
