use crate::decode::Frame;
use crate::encode::sink::{FrameSink, SinkConfig};
use crate::foundation::core::{FourCc, Fps, FrameIndex, FrameSize};
use crate::foundation::error::{TimewarpError, TimewarpResult};
use crate::preview::{Preview, PreviewControl};
use crate::scale::{Interpolation, rescale};
use crate::tensor::FrameTensor;

/// How frames are sized and where they go.
#[derive(Clone, Debug)]
pub struct EmitOpts {
    pub codec: FourCc,
    pub fps: Fps,
    /// Output size; even on both axes.
    pub size: FrameSize,
    /// Resampling for frames that are not already `size`.
    pub interpolation: Interpolation,
    /// Push frames to the sink. When `false` the sink is never opened.
    pub write: bool,
}

impl EmitOpts {
    fn sink_config(&self) -> SinkConfig {
        SinkConfig {
            width: self.size.width,
            height: self.size.height,
            fps: self.fps,
            codec: self.codec,
        }
    }
}

/// Best-effort summary of one emission.
#[derive(Debug, Default)]
pub struct EmitReport {
    /// Frames the caller planned to emit, when known up front.
    pub planned: Option<u64>,
    /// Frames pulled from the input.
    pub seen: u64,
    /// Frames the sink accepted.
    pub written: u64,
    /// The loop ended before the input was exhausted (quit, or every output failed).
    pub stopped_early: bool,
    /// The preview asked to stop.
    pub quit: bool,
    /// First open/write failure, if any.
    pub failure: Option<TimewarpError>,
}

/// Emit every frame of `tensor`.
///
/// A malformed tensor is a format error and nothing is opened.
pub fn emit_tensor(
    tensor: &FrameTensor,
    opts: &EmitOpts,
    sink: &mut dyn FrameSink,
    preview: Option<&mut dyn Preview>,
) -> TimewarpResult<EmitReport> {
    tensor.validate()?;
    Ok(emit_frames(
        tensor.iter_frames(),
        Some(tensor.len_frames() as u64),
        opts,
        sink,
        preview,
    ))
}

/// Rescale, preview and write `frames` in order.
///
/// An open failure or a write failure stops writing for the rest of the run; a preview quit
/// stops the loop. The sink is always ended once it was begun, and a summary is always logged.
pub fn emit_frames<I>(
    frames: I,
    planned: Option<u64>,
    opts: &EmitOpts,
    sink: &mut dyn FrameSink,
    mut preview: Option<&mut dyn Preview>,
) -> EmitReport
where
    I: IntoIterator<Item = Frame>,
{
    let mut report = EmitReport {
        planned,
        ..EmitReport::default()
    };

    let mut writing = false;
    if opts.write {
        match sink.begin(opts.sink_config()) {
            Ok(()) => writing = true,
            Err(e) => {
                tracing::error!(error = %e, "cannot open output; nothing will be written");
                report.failure = Some(e);
            }
        }
    }
    let began = writing;
    let mut previewing = preview.is_some();
    let wanted = opts.write || previewing;

    for frame in frames {
        if wanted && !writing && !previewing {
            report.stopped_early = true;
            break;
        }
        let idx = FrameIndex(report.seen);
        report.seen += 1;
        if !writing && !previewing {
            continue;
        }
        let frame = rescale(frame, opts.size, opts.interpolation);

        if previewing && let Some(p) = preview.as_deref_mut() {
            match p.show(&frame) {
                Ok(PreviewControl::Continue) => {}
                Ok(PreviewControl::Quit) => {
                    tracing::info!(frame = idx.0, "preview quit requested");
                    report.stopped_early = true;
                    report.quit = true;
                    break;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "preview failed; continuing without it");
                    previewing = false;
                }
            }
        }

        if writing {
            match sink.push_frame(idx, &frame) {
                Ok(()) => report.written += 1,
                Err(e) => {
                    tracing::error!(frame = idx.0, error = %e, "aborting remaining writes");
                    report.failure.get_or_insert(e);
                    writing = false;
                }
            }
        }
    }

    if began && let Err(e) = sink.end() {
        tracing::error!(error = %e, "output did not finalize cleanly");
        report.failure.get_or_insert(e);
    }
    if let Some(p) = preview.as_deref_mut() {
        p.close();
    }

    match &report.failure {
        None => tracing::info!(
            planned = ?report.planned,
            seen = report.seen,
            written = report.written,
            stopped_early = report.stopped_early,
            "written frames"
        ),
        Some(e) => tracing::warn!(
            planned = ?report.planned,
            seen = report.seen,
            written = report.written,
            stopped_early = report.stopped_early,
            error = %e,
            "written frames (with errors)"
        ),
    }
    report
}

#[cfg(test)]
mod tests {
    use ndarray::Array4;

    use super::*;
    use crate::encode::sink::InMemorySink;

    fn opts(w: u32, h: u32) -> EmitOpts {
        EmitOpts {
            codec: FourCc::default(),
            fps: Fps::default(),
            size: FrameSize::new(w, h),
            interpolation: Interpolation::Cubic,
            write: true,
        }
    }

    fn tensor(t: usize, h: usize, w: usize) -> FrameTensor {
        FrameTensor::from_array(Array4::from_shape_fn((t, h, w, 3), |(t, _, _, _)| t as u8))
    }

    /// Accepts `ok` frames, then fails every push.
    #[derive(Default)]
    struct FlakySink {
        ok: u64,
        pushes: u64,
        ended: bool,
        fail_begin: bool,
    }

    impl FrameSink for FlakySink {
        fn begin(&mut self, _cfg: SinkConfig) -> TimewarpResult<()> {
            if self.fail_begin {
                return Err(TimewarpError::open("refused"));
            }
            Ok(())
        }

        fn push_frame(&mut self, _idx: FrameIndex, _frame: &Frame) -> TimewarpResult<()> {
            self.pushes += 1;
            if self.pushes > self.ok {
                return Err(TimewarpError::write_failure("disk full"));
            }
            Ok(())
        }

        fn end(&mut self) -> TimewarpResult<()> {
            self.ended = true;
            Ok(())
        }
    }

    struct QuitAfter {
        remaining: u32,
        shown: u32,
        closed: bool,
    }

    impl Preview for QuitAfter {
        fn show(&mut self, _frame: &Frame) -> TimewarpResult<PreviewControl> {
            self.shown += 1;
            if self.remaining == 0 {
                return Ok(PreviewControl::Quit);
            }
            self.remaining -= 1;
            Ok(PreviewControl::Continue)
        }

        fn close(&mut self) {
            self.closed = true;
        }
    }

    #[test]
    fn tensor_emission_scales_and_writes_everything() {
        let t = tensor(3, 4, 4);
        let mut sink = InMemorySink::new();
        let report = emit_tensor(&t, &opts(8, 4), &mut sink, None).unwrap();
        assert_eq!(report.planned, Some(3));
        assert_eq!(report.seen, 3);
        assert_eq!(report.written, 3);
        assert!(report.failure.is_none());
        assert!(sink.is_ended());
        assert_eq!(sink.config().unwrap().size(), FrameSize::new(8, 4));
        assert!(sink.frames().iter().all(|(_, f)| f.dimensions() == (8, 4)));
        assert_eq!(sink.frames()[2].1.get_pixel(5, 1).0, [2, 2, 2]);
    }

    #[test]
    fn malformed_tensor_is_rejected_before_begin() {
        let bad = FrameTensor::from_array(Array4::zeros((2, 2, 2, 4)));
        let mut sink = InMemorySink::new();
        let err = emit_tensor(&bad, &opts(2, 2), &mut sink, None).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Format);
        assert!(sink.config().is_none());

        let empty = FrameTensor::from_array(Array4::zeros((0, 2, 2, 3)));
        assert!(emit_tensor(&empty, &opts(2, 2), &mut sink, None).is_err());
        assert!(sink.config().is_none());
    }

    #[test]
    fn write_failure_aborts_remaining_writes_and_still_ends() {
        let t = tensor(5, 2, 2);
        let mut sink = FlakySink {
            ok: 2,
            ..FlakySink::default()
        };
        let report = emit_tensor(&t, &opts(2, 2), &mut sink, None).unwrap();
        assert_eq!(report.written, 2);
        assert_eq!(sink.pushes, 3);
        assert!(sink.ended);
        assert!(report.stopped_early);
        assert!(!report.quit);
        assert_eq!(
            report.failure.as_ref().unwrap().kind(),
            crate::ErrorKind::WriteFailure
        );
    }

    #[test]
    fn open_failure_writes_nothing_and_skips_end() {
        let t = tensor(3, 2, 2);
        let mut sink = FlakySink {
            fail_begin: true,
            ..FlakySink::default()
        };
        let report = emit_tensor(&t, &opts(2, 2), &mut sink, None).unwrap();
        assert_eq!(report.written, 0);
        assert_eq!(sink.pushes, 0);
        assert!(!sink.ended);
        assert_eq!(report.failure.unwrap().kind(), crate::ErrorKind::Open);
    }

    #[test]
    fn preview_keeps_running_after_writes_abort() {
        let t = tensor(4, 2, 2);
        let mut sink = FlakySink {
            ok: 1,
            ..FlakySink::default()
        };
        let mut preview = QuitAfter {
            remaining: u32::MAX,
            shown: 0,
            closed: false,
        };
        let report = emit_tensor(&t, &opts(2, 2), &mut sink, Some(&mut preview)).unwrap();
        assert_eq!(report.seen, 4);
        assert_eq!(report.written, 1);
        assert_eq!(preview.shown, 4);
        assert!(preview.closed);
        assert!(!report.stopped_early);
    }

    #[test]
    fn preview_quit_stops_emission() {
        let t = tensor(10, 2, 2);
        let mut sink = InMemorySink::new();
        let mut preview = QuitAfter {
            remaining: 3,
            shown: 0,
            closed: false,
        };
        let report = emit_tensor(&t, &opts(2, 2), &mut sink, Some(&mut preview)).unwrap();
        assert!(report.stopped_early);
        assert!(report.quit);
        assert_eq!(report.seen, 4);
        assert_eq!(report.written, 3);
        assert!(sink.is_ended());
        assert!(preview.closed);
    }

    #[test]
    fn write_disabled_never_opens_sink() {
        let t = tensor(3, 2, 2);
        let mut sink = InMemorySink::new();
        let mut o = opts(2, 2);
        o.write = false;
        let report = emit_tensor(&t, &o, &mut sink, None).unwrap();
        assert_eq!(report.seen, 3);
        assert_eq!(report.written, 0);
        assert!(sink.config().is_none());
        assert!(!sink.is_ended());
    }
}
