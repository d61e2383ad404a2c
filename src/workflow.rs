use std::path::Path;

use crate::config::{CutConfig, WarpConfig};
use crate::decode::ffmpeg::FfmpegSource;
use crate::decode::{FrameSource, StreamInfo};
use crate::emit::{EmitOpts, EmitReport, emit_tensor};
use crate::encode::ffmpeg::{FfmpegSink, FfmpegSinkOpts};
use crate::encode::sink::FrameSink;
use crate::foundation::error::{TimewarpError, TimewarpResult};
use crate::permute::time_warp;
use crate::preview::{Preview, QuitSignal, SnapshotPreview};
use crate::scale::Interpolation;
use crate::select::{CutReport, cut};
use crate::tensor::{IngestReport, ingest};

/// Outcome of a warp run.
#[derive(Debug)]
pub struct WarpReport {
    pub ingest: IngestReport,
    /// `(T, H, W, C)` of the tensor handed to emission.
    pub shape: (usize, usize, usize, usize),
    /// Set when the requested axis was rejected and frames were emitted unwarped.
    pub axis_error: Option<TimewarpError>,
    /// Emission summary, or the format error that stopped emission before any output opened.
    pub emit: TimewarpResult<EmitReport>,
}

/// Read all of `source`, swap time with the configured axis, and emit the result.
///
/// Output frames are upscaled with cubic interpolation.
#[tracing::instrument(skip_all, fields(axis = %cfg.axis))]
pub fn warp<S: FrameSource + ?Sized>(
    source: &mut S,
    cfg: &WarpConfig,
    sink: &mut dyn FrameSink,
    preview: Option<&mut dyn Preview>,
) -> TimewarpResult<WarpReport> {
    cfg.validate()?;

    let (tensor, ingest) = ingest(source, cfg.read_scale);
    let (tensor, axis) = time_warp(tensor, &cfg.axis).into_result();

    let opts = EmitOpts {
        codec: cfg.codec,
        fps: cfg.fps,
        size: cfg.out_scale.apply(tensor.frame_size()),
        interpolation: Interpolation::Cubic,
        write: cfg.write,
    };
    let emit = emit_tensor(&tensor, &opts, sink, preview);
    if let Err(e) = &emit {
        tracing::error!(
            error = %e,
            read = ingest.read,
            written = 0,
            "nothing emitted"
        );
    }

    Ok(WarpReport {
        ingest,
        shape: tensor.shape(),
        axis_error: axis.err(),
        emit,
    })
}

/// Stream the configured range of `source` into `sink`, area-downscaling each frame.
///
/// Returns `None` in stats-only mode, where `sink` is never touched.
#[tracing::instrument(skip_all)]
pub fn cut_stream<S: FrameSource + ?Sized>(
    source: &mut S,
    cfg: &CutConfig,
    sink: &mut dyn FrameSink,
) -> TimewarpResult<Option<CutReport>> {
    cfg.validate()?;
    if cfg.stats_only {
        source.close();
        return Ok(None);
    }

    let opts = EmitOpts {
        codec: cfg.codec,
        fps: cfg.fps,
        size: cfg.target_size(source.info().size()),
        interpolation: Interpolation::Area,
        write: true,
    };
    Ok(Some(cut(source, cfg.range, &opts, sink)))
}

/// Open `path` and report its metadata.
pub fn stats(path: &Path) -> TimewarpResult<StreamInfo> {
    let mut source = FfmpegSource::open(path)?;
    let info = source.info().clone();
    source.close();
    Ok(info)
}

/// Warp a file on disk with `ffmpeg`, optionally previewing to a PNG snapshot.
pub fn run_warp(cfg: &WarpConfig, quit: QuitSignal) -> TimewarpResult<WarpReport> {
    cfg.validate()?;
    let mut source = FfmpegSource::open(&cfg.input)?;
    log_stream_info(source.info());

    let mut sink = FfmpegSink::new(FfmpegSinkOpts {
        out_path: cfg.output.clone(),
        overwrite: cfg.overwrite,
    });
    let mut preview = cfg
        .preview
        .then(|| SnapshotPreview::new(&cfg.preview_path, quit));
    warp(
        &mut source,
        cfg,
        &mut sink,
        preview.as_mut().map(|p| p as &mut dyn Preview),
    )
}

/// Cut a file on disk with `ffmpeg`.
pub fn run_cut(cfg: &CutConfig) -> TimewarpResult<Option<CutReport>> {
    cfg.validate()?;
    let mut source = FfmpegSource::open(&cfg.input)?;
    log_stream_info(source.info());

    let mut sink = FfmpegSink::new(FfmpegSinkOpts {
        out_path: cfg.output.clone(),
        overwrite: cfg.overwrite,
    });
    cut_stream(&mut source, cfg, &mut sink)
}

pub fn log_stream_info(info: &StreamInfo) {
    tracing::info!(
        path = %info.path.display(),
        codec = %info.codec_label(),
        fps = %info.fps,
        size = %info.size(),
        expected_frames = info.expected_frames,
        "opened input"
    );
}
