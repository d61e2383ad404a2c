use std::io::{Read, Write as _};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::thread::JoinHandle;

use crate::decode::Frame;
use crate::encode::sink::{FrameSink, SinkConfig};
use crate::foundation::core::{FourCc, Fps, FrameIndex, StreamState};
use crate::foundation::error::{TimewarpError, TimewarpResult};

/// Options for [`FfmpegSink`].
#[derive(Clone, Debug)]
pub struct FfmpegSinkOpts {
    /// Output file path. The extension picks the container.
    pub out_path: PathBuf,
    /// Overwrite output file if it already exists.
    pub overwrite: bool,
}

impl FfmpegSinkOpts {
    /// Create options for writing to `out_path`.
    pub fn new(out_path: impl Into<PathBuf>) -> Self {
        Self {
            out_path: out_path.into(),
            overwrite: true,
        }
    }
}

/// `ffmpeg` encoder settings for a FourCC.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncoderSpec {
    pub codec: &'static str,
    pub pix_fmt: &'static str,
    /// Codec tag written into the container, when the FourCC names one.
    pub tag: Option<String>,
}

/// Map a FourCC to the `ffmpeg` encoder that produces it.
pub fn encoder_for(fourcc: FourCc) -> Option<EncoderSpec> {
    let name = fourcc.to_string();
    let (codec, pix_fmt, tag) = match name.as_str() {
        "H264" | "X264" | "AVC1" => ("libx264", "yuv420p", None),
        "HEVC" | "H265" | "HEV1" => ("libx265", "yuv420p", None),
        "HVC1" => ("libx265", "yuv420p", Some("hvc1")),
        "MJPG" => ("mjpeg", "yuvj420p", None),
        "XVID" => ("mpeg4", "yuv420p", Some("XVID")),
        "DIVX" => ("mpeg4", "yuv420p", Some("DIVX")),
        "DX50" => ("mpeg4", "yuv420p", Some("DX50")),
        "MP4V" | "FMP4" => ("mpeg4", "yuv420p", None),
        "VP80" => ("libvpx", "yuv420p", None),
        "VP90" => ("libvpx-vp9", "yuv420p", None),
        "FFV1" => ("ffv1", "yuv420p", None),
        _ => return None,
    };
    Some(EncoderSpec {
        codec,
        pix_fmt,
        tag: tag.map(str::to_string),
    })
}

/// Sink that spawns the system `ffmpeg` and streams raw `rgb24` frames to its stdin.
///
/// Nothing touches the filesystem until `begin`.
pub struct FfmpegSink {
    opts: FfmpegSinkOpts,

    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stderr_drain: Option<JoinHandle<std::io::Result<Vec<u8>>>>,

    cfg: Option<SinkConfig>,
    last_idx: Option<FrameIndex>,
    state: StreamState,
}

impl FfmpegSink {
    /// Create a new sink that streams into `ffmpeg`.
    pub fn new(opts: FfmpegSinkOpts) -> Self {
        Self {
            opts,
            child: None,
            stdin: None,
            stderr_drain: None,
            cfg: None,
            last_idx: None,
            state: StreamState::Unopened,
        }
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    fn reap(&mut self) -> TimewarpResult<()> {
        drop(self.stdin.take());
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };

        let status = child.wait().map_err(|e| {
            TimewarpError::write_failure(format!("failed to wait for ffmpeg to finish: {e}"))
        })?;
        let stderr_bytes = match self.stderr_drain.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| TimewarpError::write_failure("ffmpeg stderr drain thread panicked"))?
                .map_err(|e| {
                    TimewarpError::write_failure(format!("ffmpeg stderr read failed: {e}"))
                })?,
            None => Vec::new(),
        };

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr_bytes);
            return Err(TimewarpError::write_failure(format!(
                "ffmpeg exited with status {}: {}",
                status,
                stderr.trim()
            )));
        }
        Ok(())
    }
}

impl FrameSink for FfmpegSink {
    fn begin(&mut self, cfg: SinkConfig) -> TimewarpResult<()> {
        if self.state != StreamState::Unopened {
            return Err(TimewarpError::open("ffmpeg sink can only be started once"));
        }
        if cfg.size().is_empty() {
            return Err(TimewarpError::open(
                "ffmpeg sink width/height must be non-zero",
            ));
        }
        if !cfg.width.is_multiple_of(2) || !cfg.height.is_multiple_of(2) {
            return Err(TimewarpError::open(
                "ffmpeg sink width/height must be even (required for yuv420p output)",
            ));
        }
        let encoder = encoder_for(cfg.codec).ok_or_else(|| {
            TimewarpError::open(format!("no ffmpeg encoder known for codec '{}'", cfg.codec))
        })?;

        if !self.opts.overwrite && self.opts.out_path.exists() {
            return Err(TimewarpError::open(format!(
                "output file '{}' already exists",
                self.opts.out_path.display()
            )));
        }
        if !is_ffmpeg_on_path() {
            return Err(TimewarpError::open(
                "ffmpeg is required for encoding, but was not found on PATH",
            ));
        }
        ensure_parent_dir(&self.opts.out_path)?;

        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        if self.opts.overwrite {
            cmd.arg("-y");
        } else {
            cmd.arg("-n");
        }

        cmd.args([
            "-loglevel",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgb24",
            "-s",
            &cfg.size().to_string(),
        ]);
        push_input_fps(&mut cmd, cfg.fps);
        cmd.args(["-i", "pipe:0", "-an", "-c:v", encoder.codec]);
        if let Some(tag) = encoder.tag.as_deref() {
            cmd.args(["-tag:v", tag]);
        }
        cmd.args(["-pix_fmt", encoder.pix_fmt]);
        cmd.arg(&self.opts.out_path);

        let mut child = cmd.spawn().map_err(|e| {
            TimewarpError::open(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| TimewarpError::open("failed to open ffmpeg stdin (unexpected)"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| TimewarpError::open("failed to open ffmpeg stderr (unexpected)"))?;
        let stderr_drain = std::thread::spawn(move || {
            let mut stderr_bytes = Vec::new();
            stderr.read_to_end(&mut stderr_bytes)?;
            Ok(stderr_bytes)
        });

        tracing::info!(
            path = %self.opts.out_path.display(),
            codec = %cfg.codec,
            encoder = encoder.codec,
            fps = %cfg.fps,
            size = %cfg.size(),
            "opened output"
        );

        self.child = Some(child);
        self.stdin = Some(stdin);
        self.stderr_drain = Some(stderr_drain);
        self.cfg = Some(cfg);
        self.last_idx = None;
        self.state.advance(StreamState::Open);
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &Frame) -> TimewarpResult<()> {
        if self.state.is_closed() {
            return Err(TimewarpError::write_failure("ffmpeg sink is already closed"));
        }
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| TimewarpError::write_failure("ffmpeg sink not started"))?;
        if let Some(last) = self.last_idx
            && idx.0 <= last.0
        {
            return Err(TimewarpError::write_failure(
                "ffmpeg sink received out-of-order frame index",
            ));
        }
        if frame.dimensions() != (cfg.width, cfg.height) {
            return Err(TimewarpError::write_failure(format!(
                "frame size mismatch: got {}x{}, expected {}",
                frame.width(),
                frame.height(),
                cfg.size()
            )));
        }

        let Some(stdin) = self.stdin.as_mut() else {
            return Err(TimewarpError::write_failure("ffmpeg sink is already finalized"));
        };
        stdin.write_all(frame.as_raw()).map_err(|e| {
            TimewarpError::write_failure(format!("failed to write frame to ffmpeg stdin: {e}"))
        })?;

        self.last_idx = Some(idx);
        self.state.advance(StreamState::Streaming);
        Ok(())
    }

    fn end(&mut self) -> TimewarpResult<()> {
        if self.child.is_none() {
            return Err(TimewarpError::write_failure("ffmpeg sink not started"));
        }
        let res = self.reap();
        self.cfg = None;
        self.state.advance(StreamState::Closed);
        res
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        if self.child.is_some() {
            // Closing stdin lets ffmpeg finalize whatever it already received.
            let _ = self.reap();
        }
    }
}

fn push_input_fps(cmd: &mut Command, fps: Fps) {
    // For rawvideo input, `-r` before `-i` sets the input framerate.
    cmd.args(["-r", &format!("{}/{}", fps.num, fps.den)]);
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> TimewarpResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| {
            TimewarpError::open(format!(
                "failed to create output directory '{}': {e}",
                parent.display()
            ))
        })?;
    }
    Ok(())
}

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}
