use std::io::{BufReader, Read};
use std::path::Path;
use std::process::{Child, ChildStdout, Command, Stdio};

use crate::decode::source::{Frame, FrameSource, StreamInfo};
use crate::foundation::core::{FourCc, Fps, StreamState};
use crate::foundation::error::{TimewarpError, TimewarpResult};

/// Probe `path` with `ffprobe` and return the first video stream's metadata.
///
/// Any failure here (missing file, `ffprobe` missing or failing, no video stream) is an
/// open error.
pub fn probe_video(path: &Path) -> TimewarpResult<StreamInfo> {
    #[derive(serde::Deserialize)]
    struct ProbeStream {
        codec_type: Option<String>,
        codec_name: Option<String>,
        codec_tag: Option<String>,
        width: Option<u32>,
        height: Option<u32>,
        r_frame_rate: Option<String>,
        avg_frame_rate: Option<String>,
        nb_frames: Option<String>,
        duration: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeFormat {
        duration: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeOut {
        #[serde(default)]
        streams: Vec<ProbeStream>,
        format: Option<ProbeFormat>,
    }

    if !path.is_file() {
        return Err(TimewarpError::open(format!(
            "cannot read input '{}'",
            path.display()
        )));
    }

    let out = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_streams",
            "-show_format",
        ])
        .arg(path)
        .output()
        .map_err(|e| TimewarpError::open(format!("failed to run ffprobe: {e}")))?;
    if !out.status.success() {
        return Err(TimewarpError::open(format!(
            "ffprobe failed for '{}': {}",
            path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }

    let parsed: ProbeOut = serde_json::from_slice(&out.stdout)
        .map_err(|e| TimewarpError::open(format!("ffprobe json parse failed: {e}")))?;
    let stream = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| TimewarpError::open(format!("no video stream in '{}'", path.display())))?;

    let width = stream
        .width
        .ok_or_else(|| TimewarpError::open("missing video width from ffprobe"))?;
    let height = stream
        .height
        .ok_or_else(|| TimewarpError::open("missing video height from ffprobe"))?;
    let fps = [stream.r_frame_rate.as_deref(), stream.avg_frame_rate.as_deref()]
        .into_iter()
        .flatten()
        .find_map(parse_ff_ratio)
        .ok_or_else(|| TimewarpError::open("invalid video frame rate from ffprobe"))?;
    let fourcc = stream
        .codec_tag
        .as_deref()
        .and_then(parse_codec_tag)
        .map(FourCc::from_packed)
        .unwrap_or(FourCc::from_packed(0));

    let duration_sec = stream
        .duration
        .as_deref()
        .or(parsed.format.as_ref().and_then(|f| f.duration.as_deref()))
        .and_then(|s| s.parse::<f64>().ok());
    let expected_frames = estimate_frame_count(stream.nb_frames.as_deref(), duration_sec, fps);

    Ok(StreamInfo {
        path: path.to_path_buf(),
        width,
        height,
        fps,
        fourcc,
        codec_name: stream.codec_name.clone().unwrap_or_default(),
        expected_frames,
    })
}

/// Container frame count, else `duration * fps`, else zero.
fn estimate_frame_count(nb_frames: Option<&str>, duration_sec: Option<f64>, fps: Fps) -> u64 {
    if let Some(n) = nb_frames.and_then(|s| s.parse::<u64>().ok())
        && n > 0
    {
        return n;
    }
    match duration_sec {
        Some(d) if d.is_finite() && d > 0.0 => (d * fps.as_f64()).round() as u64,
        _ => 0,
    }
}

fn parse_ff_ratio(s: &str) -> Option<Fps> {
    let (a, b) = s.split_once('/')?;
    Fps::new(a.parse().ok()?, b.parse().ok()?).ok()
}

/// `ffprobe` reports tags as `0x31637661`.
fn parse_codec_tag(s: &str) -> Option<u32> {
    let hex = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X"))?;
    u32::from_str_radix(hex, 16).ok()
}

/// Source that decodes through a system `ffmpeg` child emitting raw `rgb24` frames.
///
/// Frames come out in coded orientation; display rotation metadata is ignored. The decoder is
/// spawned on the first pull. Dropping the source kills and reaps it.
pub struct FfmpegSource {
    info: StreamInfo,
    child: Option<Child>,
    stdout: Option<BufReader<ChildStdout>>,
    frame_len: usize,
    pulled: u64,
    state: StreamState,
}

impl FfmpegSource {
    /// Open `path` and read its metadata once.
    pub fn open(path: impl AsRef<Path>) -> TimewarpResult<Self> {
        let info = probe_video(path.as_ref())?;
        let frame_len = info.width as usize * info.height as usize * 3;
        if frame_len == 0 {
            return Err(TimewarpError::open(format!(
                "input '{}' reports a zero-sized frame",
                info.path.display()
            )));
        }

        let mut state = StreamState::Unopened;
        state.advance(StreamState::Open);
        Ok(Self {
            info,
            child: None,
            stdout: None,
            frame_len,
            pulled: 0,
            state,
        })
    }

    fn spawn_decoder(&mut self) -> TimewarpResult<()> {
        let mut child = Command::new("ffmpeg")
            // Frames must keep the coded geometry ffprobe reported.
            .args(["-v", "error", "-nostdin", "-noautorotate", "-i"])
            .arg(&self.info.path)
            .args(["-map", "0:v:0", "-an", "-f", "rawvideo", "-pix_fmt", "rgb24"])
            .arg("pipe:1")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                TimewarpError::open(format!(
                    "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
                ))
            })?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| TimewarpError::open("failed to open ffmpeg stdout (unexpected)"))?;
        self.stdout = Some(BufReader::with_capacity(self.frame_len.max(8192), stdout));
        self.child = Some(child);
        Ok(())
    }

    fn pull(&mut self) -> Option<Frame> {
        if self.state.is_closed() {
            return None;
        }
        if self.child.is_none()
            && let Err(e) = self.spawn_decoder()
        {
            tracing::warn!(error = %e, "decoder did not start; ending stream");
            self.close();
            return None;
        }
        let stdout = self.stdout.as_mut()?;

        let mut buf = vec![0u8; self.frame_len];
        if let Err(e) = stdout.read_exact(&mut buf) {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                tracing::debug!(frames = self.pulled, "decoder reached end of stream");
            } else {
                tracing::warn!(frames = self.pulled, error = %e, "decode failed; ending stream early");
            }
            self.close();
            return None;
        }

        let Some(frame) = Frame::from_raw(self.info.width, self.info.height, buf) else {
            self.close();
            return None;
        };
        self.state.advance(StreamState::Streaming);
        self.pulled += 1;
        Some(frame)
    }
}

impl FrameSource for FfmpegSource {
    fn info(&self) -> &StreamInfo {
        &self.info
    }

    fn read_frame(&mut self) -> Option<Frame> {
        self.pull()
    }

    fn state(&self) -> StreamState {
        self.state
    }

    fn close(&mut self) {
        drop(self.stdout.take());
        if let Some(mut child) = self.child.take() {
            // The decoder may still be producing frames nobody will read.
            let _ = child.kill();
            let _ = child.wait();
        }
        self.state.advance(StreamState::Closed);
    }
}

impl Drop for FfmpegSource {
    fn drop(&mut self) {
        self.close();
    }
}

/// Return `true` when both `ffmpeg` and `ffprobe` can be invoked from `PATH`.
pub fn ffmpeg_tools_available() -> bool {
    ["ffmpeg", "ffprobe"].iter().all(|tool| {
        Command::new(tool)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_count_prefers_container_count() {
        let fps = Fps::new(30, 1).unwrap();
        assert_eq!(estimate_frame_count(Some("120"), Some(10.0), fps), 120);
        assert_eq!(estimate_frame_count(Some("0"), Some(2.0), fps), 60);
        assert_eq!(estimate_frame_count(None, Some(1.5), fps), 45);
        assert_eq!(estimate_frame_count(Some("N/A"), None, fps), 0);
    }

    #[test]
    fn codec_tag_hex_decodes_to_fourcc() {
        let tag = parse_codec_tag("0x31637661").unwrap();
        assert_eq!(FourCc::from_packed(tag).to_string(), "AVC1");
        assert_eq!(parse_codec_tag("avc1"), None);
    }

    #[test]
    fn ratio_parsing_rejects_zero() {
        assert_eq!(parse_ff_ratio("30000/1001").unwrap().num, 30000);
        assert!(parse_ff_ratio("0/0").is_none());
        assert!(parse_ff_ratio("25").is_none());
    }

    #[test]
    fn missing_input_is_open_error() {
        let err = FfmpegSource::open("target/definitely/not/here.mp4")
            .err()
            .unwrap();
        assert_eq!(err.kind(), crate::ErrorKind::Open);
    }
}
