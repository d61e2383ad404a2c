//! Frame sources.
//!
//! Sources yield decoded frames lazily in stream order and are used by the warp and cut
//! workflows.

/// `ffmpeg`-based source (system `ffprobe` + `ffmpeg`).
pub mod ffmpeg;
/// Generic frame source trait and built-in sources.
pub mod source;

pub use source::{Frame, FrameSource, Frames, InMemorySource, StreamInfo};
