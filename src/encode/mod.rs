//! Encoding sinks.
//!
//! Sinks consume emitted frames in order and are driven by [`crate::emit`].

/// `ffmpeg`-based sink (system `ffmpeg`).
pub mod ffmpeg;
/// Generic frame sink trait and built-in sinks.
pub mod sink;
