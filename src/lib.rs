#![forbid(unsafe_code)]

pub mod config;
pub mod decode;
pub mod emit;
pub mod encode;
mod foundation;
pub mod permute;
pub mod preview;
pub mod scale;
pub mod select;
pub mod tensor;
pub mod workflow;

pub use config::{CutConfig, WarpConfig, load_json};
pub use decode::ffmpeg::{FfmpegSource, ffmpeg_tools_available, probe_video};
pub use decode::{Frame, FrameSource, Frames, InMemorySource, StreamInfo};
pub use emit::{EmitOpts, EmitReport, emit_frames, emit_tensor};
pub use encode::ffmpeg::{EncoderSpec, FfmpegSink, FfmpegSinkOpts, encoder_for};
pub use encode::sink::{FrameSink, InMemorySink, SinkConfig};
pub use foundation::core::{
    FourCc, Fps, FrameIndex, FrameRange, FrameSize, StreamState, decode_fourcc,
};
pub use foundation::error::{ErrorKind, TimewarpError, TimewarpResult};
pub use permute::{AxisPermutation, Warp, permute, time_warp};
pub use preview::{PREVIEW_WAIT, Preview, PreviewControl, QuitSignal, SnapshotPreview};
pub use scale::{Interpolation, ScaleFactor, rescale};
pub use select::{CutReport, RangeSelector, cut};
pub use tensor::{FrameTensor, IngestReport, TensorBuffer, ingest};
pub use workflow::{WarpReport, cut_stream, run_cut, run_warp, stats, warp};
