use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::decode::Frame;
use crate::foundation::error::{TimewarpError, TimewarpResult};

/// Fixed per-frame wait while previewing.
pub const PREVIEW_WAIT: Duration = Duration::from_millis(10);

/// What the emission loop should do after a frame was shown.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PreviewControl {
    Continue,
    Quit,
}

/// Cloneable flag an outside party raises to stop a preview.
#[derive(Clone, Debug, Default)]
pub struct QuitSignal(Arc<AtomicBool>);

impl QuitSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Block for at most `wait`, returning early once the signal is raised.
    pub fn wait(&self, wait: Duration) -> PreviewControl {
        let deadline = Instant::now() + wait;
        loop {
            if self.is_triggered() {
                return PreviewControl::Quit;
            }
            let now = Instant::now();
            if now >= deadline {
                return PreviewControl::Continue;
            }
            std::thread::sleep((deadline - now).min(Duration::from_millis(2)));
        }
    }
}

/// Preview surface shown one frame at a time during emission.
pub trait Preview {
    /// Show `frame`, then wait briefly; the only place a quit request is observed.
    fn show(&mut self, frame: &Frame) -> TimewarpResult<PreviewControl>;
    /// Tear the surface down.
    fn close(&mut self) {}
}

/// Headless preview: overwrites a PNG with the latest frame.
pub struct SnapshotPreview {
    path: PathBuf,
    wait: Duration,
    quit: QuitSignal,
    shown: u64,
}

impl SnapshotPreview {
    pub fn new(path: impl Into<PathBuf>, quit: QuitSignal) -> Self {
        Self {
            path: path.into(),
            wait: PREVIEW_WAIT,
            quit,
            shown: 0,
        }
    }

    pub fn with_wait(mut self, wait: Duration) -> Self {
        self.wait = wait;
        self
    }

    pub fn shown(&self) -> u64 {
        self.shown
    }
}

impl Preview for SnapshotPreview {
    fn show(&mut self, frame: &Frame) -> TimewarpResult<PreviewControl> {
        frame
            .save_with_format(&self.path, image::ImageFormat::Png)
            .map_err(|e| {
                TimewarpError::write_failure(format!(
                    "failed to write preview '{}': {e}",
                    self.path.display()
                ))
            })?;
        self.shown += 1;
        Ok(self.quit.wait(self.wait))
    }

    fn close(&mut self) {
        tracing::debug!(path = %self.path.display(), shown = self.shown, "preview closed");
    }
}
