//! Shared render-session state mutated by output callbacks.

use std::sync::{Arc, Mutex};

use tracing::info;

#[derive(Debug)]
struct Inner {
    is_rendering: bool,
    curr_output: u64,
    total_outputs: u64,
    fatal_error: Option<String>,
    suppress_errors: bool,
}

impl Default for Inner {
    fn default() -> Self {
        Self {
            is_rendering: false,
            curr_output: 1,
            total_outputs: 1,
            fatal_error: None,
            suppress_errors: false,
        }
    }
}

/// State shared between the output-scanning callbacks and the lifecycle
/// loops that wait on them. Cloning shares the underlying state.
///
/// Status updates follow the OpenJD stdout contract: `openjd_progress:` and
/// `openjd_status:` lines on the adaptor's own stdout, which the task runner
/// consumes.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    inner: Arc<Mutex<Inner>>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Progress in percent, from outputs written so far over outputs
    /// expected, clamped to `[0, 100]`.
    pub fn progress(&self) -> f64 {
        let inner = self.lock();
        let total = inner.total_outputs.max(1);
        (100.0 * inner.curr_output as f64 / total as f64).clamp(0.0, 100.0)
    }

    pub fn is_rendering(&self) -> bool {
        self.lock().is_rendering
    }

    /// Mark the start of a task's render.
    pub fn begin_render(&self) {
        self.lock().is_rendering = true;
    }

    /// Completion line observed: the render is done, report 100%.
    pub fn complete_render(&self) {
        self.lock().is_rendering = false;
        update_status(Some(100.0), Some("RENDER COMPLETE"));
    }

    /// Progress line observed: record the output window reported by the
    /// client and re-emit overall progress.
    pub fn record_progress(&self, curr_output: u64, total_outputs: u64) {
        {
            let mut inner = self.lock();
            inner.curr_output = curr_output;
            inner.total_outputs = total_outputs;
        }
        update_status(Some(self.progress()), None);
    }

    /// An output file finished writing; progress only moves mid-render.
    pub fn record_output_complete(&self) {
        let is_rendering = {
            let mut inner = self.lock();
            inner.curr_output += 1;
            inner.is_rendering
        };
        if is_rendering {
            update_status(Some(self.progress()), None);
        }
    }

    /// Record a fatal error line. The first error wins; later ones are kept
    /// out so the original cause is what gets raised.
    pub fn record_error(&self, message: impl Into<String>) {
        let mut inner = self.lock();
        if inner.fatal_error.is_none() {
            inner.fatal_error = Some(message.into());
        }
    }

    /// The pending fatal error, unless errors are being suppressed for
    /// cleanup.
    pub fn fatal_error(&self) -> Option<String> {
        let inner = self.lock();
        if inner.suppress_errors {
            None
        } else {
            inner.fatal_error.clone()
        }
    }

    /// Suppress fatal errors while cleanup runs; a close that trips error
    /// output must not mask the shutdown.
    pub fn set_error_suppression(&self, suppress: bool) {
        self.lock().suppress_errors = suppress;
    }

    /// Emit a status message alongside the current progress.
    pub fn report_status(&self, progress: f64, message: &str) {
        update_status(Some(progress), Some(message));
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("session state poisoned")
    }
}

fn update_status(progress: Option<f64>, message: Option<&str>) {
    if let Some(progress) = progress {
        println!("openjd_progress: {progress:.1}");
        info!(progress, "render progress");
    }
    if let Some(message) = message {
        println!("openjd_status: {message}");
        info!(status = message, "render status");
    }
}
