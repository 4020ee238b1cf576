//! Adaptor lifecycle: init, per-task run, cleanup, cancel.

use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use tokio::time::{Instant, sleep};
use tracing::{error, info};

use crate::error::AdaptorError;
use crate::handlers::{RegexCallback, RegexHandler};
use crate::process::LoggingSubprocess;
use crate::session::SessionState;
use nuke_openjd_ipc::{ActionsQueue, AdaptorServer, RunningAdaptorServer, SOCKET_PATH_ENV};
use nuke_openjd_types::{ACTION_CLOSE, Action, InitData, PathMappingRules, RunData};
use nuke_openjd_util::{major_minor_version, nuke_executable};

/// Environment variable pointing at the in-Nuke client script.
pub const CLIENT_PATH_ENV: &str = "NUKE_ADAPTOR_CLIENT_PATH";

const POLL_INTERVAL: Duration = Duration::from_millis(100);

static COMPLETE_REGEXES: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new("NukeClient: Finished Rendering Frame [0-9]+").expect("complete pattern"),
        Regex::new("NukeClient: Finished Rendering Frames [0-9]+-[0-9]+")
            .expect("complete pattern"),
    ]
});

static PROGRESS_REGEXES: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new("NukeClient: Creating outputs ([0-9]+)-([0-9]+) of ([0-9]+) total outputs\\.")
            .expect("progress pattern"),
    ]
});

static OUTPUT_COMPLETE_REGEXES: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![Regex::new(r"Writing .+ took [0-9.]+ seconds").expect("output pattern")]
});

static ERROR_REGEXES: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(".*ERROR:.*").expect("error pattern"),
        Regex::new(".*Error:.*").expect("error pattern"),
        Regex::new(".*Error :.*").expect("error pattern"),
        Regex::new(r".*Eddy\[ERROR\].*").expect("error pattern"),
    ]
});

/// Per-phase timeouts for the lifecycle waits.
#[derive(Debug, Clone, Copy)]
pub struct AdaptorTimeouts {
    pub server_start: Duration,
    pub server_end: Duration,
    pub nuke_start: Duration,
    pub nuke_end: Duration,
}

impl Default for AdaptorTimeouts {
    fn default() -> Self {
        Self {
            server_start: Duration::from_secs(30),
            server_end: Duration::from_secs(30),
            nuke_start: Duration::from_secs(300),
            nuke_end: Duration::from_secs(30),
        }
    }
}

/// Keeps one Nuke process resident across tasks and feeds it per-task
/// commands through the actions queue.
pub struct NukeAdaptor {
    init_data: InitData,
    path_mapping_rules: PathMappingRules,
    timeouts: AdaptorTimeouts,
    queue: ActionsQueue,
    state: SessionState,
    server: Option<RunningAdaptorServer>,
    client: Option<LoggingSubprocess>,
}

impl NukeAdaptor {
    pub fn new(init_data: InitData, path_mapping_rules: PathMappingRules) -> Self {
        Self {
            init_data,
            path_mapping_rules,
            timeouts: AdaptorTimeouts::default(),
            queue: ActionsQueue::new(),
            state: SessionState::new(),
            server: None,
            client: None,
        }
    }

    /// Override the default lifecycle timeouts.
    pub fn with_timeouts(mut self, timeouts: AdaptorTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Initialize the sticky session: start the IPC server, queue the init
    /// actions, launch Nuke with the client script, and wait until the
    /// client has drained the queue.
    pub async fn on_start(&mut self) -> Result<(), AdaptorError> {
        self.init_data.validate()?;
        self.state.report_status(0.0, "Initializing Nuke");
        if let Ok(version) = env::var("NUKE_VERSION")
            && !version.is_empty()
        {
            info!(version = %major_minor_version(&version), "starting Nuke session");
        }

        let server = tokio::time::timeout(
            self.timeouts.server_start,
            AdaptorServer::new(self.queue.clone(), self.path_mapping_rules.clone()).start(),
        )
        .await
        .map_err(|_| AdaptorError::Timeout {
            phase: "server start",
            timeout: self.timeouts.server_start,
        })?
        .map_err(|error| AdaptorError::Server(error.to_string()))?;

        for action in Action::init_actions(&self.init_data) {
            self.queue.enqueue(action);
        }

        let socket_path = server.bound_address().to_string();
        self.server = Some(server);
        self.client = Some(self.start_nuke_client(&socket_path)?);

        let deadline = Instant::now() + self.timeouts.nuke_start;
        loop {
            if let Some(message) = self.state.fatal_error() {
                return Err(AdaptorError::Render(message));
            }
            if self.queue.is_empty() || !self.client_is_running() {
                break;
            }
            if Instant::now() >= deadline {
                return Err(AdaptorError::Timeout {
                    phase: "initialization",
                    timeout: self.timeouts.nuke_start,
                });
            }
            sleep(POLL_INTERVAL).await;
        }

        if !self.queue.is_empty() {
            return Err(AdaptorError::InitIncomplete);
        }
        info!("Nuke session initialized and sticky");
        Ok(())
    }

    /// Render one task's frame range and wait for its completion marker.
    pub async fn on_run(&mut self, run_data: &RunData) -> Result<(), AdaptorError> {
        if !self.client_is_running() {
            return Err(AdaptorError::NukeNotRunning);
        }

        self.state.begin_render();
        self.queue.enqueue(Action::start_render(&run_data.frame_range));
        info!(frame_range = %run_data.frame_range, "render task queued");

        loop {
            if let Some(message) = self.state.fatal_error() {
                return Err(AdaptorError::Render(message));
            }
            if !self.state.is_rendering() {
                return Ok(());
            }
            if !self.client_is_running() {
                // The client should still be resident and waiting for the
                // next command; an exit mid-render is always an error.
                let exit_code = self.client.as_mut().and_then(|client| client.exit_code());
                return Err(AdaptorError::ClientExited { exit_code });
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    /// Contractual hook between the last run and cleanup; nothing to do.
    pub async fn on_stop(&mut self) -> Result<(), AdaptorError> {
        Ok(())
    }

    /// Close the session: ask the client to exit, terminate it if it
    /// refuses, and stop the IPC server.
    pub async fn on_cleanup(&mut self) -> Result<(), AdaptorError> {
        self.state.set_error_suppression(true);

        if self.client.is_some() {
            self.queue.enqueue_front(Action::named(ACTION_CLOSE));
            let deadline = Instant::now() + self.timeouts.nuke_end;
            while self.client_is_running() && Instant::now() < deadline {
                sleep(POLL_INTERVAL).await;
            }
            if let Some(client) = self.client.as_mut()
                && client.is_running()
            {
                error!(
                    "Nuke did not complete cleanup actions and failed to gracefully shutdown, \
                     terminating"
                );
                client.terminate(Duration::ZERO).await?;
            }
            self.client = None;
        }

        if let Some(server) = self.server.take() {
            let stopped = tokio::time::timeout(self.timeouts.server_end, server.stop()).await;
            match stopped {
                Ok(Ok(())) => {}
                Ok(Err(error)) => error!(%error, "failed to shutdown the adaptor server"),
                Err(_) => error!("failed to shutdown the adaptor server before the timeout"),
            }
        }

        self.state.set_error_suppression(false);
        Ok(())
    }

    /// Cancel a running render. The client has no graceful cancel, so the
    /// process group is killed outright.
    pub async fn on_cancel(&mut self) -> Result<(), AdaptorError> {
        info!("CANCEL REQUESTED");
        if let Some(client) = self.client.as_mut()
            && client.is_running()
        {
            return client.terminate(Duration::ZERO).await;
        }
        info!("nothing to cancel because Nuke is not running");
        Ok(())
    }

    /// Actions currently queued and not yet collected by the client.
    pub fn pending_actions(&self) -> usize {
        self.queue.len()
    }

    fn client_is_running(&mut self) -> bool {
        self.client
            .as_mut()
            .map(|client| client.is_running())
            .unwrap_or(false)
    }

    fn start_nuke_client(&self, socket_path: &str) -> Result<LoggingSubprocess, AdaptorError> {
        let program = nuke_executable();
        let client_script = client_script_path()?;
        let args = vec![
            "-V".to_string(),
            "2".to_string(),
            "-t".to_string(),
            client_script.to_string_lossy().into_owned(),
        ];
        let envs = vec![(SOCKET_PATH_ENV.to_string(), socket_path.to_string())];
        LoggingSubprocess::spawn(&program, &args, &envs, Arc::new(self.regex_handler()))
    }

    /// The stdout/stderr callbacks for the render session.
    fn regex_handler(&self) -> RegexHandler {
        let continue_on_error = self.init_data.continue_on_error;
        let state = self.state.clone();

        let complete_state = state.clone();
        let complete = RegexCallback::new(COMPLETE_REGEXES.clone(), move |_| {
            complete_state.complete_render();
        });

        let progress_state = state.clone();
        let progress = RegexCallback::new(PROGRESS_REGEXES.clone(), move |captures| {
            let curr = captures[1].parse().unwrap_or(0);
            let total = captures[3].parse().unwrap_or(0);
            progress_state.record_progress(curr, total);
        });

        let output_state = state.clone();
        let output_complete = RegexCallback::new(OUTPUT_COMPLETE_REGEXES.clone(), move |_| {
            output_state.record_output_complete();
        });

        let error_state = state;
        let errors = RegexCallback::new(ERROR_REGEXES.clone(), move |captures| {
            let line = captures.get(0).map(|m| m.as_str()).unwrap_or_default();
            if continue_on_error {
                info!(line, "continuing past render error");
            } else {
                error_state.record_error(line);
            }
        });

        RegexHandler::new(vec![complete, progress, output_complete, errors])
    }
}

/// Locate the client script launched inside Nuke.
///
/// Honors [`CLIENT_PATH_ENV`], falling back to `client/nuke_client.py` next
/// to the adaptor executable.
fn client_script_path() -> Result<PathBuf, AdaptorError> {
    if let Ok(path) = env::var(CLIENT_PATH_ENV)
        && !path.trim().is_empty()
    {
        let path = PathBuf::from(path);
        if path.is_file() {
            return Ok(path);
        }
        return Err(AdaptorError::ClientScriptNotFound { searched: path });
    }

    let default_path = env::current_exe()?
        .parent()
        .map(|dir| dir.join("client").join("nuke_client.py"))
        .unwrap_or_default();
    if default_path.is_file() {
        return Ok(default_path);
    }
    Err(AdaptorError::ClientScriptNotFound {
        searched: default_path,
    })
}
