use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors surfaced from the adaptor lifecycle.
#[derive(Debug, Error)]
pub enum AdaptorError {
    #[error("cannot render because Nuke is not running")]
    NukeNotRunning,

    #[error("Nuke did not complete {phase} actions in {timeout:?}")]
    Timeout {
        phase: &'static str,
        timeout: Duration,
    },

    #[error("Nuke encountered an error and was not able to complete initialization actions")]
    InitIncomplete,

    #[error(
        "Nuke exited early and did not render successfully, please check render logs. \
         Exit code {exit_code:?}"
    )]
    ClientExited { exit_code: Option<i32> },

    #[error("Nuke encountered an error: {0}")]
    Render(String),

    #[error(
        "could not find the Nuke client script at '{searched}'; \
         set NUKE_ADAPTOR_CLIENT_PATH to the nuke_client.py location"
    )]
    ClientScriptNotFound { searched: PathBuf },

    #[error("failed to launch '{program}': {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("adaptor server error: {0}")]
    Server(String),

    #[error(transparent)]
    InitData(#[from] nuke_openjd_types::InitDataError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
