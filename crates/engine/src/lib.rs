//! Render application controller for the Nuke OpenJD adaptor.
//!
//! The engine keeps a single Nuke process resident across tasks ("sticky
//! rendering"): `on_start` opens the script and applies session settings,
//! each `on_run` feeds one frame range through the actions queue, and
//! `on_cleanup` closes the session. Render output is scanned line by line for
//! progress, completion, and error markers.

mod adaptor;
mod error;
mod handlers;
mod process;
mod session;

pub use adaptor::{AdaptorTimeouts, NukeAdaptor, CLIENT_PATH_ENV};
pub use error::AdaptorError;
pub use handlers::{RegexCallback, RegexHandler};
pub use process::LoggingSubprocess;
pub use session::SessionState;
