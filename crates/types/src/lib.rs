//! Shared data model for the Nuke OpenJD adaptor.
//!
//! Everything the adaptor passes between its lifecycle code, the IPC server,
//! and the in-Nuke client lives here: the init/run data documents supplied at
//! invocation time, the sticky-session [`Action`] payloads, and the
//! path-mapping rule set applied on the render host.

mod action;
mod init_data;
mod path_mapping;
mod run_data;

pub use action::{Action, ACTION_CLOSE, ACTION_START_RENDER};
pub use init_data::{InitData, InitDataError};
pub use path_mapping::{PathFormat, PathMappingRule, PathMappingRules};
pub use run_data::{FrameRange, FrameRangeError, RunData};
