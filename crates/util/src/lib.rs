//! Utility helpers shared across the Nuke OpenJD adaptor crates.

mod data_source;
mod executable;
mod redact;
mod version;

pub use data_source::{DataSourceError, resolve_data_source};
pub use executable::{NUKE_EXECUTABLE_ENV, nuke_executable};
pub use redact::redact_sensitive;
pub use version::major_minor_version;
