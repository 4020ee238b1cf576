use std::env;

/// Environment variable overriding the render executable name or path.
pub const NUKE_EXECUTABLE_ENV: &str = "NUKE_ADAPTOR_NUKE_EXECUTABLE";

/// Resolve the Nuke executable to launch.
///
/// Defaults to `nuke` on `PATH`; a Rez or similar environment is expected to
/// make that available. The override is ignored when set to an empty string.
pub fn nuke_executable() -> String {
    match env::var(NUKE_EXECUTABLE_ENV) {
        Ok(value) if !value.trim().is_empty() => value,
        _ => "nuke".to_string(),
    }
}
