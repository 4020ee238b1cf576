use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{info, warn};

// Capture only the major.minor group (ie. 13.2); the patch suffix (ie. v1)
// is an optional non-capturing subgroup.
static MAJOR_MINOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+\.\d+)(?:v\d+)?$").expect("version pattern"));

/// Extract the `major.minor` portion of a Nuke version string.
///
/// The submitter normally passes the full version (ie. `13.2v4`), but a bare
/// `major.minor` is accepted too. Unrecognized strings are returned unchanged
/// with a warning so executable lookup can still be attempted.
pub fn major_minor_version(nuke_version: &str) -> String {
    match MAJOR_MINOR_RE.captures(nuke_version) {
        Some(captures) => {
            let major_minor = captures[1].to_string();
            info!(version = %major_minor, "using major.minor to find Nuke executable");
            major_minor
        }
        None => {
            warn!(
                version = %nuke_version,
                "could not find major.minor information, using the value as-is to find the Nuke executable"
            );
            nuke_version.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_patch_suffix() {
        assert_eq!(major_minor_version("13.2v4"), "13.2");
    }

    #[test]
    fn passes_through_major_minor() {
        assert_eq!(major_minor_version("15.0"), "15.0");
    }

    #[test]
    fn unrecognized_strings_are_returned_unchanged() {
        assert_eq!(major_minor_version("nuke-latest"), "nuke-latest");
        assert_eq!(major_minor_version(""), "");
    }
}
