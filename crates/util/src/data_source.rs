use std::fs;
use std::path::PathBuf;

use thiserror::Error;
use url::Url;

/// Errors raised while resolving a CLI data argument.
#[derive(Debug, Error)]
pub enum DataSourceError {
    #[error("invalid file URI '{uri}': {reason}")]
    InvalidUri { uri: String, reason: String },

    #[error("could not read data file '{path}': {source}")]
    Unreadable {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Resolve a `--init-data` / `--run-data` / `--path-mapping-rules` argument
/// to its document text.
///
/// Arguments are either `file://` URIs pointing at a YAML document, or the
/// document itself passed inline. Percent-encoding in URIs is decoded by the
/// `url` crate when converting to a filesystem path.
pub fn resolve_data_source(value: &str) -> Result<String, DataSourceError> {
    let trimmed = value.trim();
    if let Some(path) = file_uri_path(trimmed)? {
        return fs::read_to_string(&path).map_err(|source| DataSourceError::Unreadable {
            path,
            source,
        });
    }
    Ok(trimmed.to_string())
}

fn file_uri_path(value: &str) -> Result<Option<PathBuf>, DataSourceError> {
    if !value.to_ascii_lowercase().starts_with("file:") {
        return Ok(None);
    }
    let url = Url::parse(value).map_err(|error| DataSourceError::InvalidUri {
        uri: value.to_string(),
        reason: error.to_string(),
    })?;
    let path = url.to_file_path().map_err(|_| DataSourceError::InvalidUri {
        uri: value.to_string(),
        reason: "URI does not name a local file path".to_string(),
    })?;
    Ok(Some(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn inline_yaml_passes_through() {
        let resolved = resolve_data_source("script_file: /tmp/scene.nk").unwrap();
        assert_eq!(resolved, "script_file: /tmp/scene.nk");
    }

    #[test]
    fn file_uri_is_read_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "frameRange: 1-3").unwrap();
        let uri = format!("file://{}", file.path().display());
        let resolved = resolve_data_source(&uri).unwrap();
        assert_eq!(resolved.trim(), "frameRange: 1-3");
    }

    #[test]
    fn percent_encoded_uri_paths_are_decoded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("init data.yaml");
        fs::write(&path, "proxy: true").unwrap();
        let uri = format!(
            "file://{}/init%20data.yaml",
            dir.path().display()
        );
        let resolved = resolve_data_source(&uri).unwrap();
        assert_eq!(resolved, "proxy: true");
    }

    #[test]
    fn missing_file_reports_path() {
        let error = resolve_data_source("file:///does/not/exist.yaml").unwrap_err();
        assert!(matches!(error, DataSourceError::Unreadable { .. }));
    }

    #[test]
    fn remote_host_uri_is_rejected() {
        let error = resolve_data_source("file://render-host/tmp/init.yaml").unwrap_err();
        assert!(matches!(error, DataSourceError::InvalidUri { .. }));
    }
}
