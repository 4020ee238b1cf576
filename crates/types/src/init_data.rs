use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Errors produced while validating an init-data document.
#[derive(Debug, Error)]
pub enum InitDataError {
    #[error("script_file must not be empty")]
    EmptyScriptFile,

    #[error("no {name} were specified")]
    EmptyList { name: &'static str },

    #[error("{name} entries must be non-empty strings")]
    BlankListEntry { name: &'static str },
}

/// Session-scoped parameters supplied at adaptor start via `--init-data`.
///
/// These configure the render application once, before any task runs, and
/// stay in effect for the lifetime of the sticky session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InitData {
    /// The Nuke script to open. Path mapping is applied by the job
    /// parameters before this reaches the adaptor.
    pub script_file: PathBuf,

    /// Whether the render should keep going when a node errors.
    #[serde(default = "default_true")]
    pub continue_on_error: bool,

    /// Render in proxy mode.
    #[serde(default)]
    pub proxy: bool,

    /// Write nodes to run, in render order. The sentinel value
    /// `"All Write Nodes"` asks the client to run every enabled write node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_nodes: Option<Vec<String>>,

    /// Views to render for each write node. The sentinel value `"All Views"`
    /// leaves view selection to each node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub views: Option<Vec<String>>,

    /// Accepted for submitter compatibility; telemetry is not part of this
    /// adaptor and the flag has no effect.
    #[serde(default)]
    pub telemetry_opt_out: bool,
}

fn default_true() -> bool {
    true
}

impl InitData {
    /// Validate field contents beyond what deserialization enforces.
    pub fn validate(&self) -> Result<(), InitDataError> {
        if self.script_file.as_os_str().is_empty() {
            return Err(InitDataError::EmptyScriptFile);
        }
        validate_list(self.write_nodes.as_deref(), "write nodes")?;
        validate_list(self.views.as_deref(), "views")?;
        Ok(())
    }

    /// JSON value for an init action argument, or `None` when the key is
    /// absent from this init data.
    pub fn action_value(&self, name: &str) -> Option<Value> {
        match name {
            "script_file" => Some(Value::String(
                self.script_file.to_string_lossy().into_owned(),
            )),
            "continue_on_error" => Some(Value::Bool(self.continue_on_error)),
            "proxy" => Some(Value::Bool(self.proxy)),
            "write_nodes" => self.write_nodes.as_ref().map(|nodes| {
                Value::Array(nodes.iter().cloned().map(Value::String).collect())
            }),
            "views" => self
                .views
                .as_ref()
                .map(|views| Value::Array(views.iter().cloned().map(Value::String).collect())),
            _ => None,
        }
    }
}

fn validate_list(list: Option<&[String]>, name: &'static str) -> Result<(), InitDataError> {
    let Some(list) = list else {
        return Ok(());
    };
    if list.is_empty() {
        return Err(InitDataError::EmptyList { name });
    }
    if list.iter().any(|entry| entry.trim().is_empty()) {
        return Err(InitDataError::BlankListEntry { name });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_DOC: &str = "\
continue_on_error: true
proxy: true
script_file: /path/to/some/nukescript.nk
write_nodes:
  - Write1
  - Write2
  - Write3
views:
  - left
  - right
";

    #[test]
    fn deserializes_documented_init_data() {
        let init_data: InitData = serde_yaml::from_str(FULL_DOC).unwrap();
        assert_eq!(init_data.script_file, PathBuf::from("/path/to/some/nukescript.nk"));
        assert!(init_data.continue_on_error);
        assert!(init_data.proxy);
        assert_eq!(init_data.write_nodes.as_ref().unwrap().len(), 3);
        assert_eq!(
            init_data.views,
            Some(vec!["left".to_string(), "right".to_string()])
        );
        init_data.validate().unwrap();
    }

    #[test]
    fn defaults_apply_with_minimal_document() {
        let init_data: InitData =
            serde_yaml::from_str("script_file: /tmp/scene.nk").unwrap();
        assert!(init_data.continue_on_error);
        assert!(!init_data.proxy);
        assert!(init_data.write_nodes.is_none());
        assert!(init_data.views.is_none());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result: Result<InitData, _> =
            serde_yaml::from_str("script_file: /tmp/scene.nk\nframe: 1");
        assert!(result.is_err());
    }

    #[test]
    fn empty_write_nodes_fail_validation() {
        let init_data: InitData =
            serde_yaml::from_str("script_file: /tmp/scene.nk\nwrite_nodes: []").unwrap();
        assert!(matches!(
            init_data.validate(),
            Err(InitDataError::EmptyList { name: "write nodes" })
        ));
    }

    #[test]
    fn blank_view_names_fail_validation() {
        let init_data: InitData =
            serde_yaml::from_str("script_file: /tmp/scene.nk\nviews: [\"left\", \"  \"]").unwrap();
        assert!(matches!(
            init_data.validate(),
            Err(InitDataError::BlankListEntry { name: "views" })
        ));
    }
}
