use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{FrameRange, InitData};

/// Action name that asks the client to close the script and exit.
pub const ACTION_CLOSE: &str = "close";

/// Action name that kicks off a render for a frame range.
pub const ACTION_START_RENDER: &str = "start_render";

/// Init actions that must be queued before any others. Opening the script
/// has to happen before node or view configuration can succeed.
const FIRST_ACTIONS: &[&str] = &["script_file"];

/// A single command fed to the in-Nuke client over the sticky session.
///
/// Actions are queued by the adaptor lifecycle and drained one at a time by
/// the client polling `GET /action`. The args map preserves insertion order
/// so payloads serialize the way they were built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// Name of the handler the client should invoke.
    pub name: String,
    /// Arguments for the handler, keyed by parameter name.
    #[serde(default)]
    pub args: IndexMap<String, Value>,
}

impl Action {
    /// Create an action with no arguments.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: IndexMap::new(),
        }
    }

    /// Create an action carrying a single argument keyed by the action name,
    /// which is the convention for init-data actions.
    pub fn with_arg(name: impl Into<String>, value: Value) -> Self {
        let name = name.into();
        let mut args = IndexMap::new();
        args.insert(name.clone(), value);
        Self { name, args }
    }

    /// Build the `start_render` action for a frame range.
    pub fn start_render(frame_range: &FrameRange) -> Self {
        let mut args = IndexMap::new();
        args.insert(
            "frameRange".to_string(),
            Value::String(frame_range.to_string()),
        );
        Self {
            name: ACTION_START_RENDER.to_string(),
            args,
        }
    }

    /// Build the ordered list of init actions for the given init data.
    ///
    /// `script_file` always comes first; the remaining keys are only queued
    /// when present in the init data.
    pub fn init_actions(init_data: &InitData) -> Vec<Action> {
        let mut actions = Vec::new();
        for name in FIRST_ACTIONS {
            if let Some(value) = init_data.action_value(name) {
                actions.push(Action::with_arg(*name, value));
            }
        }
        for name in ["continue_on_error", "proxy", "write_nodes", "views"] {
            if let Some(value) = init_data.action_value(name) {
                actions.push(Action::with_arg(name, value));
            }
        }
        actions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn full_init_data() -> InitData {
        InitData {
            script_file: PathBuf::from("/path/to/some/nukescript.nk"),
            continue_on_error: true,
            proxy: true,
            write_nodes: Some(vec!["Write1".into(), "Write2".into()]),
            views: Some(vec!["left".into(), "right".into()]),
            telemetry_opt_out: false,
        }
    }

    #[test]
    fn script_file_is_queued_first() {
        let actions = Action::init_actions(&full_init_data());
        assert_eq!(actions[0].name, "script_file");
        assert_eq!(
            actions[0].args.get("script_file"),
            Some(&Value::String("/path/to/some/nukescript.nk".into()))
        );
    }

    #[test]
    fn absent_init_keys_are_not_queued() {
        let mut init_data = full_init_data();
        init_data.write_nodes = None;
        init_data.views = None;
        let names: Vec<String> = Action::init_actions(&init_data)
            .into_iter()
            .map(|action| action.name)
            .collect();
        assert_eq!(names, vec!["script_file", "continue_on_error", "proxy"]);
    }

    #[test]
    fn start_render_carries_camel_case_frame_range() {
        let range: FrameRange = "1-10".parse().unwrap();
        let action = Action::start_render(&range);
        assert_eq!(action.name, ACTION_START_RENDER);
        assert_eq!(
            action.args.get("frameRange"),
            Some(&Value::String("1-10".into()))
        );
    }

    #[test]
    fn serializes_with_name_and_args() {
        let action = Action::with_arg("proxy", Value::Bool(true));
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"name": "proxy", "args": {"proxy": true}})
        );
    }
}
