//! CLI command implementations.

pub mod evaluate;
pub mod history;
pub mod policy;
pub mod workspace;

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::domain::models::Action;

#[derive(Deserialize)]
#[serde(untagged)]
enum ActionFile {
    Many(Vec<Action>),
    One(Box<Action>),
}

/// Read an action, or a list of actions, from a YAML file.
pub fn load_actions(path: &Path) -> Result<Vec<Action>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    parse_actions(&text).with_context(|| format!("Invalid action file {}", path.display()))
}

fn parse_actions(text: &str) -> Result<Vec<Action>> {
    Ok(match serde_yaml::from_str::<ActionFile>(text)? {
        ActionFile::Many(actions) => actions,
        ActionFile::One(action) => vec![*action],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::ActionKind;

    #[test]
    fn test_parse_single_action() {
        let actions = parse_actions(
            "tool: file_write\nkind: mutating\nestimated_loc_delta: 120\ntarget_files: [src/lib.rs]\n",
        )
        .unwrap();
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].kind, ActionKind::Mutating);
        assert_eq!(actions[0].estimated_loc_delta, 120);
    }

    #[test]
    fn test_parse_action_list() {
        let actions = parse_actions(
            "- tool: grep_search\n  kind: read_only\n- tool: file_edit\n  kind: mutating\n  new_dependencies: [regex]\n",
        )
        .unwrap();
        assert_eq!(actions.len(), 2);
        assert_ne!(actions[0].id, actions[1].id);
        assert_eq!(actions[1].new_dependencies, vec!["regex".to_string()]);
    }

    #[test]
    fn test_missing_tool_is_an_error() {
        assert!(parse_actions("kind: mutating\n").is_err());
    }
}
