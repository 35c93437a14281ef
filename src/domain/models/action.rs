//! Proposed units of work.

use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Whether an action changes the workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Changes the workspace; needs the Act phase and a checkpoint.
    Mutating,
    /// Observes only.
    ReadOnly,
}

impl ActionKind {
    /// Stable lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mutating => "mutating",
            Self::ReadOnly => "read_only",
        }
    }
}

/// A proposed unit of work. Immutable once built: gates and the alternative
/// generator derive new actions rather than editing one in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// Unique per action; derived variants get a fresh one.
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    /// Tool that would carry the action out.
    pub tool: String,
    /// Mutating or read-only.
    pub kind: ActionKind,
    /// Free-form description from the planner.
    #[serde(default)]
    pub summary: String,
    /// Signed estimate of lines added minus lines removed.
    #[serde(default)]
    pub estimated_loc_delta: i64,
    /// Dependencies the action would add.
    #[serde(default)]
    pub new_dependencies: Vec<String>,
    /// New types or modules the action would introduce.
    #[serde(default)]
    pub new_abstractions: u32,
    /// Workspace-relative files the action touches.
    #[serde(default)]
    pub target_files: Vec<PathBuf>,
    /// 0.0 to 1.0.
    #[serde(default)]
    pub security_risk: f64,
    /// 0.0 to 1.0.
    #[serde(default)]
    pub tool_risk: f64,
}

impl Action {
    /// Blank action of the given kind.
    pub fn new(tool: impl Into<String>, kind: ActionKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            tool: tool.into(),
            kind,
            summary: String::new(),
            estimated_loc_delta: 0,
            new_dependencies: Vec::new(),
            new_abstractions: 0,
            target_files: Vec::new(),
            security_risk: 0.0,
            tool_risk: 0.0,
        }
    }

    /// Blank mutating action.
    pub fn mutating(tool: impl Into<String>) -> Self {
        Self::new(tool, ActionKind::Mutating)
    }

    /// Blank read-only action.
    pub fn read_only(tool: impl Into<String>) -> Self {
        Self::new(tool, ActionKind::ReadOnly)
    }

    /// Set the summary.
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    /// Set the estimated LOC delta.
    pub fn with_loc_delta(mut self, delta: i64) -> Self {
        self.estimated_loc_delta = delta;
        self
    }

    /// Set the new dependencies.
    pub fn with_dependencies<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.new_dependencies = deps.into_iter().map(Into::into).collect();
        self
    }

    /// Set the number of new abstractions.
    pub fn with_abstractions(mut self, count: u32) -> Self {
        self.new_abstractions = count;
        self
    }

    /// Set the target files.
    pub fn with_targets<I, P>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.target_files = files.into_iter().map(Into::into).collect();
        self
    }

    /// Set the security and tool risk scores.
    pub fn with_risk(mut self, security: f64, tool: f64) -> Self {
        self.security_risk = security;
        self.tool_risk = tool;
        self
    }

    /// Whether the action changes the workspace.
    pub fn is_mutating(&self) -> bool {
        self.kind == ActionKind::Mutating
    }

    /// The first target that resolves outside the workspace root.
    pub fn escaping_target(&self) -> Option<&Path> {
        self.target_files
            .iter()
            .map(PathBuf::as_path)
            .find(|p| escapes_root(p))
    }

    /// A copy of this action under a fresh id, for derived variants.
    pub fn derive(&self) -> Self {
        Self {
            id: Uuid::new_v4(),
            ..self.clone()
        }
    }
}

/// Whether a workspace-relative path resolves outside the root: absolute
/// paths, and paths whose `..` components climb above it.
pub fn escapes_root(path: &Path) -> bool {
    let mut depth = 0usize;
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => return true,
            Component::CurDir => {}
            Component::ParentDir => match depth.checked_sub(1) {
                Some(up) => depth = up,
                None => return true,
            },
            Component::Normal(_) => depth += 1,
        }
    }
    false
}
