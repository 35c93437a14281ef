//! History CLI command.

use std::path::PathBuf;

use anyhow::{bail, Result};
use serde::Serialize;

use crate::adapters::JsonlHistory;
use crate::cli::display::{
    list_table, output, render_list, short_id, truncate_ellipsis, CommandOutput,
};
use crate::domain::models::{HistoryEntry, HistoryRecord};
use crate::infrastructure::config::WardenConfig;

const KINDS: [&str; 3] = ["decision", "iteration", "outcome"];

/// Result of `warden history`.
#[derive(Debug, Serialize)]
pub struct HistoryOutput {
    /// History file read.
    pub path: PathBuf,
    /// Records in file order.
    pub records: Vec<HistoryRecord>,
}

impl CommandOutput for HistoryOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["recorded", "session", "kind", "detail"]);
        for record in &self.records {
            table.add_row(vec![
                record.recorded_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                short_id(&record.session_id.to_string()).to_string(),
                record.kind().to_string(),
                truncate_ellipsis(&describe(&record.entry), 72),
            ]);
        }
        render_list("record", &table, self.records.len())
    }
}

/// Show the records in `file`, optionally filtered by kind.
pub async fn execute(
    config: &WardenConfig,
    file: Option<PathBuf>,
    kind: Option<String>,
    json_mode: bool,
) -> Result<()> {
    let Some(path) = file.or_else(|| config.history_path.clone()) else {
        bail!("No history file given and history_path is not configured");
    };
    if let Some(kind) = kind.as_deref() {
        if !KINDS.contains(&kind) {
            bail!("Invalid kind '{kind}'. Must be one of: {}", KINDS.join(", "));
        }
    }

    let mut records = JsonlHistory::new(&path).read_all().await?;
    if let Some(kind) = kind.as_deref() {
        records.retain(|r| r.kind() == kind);
    }

    output(&HistoryOutput { path, records }, json_mode);
    Ok(())
}

fn describe(entry: &HistoryEntry) -> String {
    match entry {
        HistoryEntry::Decision {
            iteration,
            action,
            decision,
        } => format!("#{iteration} {}: {decision}", action.tool),
        HistoryEntry::Iteration { iteration } => format!(
            "#{} loc {:+}, cost {:.2}, {} issue(s), {} critical",
            iteration.index,
            iteration.loc_delta,
            iteration.estimated_cost,
            iteration.issues.len(),
            iteration.critical_count()
        ),
        HistoryEntry::Outcome { outcome } => outcome.to_string(),
    }
}
