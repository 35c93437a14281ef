//! Display framework for CLI output formatting.
//!
//! Shared primitives for tables and detail views used by every command.

pub mod detail;
pub mod format;
pub mod table;

use serde::Serialize;

pub use detail::DetailView;
pub use format::{count_label, short_id, truncate_ellipsis};
pub use table::{list_table, render_list};

/// Trait for types that can be rendered as human-readable or JSON output.
pub trait CommandOutput: Serialize {
    /// Render for a terminal.
    fn to_human(&self) -> String;

    /// Render as a JSON value.
    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Dispatch output based on JSON mode flag.
pub fn output<T: CommandOutput>(result: &T, json_mode: bool) {
    if json_mode {
        println!(
            "{}",
            serde_json::to_string_pretty(&result.to_json()).unwrap_or_default()
        );
    } else {
        println!("{}", result.to_human());
    }
}

/// Render a success line.
pub fn action_success(message: &str) -> String {
    format!("{} {}", console::style("\u{2713}").green().bold(), message)
}

/// Render a failure line.
pub fn action_failure(message: &str) -> String {
    format!("{} {}", console::style("\u{2717}").red().bold(), message)
}
