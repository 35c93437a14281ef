//! Evaluate, price and envelope commands.
//!
//! `evaluate` runs every action in a file through the gate sequence against
//! one in-memory session, so approved actions draw down the budget seen by
//! later ones. No workspace files are touched. Decisions are appended to
//! the configured history file, if any.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;
use uuid::Uuid;

use crate::adapters::{InMemoryWorkspace, JsonlHistory};
use crate::cli::display::{
    list_table, output, render_list, short_id, truncate_ellipsis, CommandOutput, DetailView,
};
use crate::domain::models::{
    Action, Budget, Cost, Decision, ExecutionPhase, HistoryEntry, HistoryRecord,
    SpecificationBudget,
};
use crate::domain::ports::HistorySink;
use crate::infrastructure::config::WardenConfig;
use crate::services::{CostPricer, GateSequence, SessionState};

use super::load_actions;

/// One action's decision within an evaluation run.
#[derive(Debug, Serialize)]
pub struct EvaluatedAction {
    /// Action identifier.
    pub action_id: Uuid,
    /// Tool the action invokes.
    pub tool: String,
    /// Action summary.
    pub summary: String,
    /// Gate decision.
    pub decision: Decision,
    /// Budget left after this action.
    pub remaining_after: f64,
}

/// Result of `warden evaluate`.
#[derive(Debug, Serialize)]
pub struct EvaluationOutput {
    /// Phase the actions were evaluated in.
    pub phase: ExecutionPhase,
    /// Budget before the first action.
    pub initial_budget: f64,
    /// Per-action decisions in input order.
    pub results: Vec<EvaluatedAction>,
    /// Budget left after the run.
    pub remaining: f64,
    /// Budget debited by approved actions.
    pub spent: f64,
}

impl CommandOutput for EvaluationOutput {
    fn to_human(&self) -> String {
        let mut blocks = Vec::with_capacity(self.results.len() + 1);
        for result in &self.results {
            let mut view = DetailView::new(&format!(
                "{} {} ({})",
                short_id(&result.action_id.to_string()),
                result.tool,
                result.decision.label()
            ))
            .field_opt(
                "summary",
                (!result.summary.is_empty()).then_some(&result.summary),
            )
            .field_opt("cost", result.decision.cost().map(|c| format!("{:.2}", c.total)))
            .field_opt("gate", result.decision.gate())
            .field("decision", &result.decision)
            .field("remaining", format!("{:.2}", result.remaining_after));

            if !result.decision.alternatives().is_empty() {
                view = view.section("Alternatives");
                for alt in result.decision.alternatives() {
                    view = view.item(format!(
                        "{} (-{:.2}): {}",
                        alt.strategy, alt.cost_reduction, alt.description
                    ));
                }
            }
            blocks.push(view.render());
        }

        blocks.push(format!(
            "Phase {}: spent {:.2} of {:.2}, {:.2} remaining",
            self.phase, self.spent, self.initial_budget, self.remaining
        ));
        blocks.join("\n\n")
    }
}

/// Gate every action in `file` in order.
pub async fn execute_evaluate(
    config: &WardenConfig,
    file: &Path,
    phase: ExecutionPhase,
    remaining: Option<f64>,
    json_mode: bool,
) -> Result<()> {
    let actions = load_actions(file)?;
    let history = config
        .history_path
        .as_ref()
        .map(|path| Arc::new(JsonlHistory::new(path)) as Arc<dyn HistorySink>);
    let result = evaluate_actions(config, actions, phase, remaining, history).await?;
    output(&result, json_mode);
    Ok(())
}

/// Run `actions` through the gate sequence in one session, recording to `history` when given.
pub async fn evaluate_actions(
    config: &WardenConfig,
    actions: Vec<Action>,
    phase: ExecutionPhase,
    remaining: Option<f64>,
    history: Option<Arc<dyn HistorySink>>,
) -> Result<EvaluationOutput> {
    let initial = remaining.unwrap_or(config.policy.session_limits.max_cost);
    let mut state = SessionState::new(
        Arc::new(config.policy.clone()),
        Budget::new(initial),
        Arc::new(InMemoryWorkspace::default()),
    )
    .with_phase(phase);
    let gates = GateSequence::new();

    let mut results = Vec::with_capacity(actions.len());
    for action in actions {
        let decision = gates.evaluate(&action, &mut state).await?;
        if let Some(history) = &history {
            let record = HistoryRecord::new(
                state.id,
                HistoryEntry::Decision {
                    iteration: 0,
                    action: action.clone(),
                    decision: decision.clone(),
                },
            );
            history.record(&record).await?;
        }
        results.push(EvaluatedAction {
            action_id: action.id,
            tool: action.tool,
            summary: action.summary,
            decision,
            remaining_after: state.budget.remaining,
        });
    }

    Ok(EvaluationOutput {
        phase,
        initial_budget: state.budget.initial,
        results,
        remaining: state.budget.remaining,
        spent: state.budget.spent,
    })
}

/// One action's priced cost.
#[derive(Debug, Serialize)]
pub struct PricedAction {
    /// Action identifier.
    pub action_id: Uuid,
    /// Tool the action invokes.
    pub tool: String,
    /// Action summary.
    pub summary: String,
    /// Per-dimension cost.
    pub cost: Cost,
}

/// Result of `warden price`.
#[derive(Debug, Serialize)]
pub struct PriceOutput {
    /// Priced actions in input order.
    pub actions: Vec<PricedAction>,
    /// Sum of the action totals.
    pub total: f64,
}

impl CommandOutput for PriceOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&[
            "id", "tool", "summary", "loc", "deps", "abstr", "security", "tool risk", "total",
        ]);
        for priced in &self.actions {
            let mut row = vec![
                short_id(&priced.action_id.to_string()).to_string(),
                priced.tool.clone(),
                truncate_ellipsis(&priced.summary, 32),
            ];
            row.extend(
                priced
                    .cost
                    .components()
                    .iter()
                    .map(|(_, value)| format!("{value:.2}")),
            );
            row.push(format!("{:.2}", priced.cost.total));
            table.add_row(row);
        }
        format!(
            "{}\n\nTotal: {:.2}",
            render_list("action", &table, self.actions.len()),
            self.total
        )
    }
}

/// Price the actions in `file` without gating them.
pub fn execute_price(
    config: &WardenConfig,
    file: &Path,
    remaining: Option<f64>,
    json_mode: bool,
) -> Result<()> {
    let budget = Budget::new(remaining.unwrap_or(config.policy.session_limits.max_cost));
    let pricer = CostPricer::from_policy(&config.policy);

    let actions: Vec<PricedAction> = load_actions(file)?
        .into_iter()
        .map(|action| PricedAction {
            cost: pricer.price(&action, &budget),
            action_id: action.id,
            tool: action.tool,
            summary: action.summary,
        })
        .collect();
    let total = actions.iter().map(|a| a.cost.total).sum();

    output(&PriceOutput { actions, total }, json_mode);
    Ok(())
}

/// Result of `warden envelope`.
#[derive(Debug, Serialize)]
pub struct EnvelopeOutput {
    /// Envelope as given.
    pub envelope: SpecificationBudget,
    /// Budget the envelope implies.
    pub budget: f64,
}

impl CommandOutput for EnvelopeOutput {
    fn to_human(&self) -> String {
        DetailView::new("Specification budget")
            .field("max loc delta", self.envelope.max_loc_delta)
            .field("max new files", self.envelope.max_new_files)
            .field("max new deps", self.envelope.max_new_dependencies)
            .field("budget", format!("{:.2}", self.budget))
            .render()
    }
}

/// Print the budget implied by `envelope`.
pub fn execute_envelope(
    config: &WardenConfig,
    envelope: SpecificationBudget,
    json_mode: bool,
) -> Result<()> {
    let budget = CostPricer::from_policy(&config.policy).price_envelope(&envelope);
    output(&EnvelopeOutput { envelope, budget }, json_mode);
    Ok(())
}
