//! Integration tests for the refinement loop
//!
//! Drives RefinementLoop::run end to end against scripted collaborators and
//! an in-memory workspace.

mod common;

use std::sync::atomic::Ordering;

use common::{edit, Harness, ScriptedAgent, ScriptedReviewer, ScriptedVerifier, WorkspaceExecutor};
use warden::adapters::DenyConfirm;
use warden::domain::models::{
    AbandonReason, Action, HistoryEntry, Issue, Policy, SessionOutcome, Severity, StuckReason,
};
use warden::services::{LoopStage, RefinementLoop};

fn policy_with_iterations(max: u32) -> Policy {
    let mut policy = Policy::default();
    policy.refinement.max_iterations = max;
    policy
}

#[tokio::test]
async fn test_clean_review_completes_first_iteration() {
    let action = edit(40);
    let harness = Harness::new(ScriptedAgent::new(vec![action.clone()]), ScriptedReviewer::clean());
    let mut state = harness.session(Policy::default(), 1000.0);

    let mut refinement = RefinementLoop::new(harness.collaborators());
    let outcome = refinement.run(&mut state).await.unwrap();

    match outcome {
        SessionOutcome::Completed { result, iterations } => {
            assert_eq!(iterations, 1);
            assert_eq!(result.approved_actions, 1);
            assert_eq!(result.loc_delta, 40);
        }
        other => panic!("Expected Completed, got {:?}", other),
    }
    assert_eq!(refinement.stage(), LoopStage::Done);
    assert!((state.budget.spent - 40.0).abs() < 1e-9);
    assert_eq!(
        harness.file("src/lib.rs").await.unwrap(),
        format!("file_edit:{}", action.id)
    );

    let kinds: Vec<&str> = harness
        .history
        .records()
        .await
        .iter()
        .map(|r| r.kind())
        .collect();
    assert_eq!(kinds, vec!["decision", "iteration", "outcome"]);
}

#[tokio::test]
async fn test_always_critical_abandons_after_max_iterations() {
    let first = edit(40);
    let second = edit(10);
    let third = edit(80);
    let agent = ScriptedAgent::new(vec![first])
        .with_simplification(vec![second.clone()])
        .with_simplification(vec![third]);
    let harness = Harness::new(agent, ScriptedReviewer::always_critical());
    let mut state = harness.session(policy_with_iterations(3), 1000.0);

    let mut refinement = RefinementLoop::new(harness.collaborators());
    let outcome = refinement.run(&mut state).await.unwrap();

    match &outcome {
        SessionOutcome::Abandoned {
            reason,
            best_effort,
            restored_to,
        } => {
            assert_eq!(*reason, AbandonReason::MaxIterations { max: 3 });
            assert_eq!(best_effort.as_ref().map(|it| it.index), Some(1));
            assert!(restored_to.is_some());
        }
        other => panic!("Expected Abandoned, got {:?}", other),
    }
    assert_eq!(harness.reviewer.calls.load(Ordering::SeqCst), 3);
    assert_eq!(harness.agent.simplify_calls.load(Ordering::SeqCst), 2);
    assert_eq!(refinement.stage(), LoopStage::Abandoned);

    // The third iteration's edit is undone; the second one's survives.
    assert_eq!(
        harness.file("src/lib.rs").await.unwrap(),
        format!("file_edit:{}", second.id)
    );
    assert!((state.budget.spent - 50.0).abs() < 1e-9);
    assert!((state.budget.remaining - 950.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_repeated_findings_are_detected_as_stuck() {
    let agent = ScriptedAgent::new(vec![edit(40)])
        .with_simplification(vec![edit(10)])
        .with_simplification(vec![edit(80)]);
    let reviewer = ScriptedReviewer::new(|_| vec![Issue::critical("E1", "same finding")]);
    let harness = Harness::new(agent, reviewer);
    let mut state = harness.session(policy_with_iterations(10), 1000.0);

    let outcome = RefinementLoop::new(harness.collaborators())
        .run(&mut state)
        .await
        .unwrap();

    match outcome {
        SessionOutcome::Abandoned {
            reason: AbandonReason::Stuck(StuckReason::RepeatedIssues { codes }),
            ..
        } => assert_eq!(codes, vec!["E1".to_string()]),
        other => panic!("Expected stuck abandonment, got {:?}", other),
    }
    assert_eq!(harness.reviewer.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_fix_rounds_until_verification_passes() {
    let agent = ScriptedAgent::new(vec![edit(40)])
        .with_fix(vec![edit(5)])
        .with_fix(vec![edit(6)]);
    let harness = Harness::new(agent, ScriptedReviewer::clean())
        .with_verifier(ScriptedVerifier::failing_times(2, Issue::critical("T1", "test failed")));
    let mut state = harness.session(Policy::default(), 1000.0);

    let outcome = RefinementLoop::new(harness.collaborators())
        .run(&mut state)
        .await
        .unwrap();

    match outcome {
        SessionOutcome::Completed { result, .. } => {
            assert_eq!(result.fix_attempts, 2);
            assert_eq!(result.approved_actions, 3);
            assert_eq!(result.loc_delta, 51);
        }
        other => panic!("Expected Completed, got {:?}", other),
    }
    assert_eq!(harness.agent.fix_calls.load(Ordering::SeqCst), 2);
    assert_eq!(harness.verifier.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_unresolved_verification_failures_become_critical() {
    let failure = Issue::new("T1", Severity::Minor, "flaky test");
    let harness = Harness::new(ScriptedAgent::new(vec![edit(40)]), ScriptedReviewer::clean())
        .with_verifier(ScriptedVerifier::failing_times(3, failure));
    let mut state = harness.session(policy_with_iterations(1), 1000.0);

    let outcome = RefinementLoop::new(harness.collaborators())
        .run(&mut state)
        .await
        .unwrap();

    assert!(matches!(
        outcome,
        SessionOutcome::Abandoned {
            reason: AbandonReason::MaxIterations { max: 1 },
            best_effort: None,
            restored_to: Some(_),
        }
    ));
    assert_eq!(harness.agent.fix_calls.load(Ordering::SeqCst), 2);

    let iterations = harness.history.of_kind("iteration").await;
    match &iterations[0].entry {
        HistoryEntry::Iteration { iteration } => {
            assert!(iteration
                .issues
                .iter()
                .any(|i| i.code == "T1" && i.severity == Severity::Critical));
        }
        other => panic!("Expected iteration record, got {:?}", other),
    }
    assert_eq!(harness.file("src/lib.rs").await.unwrap(), "pub fn original() {}");
    assert!((state.budget.remaining - 1000.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_declined_confirmation_refunds_and_skips_execution() {
    // 400 lands between the auto-proceed and prompt thresholds.
    let harness = Harness::new(ScriptedAgent::new(vec![edit(400)]), ScriptedReviewer::clean())
        .with_confirmer(DenyConfirm);
    let mut state = harness.session(Policy::default(), 1000.0);

    let outcome = RefinementLoop::new(harness.collaborators())
        .run(&mut state)
        .await
        .unwrap();

    match outcome {
        SessionOutcome::Completed { result, .. } => {
            assert_eq!(result.approved_actions, 0);
            assert_eq!(result.rejected_actions, 1);
        }
        other => panic!("Expected Completed, got {:?}", other),
    }
    assert_eq!(harness.executor.executed_count(), 0);
    assert!((state.budget.remaining - 1000.0).abs() < 1e-9);
    assert!(state.checkpoints.is_empty());
    assert_eq!(harness.file("src/lib.rs").await.unwrap(), "pub fn original() {}");
}

#[tokio::test]
async fn test_tool_failure_rolls_back_and_is_critical() {
    let harness = Harness::new(ScriptedAgent::new(vec![edit(40)]), ScriptedReviewer::clean());
    let executor = WorkspaceExecutor::new(harness.workspace.clone()).failing_on("file_edit");
    let harness = harness.with_executor(executor);
    let mut state = harness.session(policy_with_iterations(1), 1000.0);

    let outcome = RefinementLoop::new(harness.collaborators())
        .run(&mut state)
        .await
        .unwrap();

    assert!(matches!(outcome, SessionOutcome::Abandoned { .. }));
    assert_eq!(harness.file("src/lib.rs").await.unwrap(), "pub fn original() {}");
    assert!((state.budget.remaining - 1000.0).abs() < 1e-9);

    let iterations = harness.history.of_kind("iteration").await;
    match &iterations[0].entry {
        HistoryEntry::Iteration { iteration } => {
            assert!(iteration.issues.iter().any(|i| i.code == "tool_failure:file_edit"));
        }
        other => panic!("Expected iteration record, got {:?}", other),
    }
}

#[tokio::test]
async fn test_all_actions_rejected_ends_rejected() {
    let harness = Harness::new(
        ScriptedAgent::new(vec![Action::mutating("rocket_launcher").with_loc_delta(10)]),
        ScriptedReviewer::clean(),
    );
    let mut state = harness.session(Policy::default(), 1000.0);

    let outcome = RefinementLoop::new(harness.collaborators())
        .run(&mut state)
        .await
        .unwrap();

    match outcome {
        SessionOutcome::Rejected { reason, .. } => assert!(reason.contains("rocket_launcher")),
        other => panic!("Expected Rejected, got {:?}", other),
    }
    assert_eq!(harness.reviewer.calls.load(Ordering::SeqCst), 0);
    assert_eq!(harness.verifier.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_over_budget_without_resubmit_returns_alternatives() {
    let mut policy = Policy::default();
    policy.refinement.auto_resubmit_alternatives = false;
    let harness = Harness::new(ScriptedAgent::new(vec![edit(1840)]), ScriptedReviewer::clean());
    let mut state = harness.session(policy, 1000.0);

    let outcome = RefinementLoop::new(harness.collaborators())
        .run(&mut state)
        .await
        .unwrap();

    assert_eq!(outcome.label(), "rejected");
    assert!(!outcome.alternatives().is_empty());
    assert!((state.budget.remaining - 1000.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_alternative_is_resubmitted_automatically() {
    let harness = Harness::new(ScriptedAgent::new(vec![edit(1840)]), ScriptedReviewer::clean());
    let mut state = harness.session(Policy::default(), 1000.0);

    let outcome = RefinementLoop::new(harness.collaborators())
        .run(&mut state)
        .await
        .unwrap();

    match outcome {
        SessionOutcome::Completed { result, .. } => {
            assert_eq!(result.approved_actions, 1);
            assert_eq!(result.loc_delta, 920);
        }
        other => panic!("Expected Completed, got {:?}", other),
    }
    let executed = harness.executor.executed.lock().unwrap().clone();
    assert_eq!(executed[0].estimated_loc_delta, 920);

    let decisions = harness.history.of_kind("decision").await;
    assert_eq!(decisions.len(), 2, "original rejection then revised approval");
}
