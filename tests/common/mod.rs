//! Common test utilities for integration tests
//!
//! Scripted collaborators for driving the refinement loop and the session
//! governor without a model provider or real tools.

#![allow(dead_code)]

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use warden::adapters::{AutoConfirm, InMemoryHistory, InMemoryWorkspace};
use warden::domain::errors::{DomainError, DomainResult};
use warden::domain::models::{Action, Budget, FileState, Issue, Policy};
use warden::domain::ports::{
    AgentResponse, ChangeAgent, ConfirmationHandler, Review, Reviewer, ToolExecutor,
    Verification, Verifier,
};
use warden::services::{Collaborators, SessionState};

/// Tokens reported for every scripted model call.
pub const TOKENS_PER_CALL: u64 = 100;

/// Setup test logging
#[allow(dead_code)]
pub fn setup_test_logging() {
    use tracing_subscriber::fmt;

    let _ = fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

// ---------------------------------------------------------------------------
// Agent
// ---------------------------------------------------------------------------

/// Returns a fixed plan, then queued fix and simplify responses. An empty
/// queue yields no actions.
#[derive(Default)]
pub struct ScriptedAgent {
    plan: Vec<Action>,
    fixes: Mutex<VecDeque<Vec<Action>>>,
    simplifications: Mutex<VecDeque<Vec<Action>>>,
    pub plan_calls: AtomicUsize,
    pub fix_calls: AtomicUsize,
    pub simplify_calls: AtomicUsize,
}

impl ScriptedAgent {
    pub fn new(plan: Vec<Action>) -> Self {
        Self {
            plan,
            ..Default::default()
        }
    }

    pub fn with_fix(self, actions: Vec<Action>) -> Self {
        self.fixes.lock().unwrap().push_back(actions);
        self
    }

    pub fn with_simplification(self, actions: Vec<Action>) -> Self {
        self.simplifications.lock().unwrap().push_back(actions);
        self
    }

    pub fn total_calls(&self) -> usize {
        self.plan_calls.load(Ordering::SeqCst)
            + self.fix_calls.load(Ordering::SeqCst)
            + self.simplify_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChangeAgent for ScriptedAgent {
    async fn plan(&self, _iteration: u32) -> DomainResult<AgentResponse> {
        self.plan_calls.fetch_add(1, Ordering::SeqCst);
        Ok(AgentResponse::new(self.plan.clone(), TOKENS_PER_CALL))
    }

    async fn fix(&self, _iteration: u32, _failures: &[Issue]) -> DomainResult<AgentResponse> {
        self.fix_calls.fetch_add(1, Ordering::SeqCst);
        let actions = self.fixes.lock().unwrap().pop_front().unwrap_or_default();
        Ok(AgentResponse::new(actions, TOKENS_PER_CALL))
    }

    async fn simplify(&self, _iteration: u32, _issues: &[Issue]) -> DomainResult<AgentResponse> {
        self.simplify_calls.fetch_add(1, Ordering::SeqCst);
        let actions = self
            .simplifications
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_default();
        Ok(AgentResponse::new(actions, TOKENS_PER_CALL))
    }
}

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

/// Writes `<tool>:<action id>` into every target file of the workspace.
/// Tools listed in `failing` return an error instead.
pub struct WorkspaceExecutor {
    workspace: Arc<InMemoryWorkspace>,
    failing: HashSet<String>,
    pub executed: Mutex<Vec<Action>>,
}

impl WorkspaceExecutor {
    pub fn new(workspace: Arc<InMemoryWorkspace>) -> Self {
        Self {
            workspace,
            failing: HashSet::new(),
            executed: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_on(mut self, tool: &str) -> Self {
        self.failing.insert(tool.to_string());
        self
    }

    pub fn executed_count(&self) -> usize {
        self.executed.lock().unwrap().len()
    }
}

#[async_trait]
impl ToolExecutor for WorkspaceExecutor {
    async fn execute(&self, action: &Action) -> DomainResult<()> {
        for path in &action.target_files {
            self.workspace
                .write(path.clone(), format!("{}:{}", action.tool, action.id))
                .await;
        }
        if self.failing.contains(&action.tool) {
            return Err(DomainError::ToolExecutionFailed {
                tool: action.tool.clone(),
                reason: "scripted failure".to_string(),
            });
        }
        self.executed.lock().unwrap().push(action.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Verifier and reviewer
// ---------------------------------------------------------------------------

/// Pops queued verification results; passes once the queue is empty.
#[derive(Default)]
pub struct ScriptedVerifier {
    results: Mutex<VecDeque<Verification>>,
    pub calls: AtomicUsize,
}

impl ScriptedVerifier {
    pub fn passing() -> Self {
        Self::default()
    }

    pub fn failing_times(times: usize, issue: Issue) -> Self {
        let verifier = Self::default();
        for _ in 0..times {
            verifier
                .results
                .lock()
                .unwrap()
                .push_back(Verification::failed(vec![issue.clone()]));
        }
        verifier
    }
}

#[async_trait]
impl Verifier for ScriptedVerifier {
    async fn verify(&self) -> DomainResult<Verification> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(Verification::passed))
    }
}

type ReviewFn = Box<dyn Fn(u32) -> Vec<Issue> + Send + Sync>;

/// Reports whatever the closure returns for the iteration index.
pub struct ScriptedReviewer {
    review: ReviewFn,
    pub calls: AtomicUsize,
}

impl ScriptedReviewer {
    pub fn new(review: impl Fn(u32) -> Vec<Issue> + Send + Sync + 'static) -> Self {
        Self {
            review: Box::new(review),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn clean() -> Self {
        Self::new(|_| Vec::new())
    }

    /// A new critical finding every iteration.
    pub fn always_critical() -> Self {
        Self::new(|i| vec![Issue::critical(format!("E{i}"), "still broken")])
    }
}

#[async_trait]
impl Reviewer for ScriptedReviewer {
    async fn review(&self, iteration: u32) -> DomainResult<Review> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Review {
            issues: (self.review)(iteration),
            usage: warden::domain::ports::ModelUsage {
                tokens: TOKENS_PER_CALL,
            },
        })
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

/// Everything a loop test needs, with handles kept for assertions.
pub struct Harness {
    pub workspace: Arc<InMemoryWorkspace>,
    pub agent: Arc<ScriptedAgent>,
    pub executor: Arc<WorkspaceExecutor>,
    pub verifier: Arc<ScriptedVerifier>,
    pub reviewer: Arc<ScriptedReviewer>,
    pub history: Arc<InMemoryHistory>,
    pub confirmer: Arc<dyn ConfirmationHandler>,
}

impl Harness {
    pub fn new(agent: ScriptedAgent, reviewer: ScriptedReviewer) -> Self {
        let workspace = Arc::new(InMemoryWorkspace::new(
            FileState::new().with_file("src/lib.rs", "pub fn original() {}"),
        ));
        Self {
            executor: Arc::new(WorkspaceExecutor::new(workspace.clone())),
            workspace,
            agent: Arc::new(agent),
            verifier: Arc::new(ScriptedVerifier::passing()),
            reviewer: Arc::new(reviewer),
            history: Arc::new(InMemoryHistory::new()),
            confirmer: Arc::new(AutoConfirm),
        }
    }

    pub fn with_verifier(mut self, verifier: ScriptedVerifier) -> Self {
        self.verifier = Arc::new(verifier);
        self
    }

    pub fn with_executor(mut self, executor: WorkspaceExecutor) -> Self {
        self.executor = Arc::new(executor);
        self
    }

    pub fn with_confirmer(mut self, confirmer: impl ConfirmationHandler + 'static) -> Self {
        self.confirmer = Arc::new(confirmer);
        self
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            agent: self.agent.clone(),
            executor: self.executor.clone(),
            verifier: self.verifier.clone(),
            reviewer: self.reviewer.clone(),
            history: self.history.clone(),
            confirmer: self.confirmer.clone(),
        }
    }

    pub fn session(&self, policy: Policy, budget: f64) -> SessionState {
        SessionState::new(Arc::new(policy), Budget::new(budget), self.workspace.clone())
    }

    pub async fn file(&self, path: &str) -> Option<String> {
        self.workspace
            .read(path)
            .await
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// A mutating edit of `src/lib.rs` with the given LOC delta.
pub fn edit(loc: i64) -> Action {
    Action::mutating("file_edit")
        .with_summary(format!("edit {loc} lines"))
        .with_loc_delta(loc)
        .with_targets(["src/lib.rs"])
}
