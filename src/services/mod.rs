//! Service layer: pricing, gating, checkpoints and the governed loop.

pub mod alternative_generator;
pub mod checkpoint_manager;
pub mod convergence_detector;
pub mod cost_pricer;
pub mod gate_sequence;
pub mod refinement_loop;
pub mod session_governor;
pub mod session_state;

pub use alternative_generator::AlternativeGenerator;
pub use checkpoint_manager::CheckpointManager;
pub use convergence_detector::ConvergenceDetector;
pub use cost_pricer::CostPricer;
pub use gate_sequence::{GateCheck, GateSequence};
pub use refinement_loop::{Collaborators, IterationStep, LoopStage, RefinementLoop};
pub use session_governor::SessionGovernor;
pub use session_state::SessionState;
