//! Landing page pipeline: agents, retry contract, stage graph and auto-fix loop.

pub mod agents;
pub mod autofix;
pub mod budget;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod retry;
pub mod runner;
pub mod stage;

pub use agents::{agent_for, Agent, AgentError, AgentInput};
pub use autofix::{AutoFixLoop, AutoFixState, AutoFixStep};
pub use budget::{Budget, BudgetBreach};
pub use config::{AgentModel, AutoFixConfig, BudgetConfig, ModelsConfig, PipelineConfig};
pub use error::{OrchestratorError, PipelineFailure, Result};
pub use pipeline::{default_stages, Orchestrator, RefinementOutcome, VariantOutcome};
pub use retry::{RetryDecision, RetryPolicy, RetryState};
pub use runner::{
    AgentFailure, AgentFailureKind, AgentResult, AgentRunner, AgentSuccess, SharedLedger,
};
pub use stage::{merge_creative_brief, MergeFn, StageSpec, StageStep};
