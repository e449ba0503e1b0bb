use sitesmith_core::{AgentKind, CoreError, RunContext, StageName};
use thiserror::Error;

use crate::budget::BudgetBreach;
use crate::runner::AgentFailureKind;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum OrchestratorError {
    #[error("Stage {stage} failed: {agent} gave up after {attempts} attempt(s): {message}")]
    StageFailed {
        stage: StageName,
        agent: AgentKind,
        kind: AgentFailureKind,
        attempts: u32,
        message: String,
    },

    #[error("Budget exceeded at stage {stage}: {breach}")]
    BudgetExceeded {
        stage: StageName,
        breach: BudgetBreach,
    },

    #[error("{agent} failed after {attempts} attempt(s): {message}")]
    AgentFailed {
        agent: AgentKind,
        kind: AgentFailureKind,
        attempts: u32,
        message: String,
    },

    #[error("Merge failed in stage {stage}: {reason}")]
    MergeFailed { stage: StageName, reason: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Run context error: {0}")]
    Context(#[from] CoreError),
}

impl OrchestratorError {
    pub fn stage_failed(
        stage: StageName,
        agent: AgentKind,
        kind: AgentFailureKind,
        attempts: u32,
        message: impl Into<String>,
    ) -> Self {
        Self::StageFailed {
            stage,
            agent,
            kind,
            attempts,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, OrchestratorError>;

/// A run that aborted. The context is terminal (`failed`) and keeps every
/// artifact and ledger entry produced before the abort.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct PipelineFailure {
    pub error: OrchestratorError,
    pub context: Box<RunContext>,
}

impl PipelineFailure {
    pub fn total_cost_usd(&self) -> f64 {
        self.context.total_cost_usd()
    }
}
