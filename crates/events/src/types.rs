//! Event types published during a pipeline run

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sitesmith_core::{AgentKind, RunStatus, StageName};
use uuid::Uuid;

/// Envelope wrapping all events with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Unique event ID
    pub id: Uuid,
    /// When the event occurred
    pub timestamp: DateTime<Utc>,
    /// The actual event
    pub event: Event,
}

impl EventEnvelope {
    /// Create a new event envelope with auto-generated ID and timestamp
    pub fn new(event: Event) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            event,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Succeeded,
    Failed,
}

/// All progress events a run can publish
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    #[serde(rename = "run.started")]
    RunStarted {
        run_id: Uuid,
        template: String,
        language: String,
    },

    #[serde(rename = "stage.started")]
    StageStarted { run_id: Uuid, stage: StageName },

    /// Published after every stage, including failed ones
    #[serde(rename = "stage.completed")]
    StageCompleted {
        run_id: Uuid,
        stage: StageName,
        status: StageStatus,
        elapsed_ms: u64,
        cumulative_cost_usd: f64,
    },

    /// An agent attempt failed and will be retried
    #[serde(rename = "agent.retry")]
    AgentRetry {
        agent: AgentKind,
        attempt: u32,
        reason: String,
    },

    /// One Reviewer pass of the auto-fix loop finished
    #[serde(rename = "auto_fix.iteration")]
    AutoFixIteration {
        run_id: Uuid,
        iteration: u32,
        max_iterations: u32,
        approved: bool,
        blocking_issues: usize,
    },

    #[serde(rename = "run.finished")]
    RunFinished {
        run_id: Uuid,
        status: RunStatus,
        elapsed_ms: u64,
        total_cost_usd: f64,
    },

    #[serde(rename = "error")]
    Error {
        message: String,
        context: Option<String>,
    },
}
