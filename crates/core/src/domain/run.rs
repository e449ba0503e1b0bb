use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::agent::{AgentKind, StageName};
use super::artifact::{
    Artifact, ArtifactKey, CreativeBrief, DesignTokens, PageArtifact, PageCopy, ReviewIssue,
    ReviewReport, Strategy,
};
use super::ledger::{AttemptOutcome, CostEntry, CostLedger};
use crate::error::{CoreError, Result};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    #[default]
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "running" => Some(Self::Running),
            "succeeded" => Some(Self::Succeeded),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AttemptRecord {
    pub attempt: u32,
    pub outcome: AttemptOutcome,
    pub message: Option<String>,
    pub latency_ms: u64,
}

/// All attempts of one agent invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentRunRecord {
    pub agent: AgentKind,
    pub stage: StageName,
    pub succeeded: bool,
    pub attempts: Vec<AttemptRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArtifactEntry {
    pub key: ArtifactKey,
    pub stage: StageName,
    pub artifact: Artifact,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AutoFixSummary {
    /// Reviewer invocations performed.
    pub iterations: u32,
    pub max_iterations: u32,
    pub approved: bool,
    pub remaining_issues: Vec<ReviewIssue>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunWarning {
    AutoFixExhausted {
        iterations: u32,
        remaining_issues: usize,
    },
}

impl fmt::Display for RunWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AutoFixExhausted {
                iterations,
                remaining_issues,
            } => write!(
                f,
                "auto-fix gave up after {iterations} review(s) with {remaining_issues} issue(s) left"
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    StageFailed,
    BudgetExceeded,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunFailure {
    pub kind: FailureKind,
    pub stage: StageName,
    pub agent: Option<AgentKind>,
    pub attempts: u32,
    pub message: String,
}

/// State threaded through one pipeline run.
///
/// Artifacts and ledger entries are append-only; once the run reaches a terminal
/// status every mutator returns [`CoreError::RunTerminal`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunContext {
    pub id: Uuid,
    pub business_description: String,
    pub template: String,
    pub language: String,
    status: RunStatus,
    artifacts: Vec<ArtifactEntry>,
    ledger: CostLedger,
    history: Vec<AgentRunRecord>,
    warnings: Vec<RunWarning>,
    auto_fix: Option<AutoFixSummary>,
    failure: Option<RunFailure>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunContext {
    pub fn new(
        business_description: impl Into<String>,
        template: impl Into<String>,
        language: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            business_description: business_description.into(),
            template: template.into(),
            language: language.into(),
            status: RunStatus::default(),
            artifacts: Vec::new(),
            ledger: CostLedger::new(),
            history: Vec::new(),
            warnings: Vec::new(),
            auto_fix: None,
            failure: None,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
        }
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_terminal() {
            return Err(CoreError::RunTerminal(self.id));
        }
        Ok(())
    }

    fn transition(&mut self, to: RunStatus) -> Result<()> {
        let allowed = matches!(
            (self.status, to),
            (RunStatus::Pending, RunStatus::Running)
                | (RunStatus::Running, RunStatus::Succeeded)
                | (RunStatus::Pending, RunStatus::Failed)
                | (RunStatus::Running, RunStatus::Failed)
        );
        if !allowed {
            return Err(CoreError::InvalidStatusTransition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }

    pub fn start(&mut self) -> Result<()> {
        self.transition(RunStatus::Running)?;
        self.started_at = Some(Utc::now());
        Ok(())
    }

    pub fn succeed(&mut self) -> Result<()> {
        self.transition(RunStatus::Succeeded)?;
        self.finished_at = Some(Utc::now());
        Ok(())
    }

    pub fn fail(&mut self, failure: RunFailure) -> Result<()> {
        self.transition(RunStatus::Failed)?;
        self.failure = Some(failure);
        self.finished_at = Some(Utc::now());
        Ok(())
    }

    pub fn insert_artifact(
        &mut self,
        key: ArtifactKey,
        stage: StageName,
        artifact: Artifact,
    ) -> Result<()> {
        self.ensure_open()?;
        if self.has_artifact(key) {
            return Err(CoreError::DuplicateArtifact(key));
        }
        self.artifacts.push(ArtifactEntry {
            key,
            stage,
            artifact,
        });
        Ok(())
    }

    pub fn record_costs<I: IntoIterator<Item = CostEntry>>(&mut self, entries: I) -> Result<()> {
        self.ensure_open()?;
        self.ledger.extend(entries);
        Ok(())
    }

    pub fn record_agent_run(&mut self, record: AgentRunRecord) -> Result<()> {
        self.ensure_open()?;
        self.history.push(record);
        Ok(())
    }

    pub fn warn(&mut self, warning: RunWarning) -> Result<()> {
        self.ensure_open()?;
        self.warnings.push(warning);
        Ok(())
    }

    pub fn set_auto_fix(&mut self, summary: AutoFixSummary) -> Result<()> {
        self.ensure_open()?;
        self.auto_fix = Some(summary);
        Ok(())
    }

    pub fn has_artifact(&self, key: ArtifactKey) -> bool {
        self.artifacts.iter().any(|e| e.key == key)
    }

    pub fn artifact(&self, key: ArtifactKey) -> Option<&Artifact> {
        self.artifacts
            .iter()
            .find(|e| e.key == key)
            .map(|e| &e.artifact)
    }

    /// Artifacts in insertion (stage) order.
    pub fn artifacts(&self) -> &[ArtifactEntry] {
        &self.artifacts
    }

    pub fn artifact_keys(&self) -> Vec<ArtifactKey> {
        self.artifacts.iter().map(|e| e.key).collect()
    }

    pub fn strategy(&self) -> Option<&Strategy> {
        self.artifact(ArtifactKey::Strategy)?.as_strategy()
    }

    pub fn copy(&self) -> Option<&PageCopy> {
        self.artifact(ArtifactKey::Copy)?.as_copy()
    }

    pub fn design(&self) -> Option<&DesignTokens> {
        self.artifact(ArtifactKey::Design)?.as_design()
    }

    pub fn brief(&self) -> Option<&CreativeBrief> {
        self.artifact(ArtifactKey::Brief)?.as_brief()
    }

    pub fn page(&self) -> Option<&PageArtifact> {
        self.artifact(ArtifactKey::Page)?.as_page()
    }

    pub fn review(&self) -> Option<&ReviewReport> {
        self.artifact(ArtifactKey::Review)?.as_review()
    }

    pub fn seo_page(&self) -> Option<&PageArtifact> {
        self.artifact(ArtifactKey::Seo)?.as_page()
    }

    /// The SEO-optimized page when present, otherwise the last Developer page.
    pub fn final_page(&self) -> Option<&PageArtifact> {
        self.seo_page().or_else(|| self.page())
    }

    pub fn ledger(&self) -> &CostLedger {
        &self.ledger
    }

    pub fn total_cost_usd(&self) -> f64 {
        self.ledger.total_cost_usd()
    }

    pub fn history(&self) -> &[AgentRunRecord] {
        &self.history
    }

    pub fn history_for(&self, agent: AgentKind) -> impl Iterator<Item = &AgentRunRecord> {
        self.history.iter().filter(move |r| r.agent == agent)
    }

    pub fn warnings(&self) -> &[RunWarning] {
        &self.warnings
    }

    pub fn auto_fix(&self) -> Option<&AutoFixSummary> {
        self.auto_fix.as_ref()
    }

    pub fn failure(&self) -> Option<&RunFailure> {
        self.failure.as_ref()
    }
}
