//! The Developer/Reviewer auto-fix loop.

use events::{Event, EventBus};
use sitesmith_core::{
    AgentKind, Artifact, ArtifactKey, AutoFixSummary, PageArtifact, ReviewIssue, ReviewReport,
    ReviewVerdict, RunContext, RunWarning, StageName,
};
use tracing::{info, warn};

use crate::agents::{agent_for, AgentInput};
use crate::config::AutoFixConfig;
use crate::error::{OrchestratorError, Result};
use crate::runner::{AgentFailureKind, AgentResult, AgentRunner, AgentSuccess};

/// What the loop does after a review.
#[derive(Debug, Clone, PartialEq)]
pub enum AutoFixStep {
    Approved,
    /// Run the Developer again with these issues.
    Fix(Vec<ReviewIssue>),
    /// Ceiling reached with issues left.
    Exhausted(Vec<ReviewIssue>),
}

/// Loop state. `iteration` counts Reviewer invocations and never exceeds
/// `max_iterations`.
#[derive(Debug, Clone)]
pub struct AutoFixState {
    pub page: PageArtifact,
    pub last_report: Option<ReviewReport>,
    pub iteration: u32,
    pub max_iterations: u32,
}

impl AutoFixState {
    pub fn new(page: PageArtifact, max_iterations: u32) -> Self {
        Self {
            page,
            last_report: None,
            iteration: 0,
            max_iterations,
        }
    }

    pub fn verdict(&self) -> Option<ReviewVerdict> {
        self.last_report.as_ref().map(ReviewReport::verdict)
    }

    pub fn is_approved(&self) -> bool {
        self.verdict().is_some_and(|v| v.is_approved())
    }

    pub fn record_review(&mut self, report: ReviewReport) -> AutoFixStep {
        self.iteration = (self.iteration + 1).min(self.max_iterations.max(1));
        let verdict = report.verdict();
        self.last_report = Some(report);
        match verdict {
            ReviewVerdict::Approved => AutoFixStep::Approved,
            ReviewVerdict::NeedsFix(issues) if self.iteration >= self.max_iterations => {
                AutoFixStep::Exhausted(issues)
            }
            ReviewVerdict::NeedsFix(issues) => AutoFixStep::Fix(issues),
        }
    }

    /// Replaces the current page with a fixed one, bumping the revision.
    pub fn apply_fix(&mut self, fixed: PageArtifact) {
        self.page = self.page.next_revision(fixed.html);
    }

    pub fn summary(&self) -> AutoFixSummary {
        let remaining_issues = match self.verdict() {
            Some(ReviewVerdict::NeedsFix(issues)) => issues,
            _ => Vec::new(),
        };
        AutoFixSummary {
            iterations: self.iteration,
            max_iterations: self.max_iterations,
            approved: self.is_approved(),
            remaining_issues,
        }
    }
}

fn unexpected_output(success: &AgentSuccess, message: &str) -> OrchestratorError {
    OrchestratorError::stage_failed(
        StageName::AutoFix,
        success.agent,
        AgentFailureKind::OutputValidationFailed,
        success.attempts.len() as u32,
        message,
    )
}

/// Drives the auto-fix stage against a run context.
pub struct AutoFixLoop<'a> {
    runner: &'a AgentRunner,
    config: &'a AutoFixConfig,
    events: Option<&'a EventBus>,
    inputs: &'a [ArtifactKey],
}

impl<'a> AutoFixLoop<'a> {
    pub fn new(
        runner: &'a AgentRunner,
        config: &'a AutoFixConfig,
        events: Option<&'a EventBus>,
        inputs: &'a [ArtifactKey],
    ) -> Self {
        Self {
            runner,
            config,
            events,
            inputs,
        }
    }

    async fn call(
        &self,
        ctx: &mut RunContext,
        kind: AgentKind,
        input: AgentInput,
    ) -> std::result::Result<AgentSuccess, OrchestratorError> {
        let agent = agent_for(kind);
        let result = self.runner.run(agent.as_ref(), &input).await;
        ctx.record_agent_run(result.to_record(StageName::AutoFix))?;
        match result {
            AgentResult::Success(success) => Ok(success),
            AgentResult::Failure(failure) => Err(OrchestratorError::stage_failed(
                StageName::AutoFix,
                failure.agent,
                failure.kind,
                failure.attempts.len() as u32,
                failure.message,
            )),
        }
    }

    fn page_of(success: &AgentSuccess) -> Result<PageArtifact> {
        success
            .output
            .as_page()
            .cloned()
            .ok_or_else(|| unexpected_output(success, "developer returned a non-page artifact"))
    }

    fn report_of(success: &AgentSuccess) -> Result<ReviewReport> {
        success
            .output
            .as_review()
            .cloned()
            .ok_or_else(|| unexpected_output(success, "reviewer returned a non-review artifact"))
    }

    fn emit(&self, ctx: &RunContext, state: &AutoFixState, blocking_issues: usize) {
        if let Some(bus) = self.events {
            bus.emit(Event::AutoFixIteration {
                run_id: ctx.id,
                iteration: state.iteration,
                max_iterations: state.max_iterations,
                approved: state.is_approved(),
                blocking_issues,
            });
        }
    }

    fn finish(ctx: &mut RunContext, state: &AutoFixState) -> Result<()> {
        ctx.insert_artifact(
            ArtifactKey::Page,
            StageName::AutoFix,
            Artifact::Page(state.page.clone()),
        )?;
        if let Some(report) = &state.last_report {
            ctx.insert_artifact(
                ArtifactKey::Review,
                StageName::AutoFix,
                Artifact::Review(report.clone()),
            )?;
        }
        ctx.set_auto_fix(state.summary())?;
        Ok(())
    }

    pub async fn run(&self, ctx: &mut RunContext) -> Result<AutoFixSummary> {
        let input = AgentInput::from_context(ctx, self.inputs);
        let initial = self.call(ctx, AgentKind::Developer, input).await?;
        let page = Self::page_of(&initial)?;

        if !self.config.enabled || self.config.max_iterations == 0 {
            info!("Auto-fix disabled, keeping first developer page");
            ctx.insert_artifact(ArtifactKey::Page, StageName::AutoFix, Artifact::Page(page))?;
            let summary = AutoFixSummary {
                iterations: 0,
                max_iterations: self.config.max_iterations,
                approved: false,
                remaining_issues: Vec::new(),
            };
            ctx.set_auto_fix(summary.clone())?;
            return Ok(summary);
        }

        let mut state = AutoFixState::new(page, self.config.max_iterations);

        loop {
            let input = AgentInput::from_context(ctx, self.inputs)
                .with_artifact(ArtifactKey::Page, Artifact::Page(state.page.clone()));
            let report = match self.call(ctx, AgentKind::Reviewer, input).await {
                Ok(success) => Self::report_of(&success)?,
                Err(err) => {
                    Self::finish(ctx, &state)?;
                    return Err(err);
                }
            };

            let step = state.record_review(report);
            let blocking = match &step {
                AutoFixStep::Approved => 0,
                AutoFixStep::Fix(issues) | AutoFixStep::Exhausted(issues) => issues.len(),
            };
            self.emit(ctx, &state, blocking);
            info!(
                iteration = state.iteration,
                max_iterations = state.max_iterations,
                blocking_issues = blocking,
                "Review finished"
            );

            match step {
                AutoFixStep::Approved => break,
                AutoFixStep::Exhausted(issues) => {
                    warn!(
                        iterations = state.iteration,
                        remaining_issues = issues.len(),
                        "Auto-fix ceiling reached, keeping last page"
                    );
                    ctx.warn(RunWarning::AutoFixExhausted {
                        iterations: state.iteration,
                        remaining_issues: issues.len(),
                    })?;
                    break;
                }
                AutoFixStep::Fix(issues) => {
                    let input = AgentInput::from_context(ctx, self.inputs)
                        .with_artifact(ArtifactKey::Page, Artifact::Page(state.page.clone()))
                        .with_issues(issues);
                    match self.call(ctx, AgentKind::Developer, input).await {
                        Ok(success) => state.apply_fix(Self::page_of(&success)?),
                        Err(err) => {
                            Self::finish(ctx, &state)?;
                            return Err(err);
                        }
                    }
                }
            }
        }

        Self::finish(ctx, &state)?;
        Ok(state.summary())
    }
}
