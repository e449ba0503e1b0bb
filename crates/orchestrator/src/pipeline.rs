//! Pipeline orchestrator: runs the stage graph for one business description.
//!
//! Strategy → Creative (Copywriter ∥ Art Director) → Auto-Fix → SEO. The budget
//! is checked before every stage and once more after the last one; a breach or
//! a required stage failure aborts the run and hands back the partial, failed
//! context.

use events::{Event, EventBus, StageStatus};
use providers::ProviderRegistry;
use sitesmith_core::{
    AgentKind, Artifact, ArtifactKey, CostEntry, CostSummary, FailureKind, PageArtifact, PageCopy,
    RunContext, RunFailure, RunStatus, StageName, VariantSet,
};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{error, info, instrument, warn};

use crate::agents::{agent_for, AgentInput};
use crate::autofix::AutoFixLoop;
use crate::budget::Budget;
use crate::config::PipelineConfig;
use crate::error::{OrchestratorError, PipelineFailure, Result};
use crate::runner::{AgentFailureKind, AgentResult, AgentRunner, AgentSuccess};
use crate::stage::{merge_creative_brief, run_agents, MergeFn, StageSpec, StageStep};

/// Result of a refinement request.
#[derive(Debug, Clone)]
pub struct RefinementOutcome {
    pub page: PageArtifact,
    /// False when the instruction was blank and nothing was called.
    pub changed: bool,
    pub cost: CostSummary,
    pub entries: Vec<CostEntry>,
}

#[derive(Debug, Clone)]
pub struct VariantOutcome {
    pub variants: VariantSet,
    pub cost: CostSummary,
    pub entries: Vec<CostEntry>,
}

/// The landing page stage graph.
pub fn default_stages() -> Vec<StageSpec> {
    vec![
        StageSpec::single(StageName::Strategy, AgentKind::Strategist, vec![]),
        StageSpec::parallel(
            StageName::Creative,
            vec![AgentKind::Copywriter, AgentKind::ArtDirector],
            vec![ArtifactKey::Strategy],
            Some((ArtifactKey::Brief, merge_creative_brief as MergeFn)),
        ),
        StageSpec::auto_fix(vec![ArtifactKey::Strategy, ArtifactKey::Brief]),
        StageSpec::single(
            StageName::Seo,
            AgentKind::SeoOptimizer,
            vec![ArtifactKey::Strategy, ArtifactKey::Page],
        ),
    ]
}

pub struct Orchestrator {
    config: Arc<PipelineConfig>,
    providers: ProviderRegistry,
    events: Option<EventBus>,
    stages: Vec<StageSpec>,
}

impl Orchestrator {
    pub fn new(config: PipelineConfig, providers: ProviderRegistry) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
            providers,
            events: None,
            stages: default_stages(),
        })
    }

    pub fn with_event_bus(mut self, bus: EventBus) -> Self {
        self.events = Some(bus);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn stages(&self) -> &[StageSpec] {
        &self.stages
    }

    fn runner(&self) -> AgentRunner {
        AgentRunner::new(self.config.clone(), self.providers.clone())
            .with_event_bus(self.events.clone())
    }

    fn emit(&self, event: Event) {
        if let Some(bus) = &self.events {
            bus.emit(event);
        }
    }

    async fn sync_ledger(runner: &AgentRunner, ctx: &mut RunContext) -> Result<()> {
        let new_entries = runner.ledger().entries_since(ctx.ledger().len()).await;
        ctx.record_costs(new_entries)?;
        Ok(())
    }

    async fn execute_stage(
        &self,
        runner: &AgentRunner,
        ctx: &mut RunContext,
        spec: &StageSpec,
    ) -> Result<()> {
        match &spec.step {
            StageStep::Agents { agents, merge } => {
                run_agents(
                    runner,
                    ctx,
                    spec.name,
                    agents,
                    &spec.inputs,
                    *merge,
                    spec.required,
                )
                .await
            }
            StageStep::AutoFix => {
                AutoFixLoop::new(
                    runner,
                    &self.config.auto_fix,
                    self.events.as_ref(),
                    &spec.inputs,
                )
                .run(ctx)
                .await?;
                Ok(())
            }
        }
    }

    fn abort(
        &self,
        mut ctx: RunContext,
        stage: StageName,
        error: OrchestratorError,
        started: Instant,
    ) -> PipelineFailure {
        let failure = match &error {
            OrchestratorError::StageFailed {
                stage,
                agent,
                attempts,
                ..
            } => RunFailure {
                kind: FailureKind::StageFailed,
                stage: *stage,
                agent: Some(*agent),
                attempts: *attempts,
                message: error.to_string(),
            },
            OrchestratorError::BudgetExceeded { stage, .. } => RunFailure {
                kind: FailureKind::BudgetExceeded,
                stage: *stage,
                agent: None,
                attempts: 0,
                message: error.to_string(),
            },
            other => RunFailure {
                kind: FailureKind::StageFailed,
                stage,
                agent: None,
                attempts: 0,
                message: other.to_string(),
            },
        };

        error!(run_id = %ctx.id, %stage, error = %error, "Run aborted");
        if let Err(err) = ctx.fail(failure) {
            warn!(error = %err, "Could not mark run as failed");
        }
        self.emit(Event::Error {
            message: error.to_string(),
            context: Some(format!("stage {stage}")),
        });
        self.emit(Event::RunFinished {
            run_id: ctx.id,
            status: RunStatus::Failed,
            elapsed_ms: started.elapsed().as_millis() as u64,
            total_cost_usd: ctx.total_cost_usd(),
        });

        PipelineFailure {
            error,
            context: Box::new(ctx),
        }
    }

    /// Runs every stage for `business_description`.
    ///
    /// On success the context is `succeeded` and holds every artifact. On
    /// failure the returned [`PipelineFailure`] carries the `failed` context with
    /// whatever was produced and paid for up to the abort.
    #[instrument(skip_all, fields(template = %self.config.template, language = %self.config.language))]
    pub async fn run(
        &self,
        business_description: impl Into<String>,
    ) -> std::result::Result<RunContext, PipelineFailure> {
        let started = Instant::now();
        let mut ctx = RunContext::new(
            business_description,
            &self.config.template,
            &self.config.language,
        );
        let first_stage = self
            .stages
            .first()
            .map(|s| s.name)
            .unwrap_or(StageName::Strategy);
        if let Err(err) = ctx.start() {
            return Err(self.abort(ctx, first_stage, err.into(), started));
        }

        info!(run_id = %ctx.id, "Pipeline run started");
        self.emit(Event::RunStarted {
            run_id: ctx.id,
            template: ctx.template.clone(),
            language: ctx.language.clone(),
        });

        let runner = self.runner();
        let budget = Budget::start(&self.config.budget);

        for spec in &self.stages {
            if let Err(error) = check_budget(&budget, &ctx, spec.name) {
                return Err(self.abort(ctx, spec.name, error, started));
            }

            info!(stage = %spec.name, agents = ?spec.agents(), "Stage started");
            self.emit(Event::StageStarted {
                run_id: ctx.id,
                stage: spec.name,
            });
            let stage_started = Instant::now();

            let result = self.execute_stage(&runner, &mut ctx, spec).await;
            let synced = Self::sync_ledger(&runner, &mut ctx).await;
            let result = result.and(synced);

            let status = if result.is_ok() {
                StageStatus::Succeeded
            } else {
                StageStatus::Failed
            };
            let elapsed_ms = stage_started.elapsed().as_millis() as u64;
            self.emit(Event::StageCompleted {
                run_id: ctx.id,
                stage: spec.name,
                status,
                elapsed_ms,
                cumulative_cost_usd: ctx.total_cost_usd(),
            });

            match result {
                Ok(()) => info!(
                    stage = %spec.name,
                    elapsed_ms,
                    cumulative_cost_usd = ctx.total_cost_usd(),
                    "Stage completed"
                ),
                Err(err) => return Err(self.abort(ctx, spec.name, err, started)),
            }
        }

        let last_stage = self
            .stages
            .last()
            .map(|s| s.name)
            .unwrap_or(StageName::Seo);
        if let Err(error) = check_budget(&budget, &ctx, last_stage) {
            return Err(self.abort(ctx, last_stage, error, started));
        }
        if let Err(err) = ctx.succeed() {
            return Err(self.abort(ctx, last_stage, err.into(), started));
        }

        for warning in ctx.warnings() {
            warn!(run_id = %ctx.id, %warning, "Run finished with warning");
        }
        info!(
            run_id = %ctx.id,
            total_cost_usd = ctx.total_cost_usd(),
            ledger_entries = ctx.ledger().len(),
            "Pipeline run succeeded"
        );
        self.emit(Event::RunFinished {
            run_id: ctx.id,
            status: RunStatus::Succeeded,
            elapsed_ms: started.elapsed().as_millis() as u64,
            total_cost_usd: ctx.total_cost_usd(),
        });
        Ok(ctx)
    }

    /// Applies a free-text change to a finished page.
    ///
    /// A blank instruction returns the page unchanged without calling a provider.
    #[instrument(skip_all, fields(revision = page.revision))]
    pub async fn refine(&self, page: &PageArtifact, instruction: &str) -> Result<RefinementOutcome> {
        if instruction.trim().is_empty() {
            info!("Empty refinement instruction, page unchanged");
            return Ok(RefinementOutcome {
                page: page.clone(),
                changed: false,
                cost: CostSummary::default(),
                entries: Vec::new(),
            });
        }

        let runner = self.runner();
        let input = AgentInput::new("", &self.config.template, &self.config.language)
            .with_artifact(ArtifactKey::Page, Artifact::Page(page.clone()))
            .with_instruction(instruction.trim());
        let agent = agent_for(AgentKind::Refinement);
        let result = runner.run(agent.as_ref(), &input).await;
        let entries = runner.ledger().snapshot().await.entries().to_vec();

        match result {
            AgentResult::Success(success) => {
                let refined = refined_page(page, &success)?;
                info!(revision = refined.revision, cost_usd = success.cost.cost_usd, "Page refined");
                Ok(RefinementOutcome {
                    page: refined,
                    changed: true,
                    cost: success.cost,
                    entries,
                })
            }
            AgentResult::Failure(failure) => Err(OrchestratorError::AgentFailed {
                agent: failure.agent,
                kind: failure.kind,
                attempts: failure.attempts.len() as u32,
                message: failure.message,
            }),
        }
    }

    /// Produces A/B alternatives for existing copy. The copy itself is untouched.
    #[instrument(skip_all)]
    pub async fn generate_variant(&self, copy: &PageCopy) -> Result<VariantOutcome> {
        let runner = self.runner();
        let input = AgentInput::new("", &self.config.template, &self.config.language)
            .with_artifact(ArtifactKey::Copy, Artifact::Copy(copy.clone()));
        let agent = agent_for(AgentKind::AbVariant);
        let result = runner.run(agent.as_ref(), &input).await;
        let entries = runner.ledger().snapshot().await.entries().to_vec();

        match result {
            AgentResult::Success(success) => {
                let variants = variants_of(&success)?;
                info!(elements = variants.variants.len(), "Variants generated");
                Ok(VariantOutcome {
                    variants,
                    cost: success.cost,
                    entries,
                })
            }
            AgentResult::Failure(failure) => Err(OrchestratorError::AgentFailed {
                agent: failure.agent,
                kind: failure.kind,
                attempts: failure.attempts.len() as u32,
                message: failure.message,
            }),
        }
    }
}

fn check_budget(budget: &Budget, ctx: &RunContext, stage: StageName) -> Result<()> {
    match budget.check(ctx.total_cost_usd()) {
        Some(breach) => {
            warn!(%stage, %breach, "Budget exceeded");
            Err(OrchestratorError::BudgetExceeded { stage, breach })
        }
        None => Ok(()),
    }
}

fn unexpected_output(success: &AgentSuccess, message: &str) -> OrchestratorError {
    OrchestratorError::AgentFailed {
        agent: success.agent,
        kind: AgentFailureKind::OutputValidationFailed,
        attempts: success.attempts.len() as u32,
        message: message.to_string(),
    }
}

fn refined_page(page: &PageArtifact, success: &AgentSuccess) -> Result<PageArtifact> {
    success
        .output
        .as_page()
        .map(|refined| page.next_revision(refined.html.clone()))
        .ok_or_else(|| unexpected_output(success, "refinement returned a non-page artifact"))
}

fn variants_of(success: &AgentSuccess) -> Result<VariantSet> {
    success
        .output
        .as_variants()
        .cloned()
        .ok_or_else(|| unexpected_output(success, "variant agent returned no variant set"))
}
