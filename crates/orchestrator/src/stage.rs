//! Stage definitions and the parallel agent step.
//!
//! A stage is a named step of the pipeline. Agent stages run every listed
//! agent concurrently against an independent snapshot of the run context and
//! waits for all of them before recording anything.

use futures::future::join_all;
use sitesmith_core::{AgentKind, Artifact, ArtifactKey, CreativeBrief, RunContext, StageName};
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

use crate::agents::{agent_for, Agent, AgentInput};
use crate::error::{OrchestratorError, Result};
use crate::runner::{AgentResult, AgentRunner};

/// Combines the outputs of a stage's agents, ordered by [`AgentKind`].
pub type MergeFn = fn(&[(AgentKind, &Artifact)]) -> std::result::Result<Artifact, String>;

/// What a stage does when it runs.
#[derive(Clone)]
pub enum StageStep {
    /// Run agents concurrently, optionally merging their outputs into one
    /// extra artifact.
    Agents {
        agents: Vec<Arc<dyn Agent>>,
        merge: Option<(ArtifactKey, MergeFn)>,
    },
    /// The Developer/Reviewer loop.
    AutoFix,
}

#[derive(Clone)]
pub struct StageSpec {
    pub name: StageName,
    pub step: StageStep,
    /// A failure of a required stage aborts the run.
    pub required: bool,
    /// Artifacts copied into each agent's input snapshot.
    pub inputs: Vec<ArtifactKey>,
}

impl fmt::Debug for StageSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let agents: Vec<AgentKind> = match &self.step {
            StageStep::Agents { agents, .. } => agents.iter().map(|a| a.kind()).collect(),
            StageStep::AutoFix => vec![AgentKind::Developer, AgentKind::Reviewer],
        };
        f.debug_struct("StageSpec")
            .field("name", &self.name)
            .field("agents", &agents)
            .field("required", &self.required)
            .field("inputs", &self.inputs)
            .finish()
    }
}

impl StageSpec {
    pub fn single(name: StageName, agent: AgentKind, inputs: Vec<ArtifactKey>) -> Self {
        Self::parallel(name, vec![agent], inputs, None)
    }

    pub fn parallel(
        name: StageName,
        agents: Vec<AgentKind>,
        inputs: Vec<ArtifactKey>,
        merge: Option<(ArtifactKey, MergeFn)>,
    ) -> Self {
        Self {
            name,
            step: StageStep::Agents {
                agents: agents.into_iter().map(agent_for).collect(),
                merge,
            },
            required: true,
            inputs,
        }
    }

    pub fn auto_fix(inputs: Vec<ArtifactKey>) -> Self {
        Self {
            name: StageName::AutoFix,
            step: StageStep::AutoFix,
            required: true,
            inputs,
        }
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn agents(&self) -> Vec<AgentKind> {
        match &self.step {
            StageStep::Agents { agents, .. } => agents.iter().map(|a| a.kind()).collect(),
            StageStep::AutoFix => vec![AgentKind::Developer, AgentKind::Reviewer],
        }
    }
}

/// Runs an agent stage and records its results into the context.
///
/// Results are recorded in declaration order whatever order the agents
/// finished in. Each success stores its output under the agent's output key.
/// The merge runs only when every agent succeeded.
pub async fn run_agents(
    runner: &AgentRunner,
    ctx: &mut RunContext,
    stage: StageName,
    agents: &[Arc<dyn Agent>],
    inputs: &[ArtifactKey],
    merge: Option<(ArtifactKey, MergeFn)>,
    required: bool,
) -> Result<()> {
    let snapshots: Vec<AgentInput> = agents
        .iter()
        .map(|_| AgentInput::from_context(ctx, inputs))
        .collect();

    info!(%stage, agents = agents.len(), "Running stage agents");
    let results: Vec<AgentResult> = join_all(
        agents
            .iter()
            .zip(snapshots.iter())
            .map(|(agent, input)| runner.run(agent.as_ref(), input)),
    )
    .await;

    let mut first_failure = None;
    let mut outputs: Vec<(AgentKind, Artifact)> = Vec::new();

    for result in results {
        ctx.record_agent_run(result.to_record(stage))?;
        match result {
            AgentResult::Success(success) => {
                ctx.insert_artifact(success.agent.output_key(), stage, success.output.clone())?;
                outputs.push((success.agent, success.output));
            }
            AgentResult::Failure(failure) => {
                if !required {
                    warn!(
                        %stage,
                        agent = %failure.agent,
                        error = %failure.message,
                        "Optional agent failed, continuing"
                    );
                    continue;
                }
                if first_failure.is_none() {
                    first_failure = Some(OrchestratorError::stage_failed(
                        stage,
                        failure.agent,
                        failure.kind,
                        failure.attempts.len() as u32,
                        failure.message,
                    ));
                }
            }
        }
    }

    if let Some(err) = first_failure {
        return Err(err);
    }

    if let Some((key, merge_fn)) = merge {
        if outputs.len() == agents.len() {
            outputs.sort_by_key(|(kind, _)| *kind);
            let borrowed: Vec<(AgentKind, &Artifact)> =
                outputs.iter().map(|(kind, artifact)| (*kind, artifact)).collect();
            let merged = merge_fn(&borrowed)
                .map_err(|reason| OrchestratorError::MergeFailed { stage, reason })?;
            ctx.insert_artifact(key, stage, merged)?;
        }
    }

    Ok(())
}

/// Merges Copywriter and Art Director output into one creative brief.
pub fn merge_creative_brief(
    outputs: &[(AgentKind, &Artifact)],
) -> std::result::Result<Artifact, String> {
    let mut copy = None;
    let mut design = None;
    for (_, artifact) in outputs {
        match artifact {
            Artifact::Copy(c) => copy = Some(c.clone()),
            Artifact::Design(d) => design = Some(d.clone()),
            other => return Err(format!("unexpected {} artifact", other.kind_str())),
        }
    }
    match (copy, design) {
        (Some(copy), Some(design)) => Ok(Artifact::Brief(CreativeBrief { copy, design })),
        (None, _) => Err("copy output is missing".to_string()),
        (_, None) => Err("design output is missing".to_string()),
    }
}
