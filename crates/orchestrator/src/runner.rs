//! Runs one agent against its provider under the retry/timeout contract.

use chrono::Utc;
use events::{Event, EventBus};
use providers::pricing::estimate_cost;
use providers::{
    CompletionRequest, ErrorKind, ProviderError, ProviderRegistry, SendOptions, TokenUsage,
};
use serde::{Deserialize, Serialize};
use sitesmith_core::{
    AgentKind, AgentRunRecord, Artifact, AttemptOutcome, AttemptRecord, CostEntry, CostLedger,
    CostSummary, StageName,
};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, error, info, instrument, warn};

use crate::agents::{Agent, AgentError, AgentInput};
use crate::config::PipelineConfig;
use crate::retry::{RetryDecision, RetryState};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AgentFailureKind {
    MissingInput,
    ProviderTransient,
    ProviderFatal,
    OutputValidationFailed,
}

impl AgentFailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingInput => "missing_input",
            Self::ProviderTransient => "provider_transient",
            Self::ProviderFatal => "provider_fatal",
            Self::OutputValidationFailed => "output_validation_failed",
        }
    }
}

impl fmt::Display for AgentFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct AgentSuccess {
    pub agent: AgentKind,
    pub output: Artifact,
    pub raw_text: String,
    pub cost: CostSummary,
    pub attempts: Vec<AttemptRecord>,
}

#[derive(Debug, Clone)]
pub struct AgentFailure {
    pub agent: AgentKind,
    pub kind: AgentFailureKind,
    pub message: String,
    pub cost: CostSummary,
    pub attempts: Vec<AttemptRecord>,
}

#[derive(Debug, Clone)]
pub enum AgentResult {
    Success(AgentSuccess),
    Failure(AgentFailure),
}

impl AgentResult {
    pub fn agent(&self) -> AgentKind {
        match self {
            Self::Success(s) => s.agent,
            Self::Failure(f) => f.agent,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn attempts(&self) -> &[AttemptRecord] {
        match self {
            Self::Success(s) => &s.attempts,
            Self::Failure(f) => &f.attempts,
        }
    }

    pub fn attempt_count(&self) -> u32 {
        self.attempts().len() as u32
    }

    pub fn cost(&self) -> CostSummary {
        match self {
            Self::Success(s) => s.cost,
            Self::Failure(f) => f.cost,
        }
    }

    pub fn to_record(&self, stage: StageName) -> AgentRunRecord {
        AgentRunRecord {
            agent: self.agent(),
            stage,
            succeeded: self.is_success(),
            attempts: self.attempts().to_vec(),
        }
    }
}

/// Ledger shared by every agent of a run; one writer at a time.
#[derive(Debug, Clone, Default)]
pub struct SharedLedger {
    inner: Arc<Mutex<CostLedger>>,
}

impl SharedLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn append(&self, entry: CostEntry) {
        self.inner.lock().await.append(entry);
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn total_cost_usd(&self) -> f64 {
        self.inner.lock().await.total_cost_usd()
    }

    /// Entries appended after the first `from`.
    pub async fn entries_since(&self, from: usize) -> Vec<CostEntry> {
        let ledger = self.inner.lock().await;
        ledger.entries().iter().skip(from).cloned().collect()
    }

    pub async fn snapshot(&self) -> CostLedger {
        self.inner.lock().await.clone()
    }
}

fn failure_outcome(err: &ProviderError) -> AttemptOutcome {
    match err.kind() {
        ErrorKind::Transient => AttemptOutcome::TransientFailure,
        ErrorKind::Fatal => AttemptOutcome::FatalFailure,
    }
}

fn corrective_prompt(base: &str, issue: &str) -> String {
    format!(
        "{base}\n\nCRITICAL: Your previous attempt had this issue: {issue}\n\
         Please fix this and try again. Follow the instructions exactly."
    )
}

/// Invokes agents against their configured providers.
///
/// [`AgentRunner::run`] never returns an error: every failure, including a
/// missing provider, becomes [`AgentResult::Failure`].
#[derive(Clone)]
pub struct AgentRunner {
    config: Arc<PipelineConfig>,
    providers: ProviderRegistry,
    ledger: SharedLedger,
    events: Option<EventBus>,
}

impl AgentRunner {
    pub fn new(config: Arc<PipelineConfig>, providers: ProviderRegistry) -> Self {
        Self {
            config,
            providers,
            ledger: SharedLedger::new(),
            events: None,
        }
    }

    pub fn with_event_bus(mut self, bus: Option<EventBus>) -> Self {
        self.events = bus;
        self
    }

    pub fn ledger(&self) -> &SharedLedger {
        &self.ledger
    }

    fn send_options(&self, model: &str) -> SendOptions {
        SendOptions::new(model)
            .with_max_tokens(self.config.max_tokens)
            .with_temperature(self.config.temperature)
            .with_timeout(self.config.call_timeout())
    }

    #[allow(clippy::too_many_arguments)]
    async fn record(
        &self,
        agent: AgentKind,
        attempt: u32,
        model: &str,
        usage: TokenUsage,
        estimated: bool,
        latency: Duration,
        outcome: AttemptOutcome,
        cost: &mut CostSummary,
    ) {
        let entry = CostEntry {
            agent,
            attempt,
            model: model.to_string(),
            input_tokens: usage.input_tokens,
            output_tokens: usage.output_tokens,
            cost_usd: estimate_cost(model, usage),
            latency_ms: latency.as_millis() as u64,
            outcome,
            estimated,
            recorded_at: Utc::now(),
        };
        cost.add(&entry);
        self.ledger.append(entry).await;
    }

    fn emit_retry(&self, agent: AgentKind, attempt: u32, reason: &str) {
        if let Some(bus) = &self.events {
            bus.emit(Event::AgentRetry {
                agent,
                attempt,
                reason: reason.to_string(),
            });
        }
    }

    #[instrument(skip_all, fields(agent = %agent.kind()))]
    pub async fn run(&self, agent: &dyn Agent, input: &AgentInput) -> AgentResult {
        let kind = agent.kind();
        let failure = |failure_kind: AgentFailureKind,
                       message: String,
                       cost: CostSummary,
                       attempts: Vec<AttemptRecord>| {
            AgentResult::Failure(AgentFailure {
                agent: kind,
                kind: failure_kind,
                message,
                cost,
                attempts,
            })
        };

        let base_prompt = match agent.build_prompt(input) {
            Ok(prompt) => prompt,
            Err(err) => {
                error!(error = %err, "Agent input incomplete, not calling provider");
                return failure(
                    AgentFailureKind::MissingInput,
                    err.to_string(),
                    CostSummary::default(),
                    Vec::new(),
                );
            }
        };

        let selection = self.config.models.for_agent(kind);
        let provider = match self.providers.get(selection.provider) {
            Ok(provider) => provider,
            Err(err) => {
                error!(error = %err, "No provider available");
                return failure(
                    AgentFailureKind::ProviderFatal,
                    err.to_string(),
                    CostSummary::default(),
                    Vec::new(),
                );
            }
        };

        let options = self.send_options(&selection.model);
        let timeout = options.timeout;
        let mut retry = RetryState::new(self.config.retry);
        let mut prompt = base_prompt.clone();
        let mut attempts = Vec::new();
        let mut cost = CostSummary::default();
        let mut last = (AgentFailureKind::ProviderTransient, String::new());

        while let Some(attempt) = retry.begin_attempt() {
            info!(
                attempt,
                max_attempts = self.config.retry.max_attempts,
                provider = provider.name(),
                model = %selection.model,
                "Calling provider"
            );
            debug!(prompt_chars = prompt.len(), "Prompt built");

            let request =
                CompletionRequest::new(agent.system_prompt(), prompt.clone(), options.clone());
            let started = Instant::now();
            let sent = match tokio::time::timeout(timeout, provider.send(&request)).await {
                Ok(result) => result,
                Err(_) => Err(ProviderError::Timeout),
            };
            let latency = started.elapsed();

            let decision = match sent {
                Ok(completion) => match agent.parse_output(&completion.text) {
                    Ok(output) => {
                        self.record(
                            kind,
                            attempt,
                            &completion.model,
                            completion.usage,
                            false,
                            latency,
                            AttemptOutcome::Succeeded,
                            &mut cost,
                        )
                        .await;
                        attempts.push(AttemptRecord {
                            attempt,
                            outcome: AttemptOutcome::Succeeded,
                            message: None,
                            latency_ms: latency.as_millis() as u64,
                        });
                        retry.succeed();
                        info!(
                            attempt,
                            input_tokens = completion.usage.input_tokens,
                            output_tokens = completion.usage.output_tokens,
                            cost_usd = cost.cost_usd,
                            "Agent succeeded"
                        );
                        return AgentResult::Success(AgentSuccess {
                            agent: kind,
                            output,
                            raw_text: completion.text,
                            cost,
                            attempts,
                        });
                    }
                    Err(err) => {
                        let message = match err {
                            AgentError::Validation(m) | AgentError::MissingInput(m) => m,
                        };
                        warn!(attempt, error = %message, "Output failed validation");
                        self.record(
                            kind,
                            attempt,
                            &completion.model,
                            completion.usage,
                            false,
                            latency,
                            AttemptOutcome::InvalidOutput,
                            &mut cost,
                        )
                        .await;
                        attempts.push(AttemptRecord {
                            attempt,
                            outcome: AttemptOutcome::InvalidOutput,
                            message: Some(message.clone()),
                            latency_ms: latency.as_millis() as u64,
                        });
                        prompt = corrective_prompt(&base_prompt, &message);
                        last = (AgentFailureKind::OutputValidationFailed, message);
                        retry.fail(true)
                    }
                },
                Err(err) => {
                    let outcome = failure_outcome(&err);
                    let usage = TokenUsage {
                        input_tokens: request.estimated_input_tokens(),
                        output_tokens: 0,
                    };
                    warn!(attempt, error = %err, transient = err.is_transient(), "Provider call failed");
                    self.record(
                        kind,
                        attempt,
                        &selection.model,
                        usage,
                        true,
                        latency,
                        outcome,
                        &mut cost,
                    )
                    .await;
                    attempts.push(AttemptRecord {
                        attempt,
                        outcome,
                        message: Some(err.to_string()),
                        latency_ms: latency.as_millis() as u64,
                    });
                    last = if err.is_transient() {
                        (AgentFailureKind::ProviderTransient, err.to_string())
                    } else {
                        (AgentFailureKind::ProviderFatal, err.to_string())
                    };
                    retry.fail(err.is_transient())
                }
            };

            match decision {
                RetryDecision::Retry { delay } => {
                    self.emit_retry(kind, attempt, &last.1);
                    debug!(delay_ms = delay.as_millis() as u64, "Backing off");
                    tokio::time::sleep(delay).await;
                }
                RetryDecision::GiveUp => break,
            }
        }

        let (failure_kind, message) = last;
        error!(
            attempts = retry.attempts(),
            kind = %failure_kind,
            error = %message,
            "Agent failed"
        );
        failure(failure_kind, message, cost, attempts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corrective_prompt_keeps_base() {
        let prompt = corrective_prompt("Write copy", "copy has no sections");
        assert!(prompt.starts_with("Write copy"));
        assert!(prompt.contains("previous attempt had this issue: copy has no sections"));
    }

    #[test]
    fn test_failure_outcome() {
        assert_eq!(
            failure_outcome(&ProviderError::Timeout),
            AttemptOutcome::TransientFailure
        );
        assert_eq!(
            failure_outcome(&ProviderError::Auth("bad key".into())),
            AttemptOutcome::FatalFailure
        );
    }

    #[tokio::test]
    async fn test_shared_ledger_entries_since() {
        let ledger = SharedLedger::new();
        for attempt in 1..=3 {
            ledger
                .append(CostEntry {
                    agent: AgentKind::Strategist,
                    attempt,
                    model: "gpt-4o".to_string(),
                    input_tokens: 1,
                    output_tokens: 1,
                    cost_usd: 0.5,
                    latency_ms: 0,
                    outcome: AttemptOutcome::TransientFailure,
                    estimated: true,
                    recorded_at: Utc::now(),
                })
                .await;
        }
        assert_eq!(ledger.len().await, 3);
        assert_eq!(ledger.entries_since(1).await.len(), 2);
        assert!((ledger.total_cost_usd().await - 1.5).abs() < 1e-9);
    }
}
