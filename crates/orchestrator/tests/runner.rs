mod common;

use common::*;
use orchestrator::agents::{CopywriterAgent, StrategistAgent};
use orchestrator::{AgentFailureKind, AgentInput, AgentResult, AgentRunner, OrchestratorError};
use providers::ProviderError;
use sitesmith_core::{AgentKind, PageArtifact};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

fn runner(provider: Arc<ScriptedProvider>) -> AgentRunner {
    AgentRunner::new(Arc::new(config()), registry(provider))
}

#[tokio::test(start_paused = true)]
async fn test_run_is_bounded_when_provider_hangs() {
    let provider = Arc::new(
        ScriptedProvider::healthy()
            .then(AgentKind::Strategist, Step::Hang)
            .then(AgentKind::Strategist, Step::Hang)
            .then(AgentKind::Strategist, Step::Hang),
    );
    let config = config();
    let bound = config.retry.worst_case(config.call_timeout());
    let runner = runner(provider.clone());
    let input = AgentInput::new("A bike repair shop", "landing", "en");

    let started = Instant::now();
    let result = runner.run(&StrategistAgent, &input).await;
    let elapsed = started.elapsed();

    assert!(elapsed <= bound, "took {elapsed:?}, bound {bound:?}");
    assert_eq!(bound, Duration::from_secs(33));
    match result {
        AgentResult::Failure(failure) => {
            assert_eq!(failure.kind, AgentFailureKind::ProviderTransient);
            assert_eq!(failure.attempts.len(), 3);
            assert!(failure.message.contains("timed out"));
        }
        AgentResult::Success(_) => panic!("hanging provider cannot succeed"),
    }
    assert_eq!(runner.ledger().len().await, 3);
}

#[tokio::test(start_paused = true)]
async fn test_run_is_bounded_under_total_failure() {
    let provider = Arc::new(ScriptedProvider::healthy().without_default(AgentKind::Strategist));
    let config = config();
    let bound = config.retry.worst_case(config.call_timeout());
    let runner = runner(provider.clone());

    let started = Instant::now();
    let result = runner
        .run(&StrategistAgent, &AgentInput::new("A florist", "landing", "en"))
        .await;

    assert!(started.elapsed() <= bound);
    assert!(!result.is_success());
    assert_eq!(result.attempt_count(), 3);
    assert_eq!(provider.calls_for(AgentKind::Strategist), 3);
}

#[tokio::test]
async fn test_missing_input_makes_no_call() {
    let provider = Arc::new(ScriptedProvider::healthy());
    let runner = runner(provider.clone());

    let result = runner
        .run(&CopywriterAgent, &AgentInput::new("A florist", "landing", "en"))
        .await;

    match result {
        AgentResult::Failure(failure) => {
            assert_eq!(failure.kind, AgentFailureKind::MissingInput);
            assert!(failure.attempts.is_empty());
        }
        AgentResult::Success(_) => panic!("copywriter needs a strategy"),
    }
    assert_eq!(provider.call_count(), 0);
    assert_eq!(runner.ledger().len().await, 0);
}

#[tokio::test]
async fn test_unregistered_provider_is_fatal() {
    let runner = AgentRunner::new(Arc::new(config()), providers::ProviderRegistry::new());
    let result = runner
        .run(&StrategistAgent, &AgentInput::new("A florist", "landing", "en"))
        .await;
    match result {
        AgentResult::Failure(failure) => assert_eq!(failure.kind, AgentFailureKind::ProviderFatal),
        AgentResult::Success(_) => panic!("no provider registered"),
    }
}

#[tokio::test]
async fn test_blank_refinement_returns_page_unchanged() {
    let provider = Arc::new(ScriptedProvider::healthy());
    let orchestrator = orchestrator(provider.clone(), config());
    let page = PageArtifact::new(SEO_PAGE);

    for instruction in ["", "   ", "\n\t"] {
        let outcome = orchestrator.refine(&page, instruction).await.unwrap();
        assert_eq!(outcome.page, page);
        assert!(!outcome.changed);
        assert!(outcome.entries.is_empty());
    }
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn test_refinement_bumps_revision() {
    let provider = Arc::new(ScriptedProvider::healthy());
    let orchestrator = orchestrator(provider.clone(), config());
    let page = PageArtifact::new(SEO_PAGE);

    let outcome = orchestrator
        .refine(&page, "Make the background black")
        .await
        .unwrap();

    assert!(outcome.changed);
    assert_eq!(outcome.page.revision, 1);
    assert!(outcome.page.html.contains("background:#000"));
    assert_eq!(outcome.entries.len(), 1);
    assert!(provider.prompts_for(AgentKind::Refinement)[0].contains("Make the background black"));
}

#[tokio::test(start_paused = true)]
async fn test_refinement_failure_is_reported() {
    let provider = Arc::new(
        ScriptedProvider::healthy().then(
            AgentKind::Refinement,
            Step::Fail(ProviderError::InvalidRequest {
                status: 400,
                message: "prompt too long".to_string(),
            }),
        ),
    );
    let err = orchestrator(provider, config())
        .refine(&PageArtifact::new(SEO_PAGE), "Shorter hero")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        OrchestratorError::AgentFailed {
            agent: AgentKind::Refinement,
            kind: AgentFailureKind::ProviderFatal,
            attempts: 1,
            ..
        }
    ));
}

#[tokio::test]
async fn test_variant_is_distinct_from_original() {
    let provider = Arc::new(ScriptedProvider::healthy());
    let orchestrator = orchestrator(provider, config());
    let ctx = orchestrator.run("A coffee shop").await.unwrap();
    let copy = ctx.copy().unwrap().clone();

    let outcome = orchestrator.generate_variant(&copy).await.unwrap();
    let headline = &outcome.variants.variants["headline"];
    assert_ne!(headline["A"], headline["B"]);
    assert_eq!(ctx.copy().unwrap(), &copy);
    assert!(outcome.cost.cost_usd > 0.0);
}
