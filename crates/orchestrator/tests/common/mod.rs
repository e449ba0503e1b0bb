#![allow(dead_code)]

use async_trait::async_trait;
use orchestrator::{AgentModel, Orchestrator, PipelineConfig};
use providers::{
    Completion, CompletionRequest, Provider, ProviderError, ProviderKind, ProviderRegistry,
    TokenUsage,
};
use sitesmith_core::AgentKind;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Priced model reported by every scripted completion: 1000 in + 500 out
/// tokens cost $0.0075.
pub const BILLED_MODEL: &str = "gpt-4o";
pub const CALL_COST_USD: f64 = 0.0075;

pub const STRATEGY: &str = "Audience: remote workers who care where their coffee comes from. \
Value proposition: single-origin beans roasted every morning in the neighbourhood.";

pub const COPY: &str = "# Hero\n**Single-origin beans roasted every morning**\n\n\
## Features\n- Ethically sourced\n- Roasted on site\n\n## Call to Action\nOrder your first bag";

pub const DESIGN: &str = r##"```json
{
  "primary_color": "#3b2f2f",
  "secondary_color": "#f5e6d3",
  "accent_color": "#c8a165",
  "background_color": "#ffffff",
  "text_color": "#222222",
  "heading_font": "Playfair Display"
}
```"##;

pub const PAGE: &str = "```html\n<!DOCTYPE html>\n<html lang=\"en\"><head><style>h1{color:#3b2f2f}</style></head>\
<body><h1>Single-origin beans roasted every morning</h1></body></html>\n```";

pub const REVIEW_PASS: &str = r#"{"score": 92, "pass": true, "issues": [], "summary": "Ready to ship"}"#;

pub const REVIEW_FAIL: &str = r#"{"score": 41, "pass": false, "issues": [
  {"severity": "critical", "category": "accessibility", "description": "Hero image has no alt text", "fix_suggestion": "Add alt text"},
  {"severity": "info", "category": "style", "description": "Consider a darker footer"}
], "summary": "Needs work"}"#;

pub const SEO_PAGE: &str = "<!DOCTYPE html>\n<html lang=\"en\"><head><title>Bean There Coffee</title>\
<meta name=\"description\" content=\"Single-origin beans roasted every morning\">\
<style>h1{color:#3b2f2f}</style></head>\
<body><h1>Single-origin beans roasted every morning</h1></body></html>";

pub const REFINED_PAGE: &str = "<!DOCTYPE html>\n<html lang=\"en\"><head><title>Bean There Coffee</title></head>\
<body style=\"background:#000\"><h1>Single-origin beans roasted every morning</h1></body></html>";

pub const VARIANTS: &str = r#"{"variants": {"headline": {"A": "Single-origin beans roasted every morning", "B": "Coffee that knows where it came from", "C": "Tomorrow's roast, today"}}, "rationale": "B leans on provenance"}"#;

pub enum Step {
    Reply(String),
    Fail(ProviderError),
    /// Never answers; the runner's timeout has to fire.
    Hang,
}

/// Provider that answers by model name, which the test config sets to the
/// agent kind. Queued steps are consumed first, then the model's default reply.
pub struct ScriptedProvider {
    defaults: HashMap<String, String>,
    queued: Mutex<HashMap<String, VecDeque<Step>>>,
    calls: Mutex<Vec<(String, String)>>,
}

impl ScriptedProvider {
    pub fn healthy() -> Self {
        let mut defaults = HashMap::new();
        for (kind, reply) in [
            (AgentKind::Strategist, STRATEGY),
            (AgentKind::Copywriter, COPY),
            (AgentKind::ArtDirector, DESIGN),
            (AgentKind::Developer, PAGE),
            (AgentKind::Reviewer, REVIEW_PASS),
            (AgentKind::SeoOptimizer, SEO_PAGE),
            (AgentKind::Refinement, REFINED_PAGE),
            (AgentKind::AbVariant, VARIANTS),
        ] {
            defaults.insert(kind.as_str().to_string(), reply.to_string());
        }
        Self {
            defaults,
            queued: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_default(mut self, agent: AgentKind, reply: &str) -> Self {
        self.defaults
            .insert(agent.as_str().to_string(), reply.to_string());
        self
    }

    pub fn without_default(mut self, agent: AgentKind) -> Self {
        self.defaults.remove(agent.as_str());
        self
    }

    pub fn then(self, agent: AgentKind, step: Step) -> Self {
        self.queued
            .lock()
            .unwrap()
            .entry(agent.as_str().to_string())
            .or_default()
            .push_back(step);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Prompts sent for an agent, in call order.
    pub fn prompts_for(&self, agent: AgentKind) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(model, _)| model.as_str() == agent.as_str())
            .map(|(_, prompt)| prompt.clone())
            .collect()
    }

    pub fn calls_for(&self, agent: AgentKind) -> usize {
        self.prompts_for(agent).len()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn send(&self, request: &CompletionRequest) -> providers::Result<Completion> {
        let model = request.options.model.clone();
        self.calls
            .lock()
            .unwrap()
            .push((model.clone(), request.prompt.clone()));

        let step = self
            .queued
            .lock()
            .unwrap()
            .get_mut(&model)
            .and_then(VecDeque::pop_front);
        let step = match step {
            Some(step) => step,
            None => match self.defaults.get(&model) {
                Some(reply) => Step::Reply(reply.clone()),
                None => Step::Fail(ProviderError::Server {
                    status: 503,
                    message: format!("no script for {model}"),
                }),
            },
        };

        match step {
            Step::Reply(text) => Ok(Completion {
                text,
                usage: TokenUsage {
                    input_tokens: 1000,
                    output_tokens: 500,
                },
                model: BILLED_MODEL.to_string(),
            }),
            Step::Fail(err) => Err(err),
            Step::Hang => {
                tokio::time::sleep(Duration::from_secs(24 * 60 * 60)).await;
                Err(ProviderError::Timeout)
            }
        }
    }
}

pub fn config() -> PipelineConfig {
    let mut config = PipelineConfig::default()
        .with_call_timeout(Duration::from_secs(10))
        .with_default_model(AgentModel::new(ProviderKind::OpenAi, "unscripted"));
    for kind in AgentKind::ALL {
        config = config.with_agent_model(kind, AgentModel::new(ProviderKind::OpenAi, kind.as_str()));
    }
    config
}

pub fn registry(provider: Arc<ScriptedProvider>) -> ProviderRegistry {
    ProviderRegistry::new().with(ProviderKind::OpenAi, provider)
}

pub fn orchestrator(provider: Arc<ScriptedProvider>, config: PipelineConfig) -> Orchestrator {
    Orchestrator::new(config, registry(provider)).expect("valid config")
}

pub fn transient() -> Step {
    Step::Fail(ProviderError::Server {
        status: 503,
        message: "overloaded".to_string(),
    })
}
