use providers::{ProviderKind, DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE};
use serde::{Deserialize, Serialize};
use sitesmith_core::templates::{DEFAULT_LANGUAGE, DEFAULT_TEMPLATE};
use sitesmith_core::AgentKind;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::error::{OrchestratorError, Result};
use crate::retry::RetryPolicy;

pub const DEFAULT_MAX_FIX_ITERATIONS: u32 = 3;
pub const DEFAULT_CALL_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AgentModel {
    pub provider: ProviderKind,
    pub model: String,
}

impl AgentModel {
    pub fn new(provider: ProviderKind, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }
}

impl Default for AgentModel {
    fn default() -> Self {
        let provider = ProviderKind::Gemini;
        Self::new(provider, provider.default_model())
    }
}

/// Model selection: one default plus optional per-agent overrides.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct ModelsConfig {
    #[serde(rename = "default")]
    pub default_model: AgentModel,
    pub agents: BTreeMap<AgentKind, AgentModel>,
}

impl ModelsConfig {
    pub fn for_agent(&self, agent: AgentKind) -> &AgentModel {
        self.agents.get(&agent).unwrap_or(&self.default_model)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AutoFixConfig {
    pub enabled: bool,
    pub max_iterations: u32,
}

impl Default for AutoFixConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_iterations: DEFAULT_MAX_FIX_ITERATIONS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct BudgetConfig {
    pub max_cost_usd: Option<f64>,
    pub max_duration_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    pub template: String,
    pub language: String,
    pub call_timeout_secs: u64,
    pub max_tokens: u32,
    pub temperature: f32,
    pub retry: RetryPolicy,
    pub auto_fix: AutoFixConfig,
    pub budget: BudgetConfig,
    pub models: ModelsConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            template: DEFAULT_TEMPLATE.to_string(),
            language: DEFAULT_LANGUAGE.to_string(),
            call_timeout_secs: DEFAULT_CALL_TIMEOUT_SECS,
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            retry: RetryPolicy::default(),
            auto_fix: AutoFixConfig::default(),
            budget: BudgetConfig::default(),
            models: ModelsConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = template.into();
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout_secs = timeout.as_secs().max(1);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_auto_fix(mut self, enabled: bool) -> Self {
        self.auto_fix.enabled = enabled;
        self
    }

    pub fn with_max_fix_iterations(mut self, max: u32) -> Self {
        self.auto_fix.max_iterations = max;
        self
    }

    pub fn with_max_cost(mut self, max_cost_usd: f64) -> Self {
        self.budget.max_cost_usd = Some(max_cost_usd);
        self
    }

    pub fn with_max_duration(mut self, max: Duration) -> Self {
        self.budget.max_duration_secs = Some(max.as_secs());
        self
    }

    pub fn with_default_model(mut self, model: AgentModel) -> Self {
        self.models.default_model = model;
        self
    }

    pub fn with_agent_model(mut self, agent: AgentKind, model: AgentModel) -> Self {
        self.models.agents.insert(agent, model);
        self
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.call_timeout_secs == 0 {
            return Err(OrchestratorError::InvalidConfig(
                "call_timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(OrchestratorError::InvalidConfig(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if let Some(cost) = self.budget.max_cost_usd {
            if !cost.is_finite() || cost < 0.0 {
                return Err(OrchestratorError::InvalidConfig(format!(
                    "budget.max_cost_usd must be a non-negative number, got {cost}"
                )));
            }
        }
        Ok(())
    }
}
