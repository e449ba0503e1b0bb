use anyhow::{Context, Result};
use orchestrator::PipelineConfig;
use providers::{AnthropicClient, GeminiClient, OpenAiClient, ProviderKind, ProviderRegistry};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const SITESMITH_DIR: &str = ".sitesmith";
pub const CONFIG_FILE: &str = "config.toml";
pub const DEFAULT_DB_NAME: &str = "sitesmith.db";

const PROVIDERS: [ProviderKind; 3] = [
    ProviderKind::OpenAi,
    ProviderKind::Anthropic,
    ProviderKind::Gemini,
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SitesmithConfig {
    pub project: ProjectConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub providers: ProviderUrls,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectConfig {
    pub name: String,
}

/// Base URL overrides, for proxies and local gateways.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ProviderUrls {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openai: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anthropic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gemini: Option<String>,
}

impl ProviderUrls {
    fn for_kind(&self, kind: ProviderKind) -> Option<&str> {
        match kind {
            ProviderKind::OpenAi => self.openai.as_deref(),
            ProviderKind::Anthropic => self.anthropic.as_deref(),
            ProviderKind::Gemini => self.gemini.as_deref(),
        }
    }
}

impl Default for SitesmithConfig {
    fn default() -> Self {
        Self {
            project: ProjectConfig {
                name: "my-site".to_string(),
            },
            pipeline: PipelineConfig::default(),
            providers: ProviderUrls::default(),
        }
    }
}

impl SitesmithConfig {
    pub async fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Invalid config in {}", path.display()))
    }

    /// Registers a client for every provider whose API key is set in the
    /// environment.
    pub fn registry(&self) -> ProviderRegistry {
        let mut registry = ProviderRegistry::new();
        for kind in PROVIDERS {
            let Some(key) = std::env::var(kind.api_key_env())
                .ok()
                .filter(|k| !k.trim().is_empty())
            else {
                continue;
            };
            let base_url = self.providers.for_kind(kind);
            let client: Arc<dyn providers::Provider> = match (kind, base_url) {
                (ProviderKind::OpenAi, Some(url)) => Arc::new(OpenAiClient::with_base_url(key, url)),
                (ProviderKind::OpenAi, None) => Arc::new(OpenAiClient::new(key)),
                (ProviderKind::Anthropic, Some(url)) => {
                    Arc::new(AnthropicClient::with_base_url(key, url))
                }
                (ProviderKind::Anthropic, None) => Arc::new(AnthropicClient::new(key)),
                (ProviderKind::Gemini, Some(url)) => Arc::new(GeminiClient::with_base_url(key, url)),
                (ProviderKind::Gemini, None) => Arc::new(GeminiClient::new(key)),
            };
            tracing::debug!(provider = %kind, "Provider registered");
            registry.register(kind, client);
        }
        registry
    }
}

/// Paths of the `.sitesmith` directory under `root`.
pub struct Workspace {
    pub dir: PathBuf,
}

impl Workspace {
    pub fn at(root: &Path) -> Self {
        Self {
            dir: root.join(SITESMITH_DIR),
        }
    }

    pub fn current() -> Result<Self> {
        Ok(Self::at(&std::env::current_dir()?))
    }

    pub fn exists(&self) -> bool {
        self.dir.exists()
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.join(CONFIG_FILE)
    }

    pub fn db_path(&self) -> PathBuf {
        self.dir.join(DEFAULT_DB_NAME)
    }

    pub fn database_url(&self) -> String {
        format!("sqlite:{}", self.db_path().display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_round_trips_through_toml() {
        let mut config = SitesmithConfig::default();
        config.project.name = "bean-there".to_string();
        config.providers.openai = Some("http://localhost:8080".to_string());
        config.pipeline = config.pipeline.with_language("he").with_max_fix_iterations(2);

        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: SitesmithConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let parsed: SitesmithConfig = toml::from_str("[project]\nname = \"x\"\n").unwrap();
        assert_eq!(parsed.pipeline, PipelineConfig::default());
        assert!(parsed.providers.gemini.is_none());
    }

    #[tokio::test]
    async fn test_missing_config_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = Workspace::at(dir.path());
        assert!(!workspace.exists());
        let config = SitesmithConfig::load(&workspace.config_path()).await.unwrap();
        assert_eq!(config, SitesmithConfig::default());
    }
}
