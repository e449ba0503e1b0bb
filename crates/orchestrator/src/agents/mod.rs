//! The eight pipeline agents.
//!
//! An agent is pure: it turns an [`AgentInput`] into a prompt and turns the
//! provider's text back into a typed [`Artifact`]. Provider calls, retries and
//! cost accounting belong to [`crate::runner::AgentRunner`].

mod ab_variant;
mod art_director;
mod copywriter;
mod developer;
pub mod parse;
mod refinement;
mod reviewer;
mod seo;
mod strategist;

pub use ab_variant::AbVariantAgent;
pub use art_director::ArtDirectorAgent;
pub use copywriter::CopywriterAgent;
pub use developer::DeveloperAgent;
pub use refinement::RefinementAgent;
pub use reviewer::ReviewerAgent;
pub use seo::SeoOptimizerAgent;
pub use strategist::StrategistAgent;

use sitesmith_core::{
    AgentKind, Artifact, ArtifactKey, DesignTokens, Language, PageArtifact,
    PageCopy, ReviewIssue, RunContext, Strategy, Template,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum AgentError {
    #[error("missing required input: {0}")]
    MissingInput(String),

    #[error("{0}")]
    Validation(String),
}

impl AgentError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

impl From<serde_json::Error> for AgentError {
    fn from(err: serde_json::Error) -> Self {
        Self::Validation(format!("output is not valid JSON: {err}"))
    }
}

pub trait Agent: Send + Sync {
    fn kind(&self) -> AgentKind;

    fn system_prompt(&self) -> &'static str;

    /// Fails with [`AgentError::MissingInput`] when a required artifact is absent.
    fn build_prompt(&self, input: &AgentInput) -> Result<String, AgentError>;

    /// Fails with [`AgentError::Validation`] when the text does not meet the
    /// agent's output contract.
    fn parse_output(&self, raw: &str) -> Result<Artifact, AgentError>;
}

/// Agent implementation for a kind.
pub fn agent_for(kind: AgentKind) -> Arc<dyn Agent> {
    match kind {
        AgentKind::Strategist => Arc::new(StrategistAgent),
        AgentKind::Copywriter => Arc::new(CopywriterAgent),
        AgentKind::ArtDirector => Arc::new(ArtDirectorAgent),
        AgentKind::Developer => Arc::new(DeveloperAgent),
        AgentKind::Reviewer => Arc::new(ReviewerAgent),
        AgentKind::SeoOptimizer => Arc::new(SeoOptimizerAgent),
        AgentKind::Refinement => Arc::new(RefinementAgent),
        AgentKind::AbVariant => Arc::new(AbVariantAgent),
    }
}

/// Immutable snapshot handed to one agent invocation.
#[derive(Debug, Clone)]
pub struct AgentInput {
    pub business_description: String,
    pub template: &'static Template,
    pub language: &'static Language,
    artifacts: BTreeMap<ArtifactKey, Artifact>,
    pub issues: Vec<ReviewIssue>,
    pub instruction: Option<String>,
}

impl AgentInput {
    pub fn new(business_description: impl Into<String>, template: &str, language: &str) -> Self {
        Self {
            business_description: business_description.into(),
            template: Template::resolve(template),
            language: Language::resolve(language),
            artifacts: BTreeMap::new(),
            issues: Vec::new(),
            instruction: None,
        }
    }

    /// Copies the listed artifacts out of the context. Absent keys are skipped;
    /// agents report them as missing input.
    pub fn from_context(ctx: &RunContext, keys: &[ArtifactKey]) -> Self {
        let mut input = Self::new(ctx.business_description.clone(), &ctx.template, &ctx.language);
        for key in keys {
            if let Some(artifact) = ctx.artifact(*key) {
                input.artifacts.insert(*key, artifact.clone());
            }
        }
        input
    }

    pub fn with_artifact(mut self, key: ArtifactKey, artifact: Artifact) -> Self {
        self.artifacts.insert(key, artifact);
        self
    }

    pub fn with_issues(mut self, issues: Vec<ReviewIssue>) -> Self {
        self.issues = issues;
        self
    }

    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = Some(instruction.into());
        self
    }

    pub fn artifact(&self, key: ArtifactKey) -> Option<&Artifact> {
        self.artifacts.get(&key)
    }

    pub fn require_description(&self) -> Result<&str, AgentError> {
        let description = self.business_description.trim();
        if description.is_empty() {
            return Err(AgentError::MissingInput("business description".to_string()));
        }
        Ok(description)
    }

    pub fn require_strategy(&self) -> Result<&Strategy, AgentError> {
        self.artifact(ArtifactKey::Strategy)
            .and_then(Artifact::as_strategy)
            .ok_or_else(|| missing(ArtifactKey::Strategy))
    }

    pub fn require_copy(&self) -> Result<&PageCopy, AgentError> {
        self.artifact(ArtifactKey::Copy)
            .or_else(|| self.artifact(ArtifactKey::Brief))
            .and_then(Artifact::as_copy)
            .ok_or_else(|| missing(ArtifactKey::Copy))
    }

    pub fn require_design(&self) -> Result<&DesignTokens, AgentError> {
        self.artifact(ArtifactKey::Design)
            .or_else(|| self.artifact(ArtifactKey::Brief))
            .and_then(Artifact::as_design)
            .ok_or_else(|| missing(ArtifactKey::Design))
    }

    pub fn require_page(&self) -> Result<&PageArtifact, AgentError> {
        self.artifact(ArtifactKey::Page)
            .and_then(Artifact::as_page)
            .ok_or_else(|| missing(ArtifactKey::Page))
    }

    pub fn design_json(&self) -> Option<String> {
        let design = self.require_design().ok()?;
        serde_json::to_string_pretty(design).ok()
    }
}

fn missing(key: ArtifactKey) -> AgentError {
    AgentError::MissingInput(format!("{key} artifact"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitesmith_core::StageName;

    #[test]
    fn test_snapshot_is_independent_of_context() {
        let mut ctx = RunContext::new("bakery", "restaurant", "fr");
        ctx.start().unwrap();
        ctx.insert_artifact(
            ArtifactKey::Strategy,
            StageName::Strategy,
            Artifact::Strategy(Strategy {
                summary: "Local families".to_string(),
            }),
        )
        .unwrap();

        let input = AgentInput::from_context(&ctx, &[ArtifactKey::Strategy, ArtifactKey::Copy]);
        ctx.insert_artifact(
            ArtifactKey::Page,
            StageName::AutoFix,
            Artifact::Page(PageArtifact::new("<html></html>")),
        )
        .unwrap();

        assert_eq!(input.template.id, "restaurant");
        assert_eq!(input.language.code, "fr");
        assert!(input.require_strategy().is_ok());
        assert!(input.require_page().is_err());
        assert_eq!(
            input.require_copy().unwrap_err(),
            AgentError::MissingInput("copy artifact".to_string())
        );
    }

    #[test]
    fn test_blank_description_is_missing() {
        let input = AgentInput::new("   ", "landing", "en");
        assert!(matches!(
            input.require_description(),
            Err(AgentError::MissingInput(_))
        ));
    }

    #[test]
    fn test_agent_for_matches_kind() {
        for kind in AgentKind::ALL {
            assert_eq!(agent_for(kind).kind(), kind);
        }
    }
}
