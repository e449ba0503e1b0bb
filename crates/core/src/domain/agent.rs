use serde::{Deserialize, Serialize};
use std::fmt;

use super::artifact::ArtifactKey;

/// The eight specialized agents a run can invoke.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    Strategist,
    Copywriter,
    ArtDirector,
    Developer,
    Reviewer,
    SeoOptimizer,
    Refinement,
    AbVariant,
}

impl AgentKind {
    pub const ALL: [AgentKind; 8] = [
        Self::Strategist,
        Self::Copywriter,
        Self::ArtDirector,
        Self::Developer,
        Self::Reviewer,
        Self::SeoOptimizer,
        Self::Refinement,
        Self::AbVariant,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Strategist => "strategist",
            Self::Copywriter => "copywriter",
            Self::ArtDirector => "art_director",
            Self::Developer => "developer",
            Self::Reviewer => "reviewer",
            Self::SeoOptimizer => "seo_optimizer",
            Self::Refinement => "refinement",
            Self::AbVariant => "ab_variant",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "strategist" => Some(Self::Strategist),
            "copywriter" => Some(Self::Copywriter),
            "art_director" => Some(Self::ArtDirector),
            "developer" => Some(Self::Developer),
            "reviewer" => Some(Self::Reviewer),
            "seo_optimizer" => Some(Self::SeoOptimizer),
            "refinement" => Some(Self::Refinement),
            "ab_variant" => Some(Self::AbVariant),
            _ => None,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Strategist => "Strategist",
            Self::Copywriter => "Copywriter",
            Self::ArtDirector => "Art Director",
            Self::Developer => "Developer",
            Self::Reviewer => "Reviewer",
            Self::SeoOptimizer => "SEO Optimizer",
            Self::Refinement => "Refinement",
            Self::AbVariant => "A/B Variant",
        }
    }

    /// Key under which this agent's output lands in a run context.
    pub fn output_key(&self) -> ArtifactKey {
        match self {
            Self::Strategist => ArtifactKey::Strategy,
            Self::Copywriter => ArtifactKey::Copy,
            Self::ArtDirector => ArtifactKey::Design,
            Self::Developer | Self::Refinement => ArtifactKey::Page,
            Self::Reviewer => ArtifactKey::Review,
            Self::SeoOptimizer => ArtifactKey::Seo,
            Self::AbVariant => ArtifactKey::Variants,
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stages of the build pipeline, in execution order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StageName {
    Strategy,
    Creative,
    AutoFix,
    Seo,
}

impl StageName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Strategy => "strategy",
            Self::Creative => "creative",
            Self::AutoFix => "auto_fix",
            Self::Seo => "seo",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "strategy" => Some(Self::Strategy),
            "creative" => Some(Self::Creative),
            "auto_fix" => Some(Self::AutoFix),
            "seo" => Some(Self::Seo),
            _ => None,
        }
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_kind_as_str_parse() {
        for kind in AgentKind::ALL {
            assert_eq!(AgentKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(AgentKind::parse("designer"), None);
    }

    #[test]
    fn test_agent_kind_serde_matches_as_str() {
        let json = serde_json::to_string(&AgentKind::SeoOptimizer).unwrap();
        assert_eq!(json, "\"seo_optimizer\"");
    }

    #[test]
    fn test_refinement_writes_page() {
        assert_eq!(AgentKind::Refinement.output_key(), ArtifactKey::Page);
        assert_eq!(AgentKind::Developer.output_key(), ArtifactKey::Page);
        assert_eq!(AgentKind::AbVariant.output_key(), ArtifactKey::Variants);
    }

    #[test]
    fn test_stage_order() {
        assert!(StageName::Strategy < StageName::Creative);
        assert!(StageName::AutoFix < StageName::Seo);
        assert_eq!(StageName::parse("auto_fix"), Some(StageName::AutoFix));
    }
}
