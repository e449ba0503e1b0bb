use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{CoreError, Result};

/// Keys of the artifact map carried by a run. Declaration order is stage order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKey {
    Strategy,
    Copy,
    Design,
    Brief,
    Page,
    Review,
    Seo,
    Variants,
}

impl ArtifactKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Strategy => "strategy",
            Self::Copy => "copy",
            Self::Design => "design",
            Self::Brief => "brief",
            Self::Page => "page",
            Self::Review => "review",
            Self::Seo => "seo",
            Self::Variants => "variants",
        }
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Artifact {
    Strategy(Strategy),
    Copy(PageCopy),
    Design(DesignTokens),
    Brief(CreativeBrief),
    Page(PageArtifact),
    Review(ReviewReport),
    Variants(VariantSet),
}

impl Artifact {
    pub fn kind_str(&self) -> &'static str {
        match self {
            Self::Strategy(_) => "strategy",
            Self::Copy(_) => "copy",
            Self::Design(_) => "design",
            Self::Brief(_) => "brief",
            Self::Page(_) => "page",
            Self::Review(_) => "review",
            Self::Variants(_) => "variants",
        }
    }

    pub fn as_strategy(&self) -> Option<&Strategy> {
        match self {
            Self::Strategy(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_copy(&self) -> Option<&PageCopy> {
        match self {
            Self::Copy(c) => Some(c),
            Self::Brief(b) => Some(&b.copy),
            _ => None,
        }
    }

    pub fn as_design(&self) -> Option<&DesignTokens> {
        match self {
            Self::Design(d) => Some(d),
            Self::Brief(b) => Some(&b.design),
            _ => None,
        }
    }

    pub fn as_brief(&self) -> Option<&CreativeBrief> {
        match self {
            Self::Brief(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_page(&self) -> Option<&PageArtifact> {
        match self {
            Self::Page(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_review(&self) -> Option<&ReviewReport> {
        match self {
            Self::Review(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_variants(&self) -> Option<&VariantSet> {
        match self {
            Self::Variants(v) => Some(v),
            _ => None,
        }
    }
}

/// Business strategy: audience, positioning, tone and page structure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Strategy {
    pub summary: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CopySection {
    pub title: String,
    pub body: String,
}

/// Marketing copy split into heading-delimited sections.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PageCopy {
    pub raw: String,
    pub headline: Option<String>,
    pub sections: Vec<CopySection>,
}

impl PageCopy {
    pub fn section(&self, title: &str) -> Option<&CopySection> {
        self.sections
            .iter()
            .find(|s| s.title.eq_ignore_ascii_case(title))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DesignTokens {
    pub primary_color: String,
    pub secondary_color: String,
    pub background_color: String,
    pub text_color: String,
    pub accent_color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading_font: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_font: Option<String>,
    /// Any further tokens (spacing, radii, shadows) kept as produced.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

pub fn is_hex_color(value: &str) -> bool {
    let Some(digits) = value.strip_prefix('#') else {
        return false;
    };
    (3..=8).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_hexdigit())
}

impl DesignTokens {
    pub fn colors(&self) -> [(&'static str, &str); 5] {
        [
            ("primary_color", &self.primary_color),
            ("secondary_color", &self.secondary_color),
            ("background_color", &self.background_color),
            ("text_color", &self.text_color),
            ("accent_color", &self.accent_color),
        ]
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in self.colors() {
            if !is_hex_color(value) {
                return Err(CoreError::Validation(format!(
                    "{name} must be a hex color like #1a2b3c, got '{value}'"
                )));
            }
        }
        Ok(())
    }
}

/// Copy and design merged for the Developer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreativeBrief {
    pub copy: PageCopy,
    pub design: DesignTokens,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PageArtifact {
    pub html: String,
    /// 0 for the first Developer draft, +1 per fix pass or refinement.
    pub revision: u32,
}

impl PageArtifact {
    pub fn new(html: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            revision: 0,
        }
    }

    pub fn next_revision(&self, html: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            revision: self.revision + 1,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    Critical,
    Warning,
    #[serde(other)]
    Info,
}

impl IssueSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }

    pub fn is_blocking(&self) -> bool {
        matches!(self, Self::Critical | Self::Warning)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReviewIssue {
    pub severity: IssueSeverity,
    #[serde(default)]
    pub category: String,
    pub description: String,
    #[serde(default)]
    pub fix_suggestion: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReviewReport {
    pub score: f64,
    pub pass: bool,
    pub issues: Vec<ReviewIssue>,
    #[serde(default)]
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReviewVerdict {
    Approved,
    NeedsFix(Vec<ReviewIssue>),
}

impl ReviewReport {
    pub fn blocking_issues(&self) -> Vec<ReviewIssue> {
        self.issues
            .iter()
            .filter(|i| i.severity.is_blocking())
            .cloned()
            .collect()
    }

    /// Approved when the report passes or nothing critical/warning is left.
    pub fn verdict(&self) -> ReviewVerdict {
        let blocking = self.blocking_issues();
        if self.pass || blocking.is_empty() {
            ReviewVerdict::Approved
        } else {
            ReviewVerdict::NeedsFix(blocking)
        }
    }
}

impl ReviewVerdict {
    pub fn is_approved(&self) -> bool {
        matches!(self, Self::Approved)
    }
}

/// Alternative copy per page element, keyed by variant label ("B", "C").
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct VariantSet {
    pub variants: BTreeMap<String, BTreeMap<String, String>>,
    #[serde(default)]
    pub rationale: String,
}
