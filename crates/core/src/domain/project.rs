use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::artifact::PageArtifact;
use super::run::{RunContext, RunStatus};

/// A stored pipeline run plus the page versions derived from it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub context: RunContext,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// Uses the run id as the project id.
    pub fn from_run(name: impl Into<String>, context: RunContext) -> Self {
        let now = Utc::now();
        Self {
            id: context.id,
            name: name.into(),
            context,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn summary(&self) -> ProjectSummary {
        ProjectSummary {
            id: self.id,
            name: self.name.clone(),
            template: self.context.template.clone(),
            language: self.context.language.clone(),
            status: self.context.status(),
            total_cost_usd: self.context.total_cost_usd(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Derives a short project name from a business description.
pub fn project_name(description: &str) -> String {
    let words: Vec<&str> = description.split_whitespace().take(6).collect();
    if words.is_empty() {
        return "untitled".to_string();
    }
    words.join(" ")
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectSummary {
    pub id: Uuid,
    pub name: String,
    pub template: String,
    pub language: String,
    pub status: RunStatus,
    pub total_cost_usd: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One saved revision of a project's page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PageVersion {
    pub id: Uuid,
    pub project_id: Uuid,
    /// 1-based, dense per project.
    pub version_number: u32,
    pub html: String,
    pub change_description: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost_usd: f64,
    pub created_at: DateTime<Utc>,
}

impl PageVersion {
    pub fn page(&self) -> PageArtifact {
        PageArtifact {
            html: self.html.clone(),
            revision: self.version_number.saturating_sub(1),
        }
    }
}

/// Input for recording a new version; the store assigns id and number.
#[derive(Debug, Clone, PartialEq)]
pub struct NewVersion {
    pub html: String,
    pub change_description: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost_usd: f64,
}

impl NewVersion {
    pub fn new(html: impl Into<String>, change_description: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            change_description: change_description.into(),
            input_tokens: 0,
            output_tokens: 0,
            cost_usd: 0.0,
        }
    }

    pub fn with_usage(mut self, input_tokens: u64, output_tokens: u64, cost_usd: f64) -> Self {
        self.input_tokens = input_tokens;
        self.output_tokens = output_tokens;
        self.cost_usd = cost_usd;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_name() {
        assert_eq!(
            project_name("  An artisanal coffee shop roasting single-origin beans in Portland"),
            "An artisanal coffee shop roasting single-origin"
        );
        assert_eq!(project_name("   "), "untitled");
    }

    #[test]
    fn test_summary_reflects_context() {
        let ctx = RunContext::new("bakery", "restaurant", "fr");
        let project = Project::from_run("Bakery", ctx.clone());
        let summary = project.summary();
        assert_eq!(summary.id, ctx.id);
        assert_eq!(summary.template, "restaurant");
        assert_eq!(summary.status, RunStatus::Pending);
        assert_eq!(summary.total_cost_usd, 0.0);
    }
}
