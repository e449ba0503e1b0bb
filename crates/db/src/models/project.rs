use sitesmith_core::{Project, ProjectSummary, RunContext, RunStatus};
use uuid::Uuid;

use super::{datetime_to_timestamp, timestamp_to_datetime};
use crate::error::DbError;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProjectRow {
    pub id: String,
    pub name: String,
    pub business_description: String,
    pub template: String,
    pub language: String,
    pub status: String,
    pub total_cost_usd: f64,
    pub context_json: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl ProjectRow {
    pub fn into_domain(self) -> Result<Project, DbError> {
        let context: RunContext = serde_json::from_str(&self.context_json)?;
        Ok(Project {
            id: Uuid::parse_str(&self.id).unwrap_or(context.id),
            name: self.name,
            context,
            created_at: timestamp_to_datetime(self.created_at),
            updated_at: timestamp_to_datetime(self.updated_at),
        })
    }

    /// Summary from the indexed columns, without decoding the context.
    pub fn into_summary(self) -> ProjectSummary {
        ProjectSummary {
            id: Uuid::parse_str(&self.id).unwrap_or_default(),
            name: self.name,
            template: self.template,
            language: self.language,
            status: RunStatus::parse(&self.status).unwrap_or_default(),
            total_cost_usd: self.total_cost_usd,
            created_at: timestamp_to_datetime(self.created_at),
            updated_at: timestamp_to_datetime(self.updated_at),
        }
    }
}

impl TryFrom<&Project> for ProjectRow {
    type Error = DbError;

    fn try_from(project: &Project) -> Result<Self, Self::Error> {
        Ok(Self {
            id: project.id.to_string(),
            name: project.name.clone(),
            business_description: project.context.business_description.clone(),
            template: project.context.template.clone(),
            language: project.context.language.clone(),
            status: project.context.status().as_str().to_string(),
            total_cost_usd: project.context.total_cost_usd(),
            context_json: serde_json::to_string(&project.context)?,
            created_at: datetime_to_timestamp(project.created_at),
            updated_at: datetime_to_timestamp(project.updated_at),
        })
    }
}
