use sitesmith_core::PageVersion;
use uuid::Uuid;

use super::timestamp_to_datetime;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct VersionRow {
    pub id: String,
    pub project_id: String,
    pub version_number: i64,
    pub html: String,
    pub change_description: String,
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub cost_usd: f64,
    pub created_at: i64,
}

impl VersionRow {
    pub fn into_domain(self) -> PageVersion {
        PageVersion {
            id: Uuid::parse_str(&self.id).unwrap_or_default(),
            project_id: Uuid::parse_str(&self.project_id).unwrap_or_default(),
            version_number: self.version_number.max(0) as u32,
            html: self.html,
            change_description: self.change_description,
            input_tokens: self.input_tokens.max(0) as u64,
            output_tokens: self.output_tokens.max(0) as u64,
            cost_usd: self.cost_usd,
            created_at: timestamp_to_datetime(self.created_at),
        }
    }
}
