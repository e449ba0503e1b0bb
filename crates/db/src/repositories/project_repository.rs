use crate::error::DbError;
use crate::models::ProjectRow;
use sitesmith_core::{Project, ProjectSummary};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

#[derive(Clone)]
pub struct ProjectRepository {
    pool: SqlitePool,
}

impl ProjectRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Inserts the project or replaces the stored snapshot of an existing one.
    pub async fn save(&self, project: &Project) -> Result<(), DbError> {
        let row = ProjectRow::try_from(project)?;

        sqlx::query(
            r#"
            INSERT INTO projects (id, name, business_description, template, language, status, total_cost_usd, context_json, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                status = excluded.status,
                total_cost_usd = excluded.total_cost_usd,
                context_json = excluded.context_json,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&row.id)
        .bind(&row.name)
        .bind(&row.business_description)
        .bind(&row.template)
        .bind(&row.language)
        .bind(&row.status)
        .bind(row.total_cost_usd)
        .bind(&row.context_json)
        .bind(row.created_at)
        .bind(row.updated_at)
        .execute(&self.pool)
        .await?;

        debug!(project_id = %project.id, status = %row.status, "Project saved");
        Ok(())
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Project>, DbError> {
        let row: Option<ProjectRow> = sqlx::query_as(
            r#"
            SELECT id, name, business_description, template, language, status, total_cost_usd, context_json, created_at, updated_at
            FROM projects
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(ProjectRow::into_domain).transpose()
    }

    pub async fn get(&self, id: Uuid) -> Result<Project, DbError> {
        self.find_by_id(id)
            .await?
            .ok_or(DbError::ProjectNotFound(id))
    }

    /// Resolves a full id or a unique id prefix, as typed on the command line.
    /// A prefix shared by several projects is an error, not a miss.
    pub async fn find_by_prefix(&self, prefix: &str) -> Result<Option<Project>, DbError> {
        if let Ok(id) = Uuid::parse_str(prefix) {
            return self.find_by_id(id).await;
        }
        let rows: Vec<ProjectRow> = sqlx::query_as(
            r#"
            SELECT id, name, business_description, template, language, status, total_cost_usd, context_json, created_at, updated_at
            FROM projects
            WHERE id LIKE ? || '%'
            LIMIT 2
            "#,
        )
        .bind(prefix)
        .fetch_all(&self.pool)
        .await?;

        let mut rows = rows.into_iter();
        match (rows.next(), rows.next()) {
            (Some(row), None) => row.into_domain().map(Some),
            (None, _) => Ok(None),
            (Some(_), Some(_)) => Err(DbError::AmbiguousPrefix(prefix.to_string())),
        }
    }

    pub async fn list(&self) -> Result<Vec<ProjectSummary>, DbError> {
        let rows: Vec<ProjectRow> = sqlx::query_as(
            r#"
            SELECT id, name, business_description, template, language, status, total_cost_usd, '' AS context_json, created_at, updated_at
            FROM projects
            ORDER BY updated_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(ProjectRow::into_summary).collect())
    }

    /// Deletes the project and its versions.
    pub async fn delete(&self, id: Uuid) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM projects WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
