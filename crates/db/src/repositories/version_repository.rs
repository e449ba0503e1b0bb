use crate::error::DbError;
use crate::models::{datetime_to_timestamp, VersionRow};
use chrono::Utc;
use sitesmith_core::{NewVersion, PageVersion};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

#[derive(Clone)]
pub struct VersionRepository {
    pool: SqlitePool,
}

impl VersionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Appends the next version for a project. Numbers start at 1 and are
    /// assigned inside one transaction.
    pub async fn create(
        &self,
        project_id: Uuid,
        version: &NewVersion,
    ) -> Result<PageVersion, DbError> {
        let mut tx = self.pool.begin().await?;

        let exists: Option<(String,)> = sqlx::query_as("SELECT id FROM projects WHERE id = ?")
            .bind(project_id.to_string())
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(DbError::ProjectNotFound(project_id));
        }

        let (next,): (i64,) = sqlx::query_as(
            "SELECT COALESCE(MAX(version_number), 0) + 1 FROM project_versions WHERE project_id = ?",
        )
        .bind(project_id.to_string())
        .fetch_one(&mut *tx)
        .await?;

        let created = PageVersion {
            id: Uuid::new_v4(),
            project_id,
            version_number: next.max(1) as u32,
            html: version.html.clone(),
            change_description: version.change_description.clone(),
            input_tokens: version.input_tokens,
            output_tokens: version.output_tokens,
            cost_usd: version.cost_usd,
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO project_versions (id, project_id, version_number, html, change_description, input_tokens, output_tokens, cost_usd, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(created.id.to_string())
        .bind(project_id.to_string())
        .bind(next)
        .bind(&created.html)
        .bind(&created.change_description)
        .bind(created.input_tokens as i64)
        .bind(created.output_tokens as i64)
        .bind(created.cost_usd)
        .bind(datetime_to_timestamp(created.created_at))
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE projects SET updated_at = ? WHERE id = ?")
            .bind(datetime_to_timestamp(created.created_at))
            .bind(project_id.to_string())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        debug!(%project_id, version = created.version_number, "Version recorded");
        Ok(created)
    }

    pub async fn list_for_project(&self, project_id: Uuid) -> Result<Vec<PageVersion>, DbError> {
        let rows: Vec<VersionRow> = sqlx::query_as(
            r#"
            SELECT id, project_id, version_number, html, change_description, input_tokens, output_tokens, cost_usd, created_at
            FROM project_versions
            WHERE project_id = ?
            ORDER BY version_number ASC
            "#,
        )
        .bind(project_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(VersionRow::into_domain).collect())
    }

    pub async fn latest(&self, project_id: Uuid) -> Result<Option<PageVersion>, DbError> {
        let row: Option<VersionRow> = sqlx::query_as(
            r#"
            SELECT id, project_id, version_number, html, change_description, input_tokens, output_tokens, cost_usd, created_at
            FROM project_versions
            WHERE project_id = ?
            ORDER BY version_number DESC
            LIMIT 1
            "#,
        )
        .bind(project_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(VersionRow::into_domain))
    }

    /// Sum of the cost recorded on every version of a project.
    pub async fn total_cost(&self, project_id: Uuid) -> Result<f64, DbError> {
        let (total,): (f64,) = sqlx::query_as(
            "SELECT COALESCE(SUM(cost_usd), 0.0) FROM project_versions WHERE project_id = ?",
        )
        .bind(project_id.to_string())
        .fetch_one(&self.pool)
        .await?;

        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_pool, run_migrations, ProjectRepository};
    use sitesmith_core::{Project, RunContext};
    use tempfile::TempDir;

    async fn setup_test_db() -> (TempDir, SqlitePool) {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("test.db").display());
        let pool = create_pool(&url).await.unwrap();
        run_migrations(&pool).await.unwrap();
        (dir, pool)
    }

    async fn create_test_project(pool: &SqlitePool) -> Project {
        let project = Project::from_run("Coffee", RunContext::new("A coffee shop", "landing", "en"));
        ProjectRepository::new(pool.clone())
            .save(&project)
            .await
            .unwrap();
        project
    }

    #[tokio::test]
    async fn test_versions_are_numbered_in_order() {
        let (_dir, pool) = setup_test_db().await;
        let project = create_test_project(&pool).await;
        let repo = VersionRepository::new(pool);

        let first = repo
            .create(project.id, &NewVersion::new("<html>v1</html>", "Initial build"))
            .await
            .unwrap();
        let second = repo
            .create(
                project.id,
                &NewVersion::new("<html>v2</html>", "Darker hero").with_usage(1200, 800, 0.011),
            )
            .await
            .unwrap();

        assert_eq!(first.version_number, 1);
        assert_eq!(second.version_number, 2);
        assert_eq!(second.page().revision, 1);

        let versions = repo.list_for_project(project.id).await.unwrap();
        assert_eq!(versions.len(), 2);
        assert_eq!(versions[1].change_description, "Darker hero");
        assert_eq!(versions[1].input_tokens, 1200);

        let latest = repo.latest(project.id).await.unwrap().unwrap();
        assert_eq!(latest.html, "<html>v2</html>");
        assert!((repo.total_cost(project.id).await.unwrap() - 0.011).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_version_for_missing_project() {
        let (_dir, pool) = setup_test_db().await;
        let repo = VersionRepository::new(pool);
        let id = Uuid::new_v4();
        assert!(matches!(
            repo.create(id, &NewVersion::new("<html></html>", "x")).await,
            Err(DbError::ProjectNotFound(_))
        ));
        assert!(repo.latest(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_project_removes_versions() {
        let (_dir, pool) = setup_test_db().await;
        let project = create_test_project(&pool).await;
        let repo = VersionRepository::new(pool.clone());
        repo.create(project.id, &NewVersion::new("<html></html>", "Initial build"))
            .await
            .unwrap();

        ProjectRepository::new(pool).delete(project.id).await.unwrap();
        assert!(repo.list_for_project(project.id).await.unwrap().is_empty());
    }
}
