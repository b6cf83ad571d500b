use std::collections::HashSet;

use timeclerk_core::domain::account::AccountId;
use timeclerk_core::domain::project::{Project, ProjectId, ProjectMembership, ProjectRole};

use super::{ProjectRepository, RepositoryError};
use crate::DbPool;

pub struct SqlProjectRepository {
    pool: DbPool,
}

impl SqlProjectRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ProjectRepository for SqlProjectRepository {
    async fn save(&self, project: Project) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO project (id, name, created_at)
             VALUES (?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET name = excluded.name",
        )
        .bind(&project.id.0)
        .bind(&project.name)
        .bind(project.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn save_member(&self, membership: ProjectMembership) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO project_member (project_id, account_id, role)
             VALUES (?, ?, ?)
             ON CONFLICT(project_id, account_id) DO UPDATE SET role = excluded.role",
        )
        .bind(&membership.project_id.0)
        .bind(&membership.account_id.0)
        .bind(membership.role.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn managed_project_ids(
        &self,
        account_id: &AccountId,
    ) -> Result<HashSet<ProjectId>, RepositoryError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT project_id FROM project_member WHERE account_id = ? AND role = ?",
        )
        .bind(&account_id.0)
        .bind(ProjectRole::Manager.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(project_id,)| ProjectId(project_id)).collect())
    }
}
