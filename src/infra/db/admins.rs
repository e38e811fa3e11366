use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    application::repos::{AdminsRepo, RepoError},
    domain::entities::AdminRecord,
};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct AdminRow {
    id: Uuid,
    passcode: String,
    owner: String,
}

impl From<AdminRow> for AdminRecord {
    fn from(row: AdminRow) -> Self {
        Self {
            id: row.id,
            passcode: row.passcode,
            owner: row.owner,
        }
    }
}

#[async_trait]
impl AdminsRepo for PostgresRepositories {
    async fn find_admin_by_passcode(
        &self,
        passcode: &str,
    ) -> Result<Option<AdminRecord>, RepoError> {
        let row = sqlx::query_as::<_, AdminRow>(
            "SELECT id, passcode, owner FROM admin_passcodes WHERE passcode = $1",
        )
        .bind(passcode)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(AdminRecord::from))
    }

    async fn find_admin_by_id(&self, id: Uuid) -> Result<Option<AdminRecord>, RepoError> {
        let row = sqlx::query_as::<_, AdminRow>(
            "SELECT id, passcode, owner FROM admin_passcodes WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(AdminRecord::from))
    }
}
