use sqlx::{sqlite::SqliteRow, Row};

use timeclerk_core::domain::account::{Account, AccountId};

use super::{parse_timestamp, AccountRepository, RepositoryError};
use crate::DbPool;

pub struct SqlAccountRepository {
    pool: DbPool,
}

impl SqlAccountRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl AccountRepository for SqlAccountRepository {
    async fn find_by_id(&self, id: &AccountId) -> Result<Option<Account>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, email, display_name, admin, created_at FROM account WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(account_from_row).transpose()
    }

    async fn save(&self, account: Account) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO account (id, email, display_name, admin, created_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                email = excluded.email,
                display_name = excluded.display_name,
                admin = excluded.admin",
        )
        .bind(&account.id.0)
        .bind(&account.email)
        .bind(&account.display_name)
        .bind(i64::from(account.admin))
        .bind(account.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn account_from_row(row: SqliteRow) -> Result<Account, RepositoryError> {
    Ok(Account {
        id: AccountId(row.try_get("id")?),
        email: row.try_get("email")?,
        display_name: row.try_get("display_name")?,
        admin: row.try_get::<i64, _>("admin")? != 0,
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
    })
}
