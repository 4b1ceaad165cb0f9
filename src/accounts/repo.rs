use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;

use super::model::{Account, AccountPatch, NewAccountRow};

const ACCOUNT_COLUMNS: &str = "id, email, password_hash, full_name, role, points, join_date, \
                               community_id, is_active, created_at, updated_at";

/// Durable storage for account rows, keyed by `id`.
///
/// Email is not a key: several rows may share one.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn insert(&self, row: NewAccountRow) -> anyhow::Result<Account>;
    async fn find_by_id(&self, id: i32) -> anyhow::Result<Option<Account>>;
    /// All accounts with this email, oldest first.
    async fn list_by_email(&self, email: &str) -> anyhow::Result<Vec<Account>>;
    /// Apply `patch` and bump `updated_at`. `None` if no such row.
    async fn update(&self, id: i32, patch: AccountPatch) -> anyhow::Result<Option<Account>>;
}

#[derive(Clone)]
pub struct PgAccountStore {
    db: PgPool,
}

impl PgAccountStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn insert(&self, row: NewAccountRow) -> anyhow::Result<Account> {
        let sql = format!(
            r#"
            INSERT INTO users (email, password_hash, full_name, role, points, community_id, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {ACCOUNT_COLUMNS}
            "#
        );
        let account = sqlx::query_as::<_, Account>(&sql)
            .bind(&row.email)
            .bind(&row.password_hash)
            .bind(&row.full_name)
            .bind(row.role)
            .bind(row.points)
            .bind(row.community_id)
            .bind(row.is_active)
            .fetch_one(&self.db)
            .await
            .context("insert account")?;
        Ok(account)
    }

    async fn find_by_id(&self, id: i32) -> anyhow::Result<Option<Account>> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM users WHERE id = $1");
        let account = sqlx::query_as::<_, Account>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .context("find account by id")?;
        Ok(account)
    }

    async fn list_by_email(&self, email: &str) -> anyhow::Result<Vec<Account>> {
        let sql = format!(
            r#"
            SELECT {ACCOUNT_COLUMNS}
              FROM users
             WHERE email = $1
             ORDER BY id ASC
            "#
        );
        let rows = sqlx::query_as::<_, Account>(&sql)
            .bind(email)
            .fetch_all(&self.db)
            .await
            .context("list accounts by email")?;
        Ok(rows)
    }

    async fn update(&self, id: i32, patch: AccountPatch) -> anyhow::Result<Option<Account>> {
        let (set_community, community_id) = match patch.community_id {
            Some(value) => (true, value),
            None => (false, None),
        };
        let sql = format!(
            r#"
            UPDATE users
               SET full_name     = COALESCE($2, full_name),
                   password_hash = COALESCE($3, password_hash),
                   role          = COALESCE($4, role),
                   points        = COALESCE($5, points),
                   community_id  = CASE WHEN $6 THEN $7 ELSE community_id END,
                   is_active     = COALESCE($8, is_active),
                   updated_at    = now()
             WHERE id = $1
            RETURNING {ACCOUNT_COLUMNS}
            "#
        );
        let account = sqlx::query_as::<_, Account>(&sql)
            .bind(id)
            .bind(patch.full_name)
            .bind(patch.password_hash)
            .bind(patch.role)
            .bind(patch.points)
            .bind(set_community)
            .bind(community_id)
            .bind(patch.is_active)
            .fetch_optional(&self.db)
            .await
            .with_context(|| format!("update account {id}"))?;
        Ok(account)
    }
}
