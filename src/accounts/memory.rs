use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Mutex,
};

use async_trait::async_trait;
use time::OffsetDateTime;

use super::model::{Account, AccountPatch, NewAccountRow};
use super::repo::AccountStore;

/// Vec-backed store for tests. Counts inserts so callers can assert that a
/// rejected request never reached storage.
#[derive(Default)]
pub struct MemoryAccountStore {
    rows: Mutex<Vec<Account>>,
    inserts: AtomicUsize,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_count(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }

    fn rows(&self) -> anyhow::Result<std::sync::MutexGuard<'_, Vec<Account>>> {
        self.rows
            .lock()
            .map_err(|_| anyhow::anyhow!("account store lock poisoned"))
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn insert(&self, row: NewAccountRow) -> anyhow::Result<Account> {
        let mut rows = self.rows()?;
        self.inserts.fetch_add(1, Ordering::SeqCst);
        let now = OffsetDateTime::now_utc();
        let account = Account {
            id: rows.len() as i32 + 1,
            email: row.email,
            password_hash: row.password_hash,
            full_name: row.full_name,
            role: row.role,
            points: row.points,
            join_date: now,
            community_id: row.community_id,
            is_active: row.is_active,
            created_at: now,
            updated_at: now,
        };
        rows.push(account.clone());
        Ok(account)
    }

    async fn find_by_id(&self, id: i32) -> anyhow::Result<Option<Account>> {
        Ok(self.rows()?.iter().find(|a| a.id == id).cloned())
    }

    async fn list_by_email(&self, email: &str) -> anyhow::Result<Vec<Account>> {
        Ok(self
            .rows()?
            .iter()
            .filter(|a| a.email == email)
            .cloned()
            .collect())
    }

    async fn update(&self, id: i32, patch: AccountPatch) -> anyhow::Result<Option<Account>> {
        let mut rows = self.rows()?;
        let Some(account) = rows.iter_mut().find(|a| a.id == id) else {
            return Ok(None);
        };
        if let Some(full_name) = patch.full_name {
            account.full_name = full_name;
        }
        if let Some(hash) = patch.password_hash {
            account.password_hash = hash;
        }
        if let Some(role) = patch.role {
            account.role = role;
        }
        if let Some(points) = patch.points {
            account.points = points;
        }
        if let Some(community_id) = patch.community_id {
            account.community_id = community_id;
        }
        if let Some(is_active) = patch.is_active {
            account.is_active = is_active;
        }
        account.updated_at = OffsetDateTime::now_utc();
        Ok(Some(account.clone()))
    }
}
