use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

/// Access level of an account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "account_role", rename_all = "snake_case")]
pub enum Role {
    PlatformAdmin,
    CommunityAdmin,
    #[default]
    Member,
}

/// Account row in the `users` table.
///
/// Deliberately not `Serialize`: anything leaving the process goes through
/// [`to_external_view`].
#[derive(Clone, FromRow)]
pub struct Account {
    pub id: i32,
    pub email: String,
    pub password_hash: String, // PHC string, never the raw password
    pub full_name: String,
    pub role: Role,
    pub points: i32,
    pub join_date: OffsetDateTime,
    pub community_id: Option<i32>,
    pub is_active: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("password_hash", &"<redacted>")
            .field("full_name", &self.full_name)
            .field("role", &self.role)
            .field("points", &self.points)
            .field("join_date", &self.join_date)
            .field("community_id", &self.community_id)
            .field("is_active", &self.is_active)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

/// Account fields safe to send to clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountView {
    pub id: i32,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub points: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub join_date: OffsetDateTime,
    pub community_id: Option<i32>,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Project an account onto its external view, dropping the password hash.
pub fn to_external_view(account: &Account) -> AccountView {
    AccountView {
        id: account.id,
        email: account.email.clone(),
        full_name: account.full_name.clone(),
        role: account.role,
        points: account.points,
        join_date: account.join_date,
        community_id: account.community_id,
        is_active: account.is_active,
        created_at: account.created_at,
        updated_at: account.updated_at,
    }
}

/// Input for account registration. `password` is the raw value.
#[derive(Clone, Default)]
pub struct NewAccount {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub role: Option<Role>,
    pub community_id: Option<i32>,
    pub points: Option<i32>,
    pub is_active: Option<bool>,
}

impl fmt::Debug for NewAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewAccount")
            .field("email", &self.email)
            .field("full_name", &self.full_name)
            .field("role", &self.role)
            .field("community_id", &self.community_id)
            .field("points", &self.points)
            .field("is_active", &self.is_active)
            .finish_non_exhaustive()
    }
}

/// Partial update of an account. `None` leaves the column untouched;
/// `community_id: Some(None)` clears the reference.
#[derive(Clone, Default)]
pub struct AccountChanges {
    pub full_name: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
    pub points: Option<i32>,
    pub community_id: Option<Option<i32>>,
    pub is_active: Option<bool>,
}

/// Validated, hashed row handed to the store on insert.
#[derive(Clone)]
pub struct NewAccountRow {
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    pub role: Role,
    pub points: i32,
    pub community_id: Option<i32>,
    pub is_active: bool,
}

/// Validated, hashed column changes handed to the store on update.
#[derive(Clone, Default)]
pub struct AccountPatch {
    pub full_name: Option<String>,
    pub password_hash: Option<String>,
    pub role: Option<Role>,
    pub points: Option<i32>,
    pub community_id: Option<Option<i32>>,
    pub is_active: Option<bool>,
}

impl fmt::Debug for NewAccountRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewAccountRow")
            .field("email", &self.email)
            .field("password_hash", &"<redacted>")
            .field("full_name", &self.full_name)
            .field("role", &self.role)
            .field("points", &self.points)
            .field("community_id", &self.community_id)
            .field("is_active", &self.is_active)
            .finish()
    }
}

impl fmt::Debug for AccountPatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountPatch")
            .field("full_name", &self.full_name)
            .field(
                "password_hash",
                &self.password_hash.as_ref().map(|_| "<redacted>"),
            )
            .field("role", &self.role)
            .field("points", &self.points)
            .field("community_id", &self.community_id)
            .field("is_active", &self.is_active)
            .finish()
    }
}

#[cfg(test)]
pub(crate) fn sample_account(password_hash: &str) -> Account {
    let now = OffsetDateTime::now_utc();
    Account {
        id: 7,
        email: "ada@example.com".into(),
        password_hash: password_hash.into(),
        full_name: "Ada Lovelace".into(),
        role: Role::CommunityAdmin,
        points: 42,
        join_date: now,
        community_id: Some(3),
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}
