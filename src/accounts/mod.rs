//! Account model: schema, validation, password hashing and the
//! client-safe view.
//!
//! Creation validates first, hashes the raw password exactly once, then
//! writes. Nothing here enforces email uniqueness; see the migration.

pub mod error;
#[cfg(test)]
pub mod memory;
pub mod model;
pub mod password;
pub mod repo;
pub mod services;

pub use error::AccountError;
pub use model::{to_external_view, Account, AccountChanges, AccountView, NewAccount};
pub use repo::{AccountStore, PgAccountStore};
pub use services::{authenticate, create_account, update_account, verify_password};
