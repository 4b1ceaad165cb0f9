use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, error, info, instrument};

use super::{
    error::AccountError,
    model::{Account, AccountChanges, AccountPatch, NewAccount, NewAccountRow},
    password,
    repo::AccountStore,
};

const MAX_FIELD_LEN: usize = 255;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn check_full_name(full_name: &str) -> Result<(), AccountError> {
    if full_name.trim().is_empty() {
        return Err(AccountError::validation("full_name is required"));
    }
    if full_name.chars().count() > MAX_FIELD_LEN {
        return Err(AccountError::validation("full_name is too long"));
    }
    Ok(())
}

fn check_password(password: &str) -> Result<(), AccountError> {
    if password.is_empty() {
        return Err(AccountError::validation("password is required"));
    }
    Ok(())
}

/// Reject malformed registration input. Runs before any hashing.
pub fn validate_new_account(input: &NewAccount) -> Result<(), AccountError> {
    if input.email.is_empty() {
        return Err(AccountError::validation("email is required"));
    }
    if input.email.chars().count() > MAX_FIELD_LEN || !is_valid_email(&input.email) {
        return Err(AccountError::validation("email is invalid"));
    }
    check_password(&input.password)?;
    check_full_name(&input.full_name)
}

/// Validate, hash the raw password once, then persist.
#[instrument(skip_all)]
pub async fn create_account(
    store: &dyn AccountStore,
    input: NewAccount,
) -> Result<Account, AccountError> {
    validate_new_account(&input)?;

    let NewAccount {
        email,
        password,
        full_name,
        role,
        community_id,
        points,
        is_active,
    } = input;

    let password_hash = password::hash_password_blocking(password).await?;

    let row = NewAccountRow {
        email,
        password_hash,
        full_name,
        role: role.unwrap_or_default(),
        points: points.unwrap_or(0),
        community_id,
        is_active: is_active.unwrap_or(true),
    };
    let account = store.insert(row).await.map_err(AccountError::Persistence)?;

    info!(account_id = account.id, role = ?account.role, "account created");
    Ok(account)
}

/// Compare a candidate password with the account's stored hash.
pub async fn verify_password(candidate: &str, account: &Account) -> Result<bool, AccountError> {
    password::verify_password_blocking(candidate.to_owned(), account.password_hash.clone()).await
}

/// Find the active account with this email whose hash matches `candidate`.
///
/// Several accounts may share an email; they are tried oldest first. A row
/// whose stored hash cannot be checked is skipped. When no argon2 verify ran
/// at all (unknown email, only inactive or unreadable rows) one dummy verify
/// is spent, so a miss costs the same as a wrong password.
#[instrument(skip_all)]
pub async fn authenticate(
    store: &dyn AccountStore,
    email: &str,
    candidate: &str,
) -> Result<Option<Account>, AccountError> {
    let candidates = store
        .list_by_email(email)
        .await
        .map_err(AccountError::Persistence)?;

    let mut verified = 0usize;
    for account in candidates.into_iter().filter(|a| a.is_active) {
        match verify_password(candidate, &account).await {
            Ok(true) => return Ok(Some(account)),
            Ok(false) => verified += 1,
            Err(AccountError::Comparison(reason)) => {
                error!(account_id = account.id, %reason, "stored hash unusable, skipping");
            }
            Err(e) => return Err(e),
        }
    }

    if verified == 0 {
        password::verify_against_dummy(candidate.to_owned()).await;
    }
    Ok(None)
}

/// Apply a partial update. The password is re-hashed only when one is supplied.
#[instrument(skip(store, changes))]
pub async fn update_account(
    store: &dyn AccountStore,
    id: i32,
    changes: AccountChanges,
) -> Result<Account, AccountError> {
    if let Some(full_name) = &changes.full_name {
        check_full_name(full_name)?;
    }
    if let Some(password) = &changes.password {
        check_password(password)?;
    }

    let password_hash = match changes.password {
        Some(password) => Some(password::hash_password_blocking(password).await?),
        None => None,
    };
    let rehashed = password_hash.is_some();

    let patch = AccountPatch {
        full_name: changes.full_name,
        password_hash,
        role: changes.role,
        points: changes.points,
        community_id: changes.community_id,
        is_active: changes.is_active,
    };
    let account = store
        .update(id, patch)
        .await
        .map_err(AccountError::Persistence)?
        .ok_or(AccountError::NotFound(id))?;

    debug!(account_id = id, rehashed, "account updated");
    Ok(account)
}
