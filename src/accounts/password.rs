use argon2::{
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::error;

use super::error::AccountError;

/// Well-formed Argon2id hash with default parameters that no password
/// produces. Verified against when there is no real hash to check, so a
/// miss costs the same as a wrong password.
const DUMMY_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$Y29tbXVuaXR5aHVic2FsdA$taLJYlBhI2bqJy/6xtl0Sq9LRarNlqp8/Lkx7jtVglk";

/// Hash a raw password with a fresh random salt. Returns a PHC string.
pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

/// Check `plain` against a stored PHC string using the salt embedded in it.
///
/// `Ok(false)` only for a genuine mismatch; a hash this crate cannot check
/// (empty, unparseable, foreign algorithm, no salt/output) is a `Comparison` error.
pub fn verify_password(plain: &str, hash: &str) -> Result<bool, AccountError> {
    if hash.is_empty() {
        return Err(AccountError::Comparison("stored hash is empty".into()));
    }
    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        AccountError::Comparison(e.to_string())
    })?;
    if parsed.salt.is_none() || parsed.hash.is_none() {
        return Err(AccountError::Comparison(
            "stored hash has no salt or output".into(),
        ));
    }
    match Argon2::default().verify_password(plain.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(e) => {
            error!(error = %e, algorithm = %parsed.algorithm, "stored hash not verifiable");
            Err(AccountError::Comparison(e.to_string()))
        }
    }
}

/// [`hash_password`] on the blocking pool.
pub async fn hash_password_blocking(plain: String) -> Result<String, AccountError> {
    #[cfg(test)]
    work::HASHES.with(|n| n.set(n.get() + 1));

    tokio::task::spawn_blocking(move || hash_password(&plain))
        .await
        .map_err(|e| AccountError::Persistence(anyhow::anyhow!("hash task failed: {e}")))?
        .map_err(AccountError::Persistence)
}

/// [`verify_password`] on the blocking pool.
pub async fn verify_password_blocking(plain: String, hash: String) -> Result<bool, AccountError> {
    tokio::task::spawn_blocking(move || verify_password(&plain, &hash))
        .await
        .map_err(|e| AccountError::Comparison(format!("verify task failed: {e}")))?
}

/// Spend one verification's worth of work on a hash that never matches.
pub async fn verify_against_dummy(plain: String) {
    #[cfg(test)]
    work::DUMMY_VERIFIES.with(|n| n.set(n.get() + 1));

    if let Err(e) = verify_password_blocking(plain, DUMMY_HASH.to_string()).await {
        error!(error = %e, "dummy verify failed");
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_roundtrip() {
        let password = "Secur3P@ssw0rd!";
        let hash = hash_password(password).expect("hashing should succeed");
        assert_ne!(hash, password);
        assert!(hash.starts_with("$argon2"));
        assert!(hash.len() <= 255);
        assert!(verify_password(password, &hash).expect("verify should succeed"));
    }

    #[test]
    fn verify_rejects_wrong_password() {
        let password = "correct-horse-battery-staple";
        let hash = hash_password(password).expect("hashing should succeed");
        assert!(!verify_password("wrong-password", &hash).expect("verify should not error"));
    }

    #[test]
    fn same_password_gets_different_salts() {
        let a = hash_password("same-input").unwrap();
        let b = hash_password("same-input").unwrap();
        assert_ne!(a, b);
        assert!(verify_password("same-input", &a).unwrap());
        assert!(verify_password("same-input", &b).unwrap());
    }

    #[test]
    fn verify_errors_on_malformed_hash() {
        let err = verify_password("anything", "not-a-valid-hash").unwrap_err();
        assert!(matches!(err, AccountError::Comparison(_)));

        let err = verify_password("anything", "").unwrap_err();
        assert!(matches!(err, AccountError::Comparison(_)));
    }

    #[test]
    fn foreign_or_incomplete_phc_strings_are_comparison_errors() {
        let pbkdf2 = "$pbkdf2-sha256$i=100000,l=32$c2FsdHNhbHRzYWx0$taLJYlBhI2bqJy/6xtl0Sq9LRarNlqp8/Lkx7jtVglk";
        let err = verify_password("anything", pbkdf2).unwrap_err();
        assert!(matches!(err, AccountError::Comparison(_)));

        let err = verify_password("anything", "$argon2id$v=19$m=19456,t=2,p=1").unwrap_err();
        assert!(matches!(err, AccountError::Comparison(_)));
    }

    #[test]
    fn dummy_hash_is_checkable_and_never_matches() {
        assert!(!verify_password("", DUMMY_HASH).unwrap());
        assert!(!verify_password("not-a-real-password", DUMMY_HASH).unwrap());
    }

    #[tokio::test]
    async fn blocking_wrappers_agree_with_sync_versions() {
        let hash = hash_password_blocking("off-thread".into()).await.unwrap();
        assert!(verify_password_blocking("off-thread".into(), hash.clone())
            .await
            .unwrap());
        assert!(!verify_password_blocking("other".into(), hash).await.unwrap());
        assert_eq!(work::hashes(), 1);

        verify_against_dummy("anything".into()).await;
        assert_eq!(work::dummy_verifies(), 1);
    }
}
