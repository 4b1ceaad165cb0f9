//! Session tokens and the extractor that turns a bearer token into the
//! signed-in account.
//!
//! Every token carries the account id in `sub` and its [`TokenKind`]. Access
//! tokens authorize requests; refresh tokens only mint new pairs. A token
//! for an account that no longer exists or was deactivated is rejected even
//! if its signature and expiry are fine.

use std::time::Duration;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts, StatusCode},
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::{accounts::Account, config::JwtConfig, state::AppState};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i32, // account id
    pub exp: usize,
    pub iat: usize,
    pub iss: String,
    pub aud: String,
    pub kind: TokenKind,
    pub jti: Uuid,
}

/// Access + refresh token issued together.
#[derive(Debug, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Signing material and lifetimes, built from [`JwtConfig`].
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    issuer: String,
    audience: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

fn minutes(m: i64) -> Duration {
    Duration::from_secs(m.max(0) as u64 * 60)
}

impl From<JwtConfig> for JwtKeys {
    fn from(cfg: JwtConfig) -> Self {
        let mut validation = Validation::default();
        validation.set_audience(&[cfg.audience.as_str()]);
        validation.set_issuer(&[cfg.issuer.as_str()]);
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            validation,
            issuer: cfg.issuer,
            audience: cfg.audience,
            access_ttl: minutes(cfg.ttl_minutes),
            refresh_ttl: minutes(cfg.refresh_ttl_minutes),
        }
    }
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        state.config.jwt.clone().into()
    }
}

impl JwtKeys {
    pub fn sign(&self, account_id: i32, kind: TokenKind) -> anyhow::Result<String> {
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        let iat = OffsetDateTime::now_utc().unix_timestamp() as usize;
        let claims = Claims {
            sub: account_id,
            iat,
            exp: iat + ttl.as_secs() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            kind,
            jti: Uuid::new_v4(),
        };
        Ok(encode(&Header::default(), &claims, &self.encoding)?)
    }

    pub fn issue_pair(&self, account_id: i32) -> anyhow::Result<TokenPair> {
        let pair = TokenPair {
            access_token: self.sign(account_id, TokenKind::Access)?,
            refresh_token: self.sign(account_id, TokenKind::Refresh)?,
        };
        debug!(account_id, "token pair issued");
        Ok(pair)
    }

    /// Check signature, expiry, issuer, audience and that the token is of `expected` kind.
    pub fn verify(&self, token: &str, expected: TokenKind) -> anyhow::Result<Claims> {
        let claims = decode::<Claims>(token, &self.decoding, &self.validation)?.claims;
        if claims.kind != expected {
            anyhow::bail!("expected {:?} token, got {:?}", expected, claims.kind);
        }
        Ok(claims)
    }
}

/// Token from an `Authorization: Bearer <token>` header; scheme is case-insensitive.
fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Load the account a token was issued for, if it still exists and is active.
pub async fn load_active_account(
    state: &AppState,
    account_id: i32,
) -> Result<Account, (StatusCode, String)> {
    match state.accounts.find_by_id(account_id).await {
        Ok(Some(account)) if account.is_active => Ok(account),
        Ok(_) => {
            warn!(account_id, "token for missing or inactive account");
            Err((StatusCode::UNAUTHORIZED, "Account not found".into()))
        }
        Err(e) => {
            error!(error = %e, account_id, "find_by_id failed");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".into(),
            ))
        }
    }
}

/// The active account behind a valid access token.
pub struct AuthAccount(pub Account);

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthAccount {
    type Rejection = (StatusCode, String);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or((
            StatusCode::UNAUTHORIZED,
            "Missing or invalid Authorization header".to_string(),
        ))?;

        let claims = JwtKeys::from_ref(state)
            .verify(token, TokenKind::Access)
            .map_err(|e| {
                warn!(error = %e, "access token rejected");
                (
                    StatusCode::UNAUTHORIZED,
                    "Invalid or expired token".to_string(),
                )
            })?;

        load_active_account(state, claims.sub).await.map(AuthAccount)
    }
}
