use serde::{Deserialize, Serialize};

use crate::{accounts::AccountView, auth::jwt::TokenPair};

// Missing string fields deserialize as "" so they fail validation with 400
// instead of an extractor rejection.

/// Request body for registration.
#[derive(Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub full_name: String,
}

/// Request body for login.
#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Request body for token refresh.
#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Request body for `PATCH /me`.
#[derive(Deserialize)]
pub struct UpdateProfileRequest {
    pub full_name: Option<String>,
    pub password: Option<String>,
    pub current_password: Option<String>,
}

/// Response returned after register, login or refresh.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    #[serde(flatten)]
    pub tokens: TokenPair,
    pub account: AccountView,
}
