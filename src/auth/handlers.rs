use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{error, info, instrument, warn};

use crate::{
    accounts::{
        authenticate, create_account, to_external_view, update_account, verify_password, Account,
        AccountChanges, AccountError, AccountView, NewAccount,
    },
    auth::{
        dto::{AuthResponse, LoginRequest, RefreshRequest, RegisterRequest, UpdateProfileRequest},
        jwt::{load_active_account, AuthAccount, JwtKeys, TokenKind},
    },
    state::AppState,
};

const MIN_PASSWORD_LEN: usize = 8;

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me).patch(update_me))
}

fn reject(e: AccountError) -> (StatusCode, String) {
    match e {
        AccountError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
        AccountError::NotFound(_) => (StatusCode::NOT_FOUND, "Account not found".into()),
        AccountError::Comparison(_) | AccountError::Persistence(_) => {
            error!(error = %e, "account operation failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".into(),
            )
        }
    }
}

fn invalid_credentials() -> (StatusCode, String) {
    (StatusCode::UNAUTHORIZED, "Invalid credentials".into())
}

fn auth_response(state: &AppState, account: &Account) -> Result<AuthResponse, (StatusCode, String)> {
    let tokens = JwtKeys::from_ref(state).issue_pair(account.id).map_err(|e| {
        error!(error = %e, account_id = account.id, "jwt sign failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error".to_string(),
        )
    })?;
    Ok(AuthResponse {
        tokens,
        account: to_external_view(account),
    })
}

/// Self-registration. Always creates a `member`; email uniqueness is not checked.
#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), (StatusCode, String)> {
    payload.email = payload.email.trim().to_lowercase();

    if payload.password.chars().count() < MIN_PASSWORD_LEN {
        warn!("password too short");
        return Err((StatusCode::BAD_REQUEST, "Password too short".into()));
    }

    let input = NewAccount {
        email: payload.email,
        password: payload.password,
        full_name: payload.full_name.trim().to_string(),
        ..Default::default()
    };
    let account = create_account(state.accounts.as_ref(), input)
        .await
        .map_err(|e| {
            if let AccountError::Validation(msg) = &e {
                warn!(reason = %msg, "registration rejected");
            }
            reject(e)
        })?;

    let response = auth_response(&state, &account)?;
    info!(account_id = account.id, "account registered");
    Ok((StatusCode::CREATED, Json(response)))
}

/// Unknown email, wrong password and inactive account all answer the same 401.
#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, (StatusCode, String)> {
    payload.email = payload.email.trim().to_lowercase();

    let Some(account) = authenticate(state.accounts.as_ref(), &payload.email, &payload.password)
        .await
        .map_err(reject)?
    else {
        warn!("login rejected");
        return Err(invalid_credentials());
    };

    let response = auth_response(&state, &account)?;
    info!(account_id = account.id, "account logged in");
    Ok(Json(response))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<AuthResponse>, (StatusCode, String)> {
    let claims = JwtKeys::from_ref(&state)
        .verify(&payload.refresh_token, TokenKind::Refresh)
        .map_err(|e| {
            warn!(error = %e, "refresh token rejected");
            (StatusCode::UNAUTHORIZED, "Invalid or expired token".to_string())
        })?;

    let account = load_active_account(&state, claims.sub).await?;
    Ok(Json(auth_response(&state, &account)?))
}

#[instrument(skip_all, fields(account_id = account.id))]
pub async fn get_me(AuthAccount(account): AuthAccount) -> Json<AccountView> {
    Json(to_external_view(&account))
}

/// Profile edit. A new password needs the current one.
#[instrument(skip_all, fields(account_id = account.id))]
pub async fn update_me(
    State(state): State<AppState>,
    AuthAccount(account): AuthAccount,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<AccountView>, (StatusCode, String)> {
    if let Some(new_password) = &payload.password {
        let Some(current) = payload.current_password.as_deref() else {
            return Err((
                StatusCode::BAD_REQUEST,
                "current_password is required".into(),
            ));
        };
        if !verify_password(current, &account).await.map_err(reject)? {
            warn!("password change with wrong current password");
            return Err(invalid_credentials());
        }
        if new_password.chars().count() < MIN_PASSWORD_LEN {
            return Err((StatusCode::BAD_REQUEST, "Password too short".into()));
        }
    }

    let changes = AccountChanges {
        full_name: payload.full_name.map(|n| n.trim().to_string()),
        password: payload.password,
        ..Default::default()
    };
    let updated = update_account(state.accounts.as_ref(), account.id, changes)
        .await
        .map_err(reject)?;

    Ok(Json(to_external_view(&updated)))
}
