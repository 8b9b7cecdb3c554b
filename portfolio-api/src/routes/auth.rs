//! Authentication endpoints and extractors

use std::net::SocketAddr;
use std::sync::Arc;

use axum::async_trait;
use axum::extract::{ConnectInfo, FromRequestParts, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::Json;
use serde::{Deserialize, Serialize};

use portfolio_store::Role;

use crate::error::ApiError;
use crate::sanitize::is_valid_email;
use crate::state::AppState;
use crate::token::Claims;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: &'static str,
    /// Token lifetime in seconds
    pub expires_in: i64,
    pub user: UserProfile,
}

#[derive(Serialize)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub role: Role,
}

/// POST /auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    client: ClientAddr,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let email = req.email.trim().to_lowercase();
    if !is_valid_email(&email) {
        return Err(ApiError::Validation(
            "email must be a valid address".to_string(),
        ));
    }
    if req.password.len() < 8 || req.password.len() > 128 {
        return Err(ApiError::Validation(
            "password must be between 8 and 128 characters".to_string(),
        ));
    }

    // Lockouts are scoped to (email, client address) so one origin
    // cannot lock the account out for everyone else.
    let identity = format!("{email}|{}", client.0);

    let lock = state.login_attempts.lock_status(&identity);
    if lock.locked {
        return Err(ApiError::Locked {
            retry_after_secs: lock.retry_after_secs,
        });
    }

    let user = match state.users.find_by_email(&email).await? {
        Some(user) if bcrypt::verify(&req.password, &user.password_hash).unwrap_or(false) => user,
        _ => {
            let status = state.login_attempts.register_failure(&identity);
            if status.locked {
                return Err(ApiError::Locked {
                    retry_after_secs: status.retry_after_secs,
                });
            }
            return Err(ApiError::InvalidCredentials);
        }
    };

    state.login_attempts.clear(&identity);
    let token = state.tokens.issue(&user)?;

    Ok(Json(LoginResponse {
        access_token: token,
        token_type: "Bearer",
        expires_in: state.tokens.ttl_seconds(),
        user: UserProfile {
            id: user.id,
            email: user.email,
            role: user.role,
        },
    }))
}

/// GET /auth/me
pub async fn me(
    State(state): State<Arc<AppState>>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> Result<Json<UserProfile>, ApiError> {
    let user = state
        .users
        .find_by_id(&claims.sub)
        .await?
        .ok_or(ApiError::UserNotFound)?;

    Ok(Json(UserProfile {
        id: user.id,
        email: user.email,
        role: user.role,
    }))
}

/// Client network address used for lockout accounting. Honors the first
/// `X-Forwarded-For` hop only when the service trusts its proxy.
pub struct ClientAddr(pub String);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for ClientAddr {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        if state.config.trust_proxy {
            let forwarded = parts
                .headers
                .get("x-forwarded-for")
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.split(',').next())
                .map(str::trim)
                .filter(|value| !value.is_empty());
            if let Some(addr) = forwarded {
                return Ok(ClientAddr(addr.to_string()));
            }
        }

        let addr = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|info| info.0.ip().to_string())
            .unwrap_or_else(|| "local".to_string());
        Ok(ClientAddr(addr))
    }
}

/// Extractor for bearer-authenticated requests
pub struct AuthenticatedUser(pub Claims);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthenticatedUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        let token = header
            .strip_prefix("Bearer ")
            .filter(|token| !token.is_empty())
            .ok_or(ApiError::AuthRequired)?;

        let claims = state.tokens.verify(token)?;
        Ok(AuthenticatedUser(claims))
    }
}

/// Extractor that additionally requires the admin role
pub struct AdminUser(pub Claims);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let AuthenticatedUser(claims) =
            AuthenticatedUser::from_request_parts(parts, state).await?;
        if claims.role != Role::Admin {
            return Err(ApiError::Forbidden);
        }
        Ok(AdminUser(claims))
    }
}
