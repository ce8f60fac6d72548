//! Token endpoints.
//!
//! - POST /api/v1/auth/token - Exchange username and password for a token pair
//! - POST /api/v1/auth/token/refresh - Exchange a refresh token for an access token

use std::sync::Arc;

use axum::{Json, extract::State};

use crate::{
    db::DbPool,
    error::AppError,
    extract::AppJson,
    models::dashboard_user::{AccessTokenResponse, RefreshRequest, TokenPairResponse, TokenRequest},
    services::auth_service::{self, TokenKeys},
};

/// Log in.
///
/// # Endpoint
///
/// `POST /api/v1/auth/token`
///
/// # Request Body
///
/// ```json
/// { "username": "alice", "password": "..." }
/// ```
///
/// # Response
///
/// - **Success (200 OK)**: `{"access": "...", "refresh": "..."}`
/// - **Error (401)**: unknown user, wrong password or inactive account
pub async fn obtain_token(
    State(pool): State<DbPool>,
    State(tokens): State<Arc<TokenKeys>>,
    AppJson(request): AppJson<TokenRequest>,
) -> Result<Json<TokenPairResponse>, AppError> {
    let pair = auth_service::login(&pool, &tokens, &request.username, &request.password).await?;
    Ok(Json(pair))
}

/// Refresh an access token.
///
/// # Endpoint
///
/// `POST /api/v1/auth/token/refresh`
///
/// # Response
///
/// - **Success (200 OK)**: `{"access": "..."}`
/// - **Error (401)**: refresh token invalid, expired, or of the wrong type
pub async fn refresh_token(
    State(pool): State<DbPool>,
    State(tokens): State<Arc<TokenKeys>>,
    AppJson(request): AppJson<RefreshRequest>,
) -> Result<Json<AccessTokenResponse>, AppError> {
    let access = auth_service::refresh(&pool, &tokens, &request.refresh).await?;
    Ok(Json(AccessTokenResponse { access }))
}
