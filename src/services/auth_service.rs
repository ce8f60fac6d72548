//! Password hashing and JWT issuance for dashboard accounts.
//!
//! # Tokens
//!
//! Access and refresh tokens are HS256 JWTs signed with `JWT_SECRET`. They
//! differ only in `token_type` and lifetime; a refresh token is never
//! accepted where an access token is expected and vice versa.
//!
//! ```json
//! {
//!   "sub": "12",
//!   "username": "alice",
//!   "token_type": "access",
//!   "iat": 1735689600,
//!   "exp": 1735693200,
//!   "jti": "5f1c0c7e-..."
//! }
//! ```

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::Config,
    db::DbPool,
    error::AppError,
    models::dashboard_user::{DashboardUser, TokenPairResponse},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Dashboard user id, as a string.
    pub sub: String,
    pub username: String,
    pub token_type: TokenType,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

impl Claims {
    pub fn user_id(&self) -> Result<i64, AppError> {
        self.sub.parse().map_err(|_| AppError::InvalidToken)
    }
}

/// Signing material and lifetimes, built once at startup.
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenKeys {
    pub fn new(secret: &str, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            access_ttl,
            refresh_ttl,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.signing_secret().unwrap_or_default(),
            Duration::minutes(config.access_token_ttl_minutes),
            Duration::days(config.refresh_token_ttl_days),
        )
    }

    fn issue(&self, user_id: i64, username: &str, token_type: TokenType) -> Result<String, AppError> {
        let now = Utc::now();
        let ttl = match token_type {
            TokenType::Access => self.access_ttl,
            TokenType::Refresh => self.refresh_ttl,
        };
        let claims = Claims {
            sub: user_id.to_string(),
            username: username.to_string(),
            token_type,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            jti: Uuid::new_v4().to_string(),
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("failed to sign token: {e}")))
    }

    pub fn access_token(&self, user_id: i64, username: &str) -> Result<String, AppError> {
        self.issue(user_id, username, TokenType::Access)
    }

    pub fn token_pair(&self, user_id: i64, username: &str) -> Result<TokenPairResponse, AppError> {
        Ok(TokenPairResponse {
            access: self.issue(user_id, username, TokenType::Access)?,
            refresh: self.issue(user_id, username, TokenType::Refresh)?,
        })
    }

    /// Decode `token` and require it to be of `expected` type.
    pub fn verify(&self, token: &str, expected: TokenType) -> Result<Claims, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding, &validation).map_err(
            |e| match e.kind() {
                ErrorKind::ExpiredSignature => AppError::TokenExpired,
                _ => AppError::InvalidToken,
            },
        )?;

        if data.claims.token_type != expected {
            return Err(AppError::InvalidToken);
        }
        Ok(data.claims)
    }
}

/// Hash a password into an argon2id PHC string.
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("failed to hash password: {e}")))
}

/// Check `password` against a stored PHC string. Malformed hashes never match.
pub fn verify_password(password: &str, password_hash: &str) -> bool {
    PasswordHash::new(password_hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

/// Load an active dashboard user by id.
pub async fn active_user(pool: &DbPool, user_id: i64) -> Result<Option<DashboardUser>, AppError> {
    let user = sqlx::query_as::<_, DashboardUser>(
        "SELECT * FROM dashboard_users WHERE id = $1 AND is_active",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(user)
}

/// Exchange credentials for a token pair.
pub async fn login(
    pool: &DbPool,
    keys: &TokenKeys,
    username: &str,
    password: &str,
) -> Result<TokenPairResponse, AppError> {
    let user = sqlx::query_as::<_, DashboardUser>(
        "SELECT * FROM dashboard_users WHERE username = $1",
    )
    .bind(username.trim())
    .fetch_optional(pool)
    .await?
    .filter(|user| user.is_active)
    .ok_or(AppError::InvalidCredentials)?;

    if !verify_password(password, &user.password_hash) {
        tracing::info!(username = %user.username, "rejected login");
        return Err(AppError::InvalidCredentials);
    }

    tracing::info!(user_id = user.id, username = %user.username, "issued token pair");
    keys.token_pair(user.id, &user.username)
}

/// Exchange a refresh token for a new access token.
///
/// The account must still exist and be active.
pub async fn refresh(pool: &DbPool, keys: &TokenKeys, refresh_token: &str) -> Result<String, AppError> {
    let claims = keys.verify(refresh_token, TokenType::Refresh)?;
    let user = active_user(pool, claims.user_id()?)
        .await?
        .ok_or(AppError::InvalidToken)?;
    keys.access_token(user.id, &user.username)
}

/// Create a dashboard account.
pub async fn create_user(
    pool: &DbPool,
    username: &str,
    password: &str,
    email: Option<&str>,
    full_name: &str,
    is_seller: bool,
    is_staff: bool,
) -> Result<DashboardUser, AppError> {
    let password_hash = hash_password(password)?;
    let user = sqlx::query_as::<_, DashboardUser>(
        r#"
        INSERT INTO dashboard_users (username, email, password_hash, full_name, is_seller, is_staff)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(username.trim())
    .bind(email.map(str::trim).filter(|e| !e.is_empty()))
    .bind(password_hash)
    .bind(full_name.trim())
    .bind(is_seller)
    .bind(is_staff)
    .fetch_one(pool)
    .await?;
    Ok(user)
}

/// Replace the password of an existing account.
pub async fn set_password(pool: &DbPool, username: &str, password: &str) -> Result<(), AppError> {
    let password_hash = hash_password(password)?;
    let updated = sqlx::query("UPDATE dashboard_users SET password_hash = $1 WHERE username = $2")
        .bind(password_hash)
        .bind(username.trim())
        .execute(pool)
        .await?
        .rows_affected();

    if updated == 0 {
        return Err(AppError::not_found("User"));
    }
    Ok(())
}
