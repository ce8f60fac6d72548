//! Dashboard accounts (staff and sellers) used for login.
//!
//! These are the people operating the dashboard, not the hierarchy users
//! being browsed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Represents a dashboard account record from the database.
///
/// # Database Table
///
/// Maps to the `dashboard_users` table. `password_hash` is an argon2 PHC
/// string and is never serialized.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DashboardUser {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    pub password_hash: String,
    pub full_name: String,
    pub is_seller: bool,
    pub is_staff: bool,
    pub is_active: bool,
    pub date_joined: DateTime<Utc>,
}

impl DashboardUser {
    /// Name shown to other users: full name, falling back to username.
    pub fn display_name(&self) -> &str {
        if self.full_name.trim().is_empty() {
            &self.username
        } else {
            &self.full_name
        }
    }
}

/// Response body for `GET /api/v1/users/me`.
#[derive(Debug, Serialize)]
pub struct DashboardUserResponse {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    pub full_name: String,
    pub is_seller: bool,
    pub is_staff: bool,
    pub is_active: bool,
    pub date_joined: DateTime<Utc>,
}

impl From<DashboardUser> for DashboardUserResponse {
    fn from(user: DashboardUser) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            full_name: user.full_name,
            is_seller: user.is_seller,
            is_staff: user.is_staff,
            is_active: user.is_active,
            date_joined: user.date_joined,
        }
    }
}

/// Request body for `PATCH /api/v1/users/me`.
///
/// An empty email clears it (stored as NULL so the unique index still holds).
#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub email: Option<String>,
    pub full_name: Option<String>,
}

impl UpdateProfileRequest {
    /// `Some(None)` means "clear the email".
    pub fn normalized_email(&self) -> Option<Option<String>> {
        self.email.as_ref().map(|email| {
            let email = email.trim();
            (!email.is_empty()).then(|| email.to_string())
        })
    }
}

/// Request body for `POST /api/v1/auth/token`.
#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenPairResponse {
    pub access: String,
    pub refresh: String,
}

/// Request body for `POST /api/v1/auth/token/refresh`.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh: String,
}

#[derive(Debug, Serialize)]
pub struct AccessTokenResponse {
    pub access: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_email_clears_the_field() {
        let req = UpdateProfileRequest {
            email: Some("   ".into()),
            full_name: None,
        };
        assert_eq!(req.normalized_email(), Some(None));

        let req = UpdateProfileRequest {
            email: Some(" a@b.io ".into()),
            full_name: None,
        };
        assert_eq!(req.normalized_email(), Some(Some("a@b.io".into())));

        let req = UpdateProfileRequest {
            email: None,
            full_name: Some("Ann".into()),
        };
        assert_eq!(req.normalized_email(), None);
    }
}
