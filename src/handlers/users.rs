//! The authenticated dashboard user's own profile.

use axum::{Extension, Json, extract::State};

use crate::{
    db::DbPool,
    error::AppError,
    extract::AppJson,
    middleware::auth::AuthContext,
    models::dashboard_user::{DashboardUser, DashboardUserResponse, UpdateProfileRequest},
};

/// `GET /api/v1/users/me`
pub async fn me(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<DashboardUserResponse>, AppError> {
    let user = sqlx::query_as::<_, DashboardUser>("SELECT * FROM dashboard_users WHERE id = $1")
        .bind(auth.user_id)
        .fetch_optional(&pool)
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;

    Ok(Json(user.into()))
}

/// Update email and/or full name.
///
/// # Endpoint
///
/// `PATCH /api/v1/users/me`
///
/// # Request Body
///
/// ```json
/// { "email": "alice@example.com", "full_name": "Alice Doe" }
/// ```
///
/// Both fields are optional; an empty email clears it. Returns the updated
/// profile, or 400 when the email belongs to another account.
pub async fn update_me(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    AppJson(request): AppJson<UpdateProfileRequest>,
) -> Result<Json<DashboardUserResponse>, AppError> {
    let email = request.normalized_email();
    let full_name = request.full_name.as_deref().map(str::trim);

    let user = sqlx::query_as::<_, DashboardUser>(
        r#"
        UPDATE dashboard_users
        SET email = CASE WHEN $2 THEN $3 ELSE email END,
            full_name = COALESCE($4, full_name)
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(auth.user_id)
    .bind(email.is_some())
    .bind(email.flatten())
    .bind(full_name)
    .fetch_optional(&pool)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(ref db) if db.is_unique_violation() => {
            AppError::InvalidRequest("A user with that email already exists".to_string())
        }
        other => AppError::Database(other),
    })?
    .ok_or_else(|| AppError::not_found("User"))?;

    tracing::info!(user_id = user.id, "profile updated");
    Ok(Json(user.into()))
}
