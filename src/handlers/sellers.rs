//! Seller assignment endpoints under `/api/v1/core/seller-assignments`.
//!
//! - POST claim - Claim a hierarchy user (seller only)
//! - POST unclaim - Release a claim (seller only)
//! - GET my_assignments - The caller's claims (seller only)
//! - GET for_user - Sellers holding one user (public)
//! - GET bulk_for_users - Sellers for up to 200 users (public)

use std::collections::BTreeMap;

use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
};
use serde::Serialize;
use serde_json::{Value, json};

use crate::{
    db::DbPool,
    error::AppError,
    extract::{AppJson, AppQuery},
    middleware::auth::AuthContext,
    models::seller_assignment::{
        BulkForUsersQuery, ClaimRequest, ForUserQuery, MyAssignmentsQuery, SellerAssignment,
        SellerInfo, UnclaimRequest, parse_user_ids,
    },
    platform::Platform,
    services::seller_service,
};

#[derive(Debug, Serialize)]
pub struct SellersResponse {
    pub sellers: Vec<SellerInfo>,
}

#[derive(Debug, Serialize)]
pub struct BulkSellersResponse {
    pub assignments: BTreeMap<i64, Vec<SellerInfo>>,
}

fn required<'a>(value: &'a Option<String>) -> Option<&'a str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_platform(raw: &str) -> Result<Platform, AppError> {
    raw.parse().map_err(AppError::InvalidRequest)
}

/// Claim a user's wallet.
///
/// # Endpoint
///
/// `POST /api/v1/core/seller-assignments/claim`
///
/// # Request Body
///
/// ```json
/// { "platform": "limitless", "target_user_id": 42, "notes": "optional" }
/// ```
///
/// # Response
///
/// - **Success (201 Created)**: the new assignment
/// - **Error (400)**: target missing, five sellers already assigned, or
///   already claimed by the caller
/// - **Error (403)**: caller is not a seller
pub async fn claim(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    AppJson(request): AppJson<ClaimRequest>,
) -> Result<(StatusCode, Json<SellerAssignment>), AppError> {
    auth.require_seller()?;

    let assignment = seller_service::claim(
        &pool,
        auth.user_id,
        request.platform,
        request.target_user_id,
        &request.notes,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(assignment)))
}

/// `POST /api/v1/core/seller-assignments/unclaim`
///
/// Returns `{"status": "unclaimed"}`, or 404 when the caller holds no such claim.
pub async fn unclaim(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    AppJson(request): AppJson<UnclaimRequest>,
) -> Result<Json<Value>, AppError> {
    auth.require_seller()?;

    seller_service::unclaim(&pool, auth.user_id, request.platform, request.target_user_id).await?;
    Ok(Json(json!({ "status": "unclaimed" })))
}

/// `GET /api/v1/core/seller-assignments/my_assignments?platform=boostyfi`
pub async fn my_assignments(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    AppQuery(query): AppQuery<MyAssignmentsQuery>,
) -> Result<Json<Vec<SellerAssignment>>, AppError> {
    auth.require_seller()?;

    let assignments = seller_service::my_assignments(&pool, auth.user_id, query.platform).await?;
    Ok(Json(assignments))
}

/// Sellers holding one user.
///
/// # Endpoint
///
/// `GET /api/v1/core/seller-assignments/for_user?platform=limitless&target_user_id=42`
///
/// # Response (200 OK)
///
/// ```json
/// { "sellers": [ { "id": 3, "seller_id": 7, "seller_name": "Ann Lee",
///                  "seller_username": "ann", "created_at": "..." } ] }
/// ```
pub async fn for_user(
    State(pool): State<DbPool>,
    AppQuery(query): AppQuery<ForUserQuery>,
) -> Result<Json<SellersResponse>, AppError> {
    let (Some(platform), Some(target_user_id)) =
        (required(&query.platform), required(&query.target_user_id))
    else {
        return Err(AppError::InvalidRequest(
            "platform and target_user_id are required".to_string(),
        ));
    };

    let target_user_id: i64 = target_user_id.parse().map_err(|_| {
        AppError::InvalidRequest("target_user_id must be an integer".to_string())
    })?;
    let platform = parse_platform(platform)?;

    let sellers = seller_service::sellers_for_user(&pool, platform, target_user_id).await?;
    Ok(Json(SellersResponse { sellers }))
}

/// Sellers for many users at once.
///
/// # Endpoint
///
/// `GET /api/v1/core/seller-assignments/bulk_for_users?platform=boostyfi&user_ids=1,2,3`
///
/// # Response (200 OK)
///
/// ```json
/// { "assignments": { "1": [ { "id": 3, "seller_id": 7, ... } ] } }
/// ```
///
/// Users without sellers are absent from the map. Only the first 200 ids
/// are looked up.
pub async fn bulk_for_users(
    State(pool): State<DbPool>,
    AppQuery(query): AppQuery<BulkForUsersQuery>,
) -> Result<Json<BulkSellersResponse>, AppError> {
    let Some(platform) = required(&query.platform) else {
        return Err(AppError::InvalidRequest("platform is required".to_string()));
    };

    let ids = parse_user_ids(query.user_ids.as_deref().unwrap_or("")).map_err(|_| {
        AppError::InvalidRequest("user_ids must be comma-separated integers".to_string())
    })?;

    if ids.is_empty() {
        return Ok(Json(BulkSellersResponse {
            assignments: BTreeMap::new(),
        }));
    }

    let platform = parse_platform(platform)?;
    let assignments = seller_service::sellers_for_users(&pool, platform, &ids).await?;
    Ok(Json(BulkSellersResponse { assignments }))
}
