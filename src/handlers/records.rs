//! Purchase and earning endpoints, mounted once per platform.
//!
//! - GET purchases - Paginated, filtered purchases
//! - GET purchases/{id} - One purchase
//! - GET earnings - Paginated, filtered earnings
//! - GET earnings/{id} - One earning
//!
//! Filters are platform specific; see `H::PurchaseFilter` and
//! `H::EarningFilter`.

use axum::{Json, extract::State};

use crate::{
    db::DbPool,
    error::AppError,
    extract::{AppPath, AppQuery},
    models::pagination::{ListParams, Page},
    platform::Hierarchy,
    services::listing_service,
};

/// `GET purchases?payment_status=COMPLETED&ordering=-amount_usdt&page=1`
pub async fn list_purchases<H: Hierarchy>(
    State(pool): State<DbPool>,
    AppQuery(params): AppQuery<ListParams>,
    AppQuery(filter): AppQuery<H::PurchaseFilter>,
) -> Result<Json<Page<H::Purchase>>, AppError> {
    let page = listing_service::list::<H::Purchase, _>(&pool, &params, &filter).await?;
    Ok(Json(page))
}

pub async fn get_purchase<H: Hierarchy>(
    State(pool): State<DbPool>,
    AppPath(id): AppPath<i64>,
) -> Result<Json<H::Purchase>, AppError> {
    Ok(Json(listing_service::get::<H::Purchase>(&pool, id).await?))
}

/// `GET earnings?status=WITHDRAWN&earning_type=NETWORK&page=1`
pub async fn list_earnings<H: Hierarchy>(
    State(pool): State<DbPool>,
    AppQuery(params): AppQuery<ListParams>,
    AppQuery(filter): AppQuery<H::EarningFilter>,
) -> Result<Json<Page<H::Earning>>, AppError> {
    let page = listing_service::list::<H::Earning, _>(&pool, &params, &filter).await?;
    Ok(Json(page))
}

pub async fn get_earning<H: Hierarchy>(
    State(pool): State<DbPool>,
    AppPath(id): AppPath<i64>,
) -> Result<Json<H::Earning>, AppError> {
    Ok(Json(listing_service::get::<H::Earning>(&pool, id).await?))
}
