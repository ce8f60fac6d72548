//! Wallet profile endpoints (Limitless only).
//!
//! - GET /api/v1/limitless/wallet-profiles - Paginated, filtered profiles
//! - GET /api/v1/limitless/wallet-profiles/{id} - One profile
//! - GET /api/v1/limitless/wallet-profiles/lookup?wallet= - Profile owning an address

use axum::{Json, extract::State};

use crate::{
    db::DbPool,
    error::AppError,
    extract::{AppPath, AppQuery},
    models::{
        pagination::{ListParams, Page},
        wallet_profile::{WalletLookupQuery, WalletProfile, WalletProfileFilter},
    },
    services::{listing_service, wallet_profile_service},
};

pub async fn list_wallet_profiles(
    State(pool): State<DbPool>,
    AppQuery(params): AppQuery<ListParams>,
    AppQuery(filter): AppQuery<WalletProfileFilter>,
) -> Result<Json<Page<WalletProfile>>, AppError> {
    let page = listing_service::list::<WalletProfile, _>(&pool, &params, &filter).await?;
    Ok(Json(page))
}

pub async fn get_wallet_profile(
    State(pool): State<DbPool>,
    AppPath(id): AppPath<i64>,
) -> Result<Json<WalletProfile>, AppError> {
    Ok(Json(listing_service::get::<WalletProfile>(&pool, id).await?))
}

/// Find the profile for a wallet address.
///
/// # Endpoint
///
/// `GET /api/v1/limitless/wallet-profiles/lookup?wallet=0xabc...`
///
/// # Response
///
/// - **Success (200 OK)**: the matching profile (main wallet first, then subwallets)
/// - **Error (400)**: `wallet` missing or blank
/// - **Error (404)**: no profile mentions the address
pub async fn lookup_wallet_profile(
    State(pool): State<DbPool>,
    AppQuery(query): AppQuery<WalletLookupQuery>,
) -> Result<Json<WalletProfile>, AppError> {
    let wallet = query.wallet.unwrap_or_default();
    Ok(Json(wallet_profile_service::lookup(&pool, &wallet).await?))
}
