//! Wallet profile lookup by address.

use crate::{
    db::DbPool,
    error::AppError,
    models::{pagination::like_pattern, wallet_profile::WalletProfile},
};

/// Find the profile owning `wallet`.
///
/// A case-insensitive match on the main wallet wins; otherwise the first
/// profile listing the address among its subwallets is returned.
pub async fn lookup(pool: &DbPool, wallet: &str) -> Result<WalletProfile, AppError> {
    let wallet = wallet.trim();
    if wallet.is_empty() {
        return Err(AppError::InvalidRequest(
            "wallet parameter is required".to_string(),
        ));
    }

    if let Some(profile) = sqlx::query_as::<_, WalletProfile>(
        "SELECT w.* FROM wallet_profiles w WHERE LOWER(w.main_wallet) = LOWER($1) LIMIT 1",
    )
    .bind(wallet)
    .fetch_optional(pool)
    .await?
    {
        return Ok(profile);
    }

    sqlx::query_as::<_, WalletProfile>(
        r#"
        SELECT w.* FROM wallet_profiles w
        WHERE w.subwallets ILIKE $1
        ORDER BY w.export_id
        LIMIT 1
        "#,
    )
    .bind(like_pattern(wallet))
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("Wallet profile"))
}
