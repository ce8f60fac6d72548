//! Seller assignment logic.
//!
//! # Claim limits
//!
//! At most `MAX_SELLERS_PER_WALLET` sellers may hold the same target user.
//! The count check and the insert run in one transaction that first locks
//! the target user row with `FOR UPDATE`, so two sellers claiming the same
//! user at once are serialized and the limit cannot be overshot.

use std::collections::BTreeMap;

use crate::{
    db::DbPool,
    error::AppError,
    models::seller_assignment::{
        MAX_SELLERS_PER_WALLET, SellerAssignment, SellerInfo, preferred_wallet,
    },
    platform::Platform,
};

const ASSIGNMENT_SELECT: &str = r#"
    SELECT
        a.id, a.seller_id,
        CASE WHEN TRIM(s.full_name) = '' THEN s.username ELSE s.full_name END AS seller_name,
        s.username AS seller_username,
        a.platform, a.target_user_id, a.wallet_address, a.notes, a.created_at
    FROM seller_assignments a
    JOIN dashboard_users s ON s.id = a.seller_id
"#;

const SELLER_INFO_SELECT: &str = r#"
    SELECT
        a.id, a.seller_id,
        CASE WHEN TRIM(s.full_name) = '' THEN s.username ELSE s.full_name END AS seller_name,
        s.username AS seller_username,
        a.created_at, a.target_user_id
    FROM seller_assignments a
    JOIN dashboard_users s ON s.id = a.seller_id
"#;

/// Wallet columns of the target user, in preference order.
#[derive(Debug, sqlx::FromRow)]
struct TargetWallets {
    wallet: Option<String>,
    evm_address: Option<String>,
    tron_address: Option<String>,
}

fn target_query(platform: Platform) -> String {
    let extra = match platform {
        Platform::Limitless => "NULL::TEXT AS evm_address, NULL::TEXT AS tron_address",
        Platform::Boostyfi => "evm_address, tron_address",
    };
    format!(
        "SELECT wallet, {extra} FROM {} WHERE id = $1 FOR UPDATE",
        platform.users_table()
    )
}

/// Claim `target_user_id` on `platform` for `seller_id`.
///
/// # Errors
///
/// - `InvalidRequest`: target user missing, wallet already at the seller
///   limit, or already claimed by this seller
/// - `Database`: database error occurred
pub async fn claim(
    pool: &DbPool,
    seller_id: i64,
    platform: Platform,
    target_user_id: i64,
    notes: &str,
) -> Result<SellerAssignment, AppError> {
    let mut tx = pool.begin().await?;

    // Locks the target row until commit.
    let target = sqlx::query_as::<_, TargetWallets>(&target_query(platform))
        .bind(target_user_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| {
            AppError::InvalidRequest(format!(
                "Target user not found in {}",
                platform.display_name()
            ))
        })?;

    let existing: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM seller_assignments WHERE platform = $1 AND target_user_id = $2",
    )
    .bind(platform.as_str())
    .bind(target_user_id)
    .fetch_one(&mut *tx)
    .await?;

    if existing >= MAX_SELLERS_PER_WALLET {
        return Err(AppError::InvalidRequest(format!(
            "This wallet already has {existing} sellers assigned. \
             Maximum is {MAX_SELLERS_PER_WALLET}."
        )));
    }

    let wallet_address = preferred_wallet([
        target.wallet.as_deref(),
        target.evm_address.as_deref(),
        target.tron_address.as_deref(),
    ]);

    let inserted: Option<i64> = sqlx::query_scalar(
        r#"
        INSERT INTO seller_assignments (seller_id, platform, target_user_id, wallet_address, notes)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (seller_id, platform, target_user_id) DO NOTHING
        RETURNING id
        "#,
    )
    .bind(seller_id)
    .bind(platform.as_str())
    .bind(target_user_id)
    .bind(&wallet_address)
    .bind(notes.trim())
    .fetch_optional(&mut *tx)
    .await?;

    let Some(id) = inserted else {
        return Err(AppError::InvalidRequest(
            "You have already claimed this wallet".to_string(),
        ));
    };

    let assignment = sqlx::query_as::<_, SellerAssignment>(&format!("{ASSIGNMENT_SELECT} WHERE a.id = $1"))
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::info!(
        seller_id,
        platform = %platform,
        target_user_id,
        wallet = %wallet_address,
        "wallet claimed"
    );
    Ok(assignment)
}

/// Remove the caller's claim. 404 when there is nothing to remove.
pub async fn unclaim(
    pool: &DbPool,
    seller_id: i64,
    platform: Platform,
    target_user_id: i64,
) -> Result<(), AppError> {
    let deleted = sqlx::query(
        "DELETE FROM seller_assignments WHERE seller_id = $1 AND platform = $2 AND target_user_id = $3",
    )
    .bind(seller_id)
    .bind(platform.as_str())
    .bind(target_user_id)
    .execute(pool)
    .await?
    .rows_affected();

    if deleted == 0 {
        return Err(AppError::not_found("Assignment"));
    }

    tracing::info!(seller_id, platform = %platform, target_user_id, "wallet unclaimed");
    Ok(())
}

/// The caller's assignments, newest first.
pub async fn my_assignments(
    pool: &DbPool,
    seller_id: i64,
    platform: Option<Platform>,
) -> Result<Vec<SellerAssignment>, AppError> {
    let assignments = sqlx::query_as::<_, SellerAssignment>(&format!(
        "{ASSIGNMENT_SELECT} WHERE a.seller_id = $1 AND ($2::TEXT IS NULL OR a.platform = $2) \
         ORDER BY a.created_at DESC, a.id DESC"
    ))
    .bind(seller_id)
    .bind(platform.map(Platform::as_str))
    .fetch_all(pool)
    .await?;
    Ok(assignments)
}

/// Sellers holding one target user, oldest claim first.
pub async fn sellers_for_user(
    pool: &DbPool,
    platform: Platform,
    target_user_id: i64,
) -> Result<Vec<SellerInfo>, AppError> {
    let sellers = sqlx::query_as::<_, SellerInfo>(&format!(
        "{SELLER_INFO_SELECT} WHERE a.platform = $1 AND a.target_user_id = $2 \
         ORDER BY a.created_at, a.id"
    ))
    .bind(platform.as_str())
    .bind(target_user_id)
    .fetch_all(pool)
    .await?;
    Ok(sellers)
}

/// Sellers for many target users, keyed by target id.
///
/// Only ids with at least one seller appear in the map.
pub async fn sellers_for_users(
    pool: &DbPool,
    platform: Platform,
    target_user_ids: &[i64],
) -> Result<BTreeMap<i64, Vec<SellerInfo>>, AppError> {
    if target_user_ids.is_empty() {
        return Ok(BTreeMap::new());
    }

    let rows = sqlx::query_as::<_, SellerInfo>(&format!(
        "{SELLER_INFO_SELECT} WHERE a.platform = $1 AND a.target_user_id = ANY($2) \
         ORDER BY a.target_user_id, a.created_at, a.id"
    ))
    .bind(platform.as_str())
    .bind(target_user_ids)
    .fetch_all(pool)
    .await?;

    Ok(group_by_target(rows))
}

pub fn group_by_target(rows: Vec<SellerInfo>) -> BTreeMap<i64, Vec<SellerInfo>> {
    let mut grouped: BTreeMap<i64, Vec<SellerInfo>> = BTreeMap::new();
    for row in rows {
        grouped.entry(row.target_user_id).or_default().push(row);
    }
    grouped
}
