//! Import of the per-platform exports: users, purchases and referral
//! earnings.
//!
//! # Process (per platform, one transaction)
//!
//! 1. Optionally clear earnings, purchases and users
//! 2. Upsert users by `original_id`, remembering each parent's original id
//! 3. Link `parent_id` from `parent_original_id` in one statement
//! 4. Rebuild the nested set
//! 5. Upsert purchases, then earnings, and resolve their foreign keys by
//!    original id
//! 6. Copy `created_at` from the export where it has one
//!
//! A missing export file is logged and treated as empty.

use std::path::Path;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use sqlx::{PgConnection, Postgres, QueryBuilder};

use super::{
    ImportError,
    parse::{
        non_blank, parse_bool, parse_datetime, parse_decimal, parse_i32, parse_int, parse_json,
    },
    keep_last, read_rows,
};
use crate::{
    db::DbPool,
    platform::Platform,
    services::nested_set::{RebuildReport, rebuild_tree_in},
};

/// Rows per multi-row `INSERT`; keeps bind parameters under the protocol limit.
const INSERT_BATCH: usize = 1_000;

/// Counts of what one platform import wrote.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub users: usize,
    pub purchases: usize,
    pub earnings: usize,
    pub tree: RebuildReport,
}

/// One row of `<app>_users.csv`. BoostyFi-only columns stay blank for
/// Limitless.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct UserCsvRow {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub referral_code: String,
    pub referral_code_confirmed: String,
    pub wallet: String,
    pub parent_id: String,
    pub is_superuser: String,
    pub is_staff: String,
    pub is_active: String,
    pub is_deleted: String,
    pub is_blocked: String,
    pub date_joined: String,
    pub parent_changed_at: String,
    pub lft: String,
    pub rght: String,
    pub tree_id: String,
    pub level: String,
    pub referral_type: String,
    pub evm_address: String,
    pub tron_address: String,
    pub locked_atla_balance: String,
    pub unlocked_atla_balance: String,
}

/// A user row after value parsing.
#[derive(Debug, Clone, PartialEq)]
pub struct UserRecord {
    pub original_id: i64,
    pub parent_original_id: Option<i64>,
    pub username: String,
    pub email: Option<String>,
    pub password_hash: String,
    pub referral_code: String,
    pub referral_code_confirmed: bool,
    pub wallet: String,
    pub is_superuser: bool,
    pub is_staff: bool,
    pub is_active: bool,
    pub is_deleted: bool,
    pub is_blocked: bool,
    pub date_joined: Option<DateTime<Utc>>,
    pub parent_changed_at: Option<DateTime<Utc>>,
    pub original_lft: Option<i32>,
    pub original_rght: Option<i32>,
    pub original_tree_id: Option<i32>,
    pub original_level: Option<i32>,
    pub referral_type: String,
    pub evm_address: String,
    pub tron_address: String,
    pub locked_atla_balance: Decimal,
    pub unlocked_atla_balance: Decimal,
}

/// Original ids of zero are treated as absent, as in the export.
fn export_id(value: &str) -> Option<i64> {
    parse_int(value).filter(|id| *id != 0)
}

impl UserCsvRow {
    /// `None` when the row has no usable id.
    pub fn into_record(self) -> Option<UserRecord> {
        Some(UserRecord {
            original_id: export_id(&self.id)?,
            parent_original_id: export_id(&self.parent_id),
            username: self.username.trim().to_string(),
            email: non_blank(&self.email),
            password_hash: self.password.trim().to_string(),
            referral_code: self.referral_code.trim().to_string(),
            referral_code_confirmed: parse_bool(&self.referral_code_confirmed),
            wallet: self.wallet.trim().to_string(),
            is_superuser: parse_bool(&self.is_superuser),
            is_staff: parse_bool(&self.is_staff),
            is_active: parse_bool(&self.is_active),
            is_deleted: parse_bool(&self.is_deleted),
            is_blocked: parse_bool(&self.is_blocked),
            date_joined: parse_datetime(&self.date_joined),
            parent_changed_at: parse_datetime(&self.parent_changed_at),
            original_lft: parse_i32(&self.lft),
            original_rght: parse_i32(&self.rght),
            original_tree_id: parse_i32(&self.tree_id),
            original_level: parse_i32(&self.level),
            referral_type: self.referral_type.trim().to_string(),
            evm_address: self.evm_address.trim().to_string(),
            tron_address: self.tron_address.trim().to_string(),
            locked_atla_balance: parse_decimal(&self.locked_atla_balance),
            unlocked_atla_balance: parse_decimal(&self.unlocked_atla_balance),
        })
    }
}

/// One row of `limitless_purchases.csv`.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct LimitlessPurchaseCsvRow {
    pub id: String,
    pub buyer_id: String,
    pub amount_usdt: String,
    pub tx_hash: String,
    pub block_number: String,
    pub contract_address: String,
    pub metadata: String,
    pub payment_status: String,
    pub referral_system_status: String,
    pub pack_id: String,
    pub created_at: String,
}

/// One row of `boostyfi_purchases.csv`.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct BoostyfiPurchaseCsvRow {
    pub id: String,
    pub buyer_id: String,
    pub amount: String,
    pub full_amount: String,
    pub discount_rate: String,
    pub tx_hash: String,
    pub block_number: String,
    pub contract_address: String,
    pub metadata: String,
    pub payment_status: String,
    pub payment_type: String,
    pub referral_system_status: String,
    pub jggl_pack_id: String,
    pub atla_pack_id: String,
    pub paylink_invoice_id: String,
    pub paylink_reference_id: String,
    pub created_at: String,
}

/// One row of `limitless_referral_earnings.csv`.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct LimitlessEarningCsvRow {
    pub id: String,
    pub recipient_id: String,
    pub buyer_id: String,
    pub purchase_id: String,
    pub earning_type: String,
    pub level: String,
    pub percentage: String,
    pub amount_usdt: String,
    pub status: String,
    pub is_grace_period: String,
    pub recipient_was_active: String,
    pub compression_applied: String,
    pub original_level: String,
    pub shares_count: String,
    pub distribution_id: String,
    pub created_at: String,
}

/// One row of `boostyfi_referral_earnings.csv`.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct BoostyfiEarningCsvRow {
    pub id: String,
    pub user_id: String,
    pub buyer_id: String,
    pub purchase_id: String,
    pub earning_type: String,
    pub generation_level: String,
    pub percentage: String,
    pub amount: String,
    pub referral_pool: String,
    pub referral_system_type: String,
    pub status: String,
    pub ppv: String,
    pub tv: String,
    pub tier: String,
    pub qualification_reason: String,
    pub tx_amount: String,
    pub rpr: String,
    pub calculated_at: String,
    pub is_sponsor_earning: String,
    pub sponsor_withhold_amount: String,
    pub created_at: String,
}

/// Trimmed text, or `default` when blank.
fn text_or(value: &str, default: &str) -> String {
    non_blank(value).unwrap_or_else(|| default.to_string())
}

fn metadata(value: &str) -> Value {
    parse_json(value)
}

/// Paths of the three export files of `platform` under `sheets_dir`.
pub fn export_paths(sheets_dir: &Path, platform: Platform) -> [std::path::PathBuf; 3] {
    let dir = sheets_dir.join(platform.as_str());
    let app = platform.as_str();
    [
        dir.join(format!("{app}_users.csv")),
        dir.join(format!("{app}_purchases.csv")),
        dir.join(format!("{app}_referral_earnings.csv")),
    ]
}

/// Read an export, treating a missing file as empty.
async fn read_optional<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>, ImportError> {
    if !tokio::fs::try_exists(path).await.unwrap_or(false) {
        tracing::warn!(path = %path.display(), "export file not found, skipping");
        return Ok(Vec::new());
    }
    let rows = read_rows(path).await?;
    tracing::info!(path = %path.display(), rows = rows.len(), "read export");
    Ok(rows)
}

/// Import one platform's exports from `sheets_dir/<platform>/`.
pub async fn import_platform(
    pool: &DbPool,
    platform: Platform,
    sheets_dir: &Path,
    clear: bool,
) -> Result<ImportSummary, ImportError> {
    let [users_path, purchases_path, earnings_path] = export_paths(sheets_dir, platform);
    tracing::info!(%platform, dir = %sheets_dir.display(), "importing platform");

    let users: Vec<UserRecord> = read_optional::<UserCsvRow>(&users_path)
        .await?
        .into_iter()
        .filter_map(UserCsvRow::into_record)
        .collect();
    let users = keep_last(users, |u| u.original_id);

    let mut tx = pool.begin().await?;

    if clear {
        tracing::info!(%platform, "clearing existing data");
        for table in [
            platform.earnings_table(),
            platform.purchases_table(),
            platform.users_table(),
        ] {
            sqlx::query(&format!("DELETE FROM {table}"))
                .execute(&mut *tx)
                .await?;
        }
    }

    upsert_users(&mut *tx, platform, &users).await?;
    let relinked = link_parents(&mut *tx, platform).await?;
    tracing::info!(%platform, users = users.len(), relinked, "users upserted and linked");

    let tree = rebuild_tree_in(&mut *tx, platform).await?;

    let (purchases, earnings) = match platform {
        Platform::Limitless => {
            let purchases: Vec<LimitlessPurchaseCsvRow> = read_optional(&purchases_path).await?;
            upsert_limitless_purchases(&mut *tx, &purchases).await?;
            let earnings: Vec<LimitlessEarningCsvRow> = read_optional(&earnings_path).await?;
            upsert_limitless_earnings(&mut *tx, &earnings).await?;
            (purchases.len(), earnings.len())
        }
        Platform::Boostyfi => {
            let purchases: Vec<BoostyfiPurchaseCsvRow> = read_optional(&purchases_path).await?;
            upsert_boostyfi_purchases(&mut *tx, &purchases).await?;
            let earnings: Vec<BoostyfiEarningCsvRow> = read_optional(&earnings_path).await?;
            upsert_boostyfi_earnings(&mut *tx, &earnings).await?;
            (purchases.len(), earnings.len())
        }
    };
    resolve_record_links(&mut *tx, platform).await?;

    tx.commit().await?;

    let summary = ImportSummary {
        users: users.len(),
        purchases,
        earnings,
        tree,
    };
    tracing::info!(
        %platform,
        users = summary.users,
        purchases = summary.purchases,
        earnings = summary.earnings,
        trees = summary.tree.trees,
        "import completed"
    );
    Ok(summary)
}

async fn upsert_users(
    conn: &mut PgConnection,
    platform: Platform,
    users: &[UserRecord],
) -> Result<(), sqlx::Error> {
    let boostyfi = platform == Platform::Boostyfi;
    let mut columns = vec![
        "original_id",
        "parent_original_id",
        "username",
        "email",
        "password_hash",
        "referral_code",
        "referral_code_confirmed",
        "wallet",
        "is_superuser",
        "is_staff",
        "is_active",
        "is_deleted",
        "is_blocked",
        "date_joined",
        "parent_changed_at",
        "original_lft",
        "original_rght",
        "original_tree_id",
        "original_level",
    ];
    if boostyfi {
        columns.extend([
            "referral_type",
            "evm_address",
            "tron_address",
            "locked_atla_balance",
            "unlocked_atla_balance",
        ]);
    }
    let updates = columns[1..]
        .iter()
        .map(|c| format!("{c} = EXCLUDED.{c}"))
        .collect::<Vec<_>>()
        .join(", ");

    for chunk in users.chunks(INSERT_BATCH) {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "INSERT INTO {} ({}) ",
            platform.users_table(),
            columns.join(", ")
        ));
        qb.push_values(chunk, |mut b, u| {
            b.push_bind(u.original_id)
                .push_bind(u.parent_original_id)
                .push_bind(u.username.clone())
                .push_bind(u.email.clone())
                .push_bind(u.password_hash.clone())
                .push_bind(u.referral_code.clone())
                .push_bind(u.referral_code_confirmed)
                .push_bind(u.wallet.clone())
                .push_bind(u.is_superuser)
                .push_bind(u.is_staff)
                .push_bind(u.is_active)
                .push_bind(u.is_deleted)
                .push_bind(u.is_blocked)
                .push_bind(u.date_joined)
                .push_bind(u.parent_changed_at)
                .push_bind(u.original_lft)
                .push_bind(u.original_rght)
                .push_bind(u.original_tree_id)
                .push_bind(u.original_level);
            if boostyfi {
                b.push_bind(u.referral_type.clone())
                    .push_bind(u.evm_address.clone())
                    .push_bind(u.tron_address.clone())
                    .push_bind(u.locked_atla_balance)
                    .push_bind(u.unlocked_atla_balance);
            }
        });
        qb.push(format!(
            " ON CONFLICT (original_id) DO UPDATE SET {updates}, updated_at = NOW()"
        ));
        qb.build().execute(&mut *conn).await?;
    }
    Ok(())
}

/// Point every user's `parent_id` at the row holding `parent_original_id`.
/// Users whose parent is not in the table become roots.
async fn link_parents(conn: &mut PgConnection, platform: Platform) -> Result<u64, sqlx::Error> {
    let users = platform.users_table();
    let result = sqlx::query(&format!(
        r#"
        UPDATE {users} AS c
        SET parent_id = p.id
        FROM {users} AS c2
        LEFT JOIN {users} AS p ON p.original_id = c2.parent_original_id
        WHERE c2.id = c.id AND c.parent_id IS DISTINCT FROM p.id
        "#
    ))
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected())
}

async fn upsert_limitless_purchases(
    conn: &mut PgConnection,
    rows: &[LimitlessPurchaseCsvRow],
) -> Result<(), sqlx::Error> {
    let rows: Vec<&LimitlessPurchaseCsvRow> = keep_last(
        rows.iter().filter(|r| export_id(&r.id).is_some()).collect(),
        |r| export_id(&r.id),
    );

    for chunk in rows.chunks(INSERT_BATCH) {
        let mut qb = QueryBuilder::<Postgres>::new(
            "INSERT INTO limitless_purchases (original_id, buyer_original_id, amount_usdt, \
             tx_hash, block_number, contract_address, metadata, payment_status, \
             referral_system_status, pack_id) ",
        );
        qb.push_values(chunk, |mut b, r| {
            b.push_bind(export_id(&r.id))
                .push_bind(export_id(&r.buyer_id))
                .push_bind(parse_decimal(&r.amount_usdt))
                .push_bind(r.tx_hash.trim().to_string())
                .push_bind(parse_int(&r.block_number))
                .push_bind(r.contract_address.trim().to_string())
                .push_bind(metadata(&r.metadata))
                .push_bind(text_or(&r.payment_status, "PENDING"))
                .push_bind(parse_i32(&r.referral_system_status))
                .push_bind(parse_i32(&r.pack_id));
        });
        qb.push(
            " ON CONFLICT (original_id) DO UPDATE SET \
             buyer_original_id = EXCLUDED.buyer_original_id, \
             amount_usdt = EXCLUDED.amount_usdt, tx_hash = EXCLUDED.tx_hash, \
             block_number = EXCLUDED.block_number, \
             contract_address = EXCLUDED.contract_address, metadata = EXCLUDED.metadata, \
             payment_status = EXCLUDED.payment_status, \
             referral_system_status = EXCLUDED.referral_system_status, \
             pack_id = EXCLUDED.pack_id, updated_at = NOW()",
        );
        qb.build().execute(&mut *conn).await?;
    }

    let stamps = rows.iter().map(|r| (export_id(&r.id), &r.created_at));
    copy_created_at(conn, "limitless_purchases", stamps).await
}

async fn upsert_boostyfi_purchases(
    conn: &mut PgConnection,
    rows: &[BoostyfiPurchaseCsvRow],
) -> Result<(), sqlx::Error> {
    let rows: Vec<&BoostyfiPurchaseCsvRow> = keep_last(
        rows.iter().filter(|r| export_id(&r.id).is_some()).collect(),
        |r| export_id(&r.id),
    );

    for chunk in rows.chunks(INSERT_BATCH) {
        let mut qb = QueryBuilder::<Postgres>::new(
            "INSERT INTO boostyfi_purchases (original_id, buyer_original_id, amount, \
             full_amount, discount_rate, tx_hash, block_number, contract_address, metadata, \
             payment_status, payment_type, referral_system_status, jggl_pack_id, atla_pack_id, \
             paylink_invoice_id, paylink_reference_id) ",
        );
        qb.push_values(chunk, |mut b, r| {
            b.push_bind(export_id(&r.id))
                .push_bind(export_id(&r.buyer_id))
                .push_bind(parse_decimal(&r.amount))
                .push_bind(parse_decimal(&r.full_amount))
                .push_bind(parse_decimal(&r.discount_rate))
                .push_bind(r.tx_hash.trim().to_string())
                .push_bind(parse_int(&r.block_number))
                .push_bind(r.contract_address.trim().to_string())
                .push_bind(metadata(&r.metadata))
                .push_bind(text_or(&r.payment_status, "PENDING"))
                .push_bind(text_or(&r.payment_type, "CRYPTO"))
                .push_bind(parse_i32(&r.referral_system_status))
                .push_bind(parse_i32(&r.jggl_pack_id))
                .push_bind(parse_i32(&r.atla_pack_id))
                .push_bind(r.paylink_invoice_id.trim().to_string())
                .push_bind(r.paylink_reference_id.trim().to_string());
        });
        qb.push(
            " ON CONFLICT (original_id) DO UPDATE SET \
             buyer_original_id = EXCLUDED.buyer_original_id, amount = EXCLUDED.amount, \
             full_amount = EXCLUDED.full_amount, discount_rate = EXCLUDED.discount_rate, \
             tx_hash = EXCLUDED.tx_hash, block_number = EXCLUDED.block_number, \
             contract_address = EXCLUDED.contract_address, metadata = EXCLUDED.metadata, \
             payment_status = EXCLUDED.payment_status, payment_type = EXCLUDED.payment_type, \
             referral_system_status = EXCLUDED.referral_system_status, \
             jggl_pack_id = EXCLUDED.jggl_pack_id, atla_pack_id = EXCLUDED.atla_pack_id, \
             paylink_invoice_id = EXCLUDED.paylink_invoice_id, \
             paylink_reference_id = EXCLUDED.paylink_reference_id, updated_at = NOW()",
        );
        qb.build().execute(&mut *conn).await?;
    }

    let stamps = rows.iter().map(|r| (export_id(&r.id), &r.created_at));
    copy_created_at(conn, "boostyfi_purchases", stamps).await
}

async fn upsert_limitless_earnings(
    conn: &mut PgConnection,
    rows: &[LimitlessEarningCsvRow],
) -> Result<(), sqlx::Error> {
    let rows: Vec<&LimitlessEarningCsvRow> = keep_last(
        rows.iter().filter(|r| export_id(&r.id).is_some()).collect(),
        |r| export_id(&r.id),
    );

    for chunk in rows.chunks(INSERT_BATCH) {
        let mut qb = QueryBuilder::<Postgres>::new(
            "INSERT INTO limitless_earnings (original_id, recipient_original_id, \
             buyer_original_id, purchase_original_id, earning_type, level, percentage, \
             amount_usdt, status, is_grace_period, recipient_was_active, compression_applied, \
             original_level, shares_count, distribution_id) ",
        );
        qb.push_values(chunk, |mut b, r| {
            b.push_bind(export_id(&r.id))
                .push_bind(export_id(&r.recipient_id))
                .push_bind(export_id(&r.buyer_id))
                .push_bind(export_id(&r.purchase_id))
                .push_bind(text_or(&r.earning_type, "NETWORK"))
                .push_bind(parse_i32(&r.level))
                .push_bind(parse_decimal(&r.percentage))
                .push_bind(parse_decimal(&r.amount_usdt))
                .push_bind(text_or(&r.status, "PENDING"))
                .push_bind(parse_bool(&r.is_grace_period))
                .push_bind(parse_bool(&r.recipient_was_active))
                .push_bind(parse_bool(&r.compression_applied))
                .push_bind(parse_i32(&r.original_level))
                .push_bind(parse_i32(&r.shares_count))
                .push_bind(parse_int(&r.distribution_id));
        });
        qb.push(
            " ON CONFLICT (original_id) DO UPDATE SET \
             recipient_original_id = EXCLUDED.recipient_original_id, \
             buyer_original_id = EXCLUDED.buyer_original_id, \
             purchase_original_id = EXCLUDED.purchase_original_id, \
             earning_type = EXCLUDED.earning_type, level = EXCLUDED.level, \
             percentage = EXCLUDED.percentage, amount_usdt = EXCLUDED.amount_usdt, \
             status = EXCLUDED.status, is_grace_period = EXCLUDED.is_grace_period, \
             recipient_was_active = EXCLUDED.recipient_was_active, \
             compression_applied = EXCLUDED.compression_applied, \
             original_level = EXCLUDED.original_level, shares_count = EXCLUDED.shares_count, \
             distribution_id = EXCLUDED.distribution_id, updated_at = NOW()",
        );
        qb.build().execute(&mut *conn).await?;
    }

    let stamps = rows.iter().map(|r| (export_id(&r.id), &r.created_at));
    copy_created_at(conn, "limitless_earnings", stamps).await
}

async fn upsert_boostyfi_earnings(
    conn: &mut PgConnection,
    rows: &[BoostyfiEarningCsvRow],
) -> Result<(), sqlx::Error> {
    let rows: Vec<&BoostyfiEarningCsvRow> = keep_last(
        rows.iter().filter(|r| export_id(&r.id).is_some()).collect(),
        |r| export_id(&r.id),
    );

    for chunk in rows.chunks(INSERT_BATCH) {
        let mut qb = QueryBuilder::<Postgres>::new(
            "INSERT INTO boostyfi_earnings (original_id, user_original_id, buyer_original_id, \
             purchase_original_id, earning_type, generation_level, percentage, amount, \
             referral_pool, referral_system_type, status, ppv, tv, tier, qualification_reason, \
             tx_amount, rpr, calculated_at, is_sponsor_earning, sponsor_withhold_amount) ",
        );
        qb.push_values(chunk, |mut b, r| {
            b.push_bind(export_id(&r.id))
                .push_bind(export_id(&r.user_id))
                .push_bind(export_id(&r.buyer_id))
                .push_bind(export_id(&r.purchase_id))
                .push_bind(text_or(&r.earning_type, "NETWORK"))
                .push_bind(parse_i32(&r.generation_level))
                .push_bind(parse_decimal(&r.percentage))
                .push_bind(parse_decimal(&r.amount))
                .push_bind(parse_decimal(&r.referral_pool))
                .push_bind(parse_i32(&r.referral_system_type))
                .push_bind(text_or(&r.status, "PENDING"))
                .push_bind(parse_decimal(&r.ppv))
                .push_bind(parse_decimal(&r.tv))
                .push_bind(parse_i32(&r.tier))
                .push_bind(r.qualification_reason.trim().to_string())
                .push_bind(parse_decimal(&r.tx_amount))
                .push_bind(parse_decimal(&r.rpr))
                .push_bind(parse_datetime(&r.calculated_at))
                .push_bind(parse_bool(&r.is_sponsor_earning))
                .push_bind(parse_decimal(&r.sponsor_withhold_amount));
        });
        qb.push(
            " ON CONFLICT (original_id) DO UPDATE SET \
             user_original_id = EXCLUDED.user_original_id, \
             buyer_original_id = EXCLUDED.buyer_original_id, \
             purchase_original_id = EXCLUDED.purchase_original_id, \
             earning_type = EXCLUDED.earning_type, generation_level = EXCLUDED.generation_level, \
             percentage = EXCLUDED.percentage, amount = EXCLUDED.amount, \
             referral_pool = EXCLUDED.referral_pool, \
             referral_system_type = EXCLUDED.referral_system_type, status = EXCLUDED.status, \
             ppv = EXCLUDED.ppv, tv = EXCLUDED.tv, tier = EXCLUDED.tier, \
             qualification_reason = EXCLUDED.qualification_reason, \
             tx_amount = EXCLUDED.tx_amount, rpr = EXCLUDED.rpr, \
             calculated_at = EXCLUDED.calculated_at, \
             is_sponsor_earning = EXCLUDED.is_sponsor_earning, \
             sponsor_withhold_amount = EXCLUDED.sponsor_withhold_amount, updated_at = NOW()",
        );
        qb.build().execute(&mut *conn).await?;
    }

    let stamps = rows.iter().map(|r| (export_id(&r.id), &r.created_at));
    copy_created_at(conn, "boostyfi_earnings", stamps).await
}

/// Resolve purchase and earning foreign keys from their `*_original_id`
/// columns. Ids that match no row resolve to NULL.
async fn resolve_record_links(conn: &mut PgConnection, platform: Platform) -> Result<(), sqlx::Error> {
    let users = platform.users_table();
    let purchases = platform.purchases_table();
    let earnings = platform.earnings_table();
    let owner = platform.earning_owner_column();
    let owner_original = platform.earning_owner_original_column();

    let statements = [
        format!(
            "UPDATE {purchases} t SET buyer_id = \
             (SELECT u.id FROM {users} u WHERE u.original_id = t.buyer_original_id)"
        ),
        format!(
            "UPDATE {earnings} t SET \
             {owner} = (SELECT u.id FROM {users} u WHERE u.original_id = t.{owner_original}), \
             buyer_id = (SELECT u.id FROM {users} u WHERE u.original_id = t.buyer_original_id), \
             purchase_id = (SELECT p.id FROM {purchases} p \
                 WHERE p.original_id = t.purchase_original_id)"
        ),
    ];
    for sql in statements {
        sqlx::query(&sql).execute(&mut *conn).await?;
    }
    Ok(())
}

/// Overwrite `created_at` with the exported timestamp for rows that have one.
async fn copy_created_at<'a>(
    conn: &mut PgConnection,
    table: &str,
    rows: impl Iterator<Item = (Option<i64>, &'a String)>,
) -> Result<(), sqlx::Error> {
    let (ids, stamps): (Vec<i64>, Vec<DateTime<Utc>>) = rows
        .filter_map(|(id, raw)| Some((id?, parse_datetime(raw)?)))
        .unzip();

    for (ids, stamps) in ids.chunks(10_000).zip(stamps.chunks(10_000)) {
        sqlx::query(&format!(
            r#"
            UPDATE {table} AS t SET created_at = v.created_at
            FROM UNNEST($1::BIGINT[], $2::TIMESTAMPTZ[]) AS v(original_id, created_at)
            WHERE t.original_id = v.original_id
            "#
        ))
        .bind(ids)
        .bind(stamps)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::parse_rows;

    #[test]
    fn user_rows_parse_and_skip_missing_ids() {
        let csv = "id,username,parent_id,is_active,wallet,locked_atla_balance,date_joined\n\
                   10, alice ,,true,0xA,1.5,2024-01-02 03:04:05\n\
                   11,bob,10,0,,,\n\
                   ,ghost,10,1,,,\n\
                   0,zero,,1,,,\n";
        let records: Vec<UserRecord> = parse_rows::<UserCsvRow>(csv)
            .unwrap()
            .into_iter()
            .filter_map(UserCsvRow::into_record)
            .collect();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].original_id, 10);
        assert_eq!(records[0].username, "alice");
        assert_eq!(records[0].parent_original_id, None);
        assert!(records[0].is_active);
        assert_eq!(records[0].locked_atla_balance, Decimal::new(15, 1));
        assert!(records[0].date_joined.is_some());

        assert_eq!(records[1].parent_original_id, Some(10));
        assert!(!records[1].is_active);
        assert_eq!(records[1].email, None);
        assert_eq!(records[1].unlocked_atla_balance, Decimal::ZERO);
    }

    #[test]
    fn earning_rows_tolerate_missing_columns() {
        let csv = "id,user_id,amount,referral_system_type\n5,10,2.50,3\n";
        let rows = parse_rows::<BoostyfiEarningCsvRow>(csv).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(export_id(&rows[0].user_id), Some(10));
        assert_eq!(parse_i32(&rows[0].referral_system_type), Some(3));
        assert_eq!(text_or(&rows[0].status, "PENDING"), "PENDING");
        assert_eq!(rows[0].created_at, "");
    }

    #[test]
    fn export_paths_follow_the_sheets_layout() {
        let [users, purchases, earnings] = export_paths(Path::new("/data"), Platform::Boostyfi);
        assert_eq!(users, Path::new("/data/boostyfi/boostyfi_users.csv"));
        assert_eq!(purchases, Path::new("/data/boostyfi/boostyfi_purchases.csv"));
        assert_eq!(
            earnings,
            Path::new("/data/boostyfi/boostyfi_referral_earnings.csv")
        );
    }
}
