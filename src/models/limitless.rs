//! Limitless purchase and earning rows.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{Postgres, QueryBuilder};

use super::listing::{ListFilter, Listed, push_eq};

/// A pack purchase.
///
/// Only `COMPLETED` purchases count towards volume rollups.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct LimitlessPurchase {
    pub id: i64,
    pub original_id: i64,
    pub buyer_id: Option<i64>,
    pub buyer_original_id: Option<i64>,
    pub buyer_username: Option<String>,
    pub amount_usdt: Decimal,
    pub tx_hash: String,
    pub block_number: Option<i64>,
    pub payment_status: String,
    pub pack_id: Option<i32>,
    pub created_at: DateTime<Utc>,
}

impl Listed for LimitlessPurchase {
    const SELECT: &'static str = "p.id, p.original_id, p.buyer_id, p.buyer_original_id, \
         b.username AS buyer_username, p.amount_usdt, p.tx_hash, p.block_number, \
         p.payment_status, p.pack_id, p.created_at";
    const FROM: &'static str =
        "limitless_purchases p LEFT JOIN limitless_users b ON b.id = p.buyer_id";
    const ID: &'static str = "p.id";
    const ORDERING: &'static [(&'static str, &'static str)] = &[
        ("created_at", "p.created_at"),
        ("amount_usdt", "p.amount_usdt"),
    ];
    const DEFAULT_ORDERING: &'static str = "-created_at";
    const SEARCH_COLUMNS: &'static [&'static str] = &["p.tx_hash"];
    const NAME: &'static str = "Purchase";
}

/// A referral earning paid (or owed) to `recipient` because `buyer` purchased.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct LimitlessEarning {
    pub id: i64,
    pub original_id: i64,
    pub recipient_id: Option<i64>,
    pub recipient_original_id: Option<i64>,
    pub earning_type: String,
    pub level: Option<i32>,
    pub percentage: Option<Decimal>,
    pub amount_usdt: Decimal,
    pub status: String,
    pub is_grace_period: bool,
    pub compression_applied: bool,
    pub from_username: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Listed for LimitlessEarning {
    const SELECT: &'static str = "e.id, e.original_id, e.recipient_id, e.recipient_original_id, \
         e.earning_type, e.level, e.percentage, e.amount_usdt, e.status, \
         e.is_grace_period, e.compression_applied, b.username AS from_username, e.created_at";
    const FROM: &'static str =
        "limitless_earnings e LEFT JOIN limitless_users b ON b.id = e.buyer_id";
    const ID: &'static str = "e.id";
    const ORDERING: &'static [(&'static str, &'static str)] = &[
        ("created_at", "e.created_at"),
        ("amount_usdt", "e.amount_usdt"),
    ];
    const DEFAULT_ORDERING: &'static str = "-created_at";
    const SEARCH_COLUMNS: &'static [&'static str] = &[];
    const NAME: &'static str = "Earning";
}

/// `?payment_status=COMPLETED&pack_id=3&buyer_original_id=1001`
#[derive(Debug, Default, Clone, Deserialize)]
pub struct PurchaseFilter {
    pub payment_status: Option<String>,
    pub pack_id: Option<i32>,
    pub buyer_original_id: Option<i64>,
}

impl ListFilter for PurchaseFilter {
    fn push_conditions(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        push_eq(qb, "p.payment_status", &self.payment_status);
        push_eq(qb, "p.pack_id", &self.pack_id);
        push_eq(qb, "p.buyer_original_id", &self.buyer_original_id);
    }
}

/// `?status=WITHDRAWN&earning_type=NETWORK&recipient_original_id=1001`
#[derive(Debug, Default, Clone, Deserialize)]
pub struct EarningFilter {
    pub status: Option<String>,
    pub earning_type: Option<String>,
    pub recipient_original_id: Option<i64>,
}

impl ListFilter for EarningFilter {
    fn push_conditions(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        push_eq(qb, "e.status", &self.status);
        push_eq(qb, "e.earning_type", &self.earning_type);
        push_eq(qb, "e.recipient_original_id", &self.recipient_original_id);
    }
}
