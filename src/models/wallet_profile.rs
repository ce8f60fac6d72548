//! Wallet profiles imported from the Limitless rank-users export.
//!
//! A profile is keyed by its export id and describes the owner of a main
//! wallet: contact details, rank, balances and the access they requested.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{Postgres, QueryBuilder};

use super::listing::{ListFilter, Listed, push_eq};

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct WalletProfile {
    pub id: i64,
    pub export_id: i64,
    pub main_wallet: String,
    pub subwallets: String,
    pub email: Option<String>,
    pub email_verified: bool,
    pub is_seller: bool,
    pub preferred_language: String,
    pub can_communicate_english: bool,
    pub community_count: i32,
    pub atla_balance: Decimal,
    pub rank: String,
    pub has_lp: bool,
    pub lp_shares: Decimal,
    pub has_chs: bool,
    pub ch_share: Decimal,
    pub has_dsy: bool,
    pub dsy_bonus: Decimal,
    pub bfi_atla: Decimal,
    pub bfi_jggl: Decimal,
    pub jggl: Decimal,
    pub need_private_zoom_call: bool,
    pub want_business_dev_access: bool,
    pub want_ceo_access: bool,
    pub telegram: String,
    pub facebook: String,
    pub whatsapp: String,
    pub viber: String,
    pub line: String,
    pub other_contact: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Listed for WalletProfile {
    const SELECT: &'static str = "w.*";
    const FROM: &'static str = "wallet_profiles w";
    const ID: &'static str = "w.id";
    const ORDERING: &'static [(&'static str, &'static str)] = &[
        ("export_id", "w.export_id"),
        ("atla_balance", "w.atla_balance"),
        ("community_count", "w.community_count"),
        ("created_at", "w.created_at"),
    ];
    const DEFAULT_ORDERING: &'static str = "-export_id";
    const SEARCH_COLUMNS: &'static [&'static str] = &[
        "w.main_wallet",
        "w.subwallets",
        "w.email",
        "w.telegram",
        "w.rank",
    ];
    const NAME: &'static str = "Wallet profile";
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct WalletProfileFilter {
    pub rank: Option<String>,
    pub is_seller: Option<bool>,
    pub email_verified: Option<bool>,
    pub has_lp: Option<bool>,
    pub has_chs: Option<bool>,
    pub has_dsy: Option<bool>,
}

impl ListFilter for WalletProfileFilter {
    fn push_conditions(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        push_eq(qb, "w.rank", &self.rank);
        push_eq(qb, "w.is_seller", &self.is_seller);
        push_eq(qb, "w.email_verified", &self.email_verified);
        push_eq(qb, "w.has_lp", &self.has_lp);
        push_eq(qb, "w.has_chs", &self.has_chs);
        push_eq(qb, "w.has_dsy", &self.has_dsy);
    }
}

#[derive(Debug, Deserialize)]
pub struct WalletLookupQuery {
    pub wallet: Option<String>,
}

/// One parsed row of the rank-users export, ready to upsert.
#[derive(Debug, Clone, PartialEq)]
pub struct WalletProfileRecord {
    pub export_id: i64,
    pub main_wallet: String,
    pub subwallets: String,
    pub email: Option<String>,
    pub email_verified: bool,
    pub is_seller: bool,
    pub preferred_language: String,
    pub can_communicate_english: bool,
    pub community_count: i32,
    pub atla_balance: Decimal,
    pub rank: String,
    pub has_lp: bool,
    pub lp_shares: Decimal,
    pub has_chs: bool,
    pub ch_share: Decimal,
    pub has_dsy: bool,
    pub dsy_bonus: Decimal,
    pub bfi_atla: Decimal,
    pub bfi_jggl: Decimal,
    pub jggl: Decimal,
    pub need_private_zoom_call: bool,
    pub want_business_dev_access: bool,
    pub want_ceo_access: bool,
    pub telegram: String,
    pub facebook: String,
    pub whatsapp: String,
    pub viber: String,
    pub line: String,
    pub other_contact: String,
}
