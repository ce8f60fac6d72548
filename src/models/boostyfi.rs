//! BoostyFi purchase and earning rows.
//!
//! BoostyFi purchases carry a discount over the full pack price and a payment
//! channel; earnings are produced by one of three referral systems
//! (1 Influencer, 2 KOL, 3 MLM).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{Postgres, QueryBuilder};

use super::listing::{ListFilter, Listed, push_eq};

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct BoostyfiPurchase {
    pub id: i64,
    pub original_id: i64,
    pub buyer_id: Option<i64>,
    pub buyer_original_id: Option<i64>,
    pub buyer_username: Option<String>,
    pub amount: Decimal,
    pub full_amount: Decimal,
    pub discount_rate: Decimal,
    pub tx_hash: String,
    pub payment_status: String,
    pub payment_type: String,
    pub jggl_pack_id: Option<i32>,
    pub atla_pack_id: Option<i32>,
    pub created_at: DateTime<Utc>,
}

impl Listed for BoostyfiPurchase {
    const SELECT: &'static str = "p.id, p.original_id, p.buyer_id, p.buyer_original_id, \
         b.username AS buyer_username, p.amount, p.full_amount, p.discount_rate, p.tx_hash, \
         p.payment_status, p.payment_type, p.jggl_pack_id, p.atla_pack_id, p.created_at";
    const FROM: &'static str =
        "boostyfi_purchases p LEFT JOIN boostyfi_users b ON b.id = p.buyer_id";
    const ID: &'static str = "p.id";
    const ORDERING: &'static [(&'static str, &'static str)] =
        &[("created_at", "p.created_at"), ("amount", "p.amount")];
    const DEFAULT_ORDERING: &'static str = "-created_at";
    const SEARCH_COLUMNS: &'static [&'static str] = &["p.tx_hash"];
    const NAME: &'static str = "Purchase";
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct BoostyfiEarning {
    pub id: i64,
    pub original_id: i64,
    pub user_id: Option<i64>,
    pub user_original_id: Option<i64>,
    pub earning_type: String,
    pub generation_level: Option<i32>,
    pub percentage: Option<Decimal>,
    pub amount: Decimal,
    pub status: String,
    pub referral_system_type: Option<i32>,
    pub referral_system_name: String,
    pub qualification_reason: String,
    pub tier: Option<i32>,
    pub is_sponsor_earning: bool,
    pub from_username: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Listed for BoostyfiEarning {
    const SELECT: &'static str = "e.id, e.original_id, e.user_id, e.user_original_id, \
         e.earning_type, e.generation_level, e.percentage, e.amount, e.status, \
         e.referral_system_type, \
         CASE e.referral_system_type WHEN 1 THEN 'Influencer' WHEN 2 THEN 'KOL' \
         WHEN 3 THEN 'MLM' ELSE 'Unknown' END AS referral_system_name, \
         e.qualification_reason, e.tier, e.is_sponsor_earning, \
         b.username AS from_username, e.created_at";
    const FROM: &'static str = "boostyfi_earnings e LEFT JOIN boostyfi_users b ON b.id = e.buyer_id";
    const ID: &'static str = "e.id";
    const ORDERING: &'static [(&'static str, &'static str)] =
        &[("created_at", "e.created_at"), ("amount", "e.amount")];
    const DEFAULT_ORDERING: &'static str = "-created_at";
    const SEARCH_COLUMNS: &'static [&'static str] = &[];
    const NAME: &'static str = "Earning";
}

/// `?payment_status=COMPLETED&payment_type=CARD&jggl_pack_id=2&buyer_original_id=77`
#[derive(Debug, Default, Clone, Deserialize)]
pub struct PurchaseFilter {
    pub payment_status: Option<String>,
    pub payment_type: Option<String>,
    pub jggl_pack_id: Option<i32>,
    pub buyer_original_id: Option<i64>,
}

impl ListFilter for PurchaseFilter {
    fn push_conditions(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        push_eq(qb, "p.payment_status", &self.payment_status);
        push_eq(qb, "p.payment_type", &self.payment_type);
        push_eq(qb, "p.jggl_pack_id", &self.jggl_pack_id);
        push_eq(qb, "p.buyer_original_id", &self.buyer_original_id);
    }
}

/// `?status=PENDING&referral_system_type=3&user_original_id=77`
#[derive(Debug, Default, Clone, Deserialize)]
pub struct EarningFilter {
    pub status: Option<String>,
    pub earning_type: Option<String>,
    pub referral_system_type: Option<i32>,
    pub user_original_id: Option<i64>,
}

impl ListFilter for EarningFilter {
    fn push_conditions(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        push_eq(qb, "e.status", &self.status);
        push_eq(qb, "e.earning_type", &self.earning_type);
        push_eq(qb, "e.referral_system_type", &self.referral_system_type);
        push_eq(qb, "e.user_original_id", &self.user_original_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn purchase_filter_binds_present_values_in_order() {
        let filter = PurchaseFilter {
            payment_status: Some("COMPLETED".into()),
            payment_type: None,
            jggl_pack_id: Some(2),
            buyer_original_id: None,
        };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1 FROM boostyfi_purchases p WHERE TRUE");
        filter.push_conditions(&mut qb);
        assert_eq!(
            qb.sql(),
            "SELECT 1 FROM boostyfi_purchases p WHERE TRUE \
             AND p.payment_status = $1 AND p.jggl_pack_id = $2"
        );
    }
}
