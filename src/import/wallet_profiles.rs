//! Import of the Limitless rank-users export into `wallet_profiles`.
//!
//! The export uses spreadsheet headers ("Main Wallet", "ATLA Balance", ...),
//! may start with a byte order mark and formats amounts with thousands
//! separators. Rows without an id or main wallet are skipped.

use std::path::Path;

use serde::Deserialize;
use sqlx::{Postgres, QueryBuilder};

use super::{
    ImportError,
    parse::{non_blank, parse_bool, parse_grouped_decimal, parse_i32, parse_int},
    keep_last, read_rows,
};
use crate::{db::DbPool, models::wallet_profile::WalletProfileRecord};

const INSERT_BATCH: usize = 1_000;

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct RankUserCsvRow {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "Main Wallet")]
    pub main_wallet: String,
    #[serde(rename = "Subwallets")]
    pub subwallets: String,
    #[serde(rename = "Email")]
    pub email: String,
    #[serde(rename = "Email Verified")]
    pub email_verified: String,
    #[serde(rename = "Seller")]
    pub seller: String,
    #[serde(rename = "Preferred Language")]
    pub preferred_language: String,
    #[serde(rename = "Can Communicate in English")]
    pub can_communicate_english: String,
    #[serde(rename = "Community Count")]
    pub community_count: String,
    #[serde(rename = "ATLA Balance")]
    pub atla_balance: String,
    #[serde(rename = "Rank")]
    pub rank: String,
    #[serde(rename = "LP")]
    pub lp: String,
    #[serde(rename = "LP Shares")]
    pub lp_shares: String,
    #[serde(rename = "CHS")]
    pub chs: String,
    #[serde(rename = "CH Share")]
    pub ch_share: String,
    #[serde(rename = "DSY")]
    pub dsy: String,
    #[serde(rename = "DSY Bonus")]
    pub dsy_bonus: String,
    #[serde(rename = "BFI ATLA")]
    pub bfi_atla: String,
    #[serde(rename = "BFI JGGL")]
    pub bfi_jggl: String,
    #[serde(rename = "JGGL")]
    pub jggl: String,
    #[serde(rename = "Need Private Zoom Call")]
    pub need_private_zoom_call: String,
    #[serde(rename = "Want Business Dev Access")]
    pub want_business_dev_access: String,
    #[serde(rename = "Want CEO Access")]
    pub want_ceo_access: String,
    #[serde(rename = "Telegram")]
    pub telegram: String,
    #[serde(rename = "Facebook")]
    pub facebook: String,
    #[serde(rename = "WhatsApp")]
    pub whatsapp: String,
    #[serde(rename = "Viber")]
    pub viber: String,
    #[serde(rename = "Line")]
    pub line: String,
    #[serde(rename = "Other")]
    pub other: String,
}

impl RankUserCsvRow {
    /// `None` when the row lacks an id or main wallet.
    pub fn into_record(self) -> Option<WalletProfileRecord> {
        let export_id = parse_int(&self.id).filter(|id| *id != 0)?;
        let main_wallet = non_blank(&self.main_wallet)?;

        Some(WalletProfileRecord {
            export_id,
            main_wallet,
            subwallets: self.subwallets.trim().to_string(),
            email: non_blank(&self.email),
            email_verified: parse_bool(&self.email_verified),
            is_seller: parse_bool(&self.seller),
            preferred_language: self.preferred_language.trim().to_string(),
            can_communicate_english: parse_bool(&self.can_communicate_english),
            community_count: parse_i32(&self.community_count).unwrap_or(0),
            atla_balance: parse_grouped_decimal(&self.atla_balance),
            rank: self.rank.trim().to_string(),
            has_lp: parse_bool(&self.lp),
            lp_shares: parse_grouped_decimal(&self.lp_shares),
            has_chs: parse_bool(&self.chs),
            ch_share: parse_grouped_decimal(&self.ch_share),
            has_dsy: parse_bool(&self.dsy),
            dsy_bonus: parse_grouped_decimal(&self.dsy_bonus),
            bfi_atla: parse_grouped_decimal(&self.bfi_atla),
            bfi_jggl: parse_grouped_decimal(&self.bfi_jggl),
            jggl: parse_grouped_decimal(&self.jggl),
            need_private_zoom_call: parse_bool(&self.need_private_zoom_call),
            want_business_dev_access: parse_bool(&self.want_business_dev_access),
            want_ceo_access: parse_bool(&self.want_ceo_access),
            telegram: self.telegram.trim().to_string(),
            facebook: self.facebook.trim().to_string(),
            whatsapp: self.whatsapp.trim().to_string(),
            viber: self.viber.trim().to_string(),
            line: self.line.trim().to_string(),
            other_contact: self.other.trim().to_string(),
        })
    }
}

/// Counts of one wallet profile import.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WalletImportSummary {
    pub read: usize,
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
}

/// Import `path`, upserting profiles by export id.
pub async fn import_wallet_profiles(
    pool: &DbPool,
    path: &Path,
    clear: bool,
) -> Result<WalletImportSummary, ImportError> {
    if !tokio::fs::try_exists(path).await.unwrap_or(false) {
        return Err(ImportError::MissingInput(path.to_path_buf()));
    }

    let rows: Vec<RankUserCsvRow> = read_rows(path).await?;
    let read = rows.len();
    let records: Vec<WalletProfileRecord> = rows
        .into_iter()
        .filter_map(RankUserCsvRow::into_record)
        .collect();
    let records = keep_last(records, |r| r.export_id);
    tracing::info!(path = %path.display(), rows = read, usable = records.len(), "read wallet profiles");

    let mut tx = pool.begin().await?;

    if clear {
        tracing::info!("clearing existing wallet profiles");
        sqlx::query("DELETE FROM wallet_profiles")
            .execute(&mut *tx)
            .await?;
    }

    let mut created = 0;
    for chunk in records.chunks(INSERT_BATCH) {
        let mut qb = QueryBuilder::<Postgres>::new(
            "INSERT INTO wallet_profiles (export_id, main_wallet, subwallets, email, \
             email_verified, is_seller, preferred_language, can_communicate_english, \
             community_count, atla_balance, rank, has_lp, lp_shares, has_chs, ch_share, \
             has_dsy, dsy_bonus, bfi_atla, bfi_jggl, jggl, need_private_zoom_call, \
             want_business_dev_access, want_ceo_access, telegram, facebook, whatsapp, viber, \
             line, other_contact) ",
        );
        qb.push_values(chunk, |mut b, r| {
            b.push_bind(r.export_id)
                .push_bind(r.main_wallet.clone())
                .push_bind(r.subwallets.clone())
                .push_bind(r.email.clone())
                .push_bind(r.email_verified)
                .push_bind(r.is_seller)
                .push_bind(r.preferred_language.clone())
                .push_bind(r.can_communicate_english)
                .push_bind(r.community_count)
                .push_bind(r.atla_balance)
                .push_bind(r.rank.clone())
                .push_bind(r.has_lp)
                .push_bind(r.lp_shares)
                .push_bind(r.has_chs)
                .push_bind(r.ch_share)
                .push_bind(r.has_dsy)
                .push_bind(r.dsy_bonus)
                .push_bind(r.bfi_atla)
                .push_bind(r.bfi_jggl)
                .push_bind(r.jggl)
                .push_bind(r.need_private_zoom_call)
                .push_bind(r.want_business_dev_access)
                .push_bind(r.want_ceo_access)
                .push_bind(r.telegram.clone())
                .push_bind(r.facebook.clone())
                .push_bind(r.whatsapp.clone())
                .push_bind(r.viber.clone())
                .push_bind(r.line.clone())
                .push_bind(r.other_contact.clone());
        });
        // `xmax = 0` holds only for freshly inserted rows.
        qb.push(
            " ON CONFLICT (export_id) DO UPDATE SET \
             main_wallet = EXCLUDED.main_wallet, subwallets = EXCLUDED.subwallets, \
             email = EXCLUDED.email, email_verified = EXCLUDED.email_verified, \
             is_seller = EXCLUDED.is_seller, preferred_language = EXCLUDED.preferred_language, \
             can_communicate_english = EXCLUDED.can_communicate_english, \
             community_count = EXCLUDED.community_count, atla_balance = EXCLUDED.atla_balance, \
             rank = EXCLUDED.rank, has_lp = EXCLUDED.has_lp, lp_shares = EXCLUDED.lp_shares, \
             has_chs = EXCLUDED.has_chs, ch_share = EXCLUDED.ch_share, \
             has_dsy = EXCLUDED.has_dsy, dsy_bonus = EXCLUDED.dsy_bonus, \
             bfi_atla = EXCLUDED.bfi_atla, bfi_jggl = EXCLUDED.bfi_jggl, jggl = EXCLUDED.jggl, \
             need_private_zoom_call = EXCLUDED.need_private_zoom_call, \
             want_business_dev_access = EXCLUDED.want_business_dev_access, \
             want_ceo_access = EXCLUDED.want_ceo_access, telegram = EXCLUDED.telegram, \
             facebook = EXCLUDED.facebook, whatsapp = EXCLUDED.whatsapp, \
             viber = EXCLUDED.viber, line = EXCLUDED.line, \
             other_contact = EXCLUDED.other_contact, updated_at = NOW() \
             RETURNING (xmax = 0) AS inserted",
        );
        let inserted: Vec<bool> = qb.build_query_scalar().fetch_all(&mut *tx).await?;
        created += inserted.iter().filter(|fresh| **fresh).count();
    }

    tx.commit().await?;

    let summary = WalletImportSummary {
        read,
        created,
        updated: records.len() - created,
        skipped: read - records.len(),
    };
    tracing::info!(
        created = summary.created,
        updated = summary.updated,
        skipped = summary.skipped,
        "wallet profile import completed"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::parse_rows;
    use rust_decimal::Decimal;

    const EXPORT: &str = "\u{feff}ID,Main Wallet,Subwallets,Email,Seller,Community Count,ATLA Balance,Rank,LP,Telegram\n\
        7,0xMain,\"0xA, 0xB\",  ,yes,12,\"1,234.50\",Gold,TRUE,@whale\n\
        8,,0xC,c@example.com,no,,,,,\n\
        x,0xD,,,,,,,,\n";

    #[test]
    fn parses_spreadsheet_headers() {
        let records: Vec<WalletProfileRecord> = parse_rows::<RankUserCsvRow>(EXPORT)
            .unwrap()
            .into_iter()
            .filter_map(RankUserCsvRow::into_record)
            .collect();

        assert_eq!(records.len(), 1);
        let profile = &records[0];
        assert_eq!(profile.export_id, 7);
        assert_eq!(profile.main_wallet, "0xMain");
        assert_eq!(profile.subwallets, "0xA, 0xB");
        assert_eq!(profile.email, None);
        assert!(profile.is_seller);
        assert_eq!(profile.community_count, 12);
        assert_eq!(profile.atla_balance, Decimal::new(123_450, 2));
        assert_eq!(profile.rank, "Gold");
        assert!(profile.has_lp);
        assert!(!profile.has_chs);
        assert_eq!(profile.telegram, "@whale");
        assert_eq!(profile.other_contact, "");
    }
}
