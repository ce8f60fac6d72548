//! The two referral hierarchies served by this API.
//!
//! Limitless and BoostyFi share one shape (users in a sponsor tree, purchases,
//! earnings) but their exports name a few columns differently. `Platform`
//! carries those differences as static SQL fragments; `Hierarchy` binds each
//! platform to its typed purchase and earning rows so handlers and services can
//! be written once and instantiated per platform.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use sqlx::{FromRow, postgres::PgRow};

use crate::models::{
    boostyfi::{BoostyfiEarning, BoostyfiPurchase},
    limitless::{LimitlessEarning, LimitlessPurchase},
    listing::{ListFilter, Listed},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Limitless,
    Boostyfi,
}

impl Platform {
    pub const ALL: [Platform; 2] = [Platform::Limitless, Platform::Boostyfi];

    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Limitless => "limitless",
            Platform::Boostyfi => "boostyfi",
        }
    }

    /// Human-facing name used in validation messages.
    pub fn display_name(self) -> &'static str {
        match self {
            Platform::Limitless => "Limitless",
            Platform::Boostyfi => "BoostyFi",
        }
    }

    pub fn users_table(self) -> &'static str {
        match self {
            Platform::Limitless => "limitless_users",
            Platform::Boostyfi => "boostyfi_users",
        }
    }

    pub fn purchases_table(self) -> &'static str {
        match self {
            Platform::Limitless => "limitless_purchases",
            Platform::Boostyfi => "boostyfi_purchases",
        }
    }

    pub fn earnings_table(self) -> &'static str {
        match self {
            Platform::Limitless => "limitless_earnings",
            Platform::Boostyfi => "boostyfi_earnings",
        }
    }

    /// Amount column shared by the purchases and earnings tables.
    pub fn amount_column(self) -> &'static str {
        match self {
            Platform::Limitless => "amount_usdt",
            Platform::Boostyfi => "amount",
        }
    }

    /// Earnings column pointing at the user who receives the earning.
    pub fn earning_owner_column(self) -> &'static str {
        match self {
            Platform::Limitless => "recipient_id",
            Platform::Boostyfi => "user_id",
        }
    }

    /// Earnings column holding the receiving user's original id.
    pub fn earning_owner_original_column(self) -> &'static str {
        match self {
            Platform::Limitless => "recipient_original_id",
            Platform::Boostyfi => "user_original_id",
        }
    }

    /// User columns matched by free-text search.
    pub fn user_search_columns(self) -> &'static [&'static str] {
        match self {
            Platform::Limitless => &["username", "wallet", "referral_code", "email"],
            Platform::Boostyfi => &[
                "username",
                "wallet",
                "referral_code",
                "email",
                "evm_address",
                "tron_address",
            ],
        }
    }

    /// Platform specific summary columns, selected from the `u` alias.
    pub fn summary_extra_columns(self) -> &'static str {
        match self {
            Platform::Limitless => "NULL::TEXT AS referral_type, NULL::NUMERIC AS total_atla",
            Platform::Boostyfi => {
                "u.referral_type, \
                 ROUND(u.locked_atla_balance + u.unlocked_atla_balance, 2) AS total_atla"
            }
        }
    }

    /// Platform specific detail columns, selected from the `u` alias.
    pub fn detail_extra_columns(self) -> &'static str {
        match self {
            Platform::Limitless => {
                "NULL::TEXT AS referral_type, NULL::TEXT AS evm_address, \
                 NULL::TEXT AS tron_address, NULL::NUMERIC AS locked_atla_balance, \
                 NULL::NUMERIC AS unlocked_atla_balance, NULL::NUMERIC AS total_atla"
            }
            Platform::Boostyfi => {
                "u.referral_type, u.evm_address, u.tron_address, \
                 u.locked_atla_balance, u.unlocked_atla_balance, \
                 u.locked_atla_balance + u.unlocked_atla_balance AS total_atla"
            }
        }
    }

    /// Ordering for the roots listing.
    pub fn roots_order(self) -> &'static str {
        match self {
            Platform::Limitless => "u.original_id",
            Platform::Boostyfi => "team_size DESC, u.original_id",
        }
    }

    /// Depth used by `users/{id}/tree` when the client does not ask for one.
    pub fn default_tree_depth(self) -> u32 {
        match self {
            Platform::Limitless => 2,
            Platform::Boostyfi => 1,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "limitless" => Ok(Platform::Limitless),
            "boostyfi" => Ok(Platform::Boostyfi),
            other => Err(format!("\"{other}\" is not a valid platform")),
        }
    }
}

/// Binds a platform to its row types.
pub trait Hierarchy: Send + Sync + 'static {
    const PLATFORM: Platform;

    type Purchase: Listed + for<'r> FromRow<'r, PgRow> + Serialize + Send + Sync + Unpin + 'static;
    type Earning: Listed + for<'r> FromRow<'r, PgRow> + Serialize + Send + Sync + Unpin + 'static;

    /// Filters accepted by the purchases listing.
    type PurchaseFilter: ListFilter + DeserializeOwned + Send + Sync + 'static;
    /// Filters accepted by the earnings listing.
    type EarningFilter: ListFilter + DeserializeOwned + Send + Sync + 'static;
}

pub struct Limitless;

pub struct Boostyfi;

impl Hierarchy for Limitless {
    const PLATFORM: Platform = Platform::Limitless;
    type Purchase = LimitlessPurchase;
    type Earning = LimitlessEarning;
    type PurchaseFilter = crate::models::limitless::PurchaseFilter;
    type EarningFilter = crate::models::limitless::EarningFilter;
}

impl Hierarchy for Boostyfi {
    const PLATFORM: Platform = Platform::Boostyfi;
    type Purchase = BoostyfiPurchase;
    type Earning = BoostyfiEarning;
    type PurchaseFilter = crate::models::boostyfi::PurchaseFilter;
    type EarningFilter = crate::models::boostyfi::EarningFilter;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_platform_names_case_insensitively() {
        assert_eq!("limitless".parse::<Platform>(), Ok(Platform::Limitless));
        assert_eq!(" BoostyFi ".parse::<Platform>(), Ok(Platform::Boostyfi));
        assert!("other".parse::<Platform>().is_err());
    }

    #[test]
    fn serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&Platform::Boostyfi).unwrap(),
            "\"boostyfi\""
        );
    }

    #[test]
    fn column_names_follow_each_export() {
        assert_eq!(Platform::Limitless.amount_column(), "amount_usdt");
        assert_eq!(Platform::Boostyfi.amount_column(), "amount");
        assert_eq!(Platform::Limitless.earning_owner_column(), "recipient_id");
        assert_eq!(Platform::Boostyfi.earning_owner_column(), "user_id");
        assert!(Platform::Boostyfi
            .user_search_columns()
            .contains(&"tron_address"));
        assert!(!Platform::Limitless
            .user_search_columns()
            .contains(&"tron_address"));
    }
}
