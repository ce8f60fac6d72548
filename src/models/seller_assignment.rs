//! Seller assignments: which sellers have claimed which hierarchy users.
//!
//! A seller claims a user (and with it the user's wallet) on one platform.
//! At most `MAX_SELLERS_PER_WALLET` sellers may hold the same user, and a
//! seller may claim a given user only once.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::platform::Platform;

pub const MAX_SELLERS_PER_WALLET: i64 = 5;

/// Upper bound on ids accepted by the bulk lookup.
pub const MAX_BULK_USER_IDS: usize = 200;

/// Assignment row joined with its seller's names.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct SellerAssignment {
    pub id: i64,
    #[serde(rename = "seller")]
    pub seller_id: i64,
    pub seller_name: String,
    pub seller_username: String,
    pub platform: String,
    pub target_user_id: i64,
    pub wallet_address: String,
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

/// Seller shown next to a claimed wallet.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, PartialEq)]
pub struct SellerInfo {
    pub id: i64,
    pub seller_id: i64,
    pub seller_name: String,
    pub seller_username: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    pub target_user_id: i64,
}

/// Request body for `claim`.
///
/// ```json
/// { "platform": "boostyfi", "target_user_id": 42, "notes": "met at event" }
/// ```
#[derive(Debug, Deserialize)]
pub struct ClaimRequest {
    pub platform: Platform,
    pub target_user_id: i64,
    #[serde(default)]
    pub notes: String,
}

/// Request body for `unclaim`.
#[derive(Debug, Deserialize)]
pub struct UnclaimRequest {
    pub platform: Platform,
    pub target_user_id: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct MyAssignmentsQuery {
    pub platform: Option<Platform>,
}

/// Raw parameters of `for_user`; validated by hand so the error messages
/// stay specific.
#[derive(Debug, Default, Deserialize)]
pub struct ForUserQuery {
    pub platform: Option<String>,
    pub target_user_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BulkForUsersQuery {
    pub platform: Option<String>,
    pub user_ids: Option<String>,
}

/// Parse `1,2, 3` into ids, ignoring blanks and keeping the first
/// `MAX_BULK_USER_IDS`.
pub fn parse_user_ids(raw: &str) -> Result<Vec<i64>, std::num::ParseIntError> {
    let mut ids = raw
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::parse::<i64>)
        .collect::<Result<Vec<_>, _>>()?;
    ids.truncate(MAX_BULK_USER_IDS);
    Ok(ids)
}

/// Wallet cached on a claim: the first non-empty address, stored as is.
pub fn preferred_wallet<'a>(candidates: impl IntoIterator<Item = Option<&'a str>>) -> String {
    candidates
        .into_iter()
        .flatten()
        .find(|wallet| !wallet.is_empty())
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_comma_separated_ids() {
        assert_eq!(parse_user_ids("1, 2,,3 ").unwrap(), vec![1, 2, 3]);
        assert!(parse_user_ids("").unwrap().is_empty());
        assert!(parse_user_ids("1,abc").is_err());
    }

    #[test]
    fn caps_bulk_ids() {
        let raw = (1..=250).map(|i| i.to_string()).collect::<Vec<_>>().join(",");
        let ids = parse_user_ids(&raw).unwrap();
        assert_eq!(ids.len(), MAX_BULK_USER_IDS);
        assert_eq!(ids.last(), Some(&200));
    }

    #[test]
    fn preferred_wallet_skips_empty_addresses() {
        assert_eq!(
            preferred_wallet([Some(""), None, Some("TXyz"), Some("0xabc")]),
            "TXyz"
        );
        assert_eq!(preferred_wallet([None, None]), "");
    }

    #[test]
    fn preferred_wallet_keeps_the_address_unchanged() {
        assert_eq!(preferred_wallet([Some(" 0xAbC "), Some("TXyz")]), " 0xAbC ");
    }

    #[test]
    fn claim_request_defaults_notes() {
        let req: ClaimRequest =
            serde_json::from_str(r#"{"platform":"limitless","target_user_id":7}"#).unwrap();
        assert_eq!(req.platform, Platform::Limitless);
        assert_eq!(req.notes, "");
    }
}
