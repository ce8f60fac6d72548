//! Hierarchy user models shared by both platforms.
//!
//! This module defines:
//! - `UserSummary`: one user with its rollups (list rows, tree nodes, search hits)
//! - `TreeNode`: a summary plus its depth-limited children
//! - `UserDetail`: the full per-user view behind the detail modal
//! - Query parameter and response envelope types for the hierarchy endpoints

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A user row annotated with its rollups.
///
/// # Rollups
///
/// - `children_count`: direct children
/// - `team_size`: all descendants, from the nested-set bounds
/// - `purchases_count` / `direct_volume`: the user's COMPLETED purchases
/// - `total_earnings`: the user's WITHDRAWN earnings
///
/// `referral_type` and `total_atla` only exist on BoostyFi and are omitted
/// from Limitless responses.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct UserSummary {
    pub id: i64,
    pub original_id: i64,
    pub username: String,
    pub wallet: String,
    pub referral_code: String,
    pub is_active: bool,

    /// Parent row id, used to attach children while assembling trees.
    pub parent_id: Option<i64>,

    pub children_count: i64,
    pub team_size: i64,
    pub purchases_count: i64,
    pub direct_volume: Decimal,
    pub total_earnings: Decimal,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub referral_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_atla: Option<Decimal>,

    pub created_at: DateTime<Utc>,
}

/// A user with children expanded up to the requested depth.
///
/// Nodes at the depth limit have an empty `children` list; clients use
/// `children_count` to decide whether to offer an expand control.
#[derive(Debug, Clone, Serialize)]
pub struct TreeNode {
    #[serde(flatten)]
    pub user: UserSummary,
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    pub fn leaf(user: UserSummary) -> Self {
        Self {
            user,
            children: Vec::new(),
        }
    }
}

/// Earnings grouped by a single column.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct EarningBreakdown {
    /// Group key (`earning_type`, or the referral system id rendered as text).
    pub key: Option<String>,
    pub count: i64,
    pub total: Decimal,
}

/// Columns of the user row shown on the detail view.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct UserProfile {
    pub id: i64,
    pub original_id: i64,
    pub username: String,
    pub email: Option<String>,
    pub wallet: String,
    pub referral_code: String,
    pub referral_code_confirmed: bool,
    pub is_active: bool,
    pub is_superuser: bool,
    pub is_staff: bool,
    pub is_blocked: bool,
    pub date_joined: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub parent_id: Option<i64>,
    pub parent_username: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub referral_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evm_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tron_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locked_atla_balance: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unlocked_atla_balance: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_atla: Option<Decimal>,

    /// Nested-set coordinates, used for subtree aggregates only.
    #[serde(skip)]
    pub tree_id: i32,
    #[serde(skip)]
    pub lft: i32,
    #[serde(skip)]
    pub rght: i32,
}

impl UserProfile {
    pub fn team_size(&self) -> i64 {
        i64::from((self.rght - self.lft - 1).max(0) / 2)
    }
}

/// Rollups computed for the detail view.
#[derive(Debug, Clone, Default, sqlx::FromRow, Serialize)]
pub struct UserRollups {
    pub children_count: i64,
    pub purchases_count: i64,
    pub pending_purchases_count: i64,
    pub direct_volume: Decimal,
    pub total_earnings: Decimal,
    pub pending_earnings: Decimal,
}

/// Full detail of one user.
#[derive(Debug, Serialize)]
pub struct UserDetail<P, E> {
    #[serde(flatten)]
    pub profile: UserProfile,
    #[serde(flatten)]
    pub rollups: UserRollups,
    pub team_size: i64,
    pub team_volume: Decimal,
    pub purchases: Vec<P>,
    pub recent_earnings: Vec<E>,
    pub earnings_by_type: Vec<EarningBreakdown>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub earnings_by_system: Option<Vec<EarningBreakdown>>,
}

/// Filters accepted by the user listing.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct UserFilter {
    pub is_active: Option<bool>,
    pub referral_code_confirmed: Option<bool>,
    /// BoostyFi only; ignored for Limitless.
    pub referral_type: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TreeQuery {
    /// Negative values clamp to 0.
    pub depth: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RootsQuery {
    pub depth: Option<i64>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub const DEFAULT_ROOTS_LIMIT: i64 = 50;
pub const MAX_ROOTS_LIMIT: i64 = 200;

impl RootsQuery {
    pub fn limit(&self) -> i64 {
        self.limit
            .unwrap_or(DEFAULT_ROOTS_LIMIT)
            .clamp(1, MAX_ROOTS_LIMIT)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

/// Offset-paginated roots listing.
#[derive(Debug, Serialize)]
pub struct RootsPage {
    pub results: Vec<TreeNode>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
    pub has_more: bool,
}

impl RootsPage {
    pub fn new(results: Vec<TreeNode>, total: i64, limit: i64, offset: i64) -> Self {
        Self {
            results,
            total,
            limit,
            offset,
            has_more: offset.saturating_add(limit) < total,
        }
    }
}

/// Path from the root of a user's tree down to the user.
#[derive(Debug, Serialize)]
pub struct AncestorPath {
    pub user_id: i64,
    pub path: Vec<UserSummary>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    pub limit: Option<i64>,
}

pub const MIN_SEARCH_CHARS: usize = 2;
pub const DEFAULT_SEARCH_LIMIT: i64 = 20;
pub const MAX_SEARCH_LIMIT: i64 = 50;

impl SearchQuery {
    pub fn query(&self) -> &str {
        self.q.as_deref().map(str::trim).unwrap_or("")
    }

    /// Whether the query is long enough to hit the database.
    pub fn is_searchable(&self) -> bool {
        self.query().chars().count() >= MIN_SEARCH_CHARS
    }

    pub fn limit(&self) -> i64 {
        self.limit
            .unwrap_or(DEFAULT_SEARCH_LIMIT)
            .clamp(1, MAX_SEARCH_LIMIT)
    }
}

#[derive(Debug, Serialize)]
pub struct SearchResults {
    pub results: Vec<UserSummary>,
    pub query: String,
}

/// Platform-wide totals.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct HierarchyStats {
    pub total_users: i64,
    pub total_purchases: i64,
    pub total_volume: Decimal,
    pub total_earnings: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_atla: Option<Decimal>,
    pub root_users: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roots_query_clamps_limit_and_offset() {
        let q = RootsQuery {
            depth: None,
            limit: Some(1_000),
            offset: Some(-10),
        };
        assert_eq!(q.limit(), MAX_ROOTS_LIMIT);
        assert_eq!(q.offset(), 0);
        assert_eq!(RootsQuery::default().limit(), 50);
    }

    #[test]
    fn has_more_reflects_remaining_rows() {
        assert!(RootsPage::new(vec![], 120, 50, 50).has_more);
        assert!(!RootsPage::new(vec![], 100, 50, 50).has_more);
        assert!(!RootsPage::new(vec![], 0, 50, 0).has_more);
    }

    #[test]
    fn has_more_is_false_at_the_largest_offset() {
        let page = RootsPage::new(vec![], 10, 50, i64::MAX);
        assert!(!page.has_more);
        assert_eq!(page.offset, i64::MAX);
    }

    #[test]
    fn negative_depth_parses() {
        let q: TreeQuery = serde_json::from_value(serde_json::json!({ "depth": -1 })).unwrap();
        assert_eq!(q.depth, Some(-1));
    }

    #[test]
    fn search_requires_two_characters_after_trimming() {
        let q = SearchQuery {
            q: Some("  a ".into()),
            limit: None,
        };
        assert_eq!(q.query(), "a");
        assert!(!q.is_searchable());

        let q = SearchQuery {
            q: Some("ab".into()),
            limit: Some(500),
        };
        assert!(q.is_searchable());
        assert_eq!(q.limit(), MAX_SEARCH_LIMIT);
    }

    #[test]
    fn team_size_comes_from_nested_set_bounds() {
        let profile = UserProfile {
            id: 1,
            original_id: 10,
            username: "root".into(),
            email: None,
            wallet: String::new(),
            referral_code: String::new(),
            referral_code_confirmed: false,
            is_active: true,
            is_superuser: false,
            is_staff: false,
            is_blocked: false,
            date_joined: None,
            created_at: Utc::now(),
            parent_id: None,
            parent_username: None,
            referral_type: None,
            evm_address: None,
            tron_address: None,
            locked_atla_balance: None,
            unlocked_atla_balance: None,
            total_atla: None,
            tree_id: 1,
            lft: 1,
            rght: 8,
        };
        assert_eq!(profile.team_size(), 3);
    }
}
