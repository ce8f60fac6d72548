//! Hierarchy queries: summaries, depth-limited subtrees, roots, ancestors,
//! search, per-user detail and platform statistics.
//!
//! # Rollups
//!
//! Per-node aggregates are correlated subqueries over indexed foreign keys,
//! so a page of summaries costs one round trip. Team size and team volume use
//! the nested-set columns maintained by `nested_set::rebuild_tree`.
//!
//! # Subtrees
//!
//! A subtree of depth N is fetched with at most N + 1 queries (one per level,
//! all parents of a level at once) and assembled in memory.

use std::collections::HashMap;

use rust_decimal::Decimal;
use sqlx::{Postgres, QueryBuilder};

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        hierarchy::{
            AncestorPath, EarningBreakdown, HierarchyStats, RootsPage, RootsQuery, SearchQuery,
            SearchResults, TreeNode, UserDetail, UserFilter, UserProfile, UserRollups,
            UserSummary,
        },
        listing::Listed,
        pagination::{ListParams, Page, like_pattern, order_by_clause},
    },
    platform::{Hierarchy, Platform},
};

/// Deepest subtree a single request may expand.
pub const MAX_TREE_DEPTH: u32 = 10;

const RECENT_EARNINGS: i64 = 15;

const USER_ORDERING: &[(&str, &str)] = &[
    ("created_at", "u.created_at"),
    ("username", "u.username"),
    ("original_id", "u.original_id"),
];

/// `SELECT ... FROM users u` producing `UserSummary` rows.
fn summary_select(platform: Platform) -> String {
    let users = platform.users_table();
    let purchases = platform.purchases_table();
    let earnings = platform.earnings_table();
    let amount = platform.amount_column();
    let owner = platform.earning_owner_column();
    let extras = platform.summary_extra_columns();

    format!(
        r#"
        SELECT
            u.id, u.original_id, u.username, u.wallet, u.referral_code, u.is_active,
            u.parent_id, u.created_at,
            (SELECT COUNT(*) FROM {users} c WHERE c.parent_id = u.id) AS children_count,
            GREATEST((u.rght - u.lft - 1) / 2, 0)::BIGINT AS team_size,
            (SELECT COUNT(*) FROM {purchases} p
                WHERE p.buyer_id = u.id AND p.payment_status = 'COMPLETED') AS purchases_count,
            ROUND(COALESCE((SELECT SUM(p.{amount}) FROM {purchases} p
                WHERE p.buyer_id = u.id AND p.payment_status = 'COMPLETED'), 0), 2) AS direct_volume,
            ROUND(COALESCE((SELECT SUM(e.{amount}) FROM {earnings} e
                WHERE e.{owner} = u.id AND e.status = 'WITHDRAWN'), 0), 2) AS total_earnings,
            {extras}
        FROM {users} u
        "#
    )
}

/// Clamp a requested depth to `0..=MAX_TREE_DEPTH`. Negative depths mean
/// no children.
pub fn effective_depth(requested: Option<i64>, default: u32) -> u32 {
    match requested {
        Some(depth) => depth.clamp(0, i64::from(MAX_TREE_DEPTH)) as u32,
        None => default.min(MAX_TREE_DEPTH),
    }
}

/// Attach fetched levels below their roots.
///
/// `levels[0]` holds the children of `roots`, `levels[1]` their children and
/// so on. Each row is attached to the node named by its `parent_id`; rows
/// whose parent is not present one level up are dropped. Child order within
/// a parent follows the order rows appear in their level.
pub fn assemble_forest(roots: Vec<UserSummary>, levels: Vec<Vec<UserSummary>>) -> Vec<TreeNode> {
    let mut below: HashMap<i64, Vec<TreeNode>> = HashMap::new();

    for level in levels.into_iter().rev() {
        let mut attached: HashMap<i64, Vec<TreeNode>> = HashMap::new();
        for user in level {
            let children = below.remove(&user.id).unwrap_or_default();
            if let Some(parent) = user.parent_id {
                attached
                    .entry(parent)
                    .or_default()
                    .push(TreeNode { user, children });
            }
        }
        below = attached;
    }

    roots
        .into_iter()
        .map(|user| {
            let children = below.remove(&user.id).unwrap_or_default();
            TreeNode { user, children }
        })
        .collect()
}

/// Fetch `depth` levels of descendants below `roots` and assemble them.
async fn expand(
    pool: &DbPool,
    platform: Platform,
    roots: Vec<UserSummary>,
    depth: u32,
) -> Result<Vec<TreeNode>, AppError> {
    let mut levels: Vec<Vec<UserSummary>> = Vec::new();
    let mut frontier: Vec<i64> = roots
        .iter()
        .filter(|u| u.children_count > 0)
        .map(|u| u.id)
        .collect();

    for _ in 0..depth {
        if frontier.is_empty() {
            break;
        }
        let sql = format!(
            "{} WHERE u.parent_id = ANY($1) ORDER BY u.username, u.id",
            summary_select(platform)
        );
        let level: Vec<UserSummary> = sqlx::query_as(&sql)
            .bind(&frontier)
            .fetch_all(pool)
            .await?;

        frontier = level
            .iter()
            .filter(|u| u.children_count > 0)
            .map(|u| u.id)
            .collect();
        levels.push(level);
    }

    Ok(assemble_forest(roots, levels))
}

async fn fetch_summary(
    pool: &DbPool,
    platform: Platform,
    user_id: i64,
) -> Result<UserSummary, AppError> {
    let sql = format!("{} WHERE u.id = $1", summary_select(platform));
    sqlx::query_as(&sql)
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("User"))
}

/// `users/{id}/tree`
pub async fn subtree(
    pool: &DbPool,
    platform: Platform,
    user_id: i64,
    depth: Option<i64>,
) -> Result<TreeNode, AppError> {
    let depth = effective_depth(depth, platform.default_tree_depth());
    let root = fetch_summary(pool, platform, user_id).await?;

    expand(pool, platform, vec![root], depth)
        .await?
        .pop()
        .ok_or_else(|| AppError::not_found("User"))
}

/// `users/roots`
pub async fn roots(
    pool: &DbPool,
    platform: Platform,
    query: &RootsQuery,
) -> Result<RootsPage, AppError> {
    let limit = query.limit();
    let offset = query.offset();
    let depth = effective_depth(query.depth, 0);

    let total: i64 = sqlx::query_scalar(&format!(
        "SELECT COUNT(*) FROM {} WHERE parent_id IS NULL",
        platform.users_table()
    ))
    .fetch_one(pool)
    .await?;

    let sql = format!(
        "{} WHERE u.parent_id IS NULL ORDER BY {}, u.id LIMIT $1 OFFSET $2",
        summary_select(platform),
        platform.roots_order()
    );
    let page: Vec<UserSummary> = sqlx::query_as(&sql)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

    let results = expand(pool, platform, page, depth).await?;
    Ok(RootsPage::new(results, total, limit, offset))
}

/// `users/{id}/ancestors`: root first, the user last.
pub async fn ancestors(
    pool: &DbPool,
    platform: Platform,
    user_id: i64,
) -> Result<AncestorPath, AppError> {
    let bounds: (i32, i32, i32) = sqlx::query_as(&format!(
        "SELECT tree_id, lft, rght FROM {} WHERE id = $1",
        platform.users_table()
    ))
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("User"))?;

    let sql = format!(
        "{} WHERE u.tree_id = $1 AND u.lft <= $2 AND u.rght >= $3 ORDER BY u.lft",
        summary_select(platform)
    );
    let path: Vec<UserSummary> = sqlx::query_as(&sql)
        .bind(bounds.0)
        .bind(bounds.1)
        .bind(bounds.2)
        .fetch_all(pool)
        .await?;

    Ok(AncestorPath { user_id, path })
}

/// `users/search`. Short queries return no results without a query.
pub async fn search(
    pool: &DbPool,
    platform: Platform,
    query: &SearchQuery,
) -> Result<SearchResults, AppError> {
    let term = query.query().to_string();
    if !query.is_searchable() {
        return Ok(SearchResults {
            results: Vec::new(),
            query: term,
        });
    }

    let pattern = like_pattern(&term);
    let conditions = platform
        .user_search_columns()
        .iter()
        .map(|column| format!("u.{column} ILIKE $1"))
        .collect::<Vec<_>>()
        .join(" OR ");
    let sql = format!(
        "{} WHERE {conditions} ORDER BY u.original_id LIMIT $2",
        summary_select(platform)
    );

    let results: Vec<UserSummary> = sqlx::query_as(&sql)
        .bind(pattern)
        .bind(query.limit())
        .fetch_all(pool)
        .await?;

    Ok(SearchResults {
        results,
        query: term,
    })
}

fn push_user_conditions(
    qb: &mut QueryBuilder<'_, Postgres>,
    platform: Platform,
    filter: &UserFilter,
    params: &ListParams,
) {
    if let Some(is_active) = filter.is_active {
        qb.push(" AND u.is_active = ").push_bind(is_active);
    }
    if let Some(confirmed) = filter.referral_code_confirmed {
        qb.push(" AND u.referral_code_confirmed = ")
            .push_bind(confirmed);
    }
    if platform == Platform::Boostyfi {
        if let Some(referral_type) = &filter.referral_type {
            qb.push(" AND u.referral_type = ")
                .push_bind(referral_type.clone());
        }
    }
    let columns: Vec<String> = platform
        .user_search_columns()
        .iter()
        .map(|column| format!("u.{column}"))
        .collect();
    let columns: Vec<&str> = columns.iter().map(String::as_str).collect();
    crate::models::listing::push_search(qb, &columns, params.search_term());
}

/// `users` list.
pub async fn list_users(
    pool: &DbPool,
    platform: Platform,
    params: &ListParams,
    filter: &UserFilter,
) -> Result<Page<UserSummary>, AppError> {
    let mut count_qb = QueryBuilder::<Postgres>::new(format!(
        "SELECT COUNT(*) FROM {} u WHERE TRUE",
        platform.users_table()
    ));
    push_user_conditions(&mut count_qb, platform, filter, params);
    let count: i64 = count_qb.build_query_scalar().fetch_one(pool).await?;

    let mut qb = QueryBuilder::<Postgres>::new(summary_select(platform));
    qb.push(" WHERE TRUE");
    push_user_conditions(&mut qb, platform, filter, params);
    qb.push(" ORDER BY ").push(order_by_clause(
        params.ordering.as_deref(),
        USER_ORDERING,
        "original_id",
        "u.id ASC",
    ));
    qb.push(" LIMIT ")
        .push_bind(params.page_size())
        .push(" OFFSET ")
        .push_bind(params.offset());

    let results: Vec<UserSummary> = qb.build_query_as().fetch_all(pool).await?;
    Ok(Page::new(results, count, params))
}

/// `users/{id}`: profile, rollups, purchases and earnings of one user.
pub async fn user_detail<H: Hierarchy>(
    pool: &DbPool,
    user_id: i64,
) -> Result<UserDetail<H::Purchase, H::Earning>, AppError> {
    let platform = H::PLATFORM;
    let users = platform.users_table();
    let purchases = platform.purchases_table();
    let earnings = platform.earnings_table();
    let amount = platform.amount_column();
    let owner = platform.earning_owner_column();

    let profile: UserProfile = sqlx::query_as(&format!(
        r#"
        SELECT
            u.id, u.original_id, u.username, u.email, u.wallet, u.referral_code,
            u.referral_code_confirmed, u.is_active, u.is_superuser, u.is_staff, u.is_blocked,
            u.date_joined, u.created_at, u.parent_id, parent.username AS parent_username,
            u.tree_id, u.lft, u.rght,
            {extras}
        FROM {users} u
        LEFT JOIN {users} parent ON parent.id = u.parent_id
        WHERE u.id = $1
        "#,
        extras = platform.detail_extra_columns(),
    ))
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("User"))?;

    let rollups: UserRollups = sqlx::query_as(&format!(
        r#"
        SELECT
            (SELECT COUNT(*) FROM {users} c WHERE c.parent_id = $1) AS children_count,
            COUNT(*) FILTER (WHERE p.payment_status = 'COMPLETED') AS purchases_count,
            COUNT(*) FILTER (WHERE p.payment_status = 'PENDING') AS pending_purchases_count,
            COALESCE(SUM(p.{amount}) FILTER (WHERE p.payment_status = 'COMPLETED'), 0)
                AS direct_volume,
            COALESCE((SELECT SUM(e.{amount}) FROM {earnings} e
                WHERE e.{owner} = $1 AND e.status = 'WITHDRAWN'), 0) AS total_earnings,
            COALESCE((SELECT SUM(e.{amount}) FROM {earnings} e
                WHERE e.{owner} = $1 AND e.status = 'PENDING'), 0) AS pending_earnings
        FROM {purchases} p
        WHERE p.buyer_id = $1
        "#
    ))
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    let team_volume: Decimal = sqlx::query_scalar(&format!(
        r#"
        SELECT COALESCE(SUM(p.{amount}), 0)
        FROM {purchases} p
        JOIN {users} b ON b.id = p.buyer_id
        WHERE p.payment_status = 'COMPLETED'
          AND b.tree_id = $1 AND b.lft >= $2 AND b.lft <= $3
        "#
    ))
    .bind(profile.tree_id)
    .bind(profile.lft)
    .bind(profile.rght)
    .fetch_one(pool)
    .await?;

    let purchase_rows: Vec<H::Purchase> = sqlx::query_as(&format!(
        "SELECT {} FROM {} WHERE p.buyer_id = $1 ORDER BY p.created_at DESC, p.id DESC",
        <H::Purchase as Listed>::SELECT,
        <H::Purchase as Listed>::FROM,
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    let recent_earnings: Vec<H::Earning> = sqlx::query_as(&format!(
        "SELECT {} FROM {} WHERE e.{owner} = $1 ORDER BY e.created_at DESC, e.id DESC LIMIT $2",
        <H::Earning as Listed>::SELECT,
        <H::Earning as Listed>::FROM,
    ))
    .bind(user_id)
    .bind(RECENT_EARNINGS)
    .fetch_all(pool)
    .await?;

    let earnings_by_type = earnings_breakdown(pool, platform, user_id, "earning_type").await?;
    let earnings_by_system = match platform {
        Platform::Boostyfi => {
            Some(earnings_breakdown(pool, platform, user_id, "referral_system_type").await?)
        }
        Platform::Limitless => None,
    };

    let team_size = profile.team_size();
    Ok(UserDetail {
        profile,
        rollups,
        team_size,
        team_volume,
        purchases: purchase_rows,
        recent_earnings,
        earnings_by_type,
        earnings_by_system,
    })
}

/// Count and total of a user's earnings grouped by `column`.
async fn earnings_breakdown(
    pool: &DbPool,
    platform: Platform,
    user_id: i64,
    column: &'static str,
) -> Result<Vec<EarningBreakdown>, AppError> {
    let rows = sqlx::query_as(&format!(
        r#"
        SELECT {column}::TEXT AS key, COUNT(*) AS count, COALESCE(SUM({amount}), 0) AS total
        FROM {earnings}
        WHERE {owner} = $1
        GROUP BY {column}
        ORDER BY {column}
        "#,
        amount = platform.amount_column(),
        earnings = platform.earnings_table(),
        owner = platform.earning_owner_column(),
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// `users/stats`
pub async fn stats(pool: &DbPool, platform: Platform) -> Result<HierarchyStats, AppError> {
    let total_atla = match platform {
        Platform::Boostyfi => format!(
            "(SELECT ROUND(COALESCE(SUM(locked_atla_balance + unlocked_atla_balance), 0), 2) \
             FROM {})",
            platform.users_table()
        ),
        Platform::Limitless => "NULL::NUMERIC".to_string(),
    };

    let stats = sqlx::query_as(&format!(
        r#"
        SELECT
            (SELECT COUNT(*) FROM {users}) AS total_users,
            (SELECT COUNT(*) FROM {purchases} WHERE payment_status = 'COMPLETED')
                AS total_purchases,
            (SELECT ROUND(COALESCE(SUM({amount}), 0), 2) FROM {purchases}
                WHERE payment_status = 'COMPLETED') AS total_volume,
            (SELECT ROUND(COALESCE(SUM({amount}), 0), 2) FROM {earnings}
                WHERE status = 'WITHDRAWN') AS total_earnings,
            {total_atla} AS total_atla,
            (SELECT COUNT(*) FROM {users} WHERE parent_id IS NULL) AS root_users
        "#,
        users = platform.users_table(),
        purchases = platform.purchases_table(),
        earnings = platform.earnings_table(),
        amount = platform.amount_column(),
    ))
    .fetch_one(pool)
    .await?;

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user(id: i64, parent_id: Option<i64>) -> UserSummary {
        UserSummary {
            id,
            original_id: id * 100,
            username: format!("user{id}"),
            wallet: String::new(),
            referral_code: String::new(),
            is_active: true,
            parent_id,
            children_count: 0,
            team_size: 0,
            purchases_count: 0,
            direct_volume: Decimal::ZERO,
            total_earnings: Decimal::ZERO,
            referral_type: None,
            total_atla: None,
            created_at: Utc::now(),
        }
    }

    fn ids(nodes: &[TreeNode]) -> Vec<i64> {
        nodes.iter().map(|n| n.user.id).collect()
    }

    #[test]
    fn depth_is_clamped() {
        assert_eq!(effective_depth(None, 2), 2);
        assert_eq!(effective_depth(Some(0), 2), 0);
        assert_eq!(effective_depth(Some(500), 1), MAX_TREE_DEPTH);
        assert_eq!(effective_depth(None, 99), MAX_TREE_DEPTH);
    }

    #[test]
    fn negative_depth_means_no_children() {
        assert_eq!(effective_depth(Some(-1), 2), 0);
        assert_eq!(effective_depth(Some(i64::MIN), 2), 0);
    }

    #[test]
    fn assembles_levels_under_their_parents() {
        let roots = vec![user(1, None), user(2, None)];
        let levels = vec![
            vec![user(3, Some(1)), user(4, Some(1)), user(5, Some(2))],
            vec![user(6, Some(4)), user(7, Some(3)), user(8, Some(4))],
        ];
        let forest = assemble_forest(roots, levels);

        assert_eq!(ids(&forest), vec![1, 2]);
        assert_eq!(ids(&forest[0].children), vec![3, 4]);
        assert_eq!(ids(&forest[1].children), vec![5]);
        assert_eq!(ids(&forest[0].children[0].children), vec![7]);
        assert_eq!(ids(&forest[0].children[1].children), vec![6, 8]);
        assert!(forest[1].children[0].children.is_empty());
    }

    #[test]
    fn roots_without_levels_are_leaves() {
        let forest = assemble_forest(vec![user(1, None)], vec![]);
        assert_eq!(forest.len(), 1);
        assert!(forest[0].children.is_empty());
    }

    #[test]
    fn orphan_rows_are_dropped() {
        let forest = assemble_forest(vec![user(1, None)], vec![vec![user(9, Some(42))]]);
        assert!(forest[0].children.is_empty());
    }

    #[test]
    fn tree_node_serializes_flat_with_children() {
        let node = TreeNode {
            user: user(1, None),
            children: vec![TreeNode::leaf(user(2, Some(1)))],
        };
        let json = serde_json::to_value(&node).unwrap();

        assert_eq!(json["id"], 1);
        assert_eq!(json["original_id"], 100);
        assert_eq!(json["direct_volume"], "0");
        assert_eq!(json["children"][0]["id"], 2);
        assert!(json.get("referral_type").is_none());
        assert!(json.get("total_atla").is_none());
    }

    #[test]
    fn summary_select_uses_platform_columns() {
        let limitless = summary_select(Platform::Limitless);
        assert!(limitless.contains("SUM(p.amount_usdt)"));
        assert!(limitless.contains("e.recipient_id = u.id"));
        assert!(limitless.contains("FROM limitless_users u"));

        let boostyfi = summary_select(Platform::Boostyfi);
        assert!(boostyfi.contains("SUM(p.amount)"));
        assert!(boostyfi.contains("e.user_id = u.id"));
        assert!(boostyfi.contains("u.locked_atla_balance + u.unlocked_atla_balance"));
    }
}
