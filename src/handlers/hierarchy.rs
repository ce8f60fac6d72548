//! Hierarchy endpoints, mounted once per platform.
//!
//! Every handler is generic over `H: Hierarchy` and routed as e.g.
//! `get(subtree::<Limitless>)` under `/api/v1/limitless`:
//! - GET users - Paginated user summaries
//! - GET users/{id} - Full detail of one user
//! - GET users/{id}/tree - Depth-limited subtree
//! - GET users/{id}/ancestors - Path from the root to the user
//! - GET users/roots - Users without a sponsor
//! - GET users/search - Free-text lookup
//! - GET users/stats - Platform totals

use axum::{Json, extract::State};

use crate::{
    db::DbPool,
    error::AppError,
    extract::{AppPath, AppQuery},
    models::{
        hierarchy::{
            AncestorPath, HierarchyStats, RootsPage, RootsQuery, SearchQuery, SearchResults,
            TreeNode, TreeQuery, UserDetail, UserFilter, UserSummary,
        },
        pagination::{ListParams, Page},
    },
    platform::Hierarchy,
    services::tree_service,
};

/// `GET users?page=1&page_size=50&search=&ordering=-created_at&is_active=true`
pub async fn list_users<H: Hierarchy>(
    State(pool): State<DbPool>,
    AppQuery(params): AppQuery<ListParams>,
    AppQuery(filter): AppQuery<UserFilter>,
) -> Result<Json<Page<UserSummary>>, AppError> {
    let page = tree_service::list_users(&pool, H::PLATFORM, &params, &filter).await?;
    Ok(Json(page))
}

/// Full detail of one user.
///
/// # Endpoint
///
/// `GET users/{id}`
///
/// # Response
///
/// Profile columns and rollups flattened into one object, plus `team_size`,
/// `team_volume`, all `purchases`, the 15 most recent earnings and earnings
/// grouped by type (and by referral system on BoostyFi).
pub async fn user_detail<H: Hierarchy>(
    State(pool): State<DbPool>,
    AppPath(id): AppPath<i64>,
) -> Result<Json<UserDetail<H::Purchase, H::Earning>>, AppError> {
    let detail = tree_service::user_detail::<H>(&pool, id).await?;
    Ok(Json(detail))
}

/// Subtree rooted at a user.
///
/// # Endpoint
///
/// `GET users/{id}/tree?depth=2`
///
/// # Response (200 OK)
///
/// ```json
/// {
///   "id": 1, "username": "root", "children_count": 2, "team_size": 5,
///   "direct_volume": "100.00", "total_earnings": "12.50",
///   "children": [ { "id": 2, "children": [] } ]
/// }
/// ```
///
/// `depth` is clamped to 10; nodes at the limit have no `children` even when
/// `children_count` is non-zero.
pub async fn subtree<H: Hierarchy>(
    State(pool): State<DbPool>,
    AppPath(id): AppPath<i64>,
    AppQuery(query): AppQuery<TreeQuery>,
) -> Result<Json<TreeNode>, AppError> {
    let tree = tree_service::subtree(&pool, H::PLATFORM, id, query.depth).await?;
    Ok(Json(tree))
}

/// `GET users/roots?depth=0&limit=50&offset=0`
pub async fn roots<H: Hierarchy>(
    State(pool): State<DbPool>,
    AppQuery(query): AppQuery<RootsQuery>,
) -> Result<Json<RootsPage>, AppError> {
    let page = tree_service::roots(&pool, H::PLATFORM, &query).await?;
    Ok(Json(page))
}

/// `GET users/{id}/ancestors`
pub async fn ancestors<H: Hierarchy>(
    State(pool): State<DbPool>,
    AppPath(id): AppPath<i64>,
) -> Result<Json<AncestorPath>, AppError> {
    let path = tree_service::ancestors(&pool, H::PLATFORM, id).await?;
    Ok(Json(path))
}

/// `GET users/search?q=alice&limit=20`
///
/// Queries shorter than two characters return an empty result.
pub async fn search<H: Hierarchy>(
    State(pool): State<DbPool>,
    AppQuery(query): AppQuery<SearchQuery>,
) -> Result<Json<SearchResults>, AppError> {
    let results = tree_service::search(&pool, H::PLATFORM, &query).await?;
    Ok(Json(results))
}

/// `GET users/stats`
pub async fn stats<H: Hierarchy>(
    State(pool): State<DbPool>,
) -> Result<Json<HierarchyStats>, AppError> {
    let stats = tree_service::stats(&pool, H::PLATFORM).await?;
    Ok(Json(stats))
}
