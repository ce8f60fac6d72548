//! Database-backed tests over a small CSV export.
//!
//! Each test gets a fresh database with migrations applied. Run with
//! `DATABASE_URL` pointing at a disposable PostgreSQL server:
//!
//! ```text
//! cargo test --features integration --test db
//! ```
//!
//! Limitless fixture (export ids):
//!
//! ```text
//! 1 root ── 2 alice ── 4 carol ── 5 dave
//!        └─ 3 bob
//! 6 erin
//! 7 orphan (parent 99 is not in the export)
//! ```

use std::path::PathBuf;

use axum::{body::Body, http::Request, http::StatusCode};
use chrono::{TimeZone, Utc};
use http_body_util::BodyExt;
use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::PgPool;
use tower::ServiceExt;

use referral_tree_dashboard::{
    app,
    config::Config,
    error::AppError,
    import::hierarchy::import_platform,
    models::{
        hierarchy::{RootsQuery, TreeNode, UserFilter},
        limitless::{LimitlessPurchase, PurchaseFilter},
        pagination::ListParams,
    },
    platform::{Boostyfi, Limitless, Platform},
    services::{auth_service::TokenKeys, listing_service, seller_service, tree_service},
    state::AppState,
};

fn sheets_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/sheets")
}

async fn import(pool: &PgPool, platform: Platform) {
    import_platform(pool, platform, &sheets_dir(), false)
        .await
        .unwrap();
}

/// Internal id of the user exported as `original_id`.
async fn user_id(pool: &PgPool, platform: Platform, original_id: i64) -> i64 {
    sqlx::query_scalar(&format!(
        "SELECT id FROM {} WHERE original_id = $1",
        platform.users_table()
    ))
    .bind(original_id)
    .fetch_one(pool)
    .await
    .unwrap()
}

async fn create_seller(pool: &PgPool, username: &str) -> i64 {
    sqlx::query_scalar(
        "INSERT INTO dashboard_users (username, password_hash, full_name, is_seller) \
         VALUES ($1, '', $1, TRUE) RETURNING id",
    )
    .bind(username)
    .fetch_one(pool)
    .await
    .unwrap()
}

fn usernames(nodes: &[TreeNode]) -> Vec<&str> {
    nodes.iter().map(|n| n.user.username.as_str()).collect()
}

fn dec(value: &str) -> Decimal {
    value.parse().unwrap()
}

#[sqlx::test(migrations = "./migrations")]
async fn import_reports_rows_and_trees(pool: PgPool) {
    let summary = import_platform(&pool, Platform::Limitless, &sheets_dir(), false)
        .await
        .unwrap();

    assert_eq!(summary.users, 7);
    assert_eq!(summary.purchases, 5);
    assert_eq!(summary.earnings, 3);
    assert_eq!(summary.tree.nodes, 7);
    assert_eq!(summary.tree.trees, 3);
}

#[sqlx::test(migrations = "./migrations")]
async fn reimport_is_idempotent(pool: PgPool) {
    import(&pool, Platform::Limitless).await;
    import(&pool, Platform::Limitless).await;

    let users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM limitless_users")
        .fetch_one(&pool)
        .await
        .unwrap();
    let purchases: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM limitless_purchases")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!((users, purchases), (7, 5));
}

#[sqlx::test(migrations = "./migrations")]
async fn parents_link_by_export_id(pool: PgPool) {
    import(&pool, Platform::Limitless).await;

    let root = user_id(&pool, Platform::Limitless, 1).await;
    let alice = user_id(&pool, Platform::Limitless, 2).await;
    let orphan = user_id(&pool, Platform::Limitless, 7).await;

    let (parent_id, parent_original_id): (Option<i64>, Option<i64>) = sqlx::query_as(
        "SELECT parent_id, parent_original_id FROM limitless_users WHERE id = $1",
    )
    .bind(alice)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(parent_id, Some(root));
    assert_eq!(parent_original_id, Some(1));

    // The missing parent is remembered but not linked.
    let (parent_id, parent_original_id): (Option<i64>, Option<i64>) = sqlx::query_as(
        "SELECT parent_id, parent_original_id FROM limitless_users WHERE id = $1",
    )
    .bind(orphan)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(parent_id, None);
    assert_eq!(parent_original_id, Some(99));
}

#[sqlx::test(migrations = "./migrations")]
async fn records_resolve_links_and_keep_export_timestamps(pool: PgPool) {
    import(&pool, Platform::Limitless).await;
    let alice = user_id(&pool, Platform::Limitless, 2).await;

    let purchase: LimitlessPurchase = listing_service::list::<LimitlessPurchase, _>(
        &pool,
        &ListParams::default(),
        &PurchaseFilter {
            buyer_original_id: Some(2),
            ..Default::default()
        },
    )
    .await
    .unwrap()
    .results
    .remove(0);

    assert_eq!(purchase.original_id, 100);
    assert_eq!(purchase.buyer_id, Some(alice));
    assert_eq!(purchase.buyer_username.as_deref(), Some("alice"));
    assert_eq!(
        purchase.created_at,
        Utc.with_ymd_and_hms(2024, 1, 5, 10, 0, 0).unwrap()
    );

    let offset_stamp: chrono::DateTime<Utc> =
        sqlx::query_scalar("SELECT created_at FROM limitless_purchases WHERE original_id = 101")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(offset_stamp, Utc.with_ymd_and_hms(2024, 2, 1, 12, 0, 0).unwrap());

    let (recipient_id, purchase_id): (Option<i64>, Option<i64>) = sqlx::query_as(
        "SELECT recipient_id, purchase_id FROM limitless_earnings WHERE original_id = 201",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    let purchase_101: i64 =
        sqlx::query_scalar("SELECT id FROM limitless_purchases WHERE original_id = 101")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(recipient_id, Some(alice));
    assert_eq!(purchase_id, Some(purchase_101));
}

#[sqlx::test(migrations = "./migrations")]
async fn subtree_carries_rollups_per_level(pool: PgPool) {
    import(&pool, Platform::Limitless).await;
    let root_id = user_id(&pool, Platform::Limitless, 1).await;

    let root = tree_service::subtree(&pool, Platform::Limitless, root_id, None)
        .await
        .unwrap();

    assert_eq!(root.user.team_size, 4);
    assert_eq!(root.user.children_count, 2);
    assert_eq!(root.user.total_earnings, dec("10"));
    assert_eq!(usernames(&root.children), ["alice", "bob"]);

    let alice = &root.children[0];
    assert_eq!(alice.user.children_count, 1);
    assert_eq!(alice.user.team_size, 2);
    assert_eq!(alice.user.purchases_count, 1);
    assert_eq!(alice.user.direct_volume, dec("100.00"));
    assert_eq!(alice.user.total_earnings, dec("5.05"));
    assert_eq!(usernames(&alice.children), ["carol"]);

    // Default Limitless depth stops below carol but keeps her count.
    let carol = &alice.children[0];
    assert!(carol.children.is_empty());
    assert_eq!(carol.user.children_count, 1);
    assert_eq!(carol.user.team_size, 1);
    assert_eq!(carol.user.purchases_count, 1);
    assert_eq!(carol.user.direct_volume, dec("50.50"));

    let bob = &root.children[1];
    assert_eq!(bob.user.children_count, 0);
    assert_eq!(bob.user.team_size, 0);
}

#[sqlx::test(migrations = "./migrations")]
async fn negative_depth_returns_only_the_node(pool: PgPool) {
    import(&pool, Platform::Limitless).await;
    let root_id = user_id(&pool, Platform::Limitless, 1).await;

    let root = tree_service::subtree(&pool, Platform::Limitless, root_id, Some(-1))
        .await
        .unwrap();

    assert!(root.children.is_empty());
    assert_eq!(root.user.children_count, 2);
}

#[sqlx::test(migrations = "./migrations")]
async fn subtree_of_unknown_user_is_not_found(pool: PgPool) {
    import(&pool, Platform::Limitless).await;

    let result = tree_service::subtree(&pool, Platform::Limitless, i64::MAX, None).await;

    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[sqlx::test(migrations = "./migrations")]
async fn roots_page_in_export_order(pool: PgPool) {
    import(&pool, Platform::Limitless).await;

    let all = tree_service::roots(&pool, Platform::Limitless, &RootsQuery::default())
        .await
        .unwrap();
    assert_eq!(all.total, 3);
    assert_eq!(usernames(&all.results), ["root", "erin", "orphan"]);
    assert!(!all.has_more);
    assert!(all.results.iter().all(|node| node.children.is_empty()));

    let first = tree_service::roots(
        &pool,
        Platform::Limitless,
        &RootsQuery {
            limit: Some(2),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(usernames(&first.results), ["root", "erin"]);
    assert!(first.has_more);

    let past_the_end = tree_service::roots(
        &pool,
        Platform::Limitless,
        &RootsQuery {
            offset: Some(i64::MAX),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert!(past_the_end.results.is_empty());
    assert!(!past_the_end.has_more);
}

#[sqlx::test(migrations = "./migrations")]
async fn ancestors_run_from_root_to_user(pool: PgPool) {
    import(&pool, Platform::Limitless).await;
    let dave = user_id(&pool, Platform::Limitless, 5).await;

    let path = tree_service::ancestors(&pool, Platform::Limitless, dave)
        .await
        .unwrap();

    let names: Vec<&str> = path.path.iter().map(|u| u.username.as_str()).collect();
    assert_eq!(path.user_id, dave);
    assert_eq!(names, ["root", "alice", "carol", "dave"]);
}

#[sqlx::test(migrations = "./migrations")]
async fn detail_rolls_up_purchases_and_team_volume(pool: PgPool) {
    import(&pool, Platform::Limitless).await;
    let carol = user_id(&pool, Platform::Limitless, 4).await;
    let root = user_id(&pool, Platform::Limitless, 1).await;

    let detail = tree_service::user_detail::<Limitless>(&pool, carol)
        .await
        .unwrap();

    assert_eq!(detail.profile.parent_username.as_deref(), Some("alice"));
    assert_eq!(detail.rollups.children_count, 1);
    assert_eq!(detail.rollups.purchases_count, 1);
    assert_eq!(detail.rollups.pending_purchases_count, 1);
    assert_eq!(detail.rollups.direct_volume, dec("50.50"));
    assert_eq!(detail.team_size, 1);
    // Carol's 50.50 plus dave's 10; the pending 999 is excluded.
    assert_eq!(detail.team_volume, dec("60.50"));
    assert_eq!(detail.purchases.len(), 2);
    assert!(detail.earnings_by_system.is_none());

    let detail = tree_service::user_detail::<Limitless>(&pool, root)
        .await
        .unwrap();
    assert_eq!(detail.team_size, 4);
    assert_eq!(detail.team_volume, dec("160.50"));
    assert_eq!(detail.rollups.total_earnings, dec("10"));
    assert_eq!(detail.earnings_by_type.len(), 1);
    assert_eq!(detail.earnings_by_type[0].key.as_deref(), Some("NETWORK"));
}

#[sqlx::test(migrations = "./migrations")]
async fn pending_earnings_are_split_out(pool: PgPool) {
    import(&pool, Platform::Limitless).await;
    let alice = user_id(&pool, Platform::Limitless, 2).await;

    let detail = tree_service::user_detail::<Limitless>(&pool, alice)
        .await
        .unwrap();

    assert_eq!(detail.rollups.total_earnings, dec("5.05"));
    assert_eq!(detail.rollups.pending_earnings, dec("3"));
    assert_eq!(detail.recent_earnings.len(), 2);
}

#[sqlx::test(migrations = "./migrations")]
async fn list_count_matches_search_filter(pool: PgPool) {
    import(&pool, Platform::Limitless).await;

    let params = ListParams {
        page_size: Some(2),
        search: Some("o".to_string()),
        ..Default::default()
    };
    let page = tree_service::list_users(&pool, Platform::Limitless, &params, &UserFilter::default())
        .await
        .unwrap();

    // root, bob, carol and orphan match; alice's wallet 0xA does not.
    assert_eq!(page.count, 4);
    assert_eq!(page.total_pages, 2);
    assert_eq!(page.results.len(), 2);

    let inactive = tree_service::list_users(
        &pool,
        Platform::Limitless,
        &ListParams::default(),
        &UserFilter {
            is_active: Some(false),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(inactive.count, 1);
    assert_eq!(inactive.results[0].username, "bob");

    let completed = listing_service::list::<LimitlessPurchase, _>(
        &pool,
        &ListParams::default(),
        &PurchaseFilter {
            payment_status: Some("COMPLETED".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(completed.count, 4);
    assert_eq!(completed.results.len(), 4);
}

#[sqlx::test(migrations = "./migrations")]
async fn stats_cover_the_whole_platform(pool: PgPool) {
    import(&pool, Platform::Limitless).await;
    import(&pool, Platform::Boostyfi).await;

    let limitless = tree_service::stats(&pool, Platform::Limitless).await.unwrap();
    assert_eq!(limitless.total_users, 7);
    assert_eq!(limitless.root_users, 3);
    assert!(limitless.total_atla.is_none());

    let boostyfi = tree_service::stats(&pool, Platform::Boostyfi).await.unwrap();
    assert_eq!(boostyfi.total_users, 2);
    assert_eq!(boostyfi.total_atla, Some(dec("4.75")));
}

#[sqlx::test(migrations = "./migrations")]
async fn boostyfi_detail_groups_earnings_by_system(pool: PgPool) {
    import(&pool, Platform::Boostyfi).await;
    let kol = user_id(&pool, Platform::Boostyfi, 10).await;

    let detail = tree_service::user_detail::<Boostyfi>(&pool, kol).await.unwrap();

    let by_system = detail.earnings_by_system.unwrap();
    assert_eq!(by_system.len(), 1);
    assert_eq!(by_system[0].key.as_deref(), Some("2"));
    assert_eq!(by_system[0].total, dec("4"));
    assert_eq!(detail.team_volume, dec("40"));
}

#[sqlx::test(migrations = "./migrations")]
async fn sixth_seller_is_rejected(pool: PgPool) {
    import(&pool, Platform::Limitless).await;
    let alice = user_id(&pool, Platform::Limitless, 2).await;

    for n in 1..=5 {
        let seller = create_seller(&pool, &format!("seller{n}")).await;
        let assignment = seller_service::claim(&pool, seller, Platform::Limitless, alice, "")
            .await
            .unwrap();
        assert_eq!(assignment.wallet_address, "0xA");
        assert_eq!(assignment.target_user_id, alice);
    }

    let sixth = create_seller(&pool, "seller6").await;
    let result = seller_service::claim(&pool, sixth, Platform::Limitless, alice, "").await;

    match result {
        Err(AppError::InvalidRequest(message)) => assert_eq!(
            message,
            "This wallet already has 5 sellers assigned. Maximum is 5."
        ),
        other => panic!("expected the seller limit error, got {other:?}"),
    }
    let sellers = seller_service::sellers_for_user(&pool, Platform::Limitless, alice)
        .await
        .unwrap();
    assert_eq!(sellers.len(), 5);
}

#[sqlx::test(migrations = "./migrations")]
async fn repeat_claim_is_rejected(pool: PgPool) {
    import(&pool, Platform::Limitless).await;
    let bob = user_id(&pool, Platform::Limitless, 3).await;
    let seller = create_seller(&pool, "seller").await;

    seller_service::claim(&pool, seller, Platform::Limitless, bob, " first ")
        .await
        .unwrap();
    let again = seller_service::claim(&pool, seller, Platform::Limitless, bob, "").await;

    match again {
        Err(AppError::InvalidRequest(message)) => {
            assert_eq!(message, "You have already claimed this wallet")
        }
        other => panic!("expected the already-claimed error, got {other:?}"),
    }
    let mine = seller_service::my_assignments(&pool, seller, None).await.unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].notes, "first");
}

#[sqlx::test(migrations = "./migrations")]
async fn claim_on_missing_target_is_rejected(pool: PgPool) {
    import(&pool, Platform::Limitless).await;
    let seller = create_seller(&pool, "seller").await;

    let result = seller_service::claim(&pool, seller, Platform::Limitless, i64::MAX, "").await;

    match result {
        Err(AppError::InvalidRequest(message)) => {
            assert_eq!(message, "Target user not found in Limitless")
        }
        other => panic!("expected the missing-target error, got {other:?}"),
    }
}

#[sqlx::test(migrations = "./migrations")]
async fn claim_falls_back_to_evm_address(pool: PgPool) {
    import(&pool, Platform::Boostyfi).await;
    let kol = user_id(&pool, Platform::Boostyfi, 10).await;
    let fan = user_id(&pool, Platform::Boostyfi, 11).await;
    let seller = create_seller(&pool, "seller").await;

    let assignment = seller_service::claim(&pool, seller, Platform::Boostyfi, kol, "")
        .await
        .unwrap();
    assert_eq!(assignment.wallet_address, "0xEVM");

    let grouped = seller_service::sellers_for_users(&pool, Platform::Boostyfi, &[kol, fan])
        .await
        .unwrap();
    assert_eq!(grouped.len(), 1);
    assert_eq!(grouped[&kol][0].seller_username, "seller");
}

#[sqlx::test(migrations = "./migrations")]
async fn tree_endpoint_serves_imported_data(pool: PgPool) {
    import(&pool, Platform::Limitless).await;
    let root = user_id(&pool, Platform::Limitless, 1).await;

    let config = Config {
        database_url: String::new(),
        jwt_secret: "test-secret".to_string(),
        server_port: 0,
        database_max_connections: 1,
        access_token_ttl_minutes: 60,
        refresh_token_ttl_days: 7,
        cors_allowed_origins: String::new(),
    };
    let router = app(
        AppState::new(pool, TokenKeys::from_config(&config)),
        &config,
    );

    let response = router
        .oneshot(
            Request::builder()
                .uri(format!("/api/v1/limitless/users/{root}/tree?depth=1"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["username"], "root");
    assert_eq!(body["team_size"], 4);
    assert_eq!(body["children"].as_array().unwrap().len(), 2);
    assert_eq!(body["children"][0]["children"], Value::Array(vec![]));
}
