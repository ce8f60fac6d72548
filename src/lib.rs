//! Referral hierarchy dashboard API.
//!
//! A REST/JSON service over two referral hierarchies (Limitless and
//! BoostyFi) stored in PostgreSQL: depth-limited subtrees with per-node
//! rollups, paginated listings, seller claims and JWT login.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum
//! - **Database**: PostgreSQL with sqlx, nested-set columns for subtree queries
//! - **Authentication**: HS256 JWT bearer tokens, argon2 password hashes
//! - **Format**: JSON requests/responses, decimals as strings

pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod import;
pub mod middleware;
pub mod models;
pub mod platform;
pub mod services;
pub mod state;

use axum::{
    Router,
    http::{
        HeaderValue, Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    middleware as axum_middleware,
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    config::Config,
    handlers::{auth, health, hierarchy, records, sellers, users, wallet_profiles},
    platform::{Boostyfi, Hierarchy, Limitless},
    state::AppState,
};

/// Read endpoints shared by both platforms, relative to `/api/v1/<platform>`.
fn platform_routes<H: Hierarchy>() -> Router<AppState> {
    Router::new()
        .route("/users", get(hierarchy::list_users::<H>))
        .route("/users/roots", get(hierarchy::roots::<H>))
        .route("/users/search", get(hierarchy::search::<H>))
        .route("/users/stats", get(hierarchy::stats::<H>))
        .route("/users/{id}", get(hierarchy::user_detail::<H>))
        .route("/users/{id}/tree", get(hierarchy::subtree::<H>))
        .route("/users/{id}/ancestors", get(hierarchy::ancestors::<H>))
        .route("/purchases", get(records::list_purchases::<H>))
        .route("/purchases/{id}", get(records::get_purchase::<H>))
        .route("/earnings", get(records::list_earnings::<H>))
        .route("/earnings/{id}", get(records::get_earning::<H>))
}

fn wallet_profile_routes() -> Router<AppState> {
    Router::new()
        .route("/wallet-profiles", get(wallet_profiles::list_wallet_profiles))
        .route(
            "/wallet-profiles/lookup",
            get(wallet_profiles::lookup_wallet_profile),
        )
        .route(
            "/wallet-profiles/{id}",
            get(wallet_profiles::get_wallet_profile),
        )
}

/// Any origin when none are configured, otherwise exactly the listed ones.
fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins()
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE]);

    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(origins)
    }
}

/// Build the full HTTP router.
pub fn app(state: AppState, config: &Config) -> Router {
    // Seller endpoints and the caller's own profile need an access token
    let authenticated_routes = Router::new()
        .route("/api/v1/users/me", get(users::me).patch(users::update_me))
        .route(
            "/api/v1/core/seller-assignments/claim",
            post(sellers::claim),
        )
        .route(
            "/api/v1/core/seller-assignments/unclaim",
            post(sellers::unclaim),
        )
        .route(
            "/api/v1/core/seller-assignments/my_assignments",
            get(sellers::my_assignments),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::auth_middleware,
        ));

    Router::new()
        .route("/health", get(health::health_check))
        .route("/api/v1/auth/token", post(auth::obtain_token))
        .route("/api/v1/auth/token/refresh", post(auth::refresh_token))
        .route(
            "/api/v1/core/seller-assignments/for_user",
            get(sellers::for_user),
        )
        .route(
            "/api/v1/core/seller-assignments/bulk_for_users",
            get(sellers::bulk_for_users),
        )
        .nest(
            "/api/v1/limitless",
            platform_routes::<Limitless>().merge(wallet_profile_routes()),
        )
        .nest("/api/v1/boostyfi", platform_routes::<Boostyfi>())
        .merge(authenticated_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(config))
        .with_state(state)
}
