//! Shared application state.

use std::sync::Arc;

use axum::extract::FromRef;

use crate::{db::DbPool, services::auth_service::TokenKeys};

/// State handed to every handler and middleware.
///
/// `FromRef` lets handlers extract just the part they need, e.g.
/// `State(pool): State<DbPool>`.
#[derive(Clone, FromRef)]
pub struct AppState {
    pub pool: DbPool,
    pub tokens: Arc<TokenKeys>,
}

impl AppState {
    pub fn new(pool: DbPool, tokens: TokenKeys) -> Self {
        Self {
            pool,
            tokens: Arc::new(tokens),
        }
    }
}
