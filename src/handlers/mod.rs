//! HTTP request handlers (route handlers).
//!
//! Each handler extracts what it needs (state, path, query, JSON body),
//! delegates to a service, and returns `Result<Json<T>, AppError>`.

/// Token issuance and refresh
pub mod auth;
/// Liveness check
pub mod health;
/// Per-platform user, tree and statistics endpoints
pub mod hierarchy;
/// Per-platform purchases and earnings
pub mod records;
/// Seller claims
pub mod sellers;
/// Current dashboard user
pub mod users;
/// Limitless wallet profiles
pub mod wallet_profiles;
