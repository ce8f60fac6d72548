//! Business logic services.
//!
//! Services own the SQL and the rules behind each endpoint; handlers stay
//! thin wrappers around them.

pub mod auth_service;
pub mod listing_service;
pub mod nested_set;
pub mod seller_service;
pub mod tree_service;
pub mod wallet_profile_service;
