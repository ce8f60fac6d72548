//! Data models representing database rows, request bodies and responses.

/// Staff and seller accounts
pub mod dashboard_user;
/// User summaries, trees and detail views shared by both platforms
pub mod hierarchy;
/// BoostyFi purchases and earnings
pub mod boostyfi;
/// Limitless purchases and earnings
pub mod limitless;
/// Row and filter traits used by generic listings
pub mod listing;
/// Page-number pagination and ordering
pub mod pagination;
/// Seller claims on hierarchy users
pub mod seller_assignment;
/// Rank-users export profiles
pub mod wallet_profile;
