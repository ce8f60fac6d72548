//! HTTP middleware components.
//!
//! Middleware run before route handlers and may short-circuit a request,
//! e.g. reject it when the caller is not authenticated.

/// Bearer JWT authentication
pub mod auth;
