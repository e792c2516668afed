//! Token `AuthZ` SDK
//!
//! This crate provides the public API for the `token_authz` module:
//!
//! - [`TokenAuthzClient`] - Public API trait for request handlers
//! - [`Token`], [`ResourceId`], [`AuthorizedSet`], [`RequestedSet`] - Domain models
//! - [`ConsumerView`] - Result of exposing secure resources to a consumer
//! - [`TokenAuthzError`] - Error types
//!
//! ## Usage
//!
//! ```ignore
//! use token_authz_sdk::{RequestedSet, Token, TokenAuthzClient};
//!
//! let token = Token::new("opaque-bearer-token");
//! let requested: RequestedSet = ["example.com/sha/owner/category/name"].into_iter().collect();
//!
//! authz.authorize(&token, &requested).await?;
//! ```

pub mod api;
pub mod error;
pub mod models;

// Re-export main types at crate root
pub use api::TokenAuthzClient;
pub use error::TokenAuthzError;
pub use models::{
    AuthorizedSet, ConsumerView, PUBLIC_SUFFIX, RequestedSet, ResourceId, Token,
};
