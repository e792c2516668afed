//! HTTP gateway of the data exchange.
//!
//! Serves search, latest, publish and download on top of a
//! [`token_authz_sdk::TokenAuthzClient`], plus static access to the public
//! tree and to per-consumer views.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod api;
pub mod auth;
pub mod config;
pub mod cors;
pub mod error;
pub mod index;
pub mod middleware;
pub mod module;
pub mod problem;
pub mod search;
pub mod web;

pub use config::ApiGatewayConfig;
pub use index::{InMemoryRecordIndex, Record, RecordIndex};
pub use module::ApiGateway;
