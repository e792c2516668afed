//! Token `AuthZ` Module
//!
//! Resolves bearer tokens against a remote introspection authority through a
//! cache-aside lookup, evaluates requested resource sets against the resolved
//! grants, and materializes per-consumer views of provider secure storage.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod config;
pub mod domain;
pub mod infra;
pub mod module;

pub use config::TokenAuthzConfig;
pub use module::TokenAuthzModule;
