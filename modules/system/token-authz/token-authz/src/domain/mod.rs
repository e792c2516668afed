//! Domain layer for the token `AuthZ` module.

pub mod error;
pub mod evaluator;
pub mod exposure;
pub mod introspection;
pub mod local_client;
pub mod payload;
pub mod ports;
pub mod resolver;
pub mod service;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::DomainError;
pub use local_client::TokenAuthzLocalClient;
pub use service::Service;
