//! Infrastructure adapters for the domain ports.

pub mod authority;
pub mod cache;
pub mod storage;

pub use authority::HttpsAuthorityClient;
pub use cache::MemoryCacheStore;
pub use storage::FsResourceStorage;
