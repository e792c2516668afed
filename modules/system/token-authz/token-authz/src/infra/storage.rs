//! Filesystem adapter for provider storage and consumer views.

use std::io::ErrorKind;
use std::path::Path;

use async_trait::async_trait;

use crate::domain::DomainError;
use crate::domain::ports::{LinkOutcome, ResourceStorage};

/// `tokio::fs`-backed storage. Links are symbolic links.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsResourceStorage;

#[async_trait]
impl ResourceStorage for FsResourceStorage {
    async fn exists(&self, path: &Path) -> Result<bool, DomainError> {
        tokio::fs::try_exists(path)
            .await
            .map_err(|source| DomainError::StorageLookup {
                path: path.to_path_buf(),
                source,
            })
    }

    async fn mkdir_all(&self, path: &Path) -> Result<(), DomainError> {
        tokio::fs::create_dir_all(path)
            .await
            .map_err(|source| DomainError::Storage {
                path: path.to_path_buf(),
                source,
            })
    }

    async fn link(&self, target: &Path, link: &Path) -> Result<LinkOutcome, DomainError> {
        match symlink(target, link).await {
            Ok(()) => Ok(LinkOutcome::Created),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(LinkOutcome::AlreadyExists),
            Err(source) => Err(DomainError::Storage {
                path: link.to_path_buf(),
                source,
            }),
        }
    }
}

#[cfg(unix)]
async fn symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    tokio::fs::symlink(target, link).await
}

#[cfg(windows)]
async fn symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    tokio::fs::symlink_file(target, link).await
}
