//! Per-consumer views of provider secure storage.
//!
//! A view is `<consumer_root>/<token>/<leaf>` → `<secure_root>/<identifier>`.
//! Views are additive: existing links are left as they are and nothing is
//! ever removed here.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use token_authz_sdk::{ConsumerView, ResourceId, Token};
use tracing::debug;

use super::error::DomainError;
use super::ports::{LinkOutcome, ResourceStorage};

/// Materializes consumer views for already-authorized identifiers.
pub struct ResourceExposureManager {
    storage: Arc<dyn ResourceStorage>,
    secure_root: PathBuf,
    consumer_root: PathBuf,
}

struct PlannedLink<'a> {
    id: &'a ResourceId,
    leaf: &'a str,
    target: PathBuf,
}

impl ResourceExposureManager {
    /// Both roots must be absolute: link targets are written as given.
    #[must_use]
    pub fn new(
        storage: Arc<dyn ResourceStorage>,
        secure_root: PathBuf,
        consumer_root: PathBuf,
    ) -> Self {
        Self {
            storage,
            secure_root,
            consumer_root,
        }
    }

    /// Link every identifier into the token's consumer view.
    ///
    /// Existence of all identifiers is checked as a batch before the first
    /// link is made. Link creation then runs identifier by identifier without
    /// re-checking, so a file removed in between still receives a (dangling)
    /// link.
    ///
    /// # Errors
    ///
    /// - `UnsafePath` if the token or an identifier would escape its root
    /// - `ResourceAbsent` / `StorageLookup` if an identifier cannot be found
    /// - `Storage` if the view directory or a link cannot be created
    #[tracing::instrument(skip_all, fields(count = ids.len()))]
    pub async fn materialize(
        &self,
        token: &Token,
        ids: &[ResourceId],
    ) -> Result<ConsumerView, DomainError> {
        let consumer_dir = self.consumer_dir(token)?;
        let planned = ids
            .iter()
            .map(|id| self.plan(id))
            .collect::<Result<Vec<_>, _>>()?;

        for link in &planned {
            if !self.storage.exists(&link.target).await? {
                return Err(DomainError::ResourceAbsent {
                    id: link.id.to_string(),
                });
            }
        }
        debug!("all identifiers present; linking without re-checking");

        self.storage
            .mkdir_all(&consumer_dir)
            .await
            .map_err(|e| self.redact_token(e))?;

        let mut entries: Vec<String> = Vec::with_capacity(planned.len());
        for link in planned {
            let path = consumer_dir.join(link.leaf);
            let outcome = self
                .storage
                .link(&link.target, &path)
                .await
                .map_err(|e| self.redact_token(e))?;
            match outcome {
                LinkOutcome::Created => debug!(leaf = link.leaf, "consumer link created"),
                LinkOutcome::AlreadyExists => {
                    debug!(leaf = link.leaf, "consumer link already present");
                }
            }
            if !entries.iter().any(|e| e == link.leaf) {
                entries.push(link.leaf.to_owned());
            }
        }

        Ok(ConsumerView::new(consumer_dir, entries))
    }

    fn consumer_dir(&self, token: &Token) -> Result<PathBuf, DomainError> {
        if !is_safe_segment(token.expose()) {
            return Err(DomainError::UnsafePath { what: "token" });
        }
        Ok(self.consumer_root.join(token.expose()))
    }

    /// Storage errors under the consumer root carry the token as a path
    /// component; replace it before the error reaches any log.
    fn redact_token(&self, err: DomainError) -> DomainError {
        match err {
            DomainError::Storage { path, source } => {
                let path = match path.strip_prefix(&self.consumer_root) {
                    Ok(rel) => {
                        let mut rest = rel.components();
                        rest.next();
                        self.consumer_root.join("***").join(rest.as_path())
                    }
                    Err(_) => path,
                };
                DomainError::Storage { path, source }
            }
            other => other,
        }
    }

    fn plan<'a>(&self, id: &'a ResourceId) -> Result<PlannedLink<'a>, DomainError> {
        if !id.segments().all(is_safe_segment) {
            return Err(DomainError::UnsafePath {
                what: "resource identifier",
            });
        }
        let target = id
            .segments()
            .fold(self.secure_root.clone(), |path, segment| path.join(segment));

        Ok(PlannedLink {
            id,
            leaf: id.leaf_name(),
            target,
        })
    }

    #[must_use]
    pub fn consumer_root(&self) -> &Path {
        &self.consumer_root
    }
}

/// One path component from `[A-Za-z0-9-_.@]`, never `.` or `..`.
fn is_safe_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@'))
}
