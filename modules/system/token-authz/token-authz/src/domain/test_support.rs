//! In-process doubles for the domain ports.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use token_authz_sdk::Token;

use super::error::DomainError;
use super::ports::{AuthorityClient, CacheStore, LinkOutcome, ResourceStorage};

/// Cache that counts reads and writes.
#[derive(Default)]
pub struct CountingCache {
    entries: Mutex<HashMap<String, String>>,
    reads: AtomicUsize,
    writes: AtomicUsize,
    drop_writes: bool,
}

impl CountingCache {
    /// Cache whose writes are counted but never stored.
    pub fn dropping_writes() -> Self {
        Self {
            drop_writes: true,
            ..Self::default()
        }
    }

    pub fn seed(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_owned(), value.to_owned());
    }

    pub fn value(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CacheStore for CountingCache {
    async fn get(&self, key: &str) -> Result<Option<String>, DomainError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.value(key))
    }

    async fn set(&self, key: &str, value: String) -> Result<(), DomainError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if !self.drop_writes {
            self.entries.lock().unwrap().insert(key.to_owned(), value);
        }
        Ok(())
    }
}

/// Fixed authority behavior.
pub enum AuthorityScript {
    Grant(&'static str),
    Reject(u16),
    Hang,
}

/// Authority double that answers from a script.
pub struct ScriptedAuthority {
    script: AuthorityScript,
    delay: Duration,
    calls: AtomicUsize,
}

impl ScriptedAuthority {
    pub fn new(script: AuthorityScript) -> Self {
        Self {
            script,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthorityClient for ScriptedAuthority {
    async fn introspect(&self, _token: &Token) -> Result<String, DomainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match self.script {
            AuthorityScript::Grant(payload) => Ok(payload.to_owned()),
            AuthorityScript::Reject(status) => Err(DomainError::AuthorityRejected { status }),
            AuthorityScript::Hang => std::future::pending().await,
        }
    }
}

/// Storage double: a set of existing files plus recorded links.
#[derive(Default)]
pub struct MemoryStorage {
    files: Mutex<HashSet<PathBuf>>,
    links: Mutex<HashMap<PathBuf, PathBuf>>,
    dirs: Mutex<HashSet<PathBuf>>,
    fail_links: bool,
}

impl MemoryStorage {
    /// Storage whose link step always fails.
    pub fn failing_links() -> Self {
        Self {
            fail_links: true,
            ..Self::default()
        }
    }

    pub fn add_file(&self, path: impl Into<PathBuf>) {
        self.files.lock().unwrap().insert(path.into());
    }

    pub fn link_target(&self, link: &Path) -> Option<PathBuf> {
        self.links.lock().unwrap().get(link).cloned()
    }

    pub fn link_count(&self) -> usize {
        self.links.lock().unwrap().len()
    }

    pub fn has_dir(&self, path: &Path) -> bool {
        self.dirs.lock().unwrap().contains(path)
    }
}

#[async_trait]
impl ResourceStorage for MemoryStorage {
    async fn exists(&self, path: &Path) -> Result<bool, DomainError> {
        Ok(self.files.lock().unwrap().contains(path))
    }

    async fn mkdir_all(&self, path: &Path) -> Result<(), DomainError> {
        self.dirs.lock().unwrap().insert(path.to_path_buf());
        Ok(())
    }

    async fn link(&self, target: &Path, link: &Path) -> Result<LinkOutcome, DomainError> {
        if self.fail_links {
            return Err(DomainError::Storage {
                path: link.to_path_buf(),
                source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
            });
        }
        let mut links = self.links.lock().unwrap();
        if links.contains_key(link) {
            return Ok(LinkOutcome::AlreadyExists);
        }
        links.insert(link.to_path_buf(), target.to_path_buf());
        Ok(LinkOutcome::Created)
    }
}
