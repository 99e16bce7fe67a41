//! Memoized pipeline loads
//!
//! [`SnapshotCache`] runs the pipeline on first use and hands out the same
//! `Arc<Snapshot>` until its [`InvalidationPolicy`] reports the entry stale or
//! [`SnapshotCache::invalidate`] is called.

use super::Snapshot;
use crate::config::{Config, DataPaths, SpendRules};
use crate::error::Result;
use crate::metrics::CacheMetrics;
use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::ErrorKind;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

/// When and from what inputs the cached snapshot was built
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStamp {
    pub fingerprint: Option<String>,
    pub loaded_at: DateTime<Utc>,
}

pub trait InvalidationPolicy: Send + Sync {
    /// Whether `is_stale` needs the current input fingerprint
    fn uses_fingerprint(&self) -> bool {
        false
    }

    fn is_stale(
        &self,
        stamp: &CacheStamp,
        current_fingerprint: Option<&str>,
        now: DateTime<Utc>,
    ) -> bool;
}

/// Load once per cache lifetime; only `invalidate` forces a reload
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadOnce;

impl InvalidationPolicy for LoadOnce {
    fn is_stale(&self, _stamp: &CacheStamp, _current: Option<&str>, _now: DateTime<Utc>) -> bool {
        false
    }
}

/// Reload when any input file's bytes change, appear or disappear
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentHash;

impl InvalidationPolicy for ContentHash {
    fn uses_fingerprint(&self) -> bool {
        true
    }

    fn is_stale(&self, stamp: &CacheStamp, current: Option<&str>, _now: DateTime<Utc>) -> bool {
        stamp.fingerprint.as_deref() != current
    }
}

/// Reload once the snapshot is older than the given age
#[derive(Debug, Clone, Copy)]
pub struct MaxAge(pub Duration);

impl InvalidationPolicy for MaxAge {
    fn is_stale(&self, stamp: &CacheStamp, _current: Option<&str>, now: DateTime<Utc>) -> bool {
        now - stamp.loaded_at >= self.0
    }
}

/// SHA-256 over every input path and its contents; absent files hash a marker
pub fn fingerprint(paths: &DataPaths) -> Result<String> {
    let mut hasher = Sha256::new();
    for path in paths.all() {
        hasher.update(path.to_string_lossy().as_bytes());
        hasher.update([0u8]);
        match fs::read(path) {
            Ok(bytes) => {
                hasher.update(b"present|");
                hasher.update((bytes.len() as u64).to_le_bytes());
                hasher.update(&bytes);
            }
            Err(e) if e.kind() == ErrorKind::NotFound => hasher.update(b"absent|"),
            Err(e) => return Err(e.into()),
        }
    }
    Ok(hex::encode(hasher.finalize()))
}

type Loader = Box<dyn Fn(&DataPaths, &SpendRules) -> Result<Snapshot> + Send + Sync>;

struct CachedSnapshot {
    snapshot: Arc<Snapshot>,
    stamp: CacheStamp,
}

pub struct SnapshotCache {
    paths: DataPaths,
    rules: SpendRules,
    policy: Box<dyn InvalidationPolicy>,
    loader: Loader,
    entry: Mutex<Option<CachedSnapshot>>,
}

impl SnapshotCache {
    pub fn new(
        paths: DataPaths,
        rules: SpendRules,
        policy: impl InvalidationPolicy + 'static,
    ) -> Self {
        Self {
            paths,
            rules,
            policy: Box::new(policy),
            loader: Box::new(super::run),
            entry: Mutex::new(None),
        }
    }

    pub fn from_config(config: &Config, policy: impl InvalidationPolicy + 'static) -> Self {
        Self::new(config.data.clone(), config.spend.clone(), policy)
    }

    /// Replace the function that builds a snapshot
    pub fn with_loader<F>(mut self, loader: F) -> Self
    where
        F: Fn(&DataPaths, &SpendRules) -> Result<Snapshot> + Send + Sync + 'static,
    {
        self.loader = Box::new(loader);
        self
    }

    /// Cached snapshot, loading it first if absent or stale.
    ///
    /// A failed load returns the error and keeps whatever was cached before.
    pub fn get(&self) -> Result<Arc<Snapshot>> {
        let mut entry = self.lock();

        let current = if self.policy.uses_fingerprint() {
            Some(fingerprint(&self.paths)?)
        } else {
            None
        };

        if let Some(cached) = entry.as_ref() {
            if !self
                .policy
                .is_stale(&cached.stamp, current.as_deref(), Utc::now())
            {
                CacheMetrics::record_hit();
                return Ok(Arc::clone(&cached.snapshot));
            }
            debug!("Cached snapshot is stale, reloading");
        }

        CacheMetrics::record_miss();
        let snapshot = Arc::new((self.loader)(&self.paths, &self.rules)?);
        *entry = Some(CachedSnapshot {
            snapshot: Arc::clone(&snapshot),
            stamp: CacheStamp {
                fingerprint: current,
                loaded_at: Utc::now(),
            },
        });
        Ok(snapshot)
    }

    pub fn invalidate(&self) {
        if self.lock().take().is_some() {
            info!("Snapshot cache invalidated");
        }
    }

    pub fn stamp(&self) -> Option<CacheStamp> {
        self.lock().as_ref().map(|c| c.stamp.clone())
    }

    fn lock(&self) -> MutexGuard<'_, Option<CachedSnapshot>> {
        // The entry is replaced wholesale, so a poisoned lock still holds a consistent value
        self.entry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
