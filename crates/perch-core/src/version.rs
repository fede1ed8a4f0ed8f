//! Version-check side state.
//!
//! The result of the last release lookup is persisted so restarts within the
//! TTL don't repeat the remote call. Update detection is baseline-aware: a new
//! release is only reported when it is newer than the release recorded by the
//! previous lookup, never by comparing against the local build string (source
//! builds carry arbitrary version strings).

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::VersionError;

/// How long a cached lookup stays authoritative.
pub const CACHE_TTL_HOURS: i64 = 3;

const CACHE_FILE: &str = "version_cache.json";

/// Cached version-check result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub latest_version: String,
    pub current_version: String,
    pub checked_at: DateTime<Utc>,
    pub has_update: bool,
}

impl CacheEntry {
    /// Whether the entry is still within its TTL at `now`.
    ///
    /// Local version changes don't invalidate the entry.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.checked_at) < Duration::hours(CACHE_TTL_HOURS)
    }
}

/// On-disk cache file.
#[derive(Debug, Clone)]
pub struct VersionCache {
    path: PathBuf,
}

impl VersionCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Cache file in the config directory.
    pub fn default_location() -> Option<Self> {
        crate::config::config_dir().map(|dir| Self::new(dir.join(CACHE_FILE)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the cached entry. A missing file is `Ok(None)`.
    pub fn load(&self) -> Result<Option<CacheEntry>, VersionError> {
        let data = match std::fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_slice(&data)?))
    }

    /// Write the entry, creating parent directories as needed.
    pub fn save(&self, entry: &CacheEntry) -> Result<(), VersionError> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let data = serde_json::to_vec_pretty(entry)?;
        std::fs::write(&self.path, data)?;
        Ok(())
    }
}

/// Something that can report the latest published version.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReleaseSource: Send + Sync {
    /// Latest release tag, e.g. "v1.4.0".
    async fn latest_version(&self) -> Result<String, VersionError>;
}

/// Reported when a newer release is available.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateAvailable {
    pub current_version: String,
    pub latest_version: String,
}

/// Checks for updates against a [`ReleaseSource`], persisting results in a
/// [`VersionCache`].
pub struct VersionChecker<S> {
    source: S,
    cache: VersionCache,
    current_version: String,
}

impl<S: ReleaseSource> VersionChecker<S> {
    pub fn new(source: S, cache: VersionCache, current_version: impl Into<String>) -> Self {
        Self {
            source,
            cache,
            current_version: current_version.into(),
        }
    }

    /// Check for updates, answering from the cache while it is valid.
    pub async fn check(&self) -> Option<UpdateAvailable> {
        self.check_at(Utc::now(), false).await
    }

    /// Check for updates ignoring the TTL. The cached release still serves as
    /// the comparison baseline.
    pub async fn force_check(&self) -> Option<UpdateAvailable> {
        self.check_at(Utc::now(), true).await
    }

    async fn check_at(&self, now: DateTime<Utc>, force: bool) -> Option<UpdateAvailable> {
        let cached = match self.cache.load() {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Ignoring unreadable version cache: {}", e);
                None
            }
        };

        if !force {
            if let Some(entry) = cached.as_ref().filter(|e| e.is_valid_at(now)) {
                tracing::debug!("Version cache hit (latest {})", entry.latest_version);
                return entry.has_update.then(|| UpdateAvailable {
                    current_version: self.current_version.clone(),
                    latest_version: entry.latest_version.clone(),
                });
            }
        }

        let latest = match self.source.latest_version().await {
            Ok(latest) => latest,
            Err(e) => {
                tracing::debug!("Release lookup failed: {}", e);
                return None;
            }
        };

        // Without a prior baseline (first run) we only record one.
        let has_update = cached
            .as_ref()
            .filter(|e| !e.latest_version.is_empty())
            .is_some_and(|e| is_newer(&latest, &e.latest_version));

        let entry = CacheEntry {
            latest_version: latest.clone(),
            current_version: self.current_version.clone(),
            checked_at: now,
            has_update,
        };
        if let Err(e) = self.cache.save(&entry) {
            tracing::warn!("Failed to save version cache: {}", e);
        }

        has_update.then(|| UpdateAvailable {
            current_version: self.current_version.clone(),
            latest_version: latest,
        })
    }
}

/// Whether `candidate` is a strictly newer version than `baseline`.
///
/// Accepts an optional leading `v` and ignores pre-release/build suffixes.
pub fn is_newer(candidate: &str, baseline: &str) -> bool {
    let a = version_parts(candidate);
    let b = version_parts(baseline);
    let len = a.len().max(b.len());
    for i in 0..len {
        let x = a.get(i).copied().unwrap_or(0);
        let y = b.get(i).copied().unwrap_or(0);
        if x != y {
            return x > y;
        }
    }
    false
}

fn version_parts(version: &str) -> Vec<u64> {
    let trimmed = version.trim().trim_start_matches('v');
    let core = trimmed.split(['-', '+']).next().unwrap_or_default();
    core.split('.')
        .map(|part| {
            let digits: String = part.chars().take_while(|c| c.is_ascii_digit()).collect();
            digits.parse().unwrap_or(0)
        })
        .collect()
}
