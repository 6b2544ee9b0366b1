//! ==============================================================================
//! cache.rs - offline fallback for the last good forecast
//! ==============================================================================
//!
//! purpose:
//!     keeps the raw body of the last successful fetch in one file so the
//!     display has something to show after a failed fetch or a reboot.
//!
//! rules:
//!     - one slot, overwritten wholesale (write temp file, then rename)
//!     - read/write never fail the caller: a broken medium reads as "absent"
//!       and drops writes, but each such event is logged and counted
//!     - a missing file is plain absence, not a failure
//!
//! relationships:
//!     - written by: scheduler.rs (after a fetch whose payload parsed)
//!     - read by: scheduler.rs (boot render, fetch failure fallback)
//!
//! ==============================================================================

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::domain::RawPayload;

/// degradation counters, for diagnostics
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct CacheHealth {
    pub read_failures: u64,
    pub write_failures: u64,
}

pub trait CacheStore {
    fn write(&mut self, payload: &RawPayload);
    fn read(&mut self) -> Option<RawPayload>;
    fn health(&self) -> CacheHealth;
}

pub struct FileCache {
    path: PathBuf,
    health: CacheHealth,
}

impl FileCache {
    /// prepares the directory holding `path`; a failure here is not fatal,
    /// the cache then simply degrades on every access
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            if let Err(e) = std::fs::create_dir_all(dir) {
                tracing::warn!("cache directory {} unavailable: {}", dir.display(), e);
            }
        }
        Self { path, health: CacheHealth::default() }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn try_write(&self, payload: &RawPayload) -> Result<()> {
        let tmp = self.temp_path();
        let mut file = std::fs::File::create(&tmp)
            .with_context(|| format!("failed to open {} for writing", tmp.display()))?;
        file.write_all(payload.as_str().as_bytes())?;
        file.sync_all()?;
        drop(file);
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("failed to replace {}", self.path.display()))?;
        Ok(())
    }
}

impl CacheStore for FileCache {
    fn write(&mut self, payload: &RawPayload) {
        match self.try_write(payload) {
            Ok(()) => tracing::debug!("cached {} bytes to {}", payload.len(), self.path.display()),
            Err(e) => {
                self.health.write_failures += 1;
                tracing::warn!("cache write dropped: {:#}", e);
            }
        }
    }

    fn read(&mut self) -> Option<RawPayload> {
        match std::fs::read_to_string(&self.path) {
            Ok(body) => Some(RawPayload::new(body)).filter(|p| !p.is_empty()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => {
                self.health.read_failures += 1;
                tracing::warn!("cache read failed ({}), treating as absent: {}", self.path.display(), e);
                None
            }
        }
    }

    fn health(&self) -> CacheHealth {
        self.health
    }
}

/// volatile cache for tests
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryCache {
    slot: Option<RawPayload>,
    writes: usize,
}

#[cfg(test)]
impl MemoryCache {
    pub fn with_payload(payload: RawPayload) -> Self {
        Self { slot: Some(payload), writes: 0 }
    }

    pub fn writes(&self) -> usize {
        self.writes
    }
}

#[cfg(test)]
impl CacheStore for MemoryCache {
    fn write(&mut self, payload: &RawPayload) {
        self.slot = Some(payload.clone());
        self.writes += 1;
    }

    fn read(&mut self) -> Option<RawPayload> {
        self.slot.clone()
    }

    fn health(&self) -> CacheHealth {
        CacheHealth::default()
    }
}
