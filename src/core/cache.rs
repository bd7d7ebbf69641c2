//! Per-process cache of extracted aliases, keyed by call-site identity.
//!
//! Guarantees at most one parse-and-extract per distinct call site under
//! normal operation. Failures are cached too ([`CachedAliases::Unavailable`])
//! so a broken site degrades once instead of re-parsing on every call.
//!
//! Multiple invocations on one physical line are resolved by a runtime
//! occurrence counter: the Nth call on a line consumes the Nth parsed call,
//! cycling modulo the parsed count so calls inside loops stay matched.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use moka::sync::Cache;

use crate::core::extract::ParsedCall;
use crate::core::locate::EnclosingScope;

/// Identity of one textual call site.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct SiteKey {
    pub file: PathBuf,
    pub line: u32,
}

/// Cached extraction outcome for one site.
#[derive(Debug)]
pub enum CachedAliases {
    /// Parsed invocations on this line, document order. Never empty.
    Calls {
        calls: Vec<ParsedCall>,
        scope: EnclosingScope,
    },
    /// Parse or IO failure; no aliases will ever be available here.
    Unavailable,
}

/// How many distinct call sites we remember.
const SITE_CACHE_CAPACITY: u64 = 1024;

pub struct AliasCache {
    entries: Cache<SiteKey, Arc<CachedAliases>>,
    occurrences: Mutex<HashMap<SiteKey, usize>>,
}

impl AliasCache {
    pub fn new() -> Self {
        Self {
            entries: Cache::builder()
                .max_capacity(SITE_CACHE_CAPACITY)
                .support_invalidation_closures()
                .build(),
            occurrences: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, key: &SiteKey) -> Option<Arc<CachedAliases>> {
        self.entries.get(key)
    }

    pub fn insert(&self, key: SiteKey, entry: CachedAliases) -> Arc<CachedAliases> {
        let entry = Arc::new(entry);
        self.entries.insert(key, Arc::clone(&entry));
        entry
    }

    /// Runtime occurrence ordinal for this invocation at `key` (0-based,
    /// monotonically increasing per site).
    pub fn next_occurrence(&self, key: &SiteKey) -> usize {
        let mut occ = self.occurrences.lock().unwrap_or_else(|e| e.into_inner());
        let slot = occ.entry(key.clone()).or_insert(0);
        let current = *slot;
        *slot += 1;
        current
    }

    /// Evict every cached entry for one file (staleness invalidation).
    pub fn invalidate_file(&self, file: &Path) {
        let target = file.to_path_buf();
        let pred = target.clone();
        // Closure-based invalidation runs lazily inside moka; acceptable
        // since stale reads only risk outdated aliases, not corruption.
        let _ = self
            .entries
            .invalidate_entries_if(move |k, _| k.file == pred);
        self.occurrences
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .retain(|k, _| k.file != target);
    }

    /// Evict everything, occurrence counters included.
    pub fn invalidate_all(&self) {
        self.entries.invalidate_all();
        self.occurrences
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

impl Default for AliasCache {
    fn default() -> Self {
        Self::new()
    }
}
