//! Cached reading of source-line ranges.
//!
//! Goals
//! - One disk read per file under normal operation; repeated lookups for
//!   any range of an already-seen file are served from cache.
//! - 1-based external line numbers, LF/CRLF-robust slicing.
//! - Bounded cache so a long-running process cannot grow without limit;
//!   evicted entries are transparently recomputed.
//! - Optional mtime staleness checking, rate-limited to one stat per
//!   configured interval per file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant, SystemTime};

use moka::sync::Cache;

use crate::errors::IceError;

/// Byte positions of every '\n', for O(1) line→byte span lookup.
#[derive(Debug, Clone)]
pub struct LineMap {
    newlines: Vec<usize>,
    len: usize,
}

impl LineMap {
    pub fn build(bytes: &[u8]) -> Self {
        let mut newlines = Vec::with_capacity(bytes.len() / 40);
        let mut at = 0usize;
        while let Some(pos) = memchr::memchr(b'\n', &bytes[at..]) {
            newlines.push(at + pos);
            at += pos + 1;
        }
        Self {
            newlines,
            len: bytes.len(),
        }
    }

    /// Empty buffer => 0 lines; else (#'\n' + 1).
    pub fn line_count(&self) -> usize {
        if self.len == 0 {
            0
        } else {
            self.newlines.len() + 1
        }
    }

    /// Start byte (inclusive) of a 1-based line.
    fn line_start(&self, line: usize) -> Option<usize> {
        if line == 0 || line > self.line_count() {
            return None;
        }
        if line == 1 {
            return Some(0);
        }
        self.newlines.get(line - 2).map(|&nl| nl + 1)
    }

    /// End byte (exclusive) of a 1-based line, excluding a trailing '\r'.
    fn line_end(&self, line: usize, bytes: &[u8]) -> Option<usize> {
        if line == 0 || line > self.line_count() {
            return None;
        }
        if line <= self.newlines.len() {
            let nl = self.newlines[line - 1];
            if nl > 0 && bytes.get(nl - 1) == Some(&b'\r') {
                return Some(nl - 1);
            }
            return Some(nl);
        }
        // Last line without trailing '\n' ends at EOF.
        Some(self.len)
    }

    /// Byte span (start..end) for an inclusive 1-based line range.
    /// The end line is clamped to the available lines.
    pub fn span(&self, start_line: usize, end_line: usize, bytes: &[u8]) -> Option<(usize, usize)> {
        if start_line == 0 || start_line > end_line {
            return None;
        }
        let s = self.line_start(start_line)?;
        let e = self.line_end(end_line.min(self.line_count()), bytes)?;
        (s <= e).then_some((s, e))
    }
}

/// Fully-read source file plus its line index, shared between cache users.
#[derive(Debug)]
pub struct SourceFile {
    pub text: Arc<str>,
    pub lines: LineMap,
    mtime: Option<SystemTime>,
}

impl SourceFile {
    /// Text of an inclusive 1-based line range.
    pub fn lines_text(&self, start_line: usize, end_line: usize) -> Option<&str> {
        let (s, e) = self.lines.span(start_line, end_line, self.text.as_bytes())?;
        self.text.get(s..e)
    }
}

/// How many distinct files worth of source we keep in memory.
const FILE_CACHE_CAPACITY: u64 = 64;

/// Reads and caches whole source files, serving arbitrary line ranges.
///
/// Caching whole files (rather than individual ranges) means any range of
/// an already-seen file is a cache hit, and mtime invalidation is a single
/// eviction per file.
pub struct SourceReader {
    files: Cache<PathBuf, Arc<SourceFile>>,
    staleness: Option<Duration>,
    last_stat: Mutex<HashMap<PathBuf, Instant>>,
}

impl SourceReader {
    pub fn new(staleness: Option<Duration>) -> Self {
        Self {
            files: Cache::new(FILE_CACHE_CAPACITY),
            staleness,
            last_stat: Mutex::new(HashMap::new()),
        }
    }

    /// Load a file through the cache.
    pub fn read(&self, file: &Path) -> Result<Arc<SourceFile>, IceError> {
        if let Some(hit) = self.files.get(file) {
            return Ok(hit);
        }
        let loaded = Arc::new(Self::load(file)?);
        self.files.insert(file.to_path_buf(), Arc::clone(&loaded));
        Ok(loaded)
    }

    /// Drop all cached content for one file.
    pub fn invalidate(&self, file: &Path) {
        self.files.invalidate(file);
    }

    /// Drop every cached file.
    pub fn invalidate_all(&self) {
        self.files.invalidate_all();
    }

    fn load(file: &Path) -> Result<SourceFile, IceError> {
        let text = std::fs::read_to_string(file).map_err(|e| IceError::Io {
            file: file.to_path_buf(),
            source: e,
        })?;
        let lines = LineMap::build(text.as_bytes());
        let mtime = std::fs::metadata(file).ok().and_then(|m| m.modified().ok());
        Ok(SourceFile {
            text: Arc::from(text),
            lines,
            mtime,
        })
    }

    /// Rate-limited mtime comparison; evicts the file's entry on change
    /// and reports whether it did, so callers can drop dependent caches.
    /// No-op unless a staleness interval was configured.
    pub fn evict_if_stale(&self, file: &Path) -> bool {
        let Some(interval) = self.staleness else {
            return false;
        };
        {
            let mut stats = self.last_stat.lock().unwrap_or_else(|e| e.into_inner());
            let now = Instant::now();
            match stats.get(file) {
                Some(&at) if now.duration_since(at) < interval => return false,
                _ => {
                    stats.insert(file.to_path_buf(), now);
                }
            }
        }
        let Some(cached) = self.files.get(file) else {
            return false;
        };
        let on_disk = std::fs::metadata(file).ok().and_then(|m| m.modified().ok());
        if on_disk != cached.mtime {
            tracing::debug!(file = %file.display(), "source changed on disk, evicting");
            self.files.invalidate(file);
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn line_map_counts_and_spans() {
        let text = "one\ntwo\r\nthree";
        let map = LineMap::build(text.as_bytes());
        assert_eq!(map.line_count(), 3);

        let (s, e) = map.span(2, 2, text.as_bytes()).unwrap();
        assert_eq!(&text[s..e], "two");

        let (s, e) = map.span(1, 99, text.as_bytes()).unwrap();
        assert_eq!(&text[s..e], text);

        assert!(map.span(0, 1, text.as_bytes()).is_none());
        assert!(map.span(4, 4, text.as_bytes()).is_none());
    }

    #[test]
    fn line_map_empty_and_single() {
        assert_eq!(LineMap::build(b"").line_count(), 0);
        assert_eq!(LineMap::build(b"no newline").line_count(), 1);
    }

    #[test]
    fn reader_caches_until_invalidated() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "first").unwrap();
        f.flush().unwrap();

        let reader = SourceReader::new(None);
        let a = reader.read(f.path()).unwrap();
        assert_eq!(a.lines_text(1, 1), Some("first"));

        // Rewrite the file; without invalidation we still see the old text.
        std::fs::write(f.path(), "second\n").unwrap();
        let b = reader.read(f.path()).unwrap();
        assert_eq!(b.lines_text(1, 1), Some("first"));

        reader.invalidate(f.path());
        let c = reader.read(f.path()).unwrap();
        assert_eq!(c.lines_text(1, 1), Some("second"));
    }

    #[test]
    fn staleness_check_noop_without_interval_or_change() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "stable").unwrap();
        f.flush().unwrap();

        let no_staleness = SourceReader::new(None);
        no_staleness.read(f.path()).unwrap();
        assert!(!no_staleness.evict_if_stale(f.path()));

        let eager = SourceReader::new(Some(Duration::ZERO));
        eager.read(f.path()).unwrap();
        // Unchanged file: nothing to evict.
        assert!(!eager.evict_if_stale(f.path()));
        assert_eq!(eager.read(f.path()).unwrap().lines_text(1, 1), Some("stable"));
    }

    #[test]
    fn reader_missing_file_is_io_error() {
        let reader = SourceReader::new(None);
        let err = reader.read(Path::new("/definitely/not/here.rs")).unwrap_err();
        assert!(matches!(err, IceError::Io { .. }));
    }
}
