//! Call-site resolution backed by `#[track_caller]` location data.
//!
//! The locator is the only platform-specific piece of the pipeline, so it
//! sits behind a narrow trait that tests replace with a fixed site.

use std::panic::Location;
use std::path::{Path, PathBuf};

use crate::errors::IceError;

/// One textual location where the entry point was invoked.
///
/// Rebuilt fresh on every invocation; never cached itself (only the
/// aliases resolved from it are).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    /// Path as reported by the runtime, resolved to something readable
    /// when possible.
    pub file: PathBuf,
    /// 1-based line of the invocation.
    pub line: u32,
}

/// Syntactic scope enclosing a call: the innermost named function, or the
/// whole file for top-level positions. Filled in by the extractor, since
/// the location API carries no function information.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EnclosingScope {
    pub function: Option<String>,
    pub start_line: u32,
    pub end_line: u32,
}

/// Maps raw `#[track_caller]` data to a [`CallSite`].
pub trait CallSiteLocator: Send + Sync {
    fn locate(&self, loc: &'static Location<'static>) -> Result<CallSite, IceError>;
}

/// Production locator. Paths reported by `Location` are relative to the
/// build workspace; when such a path does not exist from the current
/// directory, retry against the crate manifest dir before giving up.
pub struct TrackCallerLocator {
    manifest_dir: PathBuf,
}

impl TrackCallerLocator {
    pub fn new() -> Self {
        Self {
            manifest_dir: PathBuf::from(env!("CARGO_MANIFEST_DIR")),
        }
    }
}

impl Default for TrackCallerLocator {
    fn default() -> Self {
        Self::new()
    }
}

impl CallSiteLocator for TrackCallerLocator {
    fn locate(&self, loc: &'static Location<'static>) -> Result<CallSite, IceError> {
        if loc.file().is_empty() || loc.line() == 0 {
            return Err(IceError::UnsupportedCallSite);
        }
        let reported = Path::new(loc.file());
        let file = if reported.is_absolute() || reported.exists() {
            reported.to_path_buf()
        } else {
            let joined = self.manifest_dir.join(reported);
            if joined.exists() {
                joined
            } else {
                reported.to_path_buf()
            }
        };
        Ok(CallSite {
            file,
            line: loc.line(),
        })
    }
}
