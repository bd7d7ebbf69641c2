//! **icecream** - Print-debugging with call-site introspection.
//!
//! `ic!(x)` prints `x = 42` instead of a bare `42`, plus file/line and
//! enclosing-function context. The argument expression text is recovered at
//! runtime: the pipeline reads the caller's own source file, parses it with
//! tree-sitter, and splits the invocation's argument list — cached per call
//! site so the parse happens once.

/// Core pipeline - call-site resolution, alias extraction, formatting
pub mod core {
    /// Per-process alias cache keyed by call-site identity
    pub mod cache;
    /// Tree-sitter argument-expression extraction (the expensive part)
    pub mod extract;
    /// Output-line assembly with width wrapping
    pub mod format;
    /// `#[track_caller]`-backed call-site resolution
    pub mod locate;
}

/// Infrastructure - configuration, source reading, presentation
pub mod infra {
    /// Cosmetic token highlighting and ANSI-aware width math
    pub mod color;
    /// Validated runtime configuration with env kill switches
    pub mod config;
    /// Cached source-file reading with LF/CRLF-robust line slicing
    pub mod source;
}

/// Variadic argument plumbing for the macro
pub mod args;
/// Error types
pub mod errors;
/// The pipeline struct and the process-global instance
pub mod ice;
/// Value rendering seam (Debug-backed by default)
pub mod render;

mod macros;

// Strategic re-exports for the public surface
pub use crate::core::extract::ENTRY_NAME;
pub use errors::{ConfigError, IceError};
pub use ice::{Ice, OutputFn, TracebackFn, global};
pub use infra::config::Config;
pub use render::{DebugRenderer, ValueRenderer};
