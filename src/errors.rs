//! Error types for the introspection pipeline.
//!
//! Only `UnsupportedCallSite` and configuration errors are hard failures;
//! everything else degrades to value-only output at the call site.

use std::path::PathBuf;

use thiserror::Error;

/// Failures inside the call-site introspection pipeline.
#[derive(Debug, Error)]
pub enum IceError {
    /// The caller's position cannot be resolved to any textual source.
    /// Surfaced loudly: the entry point panics, since silently dropping
    /// output would hide a real usage error during development.
    #[error("call site cannot be resolved to source text")]
    UnsupportedCallSite,

    /// The source around the call site failed to parse, or no matching
    /// invocation was found on the reported line.
    #[error("failed to extract argument expressions at {}:{line}: {message}", file.display())]
    Parse {
        file: PathBuf,
        line: u32,
        message: String,
    },

    /// The source file could not be read (deployed binary, moved tree).
    /// Equivalent to a permanent parse failure for that site.
    #[error("could not read source {}: {source}", file.display())]
    Io {
        file: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Extracted alias count does not match the runtime argument count.
    /// Recovered by dropping aliases for that invocation.
    #[error("extracted {aliases} aliases for {values} runtime values")]
    AliasCountMismatch { aliases: usize, values: usize },
}

/// Invalid configuration values. Always a hard, immediate failure at the
/// point of assignment.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("max_width must be greater than zero")]
    ZeroWidth,
}
