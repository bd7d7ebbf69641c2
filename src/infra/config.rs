//! Runtime configuration for the entry point.
//!
//! An explicit struct with validated setters: fields that must always hold
//! a value are plain types (they cannot be unset at all), and value checks
//! fail hard at the point of assignment. Environment kill switches are read
//! once at construction.

use crate::errors::ConfigError;

/// Disables color when set to anything but `0`/`false`/empty.
pub const ENV_NO_COLOR: &str = "NO_COLOR";
/// Permanently disables all output for the process; later `enable()` calls
/// cannot override it.
pub const ENV_DISABLE: &str = "ICECREAM_DISABLE";

pub const DEFAULT_PREFIX: &str = "ic| ";
pub const DEFAULT_MAX_WIDTH: usize = 80;
pub const DEFAULT_INDENT: &str = "    ";

#[derive(Debug, Clone)]
pub struct Config {
    enabled: bool,
    /// Set from [`ENV_DISABLE`]; wins over `enabled` forever.
    killed: bool,
    color: bool,
    include_context: bool,
    prefix: String,
    max_width: usize,
    indent: String,
}

impl Config {
    /// Defaults with environment toggles applied.
    pub fn from_env() -> Self {
        Self::with_env_lookup(|name| std::env::var(name).ok())
    }

    /// Injectable env lookup so tests do not touch the process environment.
    pub fn with_env_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let truthy = |name: &str| {
            lookup(name).is_some_and(|v| !v.is_empty() && v != "0" && !v.eq_ignore_ascii_case("false"))
        };
        Self {
            enabled: true,
            killed: truthy(ENV_DISABLE),
            color: !truthy(ENV_NO_COLOR),
            include_context: true,
            prefix: DEFAULT_PREFIX.to_string(),
            max_width: DEFAULT_MAX_WIDTH,
            indent: DEFAULT_INDENT.to_string(),
        }
    }

    /// Whether the entry point should produce any output at all.
    pub fn enabled(&self) -> bool {
        self.enabled && !self.killed
    }

    pub fn enable(&mut self) {
        self.enabled = true;
    }

    pub fn disable(&mut self) {
        self.enabled = false;
    }

    pub fn color(&self) -> bool {
        self.color
    }

    pub fn set_color(&mut self, on: bool) {
        self.color = on;
    }

    pub fn include_context(&self) -> bool {
        self.include_context
    }

    pub fn set_include_context(&mut self, on: bool) {
        self.include_context = on;
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Empty is allowed (no prefix).
    pub fn set_prefix(&mut self, prefix: impl Into<String>) {
        self.prefix = prefix.into();
    }

    pub fn max_width(&self) -> usize {
        self.max_width
    }

    pub fn set_max_width(&mut self, width: usize) -> Result<(), ConfigError> {
        if width == 0 {
            return Err(ConfigError::ZeroWidth);
        }
        self.max_width = width;
        Ok(())
    }

    pub fn indent(&self) -> &str {
        &self.indent
    }

    /// Empty is allowed (flush-left wrapped entries).
    pub fn set_indent(&mut self, indent: impl Into<String>) {
        self.indent = indent.into();
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
