//! The pipeline behind the entry point: locate the call site, resolve
//! aliases through the caches, format, and hand the line to the sink.
//!
//! One process-global [`Ice`] instance backs the `ic!` macro; tests build
//! their own instances with injected locators and sinks.

use std::fmt;
use std::panic::Location;
use std::sync::{Arc, LazyLock, Mutex};
use std::time::Duration;

use crate::core::cache::{AliasCache, CachedAliases, SiteKey};
use crate::core::extract::{self, Alias};
use crate::core::format::{Invocation, format_line, format_trace};
use crate::core::locate::{CallSite, CallSiteLocator, EnclosingScope, TrackCallerLocator};
use crate::errors::IceError;
use crate::infra::config::Config;
use crate::infra::source::SourceReader;
use crate::render::{DebugRenderer, ValueRenderer};

pub type OutputFn = Arc<dyn Fn(&str) + Send + Sync>;
pub type TracebackFn = Arc<dyn Fn() -> String + Send + Sync>;

static GLOBAL: LazyLock<Ice> = LazyLock::new(Ice::new);

/// Process-global instance used by the `ic!` macro.
pub fn global() -> &'static Ice {
    &GLOBAL
}

pub struct Ice {
    config: Mutex<Config>,
    sink: Mutex<OutputFn>,
    traceback: Mutex<Option<TracebackFn>>,
    renderer: Box<dyn ValueRenderer>,
    locator: Box<dyn CallSiteLocator>,
    reader: SourceReader,
    cache: AliasCache,
}

impl Ice {
    pub fn new() -> Self {
        Self::with_parts(
            Box::new(TrackCallerLocator::new()),
            Box::new(DebugRenderer),
            Config::from_env(),
            None,
        )
    }

    /// Full-control constructor: injected locator and renderer, explicit
    /// config, optional source staleness-check interval.
    pub fn with_parts(
        locator: Box<dyn CallSiteLocator>,
        renderer: Box<dyn ValueRenderer>,
        config: Config,
        staleness: Option<Duration>,
    ) -> Self {
        Self {
            config: Mutex::new(config),
            sink: Mutex::new(Arc::new(|line: &str| eprintln!("{line}"))),
            traceback: Mutex::new(Some(Arc::new(|| {
                std::backtrace::Backtrace::force_capture().to_string()
            }) as TracebackFn)),
            renderer,
            locator,
            reader: SourceReader::new(staleness),
            cache: AliasCache::new(),
        }
    }

    /// Mutate configuration under the instance lock.
    pub fn configure<R>(&self, f: impl FnOnce(&mut Config) -> R) -> R {
        let mut cfg = self.config.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut cfg)
    }

    pub fn enable(&self) {
        self.configure(|c| c.enable());
    }

    pub fn disable(&self) {
        self.configure(|c| c.disable());
    }

    /// Replace the output sink (default: unbuffered stderr).
    pub fn set_output(&self, f: impl Fn(&str) + Send + Sync + 'static) {
        *self.sink.lock().unwrap_or_else(|e| e.into_inner()) = Arc::new(f);
    }

    /// Replace or remove the traceback provider used by zero-argument
    /// calls. `None` means the header prints alone.
    pub fn set_traceback(&self, f: Option<TracebackFn>) {
        *self.traceback.lock().unwrap_or_else(|e| e.into_inner()) = f;
    }

    /// Drop cached aliases and source for one file, or for everything
    /// when `file` is `None`.
    pub fn invalidate(&self, file: Option<&std::path::Path>) {
        match file {
            Some(file) => {
                self.reader.invalidate(file);
                self.cache.invalidate_file(file);
            }
            None => {
                self.reader.invalidate_all();
                self.cache.invalidate_all();
            }
        }
    }

    /// Print one invocation. Called by `ic!` with the values borrowed as
    /// `Debug` trait objects; the macro returns the values themselves.
    ///
    /// Panics on [`IceError::UnsupportedCallSite`]: a call whose position
    /// cannot be resolved is a usage error that must be loud.
    pub fn emit(&self, loc: &'static Location<'static>, values: &[&dyn fmt::Debug]) {
        let cfg = self.configure(|c| c.clone());
        if !cfg.enabled() {
            return;
        }
        let (line, note) = self.compose(&cfg, loc, values);
        // Parse failures are visible but non-fatal, reported once per
        // site since the failure itself is now cached.
        if let Some(msg) = note {
            self.write(&msg);
        }
        self.write(&line);
    }

    /// Format one invocation without printing it. Nothing reaches the
    /// sink on this path, parse-failure side messages included.
    pub fn format_invocation(
        &self,
        loc: &'static Location<'static>,
        values: &[&dyn fmt::Debug],
    ) -> String {
        let cfg = self.configure(|c| c.clone());
        let (line, _) = self.compose(&cfg, loc, values);
        line
    }

    /// Zero-argument form: header plus a stack trace from the provider.
    pub fn emit_trace(&self, loc: &'static Location<'static>) {
        let cfg = self.configure(|c| c.clone());
        if !cfg.enabled() {
            return;
        }
        let site = self.locate_or_panic(loc);
        let (_, scope, note) = self.resolve_site(&cfg, &site, None);
        if let Some(msg) = note {
            self.write(&msg);
        }
        let provider = self
            .traceback
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        let tb = provider.map(|f| f());
        let line = format_trace(&cfg, Some(&site), scope.as_ref(), tb.as_deref());
        self.write(&line);
    }

    fn write(&self, line: &str) {
        let sink = self.sink.lock().unwrap_or_else(|e| e.into_inner()).clone();
        sink(line);
    }

    fn locate_or_panic(&self, loc: &'static Location<'static>) -> CallSite {
        match self.locator.locate(loc) {
            Ok(site) => site,
            Err(err) => panic!("ic: {err}"),
        }
    }

    fn compose(
        &self,
        cfg: &Config,
        loc: &'static Location<'static>,
        values: &[&dyn fmt::Debug],
    ) -> (String, Option<String>) {
        let site = self.locate_or_panic(loc);
        let (aliases, scope, note) = self.resolve_site(cfg, &site, Some(values.len()));
        let inv = Invocation {
            site: Some(&site),
            scope: scope.as_ref(),
            aliases: &aliases,
            values,
        };
        (format_line(cfg, self.renderer.as_ref(), &inv), note)
    }

    /// Aliases and enclosing scope for this invocation, via the caches,
    /// plus the first-visit parse-failure side message for printing
    /// callers to forward. `value_count` of `None` skips the count check
    /// (zero-argument form).
    fn resolve_site(
        &self,
        cfg: &Config,
        site: &CallSite,
        value_count: Option<usize>,
    ) -> (Vec<Alias>, Option<EnclosingScope>, Option<String>) {
        if self.reader.evict_if_stale(&site.file) {
            self.cache.invalidate_file(&site.file);
        }

        let key = SiteKey {
            file: site.file.clone(),
            line: site.line,
        };
        let occurrence = self.cache.next_occurrence(&key);

        let mut note = None;
        let entry = match self.cache.get(&key) {
            Some(hit) => hit,
            None => {
                let (fresh, msg) = self.extract_site(cfg, site);
                note = msg;
                self.cache.insert(key, fresh)
            }
        };

        let (aliases, scope) = match &*entry {
            CachedAliases::Calls { calls, scope } => {
                let call = &calls[occurrence % calls.len()];
                match value_count {
                    Some(n) if call.arg_count() != n => {
                        let mismatch = IceError::AliasCountMismatch {
                            aliases: call.arg_count(),
                            values: n,
                        };
                        tracing::warn!(
                            file = %site.file.display(),
                            line = site.line,
                            err = %mismatch,
                            "dropping aliases for this invocation"
                        );
                        (Vec::new(), Some(scope.clone()))
                    }
                    _ => (call.aliases.to_vec(), Some(scope.clone())),
                }
            }
            CachedAliases::Unavailable => (Vec::new(), None),
        };
        (aliases, scope, note)
    }

    /// First visit to a call site: read and parse its source.
    /// Returns the cache entry plus an optional side message for the sink.
    fn extract_site(&self, cfg: &Config, site: &CallSite) -> (CachedAliases, Option<String>) {
        let source = match self.reader.read(&site.file) {
            Ok(s) => s,
            Err(err) => {
                // Deployed binaries legitimately run without their source
                // tree; degrade without spamming the sink.
                tracing::debug!(err = %err, "source unavailable, aliases disabled for site");
                return (CachedAliases::Unavailable, None);
            }
        };
        match extract::extract(&source.text, site.line) {
            Ok(extraction) => (
                CachedAliases::Calls {
                    calls: extraction.calls,
                    scope: extraction.scope,
                },
                None,
            ),
            Err(err) => {
                // Quote the offending line so the message is actionable.
                let snippet = source
                    .lines_text(site.line as usize, site.line as usize)
                    .map(str::trim)
                    .filter(|s| !s.is_empty());
                let message = match snippet {
                    Some(s) => format!("{err} in `{s}`"),
                    None => err.to_string(),
                };
                let shown = IceError::Parse {
                    file: site.file.clone(),
                    line: site.line,
                    message,
                };
                (
                    CachedAliases::Unavailable,
                    Some(format!("{}{shown}", cfg.prefix())),
                )
            }
        }
    }
}

impl Default for Ice {
    fn default() -> Self {
        Self::new()
    }
}
