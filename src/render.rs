//! Value rendering seam.
//!
//! The pipeline never inspects values structurally itself; it hands them
//! to a [`ValueRenderer`] and works with the returned strings. The default
//! renderer delegates to the `Debug` machinery, which already performs
//! recursive rendering of composite values.

use std::fmt;

pub trait ValueRenderer: Send + Sync {
    /// Single-line rendering of one value.
    fn render(&self, value: &dyn fmt::Debug) -> String;

    /// Width-aware rendering used when the single-line form would overflow:
    /// nested entries each on their own line, continuation lines prefixed
    /// with `indent`.
    fn render_wrapped(&self, value: &dyn fmt::Debug, max_width: usize, indent: &str) -> String;
}

/// `{:?}` / `{:#?}`-backed renderer.
pub struct DebugRenderer;

impl ValueRenderer for DebugRenderer {
    fn render(&self, value: &dyn fmt::Debug) -> String {
        format!("{value:?}")
    }

    fn render_wrapped(&self, value: &dyn fmt::Debug, _max_width: usize, indent: &str) -> String {
        let pretty = format!("{value:#?}");
        if indent.is_empty() {
            return pretty;
        }
        let mut out = String::with_capacity(pretty.len());
        for (i, line) in pretty.lines().enumerate() {
            if i > 0 {
                out.push('\n');
                out.push_str(indent);
            }
            out.push_str(line);
        }
        out
    }
}
