//! Assembling the final output line from aliases, values, and context.
//!
//! Layout rules:
//! - header = prefix, then `file:line <fn>:` when context display is on
//!   (function segment dropped when unknown, the whole segment and its
//!   colon dropped when context is off).
//! - entries joined with `", "` on one line while the ANSI-stripped width
//!   fits `max_width`; otherwise the header stands alone and every entry
//!   moves to its own line behind `indent`.
//! - an alias identical to its rendered value is dropped (showing
//!   `x = x` twice would be noise).

use std::fmt;

use crate::core::extract::Alias;
use crate::core::locate::{CallSite, EnclosingScope};
use crate::infra::color::{highlight, visible_width};
use crate::infra::config::Config;
use crate::render::ValueRenderer;

/// Everything known about one invocation by the time we print it.
pub struct Invocation<'a> {
    pub site: Option<&'a CallSite>,
    pub scope: Option<&'a EnclosingScope>,
    /// One alias slot per value; an empty slice means "no aliases at all"
    /// (parse failure or count-mismatch fallback).
    pub aliases: &'a [Alias],
    pub values: &'a [&'a dyn fmt::Debug],
}

/// Render a complete output line (or wrapped block) for `inv`.
pub fn format_line(cfg: &Config, renderer: &dyn ValueRenderer, inv: &Invocation) -> String {
    let head = header(cfg, inv.site, inv.scope);

    if inv.values.is_empty() {
        return head.trim_end().to_string();
    }

    let rendered: Vec<String> = inv.values.iter().map(|v| renderer.render(*v)).collect();
    let entries: Vec<String> = rendered
        .iter()
        .enumerate()
        .map(|(i, r)| entry_text(cfg, inv.aliases.get(i), r))
        .collect();

    let single = format!("{head}{}", entries.join(", "));
    if visible_width(&single) <= cfg.max_width() {
        return single;
    }

    // Wrapped layout: header alone, one entry per line.
    let mut out = head.trim_end().to_string();
    for (i, value) in inv.values.iter().enumerate() {
        let mut entry = entries[i].clone();
        let budget = cfg.max_width().saturating_sub(visible_width(cfg.indent()));
        if visible_width(&entry) > budget {
            let wrapped = renderer.render_wrapped(*value, cfg.max_width(), cfg.indent());
            entry = entry_text(cfg, inv.aliases.get(i), &wrapped);
        }
        out.push('\n');
        out.push_str(cfg.indent());
        out.push_str(&entry);
    }
    out
}

/// Zero-argument form: header plus whatever the traceback provider gave.
pub fn format_trace(
    cfg: &Config,
    site: Option<&CallSite>,
    scope: Option<&EnclosingScope>,
    traceback: Option<&str>,
) -> String {
    let head = header(cfg, site, scope).trim_end().to_string();
    match traceback {
        Some(tb) if !tb.is_empty() => format!("{head}\n{}", tb.trim_end()),
        _ => head,
    }
}

fn header(cfg: &Config, site: Option<&CallSite>, scope: Option<&EnclosingScope>) -> String {
    let mut head = cfg.prefix().to_string();
    if cfg.include_context() {
        if let Some(site) = site {
            head.push_str(&format!("{}:{}", site.file.display(), site.line));
            if let Some(name) = scope.and_then(|s| s.function.as_deref()) {
                head.push_str(&format!(" <{name}>"));
            }
            head.push_str(": ");
        }
    }
    head
}

fn entry_text(cfg: &Config, alias: Option<&Alias>, rendered: &str) -> String {
    let display = if cfg.color() {
        highlight(rendered)
    } else {
        rendered.to_string()
    };
    match alias.and_then(|a| a.as_deref()) {
        // An alias spelled exactly like the value adds nothing.
        Some(a) if a != rendered => format!("{a} = {display}"),
        _ => display,
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::render::DebugRenderer;

    fn plain_cfg() -> Config {
        let mut cfg = Config::with_env_lookup(|_| None);
        cfg.set_color(false);
        cfg
    }

    fn site(line: u32) -> CallSite {
        CallSite {
            file: PathBuf::from("src/demo.rs"),
            line,
        }
    }

    fn scope(name: &str) -> EnclosingScope {
        EnclosingScope {
            function: Some(name.to_string()),
            start_line: 1,
            end_line: 10,
        }
    }

    #[test]
    fn alias_value_pair_with_context() {
        let cfg = plain_cfg();
        let s = site(5);
        let sc = scope("foo");
        let aliases: Vec<Alias> = vec![Some("x.abs()".into())];
        let v = 42;
        let out = format_line(
            &cfg,
            &DebugRenderer,
            &Invocation {
                site: Some(&s),
                scope: Some(&sc),
                aliases: &aliases,
                values: &[&v],
            },
        );
        assert_eq!(out, "ic| src/demo.rs:5 <foo>: x.abs() = 42");
    }

    #[test]
    fn multiple_entries_comma_joined() {
        let cfg = plain_cfg();
        let s = site(3);
        let aliases: Vec<Alias> = vec![Some("x".into()), Some("y".into()), Some("z".into())];
        let (x, y, z) = (1, 2, 3);
        let out = format_line(
            &cfg,
            &DebugRenderer,
            &Invocation {
                site: Some(&s),
                scope: None,
                aliases: &aliases,
                values: &[&x, &y, &z],
            },
        );
        assert_eq!(out, "ic| src/demo.rs:3: x = 1, y = 2, z = 3");
    }

    #[test]
    fn context_disabled_drops_location_and_colon() {
        let mut cfg = plain_cfg();
        cfg.set_include_context(false);
        let s = site(3);
        let aliases: Vec<Alias> = vec![Some("x".into())];
        let v = 1;
        let out = format_line(
            &cfg,
            &DebugRenderer,
            &Invocation {
                site: Some(&s),
                scope: None,
                aliases: &aliases,
                values: &[&v],
            },
        );
        assert_eq!(out, "ic| x = 1");
    }

    #[test]
    fn missing_alias_shows_bare_value() {
        let cfg = plain_cfg();
        let aliases: Vec<Alias> = vec![None];
        let v = "hello";
        let out = format_line(
            &cfg,
            &DebugRenderer,
            &Invocation {
                site: None,
                scope: None,
                aliases: &aliases,
                values: &[&v],
            },
        );
        assert_eq!(out, "ic| \"hello\"");
    }

    #[test]
    fn alias_equal_to_rendering_is_dropped() {
        let cfg = plain_cfg();
        let aliases: Vec<Alias> = vec![Some("42".into())];
        let v = 42;
        let out = format_line(
            &cfg,
            &DebugRenderer,
            &Invocation {
                site: None,
                scope: None,
                aliases: &aliases,
                values: &[&v],
            },
        );
        assert_eq!(out, "ic| 42");
    }

    #[test]
    fn overflow_switches_to_one_entry_per_line() {
        let mut cfg = plain_cfg();
        cfg.set_max_width(20).unwrap();
        cfg.set_indent("  ");
        cfg.set_include_context(false);
        let aliases: Vec<Alias> = vec![Some("alpha".into()), Some("beta".into())];
        let (a, b) = ("long string one", "long string two");
        let out = format_line(
            &cfg,
            &DebugRenderer,
            &Invocation {
                site: None,
                scope: None,
                aliases: &aliases,
                values: &[&a, &b],
            },
        );
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "ic|");
        assert!(lines[1].starts_with("  alpha = "));
        assert!(lines[2].starts_with("  beta = "));
    }

    #[test]
    fn oversized_composite_wraps_nested_entries() {
        let mut cfg = plain_cfg();
        cfg.set_max_width(10).unwrap();
        cfg.set_indent("");
        cfg.set_include_context(false);
        cfg.set_prefix("");
        let aliases: Vec<Alias> = vec![Some("v".into())];
        let v = vec![100, 200, 300];
        let out = format_line(
            &cfg,
            &DebugRenderer,
            &Invocation {
                site: None,
                scope: None,
                aliases: &aliases,
                values: &[&v],
            },
        );
        let lines: Vec<&str> = out.lines().collect();
        // Header (empty prefix) then the wrapped entry, one nested element
        // per line.
        assert_eq!(lines[0], "");
        assert_eq!(lines[1], "v = [");
        assert!(lines.contains(&"    100,"));
        assert!(lines.contains(&"]"));
    }

    #[test]
    fn within_limit_stays_single_line() {
        let mut cfg = plain_cfg();
        cfg.set_max_width(80).unwrap();
        let aliases: Vec<Alias> = vec![Some("x".into())];
        let v = 7;
        let out = format_line(
            &cfg,
            &DebugRenderer,
            &Invocation {
                site: None,
                scope: None,
                aliases: &aliases,
                values: &[&v],
            },
        );
        assert!(!out.contains('\n'));
    }

    #[test]
    fn zero_arguments_header_plus_trace() {
        let cfg = plain_cfg();
        let s = site(9);
        let out = format_trace(&cfg, Some(&s), None, Some("frame one\nframe two"));
        assert_eq!(out, "ic| src/demo.rs:9:\nframe one\nframe two");

        let out = format_trace(&cfg, Some(&s), None, None);
        assert_eq!(out, "ic| src/demo.rs:9:");
    }

    #[test]
    fn colored_output_still_fits_width_math() {
        let mut cfg = plain_cfg();
        cfg.set_color(true);
        cfg.set_max_width(80).unwrap();
        cfg.set_include_context(false);
        let aliases: Vec<Alias> = vec![Some("n".into())];
        let v = 5;
        let out = format_line(
            &cfg,
            &DebugRenderer,
            &Invocation {
                site: None,
                scope: None,
                aliases: &aliases,
                values: &[&v],
            },
        );
        // Escape codes present but the line did not wrap.
        assert!(out.contains('\u{1b}'));
        assert!(!out.contains('\n'));
    }
}
