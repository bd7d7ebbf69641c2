//! Cosmetic presentation pass over rendered value strings.
//!
//! Operates purely on text: already-rendered values get their string,
//! number, boolean, and Option/handle tokens color-tagged. Nothing here
//! affects correctness, and the width math strips escapes back out.

use std::sync::LazyLock;

use owo_colors::OwoColorize;
use regex::Regex;

static ANSI: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1b\[[0-9;]*m").expect("static pattern"));

/// Token categories worth tinting in `Debug` output.
static TOKENS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#""(?:[^"\\]|\\.)*"|\b(?:true|false)\b|\b(?:None|Some)\b|\b0x[0-9a-fA-F]+\b|\b\d+(?:\.\d+)?\b"#,
    )
    .expect("static pattern")
});

/// Character count with ANSI escape sequences excluded.
pub fn visible_width(s: &str) -> usize {
    ANSI.replace_all(s, "").chars().count()
}

/// Color-tag value tokens in an already-rendered string.
pub fn highlight(rendered: &str) -> String {
    TOKENS
        .replace_all(rendered, |caps: &regex::Captures| {
            let tok = &caps[0];
            match tok.bytes().next() {
                Some(b'"') => tok.green().to_string(),
                Some(b't') | Some(b'f') => tok.yellow().to_string(),
                Some(b'N') | Some(b'S') => tok.magenta().to_string(),
                _ if tok.starts_with("0x") => tok.blue().to_string(),
                _ => tok.cyan().to_string(),
            }
        })
        .into_owned()
}
