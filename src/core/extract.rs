//! Locating the entry-point invocation on a source line and splitting its
//! argument list into one textual alias per positional argument.
//!
//! The caller's source is parsed with tree-sitter. Two invocation shapes
//! are recognized on the target line:
//!
//! - `macro_invocation` — the normal `ic!(...)` form. Macro bodies are raw
//!   token trees, so the argument list is split at top-level commas.
//! - `call_expression` — covers wrappers that forward to the entry point
//!   as a plain function.
//!
//! Invocations whose callee's simple name (ignoring any path or receiver
//! qualifier) matches the entry binding take precedence over anything else
//! on the same line; when none match, every other invocation on the line
//! is kept as a fallback so re-bound entry names still get aliases.

use anyhow::{Context, Result, anyhow};
use smallvec::SmallVec;
use tree_sitter::{Node, Parser};

use crate::core::locate::EnclosingScope;

/// The conventional entry-point binding name searched for in source.
pub const ENTRY_NAME: &str = "ic";

/// Alias for one positional argument. `None` marks expressions whose text
/// adds nothing over the value itself: bare literals, closures, and
/// anonymous composite constructors.
pub type Alias = Option<String>;

/// One invocation found on the target line, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCall {
    pub aliases: SmallVec<[Alias; 4]>,
    /// Whether the callee's simple name matched [`ENTRY_NAME`].
    pub named_entry: bool,
}

impl ParsedCall {
    pub fn arg_count(&self) -> usize {
        self.aliases.len()
    }
}

/// Result of a successful extraction at one call site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    /// Matched invocations in document order; never empty.
    pub calls: Vec<ParsedCall>,
    pub scope: EnclosingScope,
}

/// Extract every candidate invocation starting on `target_line` (1-based).
///
/// Errors when the source fails to parse or no invocation is found on the
/// line; callers degrade to value-only output on error.
pub fn extract(source: &str, target_line: u32) -> Result<Extraction> {
    let tree = parse_rust(source)?;
    let root = tree.root_node();
    let row = target_line as usize - 1;

    let mut candidates = Vec::new();
    collect_candidates(root, row, source, &mut candidates);
    candidates.sort_by_key(|c| c.start_byte);

    let any_named = candidates.iter().any(|c| c.call.named_entry);
    let calls: Vec<ParsedCall> = candidates
        .into_iter()
        .filter(|c| !any_named || c.call.named_entry)
        .map(|c| c.call)
        .collect();

    if calls.is_empty() {
        if root.has_error() {
            return Err(anyhow!("syntax error in enclosing source"));
        }
        return Err(anyhow!("no invocation found on line {target_line}"));
    }

    let scope = enclosing_scope(root, row, source, target_line);
    Ok(Extraction { calls, scope })
}

fn parse_rust(source: &str) -> Result<tree_sitter::Tree> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_rust::LANGUAGE.into())
        .context("load Rust grammar")?;
    parser
        .parse(source, None)
        .ok_or_else(|| anyhow!("parser returned no tree"))
}

struct Candidate {
    start_byte: usize,
    call: ParsedCall,
}

fn collect_candidates(node: Node, row: usize, source: &str, out: &mut Vec<Candidate>) {
    if node.start_position().row == row {
        match node.kind() {
            "macro_invocation" => {
                if let Some(call) = macro_candidate(node, source) {
                    out.push(Candidate {
                        start_byte: node.start_byte(),
                        call,
                    });
                }
            }
            "call_expression" => {
                if let Some(call) = call_expr_candidate(node, source) {
                    out.push(Candidate {
                        start_byte: node.start_byte(),
                        call,
                    });
                }
            }
            _ => {}
        }
    }
    // Nested invocations (`foo(ic!(x))`) start on the same row as their
    // wrapper, so descend unconditionally.
    for i in 0..node.named_child_count() {
        let Some(child) = node.named_child(i) else {
            continue;
        };
        if child.start_position().row <= row && child.end_position().row >= row {
            collect_candidates(child, row, source, out);
        }
    }
}

fn macro_candidate(node: Node, source: &str) -> Option<ParsedCall> {
    let name_node = node.child_by_field_name("macro")?;
    let name = simple_name(name_node, source)?;
    let tt = (0..node.child_count())
        .filter_map(|i| node.child(i))
        .find(|c| c.kind() == "token_tree")?;
    Some(ParsedCall {
        aliases: split_token_tree(tt, source),
        named_entry: name == ENTRY_NAME,
    })
}

fn call_expr_candidate(node: Node, source: &str) -> Option<ParsedCall> {
    let callee = node.child_by_field_name("function")?;
    let name = simple_name(callee, source)?;
    let args = node.child_by_field_name("arguments")?;
    Some(ParsedCall {
        aliases: argument_aliases(args, source),
        named_entry: name == ENTRY_NAME,
    })
}

/// One alias per argument node of an `arguments` list, in order.
fn argument_aliases(args: Node, source: &str) -> SmallVec<[Alias; 4]> {
    let mut aliases = SmallVec::new();
    for i in 0..args.named_child_count() {
        let Some(arg) = args.named_child(i) else {
            continue;
        };
        if arg.kind() == "line_comment" || arg.kind() == "block_comment" {
            continue;
        }
        let Ok(raw) = arg.utf8_text(source.as_bytes()) else {
            continue;
        };
        let text = normalize_ws(raw);
        aliases.push(if no_alias_node(arg) { None } else { Some(text) });
    }
    aliases
}

/// Simple callee name with any path or receiver qualifier stripped:
/// `ic`, `debug::ic`, `self.ic` all yield `ic`.
fn simple_name(node: Node, source: &str) -> Option<String> {
    let bytes = source.as_bytes();
    match node.kind() {
        "identifier" => node.utf8_text(bytes).ok().map(String::from),
        "scoped_identifier" => {
            let name = node.child_by_field_name("name")?;
            name.utf8_text(bytes).ok().map(String::from)
        }
        "field_expression" => {
            let field = node.child_by_field_name("field")?;
            field.utf8_text(bytes).ok().map(String::from)
        }
        "generic_function" => {
            let inner = node.child_by_field_name("function")?;
            simple_name(inner, source)
        }
        _ => {
            // Last path segment of whatever text is there.
            let text = node.utf8_text(bytes).ok()?;
            Some(text.rsplit("::").next().unwrap_or(text).to_string())
        }
    }
}

/// Split a macro token tree into one alias per argument.
///
/// Token trees only group `()`/`[]`/`{}`, so commas inside turbofish
/// generics (`parse::<i32, _>(s)`) or closure parameter lists
/// (`|a, b| a + b`) sit at depth zero and must not act as separators.
/// The contents are therefore re-parsed as a real call argument list;
/// raw comma splitting remains as the fallback for token streams that
/// are not valid expression lists.
fn split_token_tree(tt: Node, source: &str) -> SmallVec<[Alias; 4]> {
    let inner = interior_text(tt, source);
    if inner.trim().is_empty() {
        return SmallVec::new();
    }
    if let Some(aliases) = parse_argument_list(inner) {
        return aliases;
    }
    split_at_commas(tt, source)
}

/// Text between a token tree's delimiters.
fn interior_text<'s>(tt: Node, source: &'s str) -> &'s str {
    let count = tt.child_count();
    let (Some(open), Some(close)) = (tt.child(0), tt.child(count.saturating_sub(1))) else {
        return "";
    };
    source.get(open.end_byte()..close.start_byte()).unwrap_or("")
}

/// Re-parse token-tree contents as the argument list of a probe call,
/// yielding properly typed argument nodes.
fn parse_argument_list(inner: &str) -> Option<SmallVec<[Alias; 4]>> {
    let wrapped = format!("fn __probe() {{ __f({inner}); }}");
    let tree = parse_rust(&wrapped).ok()?;
    if tree.root_node().has_error() {
        return None;
    }
    let call = find_probe_call(tree.root_node(), &wrapped)?;
    let args = call.child_by_field_name("arguments")?;
    Some(argument_aliases(args, &wrapped))
}

fn find_probe_call<'t>(node: Node<'t>, source: &str) -> Option<Node<'t>> {
    if node.kind() == "call_expression" {
        let callee = node.child_by_field_name("function");
        if callee.and_then(|f| f.utf8_text(source.as_bytes()).ok()) == Some("__f") {
            return Some(node);
        }
    }
    for i in 0..node.named_child_count() {
        if let Some(found) = node.named_child(i).and_then(|c| find_probe_call(c, source)) {
            return Some(found);
        }
    }
    None
}

/// Depth-zero comma splitting, for token streams the grammar rejects as
/// an expression list. Nested bracket groups appear as single
/// `token_tree` children, so only their outer commas are direct children.
fn split_at_commas(tt: Node, source: &str) -> SmallVec<[Alias; 4]> {
    let mut aliases = SmallVec::new();
    let count = tt.child_count();
    let mut seg: Option<(usize, usize)> = None;

    let flush = |seg: &mut Option<(usize, usize)>, aliases: &mut SmallVec<[Alias; 4]>| {
        if let Some((s, e)) = seg.take() {
            if let Some(raw) = source.get(s..e) {
                aliases.push(classify(raw));
            }
        }
    };

    for i in 0..count {
        let Some(child) = tt.child(i) else { continue };
        // First and last children are the surrounding delimiters.
        if i == 0 || i + 1 == count {
            continue;
        }
        if child.kind() == "," {
            flush(&mut seg, &mut aliases);
            continue;
        }
        match &mut seg {
            Some((_, e)) => *e = child.end_byte(),
            None => seg = Some((child.start_byte(), child.end_byte())),
        }
    }
    flush(&mut seg, &mut aliases);
    aliases
}

/// Classify one argument's source text: `None` for expressions shown by
/// value alone, `Some(text)` otherwise.
///
/// Token-tree segments are untyped, so the snippet is re-parsed as an
/// expression to learn its kind. A snippet that fails to parse keeps its
/// text verbatim rather than losing the alias.
fn classify(raw: &str) -> Alias {
    let text = normalize_ws(raw);
    if text.is_empty() {
        return None;
    }
    let wrapped = format!("fn __probe() {{ let _ = ({text}); }}");
    let Ok(tree) = parse_rust(&wrapped) else {
        return Some(text);
    };
    let Some(expr) = find_parenthesized(tree.root_node()).and_then(|p| p.named_child(0)) else {
        return Some(text);
    };
    if no_alias_node(expr) {
        None
    } else {
        Some(text)
    }
}

fn find_parenthesized(node: Node) -> Option<Node> {
    if node.kind() == "parenthesized_expression" {
        return Some(node);
    }
    for i in 0..node.named_child_count() {
        if let Some(found) = node.named_child(i).and_then(find_parenthesized) {
            return Some(found);
        }
    }
    None
}

/// Expression kinds whose source text is redundant next to their value.
fn no_alias_node(node: Node) -> bool {
    let kind = node.kind();
    if kind.ends_with("_literal") {
        return true;
    }
    if matches!(
        kind,
        "closure_expression"
            | "array_expression"
            | "tuple_expression"
            | "struct_expression"
            | "unit_expression"
    ) {
        return true;
    }
    // Negated literals (`-1`) parse as a unary expression over a literal.
    if kind == "unary_expression" && node.named_child_count() == 1 {
        if let Some(inner) = node.named_child(0) {
            return inner.kind().ends_with("_literal");
        }
    }
    false
}

/// Collapse a multi-line expression into one display line.
fn normalize_ws(text: &str) -> String {
    if text.contains('\n') {
        text.lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    } else {
        text.trim().to_string()
    }
}

/// Innermost named function containing `row`, or a line-scoped unit for
/// top-level positions.
fn enclosing_scope(root: Node, row: usize, source: &str, target_line: u32) -> EnclosingScope {
    let bytes = source.as_bytes();
    let mut best: Option<Node> = None;
    let mut stack = vec![root];
    while let Some(n) = stack.pop() {
        if n.start_position().row > row || n.end_position().row < row {
            continue;
        }
        if n.kind() == "function_item" {
            best = Some(n);
        }
        for i in 0..n.named_child_count() {
            if let Some(c) = n.named_child(i) {
                stack.push(c);
            }
        }
    }
    match best {
        Some(f) => EnclosingScope {
            function: f
                .child_by_field_name("name")
                .and_then(|n| n.utf8_text(bytes).ok())
                .map(String::from),
            start_line: f.start_position().row as u32 + 1,
            end_line: f.end_position().row as u32 + 1,
        },
        None => EnclosingScope {
            function: None,
            start_line: target_line,
            end_line: root.end_position().row as u32 + 1,
        },
    }
}
