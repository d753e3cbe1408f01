//! Annotation directives from gtk-doc style comments.
//!
//! A doc comment such as
//!
//! ```text
//! /**
//!  * my_func: (skip)
//!  * @data: (array length=n_items) (transfer none)
//!  * Returns: (nullable)
//!  */
//! ```
//!
//! produces one [`Directive`] per parenthesized group. The session keeps them
//! in a [`DirectiveIndex`] keyed by directive name and by symbol.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

static SYMBOL_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*)\s*:(.*)$").expect("symbol line regex is valid")
});

static PARAM_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^@([A-Za-z_][A-Za-z0-9_]*|\.\.\.)\s*:(.*)$").expect("param line regex is valid")
});

static RETURNS_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:Returns|Return value)\s*:(.*)$").expect("returns line regex is valid")
});

/// One annotation attached to a symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Directive {
    pub(crate) name: String,
    pub(crate) value: String,
    pub(crate) options: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) target: Option<String>,
}

impl Directive {
    pub fn new(
        name: impl Into<String>,
        value: impl Into<String>,
        options: Vec<String>,
        target: Option<String>,
    ) -> Self {
        Directive {
            name: name.into(),
            value: value.into(),
            options,
            target,
        }
    }

    /// Directive keyword, e.g. `skip` or `transfer`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Primary argument; empty when the annotation has none.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Arguments after the first.
    pub fn options(&self) -> &[String] {
        &self.options
    }

    /// Parameter name, `"return"`, or `None` for the symbol itself.
    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }
}

/// Result of parsing one doc comment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocBlock {
    /// Identifier the comment documents, if it names one
    pub symbol: Option<String>,

    /// Annotations in source order
    pub directives: Vec<Directive>,
}

/// Parse the body of a `/** ... */` comment.
pub fn parse_doc_comment(text: &str) -> DocBlock {
    let mut block = DocBlock::default();
    let mut first_content = true;

    for raw in text.lines() {
        let line = strip_decoration(raw);
        if line.is_empty() {
            continue;
        }
        let is_first = first_content;
        first_content = false;

        if let Some(caps) = RETURNS_LINE.captures(line) {
            let rest = caps.get(1).map_or("", |m| m.as_str());
            push_groups(&mut block.directives, rest, Some("return".to_string()));
        } else if let Some(caps) = PARAM_LINE.captures(line) {
            let rest = caps.get(2).map_or("", |m| m.as_str());
            push_groups(&mut block.directives, rest, Some(caps[1].to_string()));
        } else if is_first {
            if let Some(caps) = SYMBOL_LINE.captures(line) {
                block.symbol = Some(caps[1].to_string());
                let rest = caps.get(2).map_or("", |m| m.as_str());
                push_groups(&mut block.directives, rest, None);
            } else if line.starts_with('(') {
                push_groups(&mut block.directives, line, None);
            }
        }
    }

    block
}

fn strip_decoration(line: &str) -> &str {
    let line = line.trim();
    let line = line.strip_prefix('*').unwrap_or(line);
    line.trim()
}

/// Parse the leading `(word args...)` groups of `text`.
fn push_groups(out: &mut Vec<Directive>, text: &str, target: Option<String>) {
    let mut rest = text.trim_start();
    while rest.starts_with('(') {
        let Some(end) = matching_paren(rest) else {
            break;
        };
        if let Some(directive) = parse_group(&rest[1..end], target.clone()) {
            out.push(directive);
        }
        rest = rest[end + 1..].trim_start();
    }
}

fn matching_paren(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in text.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split a group body into words, keeping nested parentheses intact.
fn split_words(body: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;

    for c in body.chars() {
        match c {
            '(' => {
                depth += 1;
                current.push(c);
            }
            ')' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            c if c.is_whitespace() && depth == 0 => {
                if !current.is_empty() {
                    words.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

fn parse_group(body: &str, target: Option<String>) -> Option<Directive> {
    let mut words = split_words(body).into_iter();
    let name = words.next()?;
    let value = words.next().unwrap_or_default();
    Some(Directive {
        name,
        value,
        options: words.collect(),
        target,
    })
}

/// Session-wide directive registry.
#[derive(Debug, Clone, Default)]
pub struct DirectiveIndex {
    by_name: HashMap<String, Vec<Directive>>,
    by_symbol: HashMap<String, Vec<Directive>>,
}

impl DirectiveIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register directives attached to `symbol` (if named).
    pub fn register(&mut self, symbol: Option<&str>, directives: &[Directive]) {
        for directive in directives {
            self.by_name
                .entry(directive.name.clone())
                .or_default()
                .push(directive.clone());
        }
        if let Some(symbol) = symbol {
            self.by_symbol
                .entry(symbol.to_string())
                .or_default()
                .extend_from_slice(directives);
        }
    }

    /// All directives named `name`, in registration order.
    pub fn by_name(&self, name: &str) -> &[Directive] {
        self.by_name.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All directives attached to the symbol `ident`.
    pub fn by_symbol(&self, ident: &str) -> &[Directive] {
        self.by_symbol.get(ident).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Directive names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.by_name.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}
