//! XML attribute formatting.

use std::borrow::Cow;

/// Lines longer than this are wrapped, one attribute per line.
pub const WRAP_COLUMN: usize = 79;

/// Escape `text` for use in XML character data or attribute values.
///
/// `& < > ' "` become entity references. C0 and C1 control characters other
/// than tab, newline, carriage return and NEL become `&#xNN;`.
pub fn escape_text(text: &str) -> Cow<'_, str> {
    if !text.chars().any(needs_escape) {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\'' => out.push_str("&apos;"),
            '"' => out.push_str("&quot;"),
            c if is_restricted_control(c) => out.push_str(&format!("&#x{:x};", c as u32)),
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}

fn needs_escape(c: char) -> bool {
    matches!(c, '&' | '<' | '>' | '\'' | '"') || is_restricted_control(c)
}

fn is_restricted_control(c: char) -> bool {
    matches!(c as u32, 0x1..=0x8 | 0xb..=0xc | 0xe..=0x1f | 0x7f..=0x84 | 0x86..=0x9f)
}

fn measure(attrs: &[(&str, Option<&str>)]) -> usize {
    attrs
        .iter()
        .filter_map(|(name, value)| value.map(|v| 2 + name.len() + escape_text(v).len() + 2))
        .sum()
}

/// Render `attrs` as the attribute part of a `<tag ...>` element.
///
/// Pairs without a value are left out. When `indent` is given and the
/// measured line would be longer than [`WRAP_COLUMN`], every attribute after
/// the first goes on its own line, aligned under the first one.
pub fn collect_attributes(
    tag: &str,
    attrs: &[(&str, Option<&str>)],
    self_indent: usize,
    indent: Option<usize>,
) -> String {
    if attrs.is_empty() {
        return String::new();
    }

    let wrap_indent = match indent {
        Some(indent) if measure(attrs) + indent + self_indent > WRAP_COLUMN => {
            self_indent + tag.len() + 1
        }
        _ => 0,
    };

    let mut out = String::new();
    let mut first = true;
    for (name, value) in attrs {
        let Some(value) = value else {
            continue;
        };
        if wrap_indent > 0 && !first {
            out.push('\n');
            out.push_str(&" ".repeat(wrap_indent));
        }
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        out.push_str(&escape_text(value));
        out.push('"');
        first = false;
    }
    out
}
