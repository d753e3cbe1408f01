//! Serializable views of scan results.

use serde::Serialize;

use super::filter::SymbolFilter;
use super::markup::collect_attributes;
use crate::scanner::{Directive, Session, Symbol, TypeArena, TypeId, TypeKind};

/// One symbol, with its type tree expanded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymbolDump {
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// C spelling of the declared type
    pub c_type: String,
    #[serde(rename = "type")]
    pub ty: TypeDump,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub const_int: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub const_string: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bit_width: Option<i64>,
    pub file: String,
    pub line: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub directives: Vec<Directive>,
}

/// One type node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeDump {
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub storage: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub qualifiers: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub function_specifier: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub array_len: Option<i64>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub variadic: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_type: Option<Box<TypeDump>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SymbolDump>,
}

/// Walks type trees. A struct or union that is already being expanded
/// further up is emitted by name only.
struct Dumper<'a> {
    arena: &'a TypeArena,
    expanding: Vec<TypeId>,
}

impl Dumper<'_> {
    fn symbol(&mut self, symbol: &Symbol, name: Option<String>) -> SymbolDump {
        SymbolDump {
            kind: symbol.kind().as_str(),
            name,
            c_type: self.arena.spell(symbol.base_type()),
            ty: self.ty(symbol.base_type()),
            const_int: symbol.const_int(),
            const_string: symbol.const_string().map(str::to_string),
            bit_width: symbol.bit_width(),
            file: symbol.file().display().to_string(),
            line: symbol.line(),
            directives: symbol.directives().to_vec(),
        }
    }

    fn ty(&mut self, id: TypeId) -> TypeDump {
        let arena = self.arena;
        let ty = arena.get(id);
        let mut dump = TypeDump {
            kind: ty.kind().as_str(),
            name: ty.name().map(str::to_string),
            storage: ty.storage_class().spelling(),
            qualifiers: ty.qualifiers().spelling(),
            function_specifier: ty.function_specifier().spelling(),
            array_len: ty.array_len(),
            variadic: ty.is_variadic(),
            base_type: None,
            children: Vec::new(),
        };

        let recursive = matches!(ty.kind(), TypeKind::Struct | TypeKind::Union)
            && self.expanding.contains(&id);
        if recursive {
            return dump;
        }

        self.expanding.push(id);
        dump.base_type = ty.base_type().map(|base| Box::new(self.ty(base)));
        dump.children = ty
            .child_list()
            .iter()
            .map(|child| self.symbol(child, child.ident().map(str::to_string)))
            .collect();
        self.expanding.pop();
        dump
    }
}

/// Dump one symbol. Its name is shown as `filter` renders it.
pub fn dump_symbol(arena: &TypeArena, symbol: &Symbol, filter: &SymbolFilter) -> SymbolDump {
    let mut dumper = Dumper {
        arena,
        expanding: Vec::new(),
    };
    let name = symbol.ident().map(|n| filter.display_name(n).to_string());
    dumper.symbol(symbol, name)
}

/// Dump every symbol of `session` that passes `filter`.
pub fn dump_session(session: &Session, filter: &SymbolFilter) -> Vec<SymbolDump> {
    filter
        .apply(session.get_symbols())
        .into_iter()
        .map(|symbol| dump_symbol(session.types(), symbol, filter))
        .collect()
}

pub fn to_json(dumps: &[SymbolDump]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(dumps)
}

/// One line per symbol: `file:line: kind name: c type [= value]`.
pub fn to_text(dumps: &[SymbolDump]) -> String {
    let mut out = String::new();
    for dump in dumps {
        out.push_str(&format!(
            "{}:{}: {} {}: {}",
            dump.file,
            dump.line,
            dump.kind,
            dump.name.as_deref().unwrap_or("<anonymous>"),
            dump.c_type
        ));
        if let Some(value) = dump.const_int {
            out.push_str(&format!(" = {}", value));
        } else if let Some(ref value) = dump.const_string {
            out.push_str(&format!(" = {:?}", value));
        }
        out.push('\n');
    }
    out
}

/// Nested elements, one per symbol, with the children of each symbol's type.
pub fn to_xml(dumps: &[SymbolDump], self_indent: usize) -> String {
    let mut writer = XmlWriter {
        out: String::new(),
        step: self_indent,
        depth: 0,
    };
    writer.out.push_str("<?xml version=\"1.0\"?>\n<symbols>\n");
    writer.depth = 1;
    for dump in dumps {
        writer.symbol(dump, true);
    }
    writer.out.push_str("</symbols>\n");
    writer.out
}

struct XmlWriter {
    out: String,
    step: usize,
    depth: usize,
}

impl XmlWriter {
    fn indent(&self) -> usize {
        self.step * self.depth
    }

    fn open(&mut self, tag: &str, attrs: &[(&str, Option<&str>)], empty: bool) {
        let indent = self.indent();
        let attrs = collect_attributes(tag, attrs, indent, Some(tag.len() + 2));
        let close = if empty { "/>" } else { ">" };
        self.out
            .push_str(&format!("{}<{}{}{}\n", " ".repeat(indent), tag, attrs, close));
    }

    fn close(&mut self, tag: &str) {
        self.out
            .push_str(&format!("{}</{}>\n", " ".repeat(self.indent()), tag));
    }

    fn symbol(&mut self, dump: &SymbolDump, top_level: bool) {
        let tag = dump.kind;
        let value = dump
            .const_int
            .map(|v| v.to_string())
            .or_else(|| dump.const_string.clone());
        let bits = dump.bit_width.map(|b| b.to_string());
        let line = dump.line.to_string();

        let mut attrs = vec![
            ("name", dump.name.as_deref()),
            ("type", Some(dump.c_type.as_str())),
            ("value", value.as_deref()),
            ("bits", bits.as_deref()),
        ];
        if top_level {
            attrs.push(("file", Some(dump.file.as_str())));
            attrs.push(("line", Some(line.as_str())));
        }

        let children = element_children(&dump.ty);
        if children.is_empty() && dump.directives.is_empty() {
            self.open(tag, &attrs, true);
            return;
        }

        self.open(tag, &attrs, false);
        self.depth += 1;
        for directive in &dump.directives {
            self.directive(directive);
        }
        for child in children {
            self.symbol(child, false);
        }
        self.depth -= 1;
        self.close(tag);
    }

    fn directive(&mut self, directive: &Directive) {
        let options = directive.options().join(" ");
        let attrs = [
            ("name", Some(directive.name())),
            ("value", Some(directive.value()).filter(|v| !v.is_empty())),
            ("options", Some(options.as_str()).filter(|o| !o.is_empty())),
            ("target", directive.target()),
        ];
        self.open("directive", &attrs, true);
    }
}

/// Members, enumerators or parameters reachable through pointers and arrays.
fn element_children(ty: &TypeDump) -> &[SymbolDump] {
    let mut current = ty;
    loop {
        if !current.children.is_empty() {
            return &current.children;
        }
        match (&current.base_type, current.kind) {
            (Some(base), "pointer" | "array") => current = base,
            _ => return &[],
        }
    }
}
