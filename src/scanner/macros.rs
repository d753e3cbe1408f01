//! Preprocessor macro table.
//!
//! Bindings are raw text; nothing is expanded on insert. The first definition
//! of a name wins, so results do not depend on which header redefines it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// A recorded `#define`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroDef {
    /// Macro name
    pub name: String,

    /// Parameter names for function-like macros
    pub params: Option<Vec<String>>,

    /// Raw replacement text
    pub value: String,

    /// File the definition came from
    pub file: PathBuf,

    /// Line of the `#define`
    pub line: u32,
}

impl MacroDef {
    /// Whether this macro takes arguments.
    pub fn is_function_like(&self) -> bool {
        self.params.is_some()
    }

    /// Whether the replacement text is empty (decoration macros like `G_BEGIN_DECLS`).
    pub fn is_empty(&self) -> bool {
        self.value.trim().is_empty()
    }
}

/// Name → definition bindings, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct MacroTable {
    defs: HashMap<String, MacroDef>,
    order: Vec<String>,
}

impl MacroTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a definition. Returns `false` if the name was already bound.
    pub fn insert(&mut self, def: MacroDef) -> bool {
        if self.defs.contains_key(&def.name) {
            tracing::trace!("ignoring redefinition of macro {}", def.name);
            return false;
        }
        self.order.push(def.name.clone());
        self.defs.insert(def.name.clone(), def);
        true
    }

    /// Convenience for pre-seeding an object-like macro.
    pub fn define(&mut self, name: &str, value: &str, file: impl Into<PathBuf>) -> bool {
        self.insert(MacroDef {
            name: name.to_string(),
            params: None,
            value: value.to_string(),
            file: file.into(),
            line: 0,
        })
    }

    /// Remove a binding, but only if it was defined in `file`.
    pub fn undef(&mut self, name: &str, file: &Path) -> Option<MacroDef> {
        if self.defs.get(name).is_some_and(|d| d.file == file) {
            self.order.retain(|n| n != name);
            return self.defs.remove(name);
        }
        None
    }

    pub fn get(&self, name: &str) -> Option<&MacroDef> {
        self.defs.get(name)
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.defs.contains_key(name)
    }

    /// Whether `name` is bound as seen from `line` of `file`. A binding recorded
    /// from that same file at or after `line` has not been reached yet.
    pub fn is_defined_at(&self, name: &str, file: &Path, line: u32) -> bool {
        self.defs
            .get(name)
            .is_some_and(|d| d.file != file || d.line < line)
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// Definitions in the order they were first recorded.
    pub fn iter(&self) -> impl Iterator<Item = &MacroDef> {
        self.order.iter().filter_map(|name| self.defs.get(name))
    }

    /// Names in insertion order.
    pub(crate) fn names(&self) -> &[String] {
        &self.order
    }

    /// Drop every binding recorded after the first `len` names.
    pub(crate) fn truncate(&mut self, len: usize) {
        for name in self.order.drain(len.min(self.order.len())..) {
            self.defs.remove(&name);
        }
    }

    /// Put back a binding removed by `undef`.
    pub(crate) fn restore(&mut self, def: MacroDef, position: usize) {
        let position = position.min(self.order.len());
        self.order.insert(position, def.name.clone());
        self.defs.insert(def.name.clone(), def);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_definition_wins() {
        let mut table = MacroTable::new();
        assert!(table.define("SIZE", "10", "a.h"));
        assert!(!table.define("SIZE", "20", "b.h"));
        assert_eq!(table.get("SIZE").unwrap().value, "10");
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_undef_only_same_file() {
        let mut table = MacroTable::new();
        table.define("A", "1", "a.h");
        assert!(table.undef("A", Path::new("b.h")).is_none());
        assert!(table.is_defined("A"));
        assert!(table.undef("A", Path::new("a.h")).is_some());
        assert!(!table.is_defined("A"));
    }

    #[test]
    fn test_defined_at_ignores_later_lines_of_same_file() {
        let mut table = MacroTable::new();
        table.insert(MacroDef {
            name: "FOO_H".into(),
            params: None,
            value: String::new(),
            file: "foo.h".into(),
            line: 2,
        });

        assert!(!table.is_defined_at("FOO_H", Path::new("foo.h"), 1));
        assert!(!table.is_defined_at("FOO_H", Path::new("foo.h"), 2));
        assert!(table.is_defined_at("FOO_H", Path::new("foo.h"), 3));
        assert!(table.is_defined_at("FOO_H", Path::new("bar.h"), 1));
        assert!(!table.is_defined_at("BAR_H", Path::new("bar.h"), 1));
    }

    #[test]
    fn test_truncate_and_restore() {
        let mut table = MacroTable::new();
        table.define("A", "1", "a.h");
        table.define("B", "2", "a.h");
        table.define("C", "3", "a.h");

        let removed = table.undef("B", Path::new("a.h")).unwrap();
        table.truncate(1);
        table.restore(removed, 1);

        let names: Vec<_> = table.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
    }

    #[test]
    fn test_empty_and_function_like() {
        let mut table = MacroTable::new();
        table.define("G_BEGIN_DECLS", "", "glib.h");
        table.insert(MacroDef {
            name: "MAX".into(),
            params: Some(vec!["a".into(), "b".into()]),
            value: "((a) > (b) ? (a) : (b))".into(),
            file: "glib.h".into(),
            line: 3,
        });

        assert!(table.get("G_BEGIN_DECLS").unwrap().is_empty());
        assert!(table.get("MAX").unwrap().is_function_like());
        assert!(!table.get("MAX").unwrap().is_empty());
    }
}
