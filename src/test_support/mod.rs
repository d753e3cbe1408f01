//! Test utilities for srcscan unit tests.
//!
//! # Example
//!
//! ```rust,ignore
//! use srcscan::test_support::{scan_source, symbol_names};
//!
//! #[test]
//! fn test_example() {
//!     let session = scan_source("int foo(void);");
//!     assert_eq!(symbol_names(&session), vec!["foo"]);
//! }
//! ```

pub mod fixtures;

use std::io::Cursor;

pub use fixtures::*;

use crate::scanner::{Session, Symbol, SymbolKind};

/// Scan `source` as `test.h` in a fresh session.
pub fn scan_source(source: &str) -> Session {
    let mut session = Session::new();
    session
        .parse_named(&mut Cursor::new(source), "test.h")
        .unwrap_or_else(|e| panic!("scan failed: {}", e));
    session
}

/// Scan `source` after seeding the decoration macros the fixtures use.
pub fn scan_with_decorations(source: &str) -> Session {
    let mut session = Session::new();
    session
        .parse_named(&mut Cursor::new(DECORATION_MACROS), "decorations.h")
        .unwrap_or_else(|e| panic!("scan failed: {}", e));
    session
        .parse_named(&mut Cursor::new(source), "test.h")
        .unwrap_or_else(|e| panic!("scan failed: {}", e));
    session
}

/// Identifiers of the session's symbols, anonymous ones left out.
pub fn symbol_names(session: &Session) -> Vec<&str> {
    session.get_symbols().iter().filter_map(Symbol::ident).collect()
}

/// The first symbol named `name`.
pub fn find_symbol<'s>(session: &'s Session, name: &str) -> &'s Symbol {
    session
        .get_symbols()
        .iter()
        .find(|s| s.ident() == Some(name))
        .unwrap_or_else(|| panic!("no symbol named {}", name))
}

/// Assertion helpers for testing.
pub mod assertions {
    use super::*;

    /// Assert that a result is Ok and return the value.
    pub fn assert_ok<T, E: std::fmt::Debug>(result: Result<T, E>) -> T {
        match result {
            Ok(v) => v,
            Err(e) => panic!("expected Ok, got Err: {:?}", e),
        }
    }

    /// Assert that a result is Err and return the error.
    pub fn assert_err<T: std::fmt::Debug, E>(result: Result<T, E>) -> E {
        match result {
            Ok(v) => panic!("expected Err, got Ok: {:?}", v),
            Err(e) => e,
        }
    }

    /// Assert the kind of the symbol named `name`.
    pub fn assert_symbol_kind(session: &Session, name: &str, kind: SymbolKind) {
        let symbol = find_symbol(session, name);
        assert_eq!(
            symbol.kind(),
            kind,
            "symbol {} has kind {}, expected {}",
            name,
            symbol.kind(),
            kind
        );
    }
}

#[cfg(test)]
mod tests {
    use super::assertions::*;
    use super::*;
    use crate::scanner::TypeKind;

    #[test]
    fn test_glib_style_fixture() {
        let session = scan_with_decorations(GLIB_STYLE_HEADER);
        assert_eq!(
            symbol_names(&session),
            vec![
                "DemoObject",
                "DemoObjectClass",
                "_DemoObject",
                "DemoState",
                "DemoCallback",
                "demo_object_new",
                "demo_object_frobnicate",
            ]
        );
        assert_symbol_kind(&session, "_DemoObject", SymbolKind::Struct);
        assert_symbol_kind(&session, "demo_object_new", SymbolKind::Function);

        let early = find_symbol(&session, "DemoObject").base_type();
        assert_eq!(session.ty(early).kind(), TypeKind::Struct);
        assert_eq!(session.ty(early).child_list().len(), 4);

        let skip = session.get_directives("skip");
        assert_eq!(skip.len(), 1);
        assert_eq!(session.symbol_directives("demo_object_new").len(), 4);
    }

    #[test]
    fn test_fixture_write() {
        let tmp = tempfile::TempDir::new().unwrap();
        let written = assert_ok(HeaderFixture::glib_style().write_to(tmp.path()));
        assert_eq!(written.len(), 2);
        assert!(written.iter().all(|p| p.is_file()));
    }

    #[test]
    fn test_unbalanced_fixture_fails() {
        let mut session = Session::new();
        let err = assert_err(session.parse_file(&mut Cursor::new(UNBALANCED_HEADER)));
        assert!(!err.is_io());
    }
}
