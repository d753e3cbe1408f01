//! srcscan - a C header scanner for binding generators
//!
//! This crate tokenizes and parses C headers (raw or preprocessed) into
//! symbols and type trees, resolves macro-defined constants, and collects
//! gtk-doc style annotations attached to declarations.

pub mod output;
pub mod scanner;
pub mod shlibs;
pub mod util;

/// Test utilities for srcscan unit tests.
///
/// This module is only available when compiling with `--cfg test`. It
/// provides header fixtures and helpers for scanning them.
#[cfg(test)]
pub mod test_support;

pub use output::{collect_attributes, OutputFormat, SymbolFilter};
pub use scanner::{
    Directive, ScanError, Session, SessionState, Symbol, SymbolKind, Type, TypeId, TypeKind,
};
pub use util::config::Config;
