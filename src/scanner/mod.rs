//! C header scanning.
//!
//! This module tokenizes C headers (raw or preprocessed), records macro
//! definitions, and parses declarations into [`Symbol`]s and [`Type`]s
//! together with their gtk-doc style annotations.

pub mod const_eval;
pub mod directive;
pub mod errors;
pub mod lexer;
pub mod macros;
mod parser;
pub mod session;
pub mod token;
pub mod types;

pub use directive::{parse_doc_comment, Directive, DirectiveIndex, DocBlock};
pub use errors::{LexError, LexErrorKind, ParseError, ScanError};
pub use lexer::{tokenize, Lexer};
pub use macros::{MacroDef, MacroTable};
pub use session::{Session, SessionState};
pub use types::{
    FunctionSpecifier, StorageClass, Symbol, SymbolKind, TagKind, Type, TypeArena, TypeId,
    TypeKind, TypeQualifiers,
};
