//! Scanner error types and diagnostics.

use std::path::{Path, PathBuf};

use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;

use crate::util::diagnostic::{suggestions, Diagnostic};

/// What went wrong while tokenizing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexErrorKind {
    #[error("unterminated string literal")]
    UnterminatedString,

    #[error("unterminated character constant")]
    UnterminatedChar,

    #[error("unterminated comment")]
    UnterminatedComment,

    #[error("invalid numeric literal `{0}`")]
    InvalidNumber(String),

    #[error("unexpected character `{0}`")]
    UnexpectedChar(char),
}

/// Malformed token, with its position.
#[derive(Debug, Clone, PartialEq, Eq, Error, MietteDiagnostic)]
#[error("{}:{}:{}: {}", .file.display(), .line, .column, .kind)]
#[diagnostic(code(srcscan::lex))]
pub struct LexError {
    pub file: PathBuf,
    pub line: u32,
    pub column: u32,
    pub kind: LexErrorKind,
}

impl LexError {
    pub fn new(file: impl Into<PathBuf>, line: u32, column: u32, kind: LexErrorKind) -> Self {
        LexError {
            file: file.into(),
            line,
            column,
            kind,
        }
    }
}

/// Grammar violation: what the parser expected and what it found instead.
#[derive(Debug, Clone, PartialEq, Eq, Error, MietteDiagnostic)]
#[error("{}:{}: expected {}, found {}", .file.display(), .line, .expected, .found)]
#[diagnostic(code(srcscan::parse))]
pub struct ParseError {
    pub file: PathBuf,
    pub line: u32,
    pub expected: String,
    pub found: String,
}

impl ParseError {
    pub fn new(
        file: impl Into<PathBuf>,
        line: u32,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        ParseError {
            file: file.into(),
            line,
            expected: expected.into(),
            found: found.into(),
        }
    }
}

/// Failure to process one file (or stream) in a session.
#[derive(Debug, Error, MietteDiagnostic)]
pub enum ScanError {
    #[error("failed to lex {}", .file.display())]
    #[diagnostic(code(srcscan::scan::lex))]
    Lex {
        file: PathBuf,
        #[source]
        source: LexError,
    },

    #[error("failed to parse {}", .file.display())]
    #[diagnostic(code(srcscan::scan::parse))]
    Parse {
        file: PathBuf,
        #[source]
        source: ParseError,
    },

    #[error("failed to read {}", .path.display())]
    #[diagnostic(code(srcscan::scan::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("the scanner session is finalized and accepts no more input")]
    #[diagnostic(code(srcscan::scan::finalized))]
    Finalized,
}

impl ScanError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        ScanError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// The file the error belongs to, if any.
    pub fn file(&self) -> Option<&Path> {
        match self {
            ScanError::Lex { file, .. } | ScanError::Parse { file, .. } => Some(file),
            ScanError::Io { path, .. } => Some(path),
            ScanError::Finalized => None,
        }
    }

    /// Whether this is a resource failure rather than a problem with the source text.
    pub fn is_io(&self) -> bool {
        matches!(self, ScanError::Io { .. })
    }

    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            ScanError::Lex { file, source } => Diagnostic::error(source.kind.to_string())
                .with_location(file)
                .with_context(format!("at line {}, column {}", source.line, source.column))
                .with_suggestion(suggestions::LEX_FAILED),

            ScanError::Parse { file, source } => Diagnostic::error(format!(
                "expected {}, found {}",
                source.expected, source.found
            ))
            .with_location(file)
            .with_context(format!("at line {}", source.line))
            .with_suggestion(suggestions::PREPROCESS_FIRST)
            .with_suggestion(suggestions::DEFINE_DECORATIONS),

            ScanError::Io { path, source } => {
                Diagnostic::error(format!("could not read input: {}", source))
                    .with_location(path)
            }

            ScanError::Finalized => Diagnostic::error(self.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lex_error_display() {
        let err = LexError::new("foo.h", 3, 7, LexErrorKind::UnterminatedString);
        assert_eq!(err.to_string(), "foo.h:3:7: unterminated string literal");
    }

    #[test]
    fn test_parse_error_display() {
        let err = ParseError::new("foo.h", 12, "`}`", "end of input");
        assert_eq!(err.to_string(), "foo.h:12: expected `}`, found end of input");
    }

    #[test]
    fn test_scan_error_diagnostic() {
        let err = ScanError::Parse {
            file: PathBuf::from("bad.h"),
            source: ParseError::new("bad.h", 4, "`;`", "`}`"),
        };

        assert_eq!(err.file(), Some(Path::new("bad.h")));
        assert!(!err.is_io());

        let output = err.to_diagnostic().format(false);
        assert!(output.contains("error: expected `;`, found `}`"));
        assert!(output.contains("--> bad.h"));
        assert!(output.contains("at line 4"));
    }

    #[test]
    fn test_io_error_is_distinct() {
        let err = ScanError::io(
            Path::new("missing.h"),
            std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        );
        assert!(err.is_io());
        assert_eq!(err.to_string(), "failed to read missing.h");
    }
}
