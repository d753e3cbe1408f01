//! Rendering scan results.

pub mod dump;
pub mod filter;
pub mod markup;

use std::fmt;
use std::str::FromStr;

pub use dump::{dump_session, dump_symbol, SymbolDump, TypeDump};
pub use filter::SymbolFilter;
pub use markup::collect_attributes;

/// Default indentation step for XML output.
pub const DEFAULT_SELF_INDENT: usize = 2;

/// How `srcscan scan` prints symbols.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Json,
    Text,
    Xml,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "text" | "txt" => Ok(OutputFormat::Text),
            "xml" => Ok(OutputFormat::Xml),
            other => Err(format!(
                "unknown output format `{}` (expected json, text or xml)",
                other
            )),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Xml => write!(f, "xml"),
        }
    }
}

/// Render dumps in `format`.
pub fn render(
    dumps: &[SymbolDump],
    format: OutputFormat,
    self_indent: usize,
) -> serde_json::Result<String> {
    match format {
        OutputFormat::Json => dump::to_json(dumps).map(|json| json + "\n"),
        OutputFormat::Text => Ok(dump::to_text(dumps)),
        OutputFormat::Xml => Ok(dump::to_xml(dumps, self_indent)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_parse() {
        assert_eq!("JSON".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert_eq!("txt".parse::<OutputFormat>(), Ok(OutputFormat::Text));
        assert!("yaml".parse::<OutputFormat>().is_err());
        assert_eq!(OutputFormat::Xml.to_string(), "xml");
    }

    #[test]
    fn test_render_empty() {
        assert_eq!(render(&[], OutputFormat::Json, 2).unwrap(), "[]\n");
        assert_eq!(render(&[], OutputFormat::Text, 2).unwrap(), "");
        assert_eq!(
            render(&[], OutputFormat::Xml, 2).unwrap(),
            "<?xml version=\"1.0\"?>\n<symbols>\n</symbols>\n"
        );
    }
}
