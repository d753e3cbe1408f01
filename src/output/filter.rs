//! Symbol selection and renaming for output.

use crate::scanner::Symbol;
use crate::util::config::FilterConfig;

/// Chooses which symbols are reported and how their names are shown.
#[derive(Debug, Clone, Default)]
pub struct SymbolFilter {
    /// Names to include (empty = all)
    include: Vec<String>,
    /// Names to exclude
    exclude: Vec<String>,
    /// Prefix to strip from names
    strip_prefix: Option<String>,
}

impl SymbolFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a filter from the `[filter]` config section.
    pub fn from_config(config: &FilterConfig) -> Self {
        SymbolFilter::new()
            .with_include(config.include.clone())
            .with_exclude(config.exclude.clone())
            .with_strip_prefix(config.strip_prefix.clone())
    }

    /// Set names to include. A trailing `*` matches any suffix.
    pub fn with_include(mut self, names: Vec<String>) -> Self {
        self.include = names;
        self
    }

    /// Set names to exclude. A trailing `*` matches any suffix.
    pub fn with_exclude(mut self, names: Vec<String>) -> Self {
        self.exclude = names;
        self
    }

    /// Set prefix to strip from names.
    pub fn with_strip_prefix(mut self, prefix: Option<String>) -> Self {
        self.strip_prefix = prefix;
        self
    }

    /// Check if a symbol should be reported. Anonymous symbols only pass
    /// when there is no include list.
    pub fn should_include(&self, symbol: &Symbol) -> bool {
        let Some(name) = symbol.ident() else {
            return self.include.is_empty();
        };

        if self.exclude.iter().any(|p| pattern_matches(p, name)) {
            return false;
        }

        if self.include.is_empty() {
            return true;
        }

        self.include.iter().any(|p| pattern_matches(p, name))
    }

    /// Strip prefix from a name if configured.
    pub fn display_name<'a>(&self, name: &'a str) -> &'a str {
        if let Some(ref prefix) = self.strip_prefix {
            if let Some(stripped) = name.strip_prefix(prefix.as_str()) {
                if !stripped.is_empty() {
                    return stripped;
                }
            }
        }
        name
    }

    /// The reported symbols, in parse order.
    pub fn apply<'s>(&self, symbols: &'s [Symbol]) -> Vec<&'s Symbol> {
        symbols.iter().filter(|s| self.should_include(s)).collect()
    }
}

fn pattern_matches(pattern: &str, name: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => name.starts_with(prefix),
        None => pattern == name,
    }
}
