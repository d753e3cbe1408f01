//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

/// srcscan - scan C headers for symbols, types and annotations
#[derive(Parser)]
#[command(name = "srcscan")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Configuration file to use instead of ~/.srcscan and .srcscan
    #[arg(long, global = true, env = "SRCSCAN_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan headers and print their symbols
    Scan(ScanArgs),

    /// Print the annotations registered under a directive name
    Directives(DirectivesArgs),

    /// Print the macros defined by headers
    Macros(MacrosArgs),

    /// Resolve library names to shared objects from ldd output
    Shlibs(ShlibsArgs),

    /// Format XML attributes
    Attrs(AttrsArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Inputs shared by the commands that run a scanner session.
#[derive(Args)]
pub struct SourceArgs {
    /// Headers or directories to scan (`-` reads stdin)
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Header whose #defines seed the macro table
    #[arg(short = 'm', long = "macros", value_name = "FILE")]
    pub macros: Vec<PathBuf>,

    /// Define a macro before scanning
    #[arg(short = 'D', long = "define", value_name = "NAME[=VALUE]")]
    pub defines: Vec<String>,

    /// Name to report for stdin input
    #[arg(long, value_name = "NAME")]
    pub stdin_name: Option<String>,
}

#[derive(Args)]
pub struct ScanArgs {
    #[command(flatten)]
    pub sources: SourceArgs,

    /// Also report object-like macros as constants
    #[arg(long)]
    pub macro_scan: bool,

    /// Output format (json, text, xml)
    #[arg(long)]
    pub format: Option<String>,

    /// Only report symbols matching NAME (a trailing `*` matches any suffix)
    #[arg(long, value_name = "NAME")]
    pub include: Vec<String>,

    /// Never report symbols matching NAME
    #[arg(long, value_name = "NAME")]
    pub exclude: Vec<String>,

    /// Prefix to strip from reported names
    #[arg(long, value_name = "PREFIX")]
    pub strip_prefix: Option<String>,
}

#[derive(Args)]
pub struct DirectivesArgs {
    /// Directive name, e.g. `skip` or `transfer`
    pub name: String,

    #[command(flatten)]
    pub sources: SourceArgs,
}

#[derive(Args)]
pub struct MacrosArgs {
    /// Headers to read #defines from
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}

#[derive(Args)]
pub struct ShlibsArgs {
    /// Library name as passed to the linker, e.g. `glib-2.0`
    #[arg(short = 'l', long = "library", required = true)]
    pub libraries: Vec<String>,

    /// File holding ldd output (defaults to stdin)
    #[arg(long, value_name = "FILE")]
    pub ldd_output: Option<PathBuf>,
}

#[derive(Args)]
pub struct AttrsArgs {
    /// Element name
    pub tag: String,

    /// Attributes as NAME=VALUE; a bare NAME has no value and is left out
    pub attrs: Vec<String>,

    /// Indentation of the element itself
    #[arg(long, default_value_t = 0)]
    pub self_indent: usize,

    /// Extra width counted toward the line length; omit to never wrap
    #[arg(long)]
    pub indent: Option<usize>,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: Shell,
}
