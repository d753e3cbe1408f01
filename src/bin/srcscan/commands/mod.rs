//! Command implementations

pub mod attrs;
pub mod completions;
pub mod directives;
pub mod macros;
pub mod scan;
pub mod shlibs;

use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::cli::SourceArgs;
use srcscan::scanner::session::STDIN_NAME;
use srcscan::scanner::Session;
use srcscan::util::config::{global_config_path, load_config, project_config_path, Config};
use srcscan::util::diagnostic::emit;
use srcscan::util::fs::{find_headers, glob_files};

/// Settings every command sees.
pub struct Settings {
    pub config: Config,
    pub color: bool,
}

impl Settings {
    /// Load configuration: `explicit` if given, otherwise global merged with project.
    pub fn load(explicit: Option<&Path>, no_color: bool) -> Result<Self> {
        let config = match explicit {
            Some(path) => Config::load(path)?,
            None => {
                let cwd = std::env::current_dir().context("failed to get current directory")?;
                let global = global_config_path().unwrap_or_default();
                load_config(&global, &project_config_path(&cwd))
            }
        };

        Ok(Settings {
            config,
            color: !no_color && io::stderr().is_terminal(),
        })
    }
}

/// One input of a scan: a file on disk or stdin.
enum Input {
    File(PathBuf),
    Stdin,
}

fn is_stdin(path: &Path) -> bool {
    path.as_os_str() == "-"
}

/// Split `NAME=VALUE`; a bare `NAME` is defined as `1`, like `cc -D`.
fn split_define(define: &str) -> (&str, &str) {
    match define.split_once('=') {
        Some((name, value)) => (name, value),
        None => (define, "1"),
    }
}

/// Create a session from `sources`, scan every input and report failures as
/// diagnostics. Returns the session and the number of inputs that failed.
pub fn run_session(
    sources: &SourceArgs,
    settings: &Settings,
    macro_scan: bool,
) -> Result<(Session, usize)> {
    let mut session = Session::new();
    session.set_macro_scan(macro_scan);

    for (name, value) in &settings.config.scan.defines {
        session.define(name, value)?;
    }
    for define in &sources.defines {
        let (name, value) = split_define(define);
        session.define(name, value)?;
    }

    let cwd = std::env::current_dir().context("failed to get current directory")?;
    let mut macro_files = glob_files(&cwd, &settings.config.scan.macro_files)?;
    macro_files.extend(sources.macros.iter().cloned());
    if !macro_files.is_empty() {
        session
            .parse_macros(&macro_files)
            .context("failed to read macro definitions")?;
        info!(
            "{} macro(s) from {} file(s)",
            session.macros().len(),
            macro_files.len()
        );
    }

    let mut inputs = Vec::new();
    for input in &sources.inputs {
        if is_stdin(input) {
            inputs.push(Input::Stdin);
            continue;
        }
        for header in find_headers(std::slice::from_ref(input))? {
            session.append_filename(&header)?;
            inputs.push(Input::File(header));
        }
    }

    let mut failures = 0;
    for input in &inputs {
        let result = match input {
            Input::File(path) => {
                debug!("scanning {}", path.display());
                session.lex_filename(path)
            }
            Input::Stdin => {
                let name = sources.stdin_name.as_deref().unwrap_or(STDIN_NAME);
                session.parse_named(&mut io::stdin().lock(), name)
            }
        };
        if let Err(e) = result {
            emit(&e.to_diagnostic(), settings.color);
            failures += 1;
        }
    }

    Ok((session, failures))
}
