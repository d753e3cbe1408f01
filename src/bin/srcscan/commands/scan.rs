//! `srcscan scan` command

use anyhow::{bail, Result};

use super::{run_session, Settings};
use crate::cli::ScanArgs;
use srcscan::output::{dump_session, render, OutputFormat, SymbolFilter, DEFAULT_SELF_INDENT};

pub fn execute(args: ScanArgs, settings: &Settings) -> Result<()> {
    let config = &settings.config;

    // CLI overrides config
    let format = match args.format {
        Some(ref f) => f.parse::<OutputFormat>().map_err(|e| anyhow::anyhow!(e))?,
        None => config.format().unwrap_or_default(),
    };
    let macro_scan = args.macro_scan || config.scan.macro_scan;

    let mut filter = SymbolFilter::from_config(&config.filter);
    if !args.include.is_empty() {
        filter = filter.with_include(args.include);
    }
    if !args.exclude.is_empty() {
        filter = filter.with_exclude(args.exclude);
    }
    if args.strip_prefix.is_some() {
        filter = filter.with_strip_prefix(args.strip_prefix);
    }

    let (session, failures) = run_session(&args.sources, settings, macro_scan)?;

    let dumps = dump_session(&session, &filter);
    tracing::info!(
        "{} of {} symbol(s) reported",
        dumps.len(),
        session.get_symbols().len()
    );

    let self_indent = config.output.self_indent.unwrap_or(DEFAULT_SELF_INDENT);
    print!("{}", render(&dumps, format, self_indent)?);

    if failures > 0 {
        bail!("{} input(s) failed to scan", failures);
    }
    Ok(())
}
