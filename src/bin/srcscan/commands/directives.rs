//! `srcscan directives` command

use anyhow::{bail, Result};

use super::{run_session, Settings};
use crate::cli::DirectivesArgs;

pub fn execute(args: DirectivesArgs, settings: &Settings) -> Result<()> {
    let (session, failures) = run_session(&args.sources, settings, false)?;

    let directives = session.get_directives(&args.name);
    if directives.is_empty() {
        tracing::info!("no `{}` directives found", args.name);
    }

    for directive in directives {
        let mut words = vec![directive.name()];
        if !directive.value().is_empty() {
            words.push(directive.value());
        }
        words.extend(directive.options().iter().map(String::as_str));

        match directive.target() {
            Some(target) => println!("({}) @{}", words.join(" "), target),
            None => println!("({})", words.join(" ")),
        }
    }

    if failures > 0 {
        bail!("{} input(s) failed to scan", failures);
    }
    Ok(())
}
