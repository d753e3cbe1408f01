//! `srcscan macros` command

use anyhow::{Context, Result};

use crate::cli::MacrosArgs;
use srcscan::scanner::Session;

pub fn execute(args: MacrosArgs) -> Result<()> {
    let mut session = Session::new();
    session
        .parse_macros(&args.files)
        .context("failed to read macro definitions")?;

    for def in session.macros().iter() {
        let params = match def.params {
            Some(ref params) => format!("({})", params.join(", ")),
            None => String::new(),
        };
        let value = def.value.trim();
        if value.is_empty() {
            println!("{}:{}: {}{}", def.file.display(), def.line, def.name, params);
        } else {
            println!(
                "{}:{}: {}{} {}",
                def.file.display(),
                def.line,
                def.name,
                params,
                value
            );
        }
    }

    Ok(())
}
