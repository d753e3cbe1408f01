//! `srcscan shlibs` command

use std::io::Read;

use anyhow::{Context, Result};

use crate::cli::ShlibsArgs;
use srcscan::shlibs::{resolve_from_ldd_output, sanitize_shlib_path};
use srcscan::util::diagnostic::suggestions;
use srcscan::util::fs::read_to_string;

pub fn execute(args: ShlibsArgs) -> Result<()> {
    let output = match args.ldd_output {
        Some(ref path) => read_to_string(path)?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read ldd output from stdin")?;
            buf
        }
    };

    let shlibs = resolve_from_ldd_output(&args.libraries, &output)
        .map_err(|e| anyhow::anyhow!("{}\n{}", e, suggestions::LDD_UNRESOLVED))?;

    for shlib in &shlibs {
        println!("{}", sanitize_shlib_path(shlib));
    }
    Ok(())
}
