//! `srcscan attrs` command

use anyhow::Result;

use crate::cli::AttrsArgs;
use srcscan::output::collect_attributes;

pub fn execute(args: AttrsArgs) -> Result<()> {
    let pairs: Vec<(&str, Option<&str>)> = args
        .attrs
        .iter()
        .map(|attr| match attr.split_once('=') {
            Some((name, value)) => (name, Some(value)),
            None => (attr.as_str(), None),
        })
        .collect();

    println!(
        "{}",
        collect_attributes(&args.tag, &pairs, args.self_indent, args.indent)
    );
    Ok(())
}
