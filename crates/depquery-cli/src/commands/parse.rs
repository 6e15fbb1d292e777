//! Parse command - Dump the selector tree

use anyhow::{Context, Result};
use clap::Args;

/// Arguments for the parse command
#[derive(Args, Debug)]
pub struct ParseArgs {
    /// Selector to parse
    selector: String,
}

/// Execute the parse command
pub fn execute(args: ParseArgs) -> Result<()> {
    let ast = depquery_query::parse(&args.selector)
        .with_context(|| format!("Invalid selector: {}", args.selector))?;
    let json = serde_json::to_string_pretty(&ast).context("Failed to serialize selector tree")?;
    println!("{}", json);
    Ok(())
}
