use anyhow::Result;
use colored::Colorize;

use crate::translator::Dialect;

/// List supported dialects with the names `--from`/`--to` accept
pub fn execute() -> Result<()> {
    println!("{}", "Dialects:".bold());
    for dialect in Dialect::ALL {
        println!(
            "  {:<8} .{:<4} {} {}",
            dialect.name().green(),
            dialect.extension(),
            "aliases:".dimmed(),
            dialect.aliases().join(", ")
        );
    }
    Ok(())
}
