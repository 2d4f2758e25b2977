//! `papa tools` - print the advertised tool descriptors.

use anyhow::Result;
use papa_mcp::ToolRegistry;

pub fn print() -> Result<()> {
    let registry = ToolRegistry::new();
    println!("{}", serde_json::to_string_pretty(registry.list())?);
    Ok(())
}
