//! `papa config` - show the effective configuration.

use anyhow::Result;
use papa_core::PapaConfig;

pub fn print(config: &PapaConfig) -> Result<()> {
    print!("{}", serde_yaml::to_string(&config.redacted())?);
    Ok(())
}
