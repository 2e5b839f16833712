//! Configuration display command.

use std::path::Path;

use console::style;

use crate::config::Settings;

/// Print the effective configuration as TOML.
pub fn cmd_config_show(settings: &Settings, source: Option<&Path>) -> anyhow::Result<()> {
    match source {
        Some(path) => eprintln!("{} Loaded from {}", style("→").dim(), path.display()),
        None => eprintln!("{} No config file found, showing defaults", style("!").yellow()),
    }
    print!("{}", settings.to_toml()?);
    Ok(())
}
