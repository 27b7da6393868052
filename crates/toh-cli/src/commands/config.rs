//! Configuration management commands

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Subcommand;

use crate::config::{Config, CONFIG_FILE_NAME};

const EXAMPLE_CONFIG: &str = include_str!("../../../../toh.toml.example");

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show,
    /// Write an annotated configuration file
    Init {
        /// Destination (defaults to ./toh.toml)
        #[arg(short, long)]
        path: Option<PathBuf>,
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}

/// `source` is the file named on the command line, if any
pub fn run(cmd: ConfigCommands, config: &Config, source: Option<&Path>) -> Result<()> {
    match cmd {
        ConfigCommands::Show => show(config, source),
        ConfigCommands::Init { path, force } => {
            init(path.unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME)), force)
        }
    }
}

fn show(config: &Config, source: Option<&Path>) -> Result<()> {
    println!("Current Configuration");
    println!("=====================\n");

    match source.map(Path::to_path_buf).or_else(Config::find_config_file) {
        Some(path) => println!("# Config file: {}\n", path.display()),
        None => println!("# No configuration file found, showing defaults\n"),
    }

    let rendered = toml::to_string_pretty(config).context("Failed to render configuration")?;
    println!("{rendered}");
    Ok(())
}

fn init(path: PathBuf, force: bool) -> Result<()> {
    if path.exists() && !force {
        println!("Configuration file already exists: {}", path.display());
        println!("Use --force to overwrite");
        return Ok(());
    }

    std::fs::write(&path, EXAMPLE_CONFIG)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Configuration file created: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_writes_example_and_respects_force() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("toh.toml");

        init(path.clone(), false).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), EXAMPLE_CONFIG);

        std::fs::write(&path, "# edited\n").unwrap();
        init(path.clone(), false).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# edited\n");

        init(path.clone(), true).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), EXAMPLE_CONFIG);
    }
}
