//! Init command implementation

use crate::config::{Config, PathsConfig};
use crate::error::{Error, Result};
use std::path::PathBuf;
use tracing::info;

/// Initialize quarry configuration and the stores directory
pub async fn cmd_init(base_dir: Option<PathBuf>, force: bool) -> Result<Config> {
    let paths = match base_dir {
        Some(dir) => PathsConfig::for_base_dir(dir),
        None => PathsConfig::default(),
    };

    if paths.config_file.exists() && !force {
        return Err(Error::AlreadyInitialized(
            paths.config_file.display().to_string(),
        ));
    }

    let mut config = Config::default();
    config.paths = paths;

    std::fs::create_dir_all(&config.paths.stores_dir)?;
    config.save(&config.paths.config_file)?;
    info!("Created config at {:?}", config.paths.config_file);

    Ok(config)
}

pub fn print_init(config: &Config) {
    println!("✓ quarry initialized");
    println!("  Config: {}", config.paths.config_file.display());
    println!("  Stores: {}", config.paths.stores_dir.display());
    println!("\nNext steps:");
    println!("  1. Edit the config to pick an embedding provider (or leave defaults)");
    println!("  2. Index a tree: quarry index ./path/to/project");
    println!("  3. Search it:    quarry search \"how does X work\"");
}
