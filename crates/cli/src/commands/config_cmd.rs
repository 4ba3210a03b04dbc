//! `hearth config` — Show the effective configuration.

use crate::runtime::load_config;
use hearth_config::AppConfig;
use std::path::Path;

pub async fn run(config_path: Option<&Path>, path_only: bool) -> anyhow::Result<()> {
    if path_only {
        let path = match config_path {
            Some(path) => path.to_path_buf(),
            None => AppConfig::config_dir().join("config.toml"),
        };
        println!("{}", path.display());
        return Ok(());
    }

    let config = load_config(config_path)?;
    print!("{}", toml::to_string_pretty(&config.redacted())?);
    Ok(())
}
