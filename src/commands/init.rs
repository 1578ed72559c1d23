use anyhow::Result;
use std::path::PathBuf;
use wikidump::config::Config;

const CONFIG_FILE_NAME: &str = "wikidump.toml";

pub async fn init_config(path: PathBuf, force: bool) -> Result<()> {
    std::fs::create_dir_all(&path)?;
    let config_path = path.join(CONFIG_FILE_NAME);

    if config_path.exists() && !force {
        anyhow::bail!(
            "Configuration file already exists: {} (use --force to overwrite)",
            config_path.display()
        );
    }

    Config::default().save(&config_path)?;
    println!("Created configuration file: {}", config_path.display());

    Ok(())
}
