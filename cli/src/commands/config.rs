//! Config commands

use crate::config::Config;
use crate::ConfigCommands;

const KEYS: [&str; 4] = ["base_url", "cloud_name", "api_key", "api_secret"];

pub fn handle(action: ConfigCommands, profile: Option<&str>) -> anyhow::Result<()> {
    match action {
        ConfigCommands::Init => {
            let path = Config::default().save(profile)?;
            println!("Configuration initialized at {}", path.display());
        }
        ConfigCommands::Set { key, value } => {
            let mut config = Config::load(profile)?;
            config.set(&key, value)?;
            config.save(profile)?;
            println!("Set {} successfully", key);
        }
        ConfigCommands::Get { key } => {
            let config = Config::load(profile)?;
            println!("{}: {}", key, config.display(&key)?);
        }
        ConfigCommands::List => {
            let config = Config::load(profile)?;
            for key in KEYS {
                println!("{}: {}", key, config.display(key)?);
            }
        }
    }
    Ok(())
}
