use std::env;
use std::net::SocketAddr;

use thiserror::Error;

use super::probe_config::Config;

pub const DEFAULT_LISTEN_ADDRESS: &str = "0.0.0.0:9412";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid YAML in config file {path}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("module {module} uses unsupported prober {prober:?}")]
    UnsupportedProber { module: String, prober: String },
    #[error("module {module} has a zero timeout_seconds")]
    ZeroTimeout { module: String },
    #[error("invalid listen address {0:?}")]
    ListenAddress(String),
}

pub struct AppConfig {
    pub config: Config,
    pub listen_address: SocketAddr,
}

/// Load the application configuration from a YAML file and environment variables
/// This function reads the configuration file specified by the `CONFIG_FILE` environment variable,
/// parses it into a `Config` struct and reads the listen address from `LISTEN_ADDRESS`.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    let config_file_location =
        env::var("CONFIG_FILE").unwrap_or_else(|_| "config.yml".to_string());
    let config_str =
        std::fs::read_to_string(&config_file_location).map_err(|source| ConfigError::Read {
            path: config_file_location.clone(),
            source,
        })?;

    let config = parse_config(&config_str, &config_file_location)?;

    let listen_address =
        env::var("LISTEN_ADDRESS").unwrap_or_else(|_| DEFAULT_LISTEN_ADDRESS.to_string());
    let listen_address: SocketAddr = listen_address
        .parse()
        .map_err(|_| ConfigError::ListenAddress(listen_address.clone()))?;

    log::info!("Loaded {} module(s) from {}", config.modules.len(), config_file_location);

    Ok(AppConfig {
        config,
        listen_address,
    })
}

/// Parses and checks a YAML configuration document.
/// `path` is only used to describe where the document came from in errors.
pub fn parse_config(config_str: &str, path: &str) -> Result<Config, ConfigError> {
    let config: Config = serde_yaml::from_str(config_str).map_err(|source| ConfigError::Yaml {
        path: path.to_string(),
        source,
    })?;

    for (name, module) in &config.modules {
        if module.prober != "http" {
            return Err(ConfigError::UnsupportedProber {
                module: name.clone(),
                prober: module.prober.clone(),
            });
        }
        if module.timeout_seconds == 0 {
            return Err(ConfigError::ZeroTimeout {
                module: name.clone(),
            });
        }
    }

    Ok(config)
}
