use std::{collections::HashMap, time::Duration};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    chain::{Chain, ChainId},
    ApiUrl,
};

pub use toml::de::Error as TomlError;

pub static PRODUCTION_CONFIG: Lazy<Config> = Lazy::new(|| {
    Config::try_toml(include_str!("../../docs/config/prod.toml"))
        .expect("Failed to parse prod.toml config file")
});

pub static GANACHE_CONFIG: Lazy<Config> = Lazy::new(|| {
    Config::try_toml(include_str!("../../docs/config/ganache.toml"))
        .expect("Failed to parse ganache.toml config file")
});

/// The environment in which the application is running
/// Defaults to [`Environment::Development`]
#[derive(Debug, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "camelCase")]
pub enum Environment {
    /// A local clearnode with a local `anvil`/`ganache` chain
    Development,
    Production,
}

impl Default for Environment {
    fn default() -> Self {
        Self::Development
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// The clearnode which co-signs and indexes the channels
    pub clearnode_url: ApiUrl,
    /// In milliseconds
    /// The timeout of every request made to the clearnode.
    pub fetch_timeout: u32,
    /// In milliseconds
    /// The default deadline for the clearnode to index a deposit.
    pub convergence_timeout: u32,
    /// In milliseconds
    /// The fixed interval between two polls of the home channel.
    pub poll_interval: u32,
    /// The key of this map is a human-readable text of the Chain name
    /// for readability in the configuration file.
    #[serde(rename = "chain")]
    pub chains: HashMap<String, Chain>,
}

impl Config {
    /// Utility method that will deserialize a Toml file content into a [`Config`].
    pub fn try_toml(toml: &str) -> Result<Self, TomlError> {
        toml::from_str(toml)
    }

    /// Finds a [`Chain`] based on the [`ChainId`].
    pub fn find_chain(&self, chain_id: ChainId) -> Option<&Chain> {
        self.chains.values().find(|chain| chain.chain_id == chain_id)
    }

    /// Finds a [`Chain`] by the name it's configured with, case-insensitive.
    pub fn find_chain_by_name(&self, name: &str) -> Option<&Chain> {
        self.chains
            .iter()
            .find(|(chain_name, _)| chain_name.eq_ignore_ascii_case(name))
            .map(|(_, chain)| chain)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout.into())
    }

    pub fn convergence_timeout(&self) -> Duration {
        Duration::from_millis(self.convergence_timeout.into())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval.into())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Toml parsing: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("File reading: {0}")]
    InvalidFile(#[from] std::io::Error),
}

/// If no `config_file` path is provided it will load the [`Environment`] configuration.
/// If `config_file` path is provided it will try to read and parse the file in Toml format.
pub fn configuration(
    environment: Environment,
    config_file: Option<&str>,
) -> Result<Config, ConfigError> {
    match config_file {
        Some(config_file) => {
            let content = std::fs::read_to_string(config_file)?;

            Ok(Config::try_toml(&content)?)
        }
        None => match environment {
            Environment::Production => Ok(PRODUCTION_CONFIG.clone()),
            Environment::Development => Ok(GANACHE_CONFIG.clone()),
        },
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn bundled_configs_are_valid() {
        let ganache = Lazy::force(&GANACHE_CONFIG);
        let anvil = ganache
            .find_chain(ChainId::new(31337))
            .expect("Should have the local chain");
        assert_eq!(Some(anvil), ganache.find_chain_by_name("anvil"));
        assert!(ganache.poll_interval() < ganache.convergence_timeout());

        let production = Lazy::force(&PRODUCTION_CONFIG);
        assert!(production.find_chain(ChainId::new(1)).is_some());
        assert!(production.find_chain(ChainId::new(31337)).is_none());
    }

    #[test]
    fn parses_config_from_toml() {
        let toml = r#"
            clearnode_url = "http://localhost:8000"
            fetch_timeout = 5000
            convergence_timeout = 30000
            poll_interval = 500

            [chain."Polygon Amoy"]
            chain_id = 80002
            rpc = "https://rpc-amoy.polygon.technology/"
        "#;

        let config = Config::try_toml(toml).expect("Should parse the config");

        assert_eq!("http://localhost:8000/", config.clearnode_url.to_string());
        assert_eq!(Duration::from_millis(500), config.poll_interval());
        assert!(config.find_chain_by_name("polygon amoy").is_some());
        assert!(config.find_chain(ChainId::new(80002)).is_some());
    }

    #[test]
    fn configuration_from_missing_file_fails() {
        let result = configuration(Environment::Development, Some("./does-not-exist.toml"));

        assert!(matches!(result, Err(ConfigError::InvalidFile(_))));
    }
}
