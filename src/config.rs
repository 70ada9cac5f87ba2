use config::{Config as ConfigLoader, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::Error;
use crate::gate::{MinimumDurationGate, DEFAULT_MINIMUM_DURATION};
use crate::network::Network;
use crate::policy::FeatureFlags;
use crate::profiles::is_valid_address;
use crate::session::BalanceOptions;

/// Environment variable pointing at the directory holding `refresh.toml`
pub const CONFIG_DIR_ENV: &str = "WALLET_REFRESH_CONFIG_DIR";

/// Prefix of environment variables overriding configuration keys
pub const ENV_PREFIX: &str = "WALLET_REFRESH";

/// Refresh coordinator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// Network the account is currently on
    pub network: Network,
    /// Test network that still gets its NFT inventory refreshed
    pub secondary_test_network: Network,
    /// Minimum duration of a refresh session in milliseconds
    pub minimum_duration_ms: u64,
    /// Experimental feature flags
    pub features: FeatureFlags,
    /// Addresses of the wallet's accounts
    pub wallet_addresses: Vec<String>,
    /// Options for the on-chain balance source
    pub balances: BalanceOptions,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            network: Network::Mainnet,
            secondary_test_network: Network::Rinkeby,
            minimum_duration_ms: DEFAULT_MINIMUM_DURATION.as_millis() as u64,
            features: FeatureFlags::default(),
            wallet_addresses: Vec::new(),
            balances: BalanceOptions::default(),
        }
    }
}

impl RefreshConfig {
    /// Create a configuration for the given network with default settings
    pub fn with_network(network: Network) -> Self {
        Self {
            network,
            ..Self::default()
        }
    }

    /// Set the minimum session duration
    pub fn with_minimum_duration(mut self, floor: Duration) -> Self {
        self.minimum_duration_ms = u64::try_from(floor.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set the feature flags
    pub fn with_features(mut self, features: FeatureFlags) -> Self {
        self.features = features;
        self
    }

    /// Set the wallet addresses
    pub fn with_wallet_addresses(mut self, addresses: Vec<String>) -> Self {
        self.wallet_addresses = addresses;
        self
    }

    pub fn minimum_duration(&self) -> Duration {
        Duration::from_millis(self.minimum_duration_ms)
    }

    pub fn gate(&self) -> MinimumDurationGate {
        MinimumDurationGate::new(self.minimum_duration())
    }

    /// Check the configuration for values the coordinator cannot work with
    pub fn validate(&self) -> Result<(), Error> {
        if self.minimum_duration_ms == 0 {
            return Err(Error::Config(
                "minimum_duration_ms must be greater than zero".to_string(),
            ));
        }

        if self.secondary_test_network.is_primary() {
            return Err(Error::Config(format!(
                "secondary_test_network cannot be the primary network ({})",
                self.secondary_test_network
            )));
        }

        if let Some(address) = self
            .wallet_addresses
            .iter()
            .find(|address| !is_valid_address(address))
        {
            return Err(Error::Config(format!("Invalid wallet address: {}", address)));
        }

        Ok(())
    }

    /// Load configuration from a file
    pub fn load(path: &PathBuf) -> Result<Self, Error> {
        let content = fs::read_to_string(path)?;
        let config: RefreshConfig = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
        Ok(config)
    }

    /// Load the configuration file, creating it with defaults when missing
    pub fn load_or_create(path: &PathBuf) -> Result<Self, Error> {
        if path.exists() {
            Self::load(path)
        } else {
            let config = Self::default();
            config.save(path)?;
            tracing::info!("Created default configuration at {}", path.display());
            Ok(config)
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &PathBuf) -> Result<(), Error> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;

        // Create directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push("wallet-refresh");
        path.push("config.toml");
        path
    }

    /// Load `refresh.toml` from the config directory, overridden by environment variables.
    ///
    /// The directory comes from `WALLET_REFRESH_CONFIG_DIR` and defaults to
    /// `config`. Nested keys use a double underscore, for example
    /// `WALLET_REFRESH_FEATURES__PROFILES=true`.
    pub fn load_layered() -> Result<Self, Error> {
        let config_dir = env::var(CONFIG_DIR_ENV).unwrap_or_else(|_| "config".to_string());

        let settings = ConfigLoader::builder()
            .add_source(File::with_name(&format!("{}/refresh", config_dir)).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("wallet_addresses"),
            )
            .build()?;

        let config = settings.try_deserialize::<RefreshConfig>()?;
        config.validate()?;
        Ok(config)
    }
}
