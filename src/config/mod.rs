//! Runtime settings for the tidepool binary.
//!
//! Settings are layered: built-in defaults, then an optional TOML file,
//! then environment variables prefixed with `TIDEPOOL_`. The library
//! crate never reads configuration; only the binary does.

use std::path::Path;

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

use crate::ledger::Address;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenSettings {
    pub name: String,
    pub symbol: String,
    /// Identifying address the pool records for its token ledger.
    pub address: Address,
}

/// A balance minted before the session starts, in whole tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenesisAccount {
    pub address: Address,
    pub balance: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub token: TokenSettings,
    /// Administrator of both the ledger and the pool.
    pub admin: Address,
    /// Custody address the pool holds staked tokens under.
    pub pool_address: Address,
    /// Initial daily reward, in whole tokens.
    pub daily_reward: u64,
    /// The defaults layer drops empty arrays, so an absent key is valid.
    #[serde(default)]
    pub genesis: Vec<GenesisAccount>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            token: TokenSettings {
                name: "Tide Token".to_string(),
                symbol: "TIDE".to_string(),
                address: Address([0x01; 20]),
            },
            admin: Address([0x0A; 20]),
            pool_address: Address([0x0B; 20]),
            daily_reward: 100,
            genesis: Vec::new(),
        }
    }
}

impl Settings {
    /// Load settings, layering `path` (or `tidepool.toml` in the working
    /// directory, if present) and `TIDEPOOL_*` environment variables over
    /// the defaults.
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let defaults = Config::try_from(&Settings::default())?;
        let mut builder = Config::builder().add_source(defaults);
        builder = match path {
            Some(path) => builder.add_source(File::from(Path::new(path))),
            None => builder.add_source(File::with_name("tidepool").required(false)),
        };
        builder
            .add_source(Environment::with_prefix("TIDEPOOL").separator("__"))
            .build()?
            .try_deserialize()
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}
