//! Console configuration
//!
//! Command line options are parsed with clap. Longer-lived settings, such
//! as endpoints, pool parameters and template overrides, come from an
//! optional TOML file; command line values win where both exist.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use serde::Deserialize;

use tonpool_contracts::{Grams, PoolParams, TemplatePaths};

use crate::api::{Config, KeyStoreType, Options};
use crate::error::{CliError, CliResult};

/// Wallet id used until the node client reports its own
pub const DEFAULT_WALLET_ID: u32 = 698_983_191;

/// The only wallet contract version the console can derive
pub const SUPPORTED_WALLET_VERSION: u32 = 3;

//-----------------------------------------------------------------------------
// Command Line
//-----------------------------------------------------------------------------

/// Console for the staking pool contracts on the TON blockchain
#[derive(Debug, Clone, Parser)]
#[command(name = "tonpool-cli", about = "Console for staking pool contracts on the TON blockchain")]
pub struct CliOptions {
    /// Keys directory
    #[arg(short = 'D', long = "directory")]
    pub key_dir: Option<PathBuf>,

    /// Keep keys only in memory
    #[arg(short = 'M', long = "in-memory")]
    pub in_memory: bool,

    /// Execute one command and exit
    #[arg(short = 'E', long = "execute")]
    pub execute: Option<String>,

    /// Verbosity level, 0..20
    #[arg(short = 'v', long = "verbosity", value_parser = clap::value_parser!(u8).range(0..=20))]
    pub verbosity: Option<u8>,

    /// Lite server config; drops the config related blockchain cache
    #[arg(short = 'C', long = "config-force", conflicts_with = "config")]
    pub config_force: Option<PathBuf>,

    /// Lite server config
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Lite server config name
    #[arg(short = 'N', long = "config-name", default_value = "")]
    pub config_name: String,

    /// Let the console carry the node client's network traffic
    #[arg(short = 'n', long = "use-callbacks-for-network")]
    pub use_callbacks_for_network: bool,

    /// Wallet contract version
    #[arg(short = 'W', long = "wallet-version", default_value_t = SUPPORTED_WALLET_VERSION)]
    pub wallet_version: u32,

    /// Node client endpoint, host:port
    #[arg(long = "node")]
    pub node: Option<String>,

    /// Lite server endpoint used for relayed queries, host:port
    #[arg(long = "relay")]
    pub relay: Option<String>,

    /// TOML settings file
    #[arg(long = "settings")]
    pub settings: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long = "json-logs")]
    pub json_logs: bool,
}

impl CliOptions {
    /// Reject option combinations clap cannot express
    pub fn validate(&self) -> CliResult<()> {
        if self.wallet_version != SUPPORTED_WALLET_VERSION {
            return Err(CliError::Config(format!(
                "unsupported wallet version {}, only {} is available",
                self.wallet_version, SUPPORTED_WALLET_VERSION
            )));
        }
        Ok(())
    }

    /// Filter directive for the requested verbosity
    pub fn log_level(&self) -> Option<&'static str> {
        self.verbosity.map(crate::logging::level_for_verbosity)
    }

    /// Lite server config read from `-c` or `-C`
    pub fn node_config(&self) -> CliResult<Option<Config>> {
        let (path, ignore_cache) = match (&self.config_force, &self.config) {
            (Some(path), _) => (path, true),
            (None, Some(path)) => (path, false),
            (None, None) => return Ok(None),
        };
        Ok(Some(Config {
            config: fs_err::read_to_string(path)?,
            blockchain_name: self.config_name.clone(),
            use_callbacks_for_network: self.use_callbacks_for_network,
            ignore_cache,
        }))
    }
}

//-----------------------------------------------------------------------------
// Settings File
//-----------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub key_dir: PathBuf,
    pub default_wallet_id: u32,
    pub node: NodeSettings,
    pub relay: RelaySettings,
    pub pool: PoolSettings,
    pub templates: TemplatePaths,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            key_dir: PathBuf::from("."),
            default_wallet_id: DEFAULT_WALLET_ID,
            node: NodeSettings::default(),
            relay: RelaySettings::default(),
            pool: PoolSettings::default(),
            templates: TemplatePaths::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NodeSettings {
    pub endpoint: String,
}

impl Default for NodeSettings {
    fn default() -> Self {
        Self {
            endpoint: "127.0.0.1:4925".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RelaySettings {
    pub endpoint: Option<String>,
    pub timeout_secs: u64,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_secs: 5,
        }
    }
}

impl RelaySettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PoolSettings {
    #[serde(flatten)]
    pub params: PoolParams,
    /// Grams attached to owner requests, e.g. `GR$1.5`
    pub request_amount: String,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            params: PoolParams::default(),
            request_amount: "GR$1".to_string(),
        }
    }
}

impl PoolSettings {
    pub fn request_amount(&self) -> CliResult<Grams> {
        self.request_amount
            .parse()
            .map_err(|err| CliError::Config(format!("invalid pool.request_amount: {}", err)))
    }
}

impl Settings {
    /// Read settings from `path`, or use defaults when none is given
    pub fn load(path: Option<&Path>) -> CliResult<Self> {
        match path {
            Some(path) => Self::parse(&fs_err::read_to_string(path)?),
            None => Ok(Self::default()),
        }
    }

    pub fn parse(text: &str) -> CliResult<Self> {
        toml::from_str(text).map_err(|err| CliError::Config(err.to_string()))
    }

    /// Command line values override the file
    pub fn apply(&mut self, options: &CliOptions) {
        if let Some(dir) = &options.key_dir {
            self.key_dir = dir.clone();
        }
        if let Some(node) = &options.node {
            self.node.endpoint = node.clone();
        }
        if let Some(relay) = &options.relay {
            self.relay.endpoint = Some(relay.clone());
        }
    }

    /// Options sent with the node client's `init` request
    pub fn init_options(&self, options: &CliOptions) -> CliResult<Options> {
        let keystore_type = if options.in_memory {
            KeyStoreType::InMemory
        } else {
            KeyStoreType::Directory {
                directory: self.key_dir.display().to_string(),
            }
        };
        Ok(Options {
            config: options.node_config()?,
            keystore_type,
        })
    }
}
