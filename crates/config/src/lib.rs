//! # litsafe-config
//!
//! Configuration for the litsafe login and Safe wallet flow.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![warn(missing_docs)]

#[macro_use]
extern crate tracing;

use alloy_primitives::Address;
use figment::{
    Figment, Metadata, Profile, Provider,
    providers::{Env, Format, Serialized, Toml},
    value::{Dict, Map},
};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};
use url::Url;

pub mod error;
pub use error::ExtractConfigError;

// reexport so callers can merge their own providers
pub use figment;

/// litsafe configuration
///
/// # Provider Details
///
/// Values are merged, later providers winning, from:
///
/// 1. [`Config::default()`]
/// 2. `litsafe.toml` in the working directory, or the file named by `LITSAFE_CONFIG`
/// 3. `LITSAFE_` prefixed environment variables. Nested sections use their section name as an
///    additional prefix, e.g. `LITSAFE_POLL_MAX_ATTEMPTS` or `LITSAFE_SAFE_FACTORY`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// URL the identity gateway redirects back to after login.
    pub redirect_uri: Url,
    /// Chain id transactions are submitted on.
    pub chain_id: u64,
    /// JSON-RPC endpoint of `chain_id`.
    pub rpc_url: String,
    /// Identity gateway that performs the Google OAuth dance.
    pub login_gateway: Url,
    /// Relay server that mints and looks up key-pairs.
    pub relay_url: Url,
    /// Relay API key, sent as the `api-key` header.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relay_api_key: Option<String>,
    /// Chain name session signatures are requested for.
    pub session_chain: String,
    /// Lifetime of a signing session, in seconds.
    pub session_ttl: u64,
    /// Relay mint polling.
    pub poll: PollSettings,
    /// Safe contract deployments.
    pub safe: SafeSettings,
}

/// How the relay mint status is polled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollSettings {
    /// Seconds between two status requests.
    pub interval: u64,
    /// Number of status requests before giving up.
    pub max_attempts: u32,
}

impl PollSettings {
    /// Returns the poll interval as a [`Duration`].
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval)
    }
}

impl Default for PollSettings {
    fn default() -> Self {
        Self { interval: 15, max_attempts: 20 }
    }
}

/// Addresses of the Safe contracts on the configured chain.
///
/// Deployments differ per chain, so the factory and singleton have no defaults.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafeSettings {
    /// `SafeProxyFactory` address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub factory: Option<Address>,
    /// Safe singleton (master copy) address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub singleton: Option<Address>,
    /// Fallback handler passed to `setup`, zero for none.
    #[serde(default)]
    pub fallback_handler: Address,
}

impl Config {
    /// The default config file name.
    pub const FILE_NAME: &'static str = "litsafe.toml";

    /// Environment variable prefix.
    pub const ENV_PREFIX: &'static str = "LITSAFE_";

    /// Environment variable naming an alternative config file.
    pub const CONFIG_PATH_ENV: &'static str = "LITSAFE_CONFIG";

    /// Nested sections, each read from its own `LITSAFE_<SECTION>_` prefix.
    const SECTIONS: [&'static str; 2] = ["poll", "safe"];

    /// Keys read from the environment that are not config values.
    const IGNORED_ENV: [&'static str; 2] = ["config", "debug"];

    /// Loads the config from the default figment.
    ///
    /// See [`Config::figment`] for the provider order.
    pub fn load() -> Result<Self, ExtractConfigError> {
        Self::from_provider(Self::figment())
    }

    /// Extracts a `Config` from any figment provider.
    ///
    /// # Example
    ///
    /// ```
    /// use litsafe_config::{figment::providers::Serialized, Config};
    ///
    /// let figment = Config::figment().merge(Serialized::default("chain_id", 137));
    /// let config = Config::from_provider(figment).unwrap();
    /// assert_eq!(config.chain_id, 137);
    /// ```
    pub fn from_provider<T: Provider>(provider: T) -> Result<Self, ExtractConfigError> {
        let figment = Figment::from(provider);
        let config = figment.extract::<Self>().map_err(ExtractConfigError::new)?;
        trace!(chain_id = config.chain_id, relay = %config.relay_url, "loaded config");
        Ok(config)
    }

    /// Returns the default figment: defaults, then the config file, then the environment.
    pub fn figment() -> Figment {
        let file = std::env::var_os(Self::CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(Self::FILE_NAME));

        let mut figment = Figment::from(Self::default()).merge(Toml::file(file));

        figment = figment.merge(Env::prefixed(Self::ENV_PREFIX).filter(|key| {
            let key = key.as_str().to_ascii_lowercase();
            !Self::IGNORED_ENV.contains(&key.as_str())
                && !Self::SECTIONS.iter().any(|section| key.starts_with(&format!("{section}_")))
        }));
        for section in Self::SECTIONS {
            let prefix = format!("{}{}_", Self::ENV_PREFIX, section.to_uppercase());
            figment = figment.merge(Env::prefixed(&prefix).map(move |key| {
                format!("{section}.{}", key.as_str().to_ascii_lowercase()).into()
            }));
        }
        figment
    }

    /// Returns the session lifetime as a [`Duration`].
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl)
    }

    /// Serializes the config to a TOML string.
    pub fn to_string_pretty(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

impl Provider for Config {
    fn metadata(&self) -> Metadata {
        Metadata::named("litsafe config")
    }

    fn data(&self) -> Result<Map<Profile, Dict>, figment::Error> {
        Serialized::defaults(self).data()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            redirect_uri: Url::parse("http://localhost:3000").expect("valid url"),
            chain_id: 5,
            rpc_url: "http://localhost:8545".to_string(),
            login_gateway: Url::parse("https://login.litgateway.com").expect("valid url"),
            relay_url: Url::parse("https://relay-server-staging.herokuapp.com")
                .expect("valid url"),
            relay_api_key: None,
            session_chain: "ethereum".to_string(),
            session_ttl: 24 * 60 * 60,
            poll: PollSettings::default(),
            safe: SafeSettings::default(),
        }
    }
}
