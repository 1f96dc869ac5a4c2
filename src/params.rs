//! Process-wide tunables.
//!
//! Values are read once from the environment (a `.env` file is honored when the
//! binary loads it through `dotenv`) and cached for the lifetime of the process.
//! Library code reads them through [`configurables`]; binaries should call
//! [`load`] early so malformed values are reported instead of silently replaced.

use log::warn;
use std::sync::OnceLock;
use std::time::Duration;

pub mod env {
    pub const URI: &str = "DOCSTORE_URI";
    pub const DATABASE: &str = "DOCSTORE_DATABASE";
    pub const APP_NAME: &str = "DOCSTORE_APP_NAME";
    pub const MAX_POOL_SIZE: &str = "DOCSTORE_MAX_POOL_SIZE";
    pub const SERVER_SELECTION_TIMEOUT_MS: &str = "DOCSTORE_SERVER_SELECTION_TIMEOUT_MS";
    pub const DEFAULT_TIMEOUT_MS: &str = "DOCSTORE_DEFAULT_TIMEOUT_MS";
}

pub const DEFAULT_URI: &str = "mongodb://localhost:27017";
pub const DEFAULT_DATABASE: &str = "docstore";

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid value `{value}` for `{key}`: {msg}")]
    InvalidValue {
        key: &'static str,
        value: String,
        msg: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Configurables {
    pub uri: String,
    pub database: String,

    /// Name reported to the server in the connection handshake
    pub app_name: Option<String>,
    pub max_pool_size: Option<u32>,
    pub server_selection_timeout: Option<Duration>,

    /// Timeout applied to operations issued by the command line tool
    pub default_timeout: Option<Duration>,
}

impl Default for Configurables {
    fn default() -> Self {
        Self {
            uri: DEFAULT_URI.to_owned(),
            database: DEFAULT_DATABASE.to_owned(),
            app_name: None,
            max_pool_size: None,
            server_selection_timeout: None,
            default_timeout: None,
        }
    }
}

impl Configurables {
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration using `lookup` to resolve each variable.
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        Ok(Self {
            uri: get(env::URI).unwrap_or(defaults.uri),
            database: get(env::DATABASE).unwrap_or(defaults.database),
            app_name: get(env::APP_NAME),
            max_pool_size: parse(env::MAX_POOL_SIZE, get(env::MAX_POOL_SIZE))?,
            server_selection_timeout: parse::<u64>(
                env::SERVER_SELECTION_TIMEOUT_MS,
                get(env::SERVER_SELECTION_TIMEOUT_MS),
            )?
            .map(Duration::from_millis),
            default_timeout: parse::<u64>(env::DEFAULT_TIMEOUT_MS, get(env::DEFAULT_TIMEOUT_MS))?
                .map(Duration::from_millis),
        })
    }
}

fn parse<T>(key: &'static str, value: Option<String>) -> Result<Option<T>, Error>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .map(|v| {
            v.trim().parse::<T>().map_err(|e| Error::InvalidValue {
                key,
                value: v.clone(),
                msg: e.to_string(),
            })
        })
        .transpose()
}

static CONFIGURABLES: OnceLock<Configurables> = OnceLock::new();

/// Loads configurables from the environment, failing on malformed values.
///
/// Once loaded the values are frozen, subsequent calls return the cached copy.
pub fn load() -> Result<&'static Configurables, Error> {
    if let Some(conf) = CONFIGURABLES.get() {
        return Ok(conf);
    }
    let conf = Configurables::from_env()?;
    Ok(CONFIGURABLES.get_or_init(|| conf))
}

/// Returns the process configurables, loading them on first access.
///
/// Malformed environment values fall back to defaults with a warning, use [`load`]
/// to surface them as errors.
pub fn configurables() -> &'static Configurables {
    CONFIGURABLES.get_or_init(|| {
        Configurables::from_env().unwrap_or_else(|e| {
            warn!("{}, falling back to default configuration", e);
            Configurables::default()
        })
    })
}
