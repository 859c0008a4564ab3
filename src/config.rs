use std::net::SocketAddr;
use std::path::PathBuf;

use serde::Deserialize;
use snafu::ResultExt as _;

use crate::error::{ApplicationError, ConfigLoadSnafu};
use crate::service::store::StoreKind;

/// Server settings, read from the environment (and `.env`, when present).
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_host_address")]
    pub host_address: SocketAddr,

    /// Where the record store keeps its files.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Where uploaded recordings are written and served from.
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    #[serde(default)]
    pub store_backend: StoreKind,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_host_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 3000))
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("public").join("uploads")
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_max_upload_bytes() -> usize {
    512 * 1024 * 1024
}

pub fn load() -> Result<Config, ApplicationError> {
    envy::from_env::<Config>().context(ConfigLoadSnafu)
}

impl Config {
    pub fn from_vars<I>(vars: I) -> Result<Config, ApplicationError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::from_iter(vars).context(ConfigLoadSnafu)
    }
}
