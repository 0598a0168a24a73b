use serde_derive::{Deserialize, Serialize};

use log::{error, info, warn};
use std::{
    fs::File,
    io::prelude::*,
    net::{IpAddr, Ipv4Addr, SocketAddr},
};

const DEFAULT_CACHE_SIZE: usize = 32;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    host: IpAddr,
    port: u16,
    worker_threads: usize,
    template_root: String,
    asset_root: String,
    cache_size: usize,
    max_request_size: usize,
    read_timeout_secs: u64,
    escape_user_input: bool,
    compression: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 5000,
            worker_threads: 0,
            template_root: "templates".to_string(),
            asset_root: "static".to_string(),
            cache_size: DEFAULT_CACHE_SIZE,
            max_request_size: 8192,
            read_timeout_secs: 10,
            escape_user_input: true,
            compression: true,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the configuration file. A missing or unparsable file yields the
    /// defaults; the server is still expected to start.
    pub fn from_toml(filename: &str) -> Self {
        let mut file = match File::open(filename) {
            Ok(f) => f,
            Err(e) => {
                warn!("cannot open config file {} ({}), using defaults", filename, e);
                return Self::new();
            }
        };
        let mut str_val = String::new();
        if let Err(e) = file.read_to_string(&mut str_val) {
            error!("cannot read config file {}: {}, using defaults", filename, e);
            return Self::new();
        }

        match Self::from_toml_str(&str_val) {
            Ok(config) => {
                info!("config loaded from {}", filename);
                config
            }
            Err(e) => {
                error!("invalid config file {}: {}, using defaults", filename, e);
                Self::new()
            }
        }
    }

    pub fn from_toml_str(source: &str) -> Result<Self, toml::de::Error> {
        let mut raw_config: Config = toml::from_str(source)?;
        if raw_config.cache_size == 0 {
            warn!(
                "cache_size is 0 but the asset cache cannot be disabled, using {}",
                DEFAULT_CACHE_SIZE
            );
            raw_config.cache_size = DEFAULT_CACHE_SIZE;
        }
        Ok(raw_config)
    }
}

impl Config {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Runtime worker threads; 0 in the file means one per CPU.
    pub fn worker_threads(&self) -> usize {
        match self.worker_threads {
            0 => num_cpus::get(),
            n => n,
        }
    }

    pub fn template_root(&self) -> &str {
        &self.template_root
    }

    pub fn asset_root(&self) -> &str {
        &self.asset_root
    }

    pub fn cache_size(&self) -> usize {
        self.cache_size
    }

    pub fn max_request_size(&self) -> usize {
        self.max_request_size
    }

    pub fn read_timeout_secs(&self) -> u64 {
        self.read_timeout_secs
    }

    pub fn escape_user_input(&self) -> bool {
        self.escape_user_input
    }

    pub fn compression(&self) -> bool {
        self.compression
    }
}
