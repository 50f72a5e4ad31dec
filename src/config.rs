use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::codec::DEFAULT_MAX_FRAME_SIZE;

const HOST: &str = "127.0.0.2";
const PORT: u16 = 5002;
const DATA_HOST: &str = "127.0.0.1";
const DATA_PORT: u16 = 5001;
const UPSTREAM_TIMEOUT_SECS: u64 = 10;
const LOG_FILE: &str = "app_server.log";

/// Application tier: relays listing queries to the data tier and caches the sorted replies.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about)]
pub struct Config {
    /// Host to listen on for clients
    #[arg(long, env = "GATEWAY_HOST", default_value = HOST)]
    pub host: String,

    /// Port to listen on for clients
    #[arg(short, long, env = "GATEWAY_PORT", default_value_t = PORT)]
    pub port: u16,

    /// Data server host to connect to
    #[arg(long, env = "GATEWAY_DATA_HOST", default_value = DATA_HOST)]
    pub data_host: String,

    /// Data server port to connect to
    #[arg(long, env = "GATEWAY_DATA_PORT", default_value_t = DATA_PORT)]
    pub data_port: u16,

    /// Seconds to wait on the data server before a request fails
    #[arg(long, env = "GATEWAY_UPSTREAM_TIMEOUT", default_value_t = UPSTREAM_TIMEOUT_SECS)]
    pub upstream_timeout: u64,

    /// Largest request line or data server response accepted, in bytes
    #[arg(long, env = "GATEWAY_MAX_FRAME_SIZE", default_value_t = DEFAULT_MAX_FRAME_SIZE)]
    pub max_frame_size: usize,

    /// Seconds a cached reply stays valid; cached replies never expire when unset
    #[arg(long, env = "GATEWAY_CACHE_TTL")]
    pub cache_ttl: Option<u64>,

    /// File the request/reply traffic log is appended to
    #[arg(long, env = "GATEWAY_LOG_FILE", default_value = LOG_FILE)]
    pub log_file: PathBuf,
}

impl Config {
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn data_address(&self) -> String {
        format!("{}:{}", self.data_host, self.data_port)
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout)
    }

    pub fn cache_ttl(&self) -> Option<Duration> {
        self.cache_ttl.map(Duration::from_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: HOST.to_string(),
            port: PORT,
            data_host: DATA_HOST.to_string(),
            data_port: DATA_PORT,
            upstream_timeout: UPSTREAM_TIMEOUT_SECS,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            cache_ttl: None,
            log_file: PathBuf::from(LOG_FILE),
        }
    }
}
