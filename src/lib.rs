pub mod cache;
pub mod client;
pub mod codec;
pub mod commands;
pub mod config;
pub mod connection;
pub mod data_server;
pub mod frame;
pub mod logging;
pub mod pipeline;
pub mod record;
pub mod server;
pub mod session;
pub mod store;
pub mod traffic;
pub mod upstream;

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Result<T> = std::result::Result<T, Error>;
