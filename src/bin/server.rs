use clap::Parser;
use listing_gateway::config::Config;
use listing_gateway::{logging, server, Error};

#[tokio::main]
async fn main() -> Result<(), Error> {
    let config = Config::parse();

    logging::init(Some(config.log_file.as_path()))?;

    server::run(config).await
}
