use clap::Parser;
use std::path::PathBuf;

use listing_gateway::store::Store;
use listing_gateway::{data_server, logging, Error};

const HOST: &str = "127.0.0.1";
const PORT: u16 = 5001;

/// Data tier: answers RAW_LIST / RAW_SEARCH from a JSON listing file.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Host to listen on
    #[arg(long, default_value = HOST)]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = PORT)]
    port: u16,

    /// JSON file holding an array of listings
    #[arg(long)]
    db: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let args = Args::parse();

    logging::init(None)?;

    let store = Store::load(&args.db);
    data_server::run((args.host.as_str(), args.port), store).await
}
