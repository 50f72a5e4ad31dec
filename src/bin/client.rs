use clap::Parser;
use tokio::io::{self, AsyncBufReadExt, BufReader};
use tokio::time::Instant;

use listing_gateway::client::Client;
use listing_gateway::Error;

const HOST: &str = "127.0.0.2";
const PORT: u16 = 5002;

/// Reads commands (LIST, SEARCH <city> <max_price>, QUIT) from stdin and prints the replies.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Gateway host
    #[arg(long, default_value = HOST)]
    host: String,

    /// Gateway port
    #[arg(short, long, default_value_t = PORT)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let args = Args::parse();

    let mut client = Client::connect((args.host.as_str(), args.port)).await?;
    let mut lines = BufReader::new(io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let command = line.trim();
        if command.is_empty() {
            continue;
        }

        let started = Instant::now();
        let reply = client.send(command).await?;
        let elapsed = started.elapsed();

        println!("{}", reply.body());
        println!("({:.2} ms)", elapsed.as_secs_f64() * 1000.0);

        if command.eq_ignore_ascii_case("QUIT") {
            break;
        }
    }

    Ok(())
}
