use std::io;
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tracing::{error, info, instrument};

use crate::cache::Cache;
use crate::config::Config;
use crate::connection::Connection;
use crate::session::{Dispatcher, Session};
use crate::upstream::Upstream;
use crate::Error;

/// The application tier.
///
/// Owns the process wide state: the data tier connection and the reply cache. Both are
/// created in [`Server::bind`] and dropped with the server. Clients are served one at a
/// time, each session borrowing the data tier connection for its whole lifetime.
pub struct Server {
    listener: TcpListener,
    upstream: Upstream,
    cache: Cache,
    max_frame_size: usize,
}

impl Server {
    /// Connects to the data tier, then starts listening for clients.
    ///
    /// Failing to reach the data tier here is fatal; the connection is never retried.
    pub async fn bind(config: &Config) -> Result<Server, Error> {
        let data_address = config.data_address();
        let upstream = Upstream::connect(
            &data_address,
            config.upstream_timeout(),
            config.max_frame_size,
        )
        .await
        .map_err(|e| format!("failed to connect to DATA server at {}: {}", data_address, e))?;

        info!("Connected to DATA server at {}", upstream.peer());

        let listener = TcpListener::bind(config.listen_address()).await?;

        info!("Gateway listening on {}", listener.local_addr()?);

        Ok(Server {
            listener,
            upstream,
            cache: Cache::new(config.cache_ttl()),
            max_frame_size: config.max_frame_size,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub async fn run(mut self) -> Result<(), Error> {
        loop {
            let (socket, client_address) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    error!(error = %e, "Failed to accept connection");
                    continue;
                }
            };
            info!("Accepted connection from {:?}", client_address);

            if let Err(e) = handle_connection(
                socket,
                client_address,
                self.cache.clone(),
                &mut self.upstream,
                self.max_frame_size,
            )
            .await
            {
                error!(error = %e, "Connection failed");
            }
        }
    }
}

pub async fn run(config: Config) -> Result<(), Error> {
    Server::bind(&config).await?.run().await
}

#[instrument(
    name = "connection",
    skip(stream, cache, upstream, max_frame_size),
    fields(connection_id, client_address)
)]
async fn handle_connection(
    stream: TcpStream,
    client_address: SocketAddr,
    cache: Cache,
    upstream: &mut Upstream,
    max_frame_size: usize,
) -> Result<(), Error> {
    let connection = Connection::new(stream, client_address.to_string(), max_frame_size);

    tracing::Span::current()
        .record("connection_id", connection.id.to_string())
        .record("client_address", client_address.to_string());

    let dispatcher = Dispatcher::new(cache, upstream);
    Session::new(connection, dispatcher).run().await
}
