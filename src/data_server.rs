use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio_util::codec::Framed;
use tracing::{debug, error, info};

use crate::codec::RequestCodec;
use crate::store::Store;
use crate::Error;

/// Serves the data tier protocol on `addr`.
pub async fn run(addr: impl ToSocketAddrs, store: Store) -> Result<(), Error> {
    let listener = TcpListener::bind(addr).await?;
    serve(listener, store).await
}

/// Accepts connections one at a time; the application tier keeps a single connection open.
pub async fn serve(listener: TcpListener, store: Store) -> Result<(), Error> {
    info!(
        "Data server listening on {} with {} listings",
        listener.local_addr()?,
        store.len()
    );

    loop {
        let (socket, address) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                error!(error = %e, "Failed to accept connection");
                continue;
            }
        };
        info!("Connection from {}", address);

        if let Err(e) = handle_connection(socket, &store).await {
            error!(error = %e, "Connection failed");
        }
        info!("Connection from {} closed", address);
    }
}

async fn handle_connection(socket: TcpStream, store: &Store) -> Result<(), Error> {
    let mut framed = Framed::new(socket, RequestCodec::new());

    while let Some(line) = framed.next().await.transpose()? {
        let request = line.trim();
        if request.is_empty() {
            continue;
        }

        debug!(request, "Received request");
        framed.send(store.execute(request)).await?;
    }

    Ok(())
}
