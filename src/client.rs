use futures::{SinkExt, StreamExt};
use std::fmt;
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio_util::codec::Framed;

use crate::codec::ResponseCodec;
use crate::frame::Frame;
use crate::Error;

/// Client of the gateway's line protocol.
pub struct Client {
    framed: Framed<TcpStream, ResponseCodec>,
}

impl Client {
    pub async fn connect<T: ToSocketAddrs>(addr: T) -> Result<Client, Error> {
        let socket = TcpStream::connect(addr).await?;

        Ok(Client {
            framed: Framed::new(socket, ResponseCodec::new()),
        })
    }

    pub async fn list(&mut self) -> Result<Frame, Error> {
        self.send("LIST").await
    }

    pub async fn search(
        &mut self,
        city: &str,
        max_price: impl fmt::Display,
    ) -> Result<Frame, Error> {
        self.send(&format!("SEARCH {} {}", city, max_price)).await
    }

    pub async fn quit(&mut self) -> Result<Frame, Error> {
        self.send("QUIT").await
    }

    /// Sends a raw command line and waits for its reply.
    pub async fn send(&mut self, line: &str) -> Result<Frame, Error> {
        // The gateway ignores blank lines, waiting for their reply would never end.
        if line.trim().is_empty() {
            return Err("empty command".into());
        }

        self.framed.send(line).await?;

        match self.framed.next().await {
            Some(frame) => Ok(frame?),
            None => Err("connection closed by server".into()),
        }
    }
}
