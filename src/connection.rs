use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use uuid::Uuid;

use crate::codec::{CodecError, RequestCodec};
use crate::frame::Frame;
use crate::traffic::{self, Direction};

/// A client connection: request lines in, terminated frames out.
///
/// Data is read from the socket into the codec's buffer; partial lines stay buffered until
/// their newline arrives.
pub struct Connection<T = TcpStream> {
    pub id: Uuid,
    peer: String,
    framed: Framed<T, RequestCodec>,
}

impl<T> Connection<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: T, peer: impl Into<String>, max_frame_size: usize) -> Connection<T> {
        Connection {
            id: Uuid::new_v4(),
            peer: peer.into(),
            framed: Framed::new(stream, RequestCodec::with_max_frame_size(max_frame_size)),
        }
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// The next request line, `None` once the client has gone away.
    pub async fn read_line(&mut self) -> Result<Option<String>, CodecError> {
        self.framed.next().await.transpose()
    }

    pub async fn write_frame(&mut self, frame: Frame) -> Result<(), CodecError> {
        traffic::reply(Direction::ApplicationToClient, &self.peer, &frame);
        self.framed.send(frame).await
    }

    /// Flushes pending output and shuts down the write half.
    pub async fn close(&mut self) -> Result<(), CodecError> {
        SinkExt::<Frame>::close(&mut self.framed).await
    }
}
