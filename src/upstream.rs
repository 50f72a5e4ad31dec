use futures::{SinkExt, StreamExt};
use std::io;
use thiserror::Error as ThisError;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::time::{self, Duration};
use tokio_util::codec::Framed;
use tracing::{debug, warn};

use crate::codec::{CodecError, ResponseCodec};
use crate::frame::Frame;
use crate::traffic::{self, Direction};
use crate::Error;

/// Failures of a single round trip to the data tier. The messages are what the client sees
/// after the `ERROR: APPLICATION` prefix.
#[derive(Debug, ThisError)]
pub enum UpstreamError {
    #[error("DATA server timed out")]
    Timeout,
    #[error("DATA server connection refused")]
    Refused,
    #[error("DATA server error (connection closed by peer)")]
    Closed,
    #[error("DATA server error (frame exceeds {limit} bytes)")]
    FrameTooLarge { limit: usize },
    #[error("DATA server error ({0})")]
    Io(io::Error),
    #[error("DATA server error ({owed} late replies still pending)")]
    Pending { owed: usize },
}

impl From<CodecError> for UpstreamError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::FrameTooLarge { limit } => UpstreamError::FrameTooLarge { limit },
            CodecError::Io(err) => match err.kind() {
                io::ErrorKind::TimedOut => UpstreamError::Timeout,
                io::ErrorKind::ConnectionRefused => UpstreamError::Refused,
                _ => UpstreamError::Io(err),
            },
        }
    }
}

/// The gateway's single, long lived connection to the data tier.
///
/// It is opened once at startup and never reopened. A failed request is reported as an error
/// frame and the connection is used again for the next one.
///
/// A request that timed out still gets its reply eventually. `owed` counts those replies;
/// they are read and discarded before the next request goes out, so every response is
/// matched with the request that asked for it.
pub struct Upstream<T = TcpStream> {
    framed: Framed<T, ResponseCodec>,
    peer: String,
    timeout: Duration,
    owed: usize,
}

impl Upstream<TcpStream> {
    pub async fn connect(
        addr: &str,
        timeout: Duration,
        max_frame_size: usize,
    ) -> Result<Upstream<TcpStream>, Error> {
        let stream = TcpStream::connect(addr).await?;
        let peer = stream.peer_addr()?.to_string();

        Ok(Upstream::new(stream, peer, timeout, max_frame_size))
    }
}

impl<T> Upstream<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: T, peer: impl Into<String>, timeout: Duration, max_frame_size: usize) -> Self {
        Upstream {
            framed: Framed::new(stream, ResponseCodec::with_max_frame_size(max_frame_size)),
            peer: peer.into(),
            timeout,
            owed: 0,
        }
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// Sends `request` and waits for the terminated response.
    ///
    /// Never fails: transport problems come back as an `ERROR: APPLICATION DATA server ...`
    /// frame so the client session can carry on.
    pub async fn send(&mut self, request: &str) -> Frame {
        traffic::request(Direction::ApplicationToData, &self.peer, request);

        let response = match self.round_trip(request).await {
            Ok(frame) => frame,
            Err(e) => {
                warn!(peer = %self.peer, error = %e, "Data server request failed");
                Frame::application_error(e)
            }
        };

        traffic::reply(Direction::DataToApplication, &self.peer, &response);
        response
    }

    async fn round_trip(&mut self, request: &str) -> Result<Frame, UpstreamError> {
        self.discard_late_replies().await?;

        let timeout = self.timeout;
        let framed = &mut self.framed;
        let exchange = async move {
            framed.send(request).await?;

            match framed.next().await {
                Some(frame) => Ok(frame?),
                None => Err(UpstreamError::Closed),
            }
        };

        let outcome = time::timeout(timeout, exchange).await;
        match outcome {
            Ok(result) => result,
            Err(_) => {
                self.owed += 1;
                Err(UpstreamError::Timeout)
            }
        }
    }

    /// Reads the replies to timed out requests, each within its own timeout.
    async fn discard_late_replies(&mut self) -> Result<(), UpstreamError> {
        while self.owed > 0 {
            let late = time::timeout(self.timeout, self.framed.next())
                .await
                .map_err(|_| UpstreamError::Pending { owed: self.owed })?;

            let frame = match late {
                Some(frame) => frame?,
                None => return Err(UpstreamError::Closed),
            };

            self.owed -= 1;
            debug!(peer = %self.peer, reply = %frame.flatten(), "Discarded late reply");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{RequestCodec, DEFAULT_MAX_FRAME_SIZE};
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tokio::io::{duplex, AsyncWriteExt, DuplexStream, ReadBuf};

    fn upstream(stream: DuplexStream) -> Upstream<DuplexStream> {
        Upstream::new(
            stream,
            "data-tier",
            Duration::from_secs(10),
            DEFAULT_MAX_FRAME_SIZE,
        )
    }

    #[tokio::test]
    async fn round_trip() {
        let (app, data) = duplex(1024);
        let mut upstream = upstream(app);

        tokio::spawn(async move {
            let mut framed = Framed::new(data, RequestCodec::new());
            let request = framed.next().await.unwrap().unwrap();
            assert_eq!(request, "RAW_LIST");
            framed
                .send(Frame::new("OK RESULT 1\nid=1;price=5"))
                .await
                .unwrap();
        });

        let response = upstream.send("RAW_LIST").await;

        assert_eq!(response.as_str(), "OK RESULT 1\nid=1;price=5\nEND\n");
    }

    #[tokio::test]
    async fn response_in_pieces() {
        let (app, mut data) = duplex(1024);
        let mut upstream = upstream(app);

        tokio::spawn(async move {
            for part in ["OK RESULT 1\nid=", "1;price=5\nE", "ND\n"] {
                data.write_all(part.as_bytes()).await.unwrap();
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
            // Keep the stream open until the reader is done.
            tokio::time::sleep(Duration::from_secs(1)).await;
        });

        let response = upstream.send("RAW_LIST").await;

        assert_eq!(response.as_str(), "OK RESULT 1\nid=1;price=5\nEND\n");
    }

    #[tokio::test(start_paused = true)]
    async fn timeout() {
        let (app, data) = duplex(1024);
        let mut upstream = upstream(app);

        // Reads the request and never answers.
        let silent = tokio::spawn(async move {
            let mut framed = Framed::new(data, RequestCodec::new());
            while framed.next().await.is_some() {}
        });

        let response = upstream.send("RAW_LIST").await;

        assert_eq!(
            response.as_str(),
            "ERROR: APPLICATION DATA server timed out\nEND\n"
        );
        silent.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn late_reply_is_not_taken_for_the_next_one() {
        let (app, data) = duplex(1024);
        let mut upstream = Upstream::new(
            app,
            "data-tier",
            Duration::from_secs(5),
            DEFAULT_MAX_FRAME_SIZE,
        );

        tokio::spawn(async move {
            let mut framed = Framed::new(data, RequestCodec::new());

            let first = framed.next().await.unwrap().unwrap();
            assert_eq!(first, "RAW_SEARCH Denver 1");
            tokio::time::sleep(Duration::from_secs(8)).await;
            framed.send(Frame::new("OK RESULT 1\nid=99;city=Denver")).await.unwrap();

            let second = framed.next().await.unwrap().unwrap();
            assert_eq!(second, "RAW_LIST");
            framed.send(Frame::new("OK RESULT 1\nid=1;city=Lakewood")).await.unwrap();

            while framed.next().await.is_some() {}
        });

        let response = upstream.send("RAW_SEARCH Denver 1").await;
        assert_eq!(
            response.as_str(),
            "ERROR: APPLICATION DATA server timed out\nEND\n"
        );

        let response = upstream.send("RAW_LIST").await;
        assert_eq!(response.as_str(), "OK RESULT 1\nid=1;city=Lakewood\nEND\n");
    }

    #[tokio::test(start_paused = true)]
    async fn owed_reply_never_arrives() {
        let (app, data) = duplex(1024);
        let mut upstream = upstream(app);
        let (tx, mut requests) = tokio::sync::mpsc::unbounded_channel();

        // Records requests and never answers.
        let silent = tokio::spawn(async move {
            let mut framed = Framed::new(data, RequestCodec::new());
            while let Some(Ok(request)) = framed.next().await {
                let _ = tx.send(request);
            }
        });

        let response = upstream.send("RAW_SEARCH Denver 1").await;
        assert_eq!(
            response.as_str(),
            "ERROR: APPLICATION DATA server timed out\nEND\n"
        );

        let response = upstream.send("RAW_LIST").await;
        assert_eq!(
            response.as_str(),
            "ERROR: APPLICATION DATA server error (1 late replies still pending)\nEND\n"
        );
        assert!(response.is_error());

        // The second request was held back.
        silent.abort();
        let _ = silent.await;
        assert_eq!(requests.recv().await.unwrap(), "RAW_SEARCH Denver 1");
        assert_eq!(requests.recv().await, None);
    }

    #[tokio::test]
    async fn closed_before_reply() {
        let (app, data) = duplex(1024);
        let mut upstream = upstream(app);
        drop(data);

        let response = upstream.send("RAW_LIST").await;

        assert!(response.as_str().starts_with("ERROR: APPLICATION DATA server error ("));
        assert!(response.is_error());
    }

    #[tokio::test]
    async fn closed_mid_reply() {
        let (app, data) = duplex(1024);
        let mut upstream = upstream(app);

        tokio::spawn(async move {
            let mut framed = Framed::new(data, RequestCodec::new());
            framed.next().await.unwrap().unwrap();
            framed
                .get_mut()
                .write_all(b"OK RESULT 2\nid=1;price=5\n")
                .await
                .unwrap();
        });

        let response = upstream.send("RAW_LIST").await;

        assert_eq!(response.as_str(), "OK RESULT 2\nid=1;price=5\nEND\n");
    }

    #[tokio::test]
    async fn oversized_reply() {
        let (app, data) = duplex(1024);
        let mut upstream = Upstream::new(app, "data-tier", Duration::from_secs(10), 8);

        tokio::spawn(async move {
            let mut framed = Framed::new(data, RequestCodec::new());
            framed.next().await.unwrap().unwrap();
            let _ = framed
                .get_mut()
                .write_all(b"OK RESULT 1\nid=1;price=5\n")
                .await;
            tokio::time::sleep(Duration::from_secs(1)).await;
        });

        let response = upstream.send("RAW_LIST").await;

        assert_eq!(
            response.as_str(),
            "ERROR: APPLICATION DATA server error (frame exceeds 8 bytes)\nEND\n"
        );
    }

    /// A transport whose peer refuses every operation.
    struct Refusing;

    fn refused() -> io::Error {
        io::Error::from(io::ErrorKind::ConnectionRefused)
    }

    impl AsyncRead for Refusing {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            Poll::Ready(Err(refused()))
        }
    }

    impl AsyncWrite for Refusing {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            Poll::Ready(Err(refused()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn refused_every_time() {
        let mut upstream = Upstream::new(
            Refusing,
            "data-tier",
            Duration::from_secs(10),
            DEFAULT_MAX_FRAME_SIZE,
        );

        for _ in 0..2 {
            let response = upstream.send("RAW_LIST").await;
            assert_eq!(
                response.as_str(),
                "ERROR: APPLICATION DATA server connection refused\nEND\n"
            );
        }
    }

    #[test]
    fn error_mapping() {
        let err = UpstreamError::from(CodecError::Io(io::ErrorKind::TimedOut.into()));
        assert!(matches!(err, UpstreamError::Timeout));

        let err = UpstreamError::from(CodecError::Io(io::Error::new(
            io::ErrorKind::BrokenPipe,
            "broken pipe",
        )));
        assert_eq!(err.to_string(), "DATA server error (broken pipe)");
    }
}
