use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info};

use crate::cache::{self, Cache};
use crate::commands::translate::Translate;
use crate::commands::{Command, CommandParserError};
use crate::connection::Connection;
use crate::frame::Frame;
use crate::pipeline;
use crate::traffic::{self, Direction};
use crate::upstream::Upstream;
use crate::Error;

/// What a session does after handling one line.
#[derive(Debug, PartialEq)]
pub enum Step {
    /// Nothing to answer, wait for the next line.
    Skip,
    /// Answer and wait for the next line.
    Reply(Frame),
    /// Answer and close the connection.
    Quit(Frame),
}

/// Resolves client lines into replies: translate, consult the cache, ask the data tier,
/// then sort and render.
pub struct Dispatcher<'a, U> {
    cache: Cache,
    upstream: &'a mut Upstream<U>,
}

impl<'a, U> Dispatcher<'a, U>
where
    U: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(cache: Cache, upstream: &'a mut Upstream<U>) -> Dispatcher<'a, U> {
        Dispatcher { cache, upstream }
    }

    pub async fn dispatch(&mut self, line: &str) -> Step {
        let command = match Command::try_from(line) {
            Ok(command) => command,
            Err(CommandParserError::Empty) => return Step::Skip,
            Err(e) => return Step::Reply(Frame::application_error(e)),
        };

        match command {
            Command::Quit(_) => Step::Quit(Frame::quit()),
            Command::List(cmd) => Step::Reply(self.query(line, cmd.translate()).await),
            Command::Search(cmd) => Step::Reply(self.query(line, cmd.translate()).await),
        }
    }

    async fn query(&mut self, line: &str, request: String) -> Frame {
        let key = cache::key(line);

        if let Some(frame) = self.cache.lookup(&key) {
            debug!(%key, "Cache hit");
            return frame;
        }

        let response = self.upstream.send(&request).await;

        // Data tier refusals and transport failures are forwarded as they are and not cached.
        if response.is_error() {
            return response;
        }

        let reply = pipeline::process(&response);
        if !reply.is_error() {
            self.cache.store(key, reply.clone());
        }

        reply
    }
}

/// Drives one client connection until the client quits or disconnects.
pub struct Session<'a, C, U> {
    connection: Connection<C>,
    dispatcher: Dispatcher<'a, U>,
}

impl<'a, C, U> Session<'a, C, U>
where
    C: AsyncRead + AsyncWrite + Unpin,
    U: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(connection: Connection<C>, dispatcher: Dispatcher<'a, U>) -> Session<'a, C, U> {
        Session {
            connection,
            dispatcher,
        }
    }

    pub async fn run(mut self) -> Result<(), Error> {
        while let Some(line) = self.connection.read_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            traffic::request(Direction::ClientToApplication, self.connection.peer(), line);

            match self.dispatcher.dispatch(line).await {
                Step::Skip => {}
                Step::Reply(frame) => self.connection.write_frame(frame).await?,
                Step::Quit(frame) => {
                    self.connection.write_frame(frame).await?;
                    self.connection.close().await?;
                    info!("Client quit, connection closed");
                    return Ok(());
                }
            }
        }

        info!("Connection closed by client");
        Ok(())
    }
}
