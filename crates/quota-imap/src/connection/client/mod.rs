//! Type-state IMAP client connection.
//!
//! The connection states are:
//!
//! - `NotAuthenticated`: initial state after the greeting
//! - `Authenticated`: after a successful LOGIN
//!
//! Each state only exposes methods that are valid for that state.

#![allow(clippy::missing_errors_doc)]

mod authenticated;
mod not_authenticated;
mod states;

use std::marker::PhantomData;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

pub use self::states::{Authenticated, NotAuthenticated};
use super::framed::{FramedStream, ResponseAccumulator};
use super::stream::bounded;
use crate::command::{Command, TagGenerator};
use crate::parser::{Response, Status};
use crate::{Error, Result};

/// IMAP client connection with type-state.
///
/// The type parameter `State` tracks the connection state at compile time.
pub struct Client<S, State> {
    pub(crate) stream: FramedStream<S>,
    pub(crate) tag_gen: TagGenerator,
    pub(crate) io_timeout: Option<Duration>,
    pub(crate) greeting: String,
    _state: PhantomData<State>,
}

// Manual Debug implementation since FramedStream doesn't implement Debug
impl<S, State> std::fmt::Debug for Client<S, State> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("tag_gen", &self.tag_gen)
            .field("io_timeout", &self.io_timeout)
            .field("greeting", &self.greeting)
            .finish_non_exhaustive()
    }
}

/// Shared implementation for all states.
impl<S, State> Client<S, State>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Returns the server greeting text, e.g. `OK Dovecot ready.`.
    #[must_use]
    pub fn greeting(&self) -> &str {
        &self.greeting
    }

    /// Sends LOGOUT and closes the connection.
    ///
    /// The server's `BYE` is the expected answer and is not an error.
    pub async fn logout(mut self) -> Result<()> {
        let result = match self.execute(&Command::Logout).await {
            Ok(_) | Err(Error::Bye(_)) => Ok(()),
            Err(e) => Err(e),
        };

        if let Err(e) = self.stream.shutdown().await {
            debug!(error = %e, "shutdown after LOGOUT failed");
        }
        result
    }

    /// Sends a command and reads responses up to its tagged completion.
    ///
    /// The whole round trip is bounded by the I/O timeout. Literal
    /// arguments are sent only after the server's continuation request.
    pub(crate) async fn execute(&mut self, command: &Command) -> Result<Vec<Response>> {
        let tag = self.tag_gen.next();
        let segments = command.serialize(&tag)?;
        debug!(%tag, command = command.name(), "sending command");

        let stream = &mut self.stream;
        bounded(self.io_timeout, async move {
            let mut segments = segments.iter().peekable();
            while let Some(segment) = segments.next() {
                stream.write_command(segment).await?;
                if segments.peek().is_some() {
                    await_continuation(stream).await?;
                }
            }
            ResponseAccumulator::new(tag).read_until_tagged(stream).await
        })
        .await
    }

    /// Checks that the tagged completion (the last response) is OK.
    pub(crate) fn check_tagged_ok(responses: &[Response]) -> Result<()> {
        match responses.last() {
            Some(Response::Tagged { status, .. }) if status.is_ok() => Ok(()),
            Some(Response::Tagged { status, text, .. }) => match status {
                Status::Bad => Err(Error::Bad(text.clone())),
                Status::Bye => Err(Error::Bye(text.clone())),
                _ => Err(Error::No(text.clone())),
            },
            _ => Err(Error::Protocol("missing tagged response".to_string())),
        }
    }

    /// Moves the connection into another state.
    pub(crate) fn transition<Next>(self) -> Client<S, Next> {
        Client {
            stream: self.stream,
            tag_gen: self.tag_gen,
            io_timeout: self.io_timeout,
            greeting: self.greeting,
            _state: PhantomData,
        }
    }
}

/// Waits for a `+` continuation request before a literal is sent.
async fn await_continuation<S>(stream: &mut FramedStream<S>) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    loop {
        let raw = stream.read_response().await?;
        match Response::parse(&raw)? {
            Response::Continuation { .. } => return Ok(()),
            Response::Untagged {
                status: Some(Status::Bye),
                text,
                ..
            } => return Err(Error::Bye(text)),
            Response::Untagged { .. } => {}
            Response::Tagged { status, text, .. } => {
                return Err(match status {
                    Status::Bad => Error::Bad(text),
                    Status::No => Error::No(text),
                    _ => Error::Protocol(format!(
                        "command completed before literal was sent: {text}"
                    )),
                });
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tokio::io::DuplexStream;

    fn check(line: &[u8]) -> Result<()> {
        let response = Response::parse(line).unwrap();
        Client::<DuplexStream, NotAuthenticated>::check_tagged_ok(&[response])
    }

    #[test]
    fn test_tagged_status_mapping() {
        assert!(check(b"A1 OK done\r\n").is_ok());
        assert!(check(b"A1 PREAUTH done\r\n").is_ok());
        assert!(matches!(check(b"A1 NO nope\r\n"), Err(Error::No(_))));
        assert!(matches!(check(b"A1 BAD syntax\r\n"), Err(Error::Bad(_))));
        assert!(matches!(check(b"* OK untagged\r\n"), Err(Error::Protocol(_))));
    }
}
