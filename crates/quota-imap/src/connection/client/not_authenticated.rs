//! Implementation for the not-authenticated state.

use std::marker::PhantomData;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

use super::Client;
use super::states::{Authenticated, NotAuthenticated};
use crate::command::{Command, TagGenerator};
use crate::connection::framed::FramedStream;
use crate::connection::stream::bounded;
use crate::parser::{Response, Status};
use crate::{Error, Result};

impl<S> Client<S, NotAuthenticated>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a new client from a connected stream.
    ///
    /// Reads the server greeting. `io_timeout` bounds the greeting and every
    /// later command round trip; `None` waits indefinitely.
    pub async fn from_stream(stream: S, io_timeout: Option<Duration>) -> Result<Self> {
        let mut framed = FramedStream::new(stream);

        let raw = bounded(io_timeout, framed.read_response()).await?;
        let greeting = match Response::parse(&raw)? {
            Response::Untagged {
                status: Some(Status::Ok | Status::PreAuth),
                text,
                ..
            } => text,
            Response::Untagged {
                status: Some(Status::Bye),
                text,
                ..
            } => return Err(Error::Bye(text)),
            other => {
                return Err(Error::Protocol(format!(
                    "unexpected greeting: {other:?}"
                )));
            }
        };
        debug!(%greeting, "server greeting");

        Ok(Self {
            stream: framed,
            tag_gen: TagGenerator::default(),
            io_timeout,
            greeting,
            _state: PhantomData,
        })
    }

    /// Authenticates with the server using LOGIN.
    ///
    /// Consumes self and returns an authenticated client on success. A `NO`
    /// completion is reported as [`Error::Auth`].
    pub async fn login(
        mut self,
        username: &str,
        password: &str,
    ) -> Result<Client<S, Authenticated>> {
        let result = self
            .execute(&Command::Login {
                username: username.to_string(),
                password: password.to_string(),
            })
            .await
            .and_then(|responses| Self::check_tagged_ok(&responses));

        match result {
            Ok(()) => Ok(self.transition()),
            Err(Error::No(text)) => Err(Error::Auth(text)),
            Err(e) => Err(e),
        }
    }
}
