//! # quota-imap
//!
//! A small async IMAP client that does exactly what a quota exporter needs:
//! connect over implicit TLS, `LOGIN`, `GETQUOTAROOT` (RFC 9208, formerly
//! RFC 2087) and `LOGOUT`.
//!
//! ## Quick Start
//!
//! ```ignore
//! use quota_imap::{Client, Config};
//!
//! #[tokio::main]
//! async fn main() -> quota_imap::Result<()> {
//!     let config = Config::new("imap.example.com");
//!     let stream = quota_imap::connection::connect_tls(&config).await?;
//!     let client = Client::from_stream(stream, config.io_timeout).await?;
//!
//!     let mut client = client.login("user@example.com", "password").await?;
//!     let reply = client.get_quota_root("INBOX").await?;
//!     println!("{reply:?}");
//!
//!     client.logout().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Connection States
//!
//! The client uses the type-state pattern so that a quota query can only be
//! issued after a successful login:
//!
//! ```text
//! ┌─────────────────────┐
//! │   NotAuthenticated  │ ─── login() ───→ Authenticated
//! └─────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`command`]: command serialization and tag generation
//! - [`connection`]: streams, framing and the type-state client
//! - [`parser`]: lexer, response status parsing and reply fragments

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod connection;
mod error;
pub mod parser;

pub use command::{Command, TagGenerator};
pub use connection::{
    Authenticated, Client, Config, ConfigBuilder, FramedStream, ImapStream, NotAuthenticated,
    ResponseAccumulator,
};
pub use error::{Error, Result};
pub use parser::{Fragment, Response, Status};

/// Default mailbox whose quota root is queried.
pub const DEFAULT_MAILBOX: &str = "INBOX";
