//! IMAP protocol parser.
//!
//! Sans-I/O parsing of server responses:
//!
//! - **Lexer**: tokenizes raw bytes into IMAP tokens
//! - **Response**: classifies a line as tagged, untagged or continuation
//! - **Fragment**: the untagged payload as a nested tree of text, binary
//!   and list values
//!
//! # Example
//!
//! ```
//! use quota_imap::parser::{Fragment, Response, Status};
//!
//! let response = Response::parse(b"A0002 OK Getquotaroot completed\r\n").unwrap();
//! assert!(matches!(response, Response::Tagged { status: Status::Ok, .. }));
//!
//! let response = Response::parse(b"* QUOTA \"\" (STORAGE 10 512)\r\n").unwrap();
//! let Response::Untagged { data, .. } = response else { panic!() };
//! assert_eq!(data.keyword(), Some("QUOTA"));
//! ```

mod fragment;
pub mod lexer;
mod response;

pub use fragment::{Fragment, MAX_NESTING};
pub use lexer::{Lexer, Token};
pub use response::{Response, Status};
