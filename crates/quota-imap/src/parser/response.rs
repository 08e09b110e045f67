//! Response line classification.

#![allow(clippy::missing_errors_doc)]

use super::fragment::Fragment;
use super::lexer::{Lexer, Token};
use crate::{Error, Result};

/// Status of a completed command or a server condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Command completed successfully.
    Ok,
    /// Command failed (operational error).
    No,
    /// Command failed (protocol/syntax error).
    Bad,
    /// Server greeting (pre-authenticated).
    PreAuth,
    /// Server is closing connection.
    Bye,
}

impl Status {
    /// Parses a status atom, ignoring case.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "OK" => Some(Self::Ok),
            "NO" => Some(Self::No),
            "BAD" => Some(Self::Bad),
            "PREAUTH" => Some(Self::PreAuth),
            "BYE" => Some(Self::Bye),
            _ => None,
        }
    }

    /// Returns true if this is a successful status.
    #[must_use]
    pub const fn is_ok(self) -> bool {
        matches!(self, Self::Ok | Self::PreAuth)
    }
}

/// A classified IMAP response line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Tagged response (command completion).
    Tagged {
        /// The command tag.
        tag: String,
        /// Completion status.
        status: Status,
        /// Remaining text, response code included.
        text: String,
    },
    /// Untagged response (server data or status).
    Untagged {
        /// Status when the line is `* OK`, `* NO`, `* BAD`, `* PREAUTH` or `* BYE`.
        status: Option<Status>,
        /// The line after `* ` as a fragment tree.
        data: Fragment,
        /// The line after `* ` as text, without CRLF.
        text: String,
    },
    /// Continuation request.
    Continuation {
        /// Text after `+`.
        text: String,
    },
}

impl Response {
    /// Parses a complete response line (literals included).
    pub fn parse(input: &[u8]) -> Result<Self> {
        let mut lexer = Lexer::new(input);

        match lexer.next_token()? {
            Token::Asterisk => {
                expect_space(&mut lexer)?;
                let rest = lexer.remaining();
                let status = match lexer.next_token() {
                    Ok(Token::Atom(word)) => Status::parse(word),
                    _ => None,
                };
                Ok(Self::Untagged {
                    status,
                    data: Fragment::from_bytes(rest),
                    text: Lexer::new(rest).read_text_until_crlf(),
                })
            }
            Token::Plus => {
                let text = lexer.read_text_until_crlf();
                Ok(Self::Continuation {
                    text: text.trim_start().to_string(),
                })
            }
            Token::Atom(tag) => {
                expect_space(&mut lexer)?;
                let status = match lexer.next_token()? {
                    Token::Atom(word) => Status::parse(word),
                    _ => None,
                }
                .ok_or_else(|| Error::Parse {
                    position: lexer.position(),
                    message: "Expected OK, NO or BAD after tag".to_string(),
                })?;
                let text = lexer.read_text_until_crlf();
                Ok(Self::Tagged {
                    tag: tag.to_string(),
                    status,
                    text: text.trim_start().to_string(),
                })
            }
            token => Err(Error::Parse {
                position: 0,
                message: format!("Expected *, +, or tag, got {token:?}"),
            }),
        }
    }

    /// Returns true if this is the tagged completion for `tag`.
    #[must_use]
    pub fn is_tagged(&self, tag: &str) -> bool {
        matches!(self, Self::Tagged { tag: t, .. } if t == tag)
    }
}

fn expect_space(lexer: &mut Lexer<'_>) -> Result<()> {
    match lexer.next_token()? {
        Token::Space => Ok(()),
        token => Err(Error::Parse {
            position: lexer.position(),
            message: format!("Expected Space, got {token:?}"),
        }),
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_tagged_ok() {
        let response = Response::parse(b"A0001 OK LOGIN completed\r\n").unwrap();

        assert_eq!(
            response,
            Response::Tagged {
                tag: "A0001".to_string(),
                status: Status::Ok,
                text: "LOGIN completed".to_string(),
            }
        );
        assert!(response.is_tagged("A0001"));
        assert!(!response.is_tagged("A0002"));
    }

    #[test]
    fn test_tagged_no_with_code() {
        let response =
            Response::parse(b"A0001 NO [AUTHENTICATIONFAILED] Invalid credentials\r\n").unwrap();

        match response {
            Response::Tagged { status, text, .. } => {
                assert_eq!(status, Status::No);
                assert_eq!(text, "[AUTHENTICATIONFAILED] Invalid credentials");
            }
            other => panic!("Expected tagged response, got {other:?}"),
        }
    }

    #[test]
    fn test_tagged_without_text() {
        let response = Response::parse(b"A0003 OK\r\n").unwrap();
        assert!(matches!(response, Response::Tagged { status: Status::Ok, ref text, .. } if text.is_empty()));
    }

    #[test]
    fn test_untagged_greeting() {
        let response = Response::parse(b"* OK [CAPABILITY IMAP4rev1 QUOTA] Dovecot ready.\r\n")
            .unwrap();

        match response {
            Response::Untagged { status, text, data } => {
                assert_eq!(status, Some(Status::Ok));
                assert_eq!(text, "OK [CAPABILITY IMAP4rev1 QUOTA] Dovecot ready.");
                assert_eq!(data.keyword(), Some("OK"));
            }
            other => panic!("Expected untagged response, got {other:?}"),
        }
    }

    #[test]
    fn test_untagged_quota_data() {
        let response = Response::parse(b"* QUOTA \"User quota\" (STORAGE 10 512)\r\n").unwrap();

        match response {
            Response::Untagged { status, data, .. } => {
                assert_eq!(status, None);
                assert_eq!(data.keyword(), Some("QUOTA"));
            }
            other => panic!("Expected untagged response, got {other:?}"),
        }
    }

    #[test]
    fn test_continuation() {
        let response = Response::parse(b"+ Ready\r\n").unwrap();
        assert_eq!(
            response,
            Response::Continuation {
                text: "Ready".to_string()
            }
        );
    }

    #[test]
    fn test_unknown_status_is_error() {
        assert!(Response::parse(b"A0001 MAYBE later\r\n").is_err());
        assert!(Response::parse(b"(oops)\r\n").is_err());
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(Status::parse("ok"), Some(Status::Ok));
        assert_eq!(Status::parse("PREAUTH"), Some(Status::PreAuth));
        assert_eq!(Status::parse("QUOTA"), None);
        assert!(Status::PreAuth.is_ok());
        assert!(!Status::Bye.is_ok());
    }
}
