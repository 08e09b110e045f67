//! IMAP command builder.
//!
//! Only the commands a quota check needs are modelled.

mod serialize;
mod tag_generator;

pub use tag_generator::TagGenerator;

use serialize::Wire;

use crate::Result;

/// IMAP command.
#[derive(Clone, PartialEq, Eq)]
pub enum Command {
    /// LOGIN command.
    Login {
        /// Username.
        username: String,
        /// Password.
        password: String,
    },
    /// GETQUOTAROOT command (RFC 9208).
    GetQuotaRoot {
        /// Mailbox whose quota roots are requested.
        mailbox: String,
    },
    /// LOGOUT command.
    Logout,
}

impl Command {
    /// Returns the command name as sent on the wire.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Login { .. } => "LOGIN",
            Self::GetQuotaRoot { .. } => "GETQUOTAROOT",
            Self::Logout => "LOGOUT",
        }
    }

    /// Serializes the command with the given tag, CRLF included.
    ///
    /// The result is split after each literal header; every segment but
    /// the first is sent only once the server asks for continuation.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidArgument`] if an argument contains
    /// CR, LF or NUL.
    pub fn serialize(&self, tag: &str) -> Result<Vec<Vec<u8>>> {
        let mut wire = Wire::default();
        wire.push(tag.as_bytes());
        wire.push(b" ");
        wire.push(self.name().as_bytes());

        match self {
            Self::Login { username, password } => {
                wire.push(b" ");
                wire.astring(username)?;
                wire.push(b" ");
                wire.astring(password)?;
            }
            Self::GetQuotaRoot { mailbox } => {
                wire.push(b" ");
                wire.astring(mailbox)?;
            }
            Self::Logout => {}
        }

        Ok(wire.finish())
    }
}

// Keeps passwords out of logs.
impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Login { username, .. } => f
                .debug_struct("Login")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            Self::GetQuotaRoot { mailbox } => f
                .debug_struct("GetQuotaRoot")
                .field("mailbox", mailbox)
                .finish(),
            Self::Logout => f.write_str("Logout"),
        }
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

    fn wire(cmd: &Command, tag: &str) -> Vec<u8> {
        cmd.serialize(tag).unwrap().concat()
    }

    #[test]
    fn test_login_serialize() {
        let cmd = Command::Login {
            username: "user@example.com".to_string(),
            password: "s3cret".to_string(),
        };
        assert_eq!(
            wire(&cmd, "A0000"),
            b"A0000 LOGIN user@example.com s3cret\r\n"
        );
    }

    #[test]
    fn test_login_quotes_special_characters() {
        let cmd = Command::Login {
            username: "user".to_string(),
            password: "pa ss\"word".to_string(),
        };
        assert_eq!(
            wire(&cmd, "A0000"),
            b"A0000 LOGIN user \"pa ss\\\"word\"\r\n"
        );
    }

    #[test]
    fn test_getquotaroot_serialize() {
        let cmd = Command::GetQuotaRoot {
            mailbox: "INBOX".to_string(),
        };
        assert_eq!(wire(&cmd, "A0001"), b"A0001 GETQUOTAROOT INBOX\r\n");

        let cmd = Command::GetQuotaRoot {
            mailbox: "Shared Folders".to_string(),
        };
        assert_eq!(
            wire(&cmd, "A0001"),
            b"A0001 GETQUOTAROOT \"Shared Folders\"\r\n"
        );
    }

    #[test]
    fn test_logout_serialize() {
        assert_eq!(wire(&Command::Logout, "A0002"), b"A0002 LOGOUT\r\n");
    }

    #[test]
    fn test_login_non_ascii_password_uses_literal() {
        let cmd = Command::Login {
            username: "user".to_string(),
            password: "pässword".to_string(),
        };
        let segments = cmd.serialize("A0000").unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0], b"A0000 LOGIN user {9}\r\n");
        assert_eq!(segments[1], "pässword\r\n".as_bytes());
    }

    #[test]
    fn test_login_rejects_injected_command() {
        let cmd = Command::Login {
            username: "user".to_string(),
            password: "x\r\nA0001 LOGOUT".to_string(),
        };
        assert!(matches!(
            cmd.serialize("A0000"),
            Err(crate::Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_debug_redacts_password() {
        let cmd = Command::Login {
            username: "user".to_string(),
            password: "hunter2".to_string(),
        };
        let debug = format!("{cmd:?}");
        assert!(debug.contains("user"));
        assert!(!debug.contains("hunter2"));
    }
}
