//! Configuration validation.

use std::collections::HashSet;

use super::model::ExporterConfig;

/// A problem found in an otherwise well-formed config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// `check_interval` is zero.
    ZeroInterval,
    /// Global `timeout` is zero.
    ZeroTimeout,
    /// Account at this position has an empty name.
    EmptyName(usize),
    /// Two accounts share this name.
    DuplicateName(String),
    /// Account has an empty server.
    EmptyServer(String),
    /// Account port is 0.
    InvalidPort(String),
    /// Account has an empty username.
    EmptyUsername(String),
    /// Account has an empty password.
    EmptyPassword(String),
    /// Account timeout is zero.
    ZeroAccountTimeout(String),
    /// A value sent to the server contains CR, LF or NUL.
    ControlCharacter {
        /// Account name.
        account: String,
        /// Offending field.
        field: &'static str,
    },
}

impl ValidationError {
    /// Get the field name this error relates to.
    #[must_use]
    pub const fn field(&self) -> &'static str {
        match self {
            Self::ZeroInterval => "check_interval",
            Self::ZeroTimeout | Self::ZeroAccountTimeout(_) => "timeout",
            Self::EmptyName(_) | Self::DuplicateName(_) => "name",
            Self::EmptyServer(_) => "server",
            Self::InvalidPort(_) => "port",
            Self::EmptyUsername(_) => "username",
            Self::EmptyPassword(_) => "password",
            Self::ControlCharacter { field, .. } => *field,
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ZeroInterval => write!(f, "check_interval must be at least 1 second"),
            Self::ZeroTimeout => write!(f, "timeout must be at least 1 second"),
            Self::EmptyName(index) => write!(f, "account #{} has no name", index + 1),
            Self::DuplicateName(name) => write!(f, "account name '{name}' is used more than once"),
            Self::EmptyServer(name) => write!(f, "account '{name}': server is required"),
            Self::InvalidPort(name) => write!(f, "account '{name}': port must be 1-65535"),
            Self::EmptyUsername(name) => write!(f, "account '{name}': username is required"),
            Self::EmptyPassword(name) => write!(f, "account '{name}': password is required"),
            Self::ZeroAccountTimeout(name) => {
                write!(f, "account '{name}': timeout must be at least 1 second")
            }
            Self::ControlCharacter { account, field } => {
                write!(f, "account '{account}': {field} must not contain CR, LF or NUL")
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validate a parsed configuration.
///
/// # Errors
///
/// Returns every problem found, not just the first.
pub fn validate(config: &ExporterConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.check_interval == 0 {
        errors.push(ValidationError::ZeroInterval);
    }
    if config.timeout == Some(0) {
        errors.push(ValidationError::ZeroTimeout);
    }

    let mut seen = HashSet::new();
    for (index, account) in config.accounts.iter().enumerate() {
        let name = account.name.trim();
        if name.is_empty() {
            errors.push(ValidationError::EmptyName(index));
        } else if !seen.insert(name) {
            errors.push(ValidationError::DuplicateName(name.to_string()));
        }

        let label = || account.name.clone();
        if account.server.trim().is_empty() {
            errors.push(ValidationError::EmptyServer(label()));
        }
        if account.port == 0 {
            errors.push(ValidationError::InvalidPort(label()));
        }
        if account.username.trim().is_empty() {
            errors.push(ValidationError::EmptyUsername(label()));
        }
        if account.password.is_empty() {
            errors.push(ValidationError::EmptyPassword(label()));
        }
        if account.timeout == Some(0) {
            errors.push(ValidationError::ZeroAccountTimeout(label()));
        }
        for (field, value) in [
            ("username", &account.username),
            ("password", &account.password),
            ("mailbox", &account.mailbox),
        ] {
            if value.contains(['\r', '\n', '\0']) {
                errors.push(ValidationError::ControlCharacter {
                    account: label(),
                    field,
                });
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
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
    use crate::config::AccountConfig;

    fn config(accounts: Vec<AccountConfig>) -> ExporterConfig {
        ExporterConfig {
            check_interval: 60,
            timeout: None,
            accounts,
        }
    }

    #[test]
    fn test_valid_config() {
        let config = config(vec![
            AccountConfig::new("a", "imap.a.test", "u", "p"),
            AccountConfig::new("b", "imap.b.test", "u", "p"),
        ]);
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_no_accounts_is_valid() {
        assert!(validate(&config(Vec::new())).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut account = AccountConfig::new("a", " ", "", "");
        account.port = 0;
        account.timeout = Some(0);

        let mut config = config(vec![account]);
        config.check_interval = 0;
        config.timeout = Some(0);

        let errors = validate(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::ZeroInterval,
                ValidationError::ZeroTimeout,
                ValidationError::EmptyServer("a".to_string()),
                ValidationError::InvalidPort("a".to_string()),
                ValidationError::EmptyUsername("a".to_string()),
                ValidationError::EmptyPassword("a".to_string()),
                ValidationError::ZeroAccountTimeout("a".to_string()),
            ]
        );
    }

    #[test]
    fn test_duplicate_and_empty_names() {
        let config = config(vec![
            AccountConfig::new("work", "imap.a.test", "u", "p"),
            AccountConfig::new("", "imap.b.test", "u", "p"),
            AccountConfig::new("work", "imap.c.test", "u", "p"),
        ]);

        let errors = validate(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::EmptyName(1),
                ValidationError::DuplicateName("work".to_string()),
            ]
        );
        assert_eq!(errors[0].to_string(), "account #2 has no name");
        assert_eq!(errors[1].field(), "name");
    }

    #[test]
    fn test_line_breaks_rejected() {
        let mut account = AccountConfig::new("a", "imap.a.test", "u", "p\r\nA1 LOGOUT");
        account.mailbox = "INBOX\n".to_string();

        let errors = validate(&config(vec![account])).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::ControlCharacter {
                    account: "a".to_string(),
                    field: "password",
                },
                ValidationError::ControlCharacter {
                    account: "a".to_string(),
                    field: "mailbox",
                },
            ]
        );
        assert_eq!(errors[0].field(), "password");
        assert_eq!(
            errors[1].to_string(),
            "account 'a': mailbox must not contain CR, LF or NUL"
        );
    }

    #[test]
    fn test_non_ascii_password_is_valid() {
        let config = config(vec![AccountConfig::new("a", "imap.a.test", "u", "pässword")]);
        assert!(validate(&config).is_ok());
    }
}
