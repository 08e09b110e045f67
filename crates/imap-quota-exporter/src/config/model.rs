//! Configuration model types.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use super::validation::validate;
use crate::{Error, Result};

/// Default IMAP port (implicit TLS).
pub const DEFAULT_PORT: u16 = 993;

/// Default seconds between passes (15 minutes).
pub const DEFAULT_CHECK_INTERVAL_SECS: u64 = 900;

/// Mailbox whose quota root is queried unless overridden.
pub const DEFAULT_MAILBOX: &str = quota_imap::DEFAULT_MAILBOX;

/// One monitored IMAP account.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct AccountConfig {
    /// Unique name, used as the `account` metric label.
    pub name: String,
    /// Server hostname.
    pub server: String,
    /// Server port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Login username.
    pub username: String,
    /// Login password.
    pub password: String,
    /// Mailbox passed to `GETQUOTAROOT`.
    #[serde(default = "default_mailbox")]
    pub mailbox: String,
    /// Network timeout in seconds for this account, overriding the global one.
    #[serde(default)]
    pub timeout: Option<u64>,
}

impl AccountConfig {
    /// Creates an account with default port and mailbox.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        server: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            server: server.into(),
            port: DEFAULT_PORT,
            username: username.into(),
            password: password.into(),
            mailbox: default_mailbox(),
            timeout: None,
        }
    }

    /// Builds the connection settings, applying this account's timeout or
    /// else `global_timeout`.
    #[must_use]
    pub fn connection(&self, global_timeout: Option<Duration>) -> quota_imap::Config {
        let timeout = self.timeout.map(Duration::from_secs).or(global_timeout);
        quota_imap::Config::builder(self.server.as_str())
            .port(self.port)
            .timeout(timeout)
            .build()
    }
}

impl std::fmt::Debug for AccountConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountConfig")
            .field("name", &self.name)
            .field("server", &self.server)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("mailbox", &self.mailbox)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Whole exporter configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ExporterConfig {
    /// Seconds to sleep between passes.
    #[serde(default = "default_check_interval")]
    pub check_interval: u64,
    /// Network timeout in seconds for every account. Unset means wait
    /// indefinitely.
    #[serde(default)]
    pub timeout: Option<u64>,
    /// Accounts, checked in this order.
    pub accounts: Vec<AccountConfig>,
}

impl ExporterConfig {
    /// Reads, parses and validates the config file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid YAML for
    /// this structure, or fails validation.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "loading config");

        let text = std::fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text)
    }

    /// Parses and validates a YAML document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document does not match the structure or
    /// fails validation.
    pub fn from_yaml(text: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(text)?;
        validate(&config).map_err(Error::ConfigInvalid)?;
        Ok(config)
    }

    /// Returns the sleep between passes.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_secs(self.check_interval)
    }

    /// Returns the global network timeout, if any.
    #[must_use]
    pub fn global_timeout(&self) -> Option<Duration> {
        self.timeout.map(Duration::from_secs)
    }
}

const fn default_port() -> u16 {
    DEFAULT_PORT
}

const fn default_check_interval() -> u64 {
    DEFAULT_CHECK_INTERVAL_SECS
}

fn default_mailbox() -> String {
    DEFAULT_MAILBOX.to_string()
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
    use std::io::Write;

    const MINIMAL: &str = r"
accounts:
  - name: personal
    server: imap.example.com
    username: me@example.com
    password: hunter2
";

    #[test]
    fn test_defaults_applied() {
        let config = ExporterConfig::from_yaml(MINIMAL).unwrap();

        assert_eq!(config.check_interval, 900);
        assert_eq!(config.interval(), Duration::from_secs(900));
        assert_eq!(config.timeout, None);

        let account = &config.accounts[0];
        assert_eq!(account.name, "personal");
        assert_eq!(account.port, 993);
        assert_eq!(account.mailbox, "INBOX");
        assert_eq!(account.timeout, None);
    }

    #[test]
    fn test_full_document() {
        let yaml = r"
check_interval: 5
timeout: 20
accounts:
  - name: a
    server: mail.a.test
    port: 1993
    username: ua
    password: pa
  - name: b
    server: mail.b.test
    username: ub
    password: pb
    mailbox: Archive
    timeout: 3
";
        let config = ExporterConfig::from_yaml(yaml).unwrap();

        assert_eq!(config.check_interval, 5);
        assert_eq!(config.accounts.len(), 2);
        assert_eq!(config.accounts[0].name, "a");
        assert_eq!(config.accounts[0].port, 1993);
        assert_eq!(config.accounts[1].mailbox, "Archive");

        let a = config.accounts[0].connection(config.global_timeout());
        assert_eq!(a.address(), "mail.a.test:1993");
        assert_eq!(a.io_timeout, Some(Duration::from_secs(20)));

        let b = config.accounts[1].connection(config.global_timeout());
        assert_eq!(b.connect_timeout, Some(Duration::from_secs(3)));
    }

    #[test]
    fn test_no_timeout_means_unbounded() {
        let account = AccountConfig::new("x", "imap.x.test", "u", "p");
        let connection = account.connection(None);
        assert_eq!(connection.connect_timeout, None);
        assert_eq!(connection.io_timeout, None);
    }

    #[test]
    fn test_missing_required_field() {
        let yaml = r"
accounts:
  - name: personal
    server: imap.example.com
    username: me@example.com
";
        let err = ExporterConfig::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, Error::ConfigParse(_)));
        assert!(err.to_string().contains("password"));
    }

    #[test]
    fn test_missing_accounts() {
        let err = ExporterConfig::from_yaml("check_interval: 60\n").unwrap_err();
        assert!(matches!(err, Error::ConfigParse(_)));
    }

    #[test]
    fn test_validation_failure_surfaces() {
        let yaml = r"
check_interval: 0
accounts:
  - name: ''
    server: imap.example.com
    username: u
    password: p
";
        let err = ExporterConfig::from_yaml(yaml).unwrap_err();
        let Error::ConfigInvalid(errors) = &err else {
            panic!("expected validation error, got {err:?}");
        };
        assert!(errors.contains(&crate::ValidationError::ZeroInterval));
        assert!(err.to_string().contains("check_interval"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MINIMAL.as_bytes()).unwrap();

        let config = ExporterConfig::load(file.path()).unwrap();
        assert_eq!(config.accounts.len(), 1);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.yml");

        let err = ExporterConfig::load(&path).unwrap_err();
        assert!(matches!(err, Error::ConfigRead { .. }));
        assert!(err.to_string().contains("absent.yml"));
    }

    #[test]
    fn test_debug_redacts_password() {
        let account = AccountConfig::new("x", "imap.x.test", "u", "hunter2");
        let debug = format!("{account:?}");
        assert!(!debug.contains("hunter2"));
    }
}
