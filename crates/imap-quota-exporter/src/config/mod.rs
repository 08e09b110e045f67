//! Exporter configuration.
//!
//! Loaded once at startup from a YAML document:
//!
//! ```yaml
//! check_interval: 900
//! timeout: 30
//! accounts:
//!   - name: personal
//!     server: imap.example.com
//!     port: 993
//!     username: me@example.com
//!     password: hunter2
//! ```

mod model;
mod validation;

pub use model::{
    AccountConfig, DEFAULT_CHECK_INTERVAL_SECS, DEFAULT_MAILBOX, DEFAULT_PORT, ExporterConfig,
};
pub use validation::{ValidationError, validate};
