//! # imap-quota-exporter
//!
//! Polls IMAP accounts for storage quota usage and exposes the figures as
//! Prometheus gauges.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use imap_quota_exporter::{ExporterConfig, ImapProbe, Metrics, Poller};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ExporterConfig::load("/app/config.yml")?;
//!     let metrics = Arc::new(Metrics::new()?);
//!
//!     let poller = Poller::new(config, ImapProbe, Arc::clone(&metrics));
//!     poller
//!         .run_until(async {
//!             let _ = tokio::signal::ctrl_c().await;
//!         })
//!         .await;
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`config`]: YAML configuration model and validation
//! - [`quota`]: quota reply flattening and `STORAGE` extraction
//! - [`metrics`]: the gauge registry and text exposition
//! - [`checker`]: one account's check cycle
//! - [`poller`]: the repeating pass over all accounts
//! - [`server`]: the HTTP scrape endpoint

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod checker;
pub mod config;
mod error;
pub mod metrics;
pub mod poller;
pub mod quota;
pub mod server;

pub use checker::{CheckOutcome, ImapProbe, QuotaProbe, check_account};
pub use config::{AccountConfig, ExporterConfig, ValidationError};
pub use error::{Error, Result};
pub use metrics::Metrics;
pub use poller::{PassSummary, Poller};
pub use quota::{QuotaSample, parse_quota};

/// Port the metrics endpoint listens on.
pub const METRICS_PORT: u16 = 9226;

/// Config file used when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "/app/config.yml";
