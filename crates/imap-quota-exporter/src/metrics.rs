//! Gauge registry for quota figures.

use prometheus::{Encoder, IntGaugeVec, Opts, Registry, TextEncoder};
use tracing::error;

use crate::Result;
use crate::quota::QuotaSample;

/// Gauge holding the KiB in use.
pub const QUOTA_USED: &str = "imap_quota_used_kb";
/// Gauge holding the KiB allowed.
pub const QUOTA_LIMIT: &str = "imap_quota_limit_kb";
/// Gauge set to 1 when the last check reached the server, 0 otherwise.
pub const UP: &str = "imap_up";

/// Label carrying the account name.
pub const ACCOUNT_LABEL: &str = "account";

/// Content type of [`Metrics::render`] output.
pub const CONTENT_TYPE: &str = prometheus::TEXT_FORMAT;

/// The exporter's three gauge families, keyed by account.
///
/// Series are created on first write and never removed, so a failing
/// account keeps reporting its last observed usage alongside `imap_up 0`.
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    used: IntGaugeVec,
    limit: IntGaugeVec,
    up: IntGaugeVec,
}

impl Metrics {
    /// Creates and registers the gauge families.
    ///
    /// # Errors
    ///
    /// Returns an error if registration fails.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let used = gauge(&registry, QUOTA_USED, "IMAP quota used in KB")?;
        let limit = gauge(&registry, QUOTA_LIMIT, "IMAP quota limit in KB")?;
        let up = gauge(&registry, UP, "IMAP connection status")?;

        Ok(Self {
            registry,
            used,
            limit,
            up,
        })
    }

    /// Sets used and limit for `account`.
    pub fn record_quota(&self, account: &str, sample: QuotaSample) {
        self.used
            .with_label_values(&[account])
            .set(saturate(sample.used_kb));
        self.limit
            .with_label_values(&[account])
            .set(saturate(sample.limit_kb));
    }

    /// Sets the reachability gauge for `account`.
    pub fn set_up(&self, account: &str, up: bool) {
        self.up.with_label_values(&[account]).set(i64::from(up));
    }

    /// Renders every family in the Prometheus text format.
    #[must_use]
    pub fn render(&self) -> String {
        let mut buf = Vec::new();
        if let Err(e) = TextEncoder::new().encode(&self.registry.gather(), &mut buf) {
            error!(error = %e, "failed to encode metrics");
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    /// Returns the current `imap_quota_used_kb` value for `account`, if set.
    #[must_use]
    pub fn used_kb(&self, account: &str) -> Option<i64> {
        self.read(QUOTA_USED, account)
    }

    /// Returns the current `imap_quota_limit_kb` value for `account`, if set.
    #[must_use]
    pub fn limit_kb(&self, account: &str) -> Option<i64> {
        self.read(QUOTA_LIMIT, account)
    }

    /// Returns the current `imap_up` value for `account`, if set.
    #[must_use]
    pub fn up(&self, account: &str) -> Option<i64> {
        self.read(UP, account)
    }

    // Looks the series up through a gather so reading never creates it.
    #[allow(clippy::cast_possible_truncation)]
    fn read(&self, family: &str, account: &str) -> Option<i64> {
        self.registry
            .gather()
            .iter()
            .find(|f| f.get_name() == family)?
            .get_metric()
            .iter()
            .find(|m| {
                m.get_label()
                    .iter()
                    .any(|l| l.get_name() == ACCOUNT_LABEL && l.get_value() == account)
            })
            .map(|m| m.get_gauge().get_value() as i64)
    }
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics").finish_non_exhaustive()
    }
}

fn gauge(registry: &Registry, name: &str, help: &str) -> Result<IntGaugeVec> {
    let vec = IntGaugeVec::new(Opts::new(name, help), &[ACCOUNT_LABEL])?;
    registry.register(Box::new(vec.clone()))?;
    Ok(vec)
}

fn saturate(kb: u64) -> i64 {
    i64::try_from(kb).unwrap_or(i64::MAX)
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
    fn test_empty_until_written() {
        let metrics = Metrics::new().unwrap();
        assert_eq!(metrics.up("a"), None);
        assert!(!metrics.render().contains("account=\"a\""));
        // Reading must not have created a series.
        assert_eq!(metrics.used_kb("a"), None);
    }

    #[test]
    fn test_record_and_render() {
        let metrics = Metrics::new().unwrap();
        metrics.record_quota(
            "a",
            QuotaSample {
                used_kb: 500,
                limit_kb: 1000,
            },
        );
        metrics.set_up("a", true);

        assert_eq!(metrics.used_kb("a"), Some(500));
        assert_eq!(metrics.limit_kb("a"), Some(1000));
        assert_eq!(metrics.up("a"), Some(1));

        let text = metrics.render();
        assert!(text.contains("# TYPE imap_quota_used_kb gauge"));
        assert!(text.contains("imap_quota_used_kb{account=\"a\"} 500"));
        assert!(text.contains("imap_quota_limit_kb{account=\"a\"} 1000"));
        assert!(text.contains("imap_up{account=\"a\"} 1"));
    }

    #[test]
    fn test_down_keeps_usage() {
        let metrics = Metrics::new().unwrap();
        metrics.record_quota(
            "a",
            QuotaSample {
                used_kb: 7,
                limit_kb: 9,
            },
        );
        metrics.set_up("a", true);
        metrics.set_up("a", false);

        assert_eq!(metrics.up("a"), Some(0));
        assert_eq!(metrics.used_kb("a"), Some(7));
        assert_eq!(metrics.limit_kb("a"), Some(9));
    }

    #[test]
    fn test_accounts_are_independent() {
        let metrics = Metrics::new().unwrap();
        metrics.set_up("a", true);
        metrics.set_up("b", false);

        assert_eq!(metrics.up("a"), Some(1));
        assert_eq!(metrics.up("b"), Some(0));
        assert_eq!(metrics.used_kb("b"), None);
    }

    #[test]
    fn test_huge_values_saturate() {
        let metrics = Metrics::new().unwrap();
        metrics.record_quota(
            "a",
            QuotaSample {
                used_kb: u64::MAX,
                limit_kb: 1,
            },
        );
        assert_eq!(metrics.used_kb("a"), Some(i64::MAX));
        assert_eq!(metrics.limit_kb("a"), Some(1));
    }

    #[test]
    fn test_help_text() {
        let metrics = Metrics::new().unwrap();
        metrics.set_up("a", true);
        let text = metrics.render();
        assert!(text.contains("# HELP imap_up IMAP connection status\n"));
        assert!(text.contains("# HELP imap_quota_used_kb IMAP quota used in KB\n"));
        assert!(text.contains("# HELP imap_quota_limit_kb IMAP quota limit in KB\n"));
    }

    #[test]
    fn test_content_type() {
        assert_eq!(CONTENT_TYPE, "text/plain; version=0.0.4");
    }
}
