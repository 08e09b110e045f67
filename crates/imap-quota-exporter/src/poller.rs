//! The repeating pass over all configured accounts.

use std::fmt;
use std::future::Future;
use std::pin::pin;
use std::sync::Arc;

use tracing::info;

use crate::checker::{CheckOutcome, QuotaProbe, check_account};
use crate::config::ExporterConfig;
use crate::metrics::Metrics;

/// Counts of check outcomes in one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassSummary {
    /// Accounts checked.
    pub checked: usize,
    /// Checks that produced new figures.
    pub updated: usize,
    /// Checks whose reply had no `STORAGE` figure.
    pub unparseable: usize,
    /// Checks that could not reach or query the server.
    pub down: usize,
}

impl PassSummary {
    fn record(&mut self, outcome: &CheckOutcome) {
        self.checked += 1;
        match outcome {
            CheckOutcome::Updated(_) => self.updated += 1,
            CheckOutcome::Unparseable => self.unparseable += 1,
            CheckOutcome::Down(_) => self.down += 1,
        }
    }
}

impl fmt::Display for PassSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} checked, {} updated, {} unparseable, {} down",
            self.checked, self.updated, self.unparseable, self.down
        )
    }
}

/// Checks every account in order, then sleeps `check_interval`, until
/// shutdown.
pub struct Poller<P> {
    config: ExporterConfig,
    probe: P,
    metrics: Arc<Metrics>,
}

impl<P: QuotaProbe> Poller<P> {
    /// Creates a poller writing into `metrics`.
    pub const fn new(config: ExporterConfig, probe: P, metrics: Arc<Metrics>) -> Self {
        Self {
            config,
            probe,
            metrics,
        }
    }

    /// Checks every account once, sequentially, in configuration order.
    pub async fn run_pass(&self) -> PassSummary {
        let mut never = pin!(std::future::pending::<()>());
        self.pass(&mut never).await.unwrap_or_default()
    }

    /// Runs passes until `shutdown` completes.
    ///
    /// Shutdown is observed while sleeping and between accounts; a check
    /// already in progress runs to completion.
    pub async fn run<F: Future>(&self, shutdown: F) {
        let mut shutdown = pin!(shutdown);
        let interval = self.config.interval();

        loop {
            let Some(summary) = self.pass(&mut shutdown).await else {
                info!("Shutdown requested, stopping mid-pass");
                return;
            };
            info!("Pass complete: {summary}");

            info!("Next check in {} seconds", interval.as_secs());
            tokio::select! {
                () = tokio::time::sleep(interval) => {}
                _ = &mut shutdown => {
                    info!("Shutdown requested, stopping");
                    return;
                }
            }
        }
    }

    /// Runs passes until `shutdown` completes, abandoning any check in
    /// progress.
    ///
    /// A server that never answers cannot delay shutdown: the in-flight
    /// check is dropped along with its connection.
    pub async fn run_until<F: Future<Output = ()>>(&self, shutdown: F) {
        tokio::select! {
            () = self.run(std::future::pending::<()>()) => {}
            () = shutdown => info!("Shutdown requested, stopping"),
        }
    }

    // Returns `None` if `shutdown` fired before all accounts were checked.
    async fn pass<F: Future + Unpin>(&self, shutdown: &mut F) -> Option<PassSummary> {
        let mut summary = PassSummary::default();
        for account in &self.config.accounts {
            if fired(shutdown).await {
                return None;
            }
            let outcome = check_account(
                &self.probe,
                account,
                self.config.global_timeout(),
                &self.metrics,
            )
            .await;
            summary.record(&outcome);
        }
        Some(summary)
    }
}

// Polls `shutdown` once without waiting.
async fn fired<F: Future + Unpin>(shutdown: &mut F) -> bool {
    tokio::select! {
        biased;
        _ = shutdown => true,
        () = std::future::ready(()) => false,
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
    use std::sync::Mutex;
    use std::time::Duration;

    use quota_imap::Fragment;
    use tokio::time::Instant;

    use crate::config::AccountConfig;

    /// Records which account was checked and when.
    #[derive(Default)]
    struct RecordingProbe {
        calls: Mutex<Vec<(String, Instant)>>,
    }

    impl QuotaProbe for RecordingProbe {
        async fn fetch_quota(
            &self,
            account: &AccountConfig,
            _timeout: Option<Duration>,
        ) -> quota_imap::Result<Fragment> {
            self.calls
                .lock()
                .unwrap()
                .push((account.name.clone(), Instant::now()));
            match account.name.as_str() {
                "down" => Err(quota_imap::Error::Timeout(Duration::from_secs(1))),
                "odd" => Ok(Fragment::text("QUOTAROOT INBOX")),
                _ => Ok(Fragment::text("STORAGE 10 100")),
            }
        }
    }

    fn config(names: &[&str], check_interval: u64) -> ExporterConfig {
        ExporterConfig {
            check_interval,
            timeout: None,
            accounts: names
                .iter()
                .map(|n| AccountConfig::new(*n, "mail.example.com", "u", "p"))
                .collect(),
        }
    }

    fn poller(names: &[&str], check_interval: u64) -> Poller<RecordingProbe> {
        Poller::new(
            config(names, check_interval),
            RecordingProbe::default(),
            Arc::new(Metrics::new().unwrap()),
        )
    }

    #[tokio::test]
    async fn test_pass_checks_in_order() {
        let poller = poller(&["a", "down", "odd", "b"], 5);

        let summary = poller.run_pass().await;

        assert_eq!(
            summary,
            PassSummary {
                checked: 4,
                updated: 2,
                unparseable: 1,
                down: 1,
            }
        );
        let names: Vec<_> = poller
            .probe
            .calls
            .lock()
            .unwrap()
            .iter()
            .map(|(n, _)| n.clone())
            .collect();
        assert_eq!(names, ["a", "down", "odd", "b"]);
        assert_eq!(poller.metrics.up("b"), Some(1));
        assert_eq!(summary.to_string(), "4 checked, 2 updated, 1 unparseable, 1 down");
    }

    #[tokio::test(start_paused = true)]
    async fn test_passes_are_interval_apart() {
        let poller = poller(&["a", "b"], 5);

        poller.run(tokio::time::sleep(Duration::from_secs(12))).await;

        let calls = poller.probe.calls.lock().unwrap();
        // Passes at t=0, 5 and 10; shutdown at 12 interrupts the sleep.
        assert_eq!(calls.len(), 6);
        for pass in calls.chunks(2) {
            assert_eq!(pass[0].0, "a");
            assert_eq!(pass[1].0, "b");
        }
        for (prev, next) in calls.iter().step_by(2).zip(calls.iter().step_by(2).skip(1)) {
            assert!(next.1 - prev.1 >= Duration::from_secs(5));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_before_first_check() {
        let poller = poller(&["a", "b"], 5);

        poller.run(std::future::ready(())).await;

        assert!(poller.probe.calls.lock().unwrap().is_empty());
        assert_eq!(poller.metrics.up("a"), None);
    }

    /// Never answers, like a server that accepted the connection and went
    /// silent with no timeout configured.
    struct SilentProbe;

    impl QuotaProbe for SilentProbe {
        async fn fetch_quota(
            &self,
            _account: &AccountConfig,
            _timeout: Option<Duration>,
        ) -> quota_imap::Result<Fragment> {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_abandons_hung_check() {
        let poller = Poller::new(
            config(&["a"], 60),
            SilentProbe,
            Arc::new(Metrics::new().unwrap()),
        );

        let stopped = tokio::time::timeout(
            Duration::from_secs(3600),
            poller.run_until(tokio::time::sleep(Duration::from_secs(1))),
        )
        .await;

        assert!(stopped.is_ok());
        assert_eq!(poller.metrics.up("a"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_until_keeps_polling() {
        let poller = poller(&["a", "b"], 5);

        poller
            .run_until(tokio::time::sleep(Duration::from_secs(12)))
            .await;

        assert_eq!(poller.probe.calls.lock().unwrap().len(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_account_does_not_stop_pass() {
        let poller = poller(&["down", "a"], 60);

        poller.run(tokio::time::sleep(Duration::from_secs(1))).await;

        assert_eq!(poller.metrics.up("down"), Some(0));
        assert_eq!(poller.metrics.up("a"), Some(1));
        assert_eq!(poller.metrics.used_kb("a"), Some(10));
    }
}
