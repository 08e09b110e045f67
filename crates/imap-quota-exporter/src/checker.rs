//! One account's check cycle.
//!
//! [`check_account`] fetches the raw quota reply through a [`QuotaProbe`],
//! parses it and writes the gauges. Every failure is absorbed into a
//! [`CheckOutcome`] so one broken account never affects the others.

use std::future::Future;
use std::time::Duration;

use quota_imap::connection::connect_tls;
use quota_imap::{Client, Fragment};
use tracing::{debug, error, info, warn};

use crate::config::AccountConfig;
use crate::metrics::Metrics;
use crate::quota::{QuotaSample, parse_quota};

/// Source of raw quota replies.
///
/// The production implementation is [`ImapProbe`]; tests substitute fakes.
pub trait QuotaProbe: Send + Sync {
    /// Fetches the `GETQUOTAROOT` reply for `account`'s mailbox.
    ///
    /// `timeout` bounds connecting and each protocol exchange when set.
    fn fetch_quota(
        &self,
        account: &AccountConfig,
        timeout: Option<Duration>,
    ) -> impl Future<Output = quota_imap::Result<Fragment>> + Send;
}

/// Queries quota over IMAP with implicit TLS.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImapProbe;

impl QuotaProbe for ImapProbe {
    async fn fetch_quota(
        &self,
        account: &AccountConfig,
        timeout: Option<Duration>,
    ) -> quota_imap::Result<Fragment> {
        let config = account.connection(timeout);
        let stream = connect_tls(&config).await?;

        let client = Client::from_stream(stream, config.io_timeout).await?;
        let mut client = client.login(&account.username, &account.password).await?;
        let reply = client.get_quota_root(&account.mailbox).await?;

        if let Err(e) = client.logout().await {
            debug!("Logout from {} failed: {e}", account.name);
        }
        Ok(reply)
    }
}

/// Result of checking one account.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckOutcome {
    /// The reply was parsed; gauges hold the new figures and `up` is 1.
    Updated(QuotaSample),
    /// The server answered but without a `STORAGE` figure; `up` is 1 and the
    /// previous usage is kept.
    Unparseable,
    /// Connecting, logging in or querying failed; `up` is 0 and the previous
    /// usage is kept.
    Down(String),
}

impl CheckOutcome {
    /// Returns `true` if the server was reachable.
    #[must_use]
    pub const fn is_up(&self) -> bool {
        !matches!(self, Self::Down(_))
    }
}

/// Checks one account and records the result in `metrics`.
///
/// Used and limit are written before `up`, so a scrape never sees `up=1`
/// paired with figures from an earlier cycle.
pub async fn check_account<P: QuotaProbe>(
    probe: &P,
    account: &AccountConfig,
    global_timeout: Option<Duration>,
    metrics: &Metrics,
) -> CheckOutcome {
    info!("Checking quota for {} ({})", account.name, account.username);

    match probe.fetch_quota(account, global_timeout).await {
        Ok(reply) => match parse_quota(&reply) {
            Some(sample) => {
                metrics.record_quota(&account.name, sample);
                metrics.set_up(&account.name, true);
                info!("{}: {sample}", account.name);
                CheckOutcome::Updated(sample)
            }
            None => {
                metrics.set_up(&account.name, true);
                warn!("{}: could not parse quota reply", account.name);
                debug!("{}: raw quota reply {reply:?}", account.name);
                CheckOutcome::Unparseable
            }
        },
        Err(e) => {
            metrics.set_up(&account.name, false);
            if e.is_transport() {
                error!(
                    "{}: cannot reach {}:{}: {e}",
                    account.name, account.server, account.port
                );
            } else {
                error!("{}: check failed: {e}", account.name);
            }
            CheckOutcome::Down(e.to_string())
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
    use std::sync::Mutex;

    /// Replays canned replies and remembers the timeouts it was given.
    struct FakeProbe {
        replies: Mutex<Vec<quota_imap::Result<Fragment>>>,
        timeouts: Mutex<Vec<Option<Duration>>>,
    }

    impl FakeProbe {
        fn new(mut replies: Vec<quota_imap::Result<Fragment>>) -> Self {
            replies.reverse();
            Self {
                replies: Mutex::new(replies),
                timeouts: Mutex::new(Vec::new()),
            }
        }
    }

    impl QuotaProbe for FakeProbe {
        async fn fetch_quota(
            &self,
            _account: &AccountConfig,
            timeout: Option<Duration>,
        ) -> quota_imap::Result<Fragment> {
            self.timeouts.lock().unwrap().push(timeout);
            self.replies.lock().unwrap().pop().unwrap()
        }
    }

    fn account() -> AccountConfig {
        AccountConfig::new("a", "mail.example.com", "user", "pass")
    }

    fn storage(used: u64, limit: u64) -> quota_imap::Result<Fragment> {
        Ok(Fragment::Sequence(vec![
            Fragment::text("QUOTAROOT"),
            Fragment::binary(format!("\"\" (STORAGE {used} {limit})").into_bytes()),
        ]))
    }

    fn refused() -> quota_imap::Result<Fragment> {
        Err(quota_imap::Error::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "connection refused",
        )))
    }

    #[tokio::test]
    async fn test_parsed_reply_updates_gauges() {
        let metrics = Metrics::new().unwrap();
        let probe = FakeProbe::new(vec![storage(500, 1000)]);

        let outcome = check_account(&probe, &account(), None, &metrics).await;

        assert_eq!(
            outcome,
            CheckOutcome::Updated(QuotaSample {
                used_kb: 500,
                limit_kb: 1000
            })
        );
        assert_eq!(metrics.used_kb("a"), Some(500));
        assert_eq!(metrics.limit_kb("a"), Some(1000));
        assert_eq!(metrics.up("a"), Some(1));
    }

    #[tokio::test]
    async fn test_failure_keeps_previous_usage() {
        let metrics = Metrics::new().unwrap();
        let probe = FakeProbe::new(vec![storage(500, 1000), refused()]);

        check_account(&probe, &account(), None, &metrics).await;
        let outcome = check_account(&probe, &account(), None, &metrics).await;

        assert!(matches!(outcome, CheckOutcome::Down(ref reason) if reason.contains("refused")));
        assert!(!outcome.is_up());
        assert_eq!(metrics.up("a"), Some(0));
        assert_eq!(metrics.used_kb("a"), Some(500));
        assert_eq!(metrics.limit_kb("a"), Some(1000));
    }

    #[tokio::test]
    async fn test_failure_before_any_success() {
        let metrics = Metrics::new().unwrap();
        let probe = FakeProbe::new(vec![Err(quota_imap::Error::Auth(
            "invalid credentials".to_string(),
        ))]);

        let outcome = check_account(&probe, &account(), None, &metrics).await;

        assert!(matches!(outcome, CheckOutcome::Down(_)));
        assert_eq!(metrics.up("a"), Some(0));
        assert_eq!(metrics.used_kb("a"), None);
    }

    #[tokio::test]
    async fn test_unparseable_reply_is_up() {
        let metrics = Metrics::new().unwrap();
        let probe = FakeProbe::new(vec![
            storage(1, 2),
            Ok(Fragment::Sequence(vec![Fragment::text("QUOTAROOT INBOX")])),
        ]);

        check_account(&probe, &account(), None, &metrics).await;
        let outcome = check_account(&probe, &account(), None, &metrics).await;

        assert_eq!(outcome, CheckOutcome::Unparseable);
        assert!(outcome.is_up());
        assert_eq!(metrics.up("a"), Some(1));
        assert_eq!(metrics.used_kb("a"), Some(1));
        assert_eq!(metrics.limit_kb("a"), Some(2));
    }

    #[tokio::test]
    async fn test_zero_limit() {
        let metrics = Metrics::new().unwrap();
        let probe = FakeProbe::new(vec![storage(42, 0)]);

        let outcome = check_account(&probe, &account(), None, &metrics).await;

        assert!(matches!(outcome, CheckOutcome::Updated(s) if s.percent().is_none()));
        assert_eq!(metrics.limit_kb("a"), Some(0));
    }

    #[tokio::test]
    async fn test_global_timeout_is_passed() {
        let metrics = Metrics::new().unwrap();
        let probe = FakeProbe::new(vec![storage(1, 2)]);

        check_account(&probe, &account(), Some(Duration::from_secs(7)), &metrics).await;

        assert_eq!(
            *probe.timeouts.lock().unwrap(),
            vec![Some(Duration::from_secs(7))]
        );
    }

    #[tokio::test]
    async fn test_imap_probe_unreachable_server() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let mut account = AccountConfig::new("closed", "127.0.0.1", "u", "p");
        account.port = port;
        let metrics = Metrics::new().unwrap();

        let outcome = check_account(&ImapProbe, &account, Some(Duration::from_secs(5)), &metrics).await;

        assert!(matches!(outcome, CheckOutcome::Down(_)));
        assert_eq!(metrics.up("closed"), Some(0));
    }
}
