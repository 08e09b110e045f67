//! End-to-end tests: config file to rendered exposition.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use imap_quota_exporter::{
    AccountConfig, CheckOutcome, ExporterConfig, ImapProbe, Metrics, PassSummary, Poller,
    QuotaProbe, server,
};
use quota_imap::Fragment;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

const CONFIG: &str = "
check_interval: 5
accounts:
  - name: a
    server: mail.a.test
    username: alice
    password: secret-a
  - name: b
    server: mail.b.test
    username: bob
    password: secret-b
";

/// Answers with a fixed quota for account `a` and fails for everyone else.
struct OnlyA;

impl QuotaProbe for OnlyA {
    async fn fetch_quota(
        &self,
        account: &AccountConfig,
        _timeout: Option<Duration>,
    ) -> quota_imap::Result<Fragment> {
        if account.name == "a" {
            Ok(Fragment::Sequence(vec![
                Fragment::from_bytes(b"QUOTAROOT INBOX \"\"\r\n"),
                Fragment::from_bytes(b"QUOTA \"\" (STORAGE 1234 5678)\r\n"),
            ]))
        } else {
            Err(quota_imap::Error::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "connection refused",
            )))
        }
    }
}

fn load_config() -> ExporterConfig {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(CONFIG.as_bytes()).unwrap();
    ExporterConfig::load(file.path()).unwrap()
}

#[tokio::test]
async fn test_one_pass_exposes_every_account() {
    let metrics = Arc::new(Metrics::new().unwrap());
    let poller = Poller::new(load_config(), OnlyA, Arc::clone(&metrics));

    let summary = poller.run_pass().await;

    assert_eq!(
        summary,
        PassSummary {
            checked: 2,
            updated: 1,
            unparseable: 0,
            down: 1,
        }
    );
    let text = metrics.render();
    assert!(text.contains("imap_up{account=\"a\"} 1"));
    assert!(text.contains("imap_up{account=\"b\"} 0"));
    assert!(text.contains("imap_quota_used_kb{account=\"a\"} 1234"));
    assert!(text.contains("imap_quota_limit_kb{account=\"a\"} 5678"));
    assert!(!text.contains("imap_quota_used_kb{account=\"b\"}"));
}

#[tokio::test]
async fn test_unreachable_servers_are_down() {
    // Reserve two ports, then close them so connecting is refused.
    let mut ports = Vec::new();
    for _ in 0..2 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        ports.push(listener.local_addr().unwrap().port());
    }

    let yaml = format!(
        "
timeout: 5
accounts:
  - name: a
    server: 127.0.0.1
    port: {}
    username: alice
    password: x
  - name: b
    server: 127.0.0.1
    port: {}
    username: bob
    password: y
",
        ports[0], ports[1]
    );
    let config = ExporterConfig::from_yaml(&yaml).unwrap();
    let metrics = Arc::new(Metrics::new().unwrap());

    let account = config.accounts[0].clone();
    let outcome =
        imap_quota_exporter::check_account(&ImapProbe, &account, config.global_timeout(), &metrics)
            .await;
    assert!(matches!(outcome, CheckOutcome::Down(_)));

    let summary = Poller::new(config, ImapProbe, Arc::clone(&metrics))
        .run_pass()
        .await;
    assert_eq!(summary.down, 2);

    let text = metrics.render();
    assert!(text.contains("imap_up{account=\"a\"} 0"));
    assert!(text.contains("imap_up{account=\"b\"} 0"));
}

#[tokio::test]
async fn test_scrape_over_http() {
    let metrics = Arc::new(Metrics::new().unwrap());
    Poller::new(load_config(), OnlyA, Arc::clone(&metrics))
        .run_pass()
        .await;

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(server::serve(listener, Arc::clone(&metrics)));

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"GET /metrics HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();

    assert!(response.starts_with("HTTP/1.1 200"));
    assert!(response.contains("text/plain; version=0.0.4"));
    assert!(response.contains("imap_up{account=\"a\"} 1"));
    assert!(response.contains("imap_up{account=\"b\"} 0"));
}

#[test]
fn test_invalid_config_reports_every_problem() {
    let yaml = "
check_interval: 0
accounts:
  - name: a
    server: ''
    username: u
    password: p
  - name: a
    server: s
    username: u
    password: ''
";
    let err = ExporterConfig::from_yaml(yaml).unwrap_err();
    let message = err.to_string();

    assert!(message.contains("; "));
    assert!(matches!(
        err,
        imap_quota_exporter::Error::ConfigInvalid(ref errors) if errors.len() == 4
    ));
}

#[test]
fn test_missing_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = ExporterConfig::load(dir.path().join("absent.yml")).unwrap_err();
    assert!(matches!(err, imap_quota_exporter::Error::ConfigRead { .. }));
}
