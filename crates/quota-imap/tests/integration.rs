//! Integration tests for the IMAP client.
//!
//! These tests use a mock stream to simulate IMAP server responses
//! without requiring a real server connection.

use std::io::{self, Cursor};
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, ReadBuf};

use quota_imap::{Client, Config, Error, Fragment};

/// Mock stream that returns predefined responses.
struct MockStream {
    /// Responses to return (in order).
    responses: Cursor<Vec<u8>>,
    /// Captured commands sent by the client.
    sent: Arc<Mutex<Vec<u8>>>,
}

impl MockStream {
    fn new(responses: &[u8]) -> (Self, Arc<Mutex<Vec<u8>>>) {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let stream = Self {
            responses: Cursor::new(responses.to_vec()),
            sent: Arc::clone(&sent),
        };
        (stream, sent)
    }
}

impl AsyncRead for MockStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let data = self.responses.get_ref();
        let pos = self.responses.position() as usize;

        if pos >= data.len() {
            return Poll::Ready(Ok(()));
        }

        let remaining = &data[pos..];
        let to_read = remaining.len().min(buf.remaining());
        buf.put_slice(&remaining[..to_read]);
        self.responses.set_position((pos + to_read) as u64);

        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for MockStream {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.sent.lock().unwrap().extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

fn sent_text(sent: &Arc<Mutex<Vec<u8>>>) -> String {
    String::from_utf8(sent.lock().unwrap().clone()).unwrap()
}

#[tokio::test]
async fn test_quota_session() {
    let script = b"* OK [CAPABILITY IMAP4rev1 QUOTA] Dovecot ready.\r\n\
                   A0000 OK Logged in\r\n\
                   * QUOTAROOT INBOX \"User quota\"\r\n\
                   * QUOTA \"User quota\" (STORAGE 1234 5678)\r\n\
                   A0001 OK Getquotaroot completed\r\n\
                   * BYE Logging out\r\n\
                   A0002 OK Logout completed\r\n";

    let (stream, sent) = MockStream::new(script);
    let client = Client::from_stream(stream, None).await.unwrap();
    assert!(client.greeting().contains("Dovecot"));

    let mut client = client.login("alice", "secret").await.unwrap();
    let reply = client.get_quota_root("INBOX").await.unwrap();

    assert_eq!(
        reply,
        Fragment::Sequence(vec![
            Fragment::Sequence(vec![
                Fragment::text("QUOTAROOT"),
                Fragment::text("INBOX"),
                Fragment::text("User quota"),
            ]),
            Fragment::Sequence(vec![
                Fragment::text("QUOTA"),
                Fragment::text("User quota"),
                Fragment::Sequence(vec![
                    Fragment::text("STORAGE"),
                    Fragment::text("1234"),
                    Fragment::text("5678"),
                ]),
            ]),
        ])
    );

    client.logout().await.unwrap();

    assert_eq!(
        sent_text(&sent),
        "A0000 LOGIN alice secret\r\nA0001 GETQUOTAROOT INBOX\r\nA0002 LOGOUT\r\n"
    );
}

#[tokio::test]
async fn test_login_rejected() {
    let script = b"* OK ready\r\n\
                   A0000 NO [AUTHENTICATIONFAILED] Authentication failed.\r\n";

    let (stream, _) = MockStream::new(script);
    let client = Client::from_stream(stream, None).await.unwrap();

    let err = client.login("alice", "wrong").await.unwrap_err();
    assert!(matches!(err, Error::Auth(text) if text.contains("AUTHENTICATIONFAILED")));
}

#[tokio::test]
async fn test_non_ascii_password_sent_as_literal() {
    let script = "* OK ready\r\n\
                  + Ready for literal data\r\n\
                  A0000 OK Logged in\r\n";

    let (stream, sent) = MockStream::new(script.as_bytes());
    let client = Client::from_stream(stream, None).await.unwrap();
    client.login("alice", "pässword").await.unwrap();

    assert_eq!(sent_text(&sent), "A0000 LOGIN alice {9}\r\npässword\r\n");
}

#[tokio::test]
async fn test_literal_refused_before_continuation() {
    let script = b"* OK ready\r\n\
                   A0000 NO Literals not accepted\r\n";

    let (stream, sent) = MockStream::new(script);
    let client = Client::from_stream(stream, None).await.unwrap();

    let err = client.login("alice", "pässword").await.unwrap_err();
    assert!(matches!(err, Error::Auth(_)));
    assert_eq!(sent_text(&sent), "A0000 LOGIN alice {9}\r\n");
}

#[tokio::test]
async fn test_password_with_line_break_never_sent() {
    let (stream, sent) = MockStream::new(b"* OK ready\r\n");
    let client = Client::from_stream(stream, None).await.unwrap();

    let err = client
        .login("alice", "secret\r\nA0001 LOGOUT")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
    assert!(sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_quota_not_supported() {
    let script = b"* OK ready\r\n\
                   A0000 OK Logged in\r\n\
                   A0001 BAD Unknown command GETQUOTAROOT\r\n";

    let (stream, _) = MockStream::new(script);
    let client = Client::from_stream(stream, None).await.unwrap();
    let mut client = client.login("alice", "secret").await.unwrap();

    let err = client.get_quota_root("INBOX").await.unwrap_err();
    assert!(matches!(err, Error::Bad(_)));
}

#[tokio::test]
async fn test_bye_greeting() {
    let (stream, _) = MockStream::new(b"* BYE Too many connections\r\n");

    let err = Client::from_stream(stream, None).await.unwrap_err();
    assert!(matches!(err, Error::Bye(text) if text.contains("Too many")));
}

#[tokio::test]
async fn test_connection_closed_mid_session() {
    let (stream, _) = MockStream::new(b"* OK ready\r\n");
    let client = Client::from_stream(stream, None).await.unwrap();

    let err = client.login("alice", "secret").await.unwrap_err();
    assert!(err.is_transport());
}

#[tokio::test(start_paused = true)]
async fn test_silent_server_times_out() {
    // Keep the server half open but never write to it.
    let (client_half, _server_half) = tokio::io::duplex(1024);

    let err = Client::from_stream(client_half, Some(Duration::from_secs(10)))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Timeout(d) if d == Duration::from_secs(10)));
}

#[tokio::test]
async fn test_plain_tcp_round_trip() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let server = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        let (read, mut write) = socket.into_split();
        let mut lines = BufReader::new(read).lines();

        write.write_all(b"* OK test server\r\n").await.unwrap();
        while let Some(line) = lines.next_line().await.unwrap() {
            let (tag, command) = line.split_once(' ').unwrap();
            let reply = if command.starts_with("LOGIN") {
                format!("{tag} OK Logged in\r\n")
            } else if command.starts_with("GETQUOTAROOT") {
                format!(
                    "* QUOTAROOT INBOX \"\"\r\n* QUOTA \"\" (STORAGE 10 512)\r\n{tag} OK done\r\n"
                )
            } else {
                format!("* BYE bye\r\n{tag} OK Logout completed\r\n")
            };
            write.write_all(reply.as_bytes()).await.unwrap();
            if command == "LOGOUT" {
                break;
            }
        }
    });

    let config = Config::builder("127.0.0.1")
        .port(port)
        .timeout(Some(Duration::from_secs(5)))
        .build();
    let stream = quota_imap::connection::connect_plain(&config).await.unwrap();
    assert!(!stream.is_tls());

    let client = Client::from_stream(stream, config.io_timeout).await.unwrap();
    let mut client = client.login("bob", "pw").await.unwrap();
    let reply = client.get_quota_root(quota_imap::DEFAULT_MAILBOX).await.unwrap();
    client.logout().await.unwrap();
    server.await.unwrap();

    let Fragment::Sequence(items) = reply else {
        panic!("expected sequence");
    };
    assert_eq!(items.len(), 2);
}
