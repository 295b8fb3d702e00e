//! In-memory transport for driving the probe without a network.

#![allow(dead_code, clippy::unwrap_used)]

use std::collections::HashMap;
use std::io::{self, Cursor};
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use mailprobe_smtp::{CipherInfo, Connector, Error, PeerCertificate, Result, TlsInfo};

pub const HOST: &str = "mail.example.com";

/// Everything the client wrote to a mock stream.
#[derive(Debug, Clone, Default)]
pub struct Transcript(Arc<Mutex<Vec<u8>>>);

impl Transcript {
    pub fn text(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

/// Mock stream that returns predefined responses.
#[derive(Debug)]
pub struct MockStream {
    /// Responses to return (in order).
    responses: Cursor<Vec<u8>>,
    /// Never produce data, as a server that stopped answering.
    stalled: bool,
    sent: Transcript,
    cipher: Option<CipherInfo>,
}

impl MockStream {
    pub fn new(responses: &[u8]) -> (Self, Transcript) {
        let sent = Transcript::default();
        let stream = Self {
            responses: Cursor::new(responses.to_vec()),
            stalled: false,
            sent: sent.clone(),
            cipher: None,
        };
        (stream, sent)
    }

    /// Encrypted mock reporting a TLS 1.3 cipher suite.
    pub fn tls(responses: &[u8]) -> (Self, Transcript) {
        let (mut stream, sent) = Self::new(responses);
        stream.cipher = Some(CipherInfo {
            name: "TLS13_AES_256_GCM_SHA384".into(),
            protocol_version: "TLSv1_3".into(),
            secret_bits: Some(256),
        });
        (stream, sent)
    }

    pub fn stalled() -> Self {
        let (mut stream, _) = Self::tls(b"");
        stream.stalled = true;
        stream
    }
}

impl TlsInfo for MockStream {
    fn cipher(&self) -> Option<CipherInfo> {
        self.cipher.clone()
    }

    fn peer_certificate(&self) -> Option<PeerCertificate> {
        None
    }
}

impl AsyncRead for MockStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if self.stalled {
            return Poll::Pending;
        }

        let data = self.responses.get_ref();
        let pos = usize::try_from(self.responses.position()).unwrap();

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
        self.sent.0.lock().unwrap().extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

/// What one connector call hands back.
type Step = Result<MockStream>;

#[derive(Default)]
struct PortScript {
    implicit: Option<Step>,
    plain: Option<Step>,
    upgraded: Option<Step>,
}

/// Connector replaying a fixed script per port and recording every call.
#[derive(Default)]
pub struct ScriptedConnector {
    scripts: Mutex<HashMap<u16, PortScript>>,
    calls: Mutex<Vec<(&'static str, u16)>>,
}

impl ScriptedConnector {
    pub fn implicit(self, port: u16, step: Step) -> Self {
        self.scripts.lock().unwrap().entry(port).or_default().implicit = Some(step);
        self
    }

    pub fn plain(self, port: u16, step: Step) -> Self {
        self.scripts.lock().unwrap().entry(port).or_default().plain = Some(step);
        self
    }

    pub fn upgraded(self, port: u16, step: Step) -> Self {
        self.scripts.lock().unwrap().entry(port).or_default().upgraded = Some(step);
        self
    }

    pub fn calls(&self) -> Vec<(&'static str, u16)> {
        self.calls.lock().unwrap().clone()
    }

    fn next(&self, call: &'static str, port: u16) -> Step {
        self.calls.lock().unwrap().push((call, port));
        let mut scripts = self.scripts.lock().unwrap();
        let script = scripts.entry(port).or_default();
        let slot = match call {
            "connect_tls" => &mut script.implicit,
            "connect_plain" => &mut script.plain,
            _ => &mut script.upgraded,
        };
        slot.take()
            .unwrap_or_else(|| panic!("unscripted {call} on port {port}"))
    }
}

impl Connector for ScriptedConnector {
    type Stream = MockStream;

    async fn connect_tls(&self, _host: &str, port: u16) -> Result<MockStream> {
        self.next("connect_tls", port)
    }

    async fn connect_plain(&self, _host: &str, port: u16) -> Result<MockStream> {
        self.next("connect_plain", port)
    }

    async fn upgrade(&self, _stream: MockStream, _host: &str, port: u16) -> Result<MockStream> {
        self.next("upgrade", port)
    }
}

pub fn timeout(port: u16) -> Error {
    Error::ConnectTimeout {
        host: HOST.into(),
        port,
    }
}

pub fn tls_failure(port: u16) -> Error {
    Error::Tls {
        host: HOST.into(),
        port,
        reason: "received corrupt message of type InvalidContentType".into(),
    }
}

pub fn refused(port: u16) -> Error {
    Error::Connect {
        host: HOST.into(),
        port,
        source: io::Error::from(io::ErrorKind::ConnectionRefused),
    }
}

/// Concatenates reply fragments into one server script.
pub fn script(parts: &[&[u8]]) -> Vec<u8> {
    parts.concat()
}

/// Plaintext dialog up to a successful STARTTLS go-ahead.
pub const PLAIN_UP_TO_STARTTLS: &[u8] = b"220 mail.example.com ESMTP\r\n\
250-mail.example.com\r\n\
250-STARTTLS\r\n\
250 SIZE 10000000\r\n\
220 2.0.0 Ready to start TLS\r\n";
