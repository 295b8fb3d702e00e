//! Opening and upgrading transport streams.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use rustls::ClientConfig;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;
use tracing::debug;

use super::stream::{SmtpStream, server_name};
use super::tls::TlsInfo;
use crate::error::{Error, Result};

/// Opens byte streams to a server.
///
/// Implementations must report a handshake failure as [`Error::Tls`], an
/// expired timeout as [`Error::ConnectTimeout`] and an unreachable host as
/// [`Error::Connect`]; the negotiator relies on that split to decide whether
/// to fall back to STARTTLS.
#[allow(async_fn_in_trait)]
pub trait Connector {
    /// Stream produced by this connector.
    type Stream: AsyncRead + AsyncWrite + Unpin + TlsInfo;

    /// Connects and performs a TLS handshake immediately (implicit TLS).
    async fn connect_tls(&self, host: &str, port: u16) -> Result<Self::Stream>;

    /// Connects without encryption.
    async fn connect_plain(&self, host: &str, port: u16) -> Result<Self::Stream>;

    /// Performs a TLS handshake over an existing plaintext stream.
    async fn upgrade(&self, stream: Self::Stream, host: &str, port: u16) -> Result<Self::Stream>;
}

/// TCP + rustls connector.
#[derive(Clone)]
pub struct RustlsConnector {
    tls: TlsConnector,
    timeout: Duration,
}

impl std::fmt::Debug for RustlsConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RustlsConnector")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl RustlsConnector {
    /// Creates a connector; `timeout` bounds both the TCP connect and the
    /// TLS handshake.
    #[must_use]
    pub fn new(config: Arc<ClientConfig>, timeout: Duration) -> Self {
        Self {
            tls: TlsConnector::from(config),
            timeout,
        }
    }

    async fn tcp(&self, host: &str, port: u16) -> Result<TcpStream> {
        match tokio::time::timeout(self.timeout, TcpStream::connect((host, port))).await {
            Ok(Ok(stream)) => Ok(stream),
            Ok(Err(e)) if e.kind() == io::ErrorKind::TimedOut => Err(timeout_error(host, port)),
            Ok(Err(source)) => Err(Error::Connect {
                host: host.to_string(),
                port,
                source,
            }),
            Err(_) => Err(timeout_error(host, port)),
        }
    }

    async fn handshake(
        &self,
        tcp: TcpStream,
        host: &str,
        port: u16,
    ) -> Result<TlsStream<TcpStream>> {
        let name = server_name(host)?;
        match tokio::time::timeout(self.timeout, self.tls.connect(name, tcp)).await {
            Ok(Ok(stream)) => {
                debug!(host, port, "TLS handshake complete");
                Ok(stream)
            }
            Ok(Err(e)) if e.kind() == io::ErrorKind::TimedOut => Err(timeout_error(host, port)),
            // Covers rustls alerts and verification failures as well as a
            // plaintext server closing the socket on our ClientHello.
            Ok(Err(e)) => Err(Error::Tls {
                host: host.to_string(),
                port,
                reason: e.to_string(),
            }),
            Err(_) => Err(timeout_error(host, port)),
        }
    }
}

impl Connector for RustlsConnector {
    type Stream = SmtpStream;

    async fn connect_tls(&self, host: &str, port: u16) -> Result<SmtpStream> {
        let tcp = self.tcp(host, port).await?;
        let tls = self.handshake(tcp, host, port).await?;
        Ok(SmtpStream::Tls(Box::new(tls)))
    }

    async fn connect_plain(&self, host: &str, port: u16) -> Result<SmtpStream> {
        Ok(SmtpStream::Plain(self.tcp(host, port).await?))
    }

    async fn upgrade(&self, stream: SmtpStream, host: &str, port: u16) -> Result<SmtpStream> {
        match stream {
            SmtpStream::Plain(tcp) => {
                let tls = self.handshake(tcp, host, port).await?;
                Ok(SmtpStream::Tls(Box::new(tls)))
            }
            SmtpStream::Tls(_) => Err(Error::protocol(host, port, "stream is already TLS")),
        }
    }
}

fn timeout_error(host: &str, port: u16) -> Error {
    Error::ConnectTimeout {
        host: host.to_string(),
        port,
    }
}
