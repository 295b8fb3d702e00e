//! Establishing an encrypted session: implicit TLS first, STARTTLS second.
//!
//! ```text
//! connect_tls ── ok ──────────────────────────────────────→ ImplicitTls
//!      │
//!      └─ timeout / TLS error ─→ connect_plain → EHLO → STARTTLS ─→ StartTls
//!      └─ anything else ───────→ error
//! ```
//!
//! The STARTTLS path is attempted exactly once, on a fresh connection; its
//! own failures are returned as-is.

use serde::Serialize;
use tracing::{info, warn};

use crate::command::Command;
use crate::connection::{Capabilities, Connector, ProbeConfig, Session};
use crate::error::{Error, Result};
use crate::types::ReplyCode;

/// Negotiation path that produced the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Protocol {
    /// TLS from the first byte (SMTPS, usually port 465).
    #[serde(rename = "implicit-tls")]
    ImplicitTls,
    /// Plaintext upgraded with STARTTLS (usually ports 25 and 587).
    #[serde(rename = "starttls")]
    StartTls,
}

impl Protocol {
    /// Returns the protocol label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ImplicitTls => "implicit-tls",
            Self::StartTls => "starttls",
        }
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An encrypted session and the path that produced it.
#[derive(Debug)]
pub struct Negotiated<S> {
    /// Session, positioned right before the audit's EHLO.
    pub session: Session<S>,
    /// Negotiation path used.
    pub protocol: Protocol,
}

/// Establishes an encrypted session to `config.host` on `port`.
///
/// # Errors
///
/// Returns the implicit TLS error unchanged unless it is a timeout or a TLS
/// failure; otherwise returns whatever the STARTTLS attempt fails with.
pub async fn negotiate<C: Connector>(
    connector: &C,
    config: &ProbeConfig,
    port: u16,
) -> Result<Negotiated<C::Stream>> {
    let host = config.host.as_str();

    let (session, protocol) = match implicit_tls(connector, config, port).await {
        Ok(session) => (session, Protocol::ImplicitTls),
        Err(e) if e.triggers_fallback() => {
            warn!(host, port, error = %e, "Implicit TLS failed, trying STARTTLS");
            (starttls(connector, config, port).await?, Protocol::StartTls)
        }
        Err(e) => return Err(e),
    };

    info!(host, port, %protocol, "Connected");
    Ok(Negotiated { session, protocol })
}

async fn implicit_tls<C: Connector>(
    connector: &C,
    config: &ProbeConfig,
    port: u16,
) -> Result<Session<C::Stream>> {
    let stream = connector.connect_tls(&config.host, port).await?;
    let mut session = Session::new(stream, &config.host, port, config.timeout);
    session.read_greeting().await?;
    Ok(session)
}

async fn starttls<C: Connector>(
    connector: &C,
    config: &ProbeConfig,
    port: u16,
) -> Result<Session<C::Stream>> {
    let host = config.host.as_str();
    let stream = connector.connect_plain(host, port).await?;
    let mut session = Session::new(stream, host, port, config.timeout);
    session.read_greeting().await?;

    let ehlo = Command::Ehlo {
        hostname: config.ehlo_identity.clone(),
    };
    let reply = session.send_command(&ehlo).await?;
    if reply.code != ReplyCode::OK {
        return Err(session.unexpected("EHLO", &reply));
    }
    if !Capabilities::from_ehlo(&reply).supports_starttls() {
        return Err(Error::protocol(host, port, "STARTTLS not advertised"));
    }

    let reply = session.send_command(&Command::StartTls).await?;
    if reply.code != ReplyCode::SERVICE_READY {
        return Err(session.unexpected("STARTTLS", &reply));
    }

    let stream = connector.upgrade(session.into_stream()?, host, port).await?;
    Ok(Session::new(stream, host, port, config.timeout))
}
