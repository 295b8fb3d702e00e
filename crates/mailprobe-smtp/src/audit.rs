//! Capability discovery, AUTH PLAIN and the resulting audit record.

use bytes::Bytes;
use serde::{Serialize, Serializer};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::info;

use crate::command::Command;
use crate::connection::{Capabilities, CipherInfo, PeerCertificate, Session, TlsInfo};
use crate::error::{Error, Result};
use crate::negotiate::Protocol;
use crate::sasl::Credentials;
use crate::types::{AuthMechanism, ReplyCode};

/// Outcome of one successful probe.
///
/// Only [`audit`] builds this, after every check has passed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Audit {
    protocol: Protocol,
    port: u16,
    server_name: String,
    #[serde(serialize_with = "lossy_lines")]
    capabilities: Vec<Bytes>,
    cipher: Option<CipherInfo>,
    peer_certificate: Option<PeerCertificate>,
}

impl Audit {
    /// Negotiation path that succeeded.
    #[must_use]
    pub const fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// Port probed.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Server self-identification from EHLO.
    #[must_use]
    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    /// EHLO capability lines, in server order.
    #[must_use]
    pub fn capabilities(&self) -> &[Bytes] {
        &self.capabilities
    }

    /// Negotiated cipher suite, if the transport exposes it.
    #[must_use]
    pub const fn cipher(&self) -> Option<&CipherInfo> {
        self.cipher.as_ref()
    }

    /// Server certificate, if the transport exposes it.
    #[must_use]
    pub const fn peer_certificate(&self) -> Option<&PeerCertificate> {
        self.peer_certificate.as_ref()
    }
}

fn lossy_lines<S: Serializer>(
    lines: &[Bytes],
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_seq(lines.iter().map(|line| String::from_utf8_lossy(line)))
}

/// Discovers capabilities, authenticates with PLAIN and records the session.
///
/// No AUTH command is sent unless EHLO returned `250` and PLAIN is among the
/// advertised mechanisms.
///
/// # Errors
///
/// Returns [`Error::Protocol`] on a non-`250` EHLO reply or when PLAIN is not
/// advertised, and [`Error::Auth`] when the server answers AUTH with anything
/// but `235`.
pub async fn audit<S>(
    session: &mut Session<S>,
    protocol: Protocol,
    credentials: &Credentials,
    ehlo_identity: &str,
) -> Result<Audit>
where
    S: AsyncRead + AsyncWrite + Unpin + TlsInfo,
{
    let ehlo = Command::Ehlo {
        hostname: ehlo_identity.to_string(),
    };
    let reply = session.send_command(&ehlo).await?;
    if reply.code != ReplyCode::OK {
        return Err(session.unexpected("EHLO", &reply));
    }

    let capabilities = Capabilities::from_ehlo(&reply);
    if capabilities.server_name.is_empty() {
        return Err(Error::protocol(
            session.host(),
            session.port(),
            "EHLO reply carries no server name",
        ));
    }

    match capabilities.auth_mechanisms() {
        None => {
            return Err(Error::protocol(
                session.host(),
                session.port(),
                "no AUTH capability advertised",
            ));
        }
        Some(mechanisms) if !capabilities.supports_auth(AuthMechanism::Plain.as_str()) => {
            return Err(Error::protocol(
                session.host(),
                session.port(),
                format!(
                    "PLAIN not among advertised mechanisms [{}]",
                    mechanisms.join(" ")
                ),
            ));
        }
        Some(_) => {}
    }

    let auth = Command::Auth {
        mechanism: AuthMechanism::Plain,
        initial_response: Some(credentials.plain_response()),
    };
    let reply = session.send_command(&auth).await?;
    if reply.code != ReplyCode::AUTH_SUCCESS {
        return Err(Error::Auth {
            host: session.host().to_string(),
            port: session.port(),
            code: reply.code.as_u16(),
            message: reply.message_text(),
        });
    }

    info!(
        host = session.host(),
        port = session.port(),
        user = credentials.username(),
        "Authenticated"
    );

    let stream = session.stream();
    Ok(Audit {
        protocol,
        port: session.port(),
        server_name: capabilities.server_name,
        capabilities: capabilities.lines,
        cipher: stream.cipher(),
        peer_certificate: stream.peer_certificate(),
    })
}
