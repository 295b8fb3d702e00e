//! SMTP connection management.

mod config;
mod connector;
mod session;
mod stream;
mod tls;

pub use config::{
    DEFAULT_EHLO_IDENTITY, DEFAULT_PORTS, DEFAULT_TIMEOUT, ProbeConfig, ProbeConfigBuilder,
};
pub use connector::{Connector, RustlsConnector};
pub use session::Session;
pub use stream::{SmtpStream, default_tls_config, server_name};
pub use tls::{CipherInfo, PeerCertificate, TlsInfo};

use bytes::Bytes;

use crate::types::{Extension, Reply};

/// Server capabilities from an EHLO response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// Server self-identification (first EHLO line).
    pub server_name: String,
    /// Remaining EHLO lines in server order.
    pub lines: Vec<Bytes>,
}

impl Capabilities {
    /// Splits an EHLO reply into the identification line and capability lines.
    #[must_use]
    pub fn from_ehlo(reply: &Reply) -> Self {
        let mut lines = reply.message.iter().cloned();
        let server_name = lines
            .next()
            .map(|first| String::from_utf8_lossy(&first).trim().to_string())
            .unwrap_or_default();

        Self {
            server_name,
            lines: lines.collect(),
        }
    }

    /// Returns the parsed extensions.
    pub fn extensions(&self) -> impl Iterator<Item = Extension> + '_ {
        self.lines.iter().map(|line| Extension::parse(line))
    }

    /// Checks if STARTTLS is supported.
    #[must_use]
    pub fn supports_starttls(&self) -> bool {
        self.extensions().any(|ext| ext == Extension::StartTls)
    }

    /// Returns the mechanisms from every `AUTH` line, or `None` if the server
    /// advertises no `AUTH` line at all.
    #[must_use]
    pub fn auth_mechanisms(&self) -> Option<Vec<String>> {
        let mut found = false;
        let mut mechanisms = Vec::new();
        for ext in self.extensions() {
            if let Extension::Auth(tokens) = ext {
                found = true;
                mechanisms.extend(tokens);
            }
        }
        found.then_some(mechanisms)
    }

    /// Checks if an authentication mechanism is advertised.
    #[must_use]
    pub fn supports_auth(&self, mechanism: &str) -> bool {
        self.auth_mechanisms()
            .is_some_and(|mechs| mechs.iter().any(|m| m.eq_ignore_ascii_case(mechanism)))
    }
}
