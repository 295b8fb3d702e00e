//! Post-handshake TLS introspection.

use std::net::IpAddr;

use chrono::{DateTime, Utc};
use rustls::ClientConnection;
use serde::Serialize;
use x509_parser::prelude::*;

/// Negotiated cipher suite of a TLS session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CipherInfo {
    /// IANA cipher suite name (e.g., `TLS13_AES_256_GCM_SHA384`).
    pub name: String,
    /// Protocol version (e.g., `TLSv1_3`).
    pub protocol_version: String,
    /// Strength of the bulk cipher key in bits, when known.
    pub secret_bits: Option<u16>,
}

/// Server certificate as reported by the TLS layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeerCertificate {
    /// Subject distinguished name.
    pub subject: String,
    /// Issuer distinguished name.
    pub issuer: String,
    /// Serial number, colon-separated hex.
    pub serial: String,
    /// Start of the validity period.
    pub not_before: Option<DateTime<Utc>>,
    /// End of the validity period.
    pub not_after: Option<DateTime<Utc>>,
    /// DNS names and IP addresses from the subjectAltName extension.
    pub subject_alt_names: Vec<String>,
}

/// Read access to the security properties of an established stream.
///
/// Both methods are best-effort: `None` means the stream is not encrypted or
/// the transport does not expose the value.
pub trait TlsInfo {
    /// Returns the negotiated cipher suite.
    fn cipher(&self) -> Option<CipherInfo>;

    /// Returns the server's leaf certificate.
    fn peer_certificate(&self) -> Option<PeerCertificate>;
}

pub(crate) fn cipher_info(conn: &ClientConnection) -> Option<CipherInfo> {
    let suite = conn.negotiated_cipher_suite()?.suite();
    let name = suite
        .as_str()
        .map_or_else(|| format!("{suite:?}"), str::to_owned);
    let protocol_version = conn.protocol_version().map_or_else(String::new, |version| {
        version
            .as_str()
            .map_or_else(|| format!("{version:?}"), str::to_owned)
    });

    Some(CipherInfo {
        secret_bits: secret_bits(&name),
        name,
        protocol_version,
    })
}

pub(crate) fn peer_certificate(conn: &ClientConnection) -> Option<PeerCertificate> {
    let leaf = conn.peer_certificates()?.first()?;
    PeerCertificate::from_der(leaf.as_ref())
}

/// Key size of the bulk cipher named in an IANA suite name.
fn secret_bits(suite: &str) -> Option<u16> {
    if suite.contains("AES_128") {
        Some(128)
    } else if suite.contains("AES_256") || suite.contains("CHACHA20") {
        Some(256)
    } else {
        None
    }
}

impl PeerCertificate {
    /// Decodes a DER certificate. Returns `None` if it cannot be parsed.
    #[must_use]
    pub fn from_der(der: &[u8]) -> Option<Self> {
        let (_, cert) = X509Certificate::from_der(der).ok()?;
        let validity = cert.validity();

        let subject_alt_names = cert
            .subject_alternative_name()
            .ok()
            .flatten()
            .map(|ext| {
                ext.value
                    .general_names
                    .iter()
                    .filter_map(|name| match name {
                        GeneralName::DNSName(dns) => Some((*dns).to_string()),
                        GeneralName::IPAddress(ip) => ip_to_string(ip),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default();

        Some(Self {
            subject: cert.subject().to_string(),
            issuer: cert.issuer().to_string(),
            serial: cert.raw_serial_as_string(),
            not_before: DateTime::from_timestamp(validity.not_before.timestamp(), 0),
            not_after: DateTime::from_timestamp(validity.not_after.timestamp(), 0),
            subject_alt_names,
        })
    }
}

fn ip_to_string(raw: &[u8]) -> Option<String> {
    let addr = match raw.len() {
        4 => IpAddr::from(<[u8; 4]>::try_from(raw).ok()?),
        16 => IpAddr::from(<[u8; 16]>::try_from(raw).ok()?),
        _ => return None,
    };
    Some(addr.to_string())
}
