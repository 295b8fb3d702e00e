//! # mailprobe-smtp
//!
//! Checks that an SMTP server offers encrypted, authenticated submission and
//! that a given credential is accepted.
//!
//! One probe per port:
//!
//! ```text
//! Init → Connected → Upgraded (STARTTLS only) → CapabilitiesKnown
//!      → Authenticated → Done
//! ```
//!
//! Any failing step ends the attempt with an [`Error`]; nothing is retried
//! except the single implicit-TLS → STARTTLS fallback in [`negotiate()`].
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailprobe_smtp::{Credentials, ProbeConfig, probe_ports};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ProbeConfig::builder("mail.example.com").ports([465, 587]).build();
//!     let credentials = Credentials::new("user@example.com", "pässwörd€");
//!
//!     for outcome in probe_ports(&config, &credentials).await {
//!         match outcome.result {
//!             Ok(audit) => println!("{}: {}", outcome.port, audit.protocol()),
//!             Err(e) => eprintln!("{e}"),
//!         }
//!     }
//! }
//! ```
//!
//! ## Modules
//!
//! - [`audit`]: EHLO, AUTH PLAIN and the [`Audit`] record
//! - [`command`]: SMTP command builders
//! - [`connection`]: Streams, sessions, configuration and TLS introspection
//! - [`negotiate`]: Implicit TLS with STARTTLS fallback
//! - [`parser`]: Response parser
//! - [`probe`]: Multi-port orchestration
//! - [`sasl`]: PLAIN credentials
//! - [`types`]: Core SMTP types (extensions, replies)

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod audit;
pub mod command;
pub mod connection;
mod error;
pub mod negotiate;
pub mod parser;
pub mod probe;
pub mod sasl;
pub mod types;

pub use audit::{Audit, audit};
pub use connection::{
    Capabilities, CipherInfo, Connector, PeerCertificate, ProbeConfig, ProbeConfigBuilder,
    RustlsConnector, Session, SmtpStream, TlsInfo,
};
pub use error::{Error, ErrorKind, Result};
pub use negotiate::{Negotiated, Protocol, negotiate};
pub use probe::{PortOutcome, probe_port, probe_ports, probe_ports_with};
pub use sasl::Credentials;
pub use types::{AuthMechanism, Extension, Reply, ReplyCode};
