//! Error types for probe operations.

use std::io;

/// Result type alias for probe operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Probe error types.
///
/// Every variant raised while talking to a server carries the host and port
/// so a failure can be diagnosed from the message alone.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No response within the configured timeout.
    #[error("{host}:{port}: timed out")]
    ConnectTimeout {
        /// Target host.
        host: String,
        /// Target port.
        port: u16,
    },

    /// TLS handshake or certificate verification failed.
    #[error("{host}:{port}: TLS error: {reason}")]
    Tls {
        /// Target host.
        host: String,
        /// Target port.
        port: u16,
        /// Handshake failure as reported by the TLS layer.
        reason: String,
    },

    /// Host unreachable (DNS failure, connection refused, ...).
    #[error("{host}:{port}: connection failed: {source}")]
    Connect {
        /// Target host.
        host: String,
        /// Target port.
        port: u16,
        /// Underlying socket error.
        #[source]
        source: io::Error,
    },

    /// Unexpected reply status or missing capability.
    #[error("{host}:{port}: protocol error: {reason}")]
    Protocol {
        /// Target host.
        host: String,
        /// Target port.
        port: u16,
        /// What was expected and what the server sent instead.
        reason: String,
    },

    /// Authentication exchange completed but was rejected.
    #[error("{host}:{port}: authentication rejected with {code}: {message}")]
    Auth {
        /// Target host.
        host: String,
        /// Target port.
        port: u16,
        /// Reply code (e.g., 535).
        code: u16,
        /// Reply text from server.
        message: String,
    },

    /// Reply that does not follow the SMTP reply grammar.
    #[error("Malformed reply: {0}")]
    MalformedReply(String),

    /// Host name that cannot be used for certificate verification.
    #[error("Invalid hostname: {0}")]
    InvalidHostname(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`Error::ConnectTimeout`].
    ConnectTimeout,
    /// See [`Error::Tls`].
    Tls,
    /// See [`Error::Protocol`] and [`Error::MalformedReply`].
    Protocol,
    /// See [`Error::Auth`].
    Auth,
    /// DNS, refused connections, invalid host names and other I/O failures.
    Connectivity,
}

impl Error {
    /// Creates a protocol error for the given target.
    #[must_use]
    pub fn protocol(host: impl Into<String>, port: u16, reason: impl Into<String>) -> Self {
        Self::Protocol {
            host: host.into(),
            port,
            reason: reason.into(),
        }
    }

    /// Returns the classification of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::ConnectTimeout { .. } => ErrorKind::ConnectTimeout,
            Self::Tls { .. } => ErrorKind::Tls,
            Self::Protocol { .. } | Self::MalformedReply(_) => ErrorKind::Protocol,
            Self::Auth { .. } => ErrorKind::Auth,
            Self::Connect { .. } | Self::InvalidHostname(_) | Self::Io(_) => {
                ErrorKind::Connectivity
            }
        }
    }

    /// Returns true if this error is a timeout.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::ConnectTimeout { .. })
    }

    /// Returns true if a failed implicit TLS attempt with this error should
    /// be retried with STARTTLS.
    #[must_use]
    pub const fn triggers_fallback(&self) -> bool {
        matches!(self, Self::ConnectTimeout { .. } | Self::Tls { .. })
    }
}
