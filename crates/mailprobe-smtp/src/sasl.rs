//! SASL PLAIN (RFC 4616) credentials.
//!
//! The initial response is built by hand from the UTF-8 bytes of the
//! credentials. Generic login helpers in many SMTP stacks only accept ASCII
//! user names and passwords; a probe that silently fails for `Tűzoltó` is
//! wrong, so the encoding here must stay byte-exact and UTF-8 throughout.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Generates PLAIN initial response (RFC 4616).
///
/// Format: `\0<username>\0<password>` (UTF-8, then base64 encoded)
///
/// The authorization identity is left empty so the server derives it from
/// the authentication identity.
///
/// # Example
///
/// ```
/// use mailprobe_smtp::sasl::plain_response;
///
/// assert_eq!(plain_response("user", "pass"), "AHVzZXIAcGFzcw==");
/// ```
#[must_use]
pub fn plain_response(username: &str, password: &str) -> String {
    let auth_string = format!("\0{username}\0{password}");
    STANDARD.encode(auth_string.as_bytes())
}

/// User name and password for the AUTH PLAIN exchange.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    /// Creates credentials.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Returns the user name.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Returns the base64 PLAIN initial response for these credentials.
    #[must_use]
    pub fn plain_response(&self) -> String {
        plain_response(&self.username, &self.password)
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
