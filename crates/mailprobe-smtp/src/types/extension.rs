//! SMTP extension types.

/// SMTP extensions discovered from EHLO response.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Extension {
    /// STARTTLS - TLS upgrade
    StartTls,
    /// AUTH - Authentication, with the advertised mechanism names (uppercased)
    Auth(Vec<String>),
    /// Any other extension line, kept verbatim
    Unknown(String),
}

impl Extension {
    /// Parses an extension line from EHLO response.
    ///
    /// Keywords are matched case-insensitively. Lines that are not valid
    /// UTF-8 are parsed lossily.
    #[must_use]
    pub fn parse(line: &[u8]) -> Self {
        let text = String::from_utf8_lossy(line);
        let parts: Vec<&str> = text.split_whitespace().collect();
        if parts.is_empty() {
            return Self::Unknown(text.into_owned());
        }

        let keyword = parts[0].to_uppercase();
        match keyword.as_str() {
            "STARTTLS" => Self::StartTls,
            "AUTH" => Self::Auth(parts[1..].iter().map(|m| m.to_uppercase()).collect()),
            _ => Self::Unknown(text.into_owned()),
        }
    }
}

/// SASL authentication mechanism sent by the probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthMechanism {
    /// PLAIN - RFC 4616
    Plain,
}

impl AuthMechanism {
    /// Returns the mechanism name as advertised in EHLO.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Plain => "PLAIN",
        }
    }
}
