//! Probe configuration types.

use std::sync::Arc;
use std::time::Duration;

use rustls::ClientConfig;

use super::stream::default_tls_config;

/// Ports probed when none are given: relay, submissions, submission.
pub const DEFAULT_PORTS: [u16; 3] = [25, 465, 587];

/// Timeout applied to each connect, handshake and reply read.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Name announced in EHLO when none is given.
pub const DEFAULT_EHLO_IDENTITY: &str = "localhost";

/// Probe configuration.
///
/// The TLS configuration is shared read-only between attempts.
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Server hostname or IP literal.
    pub host: String,
    /// Ports to probe, in order.
    pub ports: Vec<u16>,
    /// Per-operation timeout.
    pub timeout: Duration,
    /// Name sent with EHLO.
    pub ehlo_identity: String,
    /// TLS client configuration used on both negotiation paths.
    pub tls: Arc<ClientConfig>,
}

impl ProbeConfig {
    /// Creates a configuration probing the default ports.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        ProbeConfigBuilder::new(host).build()
    }

    /// Creates a configuration builder.
    #[must_use]
    pub fn builder(host: impl Into<String>) -> ProbeConfigBuilder {
        ProbeConfigBuilder::new(host)
    }
}

/// Builder for probe configuration.
#[derive(Debug, Clone)]
pub struct ProbeConfigBuilder {
    host: String,
    ports: Option<Vec<u16>>,
    timeout: Duration,
    ehlo_identity: Option<String>,
    tls: Option<Arc<ClientConfig>>,
}

impl ProbeConfigBuilder {
    /// Creates a new builder with the given hostname.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ports: None,
            timeout: DEFAULT_TIMEOUT,
            ehlo_identity: None,
            tls: None,
        }
    }

    /// Sets the ports to probe.
    #[must_use]
    pub fn ports(mut self, ports: impl IntoIterator<Item = u16>) -> Self {
        self.ports = Some(ports.into_iter().collect());
        self
    }

    /// Sets the per-operation timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the name sent with EHLO.
    #[must_use]
    pub fn ehlo_identity(mut self, identity: impl Into<String>) -> Self {
        self.ehlo_identity = Some(identity.into());
        self
    }

    /// Overrides the TLS client configuration.
    ///
    /// Use this to trust a private CA; do not use it to turn verification off.
    #[must_use]
    pub fn tls_config(mut self, config: Arc<ClientConfig>) -> Self {
        self.tls = Some(config);
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> ProbeConfig {
        ProbeConfig {
            host: self.host,
            ports: self
                .ports
                .filter(|ports| !ports.is_empty())
                .unwrap_or_else(|| DEFAULT_PORTS.to_vec()),
            timeout: self.timeout,
            ehlo_identity: self
                .ehlo_identity
                .unwrap_or_else(|| DEFAULT_EHLO_IDENTITY.to_string()),
            tls: self.tls.unwrap_or_else(default_tls_config),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_new() {
        let config = ProbeConfig::new("mail.example.com");
        assert_eq!(config.host, "mail.example.com");
        assert_eq!(config.ports, vec![25, 465, 587]);
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.ehlo_identity, "localhost");
    }

    #[test]
    fn test_config_builder() {
        let config = ProbeConfig::builder("mail.example.com")
            .ports([587])
            .timeout(Duration::from_secs(10))
            .ehlo_identity("probe.example.net")
            .build();

        assert_eq!(config.ports, vec![587]);
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.ehlo_identity, "probe.example.net");
    }

    #[test]
    fn test_config_builder_empty_ports_fall_back() {
        let config = ProbeConfig::builder("mail.example.com")
            .ports(Vec::new())
            .build();
        assert_eq!(config.ports, DEFAULT_PORTS.to_vec());
    }

    #[test]
    fn test_tls_override_is_shared() {
        let tls = default_tls_config();
        let config = ProbeConfig::builder("mail.example.com")
            .tls_config(Arc::clone(&tls))
            .build();
        assert!(Arc::ptr_eq(&config.tls, &tls));
    }
}
