//! Probing a set of ports, one independent attempt per port.

use tracing::{debug, warn};

use crate::audit::{Audit, audit};
use crate::connection::{Connector, ProbeConfig, RustlsConnector};
use crate::error::{ErrorKind, Result};
use crate::negotiate::{Negotiated, negotiate};
use crate::sasl::Credentials;

/// Result of probing one port.
#[derive(Debug)]
pub struct PortOutcome {
    /// Port probed.
    pub port: u16,
    /// Audit on success, the reason otherwise.
    pub result: Result<Audit>,
}

/// Probes one port: negotiate, audit, then QUIT.
///
/// # Errors
///
/// Returns the first failing step's error.
pub async fn probe_port<C: Connector>(
    connector: &C,
    config: &ProbeConfig,
    port: u16,
    credentials: &Credentials,
) -> Result<Audit> {
    let Negotiated {
        mut session,
        protocol,
    } = negotiate(connector, config, port).await?;

    let result = audit(&mut session, protocol, credentials, &config.ehlo_identity).await;

    // A dead or stalled connection would only add another timeout.
    let alive = match &result {
        Ok(_) => true,
        Err(e) => matches!(e.kind(), ErrorKind::Protocol | ErrorKind::Auth),
    };
    if alive && let Err(e) = session.quit().await {
        debug!(host = %config.host, port, error = %e, "QUIT failed");
    }

    result
}

/// Probes every configured port in order with the given connector.
///
/// A failing port is recorded and the remaining ports are still probed.
pub async fn probe_ports_with<C: Connector>(
    connector: &C,
    config: &ProbeConfig,
    credentials: &Credentials,
) -> Vec<PortOutcome> {
    let mut outcomes = Vec::with_capacity(config.ports.len());
    for &port in &config.ports {
        let result = probe_port(connector, config, port, credentials).await;
        if let Err(e) = &result {
            warn!(host = %config.host, port, error = %e, "Probe failed, skipping port");
        }
        outcomes.push(PortOutcome { port, result });
    }
    outcomes
}

/// Probes every configured port over TCP with rustls.
pub async fn probe_ports(config: &ProbeConfig, credentials: &Credentials) -> Vec<PortOutcome> {
    let connector = RustlsConnector::new(config.tls.clone(), config.timeout);
    probe_ports_with(&connector, config, credentials).await
}
