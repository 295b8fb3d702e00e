//! Rendering probe outcomes.

use std::fmt::{self, Write};

use mailprobe_smtp::{Audit, ErrorKind, PortOutcome};
use serde_json::{Value, json};

/// True when some port authenticated and no port answered wrongly.
///
/// Unreachable ports are tolerated; a server that rejects EHLO, lacks PLAIN
/// or refuses the credential is not.
pub fn passed(outcomes: &[PortOutcome]) -> bool {
    let any_audit = outcomes.iter().any(|o| o.result.is_ok());
    let any_rejection = outcomes.iter().any(|o| {
        o.result
            .as_ref()
            .is_err_and(|e| matches!(e.kind(), ErrorKind::Protocol | ErrorKind::Auth))
    });
    any_audit && !any_rejection
}

/// Renders outcomes as a JSON array.
pub fn json(outcomes: &[PortOutcome]) -> serde_json::Result<String> {
    let entries = outcomes
        .iter()
        .map(|outcome| match &outcome.result {
            Ok(audit) => serde_json::to_value(audit),
            Err(e) => Ok(json!({
                "port": outcome.port,
                "error": e.to_string(),
                "kind": format!("{:?}", e.kind()),
            })),
        })
        .collect::<serde_json::Result<Vec<Value>>>()?;
    serde_json::to_string_pretty(&entries)
}

/// Renders outcomes for a terminal.
pub fn text(host: &str, outcomes: &[PortOutcome]) -> Result<String, fmt::Error> {
    let mut out = String::new();
    for outcome in outcomes {
        match &outcome.result {
            Ok(audit) => write_audit(&mut out, host, audit)?,
            Err(e) => writeln!(out, "skipped: {e}")?,
        }
    }
    Ok(out)
}

fn write_audit(out: &mut impl Write, host: &str, audit: &Audit) -> fmt::Result {
    writeln!(
        out,
        "{}://{host}:{} authenticated ({})",
        audit.protocol(),
        audit.port(),
        audit.server_name()
    )?;
    if let Some(cipher) = audit.cipher() {
        let bits = cipher
            .secret_bits
            .map_or_else(String::new, |bits| format!(", {bits} bits"));
        writeln!(
            out,
            "  cipher: {} ({}{bits})",
            cipher.name, cipher.protocol_version
        )?;
    }
    if let Some(cert) = audit.peer_certificate() {
        writeln!(out, "  subject: {}", cert.subject)?;
        writeln!(out, "  issuer: {}", cert.issuer)?;
        if let Some(not_after) = cert.not_after {
            writeln!(out, "  expires: {}", not_after.to_rfc3339())?;
        }
    }
    for line in audit.capabilities() {
        writeln!(out, "  {}", String::from_utf8_lossy(line))?;
    }
    Ok(())
}
