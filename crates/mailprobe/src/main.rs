//! `mailprobe` - SMTP submission checker
//!
//! Connects to each port of an SMTP server, negotiates TLS (implicit first,
//! STARTTLS second), authenticates with AUTH PLAIN and prints what it saw.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod report;

use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use mailprobe_smtp::connection::{DEFAULT_EHLO_IDENTITY, DEFAULT_PORTS};
use mailprobe_smtp::{Credentials, ProbeConfig, probe_ports};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Check that an SMTP server offers encrypted, authenticated submission
#[derive(Parser, Debug)]
#[command(name = "mailprobe")]
#[command(version, long_about = None)]
struct Cli {
    /// Server host name or IP address
    #[arg(long, env = "SMTP_HOST")]
    host: String,

    /// User name for AUTH PLAIN
    #[arg(short, long, env = "SMTP_USER")]
    user: String,

    /// Password for AUTH PLAIN
    #[arg(long, env = "SMTP_PASSWORD", hide_env_values = true)]
    password: String,

    /// Ports to probe, comma separated
    #[arg(short, long = "port", env = "SMTP_PORTS", value_delimiter = ',')]
    ports: Vec<u16>,

    /// Timeout in seconds for each connect, handshake and reply
    #[arg(short, long, env = "SMTP_TIMEOUT", default_value_t = 5)]
    timeout: u64,

    /// Name announced with EHLO
    #[arg(long, env = "SMTP_EHLO_NAME", default_value = DEFAULT_EHLO_IDENTITY)]
    ehlo_name: String,

    /// Print results as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Logs go to stderr so JSON output stays parseable
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mailprobe=info,mailprobe_smtp=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    if cli.timeout == 0 {
        anyhow::bail!("--timeout must be at least one second");
    }

    let ports = if cli.ports.is_empty() {
        DEFAULT_PORTS.to_vec()
    } else {
        cli.ports
    };
    let config = ProbeConfig::builder(&cli.host)
        .ports(ports)
        .timeout(Duration::from_secs(cli.timeout))
        .ehlo_identity(cli.ehlo_name)
        .build();
    let credentials = Credentials::new(cli.user, cli.password);

    info!(host = %config.host, ports = ?config.ports, "Starting probe");
    let outcomes = probe_ports(&config, &credentials).await;

    if cli.json {
        println!("{}", report::json(&outcomes)?);
    } else {
        print!("{}", report::text(&config.host, &outcomes)?);
    }

    Ok(if report::passed(&outcomes) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
