//! horcrux operator cli
//!
//! - `split` provisions a new deployment and prints one token per holder
//!   plus the client token
//! - `recompose` contacts the holders and prints the master secret

use std::process::ExitCode;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use horcrux::{
    decode_state_env, encode_state_env, provision, Audience, Client, Encoding, Error,
    HorcruxList, HttpTransport,
};
use tracing::info;

#[derive(Parser)]
#[command(name = "horcrux")]
#[command(about = "split a secret across shard holders and recompose it")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Split a secret and print provisioning tokens
    Split {
        /// Master secret
        secret: String,

        /// Shards needed to recompose
        #[arg(short, long)]
        threshold: usize,

        /// Holder as name=url, once per holder
        #[arg(long = "horcrux", value_parser = parse_holder, required = true)]
        horcruxes: Vec<(String, String)>,

        /// How the secret is encoded
        #[arg(long, value_enum, default_value = "utf8")]
        encoding: SecretEncoding,
    },

    /// Recompose the secret from the configured holders
    Recompose {
        /// Client provisioning token
        #[arg(long, env = "HORCRUX_CLIENT_CONFIG", hide_env_values = true)]
        config: String,

        /// Per-holder timeout in seconds
        #[arg(long, default_value = "60")]
        timeout: u64,

        /// How the secret is encoded
        #[arg(long, value_enum, default_value = "utf8")]
        encoding: SecretEncoding,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SecretEncoding {
    Utf8,
    Hex,
    Base64,
}

impl From<SecretEncoding> for Encoding {
    fn from(e: SecretEncoding) -> Self {
        match e {
            SecretEncoding::Utf8 => Encoding::Utf8,
            SecretEncoding::Hex => Encoding::Hex,
            SecretEncoding::Base64 => Encoding::Base64,
        }
    }
}

fn parse_holder(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((name, url)) if !name.is_empty() && !url.is_empty() => {
            Ok((name.to_string(), url.to_string()))
        }
        _ => Err(format!("expected name=url, got `{}`", s)),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "horcrux_cli=info,horcrux=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Split {
            secret,
            threshold,
            horcruxes,
            encoding,
        } => {
            handle_split(&secret, threshold, &horcruxes, encoding.into())?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Recompose {
            config,
            timeout,
            encoding,
        } => handle_recompose(&config, Duration::from_secs(timeout), encoding.into()).await,
    }
}

fn handle_split(
    secret: &str,
    threshold: usize,
    holders: &[(String, String)],
    encoding: Encoding,
) -> anyhow::Result<()> {
    if holders.len() < threshold {
        bail!(
            "threshold {} needs at least {} holders, got {}",
            threshold,
            threshold,
            holders.len()
        );
    }

    let provisioned = provision(secret, encoding, threshold, holders)?;
    info!(
        "split into {} shards, {} needed",
        provisioned.client.num_shards, threshold
    );

    for state in &provisioned.servers {
        let token = encode_state_env(state, Audience::Server, state.name())?;
        println!("# {}", state.name());
        println!("HORCRUX_SERVER_CONFIG={}", token);
        println!();
    }

    let token = encode_state_env(&provisioned.client, Audience::Client, "client")?;
    println!("# client");
    println!("HORCRUX_CLIENT_CONFIG={}", token);
    Ok(())
}

async fn handle_recompose(
    config: &str,
    timeout: Duration,
    encoding: Encoding,
) -> anyhow::Result<ExitCode> {
    let horcruxes: HorcruxList =
        decode_state_env(config, Audience::Client).context("invalid client token")?;
    info!(
        "contacting {} horcruxes, {} needed",
        horcruxes.servers.len(),
        horcruxes.threshold
    );

    let client = Client::new(horcruxes, HttpTransport::new())
        .with_timeout(timeout)
        .with_encoding(encoding);

    match client.recompose().await {
        Ok((secret, report)) => {
            eprintln!("{}", report);
            println!("{}", secret);
            Ok(ExitCode::SUCCESS)
        }
        Err(Error::InsufficientShards(report)) => {
            eprintln!("Horcrux error: not enough shards available to recompose master secret:");
            for line in report.to_string().lines() {
                eprintln!("  {}", line);
            }
            Ok(ExitCode::FAILURE)
        }
        Err(e) => Err(e.into()),
    }
}
