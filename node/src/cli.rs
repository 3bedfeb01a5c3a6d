//! # CLI Interface
//!
//! Command-line structure for `veripay-node`, built with `clap` derive.
//! Subcommands: `serve`, `commit`, `inspect`, `version`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use veripay_protocol::config::{DEFAULT_API_PORT, DEFAULT_METRICS_PORT};

/// VeriPay registry and verification node.
///
/// Serves the unique-key registry, the uniqueness accumulator and the
/// combined verifier over HTTP. The `commit` and `inspect` subcommands run
/// locally without a server.
#[derive(Parser, Debug)]
#[command(
    name = "veripay-node",
    about = "VeriPay registry and verification node",
    version,
    propagate_version = true
)]
pub struct VeriPayNodeCli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP API and metrics servers.
    Serve(ServeArgs),
    /// Derive a credential commitment from document attributes.
    Commit(CommitArgs),
    /// Check a shared payment-proof file.
    Inspect(InspectArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for `serve`.
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Directory holding the sled database. Created if missing.
    #[arg(long, short = 'd', env = "VERIPAY_DATA_DIR", default_value = "./veripay-data")]
    pub data_dir: PathBuf,

    /// Port for the HTTP API.
    #[arg(long, env = "VERIPAY_API_PORT", default_value_t = DEFAULT_API_PORT)]
    pub api_port: u16,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "VERIPAY_METRICS_PORT", default_value_t = DEFAULT_METRICS_PORT)]
    pub metrics_port: u16,

    /// Preferred hash backend: `poseidon` or `digest`. Falls back to
    /// `digest` with a warning if Poseidon cannot be initialized.
    #[arg(long, env = "VERIPAY_HASH_BACKEND", default_value = "poseidon")]
    pub hash_backend: String,

    /// Shared proving/verification key, 64 hex digits. A random key is used
    /// when absent, so proofs made before a restart stop verifying.
    #[arg(long, env = "VERIPAY_PROOF_KEY", hide_env_values = true)]
    pub proof_key: Option<String>,

    /// Log output format: `pretty` or `json`.
    #[arg(long, env = "VERIPAY_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,
}

/// Arguments for `commit`.
#[derive(Parser, Debug)]
pub struct CommitArgs {
    /// Date of birth, `YYYY-MM-DD`.
    #[arg(long)]
    pub dob: String,

    /// Document type, e.g. `passport`.
    #[arg(long)]
    pub doc_type: String,

    /// Document expiry, `YYYY-MM-DD`.
    #[arg(long)]
    pub expiry: String,

    /// Blinding nonce, `0x` hex or decimal.
    #[arg(long)]
    pub nonce: String,

    /// Wallet address the credential is bound to.
    #[arg(long)]
    pub wallet: String,

    #[arg(long, env = "VERIPAY_HASH_BACKEND", default_value = "poseidon")]
    pub hash_backend: String,

    /// Also record the commitment in the vault under this data directory.
    #[arg(long, env = "VERIPAY_DATA_DIR")]
    pub store: Option<PathBuf>,
}

/// Arguments for `inspect`.
#[derive(Parser, Debug)]
pub struct InspectArgs {
    /// Path to a `payment-proof-<millis>.json` file.
    pub file: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        VeriPayNodeCli::command().debug_assert();
    }

    #[test]
    fn serve_defaults() {
        let cli = VeriPayNodeCli::try_parse_from(["veripay-node", "serve"]).unwrap();
        match cli.command {
            Commands::Serve(args) => {
                assert_eq!(args.api_port, DEFAULT_API_PORT);
                assert_eq!(args.metrics_port, DEFAULT_METRICS_PORT);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn commit_requires_wallet() {
        let parsed = VeriPayNodeCli::try_parse_from([
            "veripay-node",
            "commit",
            "--dob",
            "1990-01-01",
            "--doc-type",
            "passport",
            "--expiry",
            "2030-01-01",
            "--nonce",
            "7",
        ]);
        assert!(parsed.is_err());
    }
}
