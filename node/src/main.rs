// Copyright (c) 2026 VeriPay Contributors. MIT License.
// See LICENSE for details.

//! # VeriPay Node
//!
//! Entry point for the `veripay-node` binary. Parses CLI arguments,
//! initializes logging and metrics, and serves the registry and
//! verification API.
//!
//! - `serve`   start the API and metrics servers
//! - `commit`  derive a credential commitment locally
//! - `inspect` check a shared payment-proof file
//! - `version` print build version information

mod api;
mod cli;
mod logging;
mod metrics;

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::RwLock;

use veripay_protocol::config::{PROTOCOL_VERSION, REGISTRY_LOOKUP_TIMEOUT};
use veripay_protocol::crypto::{select_backend, BackendKind};
use veripay_protocol::identity::{
    CredentialAttributes, CredentialCommitment, StoreRegistry, UniquenessAccumulator,
};
use veripay_protocol::payment::{check_flags, verify_structure, PrivacyPreservingPaymentProof};
use veripay_protocol::storage::{LocalVault, SledStore, Store};
use veripay_protocol::verify::CombinedVerifier;
use veripay_protocol::zkp::TranscriptProofSystem;

use cli::{Commands, VeriPayNodeCli};
use logging::LogFormat;
use metrics::NodeMetrics;

const DEFAULT_LOG_DIRECTIVE: &str = "veripay_node=info,veripay_protocol=info,tower_http=debug";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = VeriPayNodeCli::parse();

    match cli.command {
        Commands::Serve(args) => serve(args).await,
        Commands::Commit(args) => commit(args),
        Commands::Inspect(args) => inspect(args),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

fn parse_backend(raw: &str) -> Result<BackendKind> {
    raw.parse::<BackendKind>().map_err(anyhow::Error::msg)
}

/// A proof key is exactly 32 bytes: 64 hex digits, `0x` optional. Shorter
/// input is refused rather than padded.
fn parse_proof_key(raw: &str) -> Result<[u8; 32]> {
    let raw = raw.trim();
    let digits = raw
        .strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
        .unwrap_or(raw);
    if digits.len() != 64 {
        bail!(
            "invalid --proof-key: expected 64 hex digits, got {}",
            digits.len()
        );
    }
    let bytes = hex::decode(digits).context("invalid --proof-key")?;
    let mut key = [0u8; 32];
    key.copy_from_slice(&bytes);
    Ok(key)
}

fn open_store(data_dir: &Path) -> Result<Arc<SledStore>> {
    let db_path = data_dir.join("db");
    std::fs::create_dir_all(&db_path)
        .with_context(|| format!("failed to create database directory: {}", db_path.display()))?;
    let store = SledStore::open(&db_path)
        .with_context(|| format!("failed to open database at {}", db_path.display()))?;
    tracing::info!(path = %db_path.display(), "database opened");
    Ok(Arc::new(store))
}

/// Starts the API server and the metrics endpoint.
async fn serve(args: cli::ServeArgs) -> Result<()> {
    logging::init_logging(DEFAULT_LOG_DIRECTIVE, LogFormat::from_str_lossy(&args.log_format));

    tracing::info!(
        api_port = args.api_port,
        metrics_port = args.metrics_port,
        data_dir = %args.data_dir.display(),
        "starting veripay-node"
    );

    // --- Hash backend, chosen once ---
    let (backend, degraded) = select_backend(parse_backend(&args.hash_backend)?);
    if let Some(notice) = &degraded {
        tracing::warn!(%notice, "serving with degraded hash backend");
    }

    // --- Persistent storage ---
    let sled = open_store(&args.data_dir)?;
    let store: Arc<dyn Store> = sled.clone();

    let accumulator = UniquenessAccumulator::load(backend.clone(), store.clone())
        .context("failed to load uniqueness accumulator")?;

    // --- Metrics ---
    let node_metrics = Arc::new(NodeMetrics::new());
    node_metrics
        .accumulator_leaves
        .set(accumulator.leaf_count() as i64);

    let proof_system = match &args.proof_key {
        Some(raw) => Arc::new(TranscriptProofSystem::new(parse_proof_key(raw)?)),
        None => {
            tracing::warn!("no proof key configured, using an ephemeral one");
            Arc::new(TranscriptProofSystem::random())
        }
    };

    // --- Application state ---
    let app_state = api::AppState {
        version: format!("{} (protocol {})", env!("CARGO_PKG_VERSION"), PROTOCOL_VERSION),
        backend,
        registry: Arc::new(StoreRegistry::new(store.clone())),
        accumulator: Arc::new(RwLock::new(accumulator)),
        verifier: CombinedVerifier::new(proof_system),
        metrics: Arc::clone(&node_metrics),
        lookup_timeout: REGISTRY_LOOKUP_TIMEOUT,
    };

    // --- API server ---
    let api_router = api::create_router(app_state);
    let api_addr = format!("0.0.0.0:{}", args.api_port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr)
        .await
        .with_context(|| format!("failed to bind API listener on {}", api_addr))?;
    tracing::info!("API server listening on {}", api_addr);

    // --- Metrics server ---
    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(Arc::clone(&node_metrics));
    let metrics_addr = format!("0.0.0.0:{}", args.metrics_port);
    let metrics_listener = tokio::net::TcpListener::bind(&metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {}", metrics_addr))?;
    tracing::info!("Metrics server listening on {}", metrics_addr);

    // --- Serve ---
    tokio::select! {
        res = axum::serve(api_listener, api_router) => {
            if let Err(e) = res {
                tracing::error!("API server error: {}", e);
            }
        }
        res = axum::serve(metrics_listener, metrics_router) => {
            if let Err(e) = res {
                tracing::error!("Metrics server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received");
        }
    }

    sled.flush().context("failed to flush database")?;
    tracing::info!("veripay-node stopped");
    Ok(())
}

/// Derives a commitment and prints it as JSON. With `--store`, the
/// commitment is also recorded in the local vault.
fn commit(args: cli::CommitArgs) -> Result<()> {
    logging::init_logging("veripay_node=warn,veripay_protocol=warn", LogFormat::Pretty);

    let (backend, _) = select_backend(parse_backend(&args.hash_backend)?);
    let attrs = CredentialAttributes::new(args.dob, args.doc_type, args.expiry, args.nonce);
    let commitment = CredentialCommitment::derive(backend.as_ref(), &attrs, &args.wallet)
        .context("failed to derive credential commitment")?;

    if let Some(data_dir) = &args.store {
        let sled = open_store(data_dir)?;
        let vault = LocalVault::new(sled.clone());
        vault
            .put_credential(&commitment)
            .context("failed to store credential")?;
        sled.flush().context("failed to flush database")?;
    }

    println!("{}", serde_json::to_string_pretty(&commitment)?);
    Ok(())
}

/// Runs the structural and flag checks on a payment-proof file.
fn inspect(args: cli::InspectArgs) -> Result<()> {
    logging::init_logging("veripay_node=warn", LogFormat::Pretty);

    let raw = std::fs::read_to_string(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    let candidate: serde_json::Value = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not valid JSON", args.file.display()))?;

    let structure = verify_structure(&candidate);
    let flag_errors = if structure.valid {
        let proof: PrivacyPreservingPaymentProof = serde_json::from_value(candidate)
            .context("payment proof passed structural checks but could not be decoded")?;
        check_flags(&proof)
    } else {
        Vec::new()
    };

    let valid = structure.valid && flag_errors.is_empty();
    let report = json!({
        "file": args.file.display().to_string(),
        "valid": valid,
        "structureErrors": structure.errors,
        "flagErrors": flag_errors,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    if !valid {
        bail!("payment proof {} failed inspection", args.file.display());
    }
    Ok(())
}

fn print_version() {
    println!("veripay-node {}", env!("CARGO_PKG_VERSION"));
    println!("protocol     {}", PROTOCOL_VERSION);
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// If a handler cannot be installed the failure is logged and that signal
/// is never delivered.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proof_key_needs_all_64_digits() {
        let full = format!("0x{}", "0a".repeat(32));
        assert_eq!(parse_proof_key(&full).unwrap(), [0x0a; 32]);
        assert_eq!(parse_proof_key(&"ff".repeat(32)).unwrap(), [0xff; 32]);

        assert!(parse_proof_key("0x1").is_err());
        assert!(parse_proof_key(&format!("0x{}", "0a".repeat(31))).is_err());
        assert!(parse_proof_key(&format!("0x{}", "0a".repeat(33))).is_err());
        assert!(parse_proof_key(&format!("0x{}zz", "0a".repeat(31))).is_err());
    }
}
