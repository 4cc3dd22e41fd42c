// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::process::ExitCode;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use custodial_broadcast::broadcast::BroadcastOutcome;
use custodial_broadcast::chain::initia::rest::DEFAULT_REQUEST_TIMEOUT;
use custodial_broadcast::chain::initia::InitiaRestClient;
use custodial_broadcast::config::{AppConfig, LOG_FORMAT_ENV};
use custodial_broadcast::error::PipelineError;
use custodial_broadcast::orchestrator::{TransferPipeline, VaultIdentity};
use custodial_broadcast::signer::RemoteSignerClient;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var(LOG_FORMAT_ENV)
        .map(|v| v.trim().eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Configuration error");
            return ExitCode::FAILURE;
        }
    };
    info!(
        network = config.network.name,
        rest_url = %config.rest_url,
        vault_address = %config.signer.vault_address,
        "Configuration loaded"
    );

    let pipeline = match build_pipeline(&config) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            error!(error = %e, "Failed to initialise clients");
            return ExitCode::FAILURE;
        }
    };

    let shutdown = CancellationToken::new();
    let interrupt = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received; stopping");
            interrupt.cancel();
        }
    });

    let max_attempts = config.confirm.max_attempts;
    let result = pipeline
        .run(&config.transfer, &shutdown, |step| {
            if let BroadcastOutcome::Pending { tx_hash, attempts } = step {
                if *attempts > 0 {
                    info!(tx_hash = %tx_hash, attempts, max_attempts, "Waiting for inclusion");
                }
            }
        })
        .await;

    match result {
        Ok(report) => {
            match serde_json::to_string_pretty(&report) {
                Ok(rendered) => println!("{rendered}"),
                Err(e) => warn!(error = %e, "Failed to render transfer report"),
            }
            if let BroadcastOutcome::TimedOut { tx_hash, .. } = &report.outcome {
                warn!(
                    tx_hash = %tx_hash,
                    explorer = ?report.explorer_url,
                    "Outcome unknown; check the transaction later by hash"
                );
            }
            ExitCode::from(report.exit_code())
        }
        Err(e) => {
            error!(error = %e, "Transfer failed before broadcast");
            ExitCode::FAILURE
        }
    }
}

fn build_pipeline(
    config: &AppConfig,
) -> Result<TransferPipeline<RemoteSignerClient, InitiaRestClient>, PipelineError> {
    let signer = RemoteSignerClient::from_config(&config.signer)?;
    let chain = InitiaRestClient::new(config.rest_url.clone(), Some(DEFAULT_REQUEST_TIMEOUT))?;
    Ok(TransferPipeline::new(
        signer,
        chain,
        config.network,
        VaultIdentity::from(&config.signer),
        config.confirm,
    ))
}
