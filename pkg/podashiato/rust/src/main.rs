// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Samples pod placements on an interval, writes them to stdout as JSON lines
//! and optionally keeps an hourly pod-to-node ConfigMap.

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::watch;

use pod_ashiato::cluster::{self, KubeConfigMaps, KubePods, PodSource};
use pod_ashiato::config::{Cli, LogFormat, SamplerConfig};
use pod_ashiato::sampler::Sampler;
use pod_ashiato::sink::{JsonLines, RecordSink, Recording};
use pod_ashiato::store::PartitionedStore;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "pod-ashiato failed");
            ExitCode::FAILURE
        }
    }
}

/// RUST_LOG takes precedence, fallback to info. Logs go to stderr so stdout
/// carries only placement records.
fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let sampler_config = cli.sampler_config()?;
    let store_config = cli.store_config()?;

    let client = cluster::connect(cli.kubeconfig.as_deref())
        .await
        .context("Error building Kubernetes client")?;

    if sampler_config.has_filters() {
        tracing::info!(
            namespace = sampler_config.namespace.as_deref().unwrap_or_default(),
            pod_name_prefix = sampler_config.name_prefix.as_deref().unwrap_or_default(),
            label_selector = sampler_config.label_selector.as_deref().unwrap_or_default(),
            "Using pod filters"
        );
    }

    let pods = KubePods::new(client.clone());
    let lines = JsonLines::new(std::io::stdout());

    match store_config {
        Some(store_config) => {
            tracing::info!(
                namespace = %store_config.namespace,
                prefix = %store_config.prefix,
                "Recording pod placements to hourly ConfigMaps"
            );
            let documents = KubeConfigMaps::new(client, &store_config.namespace);
            let store = PartitionedStore::new(documents, store_config.prefix);
            drive(pods, Recording::new(lines, store), sampler_config, cli.oneshot).await
        }
        None => drive(pods, lines, sampler_config, cli.oneshot).await,
    }
}

async fn drive<P, S>(
    pods: P,
    sink: S,
    config: SamplerConfig,
    oneshot: bool,
) -> anyhow::Result<()>
where
    P: PodSource,
    S: RecordSink,
{
    let interval = config.interval;
    let mut sampler = Sampler::new(pods, sink, config);

    if oneshot {
        sampler
            .run_once()
            .await
            .context("Failed to run pod sampler")?;
        return Ok(());
    }

    let shutdown = shutdown_signal()?;
    tracing::info!(interval_secs = interval.as_secs(), "Starting pod-ashiato sampler");
    sampler.run(shutdown).await;
    tracing::info!("Sampler shutdown complete");
    Ok(())
}

/// Flip a watch channel to `true` on SIGINT or SIGTERM.
fn shutdown_signal() -> anyhow::Result<watch::Receiver<bool>> {
    let (tx, rx) = watch::channel(false);
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    tokio::spawn(async move {
        tokio::select! {
            _ = sigint.recv() => {
                tracing::info!("Received SIGINT, shutting down");
            }
            _ = sigterm.recv() => {
                tracing::info!("Received SIGTERM, shutting down");
            }
        }
        let _ = tx.send(true);
    });

    Ok(rx)
}
