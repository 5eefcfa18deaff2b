// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Periodic pod placement sampling.

use std::time::Duration;

use k8s_openapi::api::core::v1::Pod;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::clock::{Clock, SystemClock};
use crate::cluster::PodSource;
use crate::config::SamplerConfig;
use crate::error::{EmitError, SampleError};
use crate::record::PlacementRecord;
use crate::sink::RecordSink;

/// tokio intervals panic on a zero period.
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Lists pods matching the configured filters and emits one record per pod.
pub struct Sampler<P, S, C = SystemClock> {
    pods: P,
    sink: S,
    clock: C,
    config: SamplerConfig,
}

impl<P: PodSource, S: RecordSink> Sampler<P, S> {
    pub fn new(pods: P, sink: S, config: SamplerConfig) -> Self {
        Self::with_clock(pods, sink, config, SystemClock)
    }
}

impl<P: PodSource, S: RecordSink, C: Clock> Sampler<P, S, C> {
    pub fn with_clock(pods: P, sink: S, config: SamplerConfig, clock: C) -> Self {
        Self {
            pods,
            sink,
            clock,
            config,
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Run exactly one sampling pass, whatever the interval.
    pub async fn run_once(&mut self) -> Result<usize, SampleError> {
        self.sample().await
    }

    /// Sample immediately, then on every interval tick until `shutdown` turns
    /// true or its sender is dropped.
    ///
    /// Shutdown is only observed between cycles; a cycle in progress always
    /// completes. Cycle failures are logged and do not stop the loop.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.config.interval.max(MIN_INTERVAL));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                biased;

                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.sample().await {
                        tracing::error!(error = %e, "Failed to log pod node info");
                    }
                }
            }
        }

        tracing::info!("Sampler loop shutting down");
    }

    /// One sampling cycle. Returns the number of records emitted.
    ///
    /// Only a failed pod listing is an error; a record that cannot be emitted
    /// is logged and skipped. A record whose line was written but whose
    /// placement could not be stored still counts as emitted.
    pub async fn sample(&mut self) -> Result<usize, SampleError> {
        let pods = self
            .pods
            .list(
                self.config.namespace.as_deref(),
                self.config.label_selector.as_deref(),
            )
            .await
            .map_err(SampleError::List)?;

        let pods = filter_by_prefix(pods, self.config.name_prefix.as_deref());

        if pods.is_empty() {
            tracing::info!(
                namespace = self.config.namespace.as_deref().unwrap_or_default(),
                pod_name_prefix = self.config.name_prefix.as_deref().unwrap_or_default(),
                label_selector = self.config.label_selector.as_deref().unwrap_or_default(),
                "No pods found matching the specified filters"
            );
            return Ok(0);
        }

        let captured_at = self.clock.now();
        let mut emitted = 0;
        for pod in &pods {
            let record = PlacementRecord::from_pod(pod, captured_at);
            match self.sink.emit(&record).await {
                Ok(()) => emitted += 1,
                Err(EmitError::Store(e)) => {
                    emitted += 1;
                    tracing::error!(
                        error = %e,
                        namespace = %record.namespace,
                        pod = %record.pod_name,
                        "Failed to record pod placement"
                    );
                }
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        namespace = %record.namespace,
                        pod = %record.pod_name,
                        "Failed to emit placement record"
                    );
                }
            }
        }

        tracing::debug!(matched = pods.len(), emitted, "Sampling cycle complete");
        Ok(emitted)
    }
}

/// Keep pods whose name starts with `prefix`; `None` keeps everything.
pub fn filter_by_prefix(pods: Vec<Pod>, prefix: Option<&str>) -> Vec<Pod> {
    let Some(prefix) = prefix else {
        return pods;
    };
    pods.into_iter()
        .filter(|pod| {
            pod.metadata
                .name
                .as_deref()
                .is_some_and(|name| name.starts_with(prefix))
        })
        .collect()
}
