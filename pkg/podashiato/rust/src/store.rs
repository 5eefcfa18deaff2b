// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Hourly pod-to-node mapping documents.
//!
//! The store accumulates placement facts for the current local clock hour in memory
//! and mirrors the whole buffer into one ConfigMap per hour, named
//! `<prefix>-YYYYMMDDHH`. On every call the persisted payload is replaced
//! with the full buffer: the buffer is authoritative and the ConfigMap is its
//! mirror, so it must never be reduced to a field-level merge.
//!
//! When the hour changes the buffer is cleared and a new document is started.
//! The previous hour's document is left untouched.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, Utc};
use k8s_openapi::api::core::v1::ConfigMap;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

use crate::clock::{Clock, SystemClock};
use crate::cluster::DocumentStore;
use crate::error::StoreError;

/// Default document name prefix, also used as the `app` label.
pub const DEFAULT_DOCUMENT_PREFIX: &str = "pod-ashiato";

const APP_LABEL: &str = "pod-ashiato";
const TYPE_LABEL: &str = "pod-node-mapping";

/// Hour-resolution partition key, `YYYYMMDDHH`, in the wall-clock time of
/// `now`'s offset.
pub fn partition_hour(now: DateTime<FixedOffset>) -> String {
    now.format("%Y%m%d%H").to_string()
}

/// ConfigMap keys may not contain `/`.
pub fn sanitize_key(instance_key: &str) -> String {
    instance_key.replace('/', "_")
}

#[derive(Debug)]
struct Partition {
    hour: String,
    name: String,
    entries: BTreeMap<String, String>,
    rolled_over_at: DateTime<Utc>,
}

impl Partition {
    fn to_document(&self) -> ConfigMap {
        let labels = BTreeMap::from([
            ("app".to_string(), APP_LABEL.to_string()),
            ("type".to_string(), TYPE_LABEL.to_string()),
        ]);
        ConfigMap {
            metadata: ObjectMeta {
                name: Some(self.name.clone()),
                labels: Some(labels),
                ..Default::default()
            },
            data: Some(self.entries.clone()),
            ..Default::default()
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Rollover {
    /// Same hour as the buffered partition.
    Keep,
    /// No partition yet, or the clock moved into a later hour.
    Start,
    /// The clock went back into an earlier hour; stay on the current partition.
    ClockWentBack,
}

fn decide_rollover(current: Option<&Partition>, now: DateTime<Utc>, hour: &str) -> Rollover {
    match current {
        None => Rollover::Start,
        Some(p) if p.hour == hour => Rollover::Keep,
        Some(p) if now < p.rolled_over_at => Rollover::ClockWentBack,
        Some(_) => Rollover::Start,
    }
}

/// Accumulates `pod -> node` facts for the current hour and persists them.
///
/// `record` takes `&mut self`; callers sharing a store across tasks wrap it
/// in a `tokio::sync::Mutex`.
pub struct PartitionedStore<D, C = SystemClock> {
    documents: D,
    clock: C,
    prefix: String,
    partition: Option<Partition>,
}

impl<D: DocumentStore> PartitionedStore<D> {
    pub fn new(documents: D, prefix: impl Into<String>) -> Self {
        Self::with_clock(documents, prefix, SystemClock)
    }
}

impl<D: DocumentStore, C: Clock> PartitionedStore<D, C> {
    pub fn with_clock(documents: D, prefix: impl Into<String>, clock: C) -> Self {
        Self {
            documents,
            clock,
            prefix: prefix.into(),
            partition: None,
        }
    }

    /// Name of the document currently being written, if any.
    pub fn partition_name(&self) -> Option<&str> {
        self.partition.as_ref().map(|p| p.name.as_str())
    }

    /// Entries buffered for the current partition.
    pub fn entries(&self) -> Option<&BTreeMap<String, String>> {
        self.partition.as_ref().map(|p| &p.entries)
    }

    /// Record that `instance_key` runs on `node_name` and persist the hour's
    /// full mapping.
    ///
    /// On failure the buffered entry is kept, so the next successful call
    /// persists it along with everything else.
    pub async fn record(&mut self, instance_key: &str, node_name: &str) -> Result<(), StoreError> {
        let now = self.clock.now();
        let hour = partition_hour(now.with_timezone(&self.clock.local_offset(now)));
        let rollover = decide_rollover(self.partition.as_ref(), now, &hour);

        let partition = match (rollover, self.partition.take()) {
            (Rollover::Keep, Some(current)) => current,
            (Rollover::ClockWentBack, Some(current)) => {
                tracing::warn!(
                    hour = %hour,
                    current = %current.name,
                    "Clock moved back into an earlier hour, keeping the current ConfigMap"
                );
                current
            }
            _ => {
                let name = format!("{}-{}", self.prefix, hour);
                tracing::info!(
                    config_map = %name,
                    hour = %hour,
                    "Creating new ConfigMap for the current hour"
                );
                Partition {
                    hour,
                    name,
                    entries: BTreeMap::new(),
                    rolled_over_at: now,
                }
            }
        };

        let partition = self.partition.insert(partition);
        partition
            .entries
            .insert(sanitize_key(instance_key), node_name.to_string());

        persist(&self.documents, partition).await
    }
}

async fn persist<D: DocumentStore>(
    documents: &D,
    partition: &Partition,
) -> Result<(), StoreError> {
    let name = partition.name.clone();
    let doc = partition.to_document();

    match documents.get(&name).await {
        Ok(_) => {
            documents
                .update(&name, &doc)
                .await
                .map_err(|source| StoreError::Update {
                    name: name.clone(),
                    source,
                })?;
            tracing::debug!(
                config_map = %name,
                entries = partition.entries.len(),
                "Updated ConfigMap"
            );
        }
        Err(e) if e.is_not_found() => {
            documents
                .create(&doc)
                .await
                .map_err(|source| StoreError::Create {
                    name: name.clone(),
                    source,
                })?;
            tracing::info!(config_map = %name, "Created new ConfigMap");
        }
        Err(source) => return Err(StoreError::Get { name, source }),
    }
    Ok(())
}
