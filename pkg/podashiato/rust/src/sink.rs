// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Destinations for placement records.

use std::future::Future;
use std::io::Write;

use crate::clock::Clock;
use crate::cluster::DocumentStore;
use crate::error::EmitError;
use crate::record::PlacementRecord;
use crate::store::PartitionedStore;

/// Receives every record the sampler emits.
///
/// An error is logged by the sampler and skips only that record.
/// [`EmitError::Store`] is reserved for sinks that already wrote the record
/// and failed afterwards to store its placement.
pub trait RecordSink {
    fn emit(
        &mut self,
        record: &PlacementRecord,
    ) -> impl Future<Output = Result<(), EmitError>> + Send;
}

/// Writes each record as one compact JSON object per line.
pub struct JsonLines<W> {
    out: W,
}

impl<W: Write> JsonLines<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    fn write_line(&mut self, record: &PlacementRecord) -> Result<(), EmitError> {
        let line = serde_json::to_string(record)?;
        writeln!(self.out, "{line}")?;
        self.out.flush()?;
        Ok(())
    }
}

impl<W: Write + Send> RecordSink for JsonLines<W> {
    async fn emit(&mut self, record: &PlacementRecord) -> Result<(), EmitError> {
        self.write_line(record)
    }
}

/// Forwards records to `inner`, then records the pod's node in the hourly store.
pub struct Recording<S, D, C> {
    inner: S,
    store: PartitionedStore<D, C>,
}

impl<S, D, C> Recording<S, D, C> {
    pub fn new(inner: S, store: PartitionedStore<D, C>) -> Self {
        Self { inner, store }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn store(&self) -> &PartitionedStore<D, C> {
        &self.store
    }
}

impl<S, D, C> RecordSink for Recording<S, D, C>
where
    S: RecordSink + Send,
    D: DocumentStore + Send + Sync,
    C: Clock + Send + Sync,
{
    async fn emit(&mut self, record: &PlacementRecord) -> Result<(), EmitError> {
        self.inner.emit(record).await?;

        // Unscheduled pods have no placement yet.
        if record.node_name.is_empty() {
            tracing::debug!(
                namespace = %record.namespace,
                pod = %record.pod_name,
                "Pod not scheduled, skipping placement store"
            );
            return Ok(());
        }

        self.store
            .record(&record.instance_key(), &record.node_name)
            .await?;
        Ok(())
    }
}
