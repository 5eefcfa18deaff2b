// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! In-memory stand-ins for the Kubernetes API, the clock and the output sink.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, FixedOffset, Offset, Utc};
use k8s_openapi::api::core::v1::{ConfigMap, Pod, PodSpec, PodStatus};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::core::ErrorResponse;
use tracing_subscriber::fmt::MakeWriter;

use crate::clock::Clock;
use crate::cluster::{DocumentStore, PodSource};
use crate::error::{ApiError, EmitError};
use crate::record::PlacementRecord;
use crate::sink::RecordSink;

fn server_error(kind: &'static str, name: &str) -> ApiError {
    ApiError::from_kube(
        kind,
        name,
        kube::Error::Api(ErrorResponse {
            status: "Failure".to_string(),
            message: "injected failure".to_string(),
            reason: "InternalError".to_string(),
            code: 500,
        }),
    )
}

/// A running pod scheduled on `node`.
pub fn pod(namespace: &str, name: &str, node: &str) -> Pod {
    Pod {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        spec: Some(PodSpec {
            node_name: (!node.is_empty()).then(|| node.to_string()),
            ..Default::default()
        }),
        status: Some(PodStatus {
            phase: Some("Running".to_string()),
            pod_ip: Some("10.0.0.1".to_string()),
            ..Default::default()
        }),
    }
}

/// Like [`pod`], with labels.
pub fn labeled_pod(namespace: &str, name: &str, node: &str, labels: &[(&str, &str)]) -> Pod {
    let mut pod = pod(namespace, name, node);
    pod.metadata.labels = Some(
        labels
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    );
    pod
}

#[derive(Default)]
struct PodsInner {
    pods: Mutex<Vec<Pod>>,
    calls: AtomicUsize,
    fail_next: AtomicBool,
    delay: Mutex<Option<Duration>>,
}

/// Fixed pod list. Applies namespace and equality-based label selectors
/// (`k=v,k2=v2`) the way the API server would.
#[derive(Clone, Default)]
pub struct StaticPods {
    inner: Arc<PodsInner>,
}

impl StaticPods {
    pub fn new(pods: Vec<Pod>) -> Self {
        let source = Self::default();
        source.set_pods(pods);
        source
    }

    pub fn set_pods(&self, pods: Vec<Pod>) {
        *self.inner.pods.lock().unwrap() = pods;
    }

    pub fn fail_next_list(&self) {
        self.inner.fail_next.store(true, Ordering::SeqCst);
    }

    /// Make every list call take `delay` (tokio time).
    pub fn set_list_delay(&self, delay: Duration) {
        *self.inner.delay.lock().unwrap() = Some(delay);
    }

    pub fn list_calls(&self) -> usize {
        self.inner.calls.load(Ordering::SeqCst)
    }
}

fn selector_matches(pod: &Pod, selector: &str) -> bool {
    let labels = pod.metadata.labels.clone().unwrap_or_default();
    selector
        .split(',')
        .map(str::trim)
        .filter(|term| !term.is_empty())
        .all(|term| match term.split_once('=') {
            Some((key, value)) => labels.get(key.trim()).map(String::as_str) == Some(value.trim()),
            None => labels.contains_key(term),
        })
}

impl PodSource for StaticPods {
    async fn list(
        &self,
        namespace: Option<&str>,
        label_selector: Option<&str>,
    ) -> Result<Vec<Pod>, ApiError> {
        self.inner.calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.inner.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.inner.fail_next.swap(false, Ordering::SeqCst) {
            return Err(server_error("pods", namespace.unwrap_or_default()));
        }

        let pods = self.inner.pods.lock().unwrap().clone();
        Ok(pods
            .into_iter()
            .filter(|p| namespace.is_none_or(|ns| p.metadata.namespace.as_deref() == Some(ns)))
            .filter(|p| label_selector.is_none_or(|sel| selector_matches(p, sel)))
            .collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentOp {
    Get,
    Create,
    Update,
}

#[derive(Default)]
struct DocumentsInner {
    docs: Mutex<BTreeMap<String, ConfigMap>>,
    fail_next: Mutex<HashSet<DocumentOp>>,
    calls: Mutex<HashMap<DocumentOp, usize>>,
}

/// ConfigMaps held in memory, with per-operation failure injection.
#[derive(Clone, Default)]
pub struct MemoryDocuments {
    inner: Arc<DocumentsInner>,
}

impl MemoryDocuments {
    /// Make the next call of `op` fail with a server error.
    pub fn fail_next(&self, op: DocumentOp) {
        self.inner.fail_next.lock().unwrap().insert(op);
    }

    pub fn calls(&self, op: DocumentOp) -> usize {
        let calls = self.inner.calls.lock().unwrap();
        calls.get(&op).copied().unwrap_or(0)
    }

    pub fn names(&self) -> Vec<String> {
        self.inner.docs.lock().unwrap().keys().cloned().collect()
    }

    pub fn document(&self, name: &str) -> Option<ConfigMap> {
        self.inner.docs.lock().unwrap().get(name).cloned()
    }

    pub fn data(&self, name: &str) -> Option<BTreeMap<String, String>> {
        self.document(name).and_then(|doc| doc.data)
    }

    /// Seed a document as if it had been written earlier.
    pub fn insert_data(&self, name: &str, data: BTreeMap<String, String>) {
        let doc = ConfigMap {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                ..Default::default()
            },
            data: Some(data),
            ..Default::default()
        };
        self.inner.docs.lock().unwrap().insert(name.to_string(), doc);
    }

    fn begin(&self, op: DocumentOp, name: &str) -> Result<(), ApiError> {
        *self
            .inner
            .calls
            .lock()
            .unwrap()
            .entry(op)
            .or_default() += 1;
        if self.inner.fail_next.lock().unwrap().remove(&op) {
            return Err(server_error("configmap", name));
        }
        Ok(())
    }
}

impl DocumentStore for MemoryDocuments {
    async fn get(&self, name: &str) -> Result<ConfigMap, ApiError> {
        self.begin(DocumentOp::Get, name)?;
        self.document(name).ok_or_else(|| ApiError::NotFound {
            kind: "configmap",
            name: name.to_string(),
        })
    }

    async fn create(&self, doc: &ConfigMap) -> Result<ConfigMap, ApiError> {
        let name = doc.metadata.name.clone().unwrap_or_default();
        self.begin(DocumentOp::Create, &name)?;
        let mut docs = self.inner.docs.lock().unwrap();
        if docs.contains_key(&name) {
            return Err(ApiError::Conflict {
                kind: "configmap",
                name,
            });
        }
        docs.insert(name, doc.clone());
        Ok(doc.clone())
    }

    async fn update(&self, name: &str, doc: &ConfigMap) -> Result<ConfigMap, ApiError> {
        self.begin(DocumentOp::Update, name)?;
        let mut docs = self.inner.docs.lock().unwrap();
        if !docs.contains_key(name) {
            return Err(ApiError::NotFound {
                kind: "configmap",
                name: name.to_string(),
            });
        }
        docs.insert(name.to_string(), doc.clone());
        Ok(doc.clone())
    }
}

/// Clock that only moves when told to. Its local zone is UTC unless set with
/// [`ManualClock::with_offset`].
#[derive(Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
    offset: FixedOffset,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(now)),
            offset: Utc.fix(),
        }
    }

    /// Pretend the host runs `offset` east of UTC.
    pub fn with_offset(mut self, offset: FixedOffset) -> Self {
        self.offset = offset;
        self
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap() = now;
    }

    pub fn advance(&self, by: chrono::Duration) {
        *self.now.lock().unwrap() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }

    fn local_offset(&self, _at: DateTime<Utc>) -> FixedOffset {
        self.offset
    }
}

/// Keeps emitted records; can refuse records for chosen pod names.
#[derive(Clone, Default)]
pub struct CollectingSink {
    records: Arc<Mutex<Vec<PlacementRecord>>>,
    rejected: Arc<Mutex<HashSet<String>>>,
}

impl CollectingSink {
    pub fn records(&self) -> Vec<PlacementRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn reject(&self, pod_name: &str) {
        self.rejected.lock().unwrap().insert(pod_name.to_string());
    }
}

impl RecordSink for CollectingSink {
    async fn emit(&mut self, record: &PlacementRecord) -> Result<(), EmitError> {
        if self.rejected.lock().unwrap().contains(&record.pod_name) {
            return Err(EmitError::Write(io::Error::other("rejected by test sink")));
        }
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}

/// Collects formatted log lines from the current thread.
#[derive(Clone, Default)]
pub struct LogCapture {
    buf: Arc<Mutex<Vec<u8>>>,
}

pub struct LogCaptureWriter {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl io::Write for LogCaptureWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.lock().unwrap().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = LogCaptureWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LogCaptureWriter {
            buf: self.buf.clone(),
        }
    }
}

impl LogCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route this thread's events here until the guard drops.
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let subscriber = tracing_subscriber::fmt()
            .with_writer(self.clone())
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buf.lock().unwrap()).into_owned()
    }

    /// Number of lines containing `needle`.
    pub fn count(&self, needle: &str) -> usize {
        self.contents()
            .lines()
            .filter(|line| line.contains(needle))
            .count()
    }
}
