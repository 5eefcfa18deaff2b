// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Kubernetes API access for the sampler and the store.
//!
//! The sampler and the store only see the [`PodSource`] and [`DocumentStore`]
//! traits; [`KubePods`] and [`KubeConfigMaps`] are the implementations backed
//! by a `kube::Client`.

use std::future::Future;
use std::path::Path;

use anyhow::Context;
use k8s_openapi::api::core::v1::{ConfigMap, Pod};
use kube::{
    Client, Config,
    api::{Api, ListParams, PostParams},
    config::{KubeConfigOptions, Kubeconfig},
};

use crate::error::ApiError;

/// Lists pods with server-side namespace and label filtering.
pub trait PodSource {
    /// `namespace: None` lists across all namespaces.
    fn list(
        &self,
        namespace: Option<&str>,
        label_selector: Option<&str>,
    ) -> impl Future<Output = Result<Vec<Pod>, ApiError>> + Send;
}

/// Named ConfigMap documents within a single namespace.
pub trait DocumentStore {
    fn get(&self, name: &str) -> impl Future<Output = Result<ConfigMap, ApiError>> + Send;

    fn create(
        &self,
        doc: &ConfigMap,
    ) -> impl Future<Output = Result<ConfigMap, ApiError>> + Send;

    /// Replace the stored document as a whole.
    fn update(
        &self,
        name: &str,
        doc: &ConfigMap,
    ) -> impl Future<Output = Result<ConfigMap, ApiError>> + Send;
}

/// Build a client from an explicit kubeconfig file, or infer one
/// (in-cluster service account, `$KUBECONFIG`, `~/.kube/config`).
pub async fn connect(kubeconfig: Option<&Path>) -> anyhow::Result<Client> {
    let Some(path) = kubeconfig else {
        return Client::try_default()
            .await
            .context("Failed to infer Kubernetes client configuration");
    };

    let kubeconfig = Kubeconfig::read_from(path)
        .with_context(|| format!("Failed to read kubeconfig {}", path.display()))?;
    let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
        .await
        .with_context(|| format!("Failed to build config from {}", path.display()))?;
    Client::try_from(config).context("Failed to create Kubernetes client")
}

/// Pod listing through the Kubernetes API.
#[derive(Clone)]
pub struct KubePods {
    client: Client,
}

impl KubePods {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl PodSource for KubePods {
    async fn list(
        &self,
        namespace: Option<&str>,
        label_selector: Option<&str>,
    ) -> Result<Vec<Pod>, ApiError> {
        let pods: Api<Pod> = match namespace {
            Some(ns) => Api::namespaced(self.client.clone(), ns),
            None => Api::all(self.client.clone()),
        };

        let mut params = ListParams::default();
        if let Some(selector) = label_selector {
            params = params.labels(selector);
        }

        let pod_list = pods
            .list(&params)
            .await
            .map_err(|e| ApiError::from_kube("pods", namespace.unwrap_or_default(), e))?;

        tracing::debug!(
            namespace = namespace.unwrap_or("*"),
            count = pod_list.items.len(),
            "Listed pods"
        );
        Ok(pod_list.items)
    }
}

/// ConfigMaps in one namespace.
#[derive(Clone)]
pub struct KubeConfigMaps {
    api: Api<ConfigMap>,
}

impl KubeConfigMaps {
    pub fn new(client: Client, namespace: &str) -> Self {
        Self {
            api: Api::namespaced(client, namespace),
        }
    }
}

impl DocumentStore for KubeConfigMaps {
    async fn get(&self, name: &str) -> Result<ConfigMap, ApiError> {
        self.api
            .get(name)
            .await
            .map_err(|e| ApiError::from_kube("configmap", name, e))
    }

    async fn create(&self, doc: &ConfigMap) -> Result<ConfigMap, ApiError> {
        let name = doc.metadata.name.as_deref().unwrap_or_default();
        self.api
            .create(&PostParams::default(), doc)
            .await
            .map_err(|e| ApiError::from_kube("configmap", name, e))
    }

    async fn update(&self, name: &str, doc: &ConfigMap) -> Result<ConfigMap, ApiError> {
        self.api
            .replace(name, &PostParams::default(), doc)
            .await
            .map_err(|e| ApiError::from_kube("configmap", name, e))
    }
}
