// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

/// Failure reported by the cluster API.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{kind} {name:?} not found")]
    NotFound { kind: &'static str, name: String },

    #[error("{kind} {name:?} conflicts with the stored version")]
    Conflict { kind: &'static str, name: String },

    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),
}

impl ApiError {
    /// Classify a kube error by its HTTP status code.
    pub fn from_kube(kind: &'static str, name: &str, err: kube::Error) -> Self {
        let code = match &err {
            kube::Error::Api(resp) => Some(resp.code),
            _ => None,
        };
        match code {
            Some(404) => ApiError::NotFound {
                kind,
                name: name.to_string(),
            },
            Some(409) => ApiError::Conflict {
                kind,
                name: name.to_string(),
            },
            _ => ApiError::Kube(err),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound { .. })
    }
}

/// A sampling cycle that could not run.
#[derive(Debug, thiserror::Error)]
pub enum SampleError {
    #[error("failed to list pods: {0}")]
    List(#[source] ApiError),
}

/// Persisting the hourly placement document failed.
///
/// The in-memory buffer keeps the update, so the next successful call
/// persists it.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to get ConfigMap {name}: {source}")]
    Get {
        name: String,
        #[source]
        source: ApiError,
    },

    #[error("failed to create ConfigMap {name}: {source}")]
    Create {
        name: String,
        #[source]
        source: ApiError,
    },

    #[error("failed to update ConfigMap {name}: {source}")]
    Update {
        name: String,
        #[source]
        source: ApiError,
    },
}

/// A single record could not be emitted. Never aborts a cycle.
#[derive(Debug, thiserror::Error)]
pub enum EmitError {
    #[error("failed to marshal placement record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write placement record: {0}")]
    Write(#[from] std::io::Error),

    /// The record was written; only persisting its placement failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}
