// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Flat, serializable view of where a pod runs at sampling time.

use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::Pod;
use serde::Serialize;

/// Serialized in place of a missing `lastTransitionTime` (0001-01-01T00:00:00Z).
const ZERO_TIME_SECS: i64 = -62_135_596_800;

/// One pod's placement, captured during a sampling cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlacementRecord {
    pub namespace: String,
    pub pod_name: String,
    pub node_name: String,
    pub pod_ip: String,
    /// Pod phase (Pending, Running, Succeeded, Failed, Unknown), kept opaque.
    pub phase: String,
    /// When the sample was taken, not when the pod last changed.
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<PlacementCondition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlacementCondition {
    #[serde(rename = "type")]
    pub type_: String,
    pub status: String,
    pub last_transition_time: DateTime<Utc>,
}

impl PlacementRecord {
    pub fn from_pod(pod: &Pod, captured_at: DateTime<Utc>) -> Self {
        let metadata = &pod.metadata;
        let status = pod.status.as_ref();

        let conditions = status
            .and_then(|s| s.conditions.as_ref())
            .map(|conditions| {
                conditions
                    .iter()
                    .map(|c| PlacementCondition {
                        type_: c.type_.clone(),
                        status: c.status.clone(),
                        last_transition_time: c
                            .last_transition_time
                            .as_ref()
                            .map(|t| t.0)
                            .unwrap_or_else(zero_time),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            namespace: metadata.namespace.clone().unwrap_or_default(),
            pod_name: metadata.name.clone().unwrap_or_default(),
            node_name: pod
                .spec
                .as_ref()
                .and_then(|s| s.node_name.clone())
                .unwrap_or_default(),
            pod_ip: status.and_then(|s| s.pod_ip.clone()).unwrap_or_default(),
            phase: status.and_then(|s| s.phase.clone()).unwrap_or_default(),
            timestamp: captured_at,
            conditions,
        }
    }

    /// `<namespace>/<pod_name>`, the key under which the store records this pod.
    pub fn instance_key(&self) -> String {
        format!("{}/{}", self.namespace, self.pod_name)
    }
}

fn zero_time() -> DateTime<Utc> {
    DateTime::from_timestamp(ZERO_TIME_SECS, 0).unwrap_or_default()
}
