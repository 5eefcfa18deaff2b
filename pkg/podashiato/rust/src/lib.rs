// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Pod placement footprints ("ashiato") for a Kubernetes cluster.
//!
//! The crate samples pods on a fixed interval and records which node each one
//! runs on. It is made of two independent pieces composed by the binary:
//!
//! 1. **Sampler** (`sampler` module) - lists pods, applies the namespace,
//!    label-selector and name-prefix filters, and emits one
//!    [`PlacementRecord`](record::PlacementRecord) per matching pod.
//!
//! 2. **Partitioned store** (`store` module) - accumulates `pod -> node` facts
//!    for the current hour and mirrors them into one ConfigMap per hour,
//!    named `pod-ashiato-YYYYMMDDHH`.
//!
//! ## Usage
//!
//! ```bash
//! pod-ashiato \
//!   --namespace kube-system \
//!   --label 'k8s-app=kube-dns' \
//!   --interval-secs 30 \
//!   --store-namespace pod-ashiato
//! ```

pub mod clock;
pub mod cluster;
pub mod config;
pub mod error;
pub mod record;
pub mod sampler;
pub mod sink;
pub mod store;

#[cfg(any(test, feature = "test-helpers"))]
pub mod testing;
