// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Result, bail};
use clap::{Parser, ValueEnum};

use crate::store::DEFAULT_DOCUMENT_PREFIX;

/// Record which node every pod runs on
#[derive(Parser, Debug, Clone)]
#[command(name = "pod-ashiato")]
#[command(about = "Log pod placements and keep an hourly pod-to-node ConfigMap")]
pub struct Cli {
    /// Path to the kubeconfig file (inferred from the environment when omitted)
    #[arg(long)]
    pub kubeconfig: Option<PathBuf>,

    /// Interval between pod checks, in seconds
    #[arg(long, default_value = "30")]
    pub interval_secs: u64,

    /// Run only once and exit
    #[arg(long, default_value = "false")]
    pub oneshot: bool,

    /// Filter pods by namespace (default: all namespaces)
    #[arg(long, default_value = "")]
    pub namespace: String,

    /// Filter pods by name prefix
    #[arg(long = "name", default_value = "")]
    pub name_prefix: String,

    /// Filter pods by label selector (e.g. 'app=nginx,env=prod')
    #[arg(long = "label", default_value = "")]
    pub label_selector: String,

    /// Namespace for the hourly pod-to-node ConfigMaps; storing is disabled when unset
    #[arg(long, env = "POD_ASHIATO_STORE_NAMESPACE")]
    pub store_namespace: Option<String>,

    /// Name prefix for the hourly ConfigMaps
    #[arg(long, default_value = DEFAULT_DOCUMENT_PREFIX)]
    pub store_prefix: String,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Json)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Json,
    Text,
}

/// Filters and cadence of the sampler. Empty filters are `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SamplerConfig {
    pub namespace: Option<String>,
    pub name_prefix: Option<String>,
    pub label_selector: Option<String>,
    pub interval: Duration,
}

impl SamplerConfig {
    pub fn has_filters(&self) -> bool {
        self.namespace.is_some() || self.name_prefix.is_some() || self.label_selector.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub namespace: String,
    pub prefix: String,
}

impl Cli {
    pub fn sampler_config(&self) -> Result<SamplerConfig> {
        if self.interval_secs == 0 {
            bail!("--interval-secs must be greater than zero");
        }
        Ok(SamplerConfig {
            namespace: non_empty(&self.namespace),
            name_prefix: non_empty(&self.name_prefix),
            label_selector: non_empty(&self.label_selector),
            interval: Duration::from_secs(self.interval_secs),
        })
    }

    pub fn store_config(&self) -> Result<Option<StoreConfig>> {
        let Some(namespace) = self.store_namespace.as_deref().and_then(non_empty) else {
            return Ok(None);
        };
        let prefix = self.store_prefix.trim();
        if prefix.is_empty() {
            bail!("--store-prefix must not be empty");
        }
        Ok(Some(StoreConfig {
            namespace,
            prefix: prefix.to_string(),
        }))
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
