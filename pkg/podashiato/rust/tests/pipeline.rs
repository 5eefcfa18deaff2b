// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use pod_ashiato::config::SamplerConfig;
use pod_ashiato::sampler::Sampler;
use pod_ashiato::sink::{JsonLines, Recording};
use pod_ashiato::store::PartitionedStore;
use pod_ashiato::testing::{
    DocumentOp, ManualClock, MemoryDocuments, StaticPods, labeled_pod, pod,
};

type RecordingSink = Recording<JsonLines<Vec<u8>>, MemoryDocuments, ManualClock>;
type Pipeline = Sampler<StaticPods, RecordingSink, ManualClock>;

fn pipeline(
    pods: &StaticPods,
    docs: &MemoryDocuments,
    clock: &ManualClock,
    config: SamplerConfig,
) -> Pipeline {
    let store = PartitionedStore::with_clock(docs.clone(), "pod-ashiato", clock.clone());
    let sink = Recording::new(JsonLines::new(Vec::new()), store);
    Sampler::with_clock(pods.clone(), sink, config, clock.clone())
}

fn unfiltered() -> SamplerConfig {
    SamplerConfig {
        namespace: None,
        name_prefix: None,
        label_selector: None,
        interval: Duration::from_secs(30),
    }
}

fn output_lines(sampler: &Pipeline) -> Vec<serde_json::Value> {
    let out = String::from_utf8(sampler.sink().inner().get_ref().clone()).unwrap();
    out.lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

fn mapping(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

// ===========================================================================
// Sampling and recording within one hour
// ===========================================================================

#[tokio::test]
async fn test_cycle_writes_lines_and_hourly_document() {
    let pods = StaticPods::new(vec![
        pod("default", "web-0", "worker-1"),
        pod("kube-system", "coredns-abc", "worker-2"),
    ]);
    let docs = MemoryDocuments::default();
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 6, 7, 15, 0).unwrap());
    let mut sampler = pipeline(&pods, &docs, &clock, unfiltered());

    assert_eq!(sampler.run_once().await.unwrap(), 2);

    let lines = output_lines(&sampler);
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["pod_name"], "web-0");
    assert_eq!(lines[0]["node_name"], "worker-1");
    assert_eq!(lines[0]["timestamp"], "2024-05-06T07:15:00Z");
    assert!(lines[0].get("conditions").is_none());

    assert_eq!(
        docs.data("pod-ashiato-2024050607"),
        Some(mapping(&[
            ("default_web-0", "worker-1"),
            ("kube-system_coredns-abc", "worker-2"),
        ]))
    );
}

#[tokio::test]
async fn test_filters_apply_before_recording() {
    let pods = StaticPods::new(vec![
        labeled_pod("default", "web-0", "n1", &[("app", "web")]),
        labeled_pod("default", "web-canary", "n2", &[("app", "canary")]),
        labeled_pod("default", "api-0", "n3", &[("app", "web")]),
        labeled_pod("staging", "web-0", "n4", &[("app", "web")]),
    ]);
    let docs = MemoryDocuments::default();
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 6, 7, 15, 0).unwrap());
    let config = SamplerConfig {
        namespace: Some("default".to_string()),
        name_prefix: Some("web".to_string()),
        label_selector: Some("app=web".to_string()),
        interval: Duration::from_secs(30),
    };
    let mut sampler = pipeline(&pods, &docs, &clock, config);

    assert_eq!(sampler.run_once().await.unwrap(), 1);
    assert_eq!(
        docs.data("pod-ashiato-2024050607"),
        Some(mapping(&[("default_web-0", "n1")]))
    );
}

#[tokio::test]
async fn test_pod_moving_nodes_overwrites_entry() {
    let pods = StaticPods::new(vec![pod("default", "web-0", "n1")]);
    let docs = MemoryDocuments::default();
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 6, 7, 0, 0).unwrap());
    let mut sampler = pipeline(&pods, &docs, &clock, unfiltered());

    sampler.run_once().await.unwrap();
    pods.set_pods(vec![pod("default", "web-0", "n2")]);
    clock.advance(chrono::Duration::seconds(30));
    sampler.run_once().await.unwrap();

    assert_eq!(
        docs.data("pod-ashiato-2024050607"),
        Some(mapping(&[("default_web-0", "n2")]))
    );
    assert_eq!(output_lines(&sampler).len(), 2);
}

// ===========================================================================
// Hour rollover
// ===========================================================================

#[tokio::test]
async fn test_rollover_leaves_previous_document_untouched() {
    let pods = StaticPods::new(vec![pod("default", "web-0", "n1")]);
    let docs = MemoryDocuments::default();
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 6, 7, 59, 30).unwrap());
    let mut sampler = pipeline(&pods, &docs, &clock, unfiltered());

    sampler.run_once().await.unwrap();
    pods.set_pods(vec![pod("default", "web-1", "n2")]);
    clock.advance(chrono::Duration::seconds(60));
    sampler.run_once().await.unwrap();

    assert_eq!(
        docs.names(),
        vec!["pod-ashiato-2024050607", "pod-ashiato-2024050608"]
    );
    assert_eq!(
        docs.data("pod-ashiato-2024050607"),
        Some(mapping(&[("default_web-0", "n1")]))
    );
    assert_eq!(
        docs.data("pod-ashiato-2024050608"),
        Some(mapping(&[("default_web-1", "n2")]))
    );
}

// ===========================================================================
// Failures
// ===========================================================================

#[tokio::test]
async fn test_store_failure_does_not_abort_cycle() {
    let pods = StaticPods::new(vec![
        pod("default", "web-0", "n1"),
        pod("default", "web-1", "n2"),
    ]);
    let docs = MemoryDocuments::default();
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 6, 7, 0, 0).unwrap());
    let mut sampler = pipeline(&pods, &docs, &clock, unfiltered());

    docs.fail_next(DocumentOp::Get);
    assert_eq!(sampler.run_once().await.unwrap(), 2);

    // Both lines were written; the second record persisted the full buffer.
    assert_eq!(output_lines(&sampler).len(), 2);
    assert_eq!(
        docs.data("pod-ashiato-2024050607"),
        Some(mapping(&[("default_web-0", "n1"), ("default_web-1", "n2")]))
    );
}

#[tokio::test]
async fn test_list_failure_writes_nothing() {
    let pods = StaticPods::new(vec![pod("default", "web-0", "n1")]);
    pods.fail_next_list();
    let docs = MemoryDocuments::default();
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 6, 7, 0, 0).unwrap());
    let mut sampler = pipeline(&pods, &docs, &clock, unfiltered());

    assert!(sampler.run_once().await.is_err());
    assert!(output_lines(&sampler).is_empty());
    assert!(docs.names().is_empty());
}
