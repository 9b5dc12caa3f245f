//! # Integration Tests
//!
//! Cross-crate and end-to-end tests.
//!
//! Covers:
//! - Wire contract snapshots
//! - Config file -> pipeline -> durable queue -> sender
//! - Failure classification across dispatch cycles
//! - Queue durability across restarts
//! - Concurrent producers against a single-flight dispatcher

#[cfg(test)]
mod support {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use contracts::{LifecycleLease, NetworkSender, SendFailure, WireEvent};

    /// Sender replaying scripted results, acknowledging once the script runs out
    #[derive(Clone, Default)]
    pub struct ScriptedSender {
        results: Arc<Mutex<VecDeque<Result<(), SendFailure>>>>,
        attempts: Arc<Mutex<Vec<Vec<String>>>>,
        delivered: Arc<Mutex<Vec<WireEvent>>>,
    }

    impl ScriptedSender {
        pub fn new(results: impl IntoIterator<Item = Result<(), SendFailure>>) -> Self {
            let sender = Self::default();
            sender.results.lock().unwrap().extend(results);
            sender
        }

        /// Event names per attempted batch
        pub fn attempts(&self) -> Vec<Vec<String>> {
            self.attempts.lock().unwrap().clone()
        }

        pub fn delivered(&self) -> Vec<WireEvent> {
            self.delivered.lock().unwrap().clone()
        }

        pub fn delivered_names(&self) -> Vec<String> {
            self.delivered().into_iter().map(|e| e.event).collect()
        }
    }

    impl NetworkSender for ScriptedSender {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn send(&self, batch: &[WireEvent]) -> Result<(), SendFailure> {
            self.attempts
                .lock()
                .unwrap()
                .push(batch.iter().map(|e| e.event.clone()).collect());
            let result = self.results.lock().unwrap().pop_front().unwrap_or(Ok(()));
            if result.is_ok() {
                self.delivered.lock().unwrap().extend_from_slice(batch);
            }
            result
        }
    }

    /// Sender that never gets through
    #[derive(Clone, Default)]
    pub struct OfflineSender;

    impl NetworkSender for OfflineSender {
        fn name(&self) -> &str {
            "offline"
        }

        async fn send(&self, _batch: &[WireEvent]) -> Result<(), SendFailure> {
            Err(SendFailure::transient("connection refused"))
        }
    }

    /// Sender that records the highest number of overlapping sends
    #[derive(Clone, Default)]
    pub struct OverlapSender {
        in_flight: Arc<AtomicUsize>,
        max_in_flight: Arc<AtomicUsize>,
        delivered: Arc<Mutex<Vec<WireEvent>>>,
    }

    impl OverlapSender {
        pub fn max_in_flight(&self) -> usize {
            self.max_in_flight.load(Ordering::SeqCst)
        }

        pub fn delivered(&self) -> Vec<WireEvent> {
            self.delivered.lock().unwrap().clone()
        }
    }

    impl NetworkSender for OverlapSender {
        fn name(&self) -> &str {
            "overlap"
        }

        async fn send(&self, batch: &[WireEvent]) -> Result<(), SendFailure> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(1)).await;
            self.delivered.lock().unwrap().extend_from_slice(batch);
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[derive(Default)]
    pub struct CountingLease {
        pub acquired: AtomicUsize,
        pub released: AtomicUsize,
    }

    impl LifecycleLease for CountingLease {
        fn acquire(&self) {
            self.acquired.fetch_add(1, Ordering::SeqCst);
        }

        fn release(&self) {
            self.released.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[cfg(test)]
mod contract_tests {
    use contracts::{RawEvent, WireEvent};

    #[test]
    fn test_wire_event_field_names() {
        let json = r#"{
            "tenant": 7,
            "category": "track",
            "event": "page_view",
            "origin": "sdk",
            "customer": null,
            "visitor": "0123456789abcdef",
            "timestamp": "2024-05-01T12:00:00Z",
            "context": {"path": "/", "depth": 2, "logged_in": true},
            "metadata": {
                "channel": "web",
                "realtime": false,
                "eventId": "6f1c2e1a-7a3b-4f4e-9a55-0b8f3b2d9c11"
            }
        }"#;
        let event: WireEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.tenant, 7);
        assert_eq!(event.actor_id(), "0123456789abcdef");

        let value = serde_json::to_value(&event).unwrap();
        let keys: Vec<&str> = value
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        for key in [
            "tenant", "category", "event", "origin", "customer", "visitor", "timestamp",
            "context", "metadata",
        ] {
            assert!(keys.contains(&key), "missing wire field {key}");
        }
        assert!(value["metadata"].get("eventId").is_some());
        assert!(value["metadata"].get("validations").is_none());

        let context_keys: Vec<&str> = value["context"]
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(context_keys.len(), 3);
    }

    #[test]
    fn test_raw_event_minimal_json() {
        let event: RawEvent = serde_json::from_str(r#"{"name":"login"}"#).unwrap();
        assert_eq!(event.name, "login");
        assert!(event.attributes.is_empty());
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::collections::{BTreeMap, HashSet};
    use std::sync::atomic::Ordering;
    use std::sync::Arc;
    use std::time::Duration;

    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{RawEvent, SendFailure, TelemetryConfig, WireEvent};
    use ingestion::{EventPipeline, ReportOutcome, SET_USER_ID_EVENT, USER_ID_KEY};

    use crate::support::{CountingLease, OfflineSender, OverlapSender, ScriptedSender};

    const CONFIG: &str = r#"
tenant_id = 1001

[limits]
max_parameters = 3

[dispatch]
interval_s = 0.0
flush_interval_s = 0.0
batch_size = 2

[decoration]
channel = "web"

[events.page_view.parameters.path]
type = "String"
mandatory = true

[events.page_view.parameters.title]
type = "String"

[events.page_view.parameters.depth]
type = "Number"

[events.checkout]
realtime = true

[events.checkout.parameters.total]
type = "Number"
mandatory = true

[events.set_user_id_event.parameters.userId]
type = "String"
mandatory = true
"#;

    fn load_config() -> TelemetryConfig {
        ConfigLoader::load_from_str(CONFIG, ConfigFormat::Toml).unwrap()
    }

    fn page_view(path: &str) -> RawEvent {
        RawEvent::new("page_view").with_attribute("path", path)
    }

    #[tokio::test]
    async fn test_config_to_delivery() {
        let sender = ScriptedSender::default();
        let pipeline = EventPipeline::builder(load_config(), sender.clone())
            .build()
            .unwrap();

        let outcomes = pipeline.report_all(vec![
            page_view("/"),
            RawEvent::new("missing_schema"),
            page_view("/products").with_attribute("depth", "deep"),
            page_view("/cart"),
        ]);
        let queued: Vec<bool> = outcomes.iter().map(ReportOutcome::is_queued).collect();
        assert_eq!(queued, vec![true, false, true, true]);
        assert_eq!(outcomes[1].issues()[0].code, 1010);
        assert_eq!(outcomes[2].issues()[0].code, 1060);
        assert_eq!(pipeline.queue().len(), 3);

        assert!(pipeline.dispatch_now());
        pipeline.dispatcher().wait_idle().await;

        assert_eq!(
            sender.attempts(),
            vec![
                vec!["page_view".to_string(), "page_view".to_string()],
                vec!["page_view".to_string()],
            ]
        );
        assert!(pipeline.queue().is_empty());

        let delivered = sender.delivered();
        assert!(delivered.iter().all(|e| e.tenant == 1001));
        assert!(delivered
            .iter()
            .all(|e| e.metadata.channel.as_deref() == Some("web")));
        assert_eq!(delivered[1].metadata.validations[0].code, 1060);
        let paths: Vec<String> = delivered
            .iter()
            .filter_map(|e| e.context.get("path").map(ToString::to_string))
            .collect();
        assert_eq!(paths, vec!["/", "/products", "/cart"]);

        let summary: observability::DeliverySummary = pipeline.dispatcher().delivery_summary();
        assert_eq!(summary.batches, 2);
        assert_eq!(summary.delivered_events, 3);

        pipeline.shutdown().await;
    }

    #[tokio::test]
    async fn test_realtime_event_drains_backlog_in_order() {
        let sender = ScriptedSender::default();
        let pipeline = EventPipeline::builder(load_config(), sender.clone())
            .build()
            .unwrap();

        pipeline.report(page_view("/a"));
        pipeline.report(page_view("/b"));
        assert_eq!(pipeline.queue().len(), 2);

        let outcome = pipeline.report(RawEvent::new("checkout").with_attribute("total", 42.5));
        assert_eq!(
            outcome,
            ReportOutcome::Queued {
                issues: Vec::new(),
                realtime: true
            }
        );
        pipeline.dispatcher().wait_idle().await;

        assert_eq!(
            sender.delivered_names(),
            vec!["page_view", "page_view", "checkout"]
        );
        assert!(pipeline.queue().is_empty());
        pipeline.shutdown().await;
    }

    #[tokio::test]
    async fn test_realtime_disabled_waits_for_dispatch_now() {
        let mut config = load_config();
        config.dispatch.realtime_enabled = false;
        let sender = ScriptedSender::default();
        let pipeline = EventPipeline::builder(config, sender.clone())
            .build()
            .unwrap();

        let outcome = pipeline.report(RawEvent::new("checkout").with_attribute("total", 1));
        assert_eq!(
            outcome,
            ReportOutcome::Queued {
                issues: Vec::new(),
                realtime: false
            }
        );
        pipeline.dispatcher().wait_idle().await;
        assert!(sender.attempts().is_empty());

        assert!(pipeline.dispatch_now());
        pipeline.dispatcher().wait_idle().await;
        assert_eq!(sender.delivered_names(), vec!["checkout"]);
        pipeline.shutdown().await;
    }

    #[tokio::test]
    async fn test_transient_failure_keeps_batch_for_next_cycle() {
        let sender = ScriptedSender::new([Err(SendFailure::transient("503"))]);
        let pipeline = EventPipeline::builder(load_config(), sender.clone())
            .build()
            .unwrap();

        pipeline.report_all(vec![page_view("/1"), page_view("/2"), page_view("/3")]);

        assert!(pipeline.dispatch_now());
        pipeline.dispatcher().wait_idle().await;
        assert_eq!(sender.attempts().len(), 1);
        assert_eq!(pipeline.queue().len(), 3);
        let report = pipeline.dispatcher().last_report().unwrap();
        assert_eq!(report.delivered, 0);
        assert!(report.stopped_by.is_some());

        assert!(pipeline.dispatch_now());
        pipeline.dispatcher().wait_idle().await;
        assert!(pipeline.queue().is_empty());
        let paths: Vec<String> = sender
            .delivered()
            .iter()
            .filter_map(|e| e.context.get("path").map(ToString::to_string))
            .collect();
        assert_eq!(paths, vec!["/1", "/2", "/3"]);
        assert_eq!(pipeline.dispatcher().metrics().transient_failures, 1);
        pipeline.shutdown().await;
    }

    #[tokio::test]
    async fn test_request_invalid_batch_is_dropped() {
        let sender = ScriptedSender::new([Err(SendFailure::request_invalid("422"))]);
        let pipeline = EventPipeline::builder(load_config(), sender.clone())
            .build()
            .unwrap();

        pipeline.report_all(vec![page_view("/1"), page_view("/2"), page_view("/3")]);

        assert!(pipeline.dispatch_now());
        pipeline.dispatcher().wait_idle().await;

        // Poisoned batch gone, the cycle stops at the failure
        assert_eq!(sender.attempts().len(), 1);
        assert_eq!(pipeline.queue().len(), 1);
        assert_eq!(pipeline.dispatcher().metrics().events_dropped, 2);

        assert!(pipeline.dispatch_now());
        pipeline.dispatcher().wait_idle().await;
        assert!(pipeline.queue().is_empty());
        assert_eq!(sender.delivered().len(), 1);
        pipeline.shutdown().await;
    }

    #[tokio::test]
    async fn test_queue_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = load_config();
        config.store.path = Some(dir.path().to_path_buf());

        let offline = EventPipeline::builder(config.clone(), OfflineSender)
            .build()
            .unwrap();
        offline.report_all(vec![page_view("/x"), page_view("/y")]);
        assert!(offline.dispatch_now());
        offline.dispatcher().wait_idle().await;
        assert_eq!(offline.queue().len(), 2);
        offline.shutdown().await;
        drop(offline);

        let sender = ScriptedSender::default();
        let online = EventPipeline::builder(config, sender.clone())
            .build()
            .unwrap();
        assert_eq!(online.queue().len(), 2);

        assert!(online.dispatch_now());
        online.dispatcher().wait_idle().await;
        let paths: Vec<String> = sender
            .delivered()
            .iter()
            .filter_map(|e| e.context.get("path").map(ToString::to_string))
            .collect();
        assert_eq!(paths, vec!["/x", "/y"]);
        assert!(online.queue().is_empty());
        online.shutdown().await;
    }

    #[tokio::test]
    async fn test_user_id_is_stamped_on_later_events() {
        let sender = ScriptedSender::default();
        let pipeline = EventPipeline::builder(load_config(), sender.clone())
            .build()
            .unwrap();

        let before = pipeline.report(page_view("/anon"));
        assert!(before.issues().is_empty());

        let set = pipeline.report(RawEvent::new(SET_USER_ID_EVENT).with_attribute(USER_ID_KEY, "u-17"));
        assert!(set.issues().is_empty());

        let again =
            pipeline.report(RawEvent::new(SET_USER_ID_EVENT).with_attribute(USER_ID_KEY, "u-99"));
        assert_eq!(again.issues()[0].code, 1072);

        pipeline.report(page_view("/account"));

        assert!(pipeline.dispatch_now());
        pipeline.dispatcher().wait_idle().await;

        let delivered = sender.delivered();
        let anon = delivered
            .iter()
            .find(|e| e.context.get("path").map(ToString::to_string).as_deref() == Some("/anon"))
            .unwrap();
        assert!(anon.customer.is_none());
        let account = delivered
            .iter()
            .find(|e| e.context.get("path").map(ToString::to_string).as_deref() == Some("/account"))
            .unwrap();
        assert_eq!(account.customer.as_deref(), Some("u-17"));
        assert_eq!(account.visitor, anon.visitor);
        pipeline.shutdown().await;
    }

    #[tokio::test]
    async fn test_file_sink_receives_accepted_events() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("archive.jsonl");
        let content = format!(
            "{CONFIG}\n[[sinks]]\nname = \"archive\"\nsink_type = \"file\"\n\n[sinks.params]\npath = \"{}\"\n",
            archive.display()
        );
        let config = ConfigLoader::load_from_str(&content, ConfigFormat::Toml).unwrap();

        let pipeline = EventPipeline::builder(config, ScriptedSender::default())
            .build()
            .unwrap();
        pipeline.report_all(vec![page_view("/1"), RawEvent::new("nope"), page_view("/2")]);
        pipeline.shutdown().await;

        let written = std::fs::read_to_string(&archive).unwrap();
        let events: Vec<WireEvent> = written
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.event == "page_view"));
    }

    #[tokio::test]
    async fn test_lease_is_balanced_after_cycles() {
        let lease = Arc::new(CountingLease::default());
        let sender = ScriptedSender::default();
        let pipeline = EventPipeline::builder(load_config(), sender.clone())
            .lease(lease.clone())
            .build()
            .unwrap();

        pipeline.report(page_view("/"));
        assert!(pipeline.dispatch_now());
        pipeline.dispatcher().wait_idle().await;
        assert!(pipeline.dispatch_now());
        pipeline.dispatcher().wait_idle().await;

        assert_eq!(lease.acquired.load(Ordering::SeqCst), 2);
        assert_eq!(lease.released.load(Ordering::SeqCst), 2);
        pipeline.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_producers_deliver_exactly_once() {
        const PRODUCERS: usize = 4;
        const PER_PRODUCER: usize = 60;
        const CHECKOUTS: usize = 10;

        let mut config = load_config();
        config.dispatch.batch_size = 7;
        let sender = OverlapSender::default();
        let pipeline = Arc::new(
            EventPipeline::builder(config, sender.clone())
                .build()
                .unwrap(),
        );

        let mut producers = Vec::new();
        for producer in 0..PRODUCERS {
            let pipeline = Arc::clone(&pipeline);
            producers.push(tokio::spawn(async move {
                let mut queued = 0;
                for seq in 0..PER_PRODUCER {
                    if pipeline.report(page_view(&format!("/{producer}/{seq}"))).is_queued() {
                        queued += 1;
                    }
                    if seq % 5 == 0 {
                        tokio::task::yield_now().await;
                    }
                }
                queued
            }));
        }

        let realtime = {
            let pipeline = Arc::clone(&pipeline);
            tokio::spawn(async move {
                let mut queued = 0;
                for total in 0..CHECKOUTS {
                    let outcome = pipeline
                        .report(RawEvent::new("checkout").with_attribute("total", total as f64));
                    if outcome.is_queued() {
                        queued += 1;
                    }
                    tokio::time::sleep(Duration::from_millis(2)).await;
                }
                queued
            })
        };

        let manual = {
            let pipeline = Arc::clone(&pipeline);
            tokio::spawn(async move {
                for _ in 0..30 {
                    pipeline.dispatch_now();
                    tokio::time::sleep(Duration::from_millis(1)).await;
                }
            })
        };

        let mut accepted = 0;
        for producer in producers {
            accepted += producer.await.unwrap();
        }
        accepted += realtime.await.unwrap();
        manual.await.unwrap();
        assert_eq!(accepted, PRODUCERS * PER_PRODUCER + CHECKOUTS);

        // Reports that raced a running cycle wait for one more drain
        while !pipeline.queue().is_empty() {
            pipeline.dispatcher().wait_idle().await;
            pipeline.dispatch_now();
            pipeline.dispatcher().wait_idle().await;
        }

        let delivered = sender.delivered();
        assert_eq!(delivered.len(), accepted);
        let ids: HashSet<_> = delivered.iter().map(|e| e.id()).collect();
        assert_eq!(ids.len(), accepted);

        let mut per_producer: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for event in delivered.iter().filter(|e| e.event == "page_view") {
            let path = event.context.get("path").unwrap().to_string();
            let (producer, seq) = path.trim_start_matches('/').split_once('/').unwrap();
            per_producer
                .entry(producer.to_string())
                .or_default()
                .push(seq.parse().unwrap());
        }
        assert_eq!(per_producer.len(), PRODUCERS);
        let expected: Vec<usize> = (0..PER_PRODUCER).collect();
        for seqs in per_producer.values() {
            assert_eq!(seqs, &expected);
        }
        assert_eq!(
            delivered.iter().filter(|e| e.event == "checkout").count(),
            CHECKOUTS
        );

        assert_eq!(sender.max_in_flight(), 1);
        pipeline.shutdown().await;
    }
}
