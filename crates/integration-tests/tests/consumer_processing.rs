//! Consumers built through the registry drain their queues

use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use taskwire_core::domain::{ConsumerOverrides, TaskOptions};
use taskwire_core::port::shutdown_channel;
use taskwire_core::{AmbientSettings, BackendCatalog, QueueRegistry};
use taskwire_infra_memory::MemoryBackend;

fn registry(settings: Value) -> QueueRegistry {
    let registry = QueueRegistry::new(
        Some(&settings),
        ConsumerOverrides::new(),
        AmbientSettings::new(false),
        BackendCatalog::single(Arc::new(MemoryBackend::new())),
    )
    .unwrap();
    registry.start().unwrap();
    registry
}

async fn wait_for(counter: &AtomicUsize, expected: usize) {
    let reached = tokio::time::timeout(Duration::from_secs(5), async {
        while counter.load(Ordering::SeqCst) < expected {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(reached.is_ok(), "only {} tasks ran", counter.load(Ordering::SeqCst));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_named_consumer_runs_only_its_queue() {
    let registry = registry(json!({
        "emails": {"consumer": {"workers": 2, "initial_delay": 0.01, "max_delay": 0.05, "periodic": false}},
        "reports": {"consumer": {"workers": 1, "periodic": false}},
    }));

    let sent = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&sent);
    let send = registry
        .task(Some("emails"), TaskOptions::default())
        .unwrap()
        .apply("send", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Value::Null)
        })
        .unwrap();
    let report = registry
        .task(Some("reports"), TaskOptions::default())
        .unwrap()
        .apply("report", |_| Ok(Value::Null))
        .unwrap();

    for i in 0..10 {
        send.call(json!({"to": i})).unwrap();
    }
    report.call(Value::Null).unwrap();

    let consumer = registry.consumer_for("emails").unwrap();
    let (tx, token) = shutdown_channel();
    let runner = tokio::spawn({
        let consumer = Arc::clone(&consumer);
        async move { consumer.run(token).await }
    });

    wait_for(&sent, 10).await;
    assert_eq!(registry.client("emails").unwrap().pending(), 0);
    assert_eq!(registry.client("reports").unwrap().pending(), 1);

    tx.shutdown();
    let stopped = tokio::time::timeout(Duration::from_secs(5), runner).await;
    tokio_test::assert_ok!(stopped.unwrap().unwrap());
}

#[tokio::test]
async fn test_failing_tasks_do_not_stop_the_consumer() {
    let registry = registry(json!({
        "name": "jobs",
        "consumer": {"worker_type": "greenlet", "initial_delay": 0.01, "max_delay": 0.05, "periodic": false},
    }));

    let done = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&done);
    let decorator = registry.task(None, TaskOptions::default()).unwrap();
    let flaky = decorator
        .apply("flaky", move |args| {
            if args == json!("fail") {
                panic!("flaky task failed");
            }
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Value::Null)
        })
        .unwrap();

    flaky.call(json!("fail")).unwrap();
    flaky.call(json!("ok")).unwrap();
    flaky.call(json!("ok")).unwrap();

    let consumer = registry.consumer().unwrap();
    assert_eq!(consumer.queue().name(), "jobs");

    let (tx, token) = shutdown_channel();
    let runner = tokio::spawn(async move { consumer.run(token).await });

    wait_for(&done, 2).await;
    tx.shutdown();
    tokio_test::assert_ok!(runner.await.unwrap());
}
