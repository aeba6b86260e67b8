use std::sync::Arc;
use std::time::Duration;

use nodetrack::events::{dispatcher, model::LogEvent, sink::MemorySink};
use nodetrack::network::message::NodeAddress;
use nodetrack::tracker::{ManualClock, TrackerRegistry};

#[tokio::test]
async fn registry_changes_are_emitted_as_events() {
    let mem = Arc::new(MemorySink::new());
    dispatcher::init_events(vec![mem.clone()], 64).await;

    let clock = ManualClock::starting_at(5_000);
    let registry = TrackerRegistry::with_clock(Duration::from_secs(300), Arc::new(clock.clone()));
    registry.register(&NodeAddress::new("127.0.0.1", 9001)).await;
    clock.advance(Duration::from_secs(301));
    registry.evict_stale().await;

    // Allow dispatch loop to process
    tokio::time::sleep(Duration::from_millis(50)).await;

    let events = mem.events();
    assert!(events.iter().any(|e| matches!(
        e,
        LogEvent::Registry(r) if r.action == "node_registered" && r.node.as_deref() == Some("127.0.0.1:9001")
    )));
    assert!(events.iter().any(|e| matches!(
        e,
        LogEvent::Registry(r) if r.action == "node_evicted" && r.size == 0
    )));
    let json = serde_json::to_string(&events[0]).unwrap();
    assert!(json.contains(r#""type":"registry""#));
}
