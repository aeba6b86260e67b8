use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use nodetrack::network::message::NodeAddress;
use nodetrack::tracker::{ManualClock, NodeStatus, TrackerRegistry};

const TTL: Duration = Duration::from_secs(300);

fn registry() -> (TrackerRegistry, ManualClock) {
    let clock = ManualClock::starting_at(1_700_000_000);
    (TrackerRegistry::with_clock(TTL, Arc::new(clock.clone())), clock)
}

#[tokio::test]
async fn submitted_node_is_listed_online() {
    let (registry, _clock) = registry();
    registry.register(&NodeAddress::new("127.0.0.1", 9001)).await;

    let snapshot = registry.list().await;
    assert_eq!(snapshot.len(), 1);
    let record = snapshot.get("127.0.0.1:9001").expect("node listed");
    assert_eq!(record.status, NodeStatus::Online);
    assert_eq!(record.last_seen, 1_700_000_000.0);
}

#[tokio::test]
async fn silent_node_drops_out_after_ttl() {
    let (registry, clock) = registry();
    registry.register(&NodeAddress::new("127.0.0.1", 9001)).await;

    clock.advance(Duration::from_secs(301));
    let snapshot = registry.list().await;
    assert!(snapshot.is_empty());
    // Pruned as a side effect, not only filtered.
    assert_eq!(registry.len().await, 0);
}

#[tokio::test]
async fn entry_at_exactly_ttl_is_not_fresh() {
    let (registry, clock) = registry();
    registry.register(&NodeAddress::new("127.0.0.1", 9001)).await;

    clock.advance(Duration::from_secs(299));
    assert!(registry.list().await.contains("127.0.0.1:9001"));
    clock.advance(Duration::from_secs(1));
    assert!(!registry.list().await.contains("127.0.0.1:9001"));
}

#[tokio::test]
async fn resubmission_refreshes_last_seen() {
    let (registry, clock) = registry();
    let node = NodeAddress::new("127.0.0.1", 9001);
    registry.register(&node).await;
    clock.advance(Duration::from_secs(200));
    registry.register(&node).await;
    clock.advance(Duration::from_secs(200));

    let snapshot = registry.list().await;
    assert_eq!(snapshot.len(), 1);
}

#[tokio::test]
async fn register_returns_fresh_snapshot_without_stale_peers() {
    let (registry, clock) = registry();
    registry.register(&NodeAddress::new("127.0.0.1", 9001)).await;
    clock.advance(Duration::from_secs(301));

    let snapshot = registry.register(&NodeAddress::new("127.0.0.1", 9002)).await;
    assert_eq!(snapshot.len(), 1);
    assert!(snapshot.contains("127.0.0.1:9002"));
}

#[tokio::test]
async fn repeated_listing_is_identical() {
    let (registry, clock) = registry();
    for port in [9003, 9001, 9002] {
        registry.register(&NodeAddress::new("127.0.0.1", port)).await;
        clock.advance(Duration::from_secs(1));
    }
    let first = registry.list().await.to_json();
    let second = registry.list().await.to_json();
    assert_eq!(first, second);
    // Keys come out ordered.
    let a = first.find("9001").unwrap();
    let b = first.find("9002").unwrap();
    let c = first.find("9003").unwrap();
    assert!(a < b && b < c);
}

#[tokio::test]
async fn evict_stale_reports_removed_nodes() {
    let (registry, clock) = registry();
    registry.register(&NodeAddress::new("127.0.0.1", 9001)).await;
    clock.advance(Duration::from_secs(200));
    registry.register(&NodeAddress::new("127.0.0.1", 9002)).await;
    clock.advance(Duration::from_secs(101));

    let evicted = registry.evict_stale().await;
    assert_eq!(evicted, vec!["127.0.0.1:9001".to_string()]);
    assert_eq!(registry.len().await, 1);
}

#[tokio::test]
async fn snapshot_json_matches_wire_format() {
    let (registry, _clock) = registry();
    let snapshot = registry.register(&NodeAddress::new("127.0.0.1", 9001)).await;
    let value: serde_json::Value = serde_json::from_str(&snapshot.to_json()).unwrap();
    assert_eq!(value["127.0.0.1:9001"]["status"], "online");
    assert!(value["127.0.0.1:9001"]["last_seen"].is_f64());
}

#[test]
fn caller_ip_is_echoed() {
    let registry = TrackerRegistry::new(TTL);
    let caller: SocketAddr = "192.168.1.7:51234".parse().unwrap();
    assert_eq!(registry.resolve_caller_ip(caller).to_string(), "192.168.1.7");
}
