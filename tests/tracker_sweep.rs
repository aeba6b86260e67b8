use std::sync::Arc;
use std::time::Duration;

use nodetrack::network::message::NodeAddress;
use nodetrack::shutdown::Shutdown;
use nodetrack::tracker::{ManualClock, TrackerRegistry};

#[tokio::test(start_paused = true)]
async fn sweep_evicts_without_traffic() {
    let clock = ManualClock::starting_at(1_000);
    let registry = TrackerRegistry::with_clock(Duration::from_secs(300), Arc::new(clock.clone()));
    registry.register(&NodeAddress::new("127.0.0.1", 9001)).await;
    clock.advance(Duration::from_secs(250));
    registry.register(&NodeAddress::new("127.0.0.1", 9002)).await;
    clock.advance(Duration::from_secs(51));

    let shutdown = Shutdown::new();
    let sweeper = registry.spawn_sweeper(Duration::from_secs(60), shutdown.clone());

    // Nothing happens before the first interval elapses.
    tokio::time::sleep(Duration::from_secs(59)).await;
    assert_eq!(registry.len().await, 2);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(registry.len().await, 1);

    shutdown.trigger();
    sweeper.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn sweeper_stops_on_shutdown() {
    let registry = TrackerRegistry::new(Duration::from_secs(300));
    let shutdown = Shutdown::new();
    let sweeper = registry.spawn_sweeper(Duration::from_secs(60), shutdown.clone());

    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(1), sweeper)
        .await
        .expect("sweeper exits promptly")
        .unwrap();
}
