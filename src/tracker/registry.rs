// src/tracker/registry.rs
// Liveness registry: node address -> last submission time.

use crate::events::{emit_registry_event, LogLevel};
use crate::network::message::NodeAddress;
use crate::shutdown::Shutdown;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Wall-clock source in Unix epoch seconds.
pub trait Clock: Send + Sync {
    fn now(&self) -> f64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0)
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    millis: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn starting_at(epoch_secs: u64) -> Self {
        Self {
            millis: Arc::new(AtomicU64::new(epoch_secs * 1000)),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.millis
            .fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        self.millis.load(Ordering::SeqCst) as f64 / 1000.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Online,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub last_seen: f64,
    pub status: NodeStatus,
}

/// Post-eviction view of the registry, ordered by node key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackerSnapshot(BTreeMap<String, NodeRecord>);

impl TrackerSnapshot {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, node: &str) -> Option<&NodeRecord> {
        self.0.get(node)
    }

    pub fn contains(&self, node: &str) -> bool {
        self.0.contains_key(node)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &NodeRecord)> {
        self.0.iter()
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".into())
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

#[derive(Clone)]
pub struct TrackerRegistry {
    inner: Arc<Mutex<HashMap<String, NodeRecord>>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl TrackerRegistry {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            ttl,
            clock,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Record a submission from `address` and return the fresh snapshot.
    pub async fn register(&self, address: &NodeAddress) -> TrackerSnapshot {
        let key = address.to_string();
        let mut map = self.inner.lock().await;
        let now = self.clock.now();
        map.insert(
            key.clone(),
            NodeRecord {
                last_seen: now,
                status: NodeStatus::Online,
            },
        );
        let snapshot = self.prune_locked(&mut map, now);
        emit_registry_event(LogLevel::Info, "node_registered", Some(key), snapshot.len());
        snapshot
    }

    pub async fn list(&self) -> TrackerSnapshot {
        let mut map = self.inner.lock().await;
        let now = self.clock.now();
        self.prune_locked(&mut map, now)
    }

    /// Drop every record older than the TTL. Returns the evicted keys.
    pub async fn evict_stale(&self) -> Vec<String> {
        let mut map = self.inner.lock().await;
        let now = self.clock.now();
        let ttl = self.ttl.as_secs_f64();
        let mut evicted: Vec<String> = map
            .iter()
            .filter(|(_, r)| now - r.last_seen > ttl)
            .map(|(k, _)| k.clone())
            .collect();
        evicted.sort();
        for key in &evicted {
            map.remove(key);
        }
        for key in &evicted {
            emit_registry_event(LogLevel::Info, "node_evicted", Some(key.clone()), map.len());
        }
        evicted
    }

    pub fn resolve_caller_ip(&self, observed: SocketAddr) -> IpAddr {
        observed.ip()
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }

    // Keeps `now - last_seen < ttl`, removes the rest.
    fn prune_locked(&self, map: &mut HashMap<String, NodeRecord>, now: f64) -> TrackerSnapshot {
        let ttl = self.ttl.as_secs_f64();
        let before = map.len();
        map.retain(|_, r| now - r.last_seen < ttl);
        if map.len() != before {
            emit_registry_event(LogLevel::Debug, "pruned", None, map.len());
        }
        TrackerSnapshot(map.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
    }

    /// Periodic eviction independent of request traffic. Stops when
    /// `shutdown` fires.
    pub fn spawn_sweeper(&self, interval: Duration, shutdown: Shutdown) -> JoinHandle<()> {
        let registry = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // First tick completes immediately.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = shutdown.triggered() => break,
                    _ = ticker.tick() => {
                        let evicted = registry.evict_stale().await;
                        if !evicted.is_empty() {
                            emit_registry_event(
                                LogLevel::Debug,
                                "sweep",
                                None,
                                registry.len().await,
                            );
                        }
                    }
                }
            }
        })
    }
}
