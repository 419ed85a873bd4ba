//! Event bus for a synthesis run.
//!
//! Provides ordered publication, live subscription and history queries.

use crate::event::{CallRecord, TelemetryEvent, TelemetryKind};
use chrono::Utc;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use tokio::sync::broadcast;
use uuid::Uuid;

/// History entries kept before the oldest are dropped.
pub const DEFAULT_HISTORY_CAPACITY: usize = 10_000;

struct BusState {
    next_sequence: u64,
    history: VecDeque<TelemetryEvent>,
    counts: HashMap<&'static str, u64>,
}

/// Ordered telemetry stream.
///
/// Sequence assignment, history append and broadcast all happen under one
/// lock, so history order, sequence order and delivery order agree.
pub struct TelemetryBus {
    sender: broadcast::Sender<TelemetryEvent>,
    state: Mutex<BusState>,
    capacity: usize,
}

impl TelemetryBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(1000);
        Self {
            sender,
            state: Mutex::new(BusState {
                next_sequence: 0,
                history: VecDeque::new(),
                counts: HashMap::new(),
            }),
            capacity: capacity.max(1),
        }
    }

    // History is append-only, so a poisoned lock still holds consistent data.
    fn lock(&self) -> MutexGuard<'_, BusState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Publish an event under `scope`, returning its sequence number.
    pub fn emit(&self, scope: impl Into<String>, kind: TelemetryKind) -> u64 {
        let mut state = self.lock();
        let sequence = state.next_sequence;
        state.next_sequence += 1;
        *state.counts.entry(kind.name()).or_insert(0) += 1;

        let event = TelemetryEvent {
            id: Uuid::new_v4(),
            sequence,
            timestamp: Utc::now(),
            scope: scope.into(),
            kind,
        };

        if state.history.len() >= self.capacity {
            state.history.pop_front();
        }
        state.history.push_back(event.clone());

        // No subscriber is fine.
        let _ = self.sender.send(event);
        sequence
    }

    /// Subscribe to live events.
    pub fn subscribe(&self) -> broadcast::Receiver<TelemetryEvent> {
        self.sender.subscribe()
    }

    /// All retained events in sequence order.
    pub fn events(&self) -> Vec<TelemetryEvent> {
        self.lock().history.iter().cloned().collect()
    }

    pub fn events_for(&self, scope: &str) -> Vec<TelemetryEvent> {
        self.lock()
            .history
            .iter()
            .filter(|e| e.scope == scope)
            .cloned()
            .collect()
    }

    /// Number of retained events matching `predicate`.
    pub fn count<F>(&self, predicate: F) -> usize
    where
        F: Fn(&TelemetryKind) -> bool,
    {
        self.lock()
            .history
            .iter()
            .filter(|e| predicate(&e.kind))
            .count()
    }

    /// Every retained call-attempt record, in order.
    pub fn call_records(&self) -> Vec<CallRecord> {
        self.lock()
            .history
            .iter()
            .filter_map(|e| e.kind.call_record().cloned())
            .collect()
    }

    pub fn stats(&self) -> TelemetryStats {
        let state = self.lock();
        TelemetryStats {
            total_events: state.next_sequence,
            retained_events: state.history.len(),
            subscriber_count: self.sender.receiver_count(),
            events_by_kind: state
                .counts
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect(),
        }
    }
}

impl Default for TelemetryBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TelemetryBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryBus")
            .field("capacity", &self.capacity)
            .finish()
    }
}

/// Bus statistics.
#[derive(Clone, Debug)]
pub struct TelemetryStats {
    /// Events ever published, including evicted ones.
    pub total_events: u64,
    pub retained_events: usize,
    pub subscriber_count: usize,
    pub events_by_kind: HashMap<String, u64>,
}
