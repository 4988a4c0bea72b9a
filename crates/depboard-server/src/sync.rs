//! Server-side half of the live view: a registry of connected push channels
//! and the poll loop that decides when they should re-fetch.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use depboard_core::aggregate::{Aggregator, Dashboard};
use sha2::{Digest, Sha256};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Notify};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncSignal {
    /// Re-fetch the page and patch the regions.
    Refresh,
}

impl SyncSignal {
    pub fn as_str(self) -> &'static str {
        match self {
            SyncSignal::Refresh => "refresh",
        }
    }
}

// ---------------------------------------------------------------------------
// ChannelRegistry
// ---------------------------------------------------------------------------

/// Refresh is idempotent, so one queued signal per viewer is enough.
const CHANNEL_CAPACITY: usize = 1;

#[derive(Default)]
pub struct ChannelRegistry {
    channels: Mutex<HashMap<Uuid, mpsc::Sender<SyncSignal>>>,
}

/// Removes its channel from the registry when dropped.
pub struct ChannelGuard {
    id: Uuid,
    registry: Arc<ChannelRegistry>,
}

impl ChannelGuard {
    pub fn id(&self) -> Uuid {
        self.id
    }
}

impl Drop for ChannelGuard {
    fn drop(&mut self) {
        self.registry.remove(self.id);
    }
}

impl ChannelRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn channels(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, mpsc::Sender<SyncSignal>>> {
        self.channels.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn register(self: &Arc<Self>) -> (ChannelGuard, mpsc::Receiver<SyncSignal>) {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let id = Uuid::new_v4();
        self.channels().insert(id, tx);
        tracing::debug!(%id, "live channel connected");
        let guard = ChannelGuard {
            id,
            registry: Arc::clone(self),
        };
        (guard, rx)
    }

    fn remove(&self, id: Uuid) {
        if self.channels().remove(&id).is_some() {
            tracing::debug!(%id, "live channel disconnected");
        }
    }

    pub fn len(&self) -> usize {
        self.channels().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Send to every channel. A channel that already holds an unread signal
    /// is left as is; channels whose receiver is gone are dropped. Returns
    /// how many channels have the signal pending.
    pub fn broadcast(&self, signal: SyncSignal) -> usize {
        let mut channels = self.channels();
        channels.retain(|_, tx| match tx.try_send(signal) {
            Ok(()) | Err(TrySendError::Full(_)) => true,
            Err(TrySendError::Closed(_)) => false,
        });
        channels.len()
    }
}

// ---------------------------------------------------------------------------
// SyncHub
// ---------------------------------------------------------------------------

/// Hash of everything the page shows except the fetch timestamp.
pub fn fingerprint(dashboard: &Dashboard) -> String {
    let mut value = serde_json::to_value(dashboard).unwrap_or_default();
    if let Some(obj) = value.as_object_mut() {
        obj.remove("fetched_at");
    }
    let bytes = serde_json::to_vec(&value).unwrap_or_default();
    format!("{:x}", Sha256::digest(&bytes))
}

pub struct SyncHub {
    aggregator: Aggregator,
    registry: Arc<ChannelRegistry>,
    current: RwLock<Arc<Dashboard>>,
    fingerprint: Mutex<Option<String>>,
    wake: Notify,
    interval: Duration,
    cycle: tokio::sync::Mutex<()>,
}

impl SyncHub {
    pub fn new(aggregator: Aggregator, interval: Duration) -> Self {
        Self {
            aggregator,
            registry: ChannelRegistry::new(),
            current: RwLock::new(Arc::new(Dashboard::empty())),
            fingerprint: Mutex::new(None),
            wake: Notify::new(),
            interval,
            cycle: tokio::sync::Mutex::new(()),
        }
    }

    pub fn registry(&self) -> &Arc<ChannelRegistry> {
        &self.registry
    }

    /// The last dashboard that was stored.
    pub fn current(&self) -> Arc<Dashboard> {
        Arc::clone(&self.current.read().unwrap_or_else(|e| e.into_inner()))
    }

    /// Wake the loop for an immediate cycle.
    pub fn trigger(&self) {
        self.wake.notify_one();
    }

    /// Run one fetch cycle. Returns true when the dashboard changed and a
    /// refresh was sent.
    pub async fn refresh_now(&self) -> bool {
        let _cycle = self.cycle.lock().await;
        let mut next = self.aggregator.fetch_dashboard().await;
        if next.issues.is_none() {
            next.issues = self.current().issues.clone();
        }

        let print = fingerprint(&next);
        {
            let mut last = self.fingerprint.lock().unwrap_or_else(|e| e.into_inner());
            if last.as_deref() == Some(print.as_str()) {
                tracing::debug!("dashboard unchanged");
                return false;
            }
            *last = Some(print);
        }

        *self.current.write().unwrap_or_else(|e| e.into_inner()) = Arc::new(next);
        let clients = self.registry.broadcast(SyncSignal::Refresh);
        tracing::info!(clients, "dashboard changed; refresh sent");
        true
    }

    /// Poll forever: one cycle per interval, or sooner on `trigger()`.
    pub async fn run(self: Arc<Self>) {
        tracing::info!(interval_secs = self.interval.as_secs(), "sync loop started");
        loop {
            self.refresh_now().await;
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = self.wake.notified() => {
                    tracing::debug!("sync loop woken");
                }
            }
        }
    }
}
