use crate::monitor::{MonitorStats, TemperatureMonitor};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Serialize)]
pub struct KernelHealth {
    pub uptime_seconds: u64,
    pub feed_status: String,
    pub feed_reconnects: u32,
    #[serde(flatten)]
    pub monitor: MonitorStats,
}

#[derive(Clone)]
pub struct HealthTracker {
    start_time: Instant,
    feed_reconnects: Arc<AtomicU32>,
    feed_status: Arc<Mutex<String>>,
}

impl HealthTracker {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            feed_reconnects: Arc::new(AtomicU32::new(0)),
            feed_status: Arc::new(Mutex::new("connecting".to_string())),
        }
    }

    pub fn mark_feed_connected(&self) {
        *self.feed_status.lock() = "connected".to_string();
    }

    pub fn mark_feed_disconnected(&self) {
        *self.feed_status.lock() = "disconnected".to_string();
    }

    pub fn increment_reconnects(&self) {
        self.feed_reconnects.fetch_add(1, Ordering::Relaxed);
        *self.feed_status.lock() = "reconnecting".to_string();
    }

    pub fn get_health(&self, monitor: &TemperatureMonitor) -> KernelHealth {
        KernelHealth {
            uptime_seconds: self.start_time.elapsed().as_secs(),
            feed_status: self.feed_status.lock().clone(),
            feed_reconnects: self.feed_reconnects.load(Ordering::Relaxed),
            monitor: monitor.stats(),
        }
    }
}

impl Default for HealthTracker {
    fn default() -> Self {
        Self::new()
    }
}
