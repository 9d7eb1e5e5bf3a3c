//! CSV resource feeds folded into per-window aggregates.
//!
//! Agents push fixed-index CSV, one sample per line, in time order per
//! server. A stat accumulates one window at a time and flushes the finished
//! window the moment a line from the next one shows up, so the store only
//! ever sees completed aggregates.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::{debug, trace};

use migrex_model::{CpuUsageWindow, DiskUsageWindow, InventoryId, MemoryUsageWindow};

use crate::monitor::window::{parse_line_date, window_time};
use crate::ports::store::MonitoringStore;
use crate::Result;

/// Running aggregate for one resource inside one window. Value and usage
/// series are counted independently since either cell may be missing on a
/// given line.
#[derive(Debug, Clone, Default)]
struct RunningStat {
    count: u32,
    sum: f64,
    max: f64,
    usage_count: u32,
    usage_sum: f64,
    usage_max: f64,
}

impl RunningStat {
    fn observe(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        self.max = if self.count == 1 { value } else { self.max.max(value) };
    }

    fn observe_usage(&mut self, value: f64) {
        self.usage_count += 1;
        self.usage_sum += value;
        self.usage_max = if self.usage_count == 1 {
            value
        } else {
            self.usage_max.max(value)
        };
    }

    fn has_samples(&self) -> bool {
        self.count > 0 || self.usage_count > 0
    }

    fn avg(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / f64::from(self.count)
        }
    }

    fn usage_avg(&self) -> f64 {
        if self.usage_count == 0 {
            0.0
        } else {
            self.usage_sum / f64::from(self.usage_count)
        }
    }
}

/// One window in flight for a keyed resource.
#[derive(Debug, Clone, Default)]
struct Slot {
    window: Option<DateTime<Utc>>,
    stat: RunningStat,
}

impl Slot {
    /// Moves the slot onto `window`. Returns the previous window's aggregate
    /// when the move closes a window that actually saw samples.
    fn advance(&mut self, window: DateTime<Utc>) -> Option<(DateTime<Utc>, RunningStat)> {
        match self.window {
            Some(current) if current == window => None,
            Some(current) => {
                let finished = std::mem::take(&mut self.stat);
                self.window = Some(window);
                finished.has_samples().then_some((current, finished))
            }
            None => {
                self.window = Some(window);
                None
            }
        }
    }
}

/// Folds CPU, memory and disk feeds into window aggregates.
///
/// State is keyed per server, plus device for disk, in concurrent maps, so
/// feeds for different servers can be ingested from different tasks.
pub struct MetricAggregator {
    store: Arc<dyn MonitoringStore>,
    cpu: DashMap<InventoryId, Slot>,
    memory: DashMap<InventoryId, Slot>,
    disk: DashMap<(InventoryId, String), Slot>,
}

impl MetricAggregator {
    pub fn new(store: Arc<dyn MonitoringStore>) -> Self {
        MetricAggregator {
            store,
            cpu: DashMap::new(),
            memory: DashMap::new(),
            disk: DashMap::new(),
        }
    }

    /// CPU feed: sample date in column 0, utilization in column 1.
    pub async fn ingest_cpu(&self, server: InventoryId, feed: &str) -> Result<()> {
        for line in feed.lines() {
            let fields = split_line(line);
            if fields.is_empty() {
                continue;
            }
            let Some(window) = line_window(&fields) else {
                debug!(server = %server, "cpu line without a readable date, dropped");
                continue;
            };
            let closed = {
                let mut slot = self.cpu.entry(server).or_default();
                let closed = slot.advance(window);
                if let Some(value) = numeric_field(&fields, 1) {
                    slot.stat.observe(value);
                }
                closed
            };
            if let Some((window_time, stat)) = closed {
                self.store
                    .save_cpu_window(&cpu_window(server, window_time, &stat))
                    .await?;
            }
        }
        Ok(())
    }

    /// Memory feed: date 0, used megabytes 4, usage percentage 2.
    pub async fn ingest_memory(&self, server: InventoryId, feed: &str) -> Result<()> {
        for line in feed.lines() {
            let fields = split_line(line);
            if fields.is_empty() {
                continue;
            }
            let Some(window) = line_window(&fields) else {
                debug!(server = %server, "memory line without a readable date, dropped");
                continue;
            };
            let closed = {
                let mut slot = self.memory.entry(server).or_default();
                let closed = slot.advance(window);
                if let Some(value) = numeric_field(&fields, 4) {
                    slot.stat.observe(value);
                }
                if let Some(usage) = numeric_field(&fields, 2) {
                    slot.stat.observe_usage(usage);
                }
                closed
            };
            if let Some((window_time, stat)) = closed {
                self.store
                    .save_memory_window(&memory_window(server, window_time, &stat))
                    .await?;
            }
        }
        Ok(())
    }

    /// Disk feed: date 0, partition 3, used blocks 5, utilization 7.
    /// Aggregation is per partition.
    pub async fn ingest_disk(&self, server: InventoryId, feed: &str) -> Result<()> {
        for line in feed.lines() {
            let fields = split_line(line);
            if fields.is_empty() {
                continue;
            }
            let Some(window) = line_window(&fields) else {
                debug!(server = %server, "disk line without a readable date, dropped");
                continue;
            };
            let Some(device) = fields.get(3).map(|raw| raw.trim()).filter(|d| !d.is_empty())
            else {
                debug!(server = %server, "disk line without a partition, dropped");
                continue;
            };
            let closed = {
                let mut slot = self.disk.entry((server, device.to_owned())).or_default();
                let closed = slot.advance(window);
                if let Some(value) = numeric_field(&fields, 7) {
                    slot.stat.observe(value);
                }
                if let Some(usage) = numeric_field(&fields, 5) {
                    slot.stat.observe_usage(usage);
                }
                closed
            };
            if let Some((window_time, stat)) = closed {
                self.store
                    .save_disk_window(&disk_window(server, device, window_time, &stat))
                    .await?;
            }
        }
        Ok(())
    }

    /// Emits every window still in flight and clears the state, so a
    /// shutdown does not lose partially filled windows.
    pub async fn flush_all(&self) -> Result<()> {
        let servers: Vec<InventoryId> = self.cpu.iter().map(|entry| *entry.key()).collect();
        for server in servers {
            if let Some((_, slot)) = self.cpu.remove(&server) {
                if let Some(window) = slot.window {
                    if slot.stat.has_samples() {
                        self.store
                            .save_cpu_window(&cpu_window(server, window, &slot.stat))
                            .await?;
                    }
                }
            }
        }

        let servers: Vec<InventoryId> = self.memory.iter().map(|entry| *entry.key()).collect();
        for server in servers {
            if let Some((_, slot)) = self.memory.remove(&server) {
                if let Some(window) = slot.window {
                    if slot.stat.has_samples() {
                        self.store
                            .save_memory_window(&memory_window(server, window, &slot.stat))
                            .await?;
                    }
                }
            }
        }

        let keys: Vec<(InventoryId, String)> =
            self.disk.iter().map(|entry| entry.key().clone()).collect();
        for key in keys {
            if let Some(((server, device), slot)) = self.disk.remove(&key) {
                if let Some(window) = slot.window {
                    if slot.stat.has_samples() {
                        self.store
                            .save_disk_window(&disk_window(server, &device, window, &slot.stat))
                            .await?;
                    }
                }
            }
        }
        Ok(())
    }
}

impl fmt::Debug for MetricAggregator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricAggregator")
            .field("cpu_slots", &self.cpu.len())
            .field("memory_slots", &self.memory.len())
            .field("disk_slots", &self.disk.len())
            .finish_non_exhaustive()
    }
}

fn cpu_window(server: InventoryId, window_time: DateTime<Utc>, stat: &RunningStat) -> CpuUsageWindow {
    CpuUsageWindow {
        server_inventory_id: server,
        window_time,
        sample_count: stat.count,
        avg: stat.avg(),
        max: stat.max,
    }
}

fn memory_window(
    server: InventoryId,
    window_time: DateTime<Utc>,
    stat: &RunningStat,
) -> MemoryUsageWindow {
    MemoryUsageWindow {
        server_inventory_id: server,
        window_time,
        sample_count: stat.count,
        avg: stat.avg(),
        max: stat.max,
        usage_avg: stat.usage_avg(),
        usage_max: stat.usage_max,
    }
}

fn disk_window(
    server: InventoryId,
    device: &str,
    window_time: DateTime<Utc>,
    stat: &RunningStat,
) -> DiskUsageWindow {
    DiskUsageWindow {
        server_inventory_id: server,
        device: device.to_owned(),
        window_time,
        sample_count: stat.count,
        avg: stat.avg(),
        max: stat.max,
        usage_avg: stat.usage_avg(),
        usage_max: stat.usage_max,
    }
}

fn split_line(line: &str) -> Vec<&str> {
    let line = line.trim();
    if line.is_empty() {
        return Vec::new();
    }
    line.split(',').collect()
}

fn line_window(fields: &[&str]) -> Option<DateTime<Utc>> {
    fields.first().and_then(|raw| parse_line_date(raw)).map(window_time)
}

/// Numeric cell at `index`; empty and unreadable cells count as absent.
fn numeric_field(fields: &[&str], index: usize) -> Option<f64> {
    let raw = fields.get(index)?.trim().replace('%', "");
    if raw.is_empty() {
        return None;
    }
    match raw.parse::<f64>() {
        Ok(value) => Some(value),
        Err(_) => {
            trace!(value = raw.as_str(), "unreadable metric cell, skipped");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingStore {
        cpu: Mutex<Vec<CpuUsageWindow>>,
        memory: Mutex<Vec<MemoryUsageWindow>>,
        disk: Mutex<Vec<DiskUsageWindow>>,
    }

    #[async_trait]
    impl MonitoringStore for RecordingStore {
        async fn save_cpu_window(&self, window: &CpuUsageWindow) -> Result<()> {
            self.cpu.lock().unwrap().push(window.clone());
            Ok(())
        }

        async fn save_memory_window(&self, window: &MemoryUsageWindow) -> Result<()> {
            self.memory.lock().unwrap().push(window.clone());
            Ok(())
        }

        async fn save_disk_window(&self, window: &DiskUsageWindow) -> Result<()> {
            self.disk.lock().unwrap().push(window.clone());
            Ok(())
        }
    }

    fn aggregator() -> (MetricAggregator, Arc<RecordingStore>) {
        let store = Arc::new(RecordingStore::default());
        (MetricAggregator::new(store.clone()), store)
    }

    #[tokio::test]
    async fn cpu_window_flushes_when_the_next_window_starts() {
        let (agg, store) = aggregator();
        let server = InventoryId::new(7);
        let feed = "20240301100000,12.5\n20240301100100,37.5\n20240301100500,50.0\n";

        agg.ingest_cpu(server, feed).await.unwrap();

        let saved = store.cpu.lock().unwrap();
        assert_eq!(saved.len(), 1);
        let window = &saved[0];
        assert_eq!(window.window_time, Utc.with_ymd_and_hms(2024, 3, 1, 10, 4, 0).unwrap());
        assert_eq!(window.sample_count, 2);
        assert_eq!(window.avg, 25.0);
        assert_eq!(window.max, 37.5);
    }

    #[tokio::test]
    async fn empty_and_unreadable_cells_are_not_counted() {
        let (agg, store) = aggregator();
        let server = InventoryId::new(7);
        let feed = "20240301100000,16384,43%,8192,7168\n\
                    20240301100100,16384,,8192,\n\
                    20240301100200,16384,n/a,8192,oops\n\
                    20240301100500,16384,40%,8192,7000\n";

        agg.ingest_memory(server, feed).await.unwrap();

        let saved = store.memory.lock().unwrap();
        assert_eq!(saved.len(), 1);
        let window = &saved[0];
        assert_eq!(window.sample_count, 1);
        assert_eq!(window.avg, 7168.0);
        assert_eq!(window.usage_avg, 43.0);
        assert_eq!(window.usage_max, 43.0);
    }

    #[tokio::test]
    async fn disk_partitions_aggregate_independently() {
        let (agg, store) = aggregator();
        let server = InventoryId::new(7);
        let feed = "20240301100000,sda,ext4,/dev/sda1,100,40,60,40%\n\
                    20240301100000,sdb,ext4,/dev/sdb1,100,10,90,10%\n\
                    20240301100500,sda,ext4,/dev/sda1,100,50,50,50%\n";

        agg.ingest_disk(server, feed).await.unwrap();
        {
            let saved = store.disk.lock().unwrap();
            assert_eq!(saved.len(), 1);
            assert_eq!(saved[0].device, "/dev/sda1");
            assert_eq!(saved[0].avg, 40.0);
            assert_eq!(saved[0].usage_max, 40.0);
        }

        agg.flush_all().await.unwrap();
        let saved = store.disk.lock().unwrap();
        assert_eq!(saved.len(), 3);
        assert!(saved.iter().any(|w| w.device == "/dev/sdb1"));
    }

    #[tokio::test]
    async fn lines_without_dates_leave_no_state_behind() {
        let (agg, store) = aggregator();
        agg.ingest_cpu(InventoryId::new(7), "garbage,12.5\n,\n").await.unwrap();

        assert!(agg.cpu.is_empty());
        assert!(store.cpu.lock().unwrap().is_empty());
    }
}
