use chrono::{DateTime, Utc};
use std::fmt::{Display, Formatter};

use crate::ids::InventoryId;

/// Metric families the monitoring channel carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MetricKind {
    Cpu,
    Memory,
    Disk,
    Network,
}

impl MetricKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Cpu => "cpu",
            MetricKind::Memory => "memory",
            MetricKind::Disk => "disk",
            MetricKind::Network => "network",
        }
    }
}

impl Display for MetricKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Aggregated CPU usage over one window.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CpuUsageWindow {
    pub server_inventory_id: InventoryId,
    pub window_time: DateTime<Utc>,
    pub sample_count: u32,
    pub avg: f64,
    pub max: f64,
}

/// Aggregated memory figures over one window; `avg`/`max` are absolute
/// (megabytes), `usage_avg`/`usage_max` are percentages.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MemoryUsageWindow {
    pub server_inventory_id: InventoryId,
    pub window_time: DateTime<Utc>,
    pub sample_count: u32,
    pub avg: f64,
    pub max: f64,
    pub usage_avg: f64,
    pub usage_max: f64,
}

/// Aggregated per-device disk figures over one window.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DiskUsageWindow {
    pub server_inventory_id: InventoryId,
    pub device: String,
    pub window_time: DateTime<Utc>,
    pub sample_count: u32,
    pub avg: f64,
    pub max: f64,
    pub usage_avg: f64,
    pub usage_max: f64,
}

/// One parsed connection line from the network monitoring feed.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NetworkConnection {
    pub observed_at: DateTime<Utc>,
    pub protocol: String,
    pub state: String,
    pub local_addr: String,
    pub local_port: u16,
    pub foreign_addr: String,
    pub foreign_port: u16,
    pub pid: Option<i32>,
}
