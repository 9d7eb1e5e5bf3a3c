//! Agent monitoring feeds: resource usage windows and traffic observation.
//!
//! Resource feeds (CPU, memory, disk) are aggregated into fixed five-minute
//! windows and persisted through [`MonitoringStore`]. Network feeds do not
//! aggregate; they drive unknown-peer discovery and port-relation rows in
//! the discovery graph.
//!
//! [`MonitoringStore`]: crate::ports::store::MonitoringStore

pub mod network;
pub mod stat;
pub mod window;

pub use network::NetworkObserver;
pub use stat::MetricAggregator;
