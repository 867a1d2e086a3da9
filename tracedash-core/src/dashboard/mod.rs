//! Machine telemetry dashboard
//!
//! A client keeps one push socket to the telemetry server, asks for fresh
//! metrics on a fixed interval, caches the last snapshot, and falls back to
//! that cache while the network is unavailable.

mod client;
mod panel;
mod runtime;
mod snapshot;
mod storage;

pub use client::{ClientConfig, ClientRequest, ConnectionState, DashboardClient, Effect, TabActivation};
pub use panel::{DashboardPanel, DashboardTab, PanelField, FIELDS, PLACEHOLDER};
pub use runtime::{
    run_dashboard, socket_url, Control, DashboardHandle, DashboardView, Transport, TransportError,
    WsTransport,
};
pub use snapshot::{
    BatteryMetrics, EcoMetrics, MaintenanceState, MotionState, ProductionMetrics, SafetyStatus,
    SnapshotError, SystemStatus, TelemetrySnapshot, VehicleMetrics, VehicleSafety,
};
pub use storage::{FileSnapshotStore, MemorySnapshotStore, SnapshotStore, StorageError};
