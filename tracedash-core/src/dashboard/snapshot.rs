use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Why an inbound frame could not be used as a snapshot
#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("Snapshot is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Free-form keys a section carried beyond the displayed ones
pub type Extra = Map<String, Value>;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MotionState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub velocity: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acceleration: Option<Value>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SafetyStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collision_risk: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub safety_zones: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emergency_stop: Option<Value>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EcoMetrics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power_usage: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carbon_footprint: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub efficiency_score: Option<Value>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SystemStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_load: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_usage: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<Value>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MaintenanceState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_health: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_service: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wear_level: Option<Value>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProductionMetrics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_output: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_score: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cycle_time: Option<Value>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BatteryMetrics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub charge_rate: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<Value>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct VehicleSafety {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crash_rating: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features_status: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compliance: Option<Value>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct VehicleMetrics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub production: Option<ProductionMetrics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub battery: Option<BatteryMetrics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub safety: Option<VehicleSafety>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// One complete telemetry push. Every section is independently optional and a
/// new snapshot replaces the previous one wholesale.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TelemetrySnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub motion_state: Option<MotionState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub safety_status: Option<SafetyStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eco_metrics: Option<EcoMetrics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_status: Option<SystemStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maintenance_state: Option<MaintenanceState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vehicle_metrics: Option<VehicleMetrics>,
    /// Top-level keys without a display section (e.g. `timestamp`)
    #[serde(flatten)]
    pub extra: Extra,
}

impl TelemetrySnapshot {
    /// Parses one inbound frame. Anything but a JSON object with object
    /// sections is rejected.
    pub fn parse(text: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn is_empty(&self) -> bool {
        self == &TelemetrySnapshot::default()
    }
}
