//! Display model for a telemetry snapshot
//!
//! Every render starts from the defaults, so a section missing from the
//! current snapshot shows the placeholder instead of a value from an older one.

use serde_json::Value;
use std::fmt;

use super::snapshot::TelemetrySnapshot;

/// Placeholder shown for a field with no value
pub const PLACEHOLDER: &str = "--";

/// Dashboard views the user can switch between
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DashboardTab {
    MachineStatus,
    Requirements,
    VehicleMetrics,
}

impl fmt::Display for DashboardTab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DashboardTab::MachineStatus => write!(f, "Machine Status"),
            DashboardTab::Requirements => write!(f, "Requirements"),
            DashboardTab::VehicleMetrics => write!(f, "Vehicle Metrics"),
        }
    }
}

/// A displayed field: stable id, human label, and which tab shows it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelField {
    pub id: &'static str,
    pub label: &'static str,
    pub tab: DashboardTab,
}

const fn field(id: &'static str, label: &'static str, tab: DashboardTab) -> PanelField {
    PanelField { id, label, tab }
}

use DashboardTab::{MachineStatus as M, VehicleMetrics as V};

/// All displayed fields, in display order
pub const FIELDS: [PanelField; 24] = [
    field("position", "Position", M),
    field("velocity", "Velocity", M),
    field("acceleration", "Acceleration", M),
    field("collision-risk", "Collision risk", M),
    field("safety-zones", "Safety zones", M),
    field("emergency-stop", "Emergency stop", M),
    field("power-usage", "Power usage", M),
    field("carbon-footprint", "Carbon footprint", M),
    field("efficiency-score", "Efficiency", M),
    field("cpu-load", "CPU load", M),
    field("memory-usage", "Memory", M),
    field("temperature", "Temperature", M),
    field("component-health", "Component health", M),
    field("next-service", "Next service", M),
    field("wear-level", "Wear level", M),
    field("daily-output", "Daily output", V),
    field("quality-score", "Quality score", V),
    field("cycle-time", "Cycle time", V),
    field("battery-capacity", "Battery capacity", V),
    field("charge-rate", "Charge rate", V),
    field("battery-temp", "Battery temperature", V),
    field("crash-rating", "Crash rating", V),
    field("safety-features", "Safety features", V),
    field("compliance-score", "Compliance", V),
];

/// Rendered text for every field in `FIELDS`
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardPanel {
    values: Vec<String>,
}

impl Default for DashboardPanel {
    fn default() -> Self {
        Self {
            values: vec![PLACEHOLDER.to_string(); FIELDS.len()],
        }
    }
}

impl DashboardPanel {
    /// Renders a snapshot over the defaults; `None` renders an empty panel
    pub fn from_snapshot(snapshot: Option<&TelemetrySnapshot>) -> Self {
        let mut panel = Self::default();
        let Some(s) = snapshot else {
            return panel;
        };

        if let Some(m) = &s.motion_state {
            panel.set_json("position", &m.position);
            panel.set_json("velocity", &m.velocity);
            panel.set_json("acceleration", &m.acceleration);
        }
        if let Some(safety) = &s.safety_status {
            panel.set("collision-risk", &safety.collision_risk, "");
            panel.set("safety-zones", &safety.safety_zones, "");
            panel.set("emergency-stop", &safety.emergency_stop, "");
        }
        if let Some(eco) = &s.eco_metrics {
            panel.set("power-usage", &eco.power_usage, " W");
            panel.set("carbon-footprint", &eco.carbon_footprint, " kg CO2");
            panel.set("efficiency-score", &eco.efficiency_score, "%");
        }
        if let Some(sys) = &s.system_status {
            panel.set("cpu-load", &sys.cpu_load, "%");
            panel.set("memory-usage", &sys.memory_usage, " MB");
            panel.set("temperature", &sys.temperature, "°C");
        }
        if let Some(maint) = &s.maintenance_state {
            panel.set("component-health", &maint.component_health, "%");
            panel.set("next-service", &maint.next_service, "");
            panel.set("wear-level", &maint.wear_level, "%");
        }
        if let Some(vehicle) = &s.vehicle_metrics {
            if let Some(p) = &vehicle.production {
                panel.set("daily-output", &p.daily_output, " units");
                panel.set("quality-score", &p.quality_score, "%");
                panel.set("cycle-time", &p.cycle_time, " min");
            }
            if let Some(b) = &vehicle.battery {
                panel.set("battery-capacity", &b.capacity, " kWh");
                panel.set("charge-rate", &b.charge_rate, " kW");
                panel.set("battery-temp", &b.temperature, "°C");
            }
            if let Some(vs) = &vehicle.safety {
                panel.set("crash-rating", &vs.crash_rating, "");
                panel.set("safety-features", &vs.features_status, "");
                panel.set("compliance-score", &vs.compliance, "%");
            }
        }

        panel
    }

    /// Text of a field by id
    pub fn get(&self, id: &str) -> Option<&str> {
        FIELDS
            .iter()
            .position(|f| f.id == id)
            .map(|i| self.values[i].as_str())
    }

    /// Fields with their text, in display order
    pub fn iter(&self) -> impl Iterator<Item = (&PanelField, &str)> {
        FIELDS.iter().zip(self.values.iter().map(String::as_str))
    }

    /// Fields belonging to one tab
    pub fn tab(&self, tab: DashboardTab) -> impl Iterator<Item = (&PanelField, &str)> {
        self.iter().filter(move |(f, _)| f.tab == tab)
    }

    /// True when no field has a value
    pub fn is_blank(&self) -> bool {
        self.values.iter().all(|v| v == PLACEHOLDER)
    }

    fn put(&mut self, id: &str, text: String) {
        if let Some(index) = FIELDS.iter().position(|f| f.id == id) {
            self.values[index] = text;
        }
    }

    fn set(&mut self, id: &str, value: &Option<Value>, unit: &str) {
        if let Some(v) = value {
            self.put(id, format!("{}{}", scalar_text(v), unit));
        }
    }

    fn set_json(&mut self, id: &str, value: &Option<Value>) {
        if let Some(v) = value {
            self.put(id, v.to_string());
        }
    }
}

/// Strings print bare, everything else as JSON
fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_snapshot_is_blank() {
        let panel = DashboardPanel::from_snapshot(None);
        assert!(panel.is_blank());
        assert_eq!(panel.get("power-usage"), Some(PLACEHOLDER));
        assert_eq!(panel.iter().count(), FIELDS.len());
    }

    #[test]
    fn test_units_and_json_fields() {
        let snapshot = TelemetrySnapshot::parse(
            r#"{
                "motion_state": {"position": {"x": 1.0, "y": 2.5}},
                "eco_metrics": {"power_usage": 120.5},
                "system_status": {"temperature": 41},
                "maintenance_state": {"next_service": "2024-06-01"},
                "safety_status": {"emergency_stop": false},
                "vehicle_metrics": {"production": {"daily_output": 40, "cycle_time": 1.5}}
            }"#,
        )
        .unwrap();

        let panel = DashboardPanel::from_snapshot(Some(&snapshot));
        assert_eq!(panel.get("position"), Some(r#"{"x":1.0,"y":2.5}"#));
        assert_eq!(panel.get("power-usage"), Some("120.5 W"));
        assert_eq!(panel.get("temperature"), Some("41°C"));
        assert_eq!(panel.get("next-service"), Some("2024-06-01"));
        assert_eq!(panel.get("emergency-stop"), Some("false"));
        assert_eq!(panel.get("daily-output"), Some("40 units"));
        assert_eq!(panel.get("cycle-time"), Some("1.5 min"));
        assert_eq!(panel.get("battery-capacity"), Some(PLACEHOLDER));
        assert_eq!(panel.get("nonexistent"), None);
    }

    #[test]
    fn test_later_snapshot_does_not_keep_older_sections() {
        let s1 = TelemetrySnapshot::parse(
            r#"{"eco_metrics": {"power_usage": 100}, "system_status": {"cpu_load": 90}}"#,
        )
        .unwrap();
        let s2 = TelemetrySnapshot::parse(r#"{"system_status": {"cpu_load": 10}}"#).unwrap();

        let _first = DashboardPanel::from_snapshot(Some(&s1));
        let second = DashboardPanel::from_snapshot(Some(&s2));

        assert_eq!(second.get("cpu-load"), Some("10%"));
        assert_eq!(second.get("power-usage"), Some(PLACEHOLDER));
        assert_eq!(second, DashboardPanel::from_snapshot(Some(&s2)));
    }

    #[test]
    fn test_tab_split() {
        let panel = DashboardPanel::default();
        assert_eq!(panel.tab(DashboardTab::MachineStatus).count(), 15);
        assert_eq!(panel.tab(DashboardTab::VehicleMetrics).count(), 9);
        assert_eq!(panel.tab(DashboardTab::Requirements).count(), 0);
    }
}
