//! Telemetry dashboard client state machine
//!
//! The client never performs I/O itself. Each event handler updates the state
//! and returns the [`Effect`]s the host must carry out (open a socket, arm a
//! timer, render). This keeps the reconnect and offline rules testable without
//! a network or a clock; [`super::runtime`] drives it on tokio.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::panel::{DashboardPanel, DashboardTab};
use super::snapshot::TelemetrySnapshot;
use super::storage::SnapshotStore;

/// Connection lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Messages the client sends to the telemetry server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientRequest {
    GetMetrics,
}

impl ClientRequest {
    pub fn to_json(&self) -> String {
        match self {
            ClientRequest::GetMetrics => r#"{"action":"get_metrics"}"#.to_string(),
        }
    }
}

/// Work the host performs on behalf of the client
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Open a socket to `url`, replacing any existing one
    Connect { url: String },
    /// Send a request over the open socket
    Send(ClientRequest),
    /// Arm the repeating poll timer (the previous one has been stopped)
    StartPolling { every: Duration },
    StopPolling,
    /// Call `on_reconnect_due` once after the delay
    ScheduleReconnect { after: Duration },
    CancelReconnect,
    /// Show this panel
    Render(DashboardPanel),
    /// Show the connection indicator as connected / disconnected
    ConnectionStatus(bool),
    /// Close the current socket without expecting `on_close`
    CloseSocket,
}

/// Timings and endpoint of a client
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub url: String,
    pub poll_interval: Duration,
    pub reconnect_delay: Duration,
}

impl ClientConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            poll_interval: Duration::from_secs(1),
            reconnect_delay: Duration::from_secs(5),
        }
    }
}

/// What activating a tab resulted in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabActivation {
    /// Offline: nothing to refresh
    Ignored,
    Refreshed,
}

pub struct DashboardClient<S: SnapshotStore> {
    config: ClientConfig,
    store: S,
    state: ConnectionState,
    offline: bool,
    polling: bool,
    reconnect_pending: bool,
    shut_down: bool,
    last_snapshot: Option<TelemetrySnapshot>,
}

impl<S: SnapshotStore> DashboardClient<S> {
    /// Creates a client, loading the cached snapshot from `store`.
    /// `online` is the host's initial network availability.
    pub fn new(config: ClientConfig, store: S, online: bool) -> Self {
        let last_snapshot = load_cached(&store);
        Self {
            config,
            store,
            state: ConnectionState::Disconnected,
            offline: !online,
            polling: false,
            reconnect_pending: false,
            shut_down: false,
            last_snapshot,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_offline(&self) -> bool {
        self.offline
    }

    pub fn is_polling(&self) -> bool {
        self.polling
    }

    pub fn reconnect_pending(&self) -> bool {
        self.reconnect_pending
    }

    pub fn last_snapshot(&self) -> Option<&TelemetrySnapshot> {
        self.last_snapshot.as_ref()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Panel for the current snapshot
    pub fn panel(&self) -> DashboardPanel {
        DashboardPanel::from_snapshot(self.last_snapshot.as_ref())
    }

    /// First event after construction: shows the cached snapshot, if any,
    /// and connects unless offline
    pub fn start(&mut self) -> Vec<Effect> {
        let mut effects = vec![Effect::ConnectionStatus(false)];
        if self.last_snapshot.is_some() {
            effects.push(Effect::Render(self.panel()));
        }
        effects.extend(self.connect());
        effects
    }

    /// Opens a new socket, superseding any previous one. No-op while offline.
    pub fn connect(&mut self) -> Vec<Effect> {
        if self.offline || self.shut_down {
            return Vec::new();
        }

        let mut effects = Vec::new();
        self.cancel_reconnect(&mut effects);
        self.stop_polling(&mut effects);

        log::info!("Connecting to {}", self.config.url);
        self.state = ConnectionState::Connecting;
        effects.push(Effect::Connect {
            url: self.config.url.clone(),
        });
        effects
    }

    /// The socket opened
    pub fn on_open(&mut self) -> Vec<Effect> {
        if self.shut_down {
            return Vec::new();
        }
        log::info!("Connected to telemetry socket");
        self.state = ConnectionState::Connected;

        let mut effects = vec![Effect::ConnectionStatus(true)];
        if !self.offline {
            self.stop_polling(&mut effects);
            self.polling = true;
            effects.push(Effect::StartPolling {
                every: self.config.poll_interval,
            });
        }
        effects
    }

    /// The socket closed. Schedules exactly one reconnect unless offline.
    pub fn on_close(&mut self) -> Vec<Effect> {
        log::info!("Disconnected from telemetry socket");
        self.state = ConnectionState::Disconnected;

        let mut effects = vec![Effect::ConnectionStatus(false)];
        self.stop_polling(&mut effects);

        if !self.offline && !self.shut_down && !self.reconnect_pending {
            self.reconnect_pending = true;
            effects.push(Effect::ScheduleReconnect {
                after: self.config.reconnect_delay,
            });
        }
        effects
    }

    /// The transport reported an error. The close that follows decides on retrying.
    pub fn on_error(&mut self, error: &str) -> Vec<Effect> {
        log::error!("Telemetry socket error: {}", error);
        self.state = ConnectionState::Disconnected;
        vec![Effect::ConnectionStatus(false)]
    }

    /// A frame arrived. Valid snapshots replace the previous one, are cached,
    /// and rendered; malformed frames are dropped.
    pub fn on_message(&mut self, text: &str) -> Vec<Effect> {
        let snapshot = match TelemetrySnapshot::parse(text) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                log::warn!("Dropping malformed telemetry frame: {}", e);
                return Vec::new();
            }
        };

        match snapshot.to_json() {
            Ok(json) => {
                if let Err(e) = self.store.save(&json) {
                    log::error!("Error saving snapshot to cache: {}", e);
                }
            }
            Err(e) => log::error!("Error serializing snapshot: {}", e),
        }

        self.last_snapshot = Some(snapshot);
        vec![Effect::Render(self.panel())]
    }

    /// The poll timer fired
    pub fn on_poll_tick(&mut self) -> Vec<Effect> {
        if self.state == ConnectionState::Connected && !self.offline && !self.shut_down {
            vec![Effect::Send(ClientRequest::GetMetrics)]
        } else {
            Vec::new()
        }
    }

    /// The scheduled reconnect is due
    pub fn on_reconnect_due(&mut self) -> Vec<Effect> {
        if !self.reconnect_pending {
            return Vec::new();
        }
        self.reconnect_pending = false;
        self.connect()
    }

    /// The host's network availability changed
    pub fn set_online(&mut self, online: bool) -> Vec<Effect> {
        if online {
            self.go_online()
        } else {
            self.go_offline()
        }
    }

    fn go_offline(&mut self) -> Vec<Effect> {
        log::warn!("Network unavailable, showing cached telemetry");
        self.offline = true;

        let mut effects = Vec::new();
        self.cancel_reconnect(&mut effects);
        self.stop_polling(&mut effects);
        effects.push(Effect::Render(self.panel()));
        effects
    }

    fn go_online(&mut self) -> Vec<Effect> {
        log::info!("Network available again");
        self.offline = false;
        self.connect()
    }

    /// A dashboard tab was activated
    pub fn activate_tab(&mut self, tab: DashboardTab) -> (TabActivation, Vec<Effect>) {
        if self.offline {
            log::info!("{} tab accessed in offline mode", tab);
            return (TabActivation::Ignored, Vec::new());
        }

        log::info!("{} tab activated", tab);
        let effects = if self.state == ConnectionState::Connected && tab != DashboardTab::Requirements {
            vec![Effect::Send(ClientRequest::GetMetrics)]
        } else {
            Vec::new()
        };
        (TabActivation::Refreshed, effects)
    }

    /// Tears the client down: cancels both timers and closes the socket.
    /// Every later event is ignored.
    pub fn shutdown(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();
        if self.shut_down {
            return effects;
        }
        self.shut_down = true;
        self.cancel_reconnect(&mut effects);
        self.stop_polling(&mut effects);
        if self.state != ConnectionState::Disconnected {
            effects.push(Effect::CloseSocket);
        }
        self.state = ConnectionState::Disconnected;
        effects
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    fn stop_polling(&mut self, effects: &mut Vec<Effect>) {
        if self.polling {
            self.polling = false;
            effects.push(Effect::StopPolling);
        }
    }

    fn cancel_reconnect(&mut self, effects: &mut Vec<Effect>) {
        if self.reconnect_pending {
            self.reconnect_pending = false;
            effects.push(Effect::CancelReconnect);
        }
    }
}

fn load_cached<S: SnapshotStore>(store: &S) -> Option<TelemetrySnapshot> {
    let text = match store.load() {
        Ok(Some(text)) => text,
        Ok(None) => return None,
        Err(e) => {
            log::error!("Error loading cached snapshot: {}", e);
            return None;
        }
    };
    match TelemetrySnapshot::parse(&text) {
        Ok(snapshot) => Some(snapshot),
        Err(e) => {
            log::warn!("Ignoring unreadable cached snapshot: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::storage::{MemorySnapshotStore, StorageError};

    const URL: &str = "ws://localhost:8000/ws/1";

    fn client(online: bool) -> DashboardClient<MemorySnapshotStore> {
        DashboardClient::new(ClientConfig::new(URL), MemorySnapshotStore::new(), online)
    }

    fn connected() -> DashboardClient<MemorySnapshotStore> {
        let mut c = client(true);
        c.start();
        c.on_open();
        c
    }

    fn count<F: Fn(&Effect) -> bool>(effects: &[Effect], f: F) -> usize {
        effects.iter().filter(|e| f(e)).count()
    }

    struct FailingStore;

    impl SnapshotStore for FailingStore {
        fn load(&self) -> Result<Option<String>, StorageError> {
            Err(StorageError::FileLocked)
        }
        fn save(&self, _data: &str) -> Result<(), StorageError> {
            Err(StorageError::FileLocked)
        }
    }

    #[test]
    fn test_request_wire_format() {
        let json = ClientRequest::GetMetrics.to_json();
        assert_eq!(json, r#"{"action":"get_metrics"}"#);
        assert_eq!(serde_json::to_string(&ClientRequest::GetMetrics).unwrap(), json);
    }

    #[test]
    fn test_start_online_connects() {
        let mut c = client(true);
        let effects = c.start();
        assert!(effects.contains(&Effect::Connect { url: URL.to_string() }));
        assert_eq!(c.state(), ConnectionState::Connecting);
    }

    #[test]
    fn test_start_offline_does_not_connect_but_renders_cache() {
        let store = MemorySnapshotStore::with_data(r#"{"system_status":{"cpu_load":42}}"#);
        let mut c = DashboardClient::new(ClientConfig::new(URL), store, false);
        let effects = c.start();

        assert_eq!(count(&effects, |e| matches!(e, Effect::Connect { .. })), 0);
        let rendered = effects.iter().find_map(|e| match e {
            Effect::Render(p) => Some(p.clone()),
            _ => None,
        });
        assert_eq!(rendered.unwrap().get("cpu-load"), Some("42%"));
        assert_eq!(c.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_open_arms_one_poll_timer() {
        let mut c = client(true);
        c.start();
        let effects = c.on_open();
        assert_eq!(
            effects,
            vec![
                Effect::ConnectionStatus(true),
                Effect::StartPolling { every: Duration::from_secs(1) }
            ]
        );
        assert!(c.is_polling());

        // A second open stops the old timer before arming a new one
        let effects = c.on_open();
        assert_eq!(effects[1], Effect::StopPolling);
        assert_eq!(count(&effects, |e| matches!(e, Effect::StartPolling { .. })), 1);
    }

    #[test]
    fn test_poll_tick_requests_metrics_only_when_connected() {
        let mut c = client(true);
        c.start();
        assert!(c.on_poll_tick().is_empty());
        c.on_open();
        assert_eq!(c.on_poll_tick(), vec![Effect::Send(ClientRequest::GetMetrics)]);
    }

    #[test]
    fn test_close_while_online_schedules_exactly_one_reconnect() {
        let mut c = connected();
        let effects = c.on_close();

        assert_eq!(
            effects,
            vec![
                Effect::ConnectionStatus(false),
                Effect::StopPolling,
                Effect::ScheduleReconnect { after: Duration::from_millis(5000) }
            ]
        );
        assert!(c.reconnect_pending());

        // A duplicate close does not schedule a second attempt
        let again = c.on_close();
        assert_eq!(count(&again, |e| matches!(e, Effect::ScheduleReconnect { .. })), 0);

        let effects = c.on_reconnect_due();
        assert_eq!(effects, vec![Effect::Connect { url: URL.to_string() }]);
        assert!(!c.reconnect_pending());
        assert!(c.on_reconnect_due().is_empty());
    }

    #[test]
    fn test_close_while_offline_never_reconnects() {
        let mut c = connected();
        c.set_online(false);
        let effects = c.on_close();
        assert_eq!(count(&effects, |e| matches!(e, Effect::ScheduleReconnect { .. })), 0);
        assert!(!c.reconnect_pending());
        assert!(c.on_reconnect_due().is_empty());
    }

    #[test]
    fn test_error_marks_disconnected_and_close_retries() {
        let mut c = connected();
        assert_eq!(c.on_error("connection reset"), vec![Effect::ConnectionStatus(false)]);
        assert_eq!(c.state(), ConnectionState::Disconnected);

        let effects = c.on_close();
        assert_eq!(count(&effects, |e| matches!(e, Effect::ScheduleReconnect { .. })), 1);
    }

    #[test]
    fn test_offline_stops_polling_and_renders_cache() {
        let mut c = connected();
        c.on_message(r#"{"eco_metrics":{"power_usage":250}}"#);
        let effects = c.set_online(false);

        assert!(effects.contains(&Effect::StopPolling));
        let panel = effects.iter().find_map(|e| match e {
            Effect::Render(p) => Some(p),
            _ => None,
        });
        assert_eq!(panel.unwrap().get("power-usage"), Some("250 W"));
        assert!(c.on_poll_tick().is_empty());
        assert!(c.is_offline());
    }

    #[test]
    fn test_offline_with_no_cache_renders_blank() {
        let mut c = connected();
        let effects = c.set_online(false);
        assert!(effects.contains(&Effect::Render(DashboardPanel::default())));
    }

    #[test]
    fn test_offline_cancels_pending_reconnect() {
        let mut c = connected();
        c.on_close();
        let effects = c.set_online(false);
        assert!(effects.contains(&Effect::CancelReconnect));
        assert!(c.on_reconnect_due().is_empty());
    }

    #[test]
    fn test_online_reconnects_immediately() {
        let mut c = client(false);
        assert!(c.start().iter().all(|e| !matches!(e, Effect::Connect { .. })));
        let effects = c.set_online(true);
        assert_eq!(effects, vec![Effect::Connect { url: URL.to_string() }]);
        assert!(!c.is_offline());
    }

    #[test]
    fn test_connect_supersedes_pending_reconnect() {
        let mut c = connected();
        c.on_close();
        let effects = c.connect();
        assert_eq!(effects[0], Effect::CancelReconnect);
        assert!(!c.reconnect_pending());
    }

    #[test]
    fn test_messages_replace_snapshot_and_cache() {
        let mut c = connected();
        c.on_message(r#"{"eco_metrics":{"power_usage":100},"system_status":{"cpu_load":90}}"#);
        let effects = c.on_message(r#"{"system_status":{"cpu_load":10}}"#);

        let Effect::Render(panel) = &effects[0] else {
            panic!("expected render, got {:?}", effects);
        };
        assert_eq!(panel.get("cpu-load"), Some("10%"));
        assert_eq!(panel.get("power-usage"), Some("--"));
        assert!(c.last_snapshot().unwrap().eco_metrics.is_none());

        let cached = c.store.load().unwrap().unwrap();
        assert_eq!(
            TelemetrySnapshot::parse(&cached).unwrap(),
            *c.last_snapshot().unwrap()
        );
    }

    #[test]
    fn test_malformed_message_keeps_previous_snapshot() {
        let mut c = connected();
        c.on_message(r#"{"system_status":{"cpu_load":55}}"#);
        let before = c.store.load().unwrap();

        assert!(c.on_message("{ not json").is_empty());
        assert!(c.on_message(r#"{"system_status": "hot"}"#).is_empty());

        assert_eq!(c.panel().get("cpu-load"), Some("55%"));
        assert_eq!(c.store.load().unwrap(), before);
    }

    #[test]
    fn test_storage_failures_are_not_fatal() {
        let mut c = DashboardClient::new(ClientConfig::new(URL), FailingStore, true);
        assert!(c.last_snapshot().is_none());
        c.start();
        c.on_open();

        let effects = c.on_message(r#"{"system_status":{"cpu_load":5}}"#);
        assert_eq!(effects.len(), 1);
        assert_eq!(c.panel().get("cpu-load"), Some("5%"));
    }

    #[test]
    fn test_corrupt_cache_is_ignored() {
        let store = MemorySnapshotStore::with_data("garbage");
        let c = DashboardClient::new(ClientConfig::new(URL), store, true);
        assert!(c.last_snapshot().is_none());
    }

    #[test]
    fn test_tab_activation() {
        let mut c = connected();
        let (result, effects) = c.activate_tab(DashboardTab::VehicleMetrics);
        assert_eq!(result, TabActivation::Refreshed);
        assert_eq!(effects, vec![Effect::Send(ClientRequest::GetMetrics)]);

        let (result, effects) = c.activate_tab(DashboardTab::Requirements);
        assert_eq!(result, TabActivation::Refreshed);
        assert!(effects.is_empty());

        c.set_online(false);
        let (result, effects) = c.activate_tab(DashboardTab::VehicleMetrics);
        assert_eq!(result, TabActivation::Ignored);
        assert!(effects.is_empty());
    }

    #[test]
    fn test_shutdown_cancels_timers_and_ignores_later_events() {
        let mut c = connected();
        let effects = c.shutdown();
        assert_eq!(effects, vec![Effect::StopPolling, Effect::CloseSocket]);

        assert!(c.on_close().iter().all(|e| !matches!(e, Effect::ScheduleReconnect { .. })));
        assert!(c.connect().is_empty());
        assert!(c.on_open().is_empty());
        assert!(c.on_poll_tick().is_empty());
        assert!(c.shutdown().is_empty());

        let mut c = connected();
        c.on_close();
        let effects = c.shutdown();
        assert_eq!(effects, vec![Effect::CancelReconnect]);
    }
}
