//! Tokio driver for [`DashboardClient`]
//!
//! Owns the socket, the poll interval and the reconnect timer, feeds their
//! events into the client and executes the effects it returns. At most one
//! socket, one interval and one reconnect timer exist at any time.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use std::collections::VecDeque;
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::{self, Instant, Interval, MissedTickBehavior, Sleep};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use super::client::{DashboardClient, Effect};
use super::panel::{DashboardPanel, DashboardTab};
use super::storage::SnapshotStore;

/// Socket failures
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Not connected")]
    NotConnected,

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("{0}")]
    Other(String),
}

/// A push socket carrying text frames
#[async_trait]
pub trait Transport: Send {
    /// Opens a connection to `url`, dropping any previous one
    async fn open(&mut self, url: &str) -> Result<(), TransportError>;

    async fn send(&mut self, text: String) -> Result<(), TransportError>;

    /// Next inbound text frame. `None` means the socket closed. Never resolves
    /// while no socket is open.
    async fn recv(&mut self) -> Option<Result<String, TransportError>>;

    async fn close(&mut self);
}

/// Receives what the dashboard should show
pub trait DashboardView: Send {
    fn render(&mut self, panel: &DashboardPanel);

    fn connection_status(&mut self, connected: bool);
}

/// Host signals standing in for browser events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    /// Network availability changed
    Network(bool),
    Tab(DashboardTab),
    Shutdown,
}

/// Sends [`Control`] signals to a running dashboard
#[derive(Debug, Clone)]
pub struct DashboardHandle {
    tx: mpsc::UnboundedSender<Control>,
}

impl DashboardHandle {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Control>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn set_online(&self, online: bool) {
        let _ = self.tx.send(Control::Network(online));
    }

    pub fn activate_tab(&self, tab: DashboardTab) {
        let _ = self.tx.send(Control::Tab(tab));
    }

    pub fn shutdown(&self) {
        let _ = self.tx.send(Control::Shutdown);
    }
}

/// WebSocket transport built on tokio-tungstenite
#[derive(Default)]
pub struct WsTransport {
    socket: Option<WebSocketStream<MaybeTlsStream<TcpStream>>>,
}

impl WsTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn open(&mut self, url: &str) -> Result<(), TransportError> {
        self.close().await;
        let (socket, _response) = connect_async(url).await?;
        self.socket = Some(socket);
        Ok(())
    }

    async fn send(&mut self, text: String) -> Result<(), TransportError> {
        let socket = self.socket.as_mut().ok_or(TransportError::NotConnected)?;
        socket.send(Message::Text(text)).await?;
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<String, TransportError>> {
        let Some(socket) = self.socket.as_mut() else {
            return std::future::pending().await;
        };

        loop {
            match socket.next().await {
                Some(Ok(Message::Text(text))) => return Some(Ok(text)),
                Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes) {
                    Ok(text) => return Some(Ok(text)),
                    Err(_) => log::warn!("Ignoring non UTF-8 binary frame"),
                },
                Some(Ok(Message::Close(_))) | None => {
                    self.socket = None;
                    return None;
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    self.socket = None;
                    return Some(Err(e.into()));
                }
            }
        }
    }

    async fn close(&mut self) {
        if let Some(mut socket) = self.socket.take() {
            if let Err(e) = socket.close(None).await {
                log::debug!("Error closing telemetry socket: {}", e);
            }
        }
    }
}

/// Builds `{ws|wss}://<host>/ws/<machine_id>`
pub fn socket_url(host: &str, secure: bool, machine_id: &str) -> anyhow::Result<String> {
    let scheme = if secure { "wss" } else { "ws" };
    let mut url = url::Url::parse(&format!("{}://{}/", scheme, host))
        .map_err(|e| anyhow::anyhow!("Invalid dashboard host '{}': {}", host, e))?;
    url.path_segments_mut()
        .map_err(|_| anyhow::anyhow!("Invalid dashboard host '{}'", host))?
        .clear()
        .push("ws")
        .push(machine_id);
    Ok(url.to_string())
}

/// Runs the client until a `Control::Shutdown` arrives or every handle is dropped.
///
/// Returns the client so the caller can inspect its final state.
pub async fn run_dashboard<S, T, V>(
    mut client: DashboardClient<S>,
    mut transport: T,
    mut view: V,
    mut control: mpsc::UnboundedReceiver<Control>,
) -> DashboardClient<S>
where
    S: SnapshotStore + Send,
    T: Transport,
    V: DashboardView,
{
    let mut driver = Driver::default();
    let mut pending: VecDeque<Effect> = client.start().into();

    loop {
        driver
            .apply(&mut pending, &mut client, &mut transport, &mut view, &mut control)
            .await;

        if client.is_shut_down() {
            break;
        }

        let effects = tokio::select! {
            frame = transport.recv() => match frame {
                Some(Ok(text)) => client.on_message(&text),
                Some(Err(e)) => {
                    let mut effects = client.on_error(&e.to_string());
                    effects.extend(client.on_close());
                    effects
                }
                None => client.on_close(),
            },
            _ = tick(&mut driver.poll) => client.on_poll_tick(),
            _ = due(&mut driver.reconnect) => {
                driver.reconnect = None;
                client.on_reconnect_due()
            }
            signal = control.recv() => on_control(&mut client, signal),
        };
        pending.extend(effects);
    }

    client
}

/// A closed control channel counts as a shutdown
fn on_control<S: SnapshotStore>(client: &mut DashboardClient<S>, signal: Option<Control>) -> Vec<Effect> {
    match signal {
        Some(Control::Network(online)) => client.set_online(online),
        Some(Control::Tab(tab)) => client.activate_tab(tab).1,
        Some(Control::Shutdown) | None => client.shutdown(),
    }
}

/// Shortest poll period the driver will arm
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Default)]
struct Driver {
    poll: Option<Interval>,
    reconnect: Option<Pin<Box<Sleep>>>,
}

impl Driver {
    /// Executes effects until none are left. Socket outcomes are fed back into
    /// the client and their effects appended.
    async fn apply<S, T, V>(
        &mut self,
        pending: &mut VecDeque<Effect>,
        client: &mut DashboardClient<S>,
        transport: &mut T,
        view: &mut V,
        control: &mut mpsc::UnboundedReceiver<Control>,
    ) where
        S: SnapshotStore,
        T: Transport,
        V: DashboardView,
    {
        while let Some(effect) = pending.pop_front() {
            match effect {
                Effect::Connect { url } => {
                    let outcome = open_or_supersede(&url, client, transport, pending, control).await;
                    let follow_up = match outcome {
                        Some(Ok(())) => client.on_open(),
                        Some(Err(e)) => {
                            let mut effects = client.on_error(&e.to_string());
                            effects.extend(client.on_close());
                            effects
                        }
                        // Abandoned: shut down, or a newer Connect is queued
                        None => Vec::new(),
                    };
                    pending.extend(follow_up);
                }
                Effect::Send(request) => {
                    if let Err(e) = transport.send(request.to_json()).await {
                        let mut effects = client.on_error(&e.to_string());
                        transport.close().await;
                        effects.extend(client.on_close());
                        pending.extend(effects);
                    }
                }
                Effect::StartPolling { every } => {
                    if every < MIN_POLL_INTERVAL {
                        log::warn!("Poll interval {:?} too short, using {:?}", every, MIN_POLL_INTERVAL);
                    }
                    let every = every.max(MIN_POLL_INTERVAL);
                    let mut interval = time::interval_at(Instant::now() + every, every);
                    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
                    self.poll = Some(interval);
                }
                Effect::StopPolling => self.poll = None,
                Effect::ScheduleReconnect { after } => {
                    self.reconnect = Some(Box::pin(time::sleep(after)));
                }
                Effect::CancelReconnect => self.reconnect = None,
                Effect::Render(panel) => view.render(&panel),
                Effect::ConnectionStatus(connected) => view.connection_status(connected),
                Effect::CloseSocket => transport.close().await,
            }
        }
    }
}

/// Opens the socket while still serving control signals. Returns `None` when
/// the attempt was abandoned because the client shut down or asked for a
/// fresh connection; the half-open attempt is dropped.
async fn open_or_supersede<S, T>(
    url: &str,
    client: &mut DashboardClient<S>,
    transport: &mut T,
    pending: &mut VecDeque<Effect>,
    control: &mut mpsc::UnboundedReceiver<Control>,
) -> Option<Result<(), TransportError>>
where
    S: SnapshotStore,
    T: Transport,
{
    let open = transport.open(url);
    tokio::pin!(open);

    loop {
        tokio::select! {
            result = &mut open => return Some(result),
            signal = control.recv() => {
                let effects = on_control(client, signal);
                let superseded = client.is_shut_down()
                    || effects.iter().any(|e| matches!(e, Effect::Connect { .. }));
                pending.extend(effects);
                if superseded {
                    log::debug!("Abandoning connection attempt to {}", url);
                    return None;
                }
            }
        }
    }
}

async fn tick(poll: &mut Option<Interval>) {
    match poll {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn due(reconnect: &mut Option<Pin<Box<Sleep>>>) {
    match reconnect {
        Some(sleep) => sleep.as_mut().await,
        None => std::future::pending().await,
    }
}
