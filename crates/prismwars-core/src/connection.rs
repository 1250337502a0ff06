// Connection lifecycle: join on connect, heartbeat while connected, and a
// fixed-delay reconnect after the transport drops.
//
// The manager is a plain state machine. It reacts to transport lifecycle
// events and answers with `ConnectionAction`s that the application loop
// carries out (sending frames, arming or disarming timers). Rejoining is
// idempotent on the authority side, so a join goes out on every connect.

use std::time::Duration;

use tracing::{info, warn};

use crate::transport::TransportEvent;
use crate::wire::GameCommand;

pub const DEFAULT_HEARTBEAT: Duration = Duration::from_secs(10);
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connected,
    #[default]
    Disconnected,
    Error,
}

impl ConnectionStatus {
    /// Indicator text. A disconnected client is always trying to get back.
    pub fn label(self) -> &'static str {
        match self {
            ConnectionStatus::Connected => "Connected",
            ConnectionStatus::Disconnected => "Reconnecting…",
            ConnectionStatus::Error => "Connection error",
        }
    }
}

/// Side effects requested by the manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionAction {
    Send(GameCommand),
    StartHeartbeat(Duration),
    StopHeartbeat,
    ScheduleReconnect(Duration),
    CancelReconnect,
}

#[derive(Debug)]
pub struct ConnectionManager {
    status: ConnectionStatus,
    heartbeat_period: Duration,
    reconnect_delay: Duration,
    heartbeat_running: bool,
    reconnect_scheduled: bool,
    shut_down: bool,
    connects: u32,
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new(DEFAULT_HEARTBEAT, DEFAULT_RECONNECT_DELAY)
    }
}

impl ConnectionManager {
    pub fn new(heartbeat_period: Duration, reconnect_delay: Duration) -> Self {
        ConnectionManager {
            status: ConnectionStatus::Disconnected,
            heartbeat_period,
            reconnect_delay,
            heartbeat_running: false,
            reconnect_scheduled: false,
            shut_down: false,
            connects: 0,
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn is_heartbeat_running(&self) -> bool {
        self.heartbeat_running
    }

    pub fn is_reconnect_scheduled(&self) -> bool {
        self.reconnect_scheduled
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    /// Number of successful connections so far.
    pub fn connect_count(&self) -> u32 {
        self.connects
    }

    /// React to a transport event. Data frames are not this manager's
    /// concern and produce no actions.
    pub fn on_transport_event(&mut self, event: &TransportEvent) -> Vec<ConnectionAction> {
        if self.shut_down {
            return Vec::new();
        }
        match event {
            TransportEvent::Connected => self.on_connected(),
            TransportEvent::Disconnected => self.on_disconnected(),
            TransportEvent::ConnectError(reason) => {
                warn!("connection error: {reason}");
                self.status = ConnectionStatus::Error;
                Vec::new()
            }
            TransportEvent::Message(_) => Vec::new(),
        }
    }

    fn on_connected(&mut self) -> Vec<ConnectionAction> {
        self.connects += 1;
        info!("connected (connection #{}), joining room", self.connects);
        self.status = ConnectionStatus::Connected;

        let mut actions = Vec::new();
        if self.reconnect_scheduled {
            self.reconnect_scheduled = false;
            actions.push(ConnectionAction::CancelReconnect);
        }
        actions.push(ConnectionAction::Send(GameCommand::JoinRoom));
        if !self.heartbeat_running {
            self.heartbeat_running = true;
            actions.push(ConnectionAction::StartHeartbeat(self.heartbeat_period));
        }
        actions
    }

    fn on_disconnected(&mut self) -> Vec<ConnectionAction> {
        info!(
            "disconnected; reconnecting in {:?}",
            self.reconnect_delay
        );
        self.status = ConnectionStatus::Disconnected;

        let mut actions = Vec::new();
        if self.heartbeat_running {
            self.heartbeat_running = false;
            actions.push(ConnectionAction::StopHeartbeat);
        }
        if !self.reconnect_scheduled {
            self.reconnect_scheduled = true;
            actions.push(ConnectionAction::ScheduleReconnect(self.reconnect_delay));
        }
        actions
    }

    /// The scheduled reconnect delay elapsed. Returns whether the transport
    /// should be asked to reconnect.
    pub fn on_reconnect_due(&mut self) -> bool {
        if self.shut_down || !self.reconnect_scheduled {
            return false;
        }
        self.reconnect_scheduled = false;
        self.status != ConnectionStatus::Connected
    }

    /// Heartbeat tick. Only produces a frame while connected.
    pub fn heartbeat(&self) -> Option<GameCommand> {
        (!self.shut_down && self.status == ConnectionStatus::Connected)
            .then_some(GameCommand::Heartbeat)
    }

    /// Terminal teardown: stop every recurring activity. Idempotent; only
    /// the first call returns actions.
    pub fn shutdown(&mut self) -> Vec<ConnectionAction> {
        if self.shut_down {
            return Vec::new();
        }
        info!("connection manager shutting down");
        self.shut_down = true;

        let mut actions = Vec::new();
        if self.heartbeat_running {
            self.heartbeat_running = false;
            actions.push(ConnectionAction::StopHeartbeat);
        }
        if self.reconnect_scheduled {
            self.reconnect_scheduled = false;
            actions.push(ConnectionAction::CancelReconnect);
        }
        actions
    }
}
