//! One socket connection per process, shared by every live view.
//!
//! Views call [`RealtimeHub::subscribe`] and keep the returned
//! [`Subscription`] for as long as they listen. The hub joins a room when
//! its first subscriber appears and leaves it when the last one is dropped;
//! dropping a subscription never affects other listeners. Events are routed
//! by their payload to the matching room. After a disconnect the hub waits
//! a fixed delay, reconnects and rejoins every room that still has
//! subscribers; each of them is then told to resync, since events emitted
//! while offline are gone.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use cardapio_core::events::{RealtimeEvent, Room};
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::{Instant, sleep, timeout};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, instrument, warn};

use super::protocol::{self, CONNECT, PONG, Packet};
use crate::config::ApiConfig;

/// Events buffered per room before slow subscribers start lagging.
const ROOM_CAPACITY: usize = 64;

/// Silence tolerated before the server's handshake arrives.
const DEFAULT_LIVENESS: Duration = Duration::from_secs(45);

/// The hub task has stopped.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("realtime hub is not running")]
pub struct HubClosed;

/// Why [`Subscription::recv`] returned without an event.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionError {
    /// The subscriber fell behind and missed this many events; its view
    /// should be rebuilt from a fresh snapshot.
    #[error("missed {0} realtime events")]
    Lagged(u64),
    /// The socket reconnected after a gap; events emitted meanwhile were
    /// lost and the view should be rebuilt from a fresh snapshot.
    #[error("realtime connection was re-established")]
    Resynced,
    #[error("realtime hub is not running")]
    Closed,
}

/// What a room broadcasts to its subscribers.
#[derive(Debug, Clone, PartialEq)]
enum Delivery {
    Event(RealtimeEvent),
    Resync,
}

enum Command {
    Subscribe {
        room: Room,
        reply: oneshot::Sender<broadcast::Receiver<Delivery>>,
    },
    Unsubscribe(Room),
}

/// Handle to the realtime connection task.
#[derive(Clone)]
pub struct RealtimeHub {
    commands: mpsc::UnboundedSender<Command>,
    connected: Arc<AtomicBool>,
}

impl RealtimeHub {
    /// Spawn the connection task on the current Tokio runtime.
    #[must_use]
    pub fn spawn(config: &ApiConfig) -> Self {
        Self::spawn_with(
            config.socket_endpoint(),
            config.reconnect_delay,
            config.timeout,
        )
    }

    /// Spawn against an explicit WebSocket endpoint.
    ///
    /// `connect_timeout` bounds the TCP connect plus the WebSocket upgrade.
    #[must_use]
    pub fn spawn_with(endpoint: String, reconnect_delay: Duration, connect_timeout: Duration) -> Self {
        let (commands, receiver) = mpsc::unbounded_channel();
        let connected = Arc::new(AtomicBool::new(false));
        let task = HubTask {
            endpoint,
            reconnect_delay,
            connect_timeout,
            sessions: 0,
            registry: RoomRegistry::default(),
            commands: receiver,
            connected: Arc::clone(&connected),
        };
        tokio::spawn(task.run());
        Self {
            commands,
            connected,
        }
    }

    /// Start listening on `room`.
    ///
    /// # Errors
    ///
    /// Returns [`HubClosed`] if the hub task has stopped.
    pub async fn subscribe(&self, room: Room) -> Result<Subscription, HubClosed> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Command::Subscribe { room, reply })
            .map_err(|_| HubClosed)?;
        let receiver = response.await.map_err(|_| HubClosed)?;
        Ok(Subscription {
            room,
            receiver,
            commands: self.commands.clone(),
        })
    }

    /// Whether the socket is currently connected to the server.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for RealtimeHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeHub")
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}

/// A live listener on one room. Dropping it unsubscribes.
pub struct Subscription {
    room: Room,
    receiver: broadcast::Receiver<Delivery>,
    commands: mpsc::UnboundedSender<Command>,
}

impl Subscription {
    #[must_use]
    pub const fn room(&self) -> Room {
        self.room
    }

    /// Wait for the next event on this room.
    ///
    /// # Errors
    ///
    /// Returns [`SubscriptionError::Lagged`] when events were dropped for
    /// this subscriber, [`SubscriptionError::Resynced`] after a reconnect and
    /// [`SubscriptionError::Closed`] when the hub stops.
    pub async fn recv(&mut self) -> Result<RealtimeEvent, SubscriptionError> {
        match self.receiver.recv().await {
            Ok(Delivery::Event(event)) => Ok(event),
            Ok(Delivery::Resync) => Err(SubscriptionError::Resynced),
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                Err(SubscriptionError::Lagged(missed))
            }
            Err(broadcast::error::RecvError::Closed) => Err(SubscriptionError::Closed),
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        // The hub may already be gone during shutdown.
        let _ = self.commands.send(Command::Unsubscribe(self.room));
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("room", &self.room)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Room bookkeeping
// =============================================================================

/// Change in the set of rooms the socket must be joined to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Membership {
    Join(Room),
    Leave(Room),
}

impl Membership {
    fn frame(self) -> String {
        match self {
            Self::Join(room) => protocol::encode_event(room.join_event(), &room.payload()),
            Self::Leave(room) => protocol::encode_event(room.leave_event(), &room.payload()),
        }
    }
}

struct RoomEntry {
    sender: broadcast::Sender<Delivery>,
    subscribers: usize,
}

#[derive(Default)]
struct RoomRegistry {
    rooms: HashMap<Room, RoomEntry>,
}

impl RoomRegistry {
    fn subscribe(&mut self, room: Room) -> (broadcast::Receiver<Delivery>, Option<Membership>) {
        if let Some(entry) = self.rooms.get_mut(&room) {
            entry.subscribers += 1;
            return (entry.sender.subscribe(), None);
        }
        let (sender, receiver) = broadcast::channel(ROOM_CAPACITY);
        self.rooms.insert(
            room,
            RoomEntry {
                sender,
                subscribers: 1,
            },
        );
        (receiver, Some(Membership::Join(room)))
    }

    fn unsubscribe(&mut self, room: Room) -> Option<Membership> {
        let entry = self.rooms.get_mut(&room)?;
        entry.subscribers = entry.subscribers.saturating_sub(1);
        if entry.subscribers > 0 {
            return None;
        }
        self.rooms.remove(&room);
        Some(Membership::Leave(room))
    }

    #[cfg(test)]
    fn subscribers(&self, room: Room) -> usize {
        self.rooms.get(&room).map_or(0, |e| e.subscribers)
    }

    fn rooms(&self) -> impl Iterator<Item = Room> + '_ {
        self.rooms.keys().copied()
    }

    /// Deliver an event to its room. Returns how many rooms received it.
    fn dispatch(&self, event: &RealtimeEvent) -> usize {
        match event.room() {
            Some(room) => self.rooms.get(&room).map_or(0, |entry| {
                let _ = entry.sender.send(Delivery::Event(event.clone()));
                1
            }),
            None => self
                .rooms
                .iter()
                .filter(|(room, _)| matches!(room, Room::Company(_)))
                .map(|(_, entry)| {
                    let _ = entry.sender.send(Delivery::Event(event.clone()));
                })
                .count(),
        }
    }

    /// Tell every room its subscribers may have missed events.
    fn resync(&self) {
        for entry in self.rooms.values() {
            let _ = entry.sender.send(Delivery::Resync);
        }
    }

    fn apply(&mut self, command: Command) -> Option<Membership> {
        match command {
            Command::Subscribe { room, reply } => {
                let (receiver, change) = self.subscribe(room);
                if reply.send(receiver).is_err() {
                    // Caller gave up before the reply; undo its reference.
                    return match change {
                        Some(_) => {
                            self.rooms.remove(&room);
                            None
                        }
                        None => self.unsubscribe(room),
                    };
                }
                change
            }
            Command::Unsubscribe(room) => self.unsubscribe(room),
        }
    }
}

// =============================================================================
// Connection task
// =============================================================================

#[derive(Debug, Error)]
enum ConnectionError {
    #[error("websocket error: {0}")]
    Socket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("server refused connection: {0}")]
    Rejected(String),
    #[error("connect timed out after {}s", .0.as_secs())]
    Timeout(Duration),
}

enum Exit {
    Disconnected,
    Shutdown,
}

type Socket =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

struct HubTask {
    endpoint: String,
    reconnect_delay: Duration,
    connect_timeout: Duration,
    /// Completed namespace connections so far.
    sessions: u64,
    registry: RoomRegistry,
    commands: mpsc::UnboundedReceiver<Command>,
    connected: Arc<AtomicBool>,
}

impl HubTask {
    #[instrument(name = "realtime_hub", skip(self), fields(endpoint = %self.endpoint))]
    async fn run(mut self) {
        loop {
            match self.serve().await {
                Ok(Exit::Shutdown) => break,
                Ok(Exit::Disconnected) => info!("Realtime connection closed"),
                Err(e) => warn!(error = %e, "Realtime connection failed"),
            }
            self.connected.store(false, Ordering::Relaxed);
            if !self.wait_before_reconnect().await {
                break;
            }
        }
        self.connected.store(false, Ordering::Relaxed);
        debug!("Realtime hub stopped");
    }

    /// Keep bookkeeping while offline. Returns `false` once every hub handle
    /// is gone.
    async fn wait_before_reconnect(&mut self) -> bool {
        let delay = sleep(self.reconnect_delay);
        tokio::pin!(delay);
        loop {
            tokio::select! {
                () = &mut delay => return true,
                command = self.commands.recv() => match command {
                    Some(command) => {
                        self.registry.apply(command);
                    }
                    None => return false,
                },
            }
        }
    }

    /// Open the socket while still serving subscribe and unsubscribe.
    /// Returns `Ok(None)` once every hub handle is gone.
    async fn connect(&mut self) -> Result<Option<Socket>, ConnectionError> {
        let attempt = timeout(self.connect_timeout, connect_async(self.endpoint.as_str()));
        tokio::pin!(attempt);
        loop {
            tokio::select! {
                result = &mut attempt => {
                    let (socket, _) = result
                        .map_err(|_| ConnectionError::Timeout(self.connect_timeout))??;
                    return Ok(Some(socket));
                }
                command = self.commands.recv() => match command {
                    Some(command) => {
                        self.registry.apply(command);
                    }
                    None => return Ok(None),
                },
            }
        }
    }

    async fn serve(&mut self) -> Result<Exit, ConnectionError> {
        let Some(socket) = self.connect().await? else {
            return Ok(Exit::Shutdown);
        };
        let (mut sink, mut stream) = socket.split();
        debug!("Realtime socket opened");

        let mut liveness = DEFAULT_LIVENESS;
        let mut joined = false;
        let deadline = sleep(liveness);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                message = stream.next() => {
                    let Some(message) = message else {
                        return Ok(Exit::Disconnected);
                    };
                    deadline.as_mut().reset(Instant::now() + liveness);

                    let text = match message? {
                        Message::Text(text) => text,
                        Message::Close(_) => return Ok(Exit::Disconnected),
                        _ => continue,
                    };

                    match protocol::decode(&text) {
                        Ok(Packet::Open(handshake)) => {
                            liveness = handshake.liveness_window();
                            deadline.as_mut().reset(Instant::now() + liveness);
                            sink.send(Message::text(CONNECT.to_string())).await?;
                        }
                        Ok(Packet::Ping) => sink.send(Message::text(PONG.to_string())).await?,
                        Ok(Packet::Connected) => {
                            joined = true;
                            self.connected.store(true, Ordering::Relaxed);
                            let rooms: Vec<Room> = self.registry.rooms().collect();
                            info!(rooms = rooms.len(), "Realtime connected");
                            for room in rooms {
                                sink.send(Message::text(Membership::Join(room).frame())).await?;
                            }
                            if self.sessions > 0 {
                                self.registry.resync();
                            }
                            self.sessions += 1;
                        }
                        Ok(Packet::Event { name, args }) => self.dispatch(&name, args),
                        Ok(Packet::Close | Packet::Disconnected) => return Ok(Exit::Disconnected),
                        Ok(Packet::ConnectError(message)) => {
                            return Err(ConnectionError::Rejected(message));
                        }
                        Ok(Packet::Pong | Packet::Ignored) => {}
                        Err(e) => warn!(error = %e, "Undecodable realtime frame"),
                    }
                }
                command = self.commands.recv() => {
                    let Some(command) = command else {
                        let _ = sink.close().await;
                        return Ok(Exit::Shutdown);
                    };
                    if let Some(change) = self.registry.apply(command)
                        && joined
                    {
                        debug!(?change, "Updating room membership");
                        sink.send(Message::text(change.frame())).await?;
                    }
                }
                () = &mut deadline => {
                    warn!(timeout_secs = liveness.as_secs(), "Realtime heartbeat timed out");
                    return Ok(Exit::Disconnected);
                }
            }
        }
    }

    fn dispatch(&self, name: &str, args: Vec<Value>) {
        let payload = args.into_iter().next().unwrap_or(Value::Null);
        match RealtimeEvent::decode(name, payload) {
            Ok(Some(event)) => {
                let delivered = self.registry.dispatch(&event);
                debug!(event = name, pedido_id = %event.pedido_id(), delivered, "Realtime event");
            }
            Ok(None) => debug!(event = name, "Ignoring unknown realtime event"),
            Err(e) => warn!(event = name, error = %e, "Malformed realtime event payload"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use cardapio_core::events::PedidoRef;
    use cardapio_core::types::{EmpresaId, PedidoId};

    fn company(id: i32) -> Room {
        Room::Company(EmpresaId::new(id))
    }

    #[test]
    fn test_first_subscriber_joins_last_leaves() {
        let mut registry = RoomRegistry::default();
        let (_a, change) = registry.subscribe(company(1));
        assert_eq!(change, Some(Membership::Join(company(1))));
        let (_b, change) = registry.subscribe(company(1));
        assert_eq!(change, None);
        assert_eq!(registry.subscribers(company(1)), 2);

        assert_eq!(registry.unsubscribe(company(1)), None);
        assert_eq!(registry.unsubscribe(company(1)), Some(Membership::Leave(company(1))));
        assert_eq!(registry.subscribers(company(1)), 0);
        assert_eq!(registry.unsubscribe(company(1)), None);
    }

    #[test]
    fn test_events_reach_only_their_room() {
        let mut registry = RoomRegistry::default();
        let (mut one, _) = registry.subscribe(company(1));
        let (mut two, _) = registry.subscribe(company(2));
        let (mut pedido, _) = registry.subscribe(Room::Pedido(PedidoId::new(9)));

        let deleted = RealtimeEvent::OrderDeleted(PedidoRef {
            id: PedidoId::new(9),
            empresa_id: Some(EmpresaId::new(2)),
        });
        assert_eq!(registry.dispatch(&deleted), 1);
        assert!(one.try_recv().is_err());
        assert_eq!(two.try_recv().unwrap(), Delivery::Event(deleted));
        assert!(pedido.try_recv().is_err());
    }

    #[test]
    fn test_company_event_without_id_fans_out() {
        let mut registry = RoomRegistry::default();
        let (mut one, _) = registry.subscribe(company(1));
        let (mut two, _) = registry.subscribe(company(2));
        let (mut pedido, _) = registry.subscribe(Room::Pedido(PedidoId::new(9)));

        let finalized = RealtimeEvent::OrderFinalized(PedidoRef {
            id: PedidoId::new(3),
            empresa_id: None,
        });
        assert_eq!(registry.dispatch(&finalized), 2);
        assert!(one.try_recv().is_ok());
        assert!(two.try_recv().is_ok());
        assert!(pedido.try_recv().is_err());
    }

    #[test]
    fn test_resync_reaches_every_room() {
        let mut registry = RoomRegistry::default();
        let (mut board, _) = registry.subscribe(company(1));
        let (mut tracker, _) = registry.subscribe(Room::Pedido(PedidoId::new(9)));

        registry.resync();
        assert_eq!(board.try_recv().unwrap(), Delivery::Resync);
        assert_eq!(tracker.try_recv().unwrap(), Delivery::Resync);
    }

    #[test]
    fn test_abandoned_subscribe_does_not_leak_reference() {
        let mut registry = RoomRegistry::default();
        let (reply, response) = oneshot::channel();
        drop(response);
        let change = registry.apply(Command::Subscribe {
            room: company(1),
            reply,
        });
        assert_eq!(change, None);
        assert_eq!(registry.subscribers(company(1)), 0);
    }

    #[test]
    fn test_membership_frames() {
        assert_eq!(Membership::Join(company(5)).frame(), r#"42["join_company_room",5]"#);
        assert_eq!(
            Membership::Leave(Room::Pedido(PedidoId::new(7))).frame(),
            r#"42["leave_pedido_room",7]"#
        );
    }

    #[tokio::test]
    async fn test_dropping_subscription_only_removes_that_listener() {
        // Unreachable endpoint: the hub stays offline but keeps bookkeeping.
        let hub = RealtimeHub::spawn_with(
            "ws://127.0.0.1:9".to_string(),
            Duration::from_secs(60),
            Duration::from_secs(5),
        );
        let first = hub.subscribe(company(1)).await.unwrap();
        let second = hub.subscribe(company(1)).await.unwrap();
        drop(first);
        assert_eq!(second.room(), company(1));
        assert!(!hub.is_connected());
    }
}
