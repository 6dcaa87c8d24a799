//! Player session actor.
//!
//! One session per connected player (or robot). It decodes the frames its
//! transport delivers, checks the preconditions it owns (room chosen,
//! seated or not) and delegates to the registry or the seated table.
//! Events the table pushes into the session's private channel are encoded
//! and written back out. A failing request is logged and dropped; only a
//! closed or failing transport ends the session. Robot sessions also end
//! when their table is discarded.

use futures_util::FutureExt;
use std::{panic::AssertUnwindSafe, sync::Arc};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::{
    bot,
    game::entities::{Identity, RoomId, TableId},
    net::{ProtocolError, Request, Response, ServerMessage, Transport, TransportError},
    table::{RoomManager, Seat, SharedTable, TableError, TableEvent},
};

/// Events a table may queue for one session before further events are
/// dropped.
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Reasons a single request is dropped
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no room joined")]
    NoRoom,
    #[error("not seated at a table")]
    NoTable,
    #[error("already seated at table {0}")]
    AlreadySeated(TableId),
    #[error("room {0} does not exist")]
    NoSuchRoom(RoomId),
    #[error("table {0} is closed")]
    TableClosed(TableId),
    #[error(transparent)]
    Table(#[from] TableError),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

pub struct Session<T: Transport> {
    identity: Identity,
    robot: bool,
    registry: Arc<RoomManager>,
    transport: T,
    /// Fed by the seated table. Replaced on every seating; closes when the
    /// table drops the seat.
    events: mpsc::Receiver<TableEvent>,
    room: Option<RoomId>,
    table: Option<(TableId, SharedTable)>,
}

impl<T: Transport> Session<T> {
    pub fn new(identity: Identity, robot: bool, registry: Arc<RoomManager>, transport: T) -> Self {
        let (_, events) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            identity,
            robot,
            registry,
            transport,
            events,
            room: None,
            table: None,
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn room(&self) -> Option<RoomId> {
        self.room
    }

    pub fn table_id(&self) -> Option<TableId> {
        self.table.as_ref().map(|(id, _)| *id)
    }

    /// A seat wired to a fresh event channel.
    fn seat(&mut self) -> Seat {
        let (events_tx, events) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        self.events = events;
        Seat::new(self.identity.clone(), self.robot, events_tx)
    }

    /// Pumps frames in both directions until the transport closes or
    /// fails, then leaves the table. A robot also stops once its table is
    /// discarded.
    pub async fn run(mut self) {
        log::info!("Session {} started", self.identity);
        loop {
            tokio::select! {
                incoming = self.transport.recv() => match incoming {
                    Ok(Some(frame)) => self.dispatch(&frame).await,
                    Ok(None) => break,
                    Err(e) => {
                        log::warn!("Session {}: transport failed: {}", self.identity, e);
                        break;
                    }
                },
                event = self.events.recv(), if self.table.is_some() => match event {
                    Some(event) => {
                        let frame = ServerMessage::from(event).encode();
                        if let Err(e) = self.transport.send(frame).await {
                            log::warn!("Session {}: send failed: {}", self.identity, e);
                            break;
                        }
                    }
                    None => {
                        if let Some((id, _)) = self.table.take() {
                            log::debug!("Session {}: table {} was discarded", self.identity, id);
                        }
                        if self.robot {
                            break;
                        }
                    }
                },
            }
        }
        self.teardown().await;
    }

    /// Handles one frame. Every failure, a panic included, is contained
    /// to the frame.
    pub async fn dispatch(&mut self, frame: &str) {
        let request = match Request::decode(frame) {
            Ok(request) => request,
            Err(e) => {
                log::warn!("Session {}: dropping frame: {}", self.identity, e);
                return;
            }
        };
        log::debug!("Session {}: {}", self.identity, request);

        match AssertUnwindSafe(self.handle(request)).catch_unwind().await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => log::warn!("Session {}: request dropped: {}", self.identity, e),
            Err(_) => log::error!("Session {}: request handler panicked", self.identity),
        }
    }

    async fn reply(&mut self, response: Response) -> Result<(), SessionError> {
        let frame = ServerMessage::from(response).encode();
        self.transport.send(frame).await?;
        Ok(())
    }

    fn current_room(&self) -> Result<RoomId, SessionError> {
        self.room.ok_or(SessionError::NoRoom)
    }

    /// The seated table, forgetting it if the room has discarded it.
    async fn seated_table(&mut self) -> Option<(TableId, SharedTable)> {
        let (id, table) = self.table.clone()?;
        if table.read().await.is_closed() {
            log::debug!("Session {}: table {} was discarded", self.identity, id);
            self.table = None;
            return None;
        }
        Some((id, table))
    }

    async fn expect_unseated(&mut self) -> Result<(), SessionError> {
        match self.seated_table().await {
            Some((id, _)) => Err(SessionError::AlreadySeated(id)),
            None => Ok(()),
        }
    }

    async fn handle(&mut self, request: Request) -> Result<(), SessionError> {
        let player = self.identity.id;
        match request {
            Request::Identify => self.reply(Response::Identity(self.identity.clone())).await,
            Request::ListRooms => {
                let rooms = self.registry.list_rooms().await;
                self.reply(Response::Rooms(rooms)).await
            }
            Request::ListTables => {
                let room = self.current_room()?;
                let tables = self.registry.list_joinable(room).await?;
                self.reply(Response::Tables(tables)).await
            }
            Request::JoinRoom(room) => {
                if !self.registry.has_room(room) {
                    return Err(SessionError::NoSuchRoom(room));
                }
                self.expect_unseated().await?;
                self.room = Some(room);
                let tables = self.registry.list_joinable(room).await?;
                self.reply(Response::JoinedRoom(tables)).await
            }
            Request::NewTable => {
                let room = self.current_room()?;
                let table = self.open_table(room).await?;
                self.reply(Response::TableCreated(table)).await
            }
            Request::JoinTable(table) => {
                let room = self.current_room()?;
                self.join_table(room, table).await
            }
            Request::DealReady => {
                let (id, table) = self.seated_table().await.ok_or(SessionError::NoTable)?;
                let mut table = table.write().await;
                if table.is_closed() {
                    return Err(SessionError::TableClosed(id));
                }
                Ok(table.mark_ready(player)?)
            }
            Request::Bid(amount) => {
                let (id, table) = self.seated_table().await.ok_or(SessionError::NoTable)?;
                let mut table = table.write().await;
                if table.is_closed() {
                    return Err(SessionError::TableClosed(id));
                }
                table.bid(player, amount)?;
                Ok(())
            }
            Request::Play(cards) => {
                let (id, table) = self.seated_table().await.ok_or(SessionError::NoTable)?;
                let mut table = table.write().await;
                if table.is_closed() {
                    return Err(SessionError::TableClosed(id));
                }
                table.play(player, cards)?;
                Ok(())
            }
            Request::Chat(text) => {
                let (_, table) = self.seated_table().await.ok_or(SessionError::NoTable)?;
                let table = table.read().await;
                Ok(table.chat(player, &text)?)
            }
            Request::Restart => {
                let (id, table) = self.seated_table().await.ok_or(SessionError::NoTable)?;
                let mut table = table.write().await;
                if table.is_closed() {
                    return Err(SessionError::TableClosed(id));
                }
                table.vote_ready(player)?;
                Ok(())
            }
        }
    }

    /// Creates a table in `room` with this session as creator. In rooms
    /// that allow robots, empty seats are filled after the configured
    /// delay.
    pub async fn open_table(&mut self, room: RoomId) -> Result<TableId, SessionError> {
        self.expect_unseated().await?;
        let seat = self.seat();
        let (id, table) = self.registry.new_table(room, seat).await?;
        self.room = Some(room);
        self.table = Some((id, table));

        let allow_robot = self
            .registry
            .room_config(room)
            .await
            .is_some_and(|config| config.allow_robot);
        if allow_robot {
            bot::fill_table_after(self.registry.clone(), room, id);
        }
        Ok(id)
    }

    /// Seats this session at an existing table.
    pub async fn join_table(&mut self, room: RoomId, table: TableId) -> Result<(), SessionError> {
        self.expect_unseated().await?;
        let seat = self.seat();
        let handle = self.registry.join_table(room, table, seat).await?;
        self.room = Some(room);
        self.table = Some((table, handle));
        Ok(())
    }

    /// Leaves the seated table, if any.
    pub async fn teardown(&mut self) {
        if let (Some(room), Some((table, _))) = (self.room, self.table.take()) {
            match self
                .registry
                .leave_table(room, table, self.identity.id)
                .await
            {
                Ok(remaining) => log::info!(
                    "Session {} left table {} ({} remaining)",
                    self.identity,
                    table,
                    remaining
                ),
                Err(e) => log::debug!("Session {}: leave skipped: {}", self.identity, e),
            }
        }
        log::info!("Session {} closed", self.identity);
    }
}
