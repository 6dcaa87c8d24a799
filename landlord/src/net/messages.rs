//! Wire protocol.
//!
//! Every frame is a JSON array whose first element is an opcode and whose
//! remaining elements are the arguments, e.g. `[25, 2]` bids 2 and
//! `[28, 7, [12, 13]]` announces that player 7 played two cards. Cards
//! travel as their ids.

use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::fmt;

use super::errors::{ProtocolError, Result};
use crate::{
    game::entities::{Card, Identity, RoomId, TableId},
    table::{RoomSummary, Settlement, Snapshot, TableEvent, TablePhase},
};

/// Frame opcodes. Requests are odd, their responses the following even
/// number; events the table pushes unprompted start at 41.
pub mod opcode {
    pub const REQ_IDENTIFY: u64 = 11;
    pub const RES_IDENTIFY: u64 = 12;
    pub const REQ_ROOMS: u64 = 13;
    pub const RES_ROOMS: u64 = 14;
    pub const REQ_TABLES: u64 = 15;
    pub const RES_TABLES: u64 = 16;
    pub const REQ_JOIN_ROOM: u64 = 17;
    pub const RES_JOIN_ROOM: u64 = 18;
    pub const REQ_NEW_TABLE: u64 = 19;
    pub const RES_NEW_TABLE: u64 = 20;
    pub const REQ_JOIN_TABLE: u64 = 21;
    pub const RES_JOIN_TABLE: u64 = 22;
    pub const REQ_DEAL_READY: u64 = 23;
    pub const RES_DEAL_READY: u64 = 24;
    pub const REQ_BID: u64 = 25;
    pub const RES_BID: u64 = 26;
    pub const REQ_PLAY: u64 = 27;
    pub const RES_PLAY: u64 = 28;
    pub const REQ_CHAT: u64 = 29;
    pub const RES_CHAT: u64 = 30;
    pub const REQ_RESTART: u64 = 31;
    pub const RES_RESTART: u64 = 32;

    pub const EVT_DEAL: u64 = 41;
    pub const EVT_KITTY: u64 = 42;
    pub const EVT_TURN: u64 = 43;
    pub const EVT_GAME_OVER: u64 = 44;
    pub const EVT_SYNC: u64 = 45;
}

use opcode::*;

/// A request from a client (or robot) to its session.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Request {
    Identify,
    ListRooms,
    ListTables,
    JoinRoom(RoomId),
    NewTable,
    JoinTable(TableId),
    /// Ready flag after a finished hand, without forcing a restart.
    DealReady,
    /// `0` passes.
    Bid(u8),
    /// An empty play passes.
    Play(Vec<Card>),
    Chat(String),
    Restart,
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identify => write!(f, "identify"),
            Self::ListRooms => write!(f, "list rooms"),
            Self::ListTables => write!(f, "list tables"),
            Self::JoinRoom(room) => write!(f, "join room {room}"),
            Self::NewTable => write!(f, "new table"),
            Self::JoinTable(table) => write!(f, "join table {table}"),
            Self::DealReady => write!(f, "ready"),
            Self::Bid(amount) => write!(f, "bid {amount}"),
            Self::Play(cards) if cards.is_empty() => write!(f, "pass"),
            Self::Play(cards) => write!(f, "play {} cards", cards.len()),
            Self::Chat(_) => write!(f, "chat"),
            Self::Restart => write!(f, "restart"),
        }
    }
}

impl Request {
    pub fn encode(&self) -> String {
        let frame = match self {
            Self::Identify => json!([REQ_IDENTIFY]),
            Self::ListRooms => json!([REQ_ROOMS]),
            Self::ListTables => json!([REQ_TABLES]),
            Self::JoinRoom(room) => json!([REQ_JOIN_ROOM, room]),
            Self::NewTable => json!([REQ_NEW_TABLE]),
            Self::JoinTable(table) => json!([REQ_JOIN_TABLE, table]),
            Self::DealReady => json!([REQ_DEAL_READY]),
            Self::Bid(amount) => json!([REQ_BID, amount]),
            Self::Play(cards) => json!([REQ_PLAY, cards]),
            Self::Chat(text) => json!([REQ_CHAT, text]),
            Self::Restart => json!([REQ_RESTART]),
        };
        frame.to_string()
    }

    pub fn decode(text: &str) -> Result<Self> {
        let (code, args) = split(text)?;
        let request = match code {
            REQ_IDENTIFY => Self::Identify,
            REQ_ROOMS => Self::ListRooms,
            REQ_TABLES => Self::ListTables,
            REQ_JOIN_ROOM => Self::JoinRoom(arg(&args, 0)?),
            REQ_NEW_TABLE => Self::NewTable,
            REQ_JOIN_TABLE => Self::JoinTable(arg(&args, 0)?),
            REQ_DEAL_READY => Self::DealReady,
            REQ_BID => Self::Bid(arg(&args, 0)?),
            REQ_PLAY => Self::Play(cards_arg(&args, 0)?),
            REQ_CHAT => Self::Chat(arg(&args, 0)?),
            REQ_RESTART => Self::Restart,
            other => return Err(ProtocolError::UnknownOpcode(other)),
        };
        Ok(request)
    }
}

/// A session's direct answer to a request.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Response {
    Identity(Identity),
    Rooms(Vec<RoomSummary>),
    /// `(table, occupancy)` for every joinable table in the room.
    Tables(Vec<(TableId, usize)>),
    JoinedRoom(Vec<(TableId, usize)>),
    TableCreated(TableId),
}

/// Anything a session writes to its transport.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ServerMessage {
    Reply(Response),
    Event(TableEvent),
}

impl From<Response> for ServerMessage {
    fn from(response: Response) -> Self {
        Self::Reply(response)
    }
}

impl From<TableEvent> for ServerMessage {
    fn from(event: TableEvent) -> Self {
        Self::Event(event)
    }
}

impl ServerMessage {
    pub fn encode(&self) -> String {
        let frame = match self {
            Self::Reply(response) => encode_response(response),
            Self::Event(event) => encode_event(event),
        };
        frame.to_string()
    }

    pub fn decode(text: &str) -> Result<Self> {
        let (code, args) = split(text)?;
        let args = args.as_slice();
        let message: Self = match code {
            RES_IDENTIFY => {
                Response::Identity(Identity::new(arg(args, 0)?, arg::<String>(args, 1)?)).into()
            }
            RES_ROOMS => {
                let rooms: Vec<(RoomId, bool, i64)> = arg(args, 0)?;
                let rooms = rooms
                    .into_iter()
                    .map(|(id, allow_robot, entrance_fee)| RoomSummary {
                        id,
                        allow_robot,
                        entrance_fee,
                    })
                    .collect();
                Response::Rooms(rooms).into()
            }
            RES_TABLES => Response::Tables(arg(args, 0)?).into(),
            RES_JOIN_ROOM => Response::JoinedRoom(arg(args, 0)?).into(),
            RES_NEW_TABLE => Response::TableCreated(arg(args, 0)?).into(),
            RES_JOIN_TABLE => TableEvent::Occupants {
                table: arg(args, 0)?,
                occupants: arg(args, 1)?,
            }
            .into(),
            RES_DEAL_READY => TableEvent::Ready(arg(args, 0)?).into(),
            RES_BID => TableEvent::Bid {
                player: arg(args, 0)?,
                amount: arg(args, 1)?,
                ended: arg(args, 2)?,
            }
            .into(),
            RES_PLAY => TableEvent::Play {
                player: arg(args, 0)?,
                cards: cards_arg(args, 1)?,
            }
            .into(),
            RES_CHAT => TableEvent::Chat {
                player: arg(args, 0)?,
                name: arg(args, 1)?,
                text: arg(args, 2)?,
            }
            .into(),
            RES_RESTART => TableEvent::RestartVote(arg(args, 0)?).into(),
            EVT_DEAL => TableEvent::Deal(cards_arg(args, 0)?).into(),
            EVT_KITTY => TableEvent::Kitty {
                landlord: arg(args, 0)?,
                kitty: cards_arg(args, 1)?,
                multiplier: arg(args, 2)?,
            }
            .into(),
            EVT_TURN => TableEvent::Turn(arg(args, 0)?).into(),
            EVT_GAME_OVER => TableEvent::GameOver(Settlement {
                winner: arg(args, 0)?,
                landlord_won: arg(args, 1)?,
                multiplier: arg(args, 2)?,
                deltas: arg(args, 3)?,
                landlord: optional_arg(args, 4)?,
                spring: optional_arg(args, 5)?,
            })
            .into(),
            EVT_SYNC => {
                let code: u8 = arg(args, 0)?;
                let phase = TablePhase::from_code(code).ok_or_else(|| ProtocolError::BadArgument {
                    index: 0,
                    reason: format!("unknown phase {code}"),
                })?;
                TableEvent::Sync(Snapshot {
                    phase,
                    turn: arg(args, 1)?,
                    last_player: arg(args, 2)?,
                    last_play: cards_arg(args, 3)?,
                    multiplier: arg(args, 4)?,
                    hand: cards_arg(args, 5)?,
                    occupants: arg(args, 6)?,
                })
                .into()
            }
            other => return Err(ProtocolError::UnknownOpcode(other)),
        };
        Ok(message)
    }
}

fn encode_response(response: &Response) -> Value {
    match response {
        Response::Identity(identity) => json!([RES_IDENTIFY, identity.id, identity.name]),
        Response::Rooms(rooms) => {
            let rooms: Vec<Value> = rooms
                .iter()
                .map(|room| json!([room.id, room.allow_robot, room.entrance_fee]))
                .collect();
            json!([RES_ROOMS, rooms])
        }
        Response::Tables(tables) => json!([RES_TABLES, tables]),
        Response::JoinedRoom(tables) => json!([RES_JOIN_ROOM, tables]),
        Response::TableCreated(table) => json!([RES_NEW_TABLE, table]),
    }
}

fn encode_event(event: &TableEvent) -> Value {
    match event {
        TableEvent::Occupants { table, occupants } => json!([RES_JOIN_TABLE, table, occupants]),
        TableEvent::Ready(player) => json!([RES_DEAL_READY, player]),
        TableEvent::Bid {
            player,
            amount,
            ended,
        } => json!([RES_BID, player, amount, ended]),
        TableEvent::Play { player, cards } => json!([RES_PLAY, player, cards]),
        TableEvent::Chat { player, name, text } => json!([RES_CHAT, player, name, text]),
        TableEvent::RestartVote(player) => json!([RES_RESTART, player]),
        TableEvent::Deal(hand) => json!([EVT_DEAL, hand]),
        TableEvent::Kitty {
            landlord,
            kitty,
            multiplier,
        } => json!([EVT_KITTY, landlord, kitty, multiplier]),
        TableEvent::Turn(player) => json!([EVT_TURN, player]),
        TableEvent::GameOver(settlement) => json!([
            EVT_GAME_OVER,
            settlement.winner,
            settlement.landlord_won,
            settlement.multiplier,
            settlement.deltas,
            settlement.landlord,
            settlement.spring
        ]),
        TableEvent::Sync(snapshot) => json!([
            EVT_SYNC,
            snapshot.phase.code(),
            snapshot.turn,
            snapshot.last_player,
            snapshot.last_play,
            snapshot.multiplier,
            snapshot.hand,
            snapshot.occupants
        ]),
    }
}

/// Splits a frame into its opcode and arguments.
fn split(text: &str) -> Result<(u64, Vec<Value>)> {
    let mut frame: Vec<Value> = serde_json::from_str(text)?;
    if frame.is_empty() {
        return Err(ProtocolError::EmptyFrame);
    }
    let op = frame.remove(0);
    let code = op
        .as_u64()
        .ok_or_else(|| ProtocolError::BadOpcode(op.to_string()))?;
    Ok((code, frame))
}

fn arg<T: DeserializeOwned>(args: &[Value], index: usize) -> Result<T> {
    let value = args
        .get(index)
        .ok_or(ProtocolError::MissingArgument(index))?;
    T::deserialize(value).map_err(|e| ProtocolError::BadArgument {
        index,
        reason: e.to_string(),
    })
}

/// Trailing arguments older peers may omit.
fn optional_arg<T: DeserializeOwned + Default>(args: &[Value], index: usize) -> Result<T> {
    if index < args.len() {
        arg(args, index)
    } else {
        Ok(T::default())
    }
}

fn cards_arg(args: &[Value], index: usize) -> Result<Vec<Card>> {
    let ids: Vec<u8> = arg(args, index)?;
    ids.into_iter()
        .map(|id| Card::new(id).ok_or(ProtocolError::BadCard(id)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cards(ids: &[u8]) -> Vec<Card> {
        ids.iter().map(|&id| Card::new(id).unwrap()).collect()
    }

    // === Request Tests ===

    #[test]
    fn test_decode_requests() {
        assert_eq!(Request::decode("[11]").unwrap(), Request::Identify);
        assert_eq!(Request::decode("[17, 1]").unwrap(), Request::JoinRoom(1));
        assert_eq!(Request::decode("[25, 3]").unwrap(), Request::Bid(3));
        assert_eq!(
            Request::decode("[27, [0, 53]]").unwrap(),
            Request::Play(cards(&[0, 53]))
        );
        assert_eq!(Request::decode("[27, []]").unwrap(), Request::Play(Vec::new()));
        assert_eq!(
            Request::decode(r#"[29, "hi"]"#).unwrap(),
            Request::Chat("hi".to_string())
        );
    }

    #[test]
    fn test_request_encoding() {
        assert_eq!(Request::Bid(2).encode(), "[25,2]");
        assert_eq!(Request::Play(cards(&[4, 5])).encode(), "[27,[4,5]]");
        assert_eq!(Request::NewTable.encode(), "[19]");
    }

    #[test]
    fn test_decode_rejects_bad_frames() {
        assert!(matches!(
            Request::decode("not json"),
            Err(ProtocolError::Malformed(_))
        ));
        assert!(matches!(Request::decode("[]"), Err(ProtocolError::EmptyFrame)));
        assert!(matches!(
            Request::decode(r#"["bid"]"#),
            Err(ProtocolError::BadOpcode(_))
        ));
        assert!(matches!(
            Request::decode("[99]"),
            Err(ProtocolError::UnknownOpcode(99))
        ));
        assert!(matches!(
            Request::decode("[25]"),
            Err(ProtocolError::MissingArgument(0))
        ));
        assert!(matches!(
            Request::decode(r#"[25, "three"]"#),
            Err(ProtocolError::BadArgument { index: 0, .. })
        ));
        assert!(matches!(
            Request::decode("[27, [54]]"),
            Err(ProtocolError::BadCard(54))
        ));
    }

    // === Server Message Tests ===

    #[test]
    fn test_event_encoding() {
        let bid = ServerMessage::from(TableEvent::Bid {
            player: 5,
            amount: 2,
            ended: false,
        });
        assert_eq!(bid.encode(), "[26,5,2,false]");

        let pass = ServerMessage::from(TableEvent::Play {
            player: -1,
            cards: Vec::new(),
        });
        assert_eq!(pass.encode(), "[28,-1,[]]");

        let rooms = ServerMessage::from(Response::Rooms(vec![RoomSummary {
            id: 1,
            allow_robot: true,
            entrance_fee: 200,
        }]));
        assert_eq!(rooms.encode(), "[14,[[1,true,200]]]");
    }

    #[test]
    fn test_sync_survives_the_wire() {
        let sync = ServerMessage::from(TableEvent::Sync(Snapshot {
            phase: TablePhase::Playing,
            turn: Some(3),
            last_player: None,
            last_play: Vec::new(),
            multiplier: 4,
            hand: cards(&[1, 2, 52]),
            occupants: vec![(1, "a".to_string(), 17), (3, "c".to_string(), 20)],
        }));
        assert_eq!(ServerMessage::decode(&sync.encode()).unwrap(), sync);
    }

    #[test]
    fn test_game_over_without_trailing_fields() {
        let decoded = ServerMessage::decode("[44, 2, false, 3, [[1, -6], [2, 3], [3, 3]]]").unwrap();
        let ServerMessage::Event(TableEvent::GameOver(settlement)) = decoded else {
            panic!("expected game over");
        };
        assert_eq!(settlement.winner, 2);
        assert_eq!(settlement.landlord, None);
        assert!(!settlement.spring);
        assert_eq!(settlement.deltas.len(), 3);
    }
}
