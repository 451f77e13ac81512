//! Game room management.
//!
//! A `GameRoom` owns one game, the connections watching it and the per-player
//! quotas. Callers hold the room's lock for the whole of `handle`, so every
//! broadcast reflects a completed mutation.

use binareversi_core::{
    bitop, BitOpError, BoardView, Color, Game, GameError, Move, Operator, Winner, BOARD_SIZE,
};
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::protocol::{ClientMessage, ServerMessage};
use crate::store::RoomRecord;

/// Uses of each operator allowed per player
pub const MAX_OPERATOR_USES: u8 = 2;

/// Passes allowed per player
pub const MAX_PASSES: u8 = 3;

pub type ConnectionId = Uuid;

/// Outbound channel of one connection
pub type Outbox = mpsc::UnboundedSender<ServerMessage>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoomError {
    #[error(transparent)]
    Rule(#[from] GameError),

    #[error(transparent)]
    Operation(#[from] BitOpError),

    #[error("row index out of bounds")]
    RowOutOfBounds,

    #[error("Operator {0} used too many times (max 2).")]
    OperatorQuotaExceeded(Operator),

    #[error("You have exceeded the maximum number of passes (3).")]
    PassQuotaExceeded,

    #[error("game is already over")]
    GameConcluded,

    #[error("Player not in room")]
    PlayerNotInRoom,

    #[error("Connection not in room")]
    UnknownConnection,
}

/// Lifecycle of a room
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomStatus {
    /// Only the first seat is filled
    AwaitingPlayers,
    InProgress,
    /// A `game_over` has been sent; gameplay moves are refused
    Concluded,
}

/// What the connection loop should do after a message was handled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Continue,
    /// The player asked for the room to be deleted
    Exit { player_id: String },
}

/// Per-player usage counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Quota {
    pub passes: u8,
    pub plus: u8,
    pub mul: u8,
}

impl Quota {
    pub fn operator_uses(&self, operator: Operator) -> u8 {
        match operator {
            Operator::Add => self.plus,
            Operator::Mul => self.mul,
        }
    }

    fn operator_uses_mut(&mut self, operator: Operator) -> &mut u8 {
        match operator {
            Operator::Add => &mut self.plus,
            Operator::Mul => &mut self.mul,
        }
    }
}

/// A seated player
#[derive(Debug, Clone)]
pub struct RoomPlayer {
    pub color: Color,
    pub quota: Quota,
    /// Bumped every time the player loses their last connection
    pub disconnect_epoch: u64,
}

impl RoomPlayer {
    fn new(color: Color) -> Self {
        Self {
            color,
            quota: Quota::default(),
            disconnect_epoch: 0,
        }
    }
}

/// A live connection watching the room
#[derive(Debug)]
struct Connection {
    player_id: String,
    sender: Outbox,
}

/// Returned when a player's last connection went away
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Departure {
    pub player_id: String,
    pub epoch: u64,
}

/// What a forfeit timer found when it fired
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForfeitCheck {
    /// The opponent won
    Applied,
    /// Still away, but there is no opponent seated yet; check again later
    Deferred,
    /// Came back, left again since, or the game already ended
    Stale,
}

/// One room: a game plus everything needed to run it over the network
pub struct GameRoom {
    pub id: String,
    pub status: RoomStatus,
    game: Game,
    players: HashMap<String, RoomPlayer>,
    connections: HashMap<ConnectionId, Connection>,
    /// Most recent passer since the last board-changing move
    last_pass_player: Option<String>,
}

impl GameRoom {
    pub fn new(record: &RoomRecord) -> Self {
        let mut room = Self {
            id: record.id.clone(),
            status: RoomStatus::AwaitingPlayers,
            game: Game::new(record.id.clone()),
            players: HashMap::new(),
            connections: HashMap::new(),
            last_pass_player: None,
        };
        room.seat_players(record);
        room
    }

    /// Assign colors to any seat not yet seen. Existing colors never change.
    pub fn seat_players(&mut self, record: &RoomRecord) {
        self.players
            .entry(record.player1.clone())
            .or_insert_with(|| RoomPlayer::new(Color::Black));
        if let Some(player2) = &record.player2 {
            if !self.players.contains_key(player2) {
                self.players
                    .insert(player2.clone(), RoomPlayer::new(Color::White));
            }
        }

        if self.status == RoomStatus::AwaitingPlayers && self.players.len() == 2 {
            info!("Room {} has both players", self.id);
            self.status = RoomStatus::InProgress;
        }
    }

    #[cfg(test)]
    pub fn game(&self) -> &Game {
        &self.game
    }

    #[cfg(test)]
    pub fn player(&self, player_id: &str) -> Option<&RoomPlayer> {
        self.players.get(player_id)
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn is_connected(&self, player_id: &str) -> bool {
        self.connections.values().any(|c| c.player_id == player_id)
    }

    /// Register a connection for a seated player
    pub fn connect(
        &mut self,
        connection_id: ConnectionId,
        player_id: &str,
        sender: Outbox,
    ) -> Result<Color, RoomError> {
        let color = self
            .players
            .get(player_id)
            .ok_or(RoomError::PlayerNotInRoom)?
            .color;

        self.connections.insert(
            connection_id,
            Connection {
                player_id: player_id.to_string(),
                sender,
            },
        );
        Ok(color)
    }

    /// Drop a connection. The seat, color and counters stay.
    ///
    /// Returns a `Departure` when this was the player's last connection.
    pub fn disconnect(&mut self, connection_id: ConnectionId) -> Option<Departure> {
        let connection = self.connections.remove(&connection_id)?;
        if self.is_connected(&connection.player_id) {
            return None;
        }

        let player = self.players.get_mut(&connection.player_id)?;
        player.disconnect_epoch += 1;
        Some(Departure {
            player_id: connection.player_id,
            epoch: player.disconnect_epoch,
        })
    }

    /// End the game in the opponent's favour if the player is still away.
    pub fn forfeit(&mut self, departure: &Departure) -> ForfeitCheck {
        if self.is_connected(&departure.player_id) {
            return ForfeitCheck::Stale;
        }
        let Some(player) = self.players.get(&departure.player_id) else {
            return ForfeitCheck::Stale;
        };
        if player.disconnect_epoch != departure.epoch {
            return ForfeitCheck::Stale;
        }

        match self.status {
            RoomStatus::AwaitingPlayers => ForfeitCheck::Deferred,
            RoomStatus::Concluded => ForfeitCheck::Stale,
            RoomStatus::InProgress => {
                let winner = Winner::from(player.color.opponent());
                info!(
                    "Player {} forfeits room {} after disconnecting",
                    departure.player_id, self.id
                );
                self.conclude(winner);
                ForfeitCheck::Applied
            }
        }
    }

    /// Handle one decoded message from `connection_id`
    pub fn handle(
        &mut self,
        connection_id: ConnectionId,
        msg: ClientMessage,
    ) -> Result<Outcome, RoomError> {
        let player_id = self
            .connections
            .get(&connection_id)
            .ok_or(RoomError::UnknownConnection)?
            .player_id
            .clone();

        match msg {
            ClientMessage::Join => {
                let color = self.color_of(&player_id)?;
                let is_your_turn = self.game.turn() == color;
                self.send_to(
                    connection_id,
                    ServerMessage::GameStart {
                        player_id,
                        your_color: color,
                        board: self.view_for(color),
                        current_turn: self.game.turn_index(),
                        is_your_turn,
                    },
                );
                Ok(Outcome::Continue)
            }

            ClientMessage::GetValidMoves => {
                let color = self.color_of(&player_id)?;
                self.send_to(
                    connection_id,
                    ServerMessage::ValidMoves {
                        moves_map: self.game.valid_moves_map(color),
                    },
                );
                Ok(Outcome::Continue)
            }

            ClientMessage::GetStatus => {
                let quota = self
                    .players
                    .get(&player_id)
                    .ok_or(RoomError::PlayerNotInRoom)?
                    .quota;
                self.send_to(
                    connection_id,
                    ServerMessage::StatusInfo {
                        remaining_plus: MAX_OPERATOR_USES - quota.plus,
                        remaining_mul: MAX_OPERATOR_USES - quota.mul,
                        remaining_pass: MAX_PASSES - quota.passes,
                    },
                );
                Ok(Outcome::Continue)
            }

            ClientMessage::Move { x, y } => self.apply(&player_id, Move::PlaceDisc { x, y }),

            ClientMessage::Operation {
                row,
                value,
                operator,
            } => {
                let operator = operator.parse::<Operator>()?;
                self.apply(
                    &player_id,
                    Move::BitOperation {
                        row,
                        value,
                        operator,
                    },
                )
            }

            ClientMessage::Pass => self.apply(&player_id, Move::Pass),
            ClientMessage::Surrender => self.apply(&player_id, Move::Surrender),
            ClientMessage::ExitRoom => self.apply(&player_id, Move::ExitRoom),
        }
    }

    /// Validate and apply one move for `player_id`
    pub fn apply(&mut self, player_id: &str, mv: Move) -> Result<Outcome, RoomError> {
        if self.status == RoomStatus::Concluded && mv.is_gameplay() {
            return Err(RoomError::GameConcluded);
        }
        let color = self.color_of(player_id)?;

        match mv {
            Move::PlaceDisc { x, y } => {
                // Counted even if the placement is rejected
                self.game.increment_turn_count();
                self.game.place_disc(color, x, y)?;
                self.last_pass_player = None;
                self.broadcast_state();
            }

            Move::BitOperation {
                row,
                value,
                operator,
            } => {
                self.game.increment_turn_count();
                self.ensure_turn(color)?;
                let index = usize::try_from(row)
                    .ok()
                    .filter(|&r| r < BOARD_SIZE)
                    .ok_or(RoomError::RowOutOfBounds)?;

                let quota = &mut self.seat_mut(player_id)?.quota;
                if quota.operator_uses(operator) >= MAX_OPERATOR_USES {
                    return Err(RoomError::OperatorQuotaExceeded(operator));
                }
                *quota.operator_uses_mut(operator) += 1;

                let current = self.game.board().row(index).ok_or(RoomError::RowOutOfBounds)?;
                let updated = bitop::apply(current, value, operator);
                self.game.set_row(index, updated)?;
                self.game.pass_turn();
                self.last_pass_player = None;
                debug!(
                    "Room {}: {} applied {}{} to row {}",
                    self.id, player_id, operator, value, index
                );
                self.broadcast_state();
            }

            Move::Pass => {
                self.ensure_turn(color)?;
                let quota = &mut self.seat_mut(player_id)?.quota;
                if quota.passes >= MAX_PASSES {
                    return Err(RoomError::PassQuotaExceeded);
                }
                quota.passes += 1;

                let chained = self
                    .last_pass_player
                    .as_deref()
                    .is_some_and(|last| last != player_id);
                if chained {
                    info!("Room {}: both players passed in a row", self.id);
                    let winner = self.game.winner();
                    self.conclude(winner);
                } else {
                    self.game.increment_turn_count();
                    self.game.pass_turn();
                    self.last_pass_player = Some(player_id.to_string());
                    self.broadcast_state();
                }
            }

            Move::Surrender => {
                info!("Room {}: {} surrendered", self.id, player_id);
                self.conclude(Winner::from(color.opponent()));
            }

            Move::ExitRoom => {
                return Ok(Outcome::Exit {
                    player_id: player_id.to_string(),
                });
            }
        }

        Ok(Outcome::Continue)
    }

    /// Send a message to one connection
    pub fn send_to(&self, connection_id: ConnectionId, msg: ServerMessage) {
        if let Some(connection) = self.connections.get(&connection_id) {
            let _ = connection.sender.send(msg);
        }
    }

    /// Send the same message to every connection
    pub fn broadcast(&self, msg: ServerMessage) {
        for connection in self.connections.values() {
            let _ = connection.sender.send(msg.clone());
        }
    }

    /// Send each connection its own board view, then end the game if nobody
    /// can move
    fn broadcast_state(&mut self) {
        let current_turn = self.game.turn_index();
        for connection in self.connections.values() {
            let Some(player) = self.players.get(&connection.player_id) else {
                continue;
            };
            let _ = connection.sender.send(ServerMessage::BoardUpdate {
                board: self.view_for(player.color),
                current_turn,
                is_your_turn: self.game.turn() == player.color,
            });
        }

        if self.game.is_game_over() {
            let winner = self.game.winner();
            self.conclude(winner);
        }
    }

    fn conclude(&mut self, winner: Winner) {
        self.status = RoomStatus::Concluded;
        info!("Room {} finished, winner {:?}", self.id, winner);
        self.broadcast(ServerMessage::GameOver { winner });
    }

    /// Board with the move overlay for the side to move, plain otherwise
    fn view_for(&self, color: Color) -> BoardView {
        if self.game.turn() == color {
            self.game.board_with_valid_moves(color)
        } else {
            self.game.board().to_view()
        }
    }

    fn ensure_turn(&self, color: Color) -> Result<(), RoomError> {
        if self.game.turn() == color {
            Ok(())
        } else {
            Err(GameError::WrongTurn.into())
        }
    }

    fn color_of(&self, player_id: &str) -> Result<Color, RoomError> {
        self.players
            .get(player_id)
            .map(|p| p.color)
            .ok_or(RoomError::PlayerNotInRoom)
    }

    fn seat_mut(&mut self, player_id: &str) -> Result<&mut RoomPlayer, RoomError> {
        self.players
            .get_mut(player_id)
            .ok_or(RoomError::PlayerNotInRoom)
    }
}
