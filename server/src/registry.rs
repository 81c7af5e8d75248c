//! Process-wide room registry and the operations the connection handler
//! invokes on it. A single [`RegistryHandle`] is constructed at startup and
//! cloned into every connection task and room ticker; all mutation happens
//! under its mutex, one handler at a time.

use crate::game;
use crate::room::{ClientSender, Phase, Room};
use log::{debug, info};
use rand::Rng;
use shared::{Coord, ServerMessage, CODE_ALPHABET, ROOM_CODE_LEN, TICK_INTERVAL_MS};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};

/// Why a `join_room` request was refused. The display strings are the exact
/// `error.message` payloads on the wire.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum JoinError {
    #[error("Invalid room code")]
    InvalidCode,
    #[error("Room not found")]
    RoomNotFound,
    #[error("Room is full")]
    RoomFull,
    #[error("Game already started")]
    AlreadyStarted,
}

struct Registry {
    rooms: HashMap<String, Room>,
}

impl Registry {
    fn new() -> Self {
        Self {
            rooms: HashMap::new(),
        }
    }

    /// Draws 4-character codes until one is free. Codes are unique among
    /// live rooms but may be reused after a room closes.
    fn generate_code(&self) -> String {
        let mut rng = rand::thread_rng();
        loop {
            let code: String = (0..ROOM_CODE_LEN)
                .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
                .collect();
            if !self.rooms.contains_key(&code) {
                return code;
            }
        }
    }
}

/// Uppercases and strips non-alphanumerics, then requires exactly
/// `ROOM_CODE_LEN` characters.
fn normalize_code(raw: &str) -> Result<String, JoinError> {
    let code: String = raw
        .to_uppercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect();
    if code.len() == ROOM_CODE_LEN {
        Ok(code)
    } else {
        Err(JoinError::InvalidCode)
    }
}

/// Shared, mutex-guarded handle to the registry. Cheap to clone.
#[derive(Clone)]
pub struct RegistryHandle {
    inner: Arc<Mutex<Registry>>,
}

impl Default for RegistryHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryHandle {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Registry::new())),
        }
    }

    /// Creates a `Waiting` room with the caller as player 0 and replies
    /// `room_created`. Returns the room code for the connection's binding.
    pub async fn create_room(&self, sender: ClientSender) -> String {
        let mut registry = self.inner.lock().await;
        let code = registry.generate_code();
        let room = Room::new(code.clone(), sender.clone());
        registry.rooms.insert(code.clone(), room);
        let _ = sender.send(ServerMessage::RoomCreated {
            code: code.clone(),
            player: 0,
        });
        info!("Room {} created", code);
        code
    }

    /// Seats the caller as player 1 and starts the match. Replies
    /// `room_joined` before the `game_start` broadcast so the joiner sees
    /// them in order.
    pub async fn join_room(
        &self,
        raw_code: &str,
        sender: ClientSender,
    ) -> Result<String, JoinError> {
        let code = normalize_code(raw_code)?;
        let mut registry = self.inner.lock().await;
        let room = registry
            .rooms
            .get_mut(&code)
            .ok_or(JoinError::RoomNotFound)?;
        if room.clients[1].is_some() {
            return Err(JoinError::RoomFull);
        }
        if room.phase != Phase::Waiting {
            return Err(JoinError::AlreadyStarted);
        }

        room.clients[1] = Some(sender.clone());
        let _ = sender.send(ServerMessage::RoomJoined {
            code: code.clone(),
            player: 1,
        });
        info!("Room {} joined, match starting", code);
        self.start_game(room);
        Ok(code)
    }

    /// Records a pending heading for the player's snake. Anything but a
    /// unit vector, or a request for a dead snake, is silently ignored.
    pub async fn set_direction(&self, code: &str, player: usize, dir: Coord) {
        if !dir.is_unit_dir() {
            return;
        }
        let mut registry = self.inner.lock().await;
        if let Some(state) = registry
            .rooms
            .get_mut(code)
            .and_then(|room| room.game_state.as_mut())
        {
            if let Some(snake) = state.snakes.get_mut(player) {
                if snake.alive {
                    snake.next_dir = dir;
                }
            }
        }
    }

    /// Performs a teleport if the player's snake is alive and holds a
    /// charge; otherwise a silent no-op.
    pub async fn teleport(&self, code: &str, player: usize) {
        let mut registry = self.inner.lock().await;
        if let Some(state) = registry
            .rooms
            .get_mut(code)
            .and_then(|room| room.game_state.as_mut())
        {
            if let Some(snake) = state.snakes.get_mut(player) {
                if snake.alive && snake.teleport_charges > 0 {
                    game::apply_teleport(snake);
                }
            }
        }
    }

    /// Registers a rematch vote. The second vote restarts the match; the
    /// first one notifies the other player. Ignored outside `Over`.
    pub async fn rematch(&self, code: &str, player: usize) {
        let mut registry = self.inner.lock().await;
        if let Some(room) = registry.rooms.get_mut(code) {
            if room.phase != Phase::Over {
                return;
            }
            room.rematch_votes += 1;
            if room.rematch_votes >= 2 {
                info!("Room {} rematch accepted", code);
                self.start_game(room);
            } else {
                room.send_to(1 - player, &ServerMessage::RematchRequested);
            }
        }
    }

    /// Tears the room down unconditionally: the remaining socket is told
    /// who left, the ticker is aborted and the entry is removed.
    pub async fn handle_disconnect(&self, code: &str, player: usize) {
        let mut registry = self.inner.lock().await;
        if let Some(mut room) = registry.rooms.remove(code) {
            room.broadcast(&ServerMessage::PlayerDisconnected { player });
            room.stop_ticker();
            info!("Room {} closed (player {} disconnected)", code, player);
        }
    }

    /// (Re)enters `Playing`: stops any previous ticker, builds a fresh
    /// state, broadcasts `game_start` and spawns a new tick task. Nothing
    /// survives a restart except the seats and the room code.
    fn start_game(&self, room: &mut Room) {
        room.stop_ticker();
        let state = game::new_game_state(&mut rand::thread_rng());
        room.phase = Phase::Playing;
        room.rematch_votes = 0;
        room.broadcast(&ServerMessage::GameStart {
            state: state.clone(),
        });
        room.game_state = Some(state);
        room.ticker = Some(self.spawn_ticker(room.code.clone()));
    }

    /// One repeating timer per room. The task exits on game over or when
    /// the room disappears; a panic inside one room's tick dies with this
    /// task and cannot reach other rooms or the accept loop.
    fn spawn_ticker(&self, code: String) -> JoinHandle<()> {
        let handle = self.clone();
        tokio::spawn(async move {
            let mut ticker = interval(Duration::from_millis(TICK_INTERVAL_MS));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // Skip the first tick since it fires immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;
                if !handle.tick_room(&code).await {
                    break;
                }
            }
        })
    }

    /// Advances one room by one tick. Returns false when the ticker should
    /// stop: room gone, phase left `Playing`, or the match just ended.
    async fn tick_room(&self, code: &str) -> bool {
        let mut registry = self.inner.lock().await;
        let room = match registry.rooms.get_mut(code) {
            Some(room) => room,
            None => return false,
        };
        if room.phase != Phase::Playing {
            return false;
        }
        let state = match room.game_state.as_mut() {
            Some(state) => state,
            None => return false,
        };

        game::advance_tick(state, &mut rand::thread_rng());

        if let Some((winner, scores)) = game::match_outcome(state) {
            debug!("Room {} over, winner {}", code, winner);
            room.phase = Phase::Over;
            room.rematch_votes = 0;
            room.broadcast(&ServerMessage::GameOver { winner, scores });
            false
        } else {
            let snapshot = state.clone();
            room.broadcast(&ServerMessage::GameTick { state: snapshot });
            true
        }
    }
}
