use serde::{Deserialize, Serialize};

pub const COLS: i32 = 40;
pub const ROWS: i32 = 40;
pub const TICK_INTERVAL_MS: u64 = 120;
pub const APPLE_COUNT: usize = 2;
pub const TELEPORT_DISTANCE: i32 = 5;
pub const ROOM_CODE_LEN: usize = 4;
/// Room code alphabet. Skips 0/O and 1/I to avoid visual confusion.
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
pub const MAX_PLACEMENT_TRIES: u32 = 400;
/// Sentinel reported in `game_over` when both snakes died the same tick.
pub const NO_WINNER: i32 = -1;

/// A cell on the toroidal grid. Also used as a direction vector, where a
/// valid heading is one of the four unit vectors.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Coord {
    pub x: i32,
    pub y: i32,
}

impl Coord {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// True for exactly the four cardinal unit vectors.
    pub fn is_unit_dir(&self) -> bool {
        self.x.abs() + self.y.abs() == 1
    }

    /// True if `self` points exactly opposite to `other`.
    pub fn is_reverse_of(&self, other: &Coord) -> bool {
        self.x == -other.x && self.y == -other.y
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Snake {
    /// Body segments, head first.
    pub body: Vec<Coord>,
    /// Current heading, applied when the tick advances.
    pub dir: Coord,
    /// Pending heading from the latest `direction` message. Rejected at
    /// commit time if it exactly reverses `dir`.
    pub next_dir: Coord,
    pub alive: bool,
    pub score: u32,
    pub teleport_charges: u32,
}

impl Snake {
    pub fn new(body: Vec<Coord>, dir: Coord) -> Self {
        Self {
            body,
            dir,
            next_dir: dir,
            alive: true,
            score: 0,
            teleport_charges: 0,
        }
    }

    pub fn head(&self) -> Coord {
        self.body[0]
    }
}

/// Full match state for one room. Broadcast in its entirety every tick;
/// there is no delta encoding.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub snakes: [Snake; 2],
    pub apples: Vec<Coord>,
    pub teleport_perks: Vec<Coord>,
    pub tick: u64,
}

impl GameState {
    pub fn alive_count(&self) -> usize {
        self.snakes.iter().filter(|s| s.alive).count()
    }
}

/// Messages a client may send. Anything that fails to parse into one of
/// these is dropped without a reply.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    CreateRoom,
    JoinRoom { code: String },
    Direction { dir: Coord },
    Teleport,
    Rematch,
}

/// Messages the server sends. `player` fields are room-local indices (0 or 1).
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    RoomCreated { code: String, player: usize },
    RoomJoined { code: String, player: usize },
    Error { message: String },
    GameStart { state: GameState },
    GameTick { state: GameState },
    GameOver { winner: i32, scores: Vec<u32> },
    PlayerDisconnected { player: usize },
    RematchRequested,
}
