//! A room is one isolated two-player match: a code, two client slots, the
//! match state and the tick task driving it.

use shared::{GameState, ServerMessage};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Outbound channel for one connected socket. Sends are fire-and-forget;
/// the connection task drains the channel onto the wire.
pub type ClientSender = mpsc::UnboundedSender<ServerMessage>;

/// Match lifecycle. `Waiting` has one player and no simulation, `Playing`
/// has an active ticker, `Over` awaits rematch votes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Waiting,
    Playing,
    Over,
}

pub struct Room {
    pub code: String,
    /// Player slots 0 and 1. Slot 1 is empty until someone joins.
    pub clients: [Option<ClientSender>; 2],
    pub game_state: Option<GameState>,
    pub phase: Phase,
    pub rematch_votes: u8,
    /// Handle of the running tick task, if any.
    pub ticker: Option<JoinHandle<()>>,
}

impl Room {
    pub fn new(code: String, creator: ClientSender) -> Self {
        Self {
            code,
            clients: [Some(creator), None],
            game_state: None,
            phase: Phase::Waiting,
            rematch_votes: 0,
            ticker: None,
        }
    }

    /// Sends to every occupied slot. Send errors mean the connection task
    /// is already gone and are ignored.
    pub fn broadcast(&self, msg: &ServerMessage) {
        for client in self.clients.iter().flatten() {
            let _ = client.send(msg.clone());
        }
    }

    pub fn send_to(&self, player: usize, msg: &ServerMessage) {
        if let Some(client) = self.clients.get(player).and_then(|c| c.as_ref()) {
            let _ = client.send(msg.clone());
        }
    }

    /// Aborts the tick task if one is running. Idempotent.
    pub fn stop_ticker(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }
}
