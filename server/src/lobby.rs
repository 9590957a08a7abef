//! Seated games: the aggregate binding one rules-engine instance to the
//! clients playing and watching it.

use std::collections::HashMap;

use checkers::{Game, Player, PLAYERS};
use rand::Rng;

use crate::session::ClientHandle;

/// Spectator slots per game.
pub const SPECTATOR_CAP: usize = 8;

/// Length of generated game ids.
pub const GAME_ID_LEN: usize = 16;

const ID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Generates a random game id of `len` characters drawn from `[A-Za-z]`.
/// Uniqueness is the caller's problem; the coordinator regenerates on the
/// (astronomically unlikely) collision with a live game.
pub fn generate_game_id(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
        .collect()
}

/// One game table: rules state plus the clients seated at and watching it.
#[derive(Debug)]
pub struct SeatedGame {
    pub id: String,
    pub state: Game,
    pub seats: HashMap<Player, ClientHandle>,
    pub spectators: Vec<ClientHandle>,
}

impl SeatedGame {
    pub fn new(id: String) -> Self {
        Self {
            id,
            state: Game::new(),
            seats: HashMap::new(),
            spectators: Vec::with_capacity(SPECTATOR_CAP),
        }
    }

    pub fn seats_filled(&self) -> bool {
        self.open_seats().is_empty()
    }

    /// Unassigned seats in deterministic order: black before red.
    pub fn open_seats(&self) -> Vec<Player> {
        PLAYERS
            .iter()
            .copied()
            .filter(|player| !self.seats.contains_key(player))
            .collect()
    }

    /// Whether `client` holds the seat whose move is next.
    pub fn turn_is(&self, client: &ClientHandle) -> bool {
        self.seats
            .iter()
            .any(|(player, seated)| seated == client && self.state.turn_is(*player))
    }

    pub fn has_winner(&self) -> bool {
        self.state.winner().is_some()
    }

    pub fn winner_color(&self) -> &'static str {
        self.state.winner().map(|player| player.color()).unwrap_or("none")
    }

    /// Games shown by a plain `LIST`: a seat is open and nobody has won.
    pub fn needs_player(&self) -> bool {
        !self.seats_filled() && !self.has_winner()
    }

    /// Games shown by `LIST SPECTATE`: both seats taken, no winner yet, and
    /// a spectator slot remains.
    pub fn can_spectate(&self) -> bool {
        self.seats_filled() && !self.has_winner() && self.spectators.len() < SPECTATOR_CAP
    }

    pub fn is_spectator(&self, client: &ClientHandle) -> bool {
        self.spectators.iter().any(|spectator| spectator == client)
    }

    /// The turn as reported on the wire: the color to move once both seats
    /// are taken, `"waiting"` before that.
    pub fn turn_label(&self) -> &'static str {
        if self.seats_filled() {
            self.state.turn.color()
        } else {
            "waiting"
        }
    }

    /// Enqueues `message` to every seated player and spectator except the
    /// clients in `excluded`.
    pub async fn broadcast(&self, message: String, excluded: &[&ClientHandle]) {
        for client in self.seats.values().chain(self.spectators.iter()) {
            if excluded.iter().any(|skip| *skip == client) {
                continue;
            }
            client.send(message.clone()).await;
        }
    }
}
