//! The single-writer session coordinator.
//!
//! One task consumes every [`SessionEvent`] the reader tasks produce and runs
//! the matching command handler to completion before touching the next event.
//! The global game/player/spectator tables live here and are mutated nowhere
//! else, which is what makes broadcast ordering and cross-game queries safe
//! without locks. Each command is answered with exactly one `OK` or
//! `ERROR <reason>`; pushed `STATUS` lines go out before the acknowledgement.

use std::collections::HashMap;

use checkers::Pos;
use log::{debug, info, warn};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::lobby::{generate_game_id, SeatedGame, GAME_ID_LEN};
use crate::session::ClientHandle;

/// Capacity of the coordinator's inbound event channel. Bounds process-wide
/// memory under command floods; senders block once it fills.
pub const INBOUND_QUEUE_SIZE: usize = 4096;

/// Everything a session can tell the coordinator.
#[derive(Debug)]
pub enum SessionEvent {
    /// One tokenized input line from a connected client.
    Command {
        client: ClientHandle,
        cmd: String,
        args: Vec<String>,
    },
    /// The session's read loop ended; drop the client from all tables.
    Disconnected { client_id: u32 },
}

/// Command failures reported to the submitting client. Display strings are
/// the wire-visible reasons after `ERROR `.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("invalid command")]
    UnknownCommand,
    #[error("unsupported arguments")]
    UnsupportedArguments,
    #[error("expected single game id")]
    ExpectedGameId,
    #[error("invalid positions, expected SRCX SRCY DSTX DSTY")]
    InvalidPositions,
    #[error("already in game")]
    AlreadyInGame,
    #[error("game {0} does not exist")]
    GameNotFound(String),
    #[error("game is full")]
    GameFull,
    #[error("game is not available for spectating")]
    CannotSpectate,
    #[error("not in game")]
    NotInGame,
    #[error("not playing game")]
    NotPlaying,
    #[error("not your turn")]
    NotYourTurn,
    /// The global tables and a game disagree about this client. That is a
    /// server bug; the offending session is closed after the error ack.
    #[error("internal server error")]
    Internal,
    #[error(transparent)]
    Move(#[from] checkers::MoveError),
}

/// Owner of the global tables. `players` and `spectators` map a client id to
/// the id of the game it participates in; a client appears in at most one of
/// the two.
pub struct Coordinator {
    games: HashMap<String, SeatedGame>,
    players: HashMap<u32, String>,
    spectators: HashMap<u32, String>,
}

impl Coordinator {
    pub fn new() -> Self {
        Self {
            games: HashMap::new(),
            players: HashMap::new(),
            spectators: HashMap::new(),
        }
    }

    /// Consumes events until every session and the listener are gone.
    pub async fn run(mut self, mut events: mpsc::Receiver<SessionEvent>) {
        while let Some(event) = events.recv().await {
            match event {
                SessionEvent::Command { client, cmd, args } => {
                    match self.dispatch(&client, &cmd, &args).await {
                        Ok(()) => client.send("OK").await,
                        Err(CommandError::Internal) => {
                            // An invariant violation is a bug in this server,
                            // not in the client; terminate the session, never
                            // the process.
                            client.send(format!("ERROR {}", CommandError::Internal)).await;
                            client.close();
                        }
                        Err(e) => {
                            debug!("client {} {} failed: {}", client.id(), cmd, e);
                            client.send(format!("ERROR {}", e)).await;
                        }
                    }
                }
                SessionEvent::Disconnected { client_id } => {
                    // Implicit leave so no dangling table entries survive a
                    // dropped connection; dropping the handles also lets the
                    // session's writer task finish.
                    let _ = self.remove_from_game(client_id).await;
                }
            }
        }
    }

    async fn dispatch(
        &mut self,
        client: &ClientHandle,
        cmd: &str,
        args: &[String],
    ) -> Result<(), CommandError> {
        match cmd {
            "NEW" => self.new_game(client, args).await,
            "LIST" => self.list_games(client, args).await,
            "JOIN" => self.join_game(client, args).await,
            "SPECTATE" => self.spectate_game(client, args).await,
            "LEAVE" => self.leave_game(client, args).await,
            "MOVE" => self.move_piece(client, args).await,
            "BOARD" => self.board_status(client, args).await,
            "TURN" => self.turn_status(client, args).await,
            "QUIT" => self.quit(client, args).await,
            _ => Err(CommandError::UnknownCommand),
        }
    }

    /// `NEW`: registers a fresh game and seats the requester in it.
    async fn new_game(&mut self, client: &ClientHandle, args: &[String]) -> Result<(), CommandError> {
        if !args.is_empty() {
            return Err(CommandError::UnsupportedArguments);
        }
        if self.players.contains_key(&client.id()) {
            return Err(CommandError::AlreadyInGame);
        }

        let mut game_id = generate_game_id(GAME_ID_LEN);
        while self.games.contains_key(&game_id) {
            game_id = generate_game_id(GAME_ID_LEN);
        }
        info!("client {} created game {}", client.id(), game_id);
        self.games.insert(game_id.clone(), SeatedGame::new(game_id.clone()));

        self.join_by_id(client, &game_id).await
    }

    /// `LIST [SPECTATE]`: game ids joinable (or spectatable) by this client.
    async fn list_games(&mut self, client: &ClientHandle, args: &[String]) -> Result<(), CommandError> {
        let spectate = args.len() == 1 && args[0] == "SPECTATE";
        if !spectate && !args.is_empty() {
            return Err(CommandError::UnsupportedArguments);
        }

        let playing = self.players.get(&client.id());
        let ids: Vec<&str> = self
            .games
            .values()
            .filter(|game| {
                if spectate {
                    game.can_spectate() && !game.is_spectator(client)
                } else {
                    playing != Some(&game.id) && game.needs_player()
                }
            })
            .map(|game| game.id.as_str())
            .collect();

        let listing = if spectate {
            format!("STATUS LIST SPECTATE {}", ids.join(" "))
        } else {
            format!("STATUS LIST {}", ids.join(" "))
        };
        client.send(listing).await;
        Ok(())
    }

    /// `JOIN <gameId>`: take the first open seat of an existing game.
    async fn join_game(&mut self, client: &ClientHandle, args: &[String]) -> Result<(), CommandError> {
        let [game_id] = args else {
            return Err(CommandError::ExpectedGameId);
        };
        self.join_by_id(client, game_id).await
    }

    async fn join_by_id(&mut self, client: &ClientHandle, game_id: &str) -> Result<(), CommandError> {
        match self.games.get(game_id) {
            None => return Err(CommandError::GameNotFound(game_id.to_owned())),
            Some(game) if game.seats_filled() => return Err(CommandError::GameFull),
            Some(_) => {}
        }

        // Implicit leave before taking the new seat
        match self.remove_from_game(client.id()).await {
            Ok(()) | Err(CommandError::NotInGame) => {}
            Err(e) => return Err(e),
        }

        let Some(game) = self.games.get_mut(game_id) else {
            return Err(CommandError::GameNotFound(game_id.to_owned()));
        };
        let Some(seat) = game.open_seats().first().copied() else {
            return Err(CommandError::GameFull);
        };

        info!(
            "client {} joined game {} as {}",
            client.id(),
            game_id,
            seat.color()
        );
        game.seats.insert(seat, client.clone());
        self.players.insert(client.id(), game_id.to_owned());

        client.send(format!("STATUS GAME_ID {}", game_id)).await;
        client.send(format!("STATUS BOARD {}", game.state)).await;
        client.send(format!("STATUS YOU_ARE {}", seat.color())).await;
        game.broadcast(format!("STATUS JOINED {}", seat.color()), &[client]).await;
        game.broadcast(format!("STATUS TURN {}", game.turn_label()), &[]).await;
        Ok(())
    }

    /// `SPECTATE <gameId>`: watch a full, undecided game.
    async fn spectate_game(&mut self, client: &ClientHandle, args: &[String]) -> Result<(), CommandError> {
        let [game_id] = args else {
            return Err(CommandError::ExpectedGameId);
        };
        match self.games.get(game_id) {
            None => return Err(CommandError::GameNotFound(game_id.to_owned())),
            Some(game) if !game.can_spectate() => return Err(CommandError::CannotSpectate),
            Some(_) => {}
        }

        match self.remove_from_game(client.id()).await {
            Ok(()) | Err(CommandError::NotInGame) => {}
            Err(e) => return Err(e),
        }

        let Some(game) = self.games.get_mut(game_id) else {
            return Err(CommandError::GameNotFound(game_id.to_owned()));
        };
        info!("client {} spectating game {}", client.id(), game_id);
        game.spectators.push(client.clone());
        self.spectators.insert(client.id(), game_id.clone());

        client.send(format!("STATUS GAME_ID {}", game_id)).await;
        client.send(format!("STATUS BOARD {}", game.state)).await;
        client.send(format!("STATUS TURN {}", game.turn_label())).await;
        Ok(())
    }

    /// `LEAVE`: give up the seat or spectator slot.
    async fn leave_game(&mut self, client: &ClientHandle, args: &[String]) -> Result<(), CommandError> {
        if !args.is_empty() {
            return Err(CommandError::UnsupportedArguments);
        }
        self.remove_from_game(client.id()).await
    }

    /// Removes `client_id` from whichever table holds it. A departing player
    /// is announced to the rest of the game; a spectator slips out silently.
    /// Disagreement between the tables and the game is a server bug and
    /// surfaces as [`CommandError::Internal`], which closes the session.
    async fn remove_from_game(&mut self, client_id: u32) -> Result<(), CommandError> {
        if let Some(game_id) = self.players.remove(&client_id) {
            let Some(game) = self.games.get_mut(&game_id) else {
                warn!("player table pointed client {} at missing game {}", client_id, game_id);
                return Err(CommandError::Internal);
            };
            let seat = game
                .seats
                .iter()
                .find(|(_, seated)| seated.id() == client_id)
                .map(|(player, _)| *player);
            let Some(seat) = seat else {
                warn!("client {} not seated in its own game {}", client_id, game_id);
                return Err(CommandError::Internal);
            };
            info!("client {} left game {} ({})", client_id, game_id, seat.color());
            game.seats.remove(&seat);
            game.broadcast(format!("STATUS LEFT {}", seat.color()), &[]).await;
            game.broadcast(format!("STATUS TURN {}", game.turn_label()), &[]).await;
            Ok(())
        } else if let Some(game_id) = self.spectators.remove(&client_id) {
            let Some(game) = self.games.get_mut(&game_id) else {
                warn!("spectator table pointed client {} at missing game {}", client_id, game_id);
                return Err(CommandError::Internal);
            };
            if let Some(i) = game.spectators.iter().position(|c| c.id() == client_id) {
                game.spectators.swap_remove(i);
            }
            info!("client {} stopped spectating game {}", client_id, game_id);
            Ok(())
        } else {
            Err(CommandError::NotInGame)
        }
    }

    /// `MOVE sx sy dx dy`: apply one move and push the resulting status
    /// lines to every participant: `MOVED`, then `CAPTURED` and `KING` when
    /// applicable, `WINNER` once decided, and finally `TURN`.
    async fn move_piece(&mut self, client: &ClientHandle, args: &[String]) -> Result<(), CommandError> {
        let Some(game_id) = self.players.get(&client.id()) else {
            return Err(CommandError::NotPlaying);
        };
        let (src, dst) = parse_positions(args)?;
        let Some(game) = self.games.get_mut(game_id) else {
            warn!("player table pointed client {} at missing game {}", client.id(), game_id);
            return Err(CommandError::Internal);
        };
        if !game.turn_is(client) {
            return Err(CommandError::NotYourTurn);
        }

        let was_king = game.state.piece_at(src).is_some_and(|piece| piece.king);
        let captured = game.state.move_piece(src, dst)?;

        info!("client {} moved {} -> {} in game {}", client.id(), src, dst, game.id);
        game.broadcast(
            format!("STATUS MOVED {} {} {} {}", src.x, src.y, dst.x, dst.y),
            &[],
        )
        .await;
        if let Some(cap) = captured {
            game.broadcast(format!("STATUS CAPTURED {} {}", cap.x, cap.y), &[]).await;
        }
        if !was_king && game.state.piece_at(dst).is_some_and(|piece| piece.king) {
            game.broadcast(format!("STATUS KING {} {}", dst.x, dst.y), &[]).await;
        }
        if game.has_winner() {
            game.broadcast(format!("STATUS WINNER {}", game.winner_color()), &[]).await;
        }
        game.broadcast(format!("STATUS TURN {}", game.turn_label()), &[]).await;
        Ok(())
    }

    /// `BOARD`: current board, to the caller only.
    async fn board_status(&mut self, client: &ClientHandle, args: &[String]) -> Result<(), CommandError> {
        if !args.is_empty() {
            return Err(CommandError::UnsupportedArguments);
        }
        let game = self.playing_game(client)?;
        client.send(format!("STATUS BOARD {}", game.state)).await;
        Ok(())
    }

    /// `TURN`: whose move it is, to the caller only.
    async fn turn_status(&mut self, client: &ClientHandle, args: &[String]) -> Result<(), CommandError> {
        if !args.is_empty() {
            return Err(CommandError::UnsupportedArguments);
        }
        let game = self.playing_game(client)?;
        client.send(format!("STATUS TURN {}", game.turn_label())).await;
        Ok(())
    }

    /// `QUIT`: implicit leave; the session closes itself afterwards.
    async fn quit(&mut self, client: &ClientHandle, args: &[String]) -> Result<(), CommandError> {
        if !args.is_empty() {
            return Err(CommandError::UnsupportedArguments);
        }
        if self.players.contains_key(&client.id()) || self.spectators.contains_key(&client.id()) {
            return self.remove_from_game(client.id()).await;
        }
        Ok(())
    }

    fn playing_game(&self, client: &ClientHandle) -> Result<&SeatedGame, CommandError> {
        let Some(game_id) = self.players.get(&client.id()) else {
            return Err(CommandError::NotPlaying);
        };
        match self.games.get(game_id) {
            Some(game) => Ok(game),
            None => {
                warn!("player table pointed client {} at missing game {}", client.id(), game_id);
                Err(CommandError::Internal)
            }
        }
    }
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_positions(args: &[String]) -> Result<(Pos, Pos), CommandError> {
    let [sx, sy, dx, dy] = args else {
        return Err(CommandError::InvalidPositions);
    };
    let parse = |value: &String| value.parse::<i32>().map_err(|_| CommandError::InvalidPositions);
    Ok((
        Pos::new(parse(sx)?, parse(sy)?),
        Pos::new(parse(dx)?, parse(dy)?),
    ))
}
