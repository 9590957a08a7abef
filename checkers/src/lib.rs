//! # Checkers Rules Engine
//!
//! This crate contains the complete board model and move validation logic for
//! English draughts, shared by the game server and any driver programs. It has
//! no networking or async concerns; the server owns a [`Game`] per table and
//! drives it through [`Game::move_piece`].
//!
//! ## Core Components
//!
//! - **Board geometry**: positions, usable (dark) squares, diagonal adjacency
//! - **Pieces**: men and kings with per-player forward directions
//! - **Move validation**: steps, jumps, mandatory capture enforcement
//! - **Turn progression**: multi-jump continuation, including the rule that a
//!   freshly crowned king does not continue its jump chain
//! - **Win detection**: by piece elimination or by leaving the side to move
//!   with no legal move
//! - **Text encoding**: the row-per-`|` board format used on the wire, with a
//!   parser that is its exact inverse
//!
//! ## Coordinate System
//!
//! Squares are addressed as `(x, y)` with `0 <= x, y < 8`. Black pieces start
//! on the low-`y` rows and advance in the `+y` direction; red pieces start on
//! the high-`y` rows and advance in `-y`. Only dark squares, those where
//! `x + y` is odd, ever hold pieces.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Width and height of the board in squares.
pub const BOARD_DIM: i32 = 8;

/// The two sides in seat-assignment order.
///
/// Black is listed first: when both seats of a game are open, black is the
/// seat handed out first, and black always moves first.
pub const PLAYERS: [Player; 2] = [Player::Black, Player::Red];

/// One of the two sides of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Player {
    Black,
    Red,
}

impl Player {
    /// Color name used in protocol messages.
    pub fn color(&self) -> &'static str {
        match self {
            Player::Black => "black",
            Player::Red => "red",
        }
    }

    pub fn opponent(&self) -> Player {
        match self {
            Player::Black => Player::Red,
            Player::Red => Player::Black,
        }
    }

    /// Forward direction along the y axis for this player's men.
    pub fn forward(&self) -> i32 {
        match self {
            Player::Black => 1,
            Player::Red => -1,
        }
    }

    /// The row on which this player's men are crowned.
    pub fn back_rank(&self) -> i32 {
        match self {
            Player::Black => BOARD_DIM - 1,
            Player::Red => 0,
        }
    }
}

/// A board coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pos {
    pub x: i32,
    pub y: i32,
}

impl Pos {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// True for in-bounds dark squares, the only squares that hold pieces.
    pub fn usable(&self) -> bool {
        self.x >= 0
            && self.x < BOARD_DIM
            && self.y >= 0
            && self.y < BOARD_DIM
            && (self.x + self.y) % 2 == 1
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Midpoint square of a jump, i.e. the square whose occupant is captured.
pub fn capture(src: Pos, dst: Pos) -> Pos {
    Pos::new((src.x + dst.x) / 2, (src.y + dst.y) / 2)
}

/// A man or king belonging to one player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Piece {
    pub player: Player,
    pub king: bool,
}

/// Why a requested move was rejected. The display strings are sent to
/// clients verbatim after `ERROR `.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MoveError {
    #[error("no piece at source")]
    NoPieceAtSource,
    #[error("not your piece")]
    NotYourPiece,
    #[error("destination is not a usable square")]
    UnusableDestination,
    #[error("destination is occupied")]
    DestinationOccupied,
    #[error("not an adjacent diagonal")]
    NotDiagonal,
    #[error("wrong direction for piece")]
    WrongDirection,
    #[error("no opponent piece to capture")]
    NothingToCapture,
    #[error("jump is required")]
    JumpRequired,
}

/// Why a textual board failed to parse.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    #[error("expected 8 rows, found {0}")]
    RowCount(usize),
    #[error("row {0} is not 8 squares wide")]
    RowWidth(usize),
    #[error("unexpected character {0:?} at ({1}, {2})")]
    BadSquare(char, i32, i32),
    #[error("piece on unusable square at ({0}, {1})")]
    PieceOffSquare(i32, i32),
}

/// The rules-engine state of one game: piece placement plus whose move is
/// next. Absent keys in `pieces` are empty squares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Game {
    pub pieces: HashMap<Pos, Piece>,
    pub turn: Player,
}

impl Game {
    /// A game at the starting position, black to move.
    pub fn new() -> Self {
        let mut pieces = HashMap::new();
        for y in 0..BOARD_DIM {
            for x in 0..BOARD_DIM {
                let pos = Pos::new(x, y);
                if !pos.usable() {
                    continue;
                }
                if y < 3 {
                    pieces.insert(pos, Piece { player: Player::Black, king: false });
                } else if y >= BOARD_DIM - 3 {
                    pieces.insert(pos, Piece { player: Player::Red, king: false });
                }
            }
        }
        Self { pieces, turn: Player::Black }
    }

    pub fn piece_at(&self, pos: Pos) -> Option<Piece> {
        self.pieces.get(&pos).copied()
    }

    pub fn turn_is(&self, player: Player) -> bool {
        self.turn == player
    }

    /// True iff the piece at `src` may step to `dst`: the destination is a
    /// usable empty square one diagonal away in a direction the piece is
    /// allowed to travel. Ignores whose turn it is and the mandatory-capture
    /// rule; [`Game::move_piece`] layers those on.
    pub fn valid_move(&self, src: Pos, dst: Pos) -> bool {
        match self.piece_at(src) {
            Some(piece) => {
                dst.usable()
                    && self.piece_at(dst).is_none()
                    && (dst.x - src.x).abs() == 1
                    && self.direction_allowed(piece, dst.y - src.y)
            }
            None => false,
        }
    }

    /// True iff the piece at `src` may jump to `dst`: two diagonals away onto
    /// a usable empty square, over an opponent piece, in an allowed
    /// direction.
    pub fn valid_jump(&self, src: Pos, dst: Pos) -> bool {
        let piece = match self.piece_at(src) {
            Some(piece) => piece,
            None => return false,
        };
        if !dst.usable() || self.piece_at(dst).is_some() {
            return false;
        }
        if (dst.x - src.x).abs() != 2 || !self.direction_allowed(piece, (dst.y - src.y) / 2) {
            return false;
        }
        (dst.y - src.y).abs() == 2
            && matches!(self.piece_at(capture(src, dst)),
                        Some(p) if p.player == piece.player.opponent())
    }

    // Men only travel toward their back rank; kings travel both ways.
    fn direction_allowed(&self, piece: Piece, dy: i32) -> bool {
        dy.abs() == 1 && (piece.king || dy == piece.player.forward())
    }

    /// Whether the piece at `pos` has at least one jump available.
    pub fn jump_possible_from(&self, pos: Pos) -> bool {
        self.jump_targets(pos).iter().any(|&dst| self.valid_jump(pos, dst))
    }

    /// Whether the piece at `pos` has at least one non-jump step available.
    pub fn move_possible_from(&self, pos: Pos) -> bool {
        self.step_targets(pos).iter().any(|&dst| self.valid_move(pos, dst))
    }

    /// Whether any piece owned by `player` has a jump available.
    pub fn jump_possible(&self, player: Player) -> bool {
        self.pieces
            .iter()
            .any(|(&pos, piece)| piece.player == player && self.jump_possible_from(pos))
    }

    /// Whether `player` has any legal move at all, step or jump.
    pub fn player_has_move(&self, player: Player) -> bool {
        self.pieces.iter().any(|(&pos, piece)| {
            piece.player == player
                && (self.move_possible_from(pos) || self.jump_possible_from(pos))
        })
    }

    fn step_targets(&self, src: Pos) -> [Pos; 4] {
        [
            Pos::new(src.x - 1, src.y - 1),
            Pos::new(src.x + 1, src.y - 1),
            Pos::new(src.x - 1, src.y + 1),
            Pos::new(src.x + 1, src.y + 1),
        ]
    }

    fn jump_targets(&self, src: Pos) -> [Pos; 4] {
        [
            Pos::new(src.x - 2, src.y - 2),
            Pos::new(src.x + 2, src.y - 2),
            Pos::new(src.x - 2, src.y + 2),
            Pos::new(src.x + 2, src.y + 2),
        ]
    }

    /// Applies one move for the side to move.
    ///
    /// On success returns the captured square, if the move was a jump. The
    /// board and turn are only modified on success. Capture is mandatory:
    /// while the side to move has any jump available, every step is rejected
    /// with [`MoveError::JumpRequired`].
    ///
    /// After a jump the mover keeps the turn iff another jump is available
    /// from the landing square and the piece was not crowned by this move;
    /// otherwise the turn passes to the opponent.
    pub fn move_piece(&mut self, src: Pos, dst: Pos) -> Result<Option<Pos>, MoveError> {
        let piece = self.piece_at(src).ok_or(MoveError::NoPieceAtSource)?;
        if piece.player != self.turn {
            return Err(MoveError::NotYourPiece);
        }
        if !dst.usable() {
            return Err(MoveError::UnusableDestination);
        }
        if self.piece_at(dst).is_some() {
            return Err(MoveError::DestinationOccupied);
        }

        let dx = (dst.x - src.x).abs();
        let dy = dst.y - src.y;
        let captured = if dx == 1 && dy.abs() == 1 {
            if !self.direction_allowed(piece, dy) {
                return Err(MoveError::WrongDirection);
            }
            if self.jump_possible(self.turn) {
                return Err(MoveError::JumpRequired);
            }
            None
        } else if dx == 2 && dy.abs() == 2 {
            if !self.direction_allowed(piece, dy / 2) {
                return Err(MoveError::WrongDirection);
            }
            let mid = capture(src, dst);
            match self.piece_at(mid) {
                Some(p) if p.player == piece.player.opponent() => Some(mid),
                _ => return Err(MoveError::NothingToCapture),
            }
        } else {
            return Err(MoveError::NotDiagonal);
        };

        self.pieces.remove(&src);
        if let Some(mid) = captured {
            self.pieces.remove(&mid);
        }
        let crowned = !piece.king && dst.y == piece.player.back_rank();
        self.pieces.insert(dst, Piece { player: piece.player, king: piece.king || crowned });

        // A freshly crowned king does not continue its jump chain.
        let continues = captured.is_some() && !crowned && self.jump_possible_from(dst);
        if !continues {
            self.turn = self.turn.opponent();
        }

        Ok(captured)
    }

    /// The winner, if the game is over.
    ///
    /// A side wins when its opponent has no pieces left, or when the
    /// opponent is the side to move and has no legal move. An empty board
    /// has no winner.
    pub fn winner(&self) -> Option<Player> {
        if self.pieces.is_empty() {
            return None;
        }
        let black_alive = self.pieces.values().any(|p| p.player == Player::Black);
        let red_alive = self.pieces.values().any(|p| p.player == Player::Red);
        if !black_alive {
            return Some(Player::Red);
        }
        if !red_alive {
            return Some(Player::Black);
        }
        if !self.player_has_move(self.turn) {
            return Some(self.turn.opponent());
        }
        None
    }
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Game {
    /// Renders the board as 8 rows of 8 squares separated by `|`, row `y=0`
    /// first: `*` for light squares and empty dark squares, `b`/`B` for
    /// black man/king, `r`/`R` for red man/king.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for y in 0..BOARD_DIM {
            if y > 0 {
                write!(f, "|")?;
            }
            for x in 0..BOARD_DIM {
                let square = match self.piece_at(Pos::new(x, y)) {
                    Some(Piece { player: Player::Black, king: false }) => 'b',
                    Some(Piece { player: Player::Black, king: true }) => 'B',
                    Some(Piece { player: Player::Red, king: false }) => 'r',
                    Some(Piece { player: Player::Red, king: true }) => 'R',
                    None => '*',
                };
                write!(f, "{}", square)?;
            }
        }
        Ok(())
    }
}

impl FromStr for Game {
    type Err = ParseError;

    /// Exact inverse of the [`fmt::Display`] encoding. The parsed game has
    /// black to move.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rows: Vec<&str> = s.split('|').collect();
        if rows.len() != BOARD_DIM as usize {
            return Err(ParseError::RowCount(rows.len()));
        }
        let mut pieces = HashMap::new();
        for (y, row) in rows.iter().enumerate() {
            if row.chars().count() != BOARD_DIM as usize {
                return Err(ParseError::RowWidth(y));
            }
            for (x, square) in row.chars().enumerate() {
                let pos = Pos::new(x as i32, y as i32);
                let piece = match square {
                    '*' => continue,
                    'b' => Piece { player: Player::Black, king: false },
                    'B' => Piece { player: Player::Black, king: true },
                    'r' => Piece { player: Player::Red, king: false },
                    'R' => Piece { player: Player::Red, king: true },
                    other => return Err(ParseError::BadSquare(other, pos.x, pos.y)),
                };
                if !pos.usable() {
                    return Err(ParseError::PieceOffSquare(pos.x, pos.y));
                }
                pieces.insert(pos, piece);
            }
        }
        Ok(Self { pieces, turn: Player::Black })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INITIAL_BOARD: &str =
        "*b*b*b*b|b*b*b*b*|*b*b*b*b|********|********|r*r*r*r*|*r*r*r*r|r*r*r*r*";

    fn empty_game() -> Game {
        let mut game = Game::new();
        game.pieces.clear();
        game
    }

    fn man(player: Player) -> Piece {
        Piece { player, king: false }
    }

    fn king(player: Player) -> Piece {
        Piece { player, king: true }
    }

    #[test]
    fn test_new_game_layout() {
        let game = Game::new();
        assert_eq!(game.to_string(), INITIAL_BOARD);
        assert!(game.turn_is(Player::Black));
        assert_eq!(game.winner(), None);

        for y in 0..BOARD_DIM {
            for x in 0..BOARD_DIM {
                let pos = Pos::new(x, y);
                if !pos.usable() {
                    assert_eq!(game.piece_at(pos), None);
                } else if y < 3 {
                    assert_eq!(game.piece_at(pos), Some(man(Player::Black)));
                } else if y >= BOARD_DIM - 3 {
                    assert_eq!(game.piece_at(pos), Some(man(Player::Red)));
                } else {
                    assert_eq!(game.piece_at(pos), None);
                }
            }
        }
    }

    #[test]
    fn test_winner_by_elimination() {
        let mut game = Game::new();
        assert_eq!(game.winner(), None);

        // Removing a single piece does not decide anything
        let some_pos = *game.pieces.keys().next().unwrap();
        game.pieces.remove(&some_pos);
        assert_eq!(game.winner(), None);

        // No red pieces left: black wins
        game.pieces.retain(|_, piece| piece.player == Player::Black);
        assert_eq!(game.winner(), Some(Player::Black));

        // Empty board: nobody wins
        game.pieces.clear();
        assert_eq!(game.winner(), None);

        let mut game = Game::new();
        game.pieces.retain(|_, piece| piece.player == Player::Red);
        assert_eq!(game.winner(), Some(Player::Red));
    }

    #[test]
    fn test_valid_move() {
        let mut game = Game::new();
        assert!(game.valid_move(Pos::new(3, 2), Pos::new(4, 3)));
        // Not a diagonal
        assert!(!game.valid_move(Pos::new(3, 2), Pos::new(3, 3)));
        // Destination occupied
        assert!(!game.valid_move(Pos::new(2, 1), Pos::new(3, 2)));
        // No piece at source
        assert!(!game.valid_move(Pos::new(2, 3), Pos::new(3, 4)));
        // Men cannot move backwards, kings can
        game.pieces.insert(Pos::new(1, 4), man(Player::Black));
        assert!(!game.valid_move(Pos::new(1, 4), Pos::new(2, 3)));
        game.pieces.insert(Pos::new(1, 4), king(Player::Black));
        assert!(game.valid_move(Pos::new(1, 4), Pos::new(2, 3)));
    }

    #[test]
    fn test_valid_jump() {
        let mut game = Game::new();
        let src = Pos::new(3, 2);
        let dst = Pos::new(5, 4);
        let mid = capture(src, dst);
        assert_eq!(mid, Pos::new(4, 3));

        // Nothing on the midpoint yet
        assert!(!game.valid_jump(src, dst));
        game.pieces.insert(mid, man(Player::Red));
        assert!(game.valid_jump(src, dst));

        // Cannot jump own piece
        game.pieces.insert(mid, man(Player::Black));
        assert!(!game.valid_jump(src, dst));

        // Kings can jump backwards
        let jumper = game.pieces.remove(&src).unwrap();
        game.pieces.insert(dst, Piece { king: true, ..jumper });
        game.pieces.insert(mid, man(Player::Red));
        assert!(game.valid_jump(dst, src));
        game.pieces.insert(mid, man(Player::Black));
        assert!(!game.valid_jump(dst, src));
    }

    #[test]
    fn test_simple_step() {
        let mut game = Game::new();
        let src = Pos::new(3, 2);
        let dst = Pos::new(4, 3);
        let captured = game.move_piece(src, dst).unwrap();
        assert_eq!(captured, None);
        assert_eq!(game.piece_at(src), None);
        assert_eq!(game.piece_at(dst), Some(man(Player::Black)));
        assert!(game.turn_is(Player::Red));
        assert_eq!(game.winner(), None);
    }

    #[test]
    fn test_jump_removes_captured_piece() {
        let mut game = Game::new();
        let src = Pos::new(3, 2);
        let dst = Pos::new(5, 4);
        let mid = capture(src, dst);
        game.pieces.insert(mid, man(Player::Red));

        let captured = game.move_piece(src, dst).unwrap();
        assert_eq!(captured, Some(mid));
        assert_eq!(game.piece_at(src), None);
        assert_eq!(game.piece_at(mid), None);
        assert_eq!(game.piece_at(dst), Some(man(Player::Black)));
    }

    #[test]
    fn test_jump_over_own_piece_rejected() {
        let mut game = Game::new();
        let src = Pos::new(3, 2);
        let dst = Pos::new(5, 4);
        let mid = capture(src, dst);
        game.pieces.insert(mid, man(Player::Black));

        let before = game.clone();
        assert_eq!(game.move_piece(src, dst), Err(MoveError::NothingToCapture));
        assert_eq!(game, before);
    }

    #[test]
    fn test_move_out_of_turn_rejected() {
        let mut game = Game::new();
        let before = game.clone();
        assert_eq!(
            game.move_piece(Pos::new(2, 5), Pos::new(3, 4)),
            Err(MoveError::NotYourPiece)
        );
        assert_eq!(game, before);
    }

    #[test]
    fn test_coronation_on_back_rank() {
        let mut game = empty_game();
        game.pieces.insert(Pos::new(4, 6), man(Player::Black));
        game.pieces.insert(Pos::new(0, 5), man(Player::Red));

        game.move_piece(Pos::new(4, 6), Pos::new(3, 7)).unwrap();
        assert_eq!(game.piece_at(Pos::new(3, 7)), Some(king(Player::Black)));

        let mut game = empty_game();
        game.turn = Player::Red;
        game.pieces.insert(Pos::new(2, 1), man(Player::Red));
        game.pieces.insert(Pos::new(7, 2), man(Player::Black));
        game.move_piece(Pos::new(2, 1), Pos::new(1, 0)).unwrap();
        assert_eq!(game.piece_at(Pos::new(1, 0)), Some(king(Player::Red)));
    }

    #[test]
    fn test_no_coronation_away_from_back_rank() {
        let mut game = Game::new();
        game.move_piece(Pos::new(3, 2), Pos::new(4, 3)).unwrap();
        assert_eq!(game.piece_at(Pos::new(4, 3)), Some(man(Player::Black)));
    }

    #[test]
    fn test_jump_possible_from() {
        let mut game = Game::new();
        let src = Pos::new(3, 2);
        assert!(!game.jump_possible_from(src));
        game.pieces.insert(Pos::new(2, 3), man(Player::Red));
        assert!(game.jump_possible_from(src));
    }

    #[test]
    fn test_jump_possible_from_king() {
        let mut game = Game::new();
        let src = Pos::new(2, 5);
        game.pieces.insert(src, king(Player::Black));
        assert!(!game.jump_possible_from(src));
        game.pieces.insert(Pos::new(3, 4), man(Player::Red));
        assert!(game.jump_possible_from(src));
    }

    #[test]
    fn test_player_has_move() {
        let mut game = empty_game();
        game.pieces.insert(Pos::new(0, 3), man(Player::Black));
        game.pieces.insert(Pos::new(1, 4), man(Player::Red));
        game.pieces.insert(Pos::new(2, 5), man(Player::Red));
        // Black's only step is blocked and the only jump lands on a piece
        assert!(!game.player_has_move(Player::Black));
        assert!(game.player_has_move(Player::Red));
    }

    #[test]
    fn test_move_possible_from() {
        let mut game = empty_game();
        let blocked = Pos::new(0, 3);
        let open = Pos::new(1, 4);
        let open_king = Pos::new(2, 5);
        game.pieces.insert(blocked, man(Player::Black));
        game.pieces.insert(open, man(Player::Red));
        game.pieces.insert(open_king, king(Player::Red));
        game.pieces.insert(Pos::new(3, 4), man(Player::Red));
        assert!(!game.move_possible_from(blocked));
        assert!(game.move_possible_from(open));
        assert!(game.move_possible_from(open_king));
    }

    #[test]
    fn test_turn_passes_after_step() {
        let mut game = Game::new();
        game.move_piece(Pos::new(3, 2), Pos::new(4, 3)).unwrap();
        assert!(game.turn_is(Player::Red));
        game.move_piece(Pos::new(2, 5), Pos::new(3, 4)).unwrap();
        assert!(game.turn_is(Player::Black));
    }

    #[test]
    fn test_turn_passes_after_jump_without_continuation() {
        let mut game = Game::new();
        game.pieces.insert(Pos::new(2, 3), man(Player::Red));
        game.move_piece(Pos::new(3, 2), Pos::new(1, 4)).unwrap();
        assert!(game.turn_is(Player::Red));
        game.move_piece(Pos::new(0, 5), Pos::new(2, 3)).unwrap();
        assert!(game.turn_is(Player::Black));
    }

    #[test]
    fn test_jump_continuation_keeps_turn() {
        let mut game = Game::new();
        game.pieces.insert(Pos::new(2, 3), man(Player::Red));
        game.pieces.remove(&Pos::new(3, 6));

        let captured = game.move_piece(Pos::new(3, 2), Pos::new(1, 4)).unwrap();
        assert_eq!(captured, Some(Pos::new(2, 3)));
        // Another jump from (1, 4) over (2, 5) is open, so black goes again
        assert!(game.turn_is(Player::Black));

        let captured = game.move_piece(Pos::new(1, 4), Pos::new(3, 6)).unwrap();
        assert_eq!(captured, Some(Pos::new(2, 5)));
        assert!(game.turn_is(Player::Red));
    }

    #[test]
    fn test_new_king_does_not_continue_chain() {
        let mut game = empty_game();
        game.pieces.insert(Pos::new(3, 6), man(Player::Red));
        game.pieces.insert(Pos::new(1, 6), man(Player::Red));
        game.pieces.insert(Pos::new(4, 5), man(Player::Black));

        let captured = game.move_piece(Pos::new(4, 5), Pos::new(2, 7)).unwrap();
        assert_eq!(captured, Some(Pos::new(3, 6)));
        assert_eq!(game.piece_at(Pos::new(2, 7)), Some(king(Player::Black)));
        // A jump over (1, 6) toward (0, 5) is geometrically open, but the
        // piece was crowned by this move, so the turn passes anyway.
        assert!(game.turn_is(Player::Red));
    }

    #[test]
    fn test_existing_king_continues_chain() {
        let mut game = empty_game();
        game.pieces.insert(Pos::new(3, 6), man(Player::Red));
        game.pieces.insert(Pos::new(1, 6), man(Player::Red));
        game.pieces.insert(Pos::new(7, 6), man(Player::Red));
        game.pieces.insert(Pos::new(4, 5), king(Player::Black));

        game.move_piece(Pos::new(4, 5), Pos::new(2, 7)).unwrap();
        assert!(game.turn_is(Player::Black));

        let captured = game.move_piece(Pos::new(2, 7), Pos::new(0, 5)).unwrap();
        assert_eq!(captured, Some(Pos::new(1, 6)));
        assert!(game.turn_is(Player::Red));
    }

    #[test]
    fn test_mandatory_capture() {
        let mut game = empty_game();
        let quiet = Pos::new(1, 2);
        let jumper = Pos::new(3, 2);
        game.pieces.insert(quiet, man(Player::Black));
        game.pieces.insert(jumper, man(Player::Black));
        game.pieces.insert(Pos::new(4, 3), man(Player::Red));

        let before = game.clone();
        let result = game.move_piece(quiet, Pos::new(0, 3));
        assert_eq!(result, Err(MoveError::JumpRequired));
        assert_eq!(game, before);
        assert!(game.turn_is(Player::Black));
    }

    #[test]
    fn test_mandatory_capture_from_start() {
        let mut game = Game::new();
        game.pieces.insert(Pos::new(2, 3), man(Player::Red));

        let before = game.clone();
        assert_eq!(
            game.move_piece(Pos::new(1, 2), Pos::new(0, 3)),
            Err(MoveError::JumpRequired)
        );
        assert_eq!(game, before);
        assert!(game.turn_is(Player::Black));
    }

    #[test]
    fn test_stuck_player_loses() {
        let mut game = empty_game();
        game.turn = Player::Red;
        game.pieces.insert(Pos::new(0, 3), man(Player::Black));
        game.pieces.insert(Pos::new(0, 5), man(Player::Red));
        game.pieces.insert(Pos::new(2, 5), man(Player::Red));
        assert_eq!(game.winner(), None);

        // Red blocks black's last square; black is left without a legal move
        game.move_piece(Pos::new(0, 5), Pos::new(1, 4)).unwrap();
        assert!(game.turn_is(Player::Black));
        assert_eq!(game.winner(), Some(Player::Red));
    }

    #[test]
    fn test_illegal_move_errors() {
        let mut game = Game::new();
        assert_eq!(
            game.move_piece(Pos::new(4, 3), Pos::new(5, 4)),
            Err(MoveError::NoPieceAtSource)
        );
        assert_eq!(
            game.move_piece(Pos::new(3, 2), Pos::new(3, 4)),
            Err(MoveError::NotDiagonal)
        );
        assert_eq!(
            game.move_piece(Pos::new(2, 1), Pos::new(3, 2)),
            Err(MoveError::DestinationOccupied)
        );
        assert_eq!(
            game.move_piece(Pos::new(3, 2), Pos::new(4, 4)),
            Err(MoveError::UnusableDestination)
        );

        let mut game = empty_game();
        game.pieces.insert(Pos::new(3, 4), man(Player::Black));
        assert_eq!(
            game.move_piece(Pos::new(3, 4), Pos::new(2, 3)),
            Err(MoveError::WrongDirection)
        );
        assert!(game.move_piece(Pos::new(3, 4), Pos::new(4, 5)).is_ok());
    }

    #[test]
    fn test_pieces_stay_on_dark_squares() {
        let mut game = Game::new();
        game.pieces.insert(Pos::new(2, 3), man(Player::Red));
        game.move_piece(Pos::new(3, 2), Pos::new(1, 4)).unwrap();
        for pos in game.pieces.keys() {
            assert!(pos.usable(), "piece on light square at {}", pos);
        }
    }

    #[test]
    fn test_encode() {
        let mut game = Game::new();
        assert_eq!(game.to_string(), INITIAL_BOARD);

        game.pieces.insert(Pos::new(1, 0), king(Player::Black));
        game.pieces.insert(Pos::new(7, 6), king(Player::Red));
        assert_eq!(
            game.to_string(),
            "*B*b*b*b|b*b*b*b*|*b*b*b*b|********|********|r*r*r*r*|*r*r*r*R|r*r*r*r*"
        );
    }

    #[test]
    fn test_parse_roundtrip() {
        let game = Game::new();
        let parsed: Game = game.to_string().parse().unwrap();
        assert_eq!(parsed, game);

        let mut mid_game = Game::new();
        mid_game.pieces.insert(Pos::new(2, 3), man(Player::Red));
        mid_game.pieces.insert(Pos::new(1, 0), king(Player::Black));
        mid_game.move_piece(Pos::new(3, 2), Pos::new(1, 4)).unwrap();
        let reparsed: Game = mid_game.to_string().parse().unwrap();
        assert_eq!(reparsed.to_string(), mid_game.to_string());
        assert_eq!(reparsed.pieces, mid_game.pieces);
    }

    #[test]
    fn test_parse_failures() {
        assert_eq!(
            "********".parse::<Game>(),
            Err(ParseError::RowCount(1))
        );
        assert_eq!(
            "*b*b*b*b|b*b*b*b*|*b*b*b*b|*******|********|r*r*r*r*|*r*r*r*r|r*r*r*r*"
                .parse::<Game>(),
            Err(ParseError::RowWidth(3))
        );
        assert_eq!(
            "*b*b*b*b|b*b*b*b*|*b*b*b*b|****x***|********|r*r*r*r*|*r*r*r*r|r*r*r*r*"
                .parse::<Game>(),
            Err(ParseError::BadSquare('x', 4, 3))
        );
        // Piece on a light square
        assert_eq!(
            "b*******|********|********|********|********|********|********|********"
                .parse::<Game>(),
            Err(ParseError::PieceOffSquare(0, 0))
        );
    }
}
