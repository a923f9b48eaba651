//! AI players for Ludo.
//!
//! Piece choice is a pure function of the acting player's pieces and the dice
//! value. The shipped policy moves the first eligible piece in index order;
//! other policies can be plugged in through [`PiecePolicy`].

use crate::actions::GameAction;
use crate::board::PlayerId;
use crate::game::{GameState, TurnState};
use crate::player::Piece;
use serde::{Deserialize, Serialize};

/// Indices of pieces eligible to move: on the board, or in base on a 6
pub fn movable_pieces(pieces: &[Piece], dice: u8) -> Vec<u8> {
    pieces
        .iter()
        .filter(|p| p.can_move(dice))
        .map(|p| p.index)
        .collect()
}

/// Chooses which piece to move
pub trait PiecePolicy {
    /// Pick a piece index from `pieces`, or `None` when nothing can move
    fn choose_piece(&self, pieces: &[Piece], dice: u8) -> Option<u8>;
}

/// Move the first eligible piece
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirstMovable;

impl PiecePolicy for FirstMovable {
    fn choose_piece(&self, pieces: &[Piece], dice: u8) -> Option<u8> {
        movable_pieces(pieces, dice).first().copied()
    }
}

/// A bot player that can decide on actions
pub struct Bot<P: PiecePolicy = FirstMovable> {
    pub player_id: PlayerId,
    policy: P,
}

impl Bot<FirstMovable> {
    pub fn new(player_id: PlayerId) -> Self {
        Self::with_policy(player_id, FirstMovable)
    }
}

impl<P: PiecePolicy> Bot<P> {
    pub fn with_policy(player_id: PlayerId, policy: P) -> Self {
        Self { player_id, policy }
    }

    /// Choose the next action for this bot's seat, or `None` if it is not its turn
    pub fn choose_action(&self, game: &GameState) -> Option<GameAction> {
        if game.current_player != self.player_id {
            return None;
        }

        match game.turn_state {
            TurnState::AwaitingRoll | TurnState::Rolling => Some(GameAction::RollDice),
            TurnState::AwaitingMove => {
                let player = game.get_player(self.player_id)?;
                let dice = game.dice_value?;
                self.policy
                    .choose_piece(&player.pieces, dice)
                    .map(GameAction::MovePiece)
            }
            TurnState::TurnComplete => Some(GameAction::EndTurn),
            TurnState::Finished { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{BoardPath, Color};
    use crate::dice::FixedDice;
    use crate::player::Player;

    #[test]
    fn test_six_with_all_home_picks_first_piece() {
        let player = Player::new(0, "Bot".into(), true);
        assert_eq!(FirstMovable.choose_piece(&player.pieces, 6), Some(0));
        assert_eq!(FirstMovable.choose_piece(&player.pieces, 5), None);
    }

    #[test]
    fn test_lone_home_piece_on_six() {
        let board = BoardPath::standard();
        let mut player = Player::new(2, "Bot".into(), true);
        for piece in player.pieces.iter_mut().take(3) {
            piece.finish(board);
        }
        assert_eq!(movable_pieces(&player.pieces, 6), vec![3]);
        assert_eq!(FirstMovable.choose_piece(&player.pieces, 6), Some(3));
        assert_eq!(FirstMovable.choose_piece(&player.pieces, 2), None);
    }

    #[test]
    fn test_prefers_lowest_index_on_board() {
        let board = BoardPath::standard();
        let mut player = Player::new(1, "Bot".into(), true);
        player.pieces[2].set_placement(board, false, false, 10);
        player.pieces[3].set_placement(board, false, false, 4);
        assert_eq!(FirstMovable.choose_piece(&player.pieces, 3), Some(2));
        assert_eq!(FirstMovable.choose_piece(&player.pieces, 6), Some(0));
        assert_eq!(player.color, Color::Blue);
    }

    #[test]
    fn test_bot_plays_a_full_turn() {
        let mut game = GameState::new_vs_ai();
        game.current_player = 1;
        let bot = Bot::new(1);
        let mut dice = FixedDice::new([6]);

        assert_eq!(bot.choose_action(&game), Some(GameAction::RollDice));
        game.apply_action_with(1, GameAction::RollDice, &mut dice).unwrap();

        assert_eq!(bot.choose_action(&game), Some(GameAction::MovePiece(0)));
        game.apply_action_with(1, GameAction::MovePiece(0), &mut dice).unwrap();

        assert_eq!(bot.choose_action(&game), Some(GameAction::EndTurn));
        game.apply_action_with(1, GameAction::EndTurn, &mut dice).unwrap();

        assert_eq!(bot.choose_action(&game), None);
        assert_eq!(game.current_player, 2);
    }

    struct LastMovable;

    impl PiecePolicy for LastMovable {
        fn choose_piece(&self, pieces: &[Piece], dice: u8) -> Option<u8> {
            movable_pieces(pieces, dice).last().copied()
        }
    }

    #[test]
    fn test_custom_policy() {
        let mut game = GameState::new_all_human();
        game.apply_action_with(0, GameAction::RollDice, &mut FixedDice::new([6]))
            .unwrap();
        let bot = Bot::with_policy(0, LastMovable);
        assert_eq!(bot.choose_action(&game), Some(GameAction::MovePiece(3)));
    }
}
