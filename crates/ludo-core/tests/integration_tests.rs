//! Integration tests for the Ludo game engine.
//!
//! These tests verify complete game flows from the first roll through to victory.

use ludo_core::board::LAST_PATH_INDEX;
use ludo_core::sync::seat_key;
use ludo_core::*;
use pretty_assertions::assert_eq;

fn place(game: &mut GameState, player: PlayerId, index: usize, path_index: u8) {
    let board = BoardPath::standard();
    game.players[player as usize].pieces[index].set_placement(board, false, false, path_index);
}

fn roll(game: &mut GameState, value: u8) -> Vec<GameEvent> {
    let player = game.current_player;
    game.apply_action_with(player, GameAction::RollDice, &mut FixedDice::new([value]))
        .unwrap()
}

/// Shared-path index of a cell
fn shared_index(cell: &Coord) -> usize {
    BoardPath::standard()
        .common_path
        .iter()
        .position(|c| c == cell)
        .unwrap()
}

/// Steps past `color`'s entry needed to stand on shared cell `absolute`
fn relative_index(color: Color, absolute: usize) -> u8 {
    ((absolute + 52 - color.start_index() as usize) % 52) as u8
}

/// Every piece's position must follow from its placement fields
fn assert_positions_consistent(game: &GameState) {
    let board = game.board();
    for player in &game.players {
        for piece in &player.pieces {
            if piece.is_home {
                assert_eq!(piece.path_index, 0, "{} home with a path index", piece.id);
            } else {
                assert!(piece.path_index <= LAST_PATH_INDEX, "{} off the path", piece.id);
                assert!(!piece.finished, "{} finished but on the board", piece.id);
            }
            let expected = board.position_of(
                piece.color,
                piece.index as usize,
                piece.is_home,
                piece.path_index,
            );
            assert_eq!(piece.position, expected, "{} position drifted", piece.id);
        }
    }
}

#[test]
fn test_full_game_with_bots() {
    let mut game = GameState::new_all_human();
    let mut dice = RandomDice::seeded(17);
    let bots: Vec<Bot> = (0..4).map(Bot::new).collect();

    let max_actions = 200_000;
    let mut actions = 0;
    let mut turns = 0;

    while !game.is_finished() && actions < max_actions {
        let player = game.current_player;
        let action = bots[player as usize]
            .choose_action(&game)
            .expect("bot on turn must act");
        assert!(game.valid_actions(player).contains(&action));

        let events = game.apply_action_with(player, action, &mut dice).unwrap();
        for event in &events {
            match event {
                GameEvent::DiceRolled { value, .. } => assert!((1..=6).contains(value)),
                GameEvent::TurnEnded {
                    player,
                    next_player,
                } => {
                    assert_eq!(*next_player, (player + 1) % 4);
                    turns += 1;
                }
                _ => {}
            }
        }

        assert_positions_consistent(&game);
        actions += 1;
    }

    let winner = game.get_winner().expect("game should finish");
    assert!(game.players[winner as usize].has_won());
    assert_eq!(game.players[winner as usize].finished_count(), 4);
    assert_eq!(game.turn_number, turns);
    for player in game.players.iter().filter(|p| p.id != winner) {
        assert!(!player.has_won());
    }
}

#[test]
fn test_red_enters_on_six() {
    let mut game = GameState::new_all_human();
    roll(&mut game, 6);
    game.apply_action(0, GameAction::MovePiece(0)).unwrap();

    let piece = &game.players[0].pieces[0];
    assert_eq!(piece.position, game.board().common_path[0]);
    assert!(!piece.is_home);
    assert_eq!(piece.path_index, 0);
}

#[test]
fn test_red_reaches_home_stretch() {
    let mut game = GameState::new_all_human();
    place(&mut game, 0, 0, 50);
    roll(&mut game, 4);
    game.apply_action(0, GameAction::MovePiece(0)).unwrap();

    let piece = &game.players[0].pieces[0];
    assert_eq!(piece.path_index, 54);
    assert_eq!(piece.position, game.board().home_stretch(Color::Red, 2));
}

#[test]
fn test_red_captures_on_blue_entry() {
    let mut game = GameState::new_all_human();
    let blue_entry = game.board().common_path[13];
    assert!(!game.board().is_safe(&blue_entry));

    place(&mut game, 0, 2, 9);
    place(&mut game, 1, 1, 0);
    roll(&mut game, 4);
    game.apply_action(0, GameAction::MovePiece(2)).unwrap();

    let blue = &game.players[1].pieces[1];
    assert!(blue.is_home);
    assert_eq!(blue.position, Color::Blue.base_slot(1));
    assert_eq!(game.players[0].pieces[2].position, blue_entry);
}

#[test]
fn test_safe_zones_never_capture() {
    let board = BoardPath::standard();

    for zone in &board.safe_zones {
        let absolute = shared_index(zone);
        let mut game = GameState::new_all_human();
        game.current_player = 1;

        // blue moves three steps onto the zone
        let landing = relative_index(Color::Blue, absolute);
        assert!(landing >= 3);
        place(&mut game, 1, 0, landing - 3);

        for color in [Color::Red, Color::Green, Color::Yellow] {
            let seat = color.seat();
            for index in 0..2 {
                place(&mut game, seat, index, relative_index(color, absolute));
            }
        }

        roll(&mut game, 3);
        let events = game.apply_action(1, GameAction::MovePiece(0)).unwrap();

        assert!(
            !events
                .iter()
                .any(|e| matches!(e, GameEvent::PieceCaptured { .. })),
            "capture on safe zone {:?}",
            zone
        );
        assert_eq!(game.pieces_at(*zone).len(), 7);
    }
}

#[test]
fn test_every_opponent_on_a_cell_is_captured() {
    let board = BoardPath::standard();
    let target = 30;
    assert!(!board.is_safe(&board.common_path[target]));

    let mut game = GameState::new_all_human();
    game.current_player = 3;
    place(&mut game, 3, 0, relative_index(Color::Yellow, target) - 5);
    place(&mut game, 0, 0, relative_index(Color::Red, target));
    place(&mut game, 0, 3, relative_index(Color::Red, target));
    place(&mut game, 2, 1, relative_index(Color::Green, target));

    roll(&mut game, 5);
    let events = game.apply_action(3, GameAction::MovePiece(0)).unwrap();

    let captured: Vec<&str> = events
        .iter()
        .filter_map(|e| match e {
            GameEvent::PieceCaptured { piece, .. } => Some(piece.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(captured, vec!["red-0", "red-3", "green-1"]);
    assert_eq!(game.pieces_at(board.common_path[target]).len(), 1);
    assert_positions_consistent(&game);
}

#[test]
fn test_rotation_without_moves() {
    let mut game = GameState::new_all_human();
    let mut seen = Vec::new();
    for _ in 0..12 {
        roll(&mut game, 5);
        let player = game.current_player;
        game.apply_action(player, GameAction::EndTurn).unwrap();
        seen.push(game.current_player);
    }
    assert_eq!(seen, vec![1, 2, 3, 0, 1, 2, 3, 0, 1, 2, 3, 0]);
}

#[test]
fn test_lone_home_piece_is_the_ai_choice() {
    let board = BoardPath::standard();
    let mut game = GameState::new_vs_ai();
    game.current_player = 2;
    for index in [0, 1, 3] {
        game.players[2].pieces[index].finish(board);
    }

    roll(&mut game, 6);
    assert_eq!(game.valid_actions(2), vec![GameAction::MovePiece(2)]);
    assert_eq!(
        Bot::new(2).choose_action(&game),
        Some(GameAction::MovePiece(2))
    );
}

#[test]
fn test_never_leaving_base_is_not_a_win() {
    let mut game = GameState::new_all_human();
    for _ in 0..8 {
        roll(&mut game, 2);
        let player = game.current_player;
        game.apply_action(player, GameAction::EndTurn).unwrap();
    }
    assert!(!game.is_finished());
    assert!(game.players.iter().all(|p| !p.has_won()));
}

#[test]
fn test_host_state_replicates_to_guest() {
    let board = BoardPath::standard();
    let mut host = GameState::new_all_human();
    place(&mut host, 0, 0, 20);
    place(&mut host, 3, 2, 53);
    host.players[1].pieces[3].finish(board);
    host.current_player = 2;
    host.dice_value = Some(6);

    let pieces = serde_json::to_string(&host.piece_snapshot()).unwrap();
    let turn = serde_json::to_string(&host.turn_snapshot(true)).unwrap();

    let mut guest = GameState::new_all_human();
    guest.apply_piece_snapshot(&serde_json::from_str(&pieces).unwrap());
    guest.apply_turn_snapshot(&serde_json::from_str(&turn).unwrap());

    assert_eq!(guest.players, host.players);
    assert_eq!(guest.current_player, 2);
    assert_eq!(guest.turn_state, TurnState::AwaitingMove);
    assert_eq!(seat_key(guest.current_player), "player3");
}
