use std::collections::HashSet;
use std::sync::Arc;

use zar::cards::decode_card;
use zar::store::MemoryStore;
use zar::types::{CardSet, GamePhase, PromptCard, RoomConfig, RoomStatus};
use zar::{EngineConfig, GameEngine, GameError};

fn engine() -> GameEngine {
    GameEngine::new(Arc::new(MemoryStore::new()))
}

/// A deck of one-blank prompts with plenty of distinct answers.
fn pick1_sets() -> Vec<CardSet> {
    let prompt_cards = (0..6)
        .map(|i| PromptCard {
            text: format!("Prompt {} needs _.", i),
            pick: 1,
        })
        .collect();
    let answer_cards = (0..60).map(|i| format!("answer-{:02}", i)).collect();
    vec![CardSet {
        name: "Base".to_string(),
        code_name: "base".to_string(),
        official: true,
        prompt_cards,
        answer_cards,
    }]
}

/// A deck where every prompt has two blanks.
fn pick2_sets() -> Vec<CardSet> {
    let prompt_cards = (0..4)
        .map(|i| PromptCard {
            text: format!("Prompt {}: _ and _.", i),
            pick: 2,
        })
        .collect();
    let answer_cards = (0..60).map(|i| format!("answer-{:02}", i)).collect();
    vec![CardSet {
        name: "Duo".to_string(),
        code_name: "base".to_string(),
        official: true,
        prompt_cards,
        answer_cards,
    }]
}

fn config(max_points: u32, max_rounds: Option<u32>) -> RoomConfig {
    RoomConfig {
        max_points,
        max_rounds,
        selected_sets: vec!["base".to_string()],
    }
}

/// Create a started three-player game and return its room code.
async fn three_player_game(
    engine: &GameEngine,
    room_config: RoomConfig,
    sets: &[CardSet],
) -> String {
    let code = engine
        .create_room("host", "Helena", room_config)
        .await
        .unwrap();
    engine.join_room(&code, "ada", "Ada").await.unwrap();
    engine.join_room(&code, "bob", "Bob").await.unwrap();
    engine.start_game(&code, sets).await.unwrap();
    code
}

/// Submit the first `pick` hand cards for every non-Zar player.
async fn submit_all(engine: &GameEngine, code: &str) {
    let room = engine.room(code).await.unwrap().unwrap();
    let pick = room.current_prompt_card.as_ref().unwrap().pick as usize;
    for player in engine.players(code).await.unwrap() {
        if player.id == room.zar_player_id || !player.active || player.has_submitted {
            continue;
        }
        let cards: Vec<String> = player.hand.iter().take(pick).cloned().collect();
        engine.submit_cards(code, &player.id, &cards).await.unwrap();
    }
}

/// Run a full round where the Zar awards every blank to `winner`.
async fn play_round_won_by(engine: &GameEngine, code: &str, winner: &str) {
    submit_all(engine, code).await;
    assert!(engine.advance_to_reveal(code).await.unwrap());
    assert!(engine.advance_to_verdict(code).await.unwrap());

    let room = engine.room(code).await.unwrap().unwrap();
    let pick = room.current_prompt_card.as_ref().unwrap().pick as usize;
    let winning_sid = room.submission_map.get(winner).unwrap().clone();
    let picks = vec![winning_sid; pick];
    engine.pick_winners(code, &picks).await.unwrap();
}

#[tokio::test]
async fn test_example_scenario_full_round() {
    let engine = engine();
    let code = three_player_game(&engine, config(8, None), &pick1_sets()).await;

    let room = engine.room(&code).await.unwrap().unwrap();
    assert_eq!(room.status, RoomStatus::Playing);
    assert_eq!(room.phase, GamePhase::Selection);
    assert_eq!(room.current_round, 1);
    assert_eq!(room.zar_player_id, room.player_order[0]);
    assert!(room.current_prompt_card.is_some());

    // startGame deals a full hand to everyone, Zar included
    let players = engine.players(&code).await.unwrap();
    assert_eq!(players.len(), 3);
    for player in &players {
        assert_eq!(player.hand.len(), 10);
        assert!(!player.has_submitted);
    }

    // No two players were dealt the same card
    let mut seen = HashSet::new();
    for player in &players {
        for card in &player.hand {
            assert!(seen.insert(card.clone()), "card {card} dealt twice");
        }
    }

    // Both non-Zar players submit one card each
    submit_all(&engine, &code).await;
    let room = engine.room(&code).await.unwrap().unwrap();
    assert_eq!(room.submitted_count, 2);
    assert_eq!(room.submissions.len(), 2);
    assert_eq!(room.submission_map.len(), 2);

    // Everyone has submitted, so the auto-advance fires
    assert!(engine.advance_to_reveal(&code).await.unwrap());
    assert!(engine.advance_to_verdict(&code).await.unwrap());

    // The Zar picks the first non-Zar player's submission
    let zar = room.zar_player_id.clone();
    let winner = room
        .player_order
        .iter()
        .find(|id| **id != zar)
        .unwrap()
        .clone();
    let winning_sid = room.submission_map.get(&winner).unwrap().clone();
    engine.pick_winners(&code, &[winning_sid]).await.unwrap();

    let players = engine.players(&code).await.unwrap();
    let winning_player = players.iter().find(|p| p.id == winner).unwrap();
    assert_eq!(winning_player.points, 1);
    let room = engine.room(&code).await.unwrap().unwrap();
    assert_eq!(room.winner_player_ids, vec![winner]);
    assert_eq!(room.status, RoomStatus::Playing);

    // Next round: Zar rotates, hands are replenished, state resets
    engine.next_round(&code).await.unwrap();
    let room = engine.room(&code).await.unwrap().unwrap();
    assert_eq!(room.current_round, 2);
    assert_eq!(room.phase, GamePhase::Selection);
    assert_eq!(room.zar_player_id, room.player_order[1]);
    assert_eq!(room.zar_rotation_index, 1);
    assert!(room.submissions.is_empty());
    assert!(room.submission_map.is_empty());
    assert_eq!(room.submitted_count, 0);
    assert!(room.winner_player_ids.is_empty());

    for player in engine.players(&code).await.unwrap() {
        assert_eq!(player.hand.len(), 10);
        assert!(!player.has_submitted);
    }
}

#[tokio::test]
async fn test_start_game_preconditions() {
    let engine = engine();
    let code = engine
        .create_room("host", "Helena", config(8, None))
        .await
        .unwrap();

    let result = engine.start_game(&code, &pick1_sets()).await;
    assert!(matches!(result, Err(GameError::InsufficientPlayers(2))));

    engine.join_room(&code, "ada", "Ada").await.unwrap();

    // Selected sets that match nothing yield empty decks
    let mut bad_config = config(8, None);
    bad_config.selected_sets = vec!["missing".to_string()];
    engine.update_config(&code, bad_config).await.unwrap();
    let result = engine.start_game(&code, &pick1_sets()).await;
    assert!(matches!(result, Err(GameError::EmptyDeckSelection)));

    engine.update_config(&code, config(8, None)).await.unwrap();
    engine.start_game(&code, &pick1_sets()).await.unwrap();

    // A second start finds the lobby closed
    let result = engine.start_game(&code, &pick1_sets()).await;
    assert!(matches!(result, Err(GameError::GameAlreadyStarted)));
    let result = engine.join_room(&code, "late", "Late").await;
    assert!(matches!(result, Err(GameError::GameAlreadyStarted)));
}

#[tokio::test]
async fn test_concurrent_submissions_count_each_player_once() {
    // Generous retry budget: five writers hammer the same room document
    let engine = GameEngine::with_config(
        Arc::new(MemoryStore::new()),
        EngineConfig {
            tx_attempts: 50,
            ..EngineConfig::default()
        },
    );
    let code = engine
        .create_room("host", "Helena", config(8, None))
        .await
        .unwrap();
    for id in ["p1", "p2", "p3", "p4"] {
        engine.join_room(&code, id, id).await.unwrap();
    }
    engine.start_game(&code, &pick1_sets()).await.unwrap();

    let room = engine.room(&code).await.unwrap().unwrap();
    let zar = room.zar_player_id.clone();
    let players = engine.players(&code).await.unwrap();

    // Every non-Zar player submits from its own task, plus one player
    // racing a duplicate submission of their own
    let mut handles = Vec::new();
    let mut duplicated = None;
    for player in players.iter().filter(|p| p.id != zar) {
        let card = vec![player.hand[0].clone()];
        let runs = if duplicated.is_none() {
            duplicated = Some(player.id.clone());
            2
        } else {
            1
        };
        for _ in 0..runs {
            let engine = engine.clone();
            let code = code.clone();
            let player_id = player.id.clone();
            let card = card.clone();
            handles.push(tokio::spawn(async move {
                engine.submit_cards(&code, &player_id, &card).await
            }));
        }
    }

    let mut successes = 0;
    let mut duplicate_rejections = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(()) => successes += 1,
            Err(GameError::StaleTransition(_)) => duplicate_rejections += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert_eq!(successes, 4);
    assert_eq!(duplicate_rejections, 1);

    let room = engine.room(&code).await.unwrap().unwrap();
    assert_eq!(room.submitted_count, 4);
    assert_eq!(room.submissions.len(), 4);
    assert_eq!(room.submission_map.len(), 4);

    // The duplicated player lost exactly one card, not two
    let duplicated = duplicated.unwrap();
    let players = engine.players(&code).await.unwrap();
    let player = players.iter().find(|p| p.id == duplicated).unwrap();
    assert_eq!(player.hand.len(), 9);
}

#[tokio::test]
async fn test_late_submission_rejected_after_advance() {
    let engine = engine();
    let code = three_player_game(&engine, config(8, None), &pick1_sets()).await;

    // Nobody has submitted yet: the advance is a silent no-op
    assert!(!engine.advance_to_reveal(&code).await.unwrap());

    submit_all(&engine, &code).await;
    assert!(engine.advance_to_reveal(&code).await.unwrap());
    // Re-triggering after the phase moved is a no-op, not an error
    assert!(!engine.advance_to_reveal(&code).await.unwrap());

    // A submission arriving after the phase moved is rejected
    let room = engine.room(&code).await.unwrap().unwrap();
    let late = room
        .player_order
        .iter()
        .find(|id| **id != room.zar_player_id)
        .unwrap();
    let players = engine.players(&code).await.unwrap();
    let card = vec![players
        .iter()
        .find(|p| p.id == *late)
        .unwrap()
        .hand[0]
        .clone()];
    let result = engine.submit_cards(&code, late, &card).await;
    assert!(matches!(result, Err(GameError::StaleTransition(_))));

    let after = engine.room(&code).await.unwrap().unwrap();
    assert_eq!(after.submitted_count, room.submitted_count);
}

#[tokio::test]
async fn test_submission_leaves_hand_and_hand_stays_disjoint() {
    let engine = engine();
    let code = three_player_game(&engine, config(8, None), &pick1_sets()).await;

    let room = engine.room(&code).await.unwrap().unwrap();
    let player = engine
        .players(&code)
        .await
        .unwrap()
        .into_iter()
        .find(|p| p.id != room.zar_player_id)
        .unwrap();
    let card = player.hand[3].clone();

    engine
        .submit_cards(&code, &player.id, std::slice::from_ref(&card))
        .await
        .unwrap();

    let players = engine.players(&code).await.unwrap();
    let after = players.iter().find(|p| p.id == player.id).unwrap();
    assert_eq!(after.hand.len(), 9);
    assert!(!after.hand.contains(&card));

    let room = engine.room(&code).await.unwrap().unwrap();
    let sid = room.submission_map.get(&player.id).unwrap();
    assert_eq!(room.submissions.get(sid).unwrap(), &vec![card]);
}

#[tokio::test]
async fn test_submit_rejects_cards_not_in_hand() {
    let engine = engine();
    let code = three_player_game(&engine, config(8, None), &pick1_sets()).await;

    let room = engine.room(&code).await.unwrap().unwrap();
    let player = engine
        .players(&code)
        .await
        .unwrap()
        .into_iter()
        .find(|p| p.id != room.zar_player_id)
        .unwrap();

    let result = engine
        .submit_cards(&code, &player.id, &["forged card".to_string()])
        .await;
    assert!(matches!(result, Err(GameError::InvalidPlay(_))));

    // Wrong card count for the prompt is rejected too
    let two: Vec<String> = player.hand.iter().take(2).cloned().collect();
    let result = engine.submit_cards(&code, &player.id, &two).await;
    assert!(matches!(result, Err(GameError::InvalidPlay(_))));

    // And the Zar may not submit at all
    let zar_hand = engine
        .players(&code)
        .await
        .unwrap()
        .into_iter()
        .find(|p| p.id == room.zar_player_id)
        .unwrap()
        .hand;
    let result = engine
        .submit_cards(&code, &room.zar_player_id, &zar_hand[..1])
        .await;
    assert!(matches!(result, Err(GameError::InvalidPlay(_))));
}

#[tokio::test]
async fn test_multi_blank_verdict_awards_point_per_blank() {
    let engine = engine();
    let code = three_player_game(&engine, config(8, None), &pick2_sets()).await;

    submit_all(&engine, &code).await;
    assert!(engine.advance_to_reveal(&code).await.unwrap());
    assert!(engine.advance_to_verdict(&code).await.unwrap());

    let room = engine.room(&code).await.unwrap().unwrap();
    let winner = room
        .player_order
        .iter()
        .find(|id| **id != room.zar_player_id)
        .unwrap()
        .clone();
    let sid = room.submission_map.get(&winner).unwrap().clone();

    // Same submission fills both blanks: one point per occurrence
    engine
        .pick_winners(&code, &[sid.clone(), sid])
        .await
        .unwrap();

    let players = engine.players(&code).await.unwrap();
    let winning_player = players.iter().find(|p| p.id == winner).unwrap();
    assert_eq!(winning_player.points, 2);
    let room = engine.room(&code).await.unwrap().unwrap();
    assert_eq!(room.winner_player_ids, vec![winner.clone(), winner]);

    // A second verdict for the same round is rejected, points stand
    let result = engine
        .pick_winners(&code, &room.winner_player_ids.iter().cloned().collect::<Vec<_>>())
        .await;
    assert!(matches!(result, Err(GameError::StaleTransition(_))));
    let players = engine.players(&code).await.unwrap();
    assert_eq!(players.iter().map(|p| p.points).max().unwrap(), 2);
}

#[tokio::test]
async fn test_zar_rotation_wraps_around_player_order() {
    let engine = engine();
    let code = three_player_game(&engine, config(50, None), &pick1_sets()).await;

    let order = engine.room(&code).await.unwrap().unwrap().player_order;
    for round in 0..4 {
        let room = engine.room(&code).await.unwrap().unwrap();
        assert_eq!(room.zar_player_id, order[round % order.len()]);
        assert!(order.contains(&room.zar_player_id));

        let winner = order
            .iter()
            .find(|id| **id != room.zar_player_id)
            .unwrap()
            .clone();
        play_round_won_by(&engine, &code, &winner).await;
        engine.next_round(&code).await.unwrap();
    }

    // Round 5 wraps back to the head of the order
    let room = engine.room(&code).await.unwrap().unwrap();
    assert_eq!(room.current_round, 5);
    assert_eq!(room.zar_player_id, order[1 % order.len()]);
}

#[tokio::test]
async fn test_game_ends_at_max_points_in_same_transaction() {
    let engine = engine();
    let code = three_player_game(&engine, config(2, None), &pick1_sets()).await;

    let room = engine.room(&code).await.unwrap().unwrap();
    let winner = room
        .player_order
        .iter()
        .find(|id| **id != room.zar_player_id)
        .unwrap()
        .clone();

    play_round_won_by(&engine, &code, &winner).await;
    let room = engine.room(&code).await.unwrap().unwrap();
    assert_eq!(room.status, RoomStatus::Playing); // 1 point, game goes on
    engine.next_round(&code).await.unwrap();

    // The same player must win again; if the rotation made them Zar,
    // skip the round with another winner first
    loop {
        let room = engine.room(&code).await.unwrap().unwrap();
        if room.zar_player_id != winner {
            break;
        }
        let other = room
            .player_order
            .iter()
            .find(|id| **id != winner)
            .unwrap()
            .clone();
        play_round_won_by(&engine, &code, &other).await;
        engine.next_round(&code).await.unwrap();
    }

    play_round_won_by(&engine, &code, &winner).await;
    let room = engine.room(&code).await.unwrap().unwrap();
    assert_eq!(room.status, RoomStatus::Finished);

    // A finished game accepts no further rounds
    let result = engine.next_round(&code).await;
    assert!(matches!(result, Err(GameError::StaleTransition(_))));
}

#[tokio::test]
async fn test_game_ends_when_max_rounds_reached() {
    let engine = engine();
    let code = three_player_game(&engine, config(50, Some(1)), &pick1_sets()).await;

    let room = engine.room(&code).await.unwrap().unwrap();
    let winner = room
        .player_order
        .iter()
        .find(|id| **id != room.zar_player_id)
        .unwrap()
        .clone();
    play_round_won_by(&engine, &code, &winner).await;

    let room = engine.room(&code).await.unwrap().unwrap();
    assert_eq!(room.status, RoomStatus::Finished);
}

#[tokio::test]
async fn test_inactive_player_not_required_to_submit() {
    let engine = engine();
    let code = engine
        .create_room("host", "Helena", config(8, None))
        .await
        .unwrap();
    for id in ["p1", "p2", "p3"] {
        engine.join_room(&code, id, id).await.unwrap();
    }
    engine.start_game(&code, &pick1_sets()).await.unwrap();

    let room = engine.room(&code).await.unwrap().unwrap();
    let leaver = room
        .player_order
        .iter()
        .find(|id| **id != room.zar_player_id)
        .unwrap()
        .clone();
    engine.leave_room(&code, &leaver).await.unwrap();

    // The two remaining non-Zar players submit
    for player in engine.players(&code).await.unwrap() {
        if player.id == room.zar_player_id || player.id == leaver {
            continue;
        }
        let card = vec![player.hand[0].clone()];
        engine.submit_cards(&code, &player.id, &card).await.unwrap();
    }

    // The advance fires without waiting for the inactive player
    assert!(engine.advance_to_reveal(&code).await.unwrap());
}

#[tokio::test]
async fn test_recycled_cards_survive_the_deal_submit_replenish_cycle() {
    // 3 players x 10 cards but only 12 answers: the deck must recycle
    let prompt_cards = (0..3)
        .map(|i| PromptCard {
            text: format!("Prompt {} needs _.", i),
            pick: 1,
        })
        .collect();
    let answer_cards = (0..12).map(|i| format!("card &amp; {}", i)).collect();
    let sets = vec![CardSet {
        name: "Tiny".to_string(),
        code_name: "base".to_string(),
        official: true,
        prompt_cards,
        answer_cards,
    }];

    let engine = engine();
    let code2 = three_player_game(&engine, config(50, None), &sets).await;

    for _ in 0..3 {
        let room = engine.room(&code2).await.unwrap().unwrap();
        let winner = room
            .player_order
            .iter()
            .find(|id| **id != room.zar_player_id)
            .unwrap()
            .clone();
        play_round_won_by(&engine, &code2, &winner).await;
        engine.next_round(&code2).await.unwrap();
    }

    // Hands are full and every card still decodes to valid text
    for player in engine.players(&code2).await.unwrap() {
        assert_eq!(player.hand.len(), 10);
        for card in &player.hand {
            assert!(card.starts_with("card & "), "corrupted card {card:?}");
            assert_eq!(decode_card(card), *card);
        }
    }

    // The answer cursor kept growing monotonically past the deck size
    let deck = engine.deck(&code2).await.unwrap().unwrap();
    assert!(deck.answer_deal_index > deck.answer_cards.len());
}

#[tokio::test]
async fn test_small_hand_size_override() {
    let store = Arc::new(MemoryStore::new());
    let config_small = EngineConfig {
        hand_size: 4,
        ..EngineConfig::default()
    };
    let engine = GameEngine::with_config(store, config_small);

    let code = engine
        .create_room("host", "Helena", config(8, None))
        .await
        .unwrap();
    engine.join_room(&code, "ada", "Ada").await.unwrap();
    engine.start_game(&code, &pick1_sets()).await.unwrap();

    for player in engine.players(&code).await.unwrap() {
        assert_eq!(player.hand.len(), 4);
    }
}
