//! Bot simulator: plays complete games against the in-memory store,
//! useful for eyeballing the engine under RUST_LOG=zar=debug.

use rand::Rng;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use zar::store::{DocumentStore, MemoryStore};
use zar::types::{CardSet, GamePhase, PromptCard, RoomConfig, RoomStatus};
use zar::{EngineConfig, GameEngine};

#[tokio::main]
async fn main() {
    // Load .env file if present (before any env var reads)
    if let Err(e) = dotenvy::dotenv() {
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "zar=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let store = Arc::new(MemoryStore::new());
    let engine = GameEngine::with_config(store.clone(), EngineConfig::from_env());

    // Log the change feed the way a client would observe it
    let mut feed = store.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = feed.recv().await {
            tracing::debug!(path = %event.path, version = event.version, "document changed");
        }
    });

    let bots = [
        (ulid::Ulid::new().to_string(), "Ada"),
        (ulid::Ulid::new().to_string(), "Grace"),
        (ulid::Ulid::new().to_string(), "Edsger"),
    ];

    let config = RoomConfig {
        max_points: 3,
        max_rounds: Some(30),
        selected_sets: vec!["demo".to_string()],
    };

    let code = engine
        .create_room(&bots[0].0, bots[0].1, config)
        .await
        .expect("create room");
    for (id, name) in &bots[1..] {
        engine.join_room(&code, id, name).await.expect("join room");
    }

    let sets = vec![demo_set()];
    engine.start_game(&code, &sets).await.expect("start game");
    tracing::info!(room = %code, "simulation started");

    loop {
        let room = engine.room(&code).await.expect("read room").expect("room");
        if room.status == RoomStatus::Finished {
            break;
        }

        match room.phase {
            GamePhase::Selection => {
                let pick = room.current_prompt_card.as_ref().map(|p| p.pick).unwrap_or(1) as usize;
                for player in engine.players(&code).await.expect("read players") {
                    if player.id == room.zar_player_id || player.has_submitted {
                        continue;
                    }
                    let cards: Vec<String> = player.hand.iter().take(pick).cloned().collect();
                    if let Err(e) = engine.submit_cards(&code, &player.id, &cards).await {
                        tracing::warn!(player = %player.name, error = %e, "submission rejected");
                    }
                }
                engine.advance_to_reveal(&code).await.expect("advance");
            }
            GamePhase::Reveal => {
                engine.advance_to_verdict(&code).await.expect("advance");
            }
            GamePhase::Verdict => {
                let pick = room.current_prompt_card.as_ref().map(|p| p.pick).unwrap_or(1) as usize;
                let submission_ids: Vec<String> = room.submissions.keys().cloned().collect();
                let picks: Vec<String> = {
                    let mut rng = rand::rng();
                    (0..pick)
                        .map(|_| submission_ids[rng.random_range(0..submission_ids.len())].clone())
                        .collect()
                };
                engine.pick_winners(&code, &picks).await.expect("pick winners");

                let room = engine.room(&code).await.expect("read room").expect("room");
                if room.status == RoomStatus::Finished {
                    break;
                }
                engine.next_round(&code).await.expect("next round");
            }
        }
    }

    let mut standings = engine.players(&code).await.expect("read players");
    standings.sort_by(|a, b| b.points.cmp(&a.points));
    for player in &standings {
        tracing::info!(name = %player.name, points = player.points, "final standing");
    }
    tracing::info!(winner = %standings[0].name, "simulation finished");
}

/// A tiny built-in card set so the simulator needs no set files.
fn demo_set() -> CardSet {
    let prompts = [
        ("My secret superpower is _.", 1),
        ("The meetup was cancelled because of _.", 1),
        ("_ and _, the perfect combination.", 2),
        ("Nothing fixes a bad day like _.", 1),
        ("The museum's newest exhibit: _.", 1),
        ("First _ happened, then _ made it worse.", 2),
    ];
    let answers = [
        "a suspiciously calm cat",
        "forty-two rubber ducks",
        "an unskippable tutorial",
        "lukewarm coffee",
        "the printer from accounting",
        "a very confident pigeon",
        "three raccoons in a trench coat",
        "an expired coupon",
        "interpretive dance",
        "a soggy sandwich",
        "the world's smallest violin",
        "an unexpected kazoo solo",
        "a glitter emergency",
        "next Tuesday",
        "an aggressively friendly golden retriever",
        "the last slice of pizza",
        "a haunted spreadsheet",
        "decorative gourds",
        "a malfunctioning disco ball",
        "someone else's homework",
        "an ominous fortune cookie",
        "a traffic cone collection",
        "mismatched socks",
        "a dramatic gasp",
    ];
    CardSet {
        name: "Demo Set".to_string(),
        code_name: "demo".to_string(),
        official: false,
        prompt_cards: prompts
            .iter()
            .map(|(text, pick)| PromptCard {
                text: text.to_string(),
                pick: *pick,
            })
            .collect(),
        answer_cards: answers.iter().map(|a| a.to_string()).collect(),
    }
}
