#![cfg(target_arch = "wasm32")]

use bedwars_cards::{GameEngine, GameState};
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

fn engine_with_players() -> GameEngine {
    let mut engine = GameEngine::new(Some(r#"{"allow_command": true}"#.into()), Some(42))
        .expect("settings are valid");
    engine.add_player("Hero", 0).expect("human added");
    engine.add_player("Bot", 3).expect("AI added");
    engine.setup().expect("setup succeeds");
    engine
}

#[wasm_bindgen_test]
fn human_turn_requires_a_command() {
    let mut engine = engine_with_players();

    assert!(engine.needs_human_input());
    assert!(engine.step_json(None).is_err());
}

#[wasm_bindgen_test]
fn rejected_command_leaves_state_untouched() {
    let mut engine = engine_with_players();
    let before = engine.state_json().expect("state serializes");

    let result = engine.step_json(Some(
        r#"{"action": "attack/use", "card": "Not A Card", "target": 1}"#.into(),
    ));

    assert!(result.is_err());
    assert_eq!(engine.state_json().expect("state serializes"), before);
}

#[wasm_bindgen_test]
fn drawing_passes_the_turn_to_the_ai() {
    let mut engine = engine_with_players();

    engine
        .step_json(Some(r#"{"action": "draw 2 cards"}"#.into()))
        .expect("draw is always valid");
    let state: GameState =
        serde_json::from_str(&engine.state_json().expect("state serializes")).expect("valid json");

    assert_eq!(state.players[0].hand.len(), 7);
    assert!(!engine.needs_human_input());
    engine.step_json(None).expect("AI turn runs");
}

#[wasm_bindgen_test]
fn unsupported_ai_level_is_rejected() {
    let mut engine = GameEngine::new(None, None).expect("default settings");
    assert!(engine.add_player("Ghost", 9).is_err());
}
