//! 脚本 AI 的决策策略。每个等级对应一个策略函数，所有效果直接作用在对局状态上。

use std::cmp::Reverse;

use log::debug;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::game::card::{
    APPLE, ENCHANTED_GOLDEN_APPLE, GOLDEN_APPLE, POTION_OF_HEALING, POTION_OF_POWER, SHIELD,
};
use crate::game::{Card, DamageType, GameEvent, GameState, Player, PlayerId, RuleEngine, RuleError};

use super::level::AiLevel;

pub type Strategy =
    fn(&mut RuleEngine, &mut GameState, PlayerId) -> Result<Vec<GameEvent>, RuleError>;

type Step =
    fn(&mut RuleEngine, &mut GameState, PlayerId) -> Result<Option<Vec<GameEvent>>, RuleError>;

const STRATEGIES: [(AiLevel, Strategy); 3] = [
    (AiLevel::Random, random_action),
    (AiLevel::Tactical, tactical_action),
    (AiLevel::Strategic, strategic_action),
];

const STRATEGIC_STEPS: [Step; 6] = [
    emergency_healing,
    equip_defense,
    use_power_potion,
    top_off_health,
    attack_with_kill_priority,
    random_card,
];

const HEALING_CARDS: [&str; 4] = [POTION_OF_HEALING, APPLE, GOLDEN_APPLE, ENCHANTED_GOLDEN_APPLE];
/// 紧急治疗的优先顺序。
const EMERGENCY_HEALING: [&str; 4] = [ENCHANTED_GOLDEN_APPLE, GOLDEN_APPLE, POTION_OF_HEALING, APPLE];
const TACTICAL_HEAL_BELOW: i32 = 4;
const EMERGENCY_HEALTH: i32 = 3;
const ATTACK_CHANCE: f64 = 0.5;
const FALLBACK_DRAW: usize = 2;

pub fn strategy_for(level: AiLevel) -> Option<Strategy> {
    STRATEGIES
        .iter()
        .find(|(registered, _)| *registered == level)
        .map(|(_, strategy)| *strategy)
}

/// AI 决策入口。没有可做的事时抽两张牌。
pub fn ai_action(
    engine: &mut RuleEngine,
    state: &mut GameState,
    player_id: PlayerId,
) -> Result<Vec<GameEvent>, RuleError> {
    let level = state.player(player_id)?.ai_level;
    let strategy = strategy_for(level).ok_or(RuleError::UnsupportedAiLevel {
        level: level.into(),
    })?;
    strategy(engine, state, player_id)
}

fn draw_instead(
    engine: &mut RuleEngine,
    state: &mut GameState,
    player_id: PlayerId,
) -> Result<Vec<GameEvent>, RuleError> {
    debug!("{} has nothing to do, drawing cards", state.player_name(player_id));
    engine.draw_cards(state, player_id, FALLBACK_DRAW)
}

fn play(
    engine: &mut RuleEngine,
    state: &mut GameState,
    player_id: PlayerId,
    card: &Card,
    target: Option<PlayerId>,
) -> Result<Vec<GameEvent>, RuleError> {
    let mut events = engine.use_card(state, player_id, card, false)?;
    if let Some(target) = target {
        events.extend(engine.attack_player(state, player_id, target, false)?);
    }
    Ok(events)
}

/// 使用一张卡牌；需要目标但没有存活对手时放弃。
fn play_at_random_target(
    engine: &mut RuleEngine,
    state: &mut GameState,
    player_id: PlayerId,
    card: &Card,
) -> Result<Option<Vec<GameEvent>>, RuleError> {
    if !card.need_target() {
        return play(engine, state, player_id, card, None).map(Some);
    }
    let opponents = state.living_opponents(player_id);
    let Some(target) = opponents.choose(engine.rng()).copied() else {
        debug!("{} canceled {card} (no target)", state.player_name(player_id));
        return Ok(None);
    };
    play(engine, state, player_id, card, Some(target)).map(Some)
}

fn pick(engine: &mut RuleEngine, cards: &[Card]) -> Option<Card> {
    cards.choose(engine.rng()).cloned()
}

fn expected_damage(player: &Player, card: &Card) -> i32 {
    if card.is_command() && card.need_target() {
        return i32::MAX;
    }
    let usage = card.usage();
    match usage.damage_type {
        DamageType::Physical => usage.amount + player.power,
        _ => usage.amount,
    }
}

/// 攻击卡按预期伤害从高到低排列。
fn attack_cards(player: &Player) -> Vec<Card> {
    let mut cards = player.cards_matching(Card::need_target);
    cards.sort_by_key(|card| Reverse(expected_damage(player, card)));
    cards
}

fn weakest_opponent(state: &GameState, player_id: PlayerId) -> Option<PlayerId> {
    state
        .living_opponents(player_id)
        .into_iter()
        .filter_map(|id| state.get_player(id))
        .min_by_key(|player| player.health.current)
        .map(|player| player.id)
}

fn random_action(
    engine: &mut RuleEngine,
    state: &mut GameState,
    player_id: PlayerId,
) -> Result<Vec<GameEvent>, RuleError> {
    let hand = state.player(player_id)?.hand.clone();
    let Some(card) = pick(engine, &hand) else {
        return draw_instead(engine, state, player_id);
    };
    match play_at_random_target(engine, state, player_id, &card)? {
        Some(events) => Ok(events),
        None => Ok(vec![GameEvent::ActionCanceled { player_id }]),
    }
}

fn tactical_action(
    engine: &mut RuleEngine,
    state: &mut GameState,
    player_id: PlayerId,
) -> Result<Vec<GameEvent>, RuleError> {
    let player = state.player(player_id)?;

    if player.health.current < TACTICAL_HEAL_BELOW {
        let healing = player.cards_matching(|card| HEALING_CARDS.contains(&card.name()));
        if let Some(card) = pick(engine, &healing) {
            return play(engine, state, player_id, &card, None);
        }
    }

    let attacks = attack_cards(state.player(player_id)?);
    if engine.rng().gen_bool(ATTACK_CHANCE) {
        if let (Some(card), Some(target)) = (attacks.first(), weakest_opponent(state, player_id)) {
            return play(engine, state, player_id, card, Some(target));
        }
    }

    let others = state
        .player(player_id)?
        .cards_matching(|card| !card.need_target());
    match pick(engine, &others) {
        Some(card) => play(engine, state, player_id, &card, None),
        None => draw_instead(engine, state, player_id),
    }
}

fn strategic_action(
    engine: &mut RuleEngine,
    state: &mut GameState,
    player_id: PlayerId,
) -> Result<Vec<GameEvent>, RuleError> {
    for step in STRATEGIC_STEPS {
        if let Some(events) = step(engine, state, player_id)? {
            return Ok(events);
        }
    }
    draw_instead(engine, state, player_id)
}

fn use_first_held(
    engine: &mut RuleEngine,
    state: &mut GameState,
    player_id: PlayerId,
    names: &[&str],
) -> Result<Option<Vec<GameEvent>>, RuleError> {
    let player = state.player(player_id)?;
    let Some(card) = names
        .iter()
        .map(|name| Card::named(name))
        .find(|card| player.has_card(card))
    else {
        return Ok(None);
    };
    play(engine, state, player_id, &card, None).map(Some)
}

fn emergency_healing(
    engine: &mut RuleEngine,
    state: &mut GameState,
    player_id: PlayerId,
) -> Result<Option<Vec<GameEvent>>, RuleError> {
    if state.player(player_id)?.health.current > EMERGENCY_HEALTH {
        return Ok(None);
    }
    use_first_held(engine, state, player_id, &EMERGENCY_HEALING)
}

fn equip_defense(
    engine: &mut RuleEngine,
    state: &mut GameState,
    player_id: PlayerId,
) -> Result<Option<Vec<GameEvent>>, RuleError> {
    if state.player(player_id)?.health.has_defense() {
        return Ok(None);
    }
    use_first_held(engine, state, player_id, &[SHIELD])
}

fn use_power_potion(
    engine: &mut RuleEngine,
    state: &mut GameState,
    player_id: PlayerId,
) -> Result<Option<Vec<GameEvent>>, RuleError> {
    use_first_held(engine, state, player_id, &[POTION_OF_POWER])
}

fn top_off_health(
    engine: &mut RuleEngine,
    state: &mut GameState,
    player_id: PlayerId,
) -> Result<Option<Vec<GameEvent>>, RuleError> {
    let health = &state.player(player_id)?.health;
    if health.current >= health.max {
        return Ok(None);
    }
    use_first_held(engine, state, player_id, &[APPLE])
}

/// 优先找能一击致命的组合（伤害从高到低，目标按花名册顺序），否则用最强的牌打血最少的对手。
fn attack_with_kill_priority(
    engine: &mut RuleEngine,
    state: &mut GameState,
    player_id: PlayerId,
) -> Result<Option<Vec<GameEvent>>, RuleError> {
    let player = state.player(player_id)?;
    let attacks = attack_cards(player);
    let opponents = state.living_opponents(player_id);
    if attacks.is_empty() || opponents.is_empty() {
        return Ok(None);
    }

    let lethal = attacks.iter().find_map(|card| {
        let damage = expected_damage(player, card);
        opponents
            .iter()
            .copied()
            .find(|id| state.get_player(*id).is_some_and(|target| target.health.current <= damage))
            .map(|target| (card.clone(), target))
    });
    let (card, target) = match lethal {
        Some(found) => found,
        None => {
            let Some(target) = weakest_opponent(state, player_id) else {
                return Ok(None);
            };
            (attacks[0].clone(), target)
        }
    };
    play(engine, state, player_id, &card, Some(target)).map(Some)
}

fn random_card(
    engine: &mut RuleEngine,
    state: &mut GameState,
    player_id: PlayerId,
) -> Result<Option<Vec<GameEvent>>, RuleError> {
    let hand = state.player(player_id)?.hand.clone();
    let Some(card) = pick(engine, &hand) else {
        return Ok(None);
    };
    // 没有目标时放弃本回合，不再补牌
    let events = play_at_random_target(engine, state, player_id, &card)?
        .unwrap_or_else(|| vec![GameEvent::ActionCanceled { player_id }]);
    Ok(Some(events))
}
