use std::fmt;
use std::time::Duration;

use log::{debug, info, warn};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::ai;

use super::actions::{HumanAction, TurnController};
use super::card::{Card, DamageType, COMMAND_KILL_DAMAGE, DAMAGED_TRIDENT, TRIDENT};
use super::health::Damage;
use super::player::{ActiveCard, ReadyAttack};
use super::state::{
    DelayedAttack, GameEvent, GameOutcome, GamePhase, GameState, PlayerId, VictoryReason,
};

/// 开局时每位玩家的手牌数。
pub const STARTING_HAND: usize = 5;
/// 人类玩家输入无效时允许重试的次数。
pub const MAX_INPUT_ATTEMPTS: usize = 3;
const AI_THINKING_MS: std::ops::Range<u64> = 1000..2500;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum RuleError {
    InvalidArgument {
        reason: String,
    },
    CardNotInHand {
        card: Card,
    },
    NoActiveCard {
        player_id: PlayerId,
    },
    InvalidDamage {
        amount: i32,
    },
    InvalidHealAmount {
        amount: i32,
    },
    UnknownEffect {
        name: String,
    },
    UnknownCard {
        name: String,
    },
    CommandNotAllowed {
        card: String,
    },
    InsufficientPlayers {
        count: usize,
    },
    InvalidHealthConfiguration {
        start_health: i32,
        max_health: i32,
    },
    UnsupportedAiLevel {
        level: u8,
    },
    PlayerNotFound {
        player_id: PlayerId,
    },
    DuplicatePlayerName {
        name: String,
    },
    InvalidTarget,
    GameFinished,
    GameNotRunning,
    GameAlreadyStarted,
}

impl RuleError {
    /// 人类玩家的输入错误可以重新选择，配置类错误则是致命的。
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            RuleError::InvalidArgument { .. }
                | RuleError::CardNotInHand { .. }
                | RuleError::NoActiveCard { .. }
                | RuleError::UnknownCard { .. }
                | RuleError::CommandNotAllowed { .. }
                | RuleError::PlayerNotFound { .. }
                | RuleError::InvalidTarget
        )
    }
}

impl fmt::Display for RuleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleError::InvalidArgument { reason } => write!(f, "invalid argument: {reason}"),
            RuleError::CardNotInHand { card } => write!(f, "card {card} is not in hand"),
            RuleError::NoActiveCard { player_id } => {
                write!(f, "player {player_id} is not using any card")
            }
            RuleError::InvalidDamage { amount } => write!(f, "invalid damage amount {amount}"),
            RuleError::InvalidHealAmount { amount } => write!(f, "invalid heal amount {amount}"),
            RuleError::UnknownEffect { name } => write!(f, "unknown effect '{name}'"),
            RuleError::UnknownCard { name } => write!(f, "unknown card '{name}'"),
            RuleError::CommandNotAllowed { card } => {
                write!(f, "command card {card} is not allowed in this game")
            }
            RuleError::InsufficientPlayers { count } => {
                write!(f, "at least 2 players are required, got {count}")
            }
            RuleError::InvalidHealthConfiguration {
                start_health,
                max_health,
            } => write!(
                f,
                "invalid health configuration: start {start_health}, max {max_health}"
            ),
            RuleError::UnsupportedAiLevel { level } => write!(f, "unsupported AI level {level}"),
            RuleError::PlayerNotFound { player_id } => write!(f, "player {player_id} not found"),
            RuleError::DuplicatePlayerName { name } => {
                write!(f, "player name '{name}' is already taken")
            }
            RuleError::InvalidTarget => f.write_str("invalid target"),
            RuleError::GameFinished => f.write_str("game is already finished"),
            RuleError::GameNotRunning => f.write_str("game has not been set up"),
            RuleError::GameAlreadyStarted => f.write_str("game has already started"),
        }
    }
}

impl std::error::Error for RuleError {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleResolution {
    pub state: GameState,
    pub events: Vec<GameEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<GameOutcome>,
}

impl RuleResolution {
    pub fn new(state: GameState, mut events: Vec<GameEvent>) -> Self {
        let outcome = state.outcome;
        if let Some(outcome) = outcome {
            let has_event = events
                .iter()
                .any(|event| matches!(event, GameEvent::GameOver { .. }));
            if !has_event {
                events.push(GameEvent::GameOver {
                    winner: outcome.winner,
                    reason: outcome.reason,
                });
            }
        }

        Self {
            state,
            events,
            outcome,
        }
    }
}

/// 规则引擎：持有唯一的随机数源，所有抽牌、洗牌和 AI 随机选择都经过它。
#[derive(Debug, Clone)]
pub struct RuleEngine {
    rng: SmallRng,
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleEngine {
    pub fn new() -> Self {
        Self {
            rng: SmallRng::from_entropy(),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    pub fn rng(&mut self) -> &mut SmallRng {
        &mut self.rng
    }

    fn ensure_running(state: &GameState) -> Result<(), RuleError> {
        if state.is_finished() {
            return Err(RuleError::GameFinished);
        }
        if state.phase != GamePhase::Running {
            return Err(RuleError::GameNotRunning);
        }
        Ok(())
    }

    /// 校验人数与配置，给每位玩家发初始手牌并进入运行阶段。
    pub fn setup(&mut self, state: &mut GameState) -> Result<Vec<GameEvent>, RuleError> {
        if state.phase != GamePhase::Setup {
            return Err(RuleError::GameAlreadyStarted);
        }
        state.settings.validate()?;
        if state.players.len() < 2 {
            return Err(RuleError::InsufficientPlayers {
                count: state.players.len(),
            });
        }

        let players: Vec<PlayerId> = state.players.iter().map(|player| player.id).collect();
        let mut events = vec![GameEvent::GameStarted {
            players: players.clone(),
        }];
        for id in players {
            events.extend(self.draw_cards(state, id, STARTING_HAND)?);
        }
        state.phase = GamePhase::Running;
        state.round = 1;
        info!(
            "game started with {} players, {} cards left in pool",
            state.players.len(),
            state.card_pool.remaining()
        );
        state.record_events(&events);
        Ok(events)
    }

    pub fn draw_cards(
        &mut self,
        state: &mut GameState,
        player_id: PlayerId,
        amount: usize,
    ) -> Result<Vec<GameEvent>, RuleError> {
        state.player(player_id)?;
        let draw = state.card_pool.draw(amount, &mut self.rng);

        let mut events = Vec::new();
        if draw.reshuffled > 0 {
            events.push(GameEvent::PoolReshuffled {
                returned: draw.reshuffled,
            });
        }
        if draw.reset {
            events.push(GameEvent::PoolReset);
        }
        events.push(GameEvent::CardsDrawn {
            player_id,
            cards: draw.cards.clone(),
        });
        state.player_mut(player_id)?.add_cards(draw.cards);
        Ok(events)
    }

    /// 把卡牌放上出牌位。已有的出牌先退回手牌（强制使用的除外）。
    fn stage_card(
        state: &mut GameState,
        player_id: PlayerId,
        card: &Card,
        cheat: bool,
    ) -> Result<(), RuleError> {
        if card.is_command() && !state.settings.allow_command {
            return Err(RuleError::CommandNotAllowed {
                card: card.name().to_string(),
            });
        }
        let player = state.player_mut(player_id)?;
        if !cheat && !player.has_card(card) {
            return Err(RuleError::CardNotInHand { card: card.clone() });
        }

        if let Some(previous) = player.active.take() {
            if !previous.forced {
                debug!("{} put back previous card: {}", player.name, previous.card);
                player.hand.push(previous.card);
            }
        }
        if !cheat {
            player.take_from_hand(card);
        }
        debug!("{} selected card: {card}", player.name);
        player.active = Some(ActiveCard {
            card: card.clone(),
            forced: cheat,
        });
        Ok(())
    }

    /// 出牌位上的卡牌使用完毕，非强制使用的进入弃牌堆。
    fn finish_active(state: &mut GameState, player_id: PlayerId) -> Result<(), RuleError> {
        let finished = state.player_mut(player_id)?.active.take();
        if let Some(active) = finished {
            if !active.forced {
                state.card_pool.put_back(active.card);
            }
        }
        Ok(())
    }

    fn active_card(state: &GameState, player_id: PlayerId) -> Result<Card, RuleError> {
        state
            .player(player_id)?
            .active
            .as_ref()
            .map(|active| active.card.clone())
            .ok_or(RuleError::NoActiveCard { player_id })
    }

    /// 使用卡牌。需要目标的卡牌停留在出牌位等待 `attack_player`，其余卡牌立即生效并结算。
    pub fn use_card(
        &mut self,
        state: &mut GameState,
        player_id: PlayerId,
        card: &Card,
        cheat: bool,
    ) -> Result<Vec<GameEvent>, RuleError> {
        Self::stage_card(state, player_id, card, cheat)?;
        let mut events = vec![GameEvent::CardUsed {
            player_id,
            card: card.clone(),
        }];
        if card.need_target() {
            return Ok(events);
        }

        if card.is_self_use() {
            let player = state.player_mut(player_id)?;
            match player.consume(card) {
                Ok(consumed) => events.extend(consumed),
                Err(error) => {
                    if let Some(active) = player.active.take() {
                        if !active.forced {
                            player.hand.push(active.card);
                        }
                    }
                    return Err(error);
                }
            }
        }
        Self::finish_active(state, player_id)?;
        Ok(events)
    }

    /// 用出牌位上的卡牌攻击目标。延迟类卡牌在非 `immediate` 时进入全局延迟账本。
    pub fn attack_player(
        &mut self,
        state: &mut GameState,
        attacker: PlayerId,
        target: PlayerId,
        immediate: bool,
    ) -> Result<Vec<GameEvent>, RuleError> {
        let card = Self::active_card(state, attacker)?;
        if attacker == target {
            return Err(RuleError::InvalidTarget);
        }
        let mut events = Vec::new();
        if !state.player(target)?.is_alive() {
            debug!("{} is already dead, attack skipped", state.player_name(target));
            Self::finish_active(state, attacker)?;
            return Ok(events);
        }

        match card.attack_delay() {
            Some(delay) if !immediate => {
                debug!(
                    "{} launched {card} at {}, arriving in {delay} turns",
                    state.player_name(attacker),
                    state.player_name(target)
                );
                state.delayed_attacks.push(DelayedAttack {
                    attacker,
                    target,
                    card: card.clone(),
                    remaining: delay,
                });
                events.push(GameEvent::AttackDelayed {
                    attacker,
                    target,
                    card,
                    delay,
                });
            }
            _ => {
                debug!(
                    "{} attacking {} with {card}",
                    state.player_name(attacker),
                    state.player_name(target)
                );
                events.push(GameEvent::AttackDeclared {
                    attacker,
                    target,
                    card: card.clone(),
                });
                events.extend(Self::be_attacked(state, target, &card, attacker)?);
            }
        }

        Self::finish_active(state, attacker)?;
        Ok(events)
    }

    /// 目标承受一次攻击：三叉戟会留给目标一把损坏的三叉戟，物理伤害叠加攻击者的临时攻击力。
    fn be_attacked(
        state: &mut GameState,
        target: PlayerId,
        card: &Card,
        attacker: PlayerId,
    ) -> Result<Vec<GameEvent>, RuleError> {
        let power = state.player(attacker)?.power;
        let defender = state.player_mut(target)?;
        let mut events = Vec::new();

        if card.name() == TRIDENT {
            let damaged = Card::named(DAMAGED_TRIDENT);
            defender.add_cards([damaged.clone()]);
            events.push(GameEvent::CardGranted {
                player_id: target,
                card: damaged,
            });
        }

        let usage = card.usage();
        let amount = match usage.damage_type {
            DamageType::Physical => usage.amount + power,
            _ => usage.amount,
        };
        let command_kill =
            usage.damage_type == DamageType::Command && amount == COMMAND_KILL_DAMAGE;
        if amount > 0 || command_kill {
            let damage = Damage::new(amount, usage.damage_type, card.name())?;
            events.extend(defender.receive_damage(&damage)?);
        }
        Ok(events)
    }

    /// 用出牌位上的工具破坏目标的床：没有床防御时床直接被拆。
    pub fn try_destroy_bed(
        &mut self,
        state: &mut GameState,
        actor: PlayerId,
        target: PlayerId,
    ) -> Result<Vec<GameEvent>, RuleError> {
        let tool = Self::active_card(state, actor)?;
        if !tool.destroy_defense_type().is_tool() {
            return Err(RuleError::InvalidArgument {
                reason: format!("{tool} cannot destroy a bed"),
            });
        }
        let events = state.player_mut(target)?.strike_bed(&tool);
        Self::finish_active(state, actor)?;
        Ok(events)
    }

    /// 把出牌位上的方块放到自己床防御栈的顶端。
    pub fn defend_bed(
        &mut self,
        state: &mut GameState,
        player_id: PlayerId,
    ) -> Result<Vec<GameEvent>, RuleError> {
        let block = Self::active_card(state, player_id)?;
        let events = state.player_mut(player_id)?.place_bed_defense(&block)?;
        Self::finish_active(state, player_id)?;
        Ok(events)
    }

    /// 破坏或守护床：方块守护自己的床，工具攻击目标的床。
    pub fn destroy_or_defend_bed(
        &mut self,
        state: &mut GameState,
        player_id: PlayerId,
        card: &Card,
        target: Option<PlayerId>,
    ) -> Result<Vec<GameEvent>, RuleError> {
        let profile = card.destroy_defense_type();
        if profile.is_block() {
            Self::stage_card(state, player_id, card, false)?;
            return self.defend_bed(state, player_id);
        }
        if !profile.is_tool() {
            return Err(RuleError::InvalidArgument {
                reason: format!("{card} cannot destroy or defend a bed"),
            });
        }
        let target = target.ok_or(RuleError::InvalidTarget)?;
        if target == player_id || !state.player(target)?.is_alive() {
            return Err(RuleError::InvalidTarget);
        }
        Self::stage_card(state, player_id, card, false)?;
        self.try_destroy_bed(state, player_id, target)
    }

    /// 结算本玩家已到期的延迟攻击。
    pub fn resolve_ready_attacks(
        &mut self,
        state: &mut GameState,
        player_id: PlayerId,
    ) -> Result<Vec<GameEvent>, RuleError> {
        let ready: Vec<ReadyAttack> = std::mem::take(&mut state.player_mut(player_id)?.ready_attacks);
        let mut events = Vec::new();
        for ReadyAttack { card, target } in ready {
            events.extend(self.use_card(state, player_id, &card, true)?);
            events.extend(self.attack_player(state, player_id, target, true)?);
        }
        Ok(events)
    }

    /// 一整轮结束：所有玩家结算效果，延迟账本前进一步。
    pub fn after_turn(&mut self, state: &mut GameState) -> Result<Vec<GameEvent>, RuleError> {
        debug!("processing after-turn effects for all players");
        let mut events = Vec::new();
        for player in state.players.iter_mut() {
            events.extend(player.after_turn()?);
        }

        let ledger = std::mem::take(&mut state.delayed_attacks);
        for mut entry in ledger {
            if entry.remaining > 1 {
                entry.remaining -= 1;
                state.delayed_attacks.push(entry);
                continue;
            }
            let Some(attacker) = state.get_player_mut(entry.attacker) else {
                continue;
            };
            if attacker.is_alive() {
                debug!("{}'s {} is ready", attacker.name, entry.card);
                attacker.ready_attacks.push(ReadyAttack {
                    card: entry.card,
                    target: entry.target,
                });
            }
        }

        events.push(GameEvent::RoundEnded { round: state.round });
        state.round += 1;
        Ok(events)
    }

    /// AI 行动前的展示性停顿，只在设置开启时给出。
    pub fn ai_thinking_delay(&mut self, state: &GameState) -> Option<Duration> {
        if !state.settings.wait_for_ai_thinking {
            return None;
        }
        Some(Duration::from_millis(self.rng.gen_range(AI_THINKING_MS)))
    }

    fn human_turn(
        &mut self,
        state: &mut GameState,
        player_id: PlayerId,
        controller: &mut dyn TurnController,
    ) -> Result<Vec<GameEvent>, RuleError> {
        let actions = HumanAction::available(state.player(player_id)?);
        for attempt in 1..=MAX_INPUT_ATTEMPTS {
            let Some(action) = controller.choose_action(state, player_id, &actions) else {
                break;
            };
            let result = if actions.contains(&action) {
                (action.handler())(self, state, player_id, controller)
            } else {
                Err(RuleError::InvalidArgument {
                    reason: format!("action '{action}' is not available"),
                })
            };
            match result {
                Ok(events) => return Ok(events),
                Err(error) if error.is_recoverable() => {
                    controller.input_rejected(player_id, &error);
                    warn!(
                        "{} input rejected (attempt {attempt}/{MAX_INPUT_ATTEMPTS}): {error}",
                        state.player_name(player_id)
                    );
                }
                Err(error) => return Err(error),
            }
        }
        Ok(vec![GameEvent::ActionCanceled { player_id }])
    }

    /// 推进一个玩家回合：跳过并移除死亡玩家，执行人类或 AI 行动，
    /// 结算到期的延迟攻击，整轮结束时执行回合后处理，最后判定胜负。
    pub fn play_next_turn(
        &mut self,
        state: &mut GameState,
        controller: &mut dyn TurnController,
    ) -> Result<Vec<GameEvent>, RuleError> {
        Self::ensure_running(state)?;
        let mut events = Vec::new();

        let player_id = loop {
            let Some(id) = state.rotation.peek() else {
                return Err(RuleError::InsufficientPlayers { count: 0 });
            };
            if state.is_alive(id) {
                break id;
            }
            state.rotation.remove(&id);
            state.acted_this_round.retain(|acted| *acted != id);
            debug!("{} removed from rotation", state.player_name(id));
            events.push(GameEvent::PlayerEliminated { player_id: id });
            if let Some(outcome) = state.evaluate_game_over() {
                events.push(Self::game_over_event(state, outcome));
                state.record_events(&events);
                return Ok(events);
            }
        };

        state.turn += 1;
        events.push(GameEvent::TurnStarted {
            player_id,
            turn: state.turn,
        });

        if state.player(player_id)?.is_human() {
            events.extend(self.human_turn(state, player_id, controller)?);
        } else {
            if let Some(delay) = self.ai_thinking_delay(state) {
                controller.pause(delay);
            }
            events.extend(ai::ai_action(self, state, player_id)?);
        }

        events.extend(self.resolve_ready_attacks(state, player_id)?);

        if state.mark_acted(player_id) {
            events.extend(self.after_turn(state)?);
        }

        if state.settings.exit_on_all_human_dead && state.all_humans_dead() {
            let outcome = state.declare_outcome(GameOutcome {
                winner: None,
                reason: VictoryReason::AllHumansDead,
            });
            events.push(Self::game_over_event(state, outcome));
        } else if let Some(outcome) = state.evaluate_game_over() {
            events.push(Self::game_over_event(state, outcome));
        }

        state.record_events(&events);
        Ok(events)
    }

    fn game_over_event(state: &GameState, outcome: GameOutcome) -> GameEvent {
        match outcome.winner {
            Some(winner) => info!("game over, {} wins", state.player_name(winner)),
            None => info!("game over ({:?})", outcome.reason),
        }
        GameEvent::GameOver {
            winner: outcome.winner,
            reason: outcome.reason,
        }
    }

    /// 从准备阶段一直运行到对局结束。
    pub fn start(
        &mut self,
        state: &mut GameState,
        controller: &mut dyn TurnController,
    ) -> Result<GameOutcome, RuleError> {
        if state.phase == GamePhase::Setup {
            self.setup(state)?;
        }
        loop {
            if let Some(outcome) = state.outcome {
                return Ok(outcome);
            }
            self.play_next_turn(state, controller)?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::AiLevel;
    use crate::game::actions::ScriptedController;
    use crate::game::card::{BED, ENCHANTED_GOLDEN_APPLE, SHIELD, TNT, TNT_MINECART};
    use crate::game::health::Defense;
    use crate::game::pool::CardPool;
    use crate::game::settings::GameSettings;

    fn state_with(levels: &[AiLevel]) -> GameState {
        let mut state = GameState::default();
        for (index, level) in levels.iter().enumerate() {
            state
                .add_player(format!("P{index}"), *level)
                .expect("player should be added");
        }
        state
    }

    fn running_state(levels: &[AiLevel]) -> GameState {
        let mut state = state_with(levels);
        state.phase = GamePhase::Running;
        state.round = 1;
        state
    }

    fn give(state: &mut GameState, id: PlayerId, name: &str) -> Card {
        let card = Card::named(name);
        state
            .player_mut(id)
            .expect("player should exist")
            .add_cards([card.clone()]);
        card
    }

    #[test]
    fn setup_requires_two_players_and_deals_hands() {
        let mut engine = RuleEngine::with_seed(1);
        let mut lonely = state_with(&[AiLevel::Human]);
        assert!(matches!(
            engine.setup(&mut lonely),
            Err(RuleError::InsufficientPlayers { count: 1 })
        ));

        let mut state = state_with(&[AiLevel::Human, AiLevel::Random]);
        engine.setup(&mut state).expect("setup should succeed");
        assert_eq!(state.phase, GamePhase::Running);
        assert!(state
            .players
            .iter()
            .all(|player| player.hand.len() == STARTING_HAND));
        assert!(matches!(
            engine.setup(&mut state),
            Err(RuleError::GameAlreadyStarted)
        ));
    }

    #[test]
    fn drawing_from_exhausted_pool_resets_first() {
        let mut engine = RuleEngine::with_seed(2);
        let mut state = running_state(&[AiLevel::Human, AiLevel::Random]);
        state.card_pool = CardPool::empty();

        let events = engine.draw_cards(&mut state, 0, 2).expect("draw succeeds");

        assert!(events.contains(&GameEvent::PoolReset));
        assert_eq!(state.players[0].hand.len(), 2);
    }

    #[test]
    fn using_a_card_not_in_hand_fails_unless_cheating() {
        let mut engine = RuleEngine::with_seed(3);
        let mut state = running_state(&[AiLevel::Human, AiLevel::Random]);
        let shield = Card::named(SHIELD);

        assert!(matches!(
            engine.use_card(&mut state, 0, &shield, false),
            Err(RuleError::CardNotInHand { .. })
        ));

        engine
            .use_card(&mut state, 0, &shield, true)
            .expect("cheat bypasses ownership");
        assert!(state.players[0].health.has_defense());
        assert!(state.card_pool.discard_pile().is_empty(), "cheats skip discard");
    }

    #[test]
    fn self_use_cards_apply_and_discard() {
        let mut engine = RuleEngine::with_seed(4);
        let mut state = running_state(&[AiLevel::Human, AiLevel::Random]);
        let bed = give(&mut state, 0, BED);

        engine
            .use_card(&mut state, 0, &bed, false)
            .expect("bed is usable");

        let player = &state.players[0];
        assert!(player.bedded);
        assert!(player.hand.is_empty());
        assert!(player.active.is_none());
        assert_eq!(state.card_pool.discard_pile(), &[bed]);
    }

    #[test]
    fn staging_a_new_card_returns_the_previous_one() {
        let mut engine = RuleEngine::with_seed(5);
        let mut state = running_state(&[AiLevel::Human, AiLevel::Random]);
        let sword = give(&mut state, 0, "Iron Sword");
        let tnt = give(&mut state, 0, TNT);

        engine.use_card(&mut state, 0, &sword, false).expect("staged");
        engine.use_card(&mut state, 0, &tnt, false).expect("staged");

        let player = &state.players[0];
        assert_eq!(player.hand, vec![sword]);
        assert_eq!(player.active.as_ref().map(|active| &active.card), Some(&tnt));
    }

    #[test]
    fn attack_requires_an_active_card() {
        let mut engine = RuleEngine::with_seed(6);
        let mut state = running_state(&[AiLevel::Human, AiLevel::Random]);

        assert!(matches!(
            engine.attack_player(&mut state, 0, 1, false),
            Err(RuleError::NoActiveCard { player_id: 0 })
        ));
    }

    #[test]
    fn power_buff_adds_to_physical_attacks() {
        let mut engine = RuleEngine::with_seed(7);
        let mut state = running_state(&[AiLevel::Human, AiLevel::Random]);
        let sword = give(&mut state, 0, "Wooden Sword");
        state.players[0].power = 2;

        engine.use_card(&mut state, 0, &sword, false).expect("staged");
        engine
            .attack_player(&mut state, 0, 1, false)
            .expect("attack lands");

        assert_eq!(state.players[1].health.current, 2);
        assert_eq!(state.card_pool.discard_pile(), &[sword]);
    }

    #[test]
    fn trident_leaves_a_damaged_trident_even_when_blocked() {
        let mut engine = RuleEngine::with_seed(8);
        let mut state = running_state(&[AiLevel::Human, AiLevel::Random]);
        let trident = give(&mut state, 0, TRIDENT);
        state.players[1].health.equip(Defense::Shield, 3);

        engine.use_card(&mut state, 0, &trident, false).expect("staged");
        engine
            .attack_player(&mut state, 0, 1, false)
            .expect("attack lands");

        let defender = &state.players[1];
        assert_eq!(defender.health.current, 5);
        assert_eq!(defender.health.defense_charges, 2);
        assert!(defender.has_card(&Card::named(DAMAGED_TRIDENT)));
    }

    #[test]
    fn minecart_matures_into_a_ready_attack_after_two_rounds() {
        let mut engine = RuleEngine::with_seed(9);
        let mut state = running_state(&[AiLevel::Human, AiLevel::Random]);
        let cart = give(&mut state, 0, TNT_MINECART);

        engine.use_card(&mut state, 0, &cart, false).expect("staged");
        let events = engine
            .attack_player(&mut state, 0, 1, false)
            .expect("attack queued");
        assert!(matches!(events[0], GameEvent::AttackDelayed { delay: 2, .. }));
        assert_eq!(state.players[1].health.current, 5);

        engine.after_turn(&mut state).expect("after turn");
        assert_eq!(state.delayed_attacks[0].remaining, 1);
        assert!(state.players[0].ready_attacks.is_empty());

        engine.after_turn(&mut state).expect("after turn");
        assert!(state.delayed_attacks.is_empty());
        assert_eq!(state.players[0].ready_attacks.len(), 1);

        engine
            .resolve_ready_attacks(&mut state, 0)
            .expect("ready attack resolves");
        assert_eq!(state.players[1].health.current, 3);
        assert!(state.players[0].active.is_none());
    }

    #[test]
    fn dead_attackers_drop_their_delayed_attacks() {
        let mut engine = RuleEngine::with_seed(10);
        let mut state = running_state(&[AiLevel::Human, AiLevel::Random, AiLevel::Random]);
        state.delayed_attacks.push(DelayedAttack {
            attacker: 0,
            target: 1,
            card: Card::named(TNT_MINECART),
            remaining: 1,
        });
        state.players[0].health.current = 0;

        engine.after_turn(&mut state).expect("after turn");

        assert!(state.delayed_attacks.is_empty());
        assert!(state.players[0].ready_attacks.is_empty());
    }

    #[test]
    fn bed_tools_and_blocks() {
        let mut engine = RuleEngine::with_seed(11);
        let mut state = running_state(&[AiLevel::Human, AiLevel::Random]);
        state.players[1].bedded = true;
        let block = give(&mut state, 1, "Wooden Block");
        let pickaxe = give(&mut state, 0, "Iron Pickaxe");
        let axe = give(&mut state, 0, "Iron Axe");

        engine
            .destroy_or_defend_bed(&mut state, 1, &block, None)
            .expect("block placed");
        assert_eq!(state.players[1].bed_defenses.len(), 1);

        engine
            .destroy_or_defend_bed(&mut state, 0, &axe, Some(1))
            .expect("axe swings");
        assert_eq!(
            state.players[1].bed_defenses.len(),
            1,
            "axes only break stone"
        );

        engine
            .destroy_or_defend_bed(&mut state, 0, &pickaxe, Some(1))
            .expect("pickaxe digs");
        assert_eq!(state.players[1].bed_defenses[0].charges, 1);
        assert!(state.players[1].bedded);
    }

    #[test]
    fn scripted_game_runs_to_completion() {
        let settings = GameSettings {
            allow_command: true,
            ..GameSettings::default()
        };
        let mut state = GameState::new(settings).expect("valid settings");
        state.add_player("Hero", AiLevel::Human).expect("added");
        state.add_player("Bot", AiLevel::Strategic).expect("added");
        let mut engine = RuleEngine::with_seed(12);
        engine.setup(&mut state).expect("setup");
        give(&mut state, 0, crate::game::card::KILL_COMMAND);

        let mut controller = ScriptedController::from_json(
            r#"[{"action": "attack/use", "card": "/kill", "target": 1}]"#,
        )
        .expect("valid script");
        let outcome = engine
            .start(&mut state, &mut controller)
            .expect("game finishes");

        assert_eq!(outcome.winner, Some(0));
        assert_eq!(state.phase, GamePhase::GameOver);
        assert!(matches!(
            state.event_log.last(),
            Some(GameEvent::GameOver { winner: Some(0), .. })
        ));
    }

    #[test]
    fn game_exits_when_every_human_is_dead() {
        let settings = GameSettings {
            exit_on_all_human_dead: true,
            ..GameSettings::default()
        };
        let mut state = GameState::new(settings).expect("valid settings");
        for (name, level) in [("Hero", AiLevel::Human), ("A", AiLevel::Random), ("B", AiLevel::Random)] {
            state.add_player(name, level).expect("added");
        }
        let mut engine = RuleEngine::with_seed(13);
        engine.setup(&mut state).expect("setup");
        state.players[0].health.current = 0;

        let mut controller = ScriptedController::default();
        engine
            .play_next_turn(&mut state, &mut controller)
            .expect("turn runs");

        assert_eq!(state.phase, GamePhase::AllHumansDead);
        assert_eq!(
            state.outcome.map(|outcome| outcome.reason),
            Some(VictoryReason::AllHumansDead)
        );
        assert!(matches!(
            engine.play_next_turn(&mut state, &mut controller),
            Err(RuleError::GameFinished)
        ));
    }

    #[test]
    fn level_three_ai_eats_enchanted_apple_before_attacking() {
        let mut engine = RuleEngine::with_seed(14);
        let mut state = running_state(&[AiLevel::Strategic, AiLevel::Random]);
        state.players[0].health.current = 2;
        give(&mut state, 0, "Netherite Sword");
        give(&mut state, 0, ENCHANTED_GOLDEN_APPLE);
        state.players[1].health.current = 1;

        let mut controller = ScriptedController::default();
        let events = engine
            .play_next_turn(&mut state, &mut controller)
            .expect("turn runs");

        assert!(events.iter().any(|event| matches!(
            event,
            GameEvent::CardUsed { card, .. } if card.name() == ENCHANTED_GOLDEN_APPLE
        )));
        assert_eq!(state.players[1].health.current, 1, "no attack this turn");
        assert_eq!(state.players[0].health.current, 5);
    }
}
