use serde::{Deserialize, Serialize};

use crate::ai::AiLevel;
use crate::utils::RepeatQueue;

use super::card::{Card, DamageType};
use super::effects::EffectKind;
use super::locale::Localizer;
use super::player::Player;
use super::pool::CardPool;
use super::rules::RuleError;
use super::settings::GameSettings;

/// 玩家标识，等于其在花名册中的下标。
pub type PlayerId = u8;

/// 对局阶段。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum GamePhase {
    #[default]
    Setup,
    Running,
    GameOver,
    AllHumansDead,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum VictoryReason {
    LastStanding,
    NoSurvivors,
    AllHumansDead,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameOutcome {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner: Option<PlayerId>,
    pub reason: VictoryReason,
}

/// 全局延迟攻击账本中的一项。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DelayedAttack {
    pub attacker: PlayerId,
    pub target: PlayerId,
    pub card: Card,
    pub remaining: u32,
}

/// 规则引擎产生的事件流，取代散落的提示文本。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum GameEvent {
    GameStarted {
        players: Vec<PlayerId>,
    },
    TurnStarted {
        player_id: PlayerId,
        turn: u32,
    },
    CardsDrawn {
        player_id: PlayerId,
        cards: Vec<Card>,
    },
    PoolReshuffled {
        returned: usize,
    },
    PoolReset,
    CardUsed {
        player_id: PlayerId,
        card: Card,
    },
    CardGranted {
        player_id: PlayerId,
        card: Card,
    },
    AttackDeclared {
        attacker: PlayerId,
        target: PlayerId,
        card: Card,
    },
    AttackDelayed {
        attacker: PlayerId,
        target: PlayerId,
        card: Card,
        delay: u32,
    },
    DamageAbsorbed {
        player_id: PlayerId,
        amount: i32,
        source: String,
        charges_left: u32,
    },
    DamageResolved {
        player_id: PlayerId,
        amount: i32,
        damage_type: DamageType,
        source: String,
        health: i32,
    },
    Healed {
        player_id: PlayerId,
        amount: i32,
        health: i32,
    },
    DefenseEquipped {
        player_id: PlayerId,
        charges: u32,
    },
    DefenseBroken {
        player_id: PlayerId,
    },
    BedPlaced {
        player_id: PlayerId,
    },
    BedDestroyed {
        player_id: PlayerId,
        source: String,
    },
    BedDefensePlaced {
        player_id: PlayerId,
        name: String,
        charges: u32,
    },
    BedDefenseWorn {
        player_id: PlayerId,
        name: String,
        charges_left: u32,
    },
    BedDefenseDestroyed {
        player_id: PlayerId,
        name: String,
    },
    EffectApplied {
        player_id: PlayerId,
        effect: EffectKind,
        duration: i32,
        level: i32,
    },
    EffectExtended {
        player_id: PlayerId,
        effect: EffectKind,
        duration: i32,
    },
    EffectExpired {
        player_id: PlayerId,
        effect: EffectKind,
    },
    PowerChanged {
        player_id: PlayerId,
        power: i32,
    },
    PlayerDied {
        player_id: PlayerId,
    },
    PlayerRevived {
        player_id: PlayerId,
        health: i32,
    },
    PlayerEliminated {
        player_id: PlayerId,
    },
    ActionCanceled {
        player_id: PlayerId,
    },
    RoundEnded {
        round: u32,
    },
    GameOver {
        #[serde(skip_serializing_if = "Option::is_none")]
        winner: Option<PlayerId>,
        reason: VictoryReason,
    },
}

impl GameEvent {
    /// 本地化键与参数。
    fn message(&self, state: &GameState) -> (&'static str, Vec<String>) {
        let name = |id: &PlayerId| state.player_name(*id).to_string();
        match self {
            GameEvent::GameStarted { players } => (
                "Game started with {}",
                vec![players.iter().map(name).collect::<Vec<_>>().join(", ")],
            ),
            GameEvent::TurnStarted { player_id, .. } => ("{}'s turn", vec![name(player_id)]),
            GameEvent::CardsDrawn { player_id, cards } => (
                "{} drew {} cards: {}",
                vec![
                    name(player_id),
                    cards.len().to_string(),
                    cards.iter().map(Card::to_string).collect::<Vec<_>>().join(", "),
                ],
            ),
            GameEvent::PoolReshuffled { returned } => (
                "{} discarded cards were shuffled back",
                vec![returned.to_string()],
            ),
            GameEvent::PoolReset => ("The card pool was reset", Vec::new()),
            GameEvent::CardUsed { player_id, card } => {
                ("{} used {}", vec![name(player_id), card.to_string()])
            }
            GameEvent::CardGranted { player_id, card } => {
                ("{} received {}", vec![name(player_id), card.to_string()])
            }
            GameEvent::AttackDeclared {
                attacker,
                target,
                card,
            } => (
                "{} attacks {} with {}",
                vec![name(attacker), name(target), card.to_string()],
            ),
            GameEvent::AttackDelayed {
                attacker,
                target,
                card,
                delay,
            } => (
                "{} launched {} at {}, arriving in {} turns",
                vec![name(attacker), card.to_string(), name(target), delay.to_string()],
            ),
            GameEvent::DamageAbsorbed {
                player_id, source, ..
            } => (
                "{}'s defense blocked {}",
                vec![name(player_id), source.clone()],
            ),
            GameEvent::DamageResolved {
                player_id,
                amount,
                source,
                ..
            } => (
                "{} took {} damage from {}",
                vec![name(player_id), amount.to_string(), source.clone()],
            ),
            GameEvent::Healed {
                player_id, amount, ..
            } => ("{} healed {} HP", vec![name(player_id), amount.to_string()]),
            GameEvent::DefenseEquipped { player_id, .. } => {
                ("{} raised a shield", vec![name(player_id)])
            }
            GameEvent::DefenseBroken { player_id } => {
                ("{}'s shield is broken", vec![name(player_id)])
            }
            GameEvent::BedPlaced { player_id } => ("{} placed a bed", vec![name(player_id)]),
            GameEvent::BedDestroyed { player_id, .. } => {
                ("{}'s bed was destroyed", vec![name(player_id)])
            }
            GameEvent::BedDefensePlaced {
                player_id, name: block, ..
            } => (
                "{} protected the bed with {}",
                vec![name(player_id), block.clone()],
            ),
            GameEvent::BedDefenseWorn {
                player_id,
                name: block,
                ..
            } => ("{}'s {} was damaged", vec![name(player_id), block.clone()]),
            GameEvent::BedDefenseDestroyed {
                player_id,
                name: block,
            } => ("{}'s {} was destroyed", vec![name(player_id), block.clone()]),
            GameEvent::EffectApplied {
                player_id, effect, ..
            } => ("{} gained {}", vec![name(player_id), effect.to_string()]),
            GameEvent::EffectExtended {
                player_id, effect, ..
            } => ("{}'s {} was extended", vec![name(player_id), effect.to_string()]),
            GameEvent::EffectExpired { player_id, effect } => {
                ("{}'s {} wore off", vec![name(player_id), effect.to_string()])
            }
            GameEvent::PowerChanged { player_id, power } => {
                ("{} has power {}", vec![name(player_id), power.to_string()])
            }
            GameEvent::PlayerDied { player_id } => ("{} is dead", vec![name(player_id)]),
            GameEvent::PlayerRevived { player_id, .. } => {
                ("{} relived with a bed", vec![name(player_id)])
            }
            GameEvent::PlayerEliminated { player_id } => {
                ("{} left the rotation", vec![name(player_id)])
            }
            GameEvent::ActionCanceled { player_id } => ("{} did nothing", vec![name(player_id)]),
            GameEvent::RoundEnded { round } => ("Round {} ended", vec![round.to_string()]),
            GameEvent::GameOver {
                winner: Some(winner),
                ..
            } => ("{} wins!", vec![name(winner)]),
            GameEvent::GameOver {
                reason: VictoryReason::AllHumansDead,
                ..
            } => ("Game exited for no human alive!", Vec::new()),
            GameEvent::GameOver { .. } => ("Game over!", Vec::new()),
        }
    }

    pub fn describe(&self, state: &GameState, localizer: &dyn Localizer) -> String {
        let (key, args) = self.message(state);
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        localizer.localize("message", key, &args)
    }
}

/// 对局整体状态。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameState {
    #[serde(default)]
    pub players: Vec<Player>,
    #[serde(default)]
    pub rotation: RepeatQueue<PlayerId>,
    pub card_pool: CardPool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub delayed_attacks: Vec<DelayedAttack>,
    #[serde(default)]
    pub settings: GameSettings,
    #[serde(default)]
    pub turn: u32,
    #[serde(default)]
    pub round: u32,
    #[serde(default)]
    pub phase: GamePhase,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub acted_this_round: Vec<PlayerId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub event_log: Vec<GameEvent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<GameOutcome>,
}

impl GameState {
    pub fn new(settings: GameSettings) -> Result<Self, RuleError> {
        settings.validate()?;
        Ok(Self {
            players: Vec::new(),
            rotation: RepeatQueue::new(),
            card_pool: CardPool::with_copies(settings.pool_copies()),
            delayed_attacks: Vec::new(),
            settings,
            turn: 0,
            round: 0,
            phase: GamePhase::Setup,
            acted_this_round: Vec::new(),
            event_log: Vec::new(),
            outcome: None,
        })
    }

    /// 注册玩家；名字为空时自动命名，重名报错。
    pub fn add_player(
        &mut self,
        name: impl Into<String>,
        ai_level: AiLevel,
    ) -> Result<PlayerId, RuleError> {
        if self.phase != GamePhase::Setup {
            return Err(RuleError::GameAlreadyStarted);
        }
        self.settings.validate()?;

        let id = PlayerId::try_from(self.players.len()).map_err(|_| {
            RuleError::InvalidArgument {
                reason: "too many players".into(),
            }
        })?;
        let mut name = name.into().trim().to_string();
        if name.is_empty() {
            name = format!("Player {}", id + 1);
        }
        if self.players.iter().any(|player| player.name == name) {
            return Err(RuleError::DuplicatePlayerName { name });
        }

        let player = Player::new(
            id,
            name,
            ai_level,
            self.settings.start_health(),
            self.settings.max_health(),
        );
        log::debug!(
            "added player {} ({:?}) with health {}/{}",
            player.name,
            ai_level,
            player.health.current,
            player.health.max
        );
        self.players.push(player);
        self.rotation.put(id);
        Ok(id)
    }

    pub fn record_event(&mut self, event: GameEvent) {
        self.event_log.push(event);
    }

    pub fn record_events(&mut self, events: &[GameEvent]) {
        self.event_log.extend_from_slice(events);
    }

    pub fn get_player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|player| player.id == id)
    }

    pub fn get_player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|player| player.id == id)
    }

    pub fn player(&self, id: PlayerId) -> Result<&Player, RuleError> {
        self.get_player(id)
            .ok_or(RuleError::PlayerNotFound { player_id: id })
    }

    pub fn player_mut(&mut self, id: PlayerId) -> Result<&mut Player, RuleError> {
        self.get_player_mut(id)
            .ok_or(RuleError::PlayerNotFound { player_id: id })
    }

    pub fn player_name(&self, id: PlayerId) -> &str {
        self.get_player(id)
            .map(|player| player.name.as_str())
            .unwrap_or("?")
    }

    pub fn is_alive(&self, id: PlayerId) -> bool {
        self.get_player(id).map(Player::is_alive).unwrap_or(false)
    }

    pub fn alive_players(&self) -> Vec<PlayerId> {
        self.players
            .iter()
            .filter(|player| player.is_alive())
            .map(|player| player.id)
            .collect()
    }

    /// 按花名册顺序列出其他存活玩家。
    pub fn living_opponents(&self, id: PlayerId) -> Vec<PlayerId> {
        self.players
            .iter()
            .filter(|player| player.id != id && player.is_alive())
            .map(|player| player.id)
            .collect()
    }

    pub fn is_finished(&self) -> bool {
        self.outcome.is_some()
    }

    /// 下一位将要行动的存活玩家（不改变轮转）。
    pub fn next_player(&self) -> Option<PlayerId> {
        self.rotation.iter().copied().find(|id| self.is_alive(*id))
    }

    /// 记录本轮已行动的玩家；所有存活玩家都行动过后清空并返回 `true`。
    pub fn mark_acted(&mut self, id: PlayerId) -> bool {
        if !self.acted_this_round.contains(&id) {
            self.acted_this_round.push(id);
        }
        let finished = self
            .players
            .iter()
            .filter(|player| player.is_alive() && self.rotation.contains(&player.id))
            .all(|player| self.acted_this_round.contains(&player.id));
        if finished {
            self.acted_this_round.clear();
        }
        finished
    }

    pub fn all_humans_dead(&self) -> bool {
        let mut humans = self.players.iter().filter(|player| player.is_human()).peekable();
        humans.peek().is_some() && humans.all(|player| !player.is_alive())
    }

    /// 存活玩家少于两人时结束对局。
    pub fn evaluate_game_over(&mut self) -> Option<GameOutcome> {
        if let Some(outcome) = self.outcome {
            return Some(outcome);
        }
        let alive = self.alive_players();
        if alive.len() >= 2 {
            return None;
        }
        let outcome = match alive.first() {
            Some(winner) => GameOutcome {
                winner: Some(*winner),
                reason: VictoryReason::LastStanding,
            },
            None => GameOutcome {
                winner: None,
                reason: VictoryReason::NoSurvivors,
            },
        };
        Some(self.declare_outcome(outcome))
    }

    pub fn declare_outcome(&mut self, outcome: GameOutcome) -> GameOutcome {
        if self.outcome.is_none() {
            self.phase = match outcome.reason {
                VictoryReason::AllHumansDead => GamePhase::AllHumansDead,
                _ => GamePhase::GameOver,
            };
            self.outcome = Some(outcome);
        }
        outcome
    }

    pub fn winner(&self) -> Option<PlayerId> {
        self.outcome.and_then(|outcome| outcome.winner)
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self {
            players: Vec::new(),
            rotation: RepeatQueue::new(),
            card_pool: CardPool::default(),
            delayed_attacks: Vec::new(),
            settings: GameSettings::default(),
            turn: 0,
            round: 0,
            phase: GamePhase::default(),
            acted_this_round: Vec::new(),
            event_log: Vec::new(),
            outcome: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::health::Damage;
    use crate::game::locale::KeyLocalizer;

    fn three_player_state() -> GameState {
        let mut state = GameState::default();
        for name in ["Ana", "Bo", "Cy"] {
            state.add_player(name, AiLevel::Random).expect("player added");
        }
        state
    }

    fn kill(state: &mut GameState, id: PlayerId) {
        let damage = Damage::new(99, DamageType::Magical, "test").expect("valid damage");
        state
            .player_mut(id)
            .expect("player exists")
            .receive_damage(&damage)
            .expect("damage applies");
    }

    #[test]
    fn players_get_configured_health_and_unique_names() {
        let settings = GameSettings {
            start_health: 4,
            max_health: 6,
            ..GameSettings::default()
        };
        let mut state = GameState::new(settings).expect("valid settings");
        let id = state.add_player("", AiLevel::Human).expect("added");

        let player = state.player(id).expect("exists");
        assert_eq!(player.name, "Player 1");
        assert_eq!((player.health.current, player.health.max), (4, 6));
        assert!(matches!(
            state.add_player("Player 1", AiLevel::Human),
            Err(RuleError::DuplicatePlayerName { .. })
        ));
    }

    #[test]
    fn game_over_when_one_player_survives() {
        let mut state = three_player_state();
        assert!(state.evaluate_game_over().is_none());

        kill(&mut state, 0);
        assert!(state.evaluate_game_over().is_none());
        kill(&mut state, 2);

        let outcome = state.evaluate_game_over().expect("game should be over");
        assert_eq!(outcome.winner, Some(1));
        assert_eq!(state.phase, GamePhase::GameOver);
    }

    #[test]
    fn round_finishes_once_every_living_player_acted() {
        let mut state = three_player_state();
        assert!(!state.mark_acted(0));
        assert!(!state.mark_acted(1));
        assert!(state.mark_acted(2));
        assert!(state.acted_this_round.is_empty());

        kill(&mut state, 1);
        assert!(!state.mark_acted(0));
        assert!(state.mark_acted(2), "dead players are not waited for");
    }

    #[test]
    fn human_exit_needs_at_least_one_human() {
        let mut state = three_player_state();
        assert!(!state.all_humans_dead());

        state.players[1].ai_level = AiLevel::Human;
        kill(&mut state, 1);
        assert!(state.all_humans_dead());
    }

    #[test]
    fn events_render_through_the_localizer() {
        let state = three_player_state();
        let event = GameEvent::AttackDeclared {
            attacker: 0,
            target: 2,
            card: Card::named("TNT"),
        };
        assert_eq!(event.describe(&state, &KeyLocalizer), "Ana attacks Cy with TNT");
    }
}
