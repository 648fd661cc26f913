//! 人类玩家的行动模型：可选行动、处理函数表与输入来源。

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::card::Card;
use super::player::Player;
use super::rules::{RuleEngine, RuleError};
use super::state::{GameEvent, GameState, PlayerId};

/// 人类玩家在空手选择"攻击/使用"时补充的手牌数。
pub const EMPTY_HAND_DRAW: usize = 5;
const DRAW_ACTION_AMOUNT: usize = 2;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum HumanAction {
    #[serde(rename = "attack/use")]
    AttackOrUse,
    #[serde(rename = "draw 2 cards")]
    DrawTwoCards,
    #[serde(rename = "destroy/defend bed")]
    DestroyDefendBed,
}

pub type ActionHandler = fn(
    &mut RuleEngine,
    &mut GameState,
    PlayerId,
    &mut dyn TurnController,
) -> Result<Vec<GameEvent>, RuleError>;

const ACTION_TABLE: [(HumanAction, ActionHandler); 3] = [
    (HumanAction::AttackOrUse, attack_or_use_card),
    (HumanAction::DrawTwoCards, draw_2_cards),
    (HumanAction::DestroyDefendBed, destroy_defend_bed),
];

impl HumanAction {
    pub fn label(&self) -> &'static str {
        match self {
            HumanAction::AttackOrUse => "attack/use",
            HumanAction::DrawTwoCards => "draw 2 cards",
            HumanAction::DestroyDefendBed => "destroy/defend bed",
        }
    }

    fn table_index(&self) -> usize {
        match self {
            HumanAction::AttackOrUse => 0,
            HumanAction::DrawTwoCards => 1,
            HumanAction::DestroyDefendBed => 2,
        }
    }

    pub fn handler(&self) -> ActionHandler {
        ACTION_TABLE[self.table_index()].1
    }

    /// 当前可选的行动；手里有床相关卡牌时才提供"破坏/守护床"。
    pub fn available(player: &Player) -> Vec<HumanAction> {
        let mut actions = vec![HumanAction::AttackOrUse, HumanAction::DrawTwoCards];
        if player.hand.iter().any(Card::is_bed_card) {
            actions.push(HumanAction::DestroyDefendBed);
        }
        actions
    }
}

impl FromStr for HumanAction {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        ACTION_TABLE
            .iter()
            .map(|(action, _)| *action)
            .find(|action| action.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| RuleError::InvalidArgument {
                reason: format!("unknown action '{wanted}'"),
            })
    }
}

impl fmt::Display for HumanAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// 人类玩家的输入来源。返回 `None` 表示取消。
pub trait TurnController {
    fn choose_action(
        &mut self,
        state: &GameState,
        player_id: PlayerId,
        actions: &[HumanAction],
    ) -> Option<HumanAction>;

    fn choose_card(
        &mut self,
        state: &GameState,
        player_id: PlayerId,
        candidates: &[Card],
    ) -> Option<Card>;

    fn choose_target(
        &mut self,
        state: &GameState,
        player_id: PlayerId,
        card: &Card,
        candidates: &[PlayerId],
    ) -> Option<PlayerId>;

    /// 输入被规则拒绝，随后会重新询问。
    fn input_rejected(&mut self, _player_id: PlayerId, _error: &RuleError) {}

    /// AI 行动前的停顿，测试中可以什么都不做。
    fn pause(&mut self, _delay: Duration) {}
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HumanCommand {
    pub action: HumanAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card: Option<Card>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<PlayerId>,
}

/// 按脚本依次回答的输入来源，供宿主一次提交整条指令以及测试使用。
#[derive(Debug, Clone, Default)]
pub struct ScriptedController {
    commands: VecDeque<HumanCommand>,
    current: Option<HumanCommand>,
    rejected: Option<RuleError>,
}

impl ScriptedController {
    pub fn new(commands: impl IntoIterator<Item = HumanCommand>) -> Self {
        Self {
            commands: commands.into_iter().collect(),
            current: None,
            rejected: None,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, RuleError> {
        let commands: Vec<HumanCommand> =
            serde_json::from_str(json).map_err(|error| RuleError::InvalidArgument {
                reason: error.to_string(),
            })?;
        Ok(Self::new(commands))
    }

    pub fn push(&mut self, command: HumanCommand) {
        self.commands.push_back(command);
    }

    pub fn remaining(&self) -> usize {
        self.commands.len()
    }

    /// 最近一次被拒绝的输入。
    pub fn take_rejection(&mut self) -> Option<RuleError> {
        self.rejected.take()
    }
}

impl TurnController for ScriptedController {
    fn choose_action(
        &mut self,
        _state: &GameState,
        _player_id: PlayerId,
        _actions: &[HumanAction],
    ) -> Option<HumanAction> {
        self.current = self.commands.pop_front();
        self.current.as_ref().map(|command| command.action)
    }

    fn choose_card(
        &mut self,
        _state: &GameState,
        _player_id: PlayerId,
        _candidates: &[Card],
    ) -> Option<Card> {
        self.current.as_ref().and_then(|command| command.card.clone())
    }

    fn choose_target(
        &mut self,
        _state: &GameState,
        _player_id: PlayerId,
        _card: &Card,
        _candidates: &[PlayerId],
    ) -> Option<PlayerId> {
        self.current.as_ref().and_then(|command| command.target)
    }

    fn input_rejected(&mut self, _player_id: PlayerId, error: &RuleError) {
        self.rejected = Some(error.clone());
    }
}

fn select_card(
    state: &GameState,
    player_id: PlayerId,
    controller: &mut dyn TurnController,
    candidates: &[Card],
) -> Result<Option<Card>, RuleError> {
    let Some(card) = controller.choose_card(state, player_id, candidates) else {
        return Ok(None);
    };
    if !candidates.contains(&card) {
        return Err(RuleError::CardNotInHand { card });
    }
    Ok(Some(card))
}

fn select_target(
    state: &GameState,
    player_id: PlayerId,
    controller: &mut dyn TurnController,
    card: &Card,
) -> Result<Option<PlayerId>, RuleError> {
    let candidates = state.living_opponents(player_id);
    let Some(target) = controller.choose_target(state, player_id, card, &candidates) else {
        return Ok(None);
    };
    if !candidates.contains(&target) {
        return Err(RuleError::InvalidTarget);
    }
    Ok(Some(target))
}

fn canceled(player_id: PlayerId) -> Vec<GameEvent> {
    vec![GameEvent::ActionCanceled { player_id }]
}

/// 攻击或使用卡牌。空手时改为补充手牌；镐和方块只能用于床。
pub fn attack_or_use_card(
    engine: &mut RuleEngine,
    state: &mut GameState,
    player_id: PlayerId,
    controller: &mut dyn TurnController,
) -> Result<Vec<GameEvent>, RuleError> {
    let player = state.player(player_id)?;
    if player.hand.is_empty() {
        return engine.draw_cards(state, player_id, EMPTY_HAND_DRAW);
    }

    let candidates =
        player.cards_matching(|card| card.need_target() || card.is_self_use() || card.is_command());
    if candidates.is_empty() {
        return Err(RuleError::InvalidArgument {
            reason: "no card can be used or attacked with".into(),
        });
    }
    let Some(card) = select_card(state, player_id, controller, &candidates)? else {
        return Ok(canceled(player_id));
    };

    if !card.need_target() {
        return engine.use_card(state, player_id, &card, false);
    }
    let Some(target) = select_target(state, player_id, controller, &card)? else {
        return Ok(canceled(player_id));
    };
    let mut events = engine.use_card(state, player_id, &card, false)?;
    events.extend(engine.attack_player(state, player_id, target, false)?);
    Ok(events)
}

pub fn draw_2_cards(
    engine: &mut RuleEngine,
    state: &mut GameState,
    player_id: PlayerId,
    _controller: &mut dyn TurnController,
) -> Result<Vec<GameEvent>, RuleError> {
    engine.draw_cards(state, player_id, DRAW_ACTION_AMOUNT)
}

pub fn destroy_defend_bed(
    engine: &mut RuleEngine,
    state: &mut GameState,
    player_id: PlayerId,
    controller: &mut dyn TurnController,
) -> Result<Vec<GameEvent>, RuleError> {
    let candidates = state.player(player_id)?.cards_matching(Card::is_bed_card);
    let Some(card) = select_card(state, player_id, controller, &candidates)? else {
        return Ok(canceled(player_id));
    };

    let target = if card.destroy_defense_type().is_tool() {
        let Some(target) = select_target(state, player_id, controller, &card)? else {
            return Ok(canceled(player_id));
        };
        Some(target)
    } else {
        None
    };
    let mut events = vec![GameEvent::CardUsed {
        player_id,
        card: card.clone(),
    }];
    events.extend(engine.destroy_or_defend_bed(state, player_id, &card, target)?);
    Ok(events)
}
