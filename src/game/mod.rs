//! 游戏核心逻辑模块（卡牌规则、伤害结算、牌池、回合调度等）。

pub mod actions;
pub mod bed;
pub mod card;
pub mod effects;
pub mod health;
pub mod locale;
pub mod player;
pub mod pool;
pub mod rules;
pub mod settings;
pub mod state;

pub use actions::{HumanAction, HumanCommand, ScriptedController, TurnController};
pub use bed::BedDefense;
pub use card::{Card, DamageType, DefenseProfile, DestroyCategory, Usage, DEFAULT_CATALOG};
pub use effects::{Effect, EffectKind};
pub use health::{Damage, DamageOutcome, Defense, Health};
pub use locale::{KeyLocalizer, Localizer, TableLocalizer};
pub use player::{ActiveCard, Player, ReadyAttack};
pub use pool::{CardPool, Draw};
pub use rules::{RuleEngine, RuleError, RuleResolution};
pub use settings::GameSettings;
pub use state::{
    DelayedAttack, GameEvent, GameOutcome, GamePhase, GameState, PlayerId, VictoryReason,
};
