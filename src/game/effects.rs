//! 持续状态效果（药水、金苹果带来的增益与伤害）。

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::rules::RuleError;
use super::state::PlayerId;

/// 同名效果再次获得时延长的回合数。
pub const EFFECT_EXTENSION: i32 = 2;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    Healing,
    Power,
    InstantDamage,
    HealthBoost,
}

impl EffectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EffectKind::Healing => "healing",
            EffectKind::Power => "power",
            EffectKind::InstantDamage => "instant damage",
            EffectKind::HealthBoost => "health boost",
        }
    }
}

impl FromStr for EffectKind {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "healing" => Ok(EffectKind::Healing),
            "power" => Ok(EffectKind::Power),
            "instant damage" => Ok(EffectKind::InstantDamage),
            "health boost" => Ok(EffectKind::HealthBoost),
            _ => Err(RuleError::UnknownEffect { name: s.to_string() }),
        }
    }
}

impl fmt::Display for EffectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Effect {
    pub owner: PlayerId,
    pub kind: EffectKind,
    pub duration: i32,
    pub level: i32,
}

impl Effect {
    pub fn new(owner: PlayerId, kind: EffectKind, duration: i32, level: i32) -> Self {
        Self {
            owner,
            kind,
            duration,
            level,
        }
    }

    pub fn named(owner: PlayerId, name: &str, duration: i32, level: i32) -> Result<Self, RuleError> {
        Ok(Self::new(owner, name.parse()?, duration, level))
    }

    /// 每回合结算后调用；返回是否已到期。
    pub fn tick(&mut self) -> bool {
        self.duration -= 1;
        self.is_expired()
    }

    pub fn is_expired(&self) -> bool {
        self.duration <= 0
    }
}
