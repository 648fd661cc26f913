use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::game::RuleError;

/// 玩家的控制方式：0 为人类，1-3 为逐级增强的脚本 AI。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(try_from = "u8", into = "u8")]
pub enum AiLevel {
    #[default]
    Human,
    Random,
    Tactical,
    Strategic,
}

impl AiLevel {
    pub fn is_human(&self) -> bool {
        *self == AiLevel::Human
    }
}

impl TryFrom<u8> for AiLevel {
    type Error = RuleError;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        match level {
            0 => Ok(AiLevel::Human),
            1 => Ok(AiLevel::Random),
            2 => Ok(AiLevel::Tactical),
            3 => Ok(AiLevel::Strategic),
            _ => Err(RuleError::UnsupportedAiLevel { level }),
        }
    }
}

impl From<AiLevel> for u8 {
    fn from(level: AiLevel) -> Self {
        match level {
            AiLevel::Human => 0,
            AiLevel::Random => 1,
            AiLevel::Tactical => 2,
            AiLevel::Strategic => 3,
        }
    }
}

impl FromStr for AiLevel {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim().to_ascii_lowercase();
        if let Ok(level) = value.parse::<u8>() {
            return AiLevel::try_from(level);
        }
        match value.as_str() {
            "human" => Ok(AiLevel::Human),
            "random" | "easy" => Ok(AiLevel::Random),
            "tactical" | "normal" => Ok(AiLevel::Tactical),
            "strategic" | "hard" => Ok(AiLevel::Strategic),
            _ => Err(RuleError::InvalidArgument {
                reason: format!("unknown AI level '{s}'"),
            }),
        }
    }
}

impl fmt::Display for AiLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", u8::from(*self))
    }
}
