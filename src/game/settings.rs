//! 对局设置：布尔开关与整数参数，未设置时取内置默认值。

use serde::{Deserialize, Serialize};

use super::rules::RuleError;

pub const ALLOW_COMMAND: &str = "allow_command";
pub const EXIT_ON_ALL_HUMAN_DEAD: &str = "exit_on_all_human_dead";
pub const WAIT_FOR_AI_THINKING: &str = "wait_for_ai_thinking";
pub const DEBUG: &str = "debug";

pub const START_HEALTH: &str = "start_health";
pub const MAX_HEALTH: &str = "max_health";
pub const POOL_COPIES: &str = "pool_copies";

pub const DEFAULT_HEALTH: i32 = 5;
/// 牌池份数上限，超过后单张牌计数可能溢出。
pub const MAX_POOL_COPIES: i32 = 1000;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GameSettings {
    pub allow_command: bool,
    pub exit_on_all_human_dead: bool,
    pub wait_for_ai_thinking: bool,
    pub debug: bool,
    pub start_health: i32,
    pub max_health: i32,
    /// 初始牌池包含的默认牌表份数，0 视为 1。
    pub pool_copies: i32,
}

impl GameSettings {
    pub fn from_json(json: &str) -> Result<Self, RuleError> {
        let settings: GameSettings =
            serde_json::from_str(json).map_err(|error| RuleError::InvalidArgument {
                reason: format!("invalid settings: {error}"),
            })?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn with_flag(mut self, key: &str) -> Result<Self, RuleError> {
        self.set_flag(key, true)?;
        Ok(self)
    }

    pub fn with_value(mut self, key: &str, value: i32) -> Result<Self, RuleError> {
        self.set_value(key, value)?;
        Ok(self)
    }

    /// 未知键读作 `false`。
    pub fn flag(&self, key: &str) -> bool {
        match key {
            ALLOW_COMMAND => self.allow_command,
            EXIT_ON_ALL_HUMAN_DEAD => self.exit_on_all_human_dead,
            WAIT_FOR_AI_THINKING => self.wait_for_ai_thinking,
            DEBUG => self.debug,
            _ => false,
        }
    }

    /// 未知键读作 `0`。
    pub fn value(&self, key: &str) -> i32 {
        match key {
            START_HEALTH => self.start_health,
            MAX_HEALTH => self.max_health,
            POOL_COPIES => self.pool_copies,
            _ => 0,
        }
    }

    pub fn set_flag(&mut self, key: &str, enabled: bool) -> Result<(), RuleError> {
        let slot = match key {
            ALLOW_COMMAND => &mut self.allow_command,
            EXIT_ON_ALL_HUMAN_DEAD => &mut self.exit_on_all_human_dead,
            WAIT_FOR_AI_THINKING => &mut self.wait_for_ai_thinking,
            DEBUG => &mut self.debug,
            _ => {
                return Err(RuleError::InvalidArgument {
                    reason: format!("unknown flag setting `{key}`"),
                })
            }
        };
        *slot = enabled;
        Ok(())
    }

    pub fn set_value(&mut self, key: &str, value: i32) -> Result<(), RuleError> {
        let slot = match key {
            START_HEALTH => &mut self.start_health,
            MAX_HEALTH => &mut self.max_health,
            POOL_COPIES => &mut self.pool_copies,
            _ => {
                return Err(RuleError::InvalidArgument {
                    reason: format!("unknown value setting `{key}`"),
                })
            }
        };
        *slot = value;
        Ok(())
    }

    pub fn start_health(&self) -> i32 {
        if self.start_health == 0 {
            DEFAULT_HEALTH
        } else {
            self.start_health
        }
    }

    pub fn max_health(&self) -> i32 {
        if self.max_health == 0 {
            self.start_health()
        } else {
            self.max_health
        }
    }

    pub fn pool_copies(&self) -> usize {
        self.pool_copies.max(1) as usize
    }

    pub fn validate(&self) -> Result<(), RuleError> {
        let start = self.start_health();
        let max = self.max_health();
        if start <= 0 || max <= 0 || max < start {
            return Err(RuleError::InvalidHealthConfiguration {
                start_health: self.start_health,
                max_health: self.max_health,
            });
        }
        if !(0..=MAX_POOL_COPIES).contains(&self.pool_copies) {
            return Err(RuleError::InvalidArgument {
                reason: format!(
                    "pool_copies must be within 0..={MAX_POOL_COPIES}, got {}",
                    self.pool_copies
                ),
            });
        }
        Ok(())
    }
}
