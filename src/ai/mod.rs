//! AI 模块：按等级划分的脚本决策策略。

pub mod level;
pub mod policy;

pub use level::AiLevel;
pub use policy::{ai_action, strategy_for, Strategy};
