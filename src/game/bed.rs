use serde::{Deserialize, Serialize};

use super::card::{Card, DestroyCategory};
use super::state::PlayerId;

/// 床防御栈中的一层方块。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BedDefense {
    pub owner: PlayerId,
    pub name: String,
    pub category: DestroyCategory,
    pub charges: u32,
    pub blast_resistant: bool,
}

impl BedDefense {
    /// 由方块卡创建；非方块卡返回 `None`。
    pub fn from_card(card: &Card, owner: PlayerId) -> Option<Self> {
        let profile = card.destroy_defense_type();
        if !profile.is_block() {
            return None;
        }
        let name = card
            .name()
            .strip_suffix(" Block")
            .unwrap_or(card.name())
            .to_string();
        Some(Self {
            owner,
            name,
            category: profile.category,
            charges: profile.magnitude as u32,
            blast_resistant: profile.blast_resistant,
        })
    }

    pub fn can_be_destroyed_by(&self, tool: &Card) -> bool {
        let category = tool.destroy_defense_type().category;
        if self.blast_resistant && category == DestroyCategory::Explosive {
            return true;
        }
        category != DestroyCategory::None && category == self.category && self.charges > 0
    }

    /// 受到一次破坏；返回是否已耗尽，耗尽的方块应出栈。
    pub fn wear(&mut self) -> bool {
        self.charges = self.charges.saturating_sub(1);
        self.charges == 0
    }
}
