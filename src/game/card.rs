//! 卡牌与静态规则表。卡牌只是一个名字，所有规则都由名字查表得出。

use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use super::rules::RuleError;
use super::settings::GameSettings;

/// 以此字符开头的卡牌为指令卡。
pub const COMMAND_MARKER: char = '/';
pub const KILL_COMMAND: &str = "/kill";
/// 指令卡的秒杀伤害值。
pub const COMMAND_KILL_DAMAGE: i32 = -1;

pub const SHIELD: &str = "Shield";
pub const BED: &str = "Bed";
pub const APPLE: &str = "Apple";
pub const GOLDEN_APPLE: &str = "Golden Apple";
pub const ENCHANTED_GOLDEN_APPLE: &str = "Enchanted Golden Apple";
pub const POTION_OF_HEALING: &str = "Potion of Healing";
pub const POTION_OF_POWER: &str = "Potion of Power";
pub const POTION_OF_HEALTH_BOOST: &str = "Potion of Health Boost";
pub const POTION_OF_INSTANT_DAMAGE: &str = "Potion of Instant Damage";
pub const POTION_PREFIX: &str = "Potion of ";
pub const TRIDENT: &str = "Trident";
pub const DAMAGED_TRIDENT: &str = "Damaged Trident";
pub const TNT: &str = "TNT";
pub const TNT_MINECART: &str = "TNT Minecart";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DamageType {
    Physical,
    Explosive,
    Magical,
    Command,
    None,
}

/// 床防御方块的类别，同时也是破坏工具的类别。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DestroyCategory {
    Explosive,
    Stone,
    Wood,
    None,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Usage {
    pub amount: i32,
    pub damage_type: DamageType,
}

impl Usage {
    const fn new(amount: i32, damage_type: DamageType) -> Self {
        Self {
            amount,
            damage_type,
        }
    }

    pub const NONE: Usage = Usage::new(0, DamageType::None);
}

/// 卡牌的破坏/防御属性。`magnitude > 0` 表示可放置的防御次数，
/// `magnitude < 0` 表示破坏工具的强度。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DefenseProfile {
    pub category: DestroyCategory,
    pub magnitude: i32,
    pub blast_resistant: bool,
}

impl DefenseProfile {
    const fn new(category: DestroyCategory, magnitude: i32, blast_resistant: bool) -> Self {
        Self {
            category,
            magnitude,
            blast_resistant,
        }
    }

    pub const NONE: DefenseProfile = DefenseProfile::new(DestroyCategory::None, 0, false);

    pub fn is_block(&self) -> bool {
        self.magnitude > 0
    }

    pub fn is_tool(&self) -> bool {
        self.magnitude < 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WeaponKind {
    Sword,
    Axe,
    Pickaxe,
}

fn quality_tier(quality: &str) -> Option<i32> {
    match quality {
        "Wooden" => Some(1),
        "Iron" => Some(2),
        "Diamond" => Some(3),
        "Netherite" => Some(4),
        _ => None,
    }
}

fn weapon_kind(name: &str) -> Option<(WeaponKind, &str)> {
    if let Some(quality) = name.strip_suffix(" Sword") {
        Some((WeaponKind::Sword, quality))
    } else if let Some(quality) = name.strip_suffix(" Pickaxe") {
        Some((WeaponKind::Pickaxe, quality))
    } else if let Some(quality) = name.strip_suffix(" Axe") {
        Some((WeaponKind::Axe, quality))
    } else {
        None
    }
}

static USAGE_TABLE: Lazy<HashMap<&'static str, Usage>> = Lazy::new(|| {
    HashMap::from([
        (TNT, Usage::new(3, DamageType::Explosive)),
        (POTION_OF_INSTANT_DAMAGE, Usage::new(2, DamageType::Magical)),
        (TRIDENT, Usage::new(3, DamageType::Physical)),
        (DAMAGED_TRIDENT, Usage::new(1, DamageType::Physical)),
        (TNT_MINECART, Usage::new(2, DamageType::Explosive)),
    ])
});

static BLOCK_TABLE: Lazy<HashMap<&'static str, DefenseProfile>> = Lazy::new(|| {
    HashMap::from([
        ("Wooden Block", DefenseProfile::new(DestroyCategory::Wood, 2, false)),
        ("Stone Block", DefenseProfile::new(DestroyCategory::Stone, 2, false)),
        ("Obsidian Block", DefenseProfile::new(DestroyCategory::Stone, 5, true)),
        ("Glass", DefenseProfile::new(DestroyCategory::None, 1, true)),
    ])
});

/// 延迟生效的攻击卡及其延迟回合数。
static ATTACK_DELAYS: Lazy<HashMap<&'static str, u32>> =
    Lazy::new(|| HashMap::from([(TNT_MINECART, 2)]));

const TARGETED: [&str; 5] = [
    POTION_OF_INSTANT_DAMAGE,
    TNT,
    TNT_MINECART,
    TRIDENT,
    DAMAGED_TRIDENT,
];

/// 牌池重置时使用的默认牌表。
pub const DEFAULT_CATALOG: [(&str, u32); 27] = [
    ("Wooden Sword", 5),
    ("Iron Sword", 4),
    ("Diamond Sword", 2),
    ("Netherite Sword", 1),
    ("Wooden Axe", 4),
    ("Iron Axe", 3),
    ("Diamond Axe", 2),
    ("Netherite Axe", 1),
    (TNT, 3),
    (APPLE, 4),
    (GOLDEN_APPLE, 2),
    (ENCHANTED_GOLDEN_APPLE, 1),
    (POTION_OF_HEALING, 2),
    (POTION_OF_POWER, 1),
    (SHIELD, 3),
    (BED, 1),
    (TRIDENT, 3),
    (TNT_MINECART, 3),
    (POTION_OF_INSTANT_DAMAGE, 2),
    ("Wooden Pickaxe", 5),
    ("Iron Pickaxe", 4),
    ("Diamond Pickaxe", 2),
    ("Netherite Pickaxe", 1),
    ("Wooden Block", 4),
    ("Stone Block", 4),
    ("Obsidian Block", 1),
    ("Glass", 2),
];

/// 卡牌是不可变的值类型，按名字比较与哈希。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct Card {
    name: String,
}

impl Card {
    /// 按对局设置校验并创建卡牌。
    pub fn new(name: impl Into<String>, settings: &GameSettings) -> Result<Self, RuleError> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(RuleError::InvalidArgument {
                reason: "card name must not be empty".into(),
            });
        }
        if name.starts_with(COMMAND_MARKER) && !settings.allow_command {
            return Err(RuleError::CommandNotAllowed { card: name });
        }
        if let Some((_, quality)) = weapon_kind(&name) {
            if quality_tier(quality).is_none() {
                return Err(RuleError::UnknownCard { name });
            }
        }
        Ok(Self { name })
    }

    /// 内部使用：名字已知合法（来自牌表或规则）。
    pub(crate) fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_command(&self) -> bool {
        self.name.starts_with(COMMAND_MARKER)
    }

    fn weapon(&self) -> Option<(WeaponKind, i32)> {
        let (kind, quality) = weapon_kind(&self.name)?;
        Some((kind, quality_tier(quality)?))
    }

    pub fn is_axe(&self) -> bool {
        matches!(self.weapon(), Some((WeaponKind::Axe, _)))
    }

    /// (伤害值, 伤害类型)。指令 `/kill` 返回秒杀标记 -1。
    pub fn usage(&self) -> Usage {
        if let Some((kind, tier)) = self.weapon() {
            return match kind {
                WeaponKind::Sword | WeaponKind::Axe => Usage::new(tier, DamageType::Physical),
                WeaponKind::Pickaxe => Usage::new(tier / 2, DamageType::Physical),
            };
        }
        if self.is_command() {
            return if self.name == KILL_COMMAND {
                Usage::new(COMMAND_KILL_DAMAGE, DamageType::Command)
            } else {
                Usage::NONE
            };
        }
        USAGE_TABLE
            .get(self.name.as_str())
            .copied()
            .unwrap_or(Usage::NONE)
    }

    /// (类别, 防御次数或破坏强度, 是否防爆)。
    pub fn destroy_defense_type(&self) -> DefenseProfile {
        if let Some(profile) = BLOCK_TABLE.get(self.name.as_str()) {
            return *profile;
        }

        let usage = self.usage();
        if usage.damage_type == DamageType::Explosive {
            return DefenseProfile::new(DestroyCategory::Explosive, -usage.amount, false);
        }

        match self.weapon() {
            Some((WeaponKind::Axe, tier)) => DefenseProfile::new(DestroyCategory::Stone, -tier, false),
            Some((WeaponKind::Pickaxe, tier)) => {
                DefenseProfile::new(DestroyCategory::Wood, -tier, false)
            }
            _ => DefenseProfile::NONE,
        }
    }

    pub fn need_target(&self) -> bool {
        if self.name == KILL_COMMAND {
            return true;
        }
        matches!(
            self.weapon(),
            Some((WeaponKind::Sword, _)) | Some((WeaponKind::Axe, _))
        ) || TARGETED.contains(&self.name.as_str())
    }

    /// 对自己使用、立即生效的卡牌：盾牌、床、食物和非伤害药水。
    pub fn is_self_use(&self) -> bool {
        if self.need_target() {
            return false;
        }
        self.name == SHIELD
            || self.name == BED
            || self.name.ends_with(APPLE)
            || self.name.starts_with(POTION_PREFIX)
    }

    /// 可用于"破坏/守护床"行动的卡牌。
    pub fn is_bed_card(&self) -> bool {
        let profile = self.destroy_defense_type();
        profile.is_block() || profile.is_tool()
    }

    pub fn attack_delay(&self) -> Option<u32> {
        ATTACK_DELAYS.get(self.name.as_str()).copied()
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
