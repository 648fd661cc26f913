use serde::{Deserialize, Serialize};

use super::card::{DamageType, COMMAND_KILL_DAMAGE};
use super::rules::RuleError;
use super::state::PlayerId;

pub const SHIELD_CHARGES: u32 = 3;

/// 一次伤害：数值、类型与来源物品。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Damage {
    amount: i32,
    damage_type: DamageType,
    source: String,
}

impl Damage {
    pub fn new(
        amount: i32,
        damage_type: DamageType,
        source: impl Into<String>,
    ) -> Result<Self, RuleError> {
        let command_kill = amount == COMMAND_KILL_DAMAGE && damage_type == DamageType::Command;
        if amount <= 0 && !command_kill {
            return Err(RuleError::InvalidDamage { amount });
        }
        Ok(Self {
            amount,
            damage_type,
            source: source.into(),
        })
    }

    pub fn amount(&self) -> i32 {
        self.amount
    }

    pub fn damage_type(&self) -> DamageType {
        self.damage_type
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn is_command_kill(&self) -> bool {
        self.damage_type == DamageType::Command && self.amount == COMMAND_KILL_DAMAGE
    }

    /// 来源是否为斧类武器（镐不算）。
    pub fn from_axe(&self) -> bool {
        self.source.ends_with(" Axe")
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Defense {
    Shield,
}

impl Defense {
    pub fn mitigates(&self, damage_type: DamageType) -> bool {
        match self {
            Defense::Shield => !matches!(damage_type, DamageType::Magical | DamageType::Command),
        }
    }
}

/// 防御与扣血两步的结果，尚未处理床与死亡。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageOutcome {
    Absorbed { charges_left: u32 },
    Taken { shield_broken: bool },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Health {
    pub owner: PlayerId,
    pub current: i32,
    pub max: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defense: Option<Defense>,
    #[serde(default)]
    pub defense_charges: u32,
}

impl Health {
    pub fn new(owner: PlayerId, current: i32, max: i32) -> Self {
        Self {
            owner,
            current,
            max,
            defense: None,
            defense_charges: 0,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.current > 0
    }

    pub fn equip(&mut self, defense: Defense, charges: u32) {
        self.defense = Some(defense);
        self.defense_charges = charges;
    }

    pub fn clear_defense(&mut self) {
        self.defense = None;
        self.defense_charges = 0;
    }

    pub fn has_defense(&self) -> bool {
        self.defense.is_some() && self.defense_charges > 0
    }

    /// 防御判定与扣血。指令秒杀由调用方单独处理。
    pub fn take(&mut self, damage: &Damage) -> DamageOutcome {
        if let Some(defense) = self.defense {
            if defense.mitigates(damage.damage_type()) && self.defense_charges > 0 {
                self.defense_charges -= 1;
                if self.defense_charges == 0 {
                    self.defense = None;
                }
                return DamageOutcome::Absorbed {
                    charges_left: self.defense_charges,
                };
            }
        }

        self.current -= damage.amount();

        let shield_broken = self.defense == Some(Defense::Shield)
            && (damage.from_axe() || damage.damage_type() == DamageType::Explosive);
        if shield_broken {
            self.clear_defense();
        }
        DamageOutcome::Taken { shield_broken }
    }

    /// 治疗，上限为 `max + boost`。返回实际恢复量。
    pub fn heal(&mut self, value: i32, boost: i32) -> Result<i32, RuleError> {
        if value <= 0 {
            return Err(RuleError::InvalidHealAmount { amount: value });
        }
        let cap = self.max + boost.max(0);
        let before = self.current;
        self.current = (self.current + value).min(cap.max(before));
        Ok(self.current - before)
    }

    /// 床复活只回满血量，盾牌保持原样。
    pub fn revive(&mut self) {
        self.current = self.max;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn physical(amount: i32) -> Damage {
        Damage::new(amount, DamageType::Physical, "Iron Sword").expect("valid damage")
    }

    #[test]
    fn non_positive_damage_is_rejected() {
        assert!(matches!(
            Damage::new(0, DamageType::Physical, "Wooden Pickaxe"),
            Err(RuleError::InvalidDamage { amount: 0 })
        ));
        assert!(Damage::new(-1, DamageType::Physical, "x").is_err());
        let kill = Damage::new(-1, DamageType::Command, "/kill").expect("sentinel is valid");
        assert!(kill.is_command_kill());
    }

    #[test]
    fn charged_shield_absorbs_and_loses_one_charge() {
        let mut health = Health::new(0, 5, 5);
        health.equip(Defense::Shield, SHIELD_CHARGES);

        let outcome = health.take(&physical(3));

        assert_eq!(outcome, DamageOutcome::Absorbed { charges_left: 2 });
        assert_eq!(health.current, 5);
    }

    #[test]
    fn exhausted_shield_lets_damage_through() {
        let mut health = Health::new(0, 5, 5);
        health.equip(Defense::Shield, 1);

        assert_eq!(
            health.take(&physical(2)),
            DamageOutcome::Absorbed { charges_left: 0 }
        );
        assert_eq!(health.defense, None, "last charge clears the defense");

        health.take(&physical(2));
        assert_eq!(health.current, 3);
    }

    #[test]
    fn magical_damage_ignores_and_keeps_shield() {
        let mut health = Health::new(0, 5, 5);
        health.equip(Defense::Shield, 3);

        let magic = Damage::new(2, DamageType::Magical, "Potion of Instant Damage")
            .expect("valid damage");
        assert_eq!(
            health.take(&magic),
            DamageOutcome::Taken {
                shield_broken: false
            }
        );
        assert_eq!(health.current, 3);
        assert_eq!(health.defense_charges, 3);
    }

    #[test]
    fn healing_respects_boosted_cap() {
        let mut health = Health::new(0, 3, 5);
        assert_eq!(health.heal(10, 0).expect("positive heal"), 2);
        assert_eq!(health.current, 5);
        assert_eq!(health.heal(4, 2).expect("positive heal"), 2);
        assert_eq!(health.current, 7);
        assert!(matches!(
            health.heal(0, 0),
            Err(RuleError::InvalidHealAmount { amount: 0 })
        ));
    }
}
