//! 玩家：生命、手牌、出牌位、效果、床与床防御。

use log::debug;
use serde::{Deserialize, Serialize};

use crate::ai::AiLevel;

use super::bed::BedDefense;
use super::card::{
    Card, DamageType, APPLE, BED, ENCHANTED_GOLDEN_APPLE, GOLDEN_APPLE, POTION_OF_INSTANT_DAMAGE,
    POTION_PREFIX, SHIELD,
};
use super::effects::{Effect, EffectKind, EFFECT_EXTENSION};
use super::health::{Damage, DamageOutcome, Defense, Health, SHIELD_CHARGES};
use super::rules::RuleError;
use super::state::{GameEvent, PlayerId};

/// 当前出牌位上的卡牌。`forced` 表示由延迟攻击等强制使用，不进入弃牌堆。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActiveCard {
    pub card: Card,
    #[serde(default)]
    pub forced: bool,
}

/// 已到期、等待本玩家下次行动时结算的延迟攻击。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReadyAttack {
    pub card: Card,
    pub target: PlayerId,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub health: Health,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hand: Vec<Card>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<ActiveCard>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub effects: Vec<Effect>,
    #[serde(default)]
    pub power: i32,
    pub ai_level: AiLevel,
    #[serde(default)]
    pub bedded: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bed_defenses: Vec<BedDefense>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ready_attacks: Vec<ReadyAttack>,
}

impl Player {
    pub fn new(
        id: PlayerId,
        name: impl Into<String>,
        ai_level: AiLevel,
        start_health: i32,
        max_health: i32,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            health: Health::new(id, start_health, max_health),
            hand: Vec::new(),
            active: None,
            effects: Vec::new(),
            power: 0,
            ai_level,
            bedded: false,
            bed_defenses: Vec::new(),
            ready_attacks: Vec::new(),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.health.is_alive()
    }

    pub fn is_human(&self) -> bool {
        self.ai_level == AiLevel::Human
    }

    pub fn add_cards(&mut self, cards: impl IntoIterator<Item = Card>) {
        for card in cards {
            debug!("{} received card: {card}", self.name);
            self.hand.push(card);
        }
    }

    pub fn has_card(&self, card: &Card) -> bool {
        self.hand.contains(card)
    }

    pub fn take_from_hand(&mut self, card: &Card) -> Option<Card> {
        let index = self.hand.iter().position(|held| held == card)?;
        Some(self.hand.remove(index))
    }

    pub fn cards_matching(&self, filter: impl Fn(&Card) -> bool) -> Vec<Card> {
        self.hand.iter().filter(|card| filter(card)).cloned().collect()
    }

    pub fn health_boost_level(&self) -> i32 {
        self.effects
            .iter()
            .filter(|effect| effect.kind == EffectKind::HealthBoost)
            .map(|effect| effect.level)
            .max()
            .unwrap_or(0)
    }

    pub fn heal(&mut self, value: i32) -> Result<Vec<GameEvent>, RuleError> {
        let boost = self.health_boost_level();
        let healed = self.health.heal(value, boost)?;
        debug!(
            "{} healed {healed} HP, now has {} HP",
            self.name, self.health.current
        );
        Ok(vec![GameEvent::Healed {
            player_id: self.id,
            amount: healed,
            health: self.health.current,
        }])
    }

    /// 结算一次伤害：防御、扣血、破盾、爆炸波及床，最后处理死亡或床复活。
    pub fn receive_damage(&mut self, damage: &Damage) -> Result<Vec<GameEvent>, RuleError> {
        let mut events = Vec::new();

        if damage.is_command_kill() {
            self.health.current = 0;
            debug!("{} was killed by {}", self.name, damage.source());
            events.push(GameEvent::DamageResolved {
                player_id: self.id,
                amount: damage.amount(),
                damage_type: damage.damage_type(),
                source: damage.source().to_string(),
                health: self.health.current,
            });
            self.hand.clear();
            self.effects.clear();
            events.push(GameEvent::PlayerDied { player_id: self.id });
            return Ok(events);
        }

        if damage.amount() <= 0 {
            return Err(RuleError::InvalidDamage {
                amount: damage.amount(),
            });
        }

        match self.health.take(damage) {
            DamageOutcome::Absorbed { charges_left } => {
                debug!("{}'s defense blocked {} damage", self.name, damage.source());
                events.push(GameEvent::DamageAbsorbed {
                    player_id: self.id,
                    amount: damage.amount(),
                    source: damage.source().to_string(),
                    charges_left,
                });
                return Ok(events);
            }
            DamageOutcome::Taken { shield_broken } => {
                debug!(
                    "{} took {} {:?} damage from {}, now has {} HP",
                    self.name,
                    damage.amount(),
                    damage.damage_type(),
                    damage.source(),
                    self.health.current
                );
                events.push(GameEvent::DamageResolved {
                    player_id: self.id,
                    amount: damage.amount(),
                    damage_type: damage.damage_type(),
                    source: damage.source().to_string(),
                    health: self.health.current,
                });
                if shield_broken {
                    events.push(GameEvent::DefenseBroken { player_id: self.id });
                }
            }
        }

        let lethal = !self.health.is_alive();
        // 致命一击时由复活消耗床，不再单独炸床。
        if damage.damage_type() == DamageType::Explosive && self.bedded && !lethal {
            events.extend(self.strike_bed(&Card::named(damage.source())));
        }

        if lethal {
            events.extend(self.handle_death());
        }
        Ok(events)
    }

    fn handle_death(&mut self) -> Vec<GameEvent> {
        self.hand.clear();
        self.effects.clear();
        if self.bedded {
            self.health.revive();
            self.bedded = false;
            self.bed_defenses.clear();
            debug!("{} revived with a bed", self.name);
            vec![GameEvent::PlayerRevived {
                player_id: self.id,
                health: self.health.current,
            }]
        } else {
            debug!("{} is dead", self.name);
            vec![GameEvent::PlayerDied { player_id: self.id }]
        }
    }

    /// 用工具攻击自己的床：没有防御时床直接被破坏，否则作用于最上层防御。
    pub fn strike_bed(&mut self, tool: &Card) -> Vec<GameEvent> {
        let Some(top) = self.bed_defenses.last_mut() else {
            if !self.bedded {
                return Vec::new();
            }
            self.bedded = false;
            debug!("{}'s bed was destroyed by {tool}", self.name);
            return vec![GameEvent::BedDestroyed {
                player_id: self.id,
                source: tool.name().to_string(),
            }];
        };

        if !top.can_be_destroyed_by(tool) {
            return Vec::new();
        }
        let name = top.name.clone();
        if top.wear() {
            self.bed_defenses.pop();
            debug!("{}'s {name} destroyed by {tool}", self.name);
            vec![GameEvent::BedDefenseDestroyed {
                player_id: self.id,
                name,
            }]
        } else {
            let charges_left = top.charges;
            debug!("{}'s {name} damaged by {tool}", self.name);
            vec![GameEvent::BedDefenseWorn {
                player_id: self.id,
                name,
                charges_left,
            }]
        }
    }

    pub fn place_bed_defense(&mut self, card: &Card) -> Result<Vec<GameEvent>, RuleError> {
        let defense = BedDefense::from_card(card, self.id).ok_or_else(|| {
            RuleError::InvalidArgument {
                reason: format!("{card} cannot defend a bed"),
            }
        })?;
        let event = GameEvent::BedDefensePlaced {
            player_id: self.id,
            name: defense.name.clone(),
            charges: defense.charges,
        };
        self.bed_defenses.push(defense);
        Ok(vec![event])
    }

    /// 获得效果；已有同名效果时只延长持续时间。
    pub fn grant_effect(&mut self, kind: EffectKind, duration: i32, level: i32) -> GameEvent {
        if let Some(existing) = self.effects.iter_mut().find(|effect| effect.kind == kind) {
            existing.duration += EFFECT_EXTENSION;
            debug!("{} extended effect {kind} by {EFFECT_EXTENSION} turns", self.name);
            return GameEvent::EffectExtended {
                player_id: self.id,
                effect: kind,
                duration: existing.duration,
            };
        }
        self.push_effect(kind, duration, level)
    }

    fn push_effect(&mut self, kind: EffectKind, duration: i32, level: i32) -> GameEvent {
        debug!(
            "effect '{kind}' (level {level}) applied to {} for {duration} turns",
            self.name
        );
        self.effects.push(Effect::new(self.id, kind, duration, level));
        GameEvent::EffectApplied {
            player_id: self.id,
            effect: kind,
            duration,
            level,
        }
    }

    /// 立即生效的自用卡：盾牌、床、食物与药水。
    pub fn consume(&mut self, card: &Card) -> Result<Vec<GameEvent>, RuleError> {
        let mut events = Vec::new();
        match card.name() {
            SHIELD => {
                self.health.equip(Defense::Shield, SHIELD_CHARGES);
                events.push(GameEvent::DefenseEquipped {
                    player_id: self.id,
                    charges: SHIELD_CHARGES,
                });
            }
            BED => {
                self.bedded = true;
                events.push(GameEvent::BedPlaced { player_id: self.id });
            }
            APPLE => events.extend(self.heal(1)?),
            GOLDEN_APPLE => {
                events.push(self.push_effect(EffectKind::Healing, 1, 1));
                events.push(self.push_effect(EffectKind::HealthBoost, 3, 1));
                events.extend(self.heal(1)?);
            }
            ENCHANTED_GOLDEN_APPLE => {
                events.push(self.push_effect(EffectKind::Healing, 2, 2));
                events.push(self.push_effect(EffectKind::HealthBoost, 5, 2));
                events.extend(self.heal(3)?);
            }
            name => {
                let effect = name.strip_prefix(POTION_PREFIX).ok_or_else(|| {
                    RuleError::InvalidArgument {
                        reason: format!("{card} cannot be used on yourself"),
                    }
                })?;
                let kind: EffectKind = effect.parse()?;
                events.push(self.grant_effect(kind, 2, 1));
            }
        }
        Ok(events)
    }

    fn apply_effect(&mut self, effect: &Effect) -> Result<Vec<GameEvent>, RuleError> {
        match effect.kind {
            EffectKind::Healing => self.heal(effect.level),
            EffectKind::Power => {
                self.power = effect.level;
                Ok(vec![GameEvent::PowerChanged {
                    player_id: self.id,
                    power: self.power,
                }])
            }
            EffectKind::InstantDamage => {
                let damage =
                    Damage::new(effect.level, DamageType::Magical, POTION_OF_INSTANT_DAMAGE)?;
                self.receive_damage(&damage)
            }
            EffectKind::HealthBoost => Ok(Vec::new()),
        }
    }

    /// 回合结束：清空临时攻击力，依次结算并推进每个效果。
    pub fn after_turn(&mut self) -> Result<Vec<GameEvent>, RuleError> {
        self.power = 0;
        let mut events = Vec::new();
        let mut index = 0;
        while index < self.effects.len() {
            let effect = self.effects[index].clone();
            events.extend(self.apply_effect(&effect)?);
            // 死亡会清空效果列表
            if index >= self.effects.len() {
                break;
            }
            if self.effects[index].tick() {
                let expired = self.effects.remove(index);
                debug!("effect '{}' expired on {}", expired.kind, self.name);
                events.push(GameEvent::EffectExpired {
                    player_id: self.id,
                    effect: expired.kind,
                });
            } else {
                index += 1;
            }
        }
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(health: i32) -> Player {
        Player::new(0, "Alex", AiLevel::Human, health, 5)
    }

    fn damage(amount: i32, damage_type: DamageType, source: &str) -> Damage {
        Damage::new(amount, damage_type, source).expect("valid damage")
    }

    #[test]
    fn unprotected_player_loses_health_silently() {
        let mut alex = player(5);
        let events = alex
            .receive_damage(&damage(3, DamageType::Physical, "Diamond Sword"))
            .expect("damage applies");

        assert_eq!(alex.health.current, 2);
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], GameEvent::DamageResolved { health: 2, .. }));
    }

    #[test]
    fn shield_absorbs_a_full_hit() {
        let mut alex = player(5);
        alex.consume(&Card::named(SHIELD)).expect("shield equips");

        alex.receive_damage(&damage(3, DamageType::Physical, "Diamond Sword"))
            .expect("damage applies");

        assert_eq!(alex.health.current, 5);
        assert_eq!(alex.health.defense_charges, 2);
    }

    #[test]
    fn bed_revives_from_lethal_explosion() {
        let mut alex = player(1);
        alex.bedded = true;
        alex.add_cards([Card::named(APPLE)]);

        let events = alex
            .receive_damage(&damage(2, DamageType::Explosive, "TNT"))
            .expect("damage applies");

        assert_eq!(alex.health.current, 5);
        assert!(!alex.bedded);
        assert!(alex.hand.is_empty(), "death clears the hand");
        assert!(events
            .iter()
            .any(|event| matches!(event, GameEvent::PlayerRevived { health: 5, .. })));
    }

    #[test]
    fn bed_revival_keeps_an_unbroken_shield() {
        let mut alex = player(1);
        alex.bedded = true;
        alex.consume(&Card::named(SHIELD)).expect("shield equips");

        alex.receive_damage(&damage(2, DamageType::Magical, POTION_OF_INSTANT_DAMAGE))
            .expect("damage applies");

        assert_eq!(alex.health.current, 5);
        assert!(!alex.bedded);
        assert_eq!(alex.health.defense, Some(Defense::Shield));
        assert_eq!(alex.health.defense_charges, 3);
    }

    #[test]
    fn explosion_destroys_an_undefended_bed() {
        let mut alex = player(5);
        alex.bedded = true;

        alex.receive_damage(&damage(2, DamageType::Explosive, "TNT"))
            .expect("damage applies");

        assert_eq!(alex.health.current, 3);
        assert!(!alex.bedded);
    }

    #[test]
    fn explosion_wears_blast_resistant_defense_first() {
        let mut alex = player(5);
        alex.bedded = true;
        alex.place_bed_defense(&Card::named("Glass"))
            .expect("glass defends");

        let events = alex
            .receive_damage(&damage(3, DamageType::Explosive, "TNT"))
            .expect("damage applies");

        assert!(alex.bedded);
        assert!(alex.bed_defenses.is_empty());
        assert!(events
            .iter()
            .any(|event| matches!(event, GameEvent::BedDefenseDestroyed { .. })));
    }

    #[test]
    fn axe_breaks_shield_after_damage_lands() {
        let mut alex = player(5);
        alex.health.equip(Defense::Shield, 0);

        let events = alex
            .receive_damage(&damage(2, DamageType::Physical, "Iron Axe"))
            .expect("damage applies");

        assert_eq!(alex.health.current, 3);
        assert_eq!(alex.health.defense, None);
        assert!(events
            .iter()
            .any(|event| matches!(event, GameEvent::DefenseBroken { .. })));
    }

    #[test]
    fn death_without_bed_is_final() {
        let mut alex = player(2);
        alex.grant_effect(EffectKind::Power, 2, 1);

        let events = alex
            .receive_damage(&damage(4, DamageType::Physical, "Netherite Sword"))
            .expect("damage applies");

        assert!(!alex.is_alive());
        assert!(alex.effects.is_empty());
        assert!(matches!(events.last(), Some(GameEvent::PlayerDied { .. })));
    }

    #[test]
    fn command_kill_bypasses_shield_and_bed() {
        let mut alex = player(5);
        alex.bedded = true;
        alex.health.equip(Defense::Shield, 3);

        alex.receive_damage(&damage(-1, DamageType::Command, "/kill"))
            .expect("kill applies");

        assert_eq!(alex.health.current, 0);
        assert!(!alex.is_alive());
    }

    #[test]
    fn repeated_potion_extends_instead_of_stacking() {
        let mut alex = player(3);
        alex.consume(&Card::named("Potion of Healing")).expect("potion");
        let event = alex
            .consume(&Card::named("Potion of Healing"))
            .expect("potion");

        assert_eq!(alex.effects.len(), 1);
        assert_eq!(alex.effects[0].duration, 4);
        assert!(matches!(event[0], GameEvent::EffectExtended { duration: 4, .. }));
    }

    #[test]
    fn golden_apple_raises_the_healing_cap() {
        let mut alex = player(5);
        alex.consume(&Card::named(GOLDEN_APPLE)).expect("apple");

        assert_eq!(alex.health.current, 6, "health boost lifts the cap by 1");
        assert_eq!(alex.health_boost_level(), 1);
    }

    #[test]
    fn effects_tick_and_expire() {
        let mut alex = player(2);
        alex.grant_effect(EffectKind::Healing, 2, 1);

        alex.after_turn().expect("tick");
        assert_eq!(alex.health.current, 3);
        assert_eq!(alex.effects.len(), 1);

        let events = alex.after_turn().expect("tick");
        assert_eq!(alex.health.current, 4);
        assert!(alex.effects.is_empty());
        assert!(events
            .iter()
            .any(|event| matches!(event, GameEvent::EffectExpired { .. })));
    }

    #[test]
    fn power_effect_overwrites_buff_each_tick() {
        let mut alex = player(5);
        alex.power = 7;
        alex.grant_effect(EffectKind::Power, 1, 2);

        alex.after_turn().expect("tick");
        assert_eq!(alex.power, 2);
        alex.after_turn().expect("tick");
        assert_eq!(alex.power, 0);
    }

    #[test]
    fn instant_damage_effect_can_kill() {
        let mut alex = player(1);
        alex.grant_effect(EffectKind::InstantDamage, 3, 2);
        alex.grant_effect(EffectKind::Healing, 3, 1);

        alex.after_turn().expect("tick");

        assert!(!alex.is_alive());
        assert!(alex.effects.is_empty());
    }
}
