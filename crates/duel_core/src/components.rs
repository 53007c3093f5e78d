//! Combat component definitions.
//!
//! Components are pure data with no behavior beyond small derived values.
//! Combatants are composed of these components.

use serde::{Deserialize, Serialize};

// ============================================================================
// Zones
// ============================================================================

/// Body part used both as an attack target and as a defended zone.
///
/// A melee attack is blocked exactly when the attacker's target zone equals
/// the defender's defended zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BodyPart {
    /// Head.
    Head,
    /// Torso.
    Torso,
    /// Arms.
    Arms,
    /// Legs.
    Legs,
}

impl BodyPart {
    /// All zones in menu order.
    pub const ALL: [Self; 4] = [Self::Head, Self::Torso, Self::Arms, Self::Legs];

    /// Zone for a menu index (0..4).
    #[must_use]
    pub const fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::Head),
            1 => Some(Self::Torso),
            2 => Some(Self::Arms),
            3 => Some(Self::Legs),
            _ => None,
        }
    }

    /// Menu index of this zone.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Head => 0,
            Self::Torso => 1,
            Self::Arms => 2,
            Self::Legs => 3,
        }
    }

    /// Lowercase display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Head => "head",
            Self::Torso => "torso",
            Self::Arms => "arms",
            Self::Legs => "legs",
        }
    }
}

// ============================================================================
// Items
// ============================================================================

/// Item classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemKind {
    /// Occupies the weapon slot; adds to effective strength.
    Weapon,
    /// Occupies the armor slot; defense bonus is tracked only.
    Armor,
    /// Consumed on use; restores HP and/or mana.
    Consumable,
    /// Quest or trophy item; cannot be used in combat.
    Special,
}

impl ItemKind {
    /// Whether items of this kind go into an equipment slot.
    #[must_use]
    pub const fn is_equippable(self) -> bool {
        matches!(self, Self::Weapon | Self::Armor)
    }
}

/// An inventory item.
///
/// Bonus fields default to zero so data files only list what applies.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Item {
    /// Display name.
    pub name: String,
    /// Item classification.
    pub kind: ItemKind,
    /// Attack bonus while equipped (weapons).
    #[serde(default)]
    pub attack: i32,
    /// Defense bonus while equipped (armor).
    #[serde(default)]
    pub defense: i32,
    /// HP restored when consumed.
    #[serde(default)]
    pub restore_hp: i32,
    /// Mana restored when consumed.
    #[serde(default)]
    pub restore_mana: i32,
    /// Merchant price in gold.
    #[serde(default)]
    pub price: i32,
}

impl Item {
    /// Create a weapon with the given attack bonus.
    #[must_use]
    pub fn weapon(name: impl Into<String>, attack: i32) -> Self {
        Self {
            attack,
            ..Self::blank(name, ItemKind::Weapon)
        }
    }

    /// Create armor with the given defense bonus.
    #[must_use]
    pub fn armor(name: impl Into<String>, defense: i32) -> Self {
        Self {
            defense,
            ..Self::blank(name, ItemKind::Armor)
        }
    }

    /// Create a consumable restoring HP and mana.
    #[must_use]
    pub fn consumable(name: impl Into<String>, restore_hp: i32, restore_mana: i32) -> Self {
        Self {
            restore_hp,
            restore_mana,
            ..Self::blank(name, ItemKind::Consumable)
        }
    }

    /// Builder method to set the merchant price.
    #[must_use]
    pub fn with_price(mut self, price: i32) -> Self {
        self.price = price;
        self
    }

    fn blank(name: impl Into<String>, kind: ItemKind) -> Self {
        Self {
            name: name.into(),
            kind,
            attack: 0,
            defense: 0,
            restore_hp: 0,
            restore_mana: 0,
            price: 0,
        }
    }
}

// ============================================================================
// Abilities
// ============================================================================

/// Ability classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AbilityKind {
    /// Unblockable damage to the opponent.
    Damage,
    /// Restores the caster's HP.
    Heal,
    /// Permanently raises the caster's attack/defense accumulators.
    Buff,
}

/// A castable ability.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ability {
    /// Display name.
    pub name: String,
    /// Flavor description.
    #[serde(default)]
    pub description: String,
    /// Ability classification.
    pub kind: AbilityKind,
    /// Mana deducted on cast.
    pub mana_cost: i32,
    /// Base damage (Damage abilities); half the caster's strength is added.
    #[serde(default)]
    pub damage: i32,
    /// HP restored to the caster (Heal abilities).
    #[serde(default)]
    pub heal: i32,
    /// Attack added to the caster's accumulator (Buff abilities).
    #[serde(default)]
    pub attack_buff: i32,
    /// Defense added to the caster's accumulator (Buff abilities).
    #[serde(default)]
    pub defense_buff: i32,
}

impl Ability {
    /// Create a damage ability.
    #[must_use]
    pub fn damage(name: impl Into<String>, damage: i32, mana_cost: i32) -> Self {
        Self {
            damage,
            ..Self::blank(name, AbilityKind::Damage, mana_cost)
        }
    }

    /// Create a heal ability.
    #[must_use]
    pub fn heal(name: impl Into<String>, heal: i32, mana_cost: i32) -> Self {
        Self {
            heal,
            ..Self::blank(name, AbilityKind::Heal, mana_cost)
        }
    }

    /// Create a buff ability.
    #[must_use]
    pub fn buff(name: impl Into<String>, attack: i32, defense: i32, mana_cost: i32) -> Self {
        Self {
            attack_buff: attack,
            defense_buff: defense,
            ..Self::blank(name, AbilityKind::Buff, mana_cost)
        }
    }

    fn blank(name: impl Into<String>, kind: AbilityKind, mana_cost: i32) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            kind,
            mana_cost,
            damage: 0,
            heal: 0,
            attack_buff: 0,
            defense_buff: 0,
        }
    }
}

// ============================================================================
// Buffs
// ============================================================================

/// Additive attack/defense totals granted by buff abilities.
///
/// Buffs never decay: once applied they last for the rest of the session,
/// including across campaign chapters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Buffs {
    /// Added to effective strength.
    pub attack: i32,
    /// Tracked but not consumed by damage calculation.
    pub defense: i32,
}

impl Buffs {
    /// Accumulate an ability's buff amounts.
    pub fn apply(&mut self, ability: &Ability) {
        self.attack += ability.attack_buff;
        self.defense += ability.defense_buff;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zone_index_roundtrip() {
        for zone in BodyPart::ALL {
            assert_eq!(BodyPart::from_index(zone.index()), Some(zone));
        }
        assert_eq!(BodyPart::from_index(4), None);
    }

    #[test]
    fn test_item_builders() {
        let sword = Item::weapon("Serpent Fang", 18).with_price(125);
        assert_eq!(sword.kind, ItemKind::Weapon);
        assert_eq!(sword.attack, 18);
        assert_eq!(sword.price, 125);

        let potion = Item::consumable("Small Health Potion", 20, 0);
        assert!(!potion.kind.is_equippable());
        assert_eq!(potion.restore_hp, 20);
    }

    #[test]
    fn test_buffs_accumulate() {
        let mut buffs = Buffs::default();
        buffs.apply(&Ability::buff("Golden Aegis", 15, 15, 20));
        buffs.apply(&Ability::buff("Storm Mark", 10, 0, 10));
        assert_eq!(buffs.attack, 25);
        assert_eq!(buffs.defense, 15);
    }
}
