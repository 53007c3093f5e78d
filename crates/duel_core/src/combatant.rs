//! Combatant state and snapshots.
//!
//! A [`Combatant`] owns its vitals, equipment and abilities. Every vital
//! mutation clamps the upper bound (`hp <= max_hp`, `mana <= max_mana`); the
//! lower bound is left alone so damage can push HP below zero. A combatant is
//! alive while `hp > 0`.

use serde::{Deserialize, Serialize};

use crate::components::{Ability, Buffs, Item, ItemKind};
use crate::error::{DuelError, Result};

/// Who picks this combatant's actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CombatantKind {
    /// Actions supplied by an external frontend (console, remote peer).
    #[default]
    Human,
    /// Actions chosen by the autonomous policy.
    Autonomous,
}

/// A duel participant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Combatant {
    /// Display name.
    pub name: String,
    /// Who picks this combatant's actions.
    #[serde(default)]
    pub kind: CombatantKind,
    hp: i32,
    max_hp: i32,
    mana: i32,
    max_mana: i32,
    /// Strength before buffs and weapon.
    pub base_strength: i32,
    /// Gold for the merchant.
    pub gold: i32,
    /// Carried, unequipped items.
    pub inventory: Vec<Item>,
    /// Equipped items (at most one weapon and one armor).
    pub equipment: Vec<Item>,
    /// Known abilities, indexed by position.
    pub abilities: Vec<Ability>,
    /// Permanent buff accumulators.
    pub buffs: Buffs,
}

impl Combatant {
    /// Create a combatant at full HP and mana.
    #[must_use]
    pub fn new(name: impl Into<String>, max_hp: i32, max_mana: i32, base_strength: i32) -> Self {
        Self {
            name: name.into(),
            kind: CombatantKind::Human,
            hp: max_hp,
            max_hp,
            mana: max_mana,
            max_mana,
            base_strength,
            gold: 0,
            inventory: Vec::new(),
            equipment: Vec::new(),
            abilities: Vec::new(),
            buffs: Buffs::default(),
        }
    }

    /// Builder method to mark the combatant autonomous.
    #[must_use]
    pub fn autonomous(mut self) -> Self {
        self.kind = CombatantKind::Autonomous;
        self
    }

    /// Builder method to set gold.
    #[must_use]
    pub fn with_gold(mut self, gold: i32) -> Self {
        self.gold = gold;
        self
    }

    /// Builder method to add an ability.
    #[must_use]
    pub fn with_ability(mut self, ability: Ability) -> Self {
        self.abilities.push(ability);
        self
    }

    /// Builder method to add an inventory item.
    #[must_use]
    pub fn with_item(mut self, item: Item) -> Self {
        self.inventory.push(item);
        self
    }

    /// Builder method to equip an item directly, bypassing the inventory.
    ///
    /// Replaces any equipped item of the same kind.
    #[must_use]
    pub fn with_equipped(mut self, item: Item) -> Self {
        self.equipment.retain(|equipped| equipped.kind != item.kind);
        self.equipment.push(item);
        self
    }

    // ------------------------------------------------------------------------
    // Vitals
    // ------------------------------------------------------------------------

    /// Current HP (may be negative after a lethal hit).
    #[must_use]
    pub const fn hp(&self) -> i32 {
        self.hp
    }

    /// Maximum HP.
    #[must_use]
    pub const fn max_hp(&self) -> i32 {
        self.max_hp
    }

    /// Current mana.
    #[must_use]
    pub const fn mana(&self) -> i32 {
        self.mana
    }

    /// Maximum mana.
    #[must_use]
    pub const fn max_mana(&self) -> i32 {
        self.max_mana
    }

    /// Set HP, clamped to `max_hp`.
    pub fn set_hp(&mut self, hp: i32) {
        self.hp = hp.min(self.max_hp);
    }

    /// Set mana, clamped to `max_mana`.
    pub fn set_mana(&mut self, mana: i32) {
        self.mana = mana.min(self.max_mana);
    }

    /// Subtract damage from HP. No lower clamp.
    pub fn take_damage(&mut self, amount: i32) {
        self.set_hp(self.hp - amount);
    }

    /// Restore HP, clamped to `max_hp`. Returns the HP actually gained.
    pub fn restore_hp(&mut self, amount: i32) -> i32 {
        let before = self.hp;
        self.set_hp(self.hp + amount);
        self.hp - before
    }

    /// Restore mana, clamped to `max_mana`. Returns the mana actually gained.
    pub fn restore_mana(&mut self, amount: i32) -> i32 {
        let before = self.mana;
        self.set_mana(self.mana + amount);
        self.mana - before
    }

    /// Deduct mana for a cast.
    ///
    /// # Errors
    ///
    /// Returns [`DuelError::InsufficientMana`] without deducting anything
    /// when the cost exceeds current mana.
    pub fn spend_mana(&mut self, cost: i32) -> Result<()> {
        if self.mana < cost {
            return Err(DuelError::InsufficientMana {
                required: cost,
                available: self.mana,
            });
        }
        self.mana -= cost;
        Ok(())
    }

    /// Whether the combatant is still standing.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        self.hp > 0
    }

    // ------------------------------------------------------------------------
    // Derived stats
    // ------------------------------------------------------------------------

    /// Effective strength: base + attack buff + equipped weapon bonus.
    #[must_use]
    pub fn strength(&self) -> i32 {
        let weapon: i32 = self
            .equipment
            .iter()
            .filter(|item| item.kind == ItemKind::Weapon)
            .map(|item| item.attack)
            .sum();
        self.base_strength + self.buffs.attack + weapon
    }

    /// Armor defense bonus plus defense buff.
    ///
    /// Not subtracted from incoming damage; exposed for display.
    #[must_use]
    pub fn defense(&self) -> i32 {
        let armor: i32 = self
            .equipment
            .iter()
            .filter(|item| item.kind == ItemKind::Armor)
            .map(|item| item.defense)
            .sum();
        self.buffs.defense + armor
    }

    /// Look up an ability by index.
    ///
    /// # Errors
    ///
    /// Returns [`DuelError::InvalidAbility`] for an out-of-range index.
    pub fn ability(&self, index: usize) -> Result<&Ability> {
        self.abilities
            .get(index)
            .ok_or(DuelError::InvalidAbility(index))
    }

    /// Equipped item of the given kind, if any.
    #[must_use]
    pub fn equipped(&self, kind: ItemKind) -> Option<&Item> {
        self.equipment.iter().find(|item| item.kind == kind)
    }

    // ------------------------------------------------------------------------
    // Inventory
    // ------------------------------------------------------------------------

    /// Check that [`use_item`](Self::use_item) would succeed, without mutating.
    ///
    /// # Errors
    ///
    /// Same errors as [`use_item`](Self::use_item).
    pub fn check_item(&self, index: usize) -> Result<&Item> {
        let item = self
            .inventory
            .get(index)
            .ok_or(DuelError::InvalidItem(index))?;
        match item.kind {
            ItemKind::Consumable => Ok(item),
            ItemKind::Weapon | ItemKind::Armor => {
                if self.equipped(item.kind).is_some() {
                    Err(DuelError::SlotOccupied(item.kind))
                } else {
                    Ok(item)
                }
            }
            ItemKind::Special => Err(DuelError::Unusable(item.name.clone())),
        }
    }

    /// Consume or equip an inventory item.
    ///
    /// Consumables restore HP/mana (clamped) and leave the inventory.
    /// Weapons and armor move into their equipment slot.
    ///
    /// # Errors
    ///
    /// - [`DuelError::InvalidItem`] for an out-of-range index
    /// - [`DuelError::SlotOccupied`] if an item of that kind is already equipped
    /// - [`DuelError::Unusable`] for special items
    pub fn use_item(&mut self, index: usize) -> Result<ItemUse> {
        self.check_item(index)?;
        let item = self.inventory.remove(index);
        if item.kind == ItemKind::Consumable {
            let hp = self.restore_hp(item.restore_hp);
            let mana = self.restore_mana(item.restore_mana);
            tracing::debug!(combatant = %self.name, item = %item.name, hp, mana, "Consumed item");
            Ok(ItemUse::Consumed { item, hp, mana })
        } else {
            tracing::debug!(combatant = %self.name, item = %item.name, "Equipped item");
            self.equipment.push(item.clone());
            Ok(ItemUse::Equipped { item })
        }
    }

    /// Move an equipped item back to the inventory.
    ///
    /// # Errors
    ///
    /// Returns [`DuelError::InvalidEquipment`] for an out-of-range index.
    pub fn take_off(&mut self, index: usize) -> Result<Item> {
        if index >= self.equipment.len() {
            return Err(DuelError::InvalidEquipment(index));
        }
        let item = self.equipment.remove(index);
        self.inventory.push(item.clone());
        Ok(item)
    }

    /// Buy an item from a merchant.
    ///
    /// # Errors
    ///
    /// Returns [`DuelError::InsufficientGold`] if the price exceeds current gold.
    pub fn purchase(&mut self, item: &Item) -> Result<()> {
        if self.gold < item.price {
            return Err(DuelError::InsufficientGold {
                required: item.price,
                available: self.gold,
            });
        }
        self.gold -= item.price;
        self.inventory.push(item.clone());
        Ok(())
    }

    /// Learn a new ability.
    pub fn learn(&mut self, ability: Ability) {
        self.abilities.push(ability);
    }

    // ------------------------------------------------------------------------
    // Snapshots
    // ------------------------------------------------------------------------

    /// Project this combatant into a snapshot for the wire.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            name: self.name.clone(),
            hp: self.hp,
            max_hp: self.max_hp,
            mana: self.mana,
            max_mana: self.max_mana,
            base_strength: self.base_strength,
            gold: self.gold,
            inventory: self.inventory.clone(),
            equipment: self.equipment.clone(),
            abilities: self.abilities.clone(),
            buffs: self.buffs,
        }
    }

    /// Build a mirror of a remote combatant from its snapshot.
    ///
    /// Vitals are clamped to their maxima.
    #[must_use]
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let mut combatant = Self {
            name: snapshot.name,
            kind: CombatantKind::Human,
            hp: 0,
            max_hp: snapshot.max_hp,
            mana: 0,
            max_mana: snapshot.max_mana,
            base_strength: snapshot.base_strength,
            gold: snapshot.gold,
            inventory: snapshot.inventory,
            equipment: snapshot.equipment,
            abilities: snapshot.abilities,
            buffs: snapshot.buffs,
        };
        combatant.set_hp(snapshot.hp);
        combatant.set_mana(snapshot.mana);
        combatant
    }

    /// Mirror HP and mana from a snapshot of this combatant.
    ///
    /// Only vitals are taken; everything else in the snapshot is ignored.
    pub fn apply_vitals(&mut self, snapshot: &Snapshot) {
        self.set_hp(snapshot.hp);
        self.set_mana(snapshot.mana);
    }

    /// Check the upper-bound invariants.
    #[must_use]
    pub fn invariants_hold(&self) -> bool {
        let slots_ok = [ItemKind::Weapon, ItemKind::Armor].iter().all(|kind| {
            self.equipment
                .iter()
                .filter(|item| item.kind == *kind)
                .count()
                <= 1
        });
        self.hp <= self.max_hp && self.mana <= self.max_mana && slots_ok
    }

    /// Debug-check the invariants after a mutation.
    #[cfg(feature = "debug-validation")]
    pub(crate) fn debug_validate(&self) {
        debug_assert!(self.invariants_hold(), "combatant invariants violated: {self:?}");
    }

    /// Debug-check the invariants after a mutation.
    #[cfg(not(feature = "debug-validation"))]
    pub(crate) fn debug_validate(&self) {}
}

/// Result of [`Combatant::use_item`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemUse {
    /// A consumable was used up.
    Consumed {
        /// The consumed item.
        item: Item,
        /// HP actually restored.
        hp: i32,
        /// Mana actually restored.
        mana: i32,
    },
    /// A weapon or armor was equipped.
    Equipped {
        /// The equipped item.
        item: Item,
    },
}

/// Serializable projection of a combatant.
///
/// Sent once at bootstrap to build the remote mirror, then after every acting
/// turn so the passive peer can mirror HP and mana.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Snapshot {
    /// Display name.
    pub name: String,
    /// Current HP.
    pub hp: i32,
    /// Maximum HP.
    pub max_hp: i32,
    /// Current mana.
    pub mana: i32,
    /// Maximum mana.
    pub max_mana: i32,
    /// Strength before buffs and weapon.
    pub base_strength: i32,
    /// Gold.
    pub gold: i32,
    /// Carried items.
    pub inventory: Vec<Item>,
    /// Equipped items.
    pub equipment: Vec<Item>,
    /// Known abilities.
    pub abilities: Vec<Ability>,
    /// Accumulated buffs; they count toward the mirror's strength.
    #[serde(default)]
    pub buffs: Buffs,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paladin() -> Combatant {
        Combatant::new("Paladin", 100, 50, 10)
            .with_gold(100)
            .with_item(Item::weapon("Paladin Sword", 5))
            .with_item(Item::armor("Paladin Armor", 5))
            .with_item(Item::consumable("Small Health Potion", 20, 0))
    }

    #[test]
    fn test_new_starts_full() {
        let c = paladin();
        assert_eq!(c.hp(), 100);
        assert_eq!(c.mana(), 50);
        assert!(c.is_alive());
    }

    #[test]
    fn test_hp_clamped_above_only() {
        let mut c = paladin();
        c.set_hp(150);
        assert_eq!(c.hp(), 100);
        c.take_damage(130);
        assert_eq!(c.hp(), -30);
        assert!(!c.is_alive());
    }

    #[test]
    fn test_strength_includes_buff_and_weapon() {
        let mut c = paladin().with_equipped(Item::weapon("Serpent Fang", 18));
        c.buffs.attack = 10;
        assert_eq!(c.strength(), 38);
    }

    #[test]
    fn test_armor_counts_toward_defense_not_strength() {
        let c = paladin().with_equipped(Item::armor("Spiked Mail", 10));
        assert_eq!(c.strength(), 10);
        assert_eq!(c.defense(), 10);
    }

    #[test]
    fn test_spend_mana_is_atomic() {
        let mut c = paladin();
        let err = c.spend_mana(80).unwrap_err();
        assert_eq!(
            err,
            DuelError::InsufficientMana {
                required: 80,
                available: 50
            }
        );
        assert_eq!(c.mana(), 50);
        c.spend_mana(50).unwrap();
        assert_eq!(c.mana(), 0);
    }

    #[test]
    fn test_use_item_equips_weapon() {
        let mut c = paladin();
        let used = c.use_item(0).unwrap();
        assert!(matches!(used, ItemUse::Equipped { .. }));
        assert_eq!(c.strength(), 15);
        assert_eq!(c.inventory.len(), 2);
    }

    #[test]
    fn test_use_item_rejects_occupied_slot() {
        let mut c = paladin().with_item(Item::weapon("Bonebreaker", 40));
        c.use_item(0).unwrap();
        // Bonebreaker is now the last item
        let last = c.inventory.len() - 1;
        let before = c.clone();
        assert_eq!(
            c.use_item(last),
            Err(DuelError::SlotOccupied(ItemKind::Weapon))
        );
        assert_eq!(c, before);
    }

    #[test]
    fn test_consumable_clamps_and_is_removed() {
        let mut c = paladin();
        c.take_damage(10);
        let used = c.use_item(2).unwrap();
        assert_eq!(
            used,
            ItemUse::Consumed {
                item: Item::consumable("Small Health Potion", 20, 0),
                hp: 10,
                mana: 0
            }
        );
        assert_eq!(c.hp(), 100);
        assert_eq!(c.inventory.len(), 2);
    }

    #[test]
    fn test_special_items_are_unusable() {
        let mut c = Combatant::new("Keeper", 10, 0, 1).with_item(Item {
            name: "Sigil".into(),
            kind: ItemKind::Special,
            attack: 0,
            defense: 0,
            restore_hp: 0,
            restore_mana: 0,
            price: 0,
        });
        assert!(matches!(c.use_item(0), Err(DuelError::Unusable(_))));
    }

    #[test]
    fn test_take_off_returns_to_inventory() {
        let mut c = paladin();
        c.use_item(0).unwrap();
        let item = c.take_off(0).unwrap();
        assert_eq!(item.name, "Paladin Sword");
        assert!(c.equipment.is_empty());
        assert_eq!(c.take_off(0), Err(DuelError::InvalidEquipment(0)));
    }

    #[test]
    fn test_purchase() {
        let mut c = paladin();
        let fang = Item::weapon("Serpent Fang", 18).with_price(125);
        assert!(matches!(
            c.purchase(&fang),
            Err(DuelError::InsufficientGold { .. })
        ));
        let potion = Item::consumable("Small Mana Potion", 0, 15).with_price(15);
        c.purchase(&potion).unwrap();
        assert_eq!(c.gold, 85);
        assert_eq!(c.inventory.last(), Some(&potion));
    }

    #[test]
    fn test_snapshot_roundtrip_preserves_fields() {
        let mut c = paladin().with_ability(Ability::heal("Healing", 25, 15));
        c.use_item(0).unwrap();
        c.take_damage(37);
        let mirror = Combatant::from_snapshot(c.snapshot());
        assert_eq!(mirror.snapshot(), c.snapshot());
    }

    #[test]
    fn test_mirror_keeps_buffs() {
        let mut c = paladin().with_ability(Ability::buff("Storm Sign", 20, 5, 10));
        let ability = c.ability(0).unwrap().clone();
        c.buffs.apply(&ability);
        let mirror = Combatant::from_snapshot(c.snapshot());
        assert_eq!(mirror.buffs, c.buffs);
        assert_eq!(mirror.strength(), 30);
        assert_eq!(mirror.defense(), c.defense());
    }

    #[test]
    fn test_apply_vitals_clamps() {
        let mut mirror = paladin();
        let mut snap = mirror.snapshot();
        snap.hp = 500;
        snap.mana = 900;
        mirror.apply_vitals(&snap);
        assert_eq!(mirror.hp(), 100);
        assert_eq!(mirror.mana(), 50);
        assert!(mirror.invariants_hold());
    }
}
