//! Read-only item and ability tables.
//!
//! The built-in catalog is embedded from `data/catalog.ron` at compile time.
//! Lookups never mutate; out-of-range indices surface as selection errors.

use std::path::Path;

use rand::Rng;

use crate::combatant::{Combatant, CombatantKind};
use crate::components::{Ability, Item};
use crate::data::{CatalogData, ChapterData};
use crate::duel::DuelConfig;
use crate::error::{DuelError, Result};

const BUILTIN_CATALOG: &str = include_str!("../data/catalog.ron");

/// Item and ability lookup tables plus the starting kit and campaign chapters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    data: CatalogData,
}

impl Catalog {
    /// Parse the embedded catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the embedded data fails to parse or validate.
    pub fn builtin() -> Result<Self> {
        Self::from_ron_str("catalog.ron", BUILTIN_CATALOG)
    }

    /// Parse a catalog from RON text.
    ///
    /// `source_name` is only used in error messages.
    ///
    /// # Errors
    ///
    /// Returns [`DuelError::CatalogParse`] if parsing fails, or
    /// [`DuelError::InvalidState`] if an ability index is out of range.
    pub fn from_ron_str(source_name: &str, ron_text: &str) -> Result<Self> {
        let data: CatalogData = ron::from_str(ron_text).map_err(|e| DuelError::CatalogParse {
            source_name: source_name.to_string(),
            message: e.to_string(),
        })?;
        Self::from_data(data)
    }

    /// Load a catalog from a RON file, replacing the built-in one.
    ///
    /// # Errors
    ///
    /// Returns [`DuelError::CatalogParse`] if the file cannot be read or
    /// parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let source_name = path.display().to_string();
        let text = std::fs::read_to_string(path).map_err(|e| DuelError::CatalogParse {
            source_name: source_name.clone(),
            message: e.to_string(),
        })?;
        Self::from_ron_str(&source_name, &text)
    }

    /// Wrap already-parsed catalog data.
    ///
    /// # Errors
    ///
    /// Returns [`DuelError::InvalidState`] if any ability reference is dangling.
    pub fn from_data(data: CatalogData) -> Result<Self> {
        let abilities = data.abilities.len();
        let dangling = data
            .starting_abilities
            .iter()
            .copied()
            .chain(data.chapters.iter().map(|chapter| chapter.reward_ability))
            .chain(data.chapters.iter().filter_map(|chapter| chapter.enemy.ability))
            .find(|&index| index >= abilities);
        if let Some(index) = dangling {
            return Err(DuelError::InvalidState(format!(
                "Catalog references ability {index} but only {abilities} are defined"
            )));
        }
        Ok(Self { data })
    }

    /// All items.
    #[must_use]
    pub fn items(&self) -> &[Item] {
        &self.data.items
    }

    /// Merchant stock. The merchant sells every catalog item.
    #[must_use]
    pub fn shop(&self) -> &[Item] {
        &self.data.items
    }

    /// Look up an item by index.
    ///
    /// # Errors
    ///
    /// Returns [`DuelError::InvalidItem`] for an out-of-range index.
    pub fn item(&self, index: usize) -> Result<&Item> {
        self.data
            .items
            .get(index)
            .ok_or(DuelError::InvalidItem(index))
    }

    /// Look up an item by name.
    #[must_use]
    pub fn item_named(&self, name: &str) -> Option<&Item> {
        self.data.items.iter().find(|item| item.name == name)
    }

    /// All abilities.
    #[must_use]
    pub fn abilities(&self) -> &[Ability] {
        &self.data.abilities
    }

    /// Look up an ability by index.
    ///
    /// # Errors
    ///
    /// Returns [`DuelError::InvalidAbility`] for an out-of-range index.
    pub fn ability(&self, index: usize) -> Result<&Ability> {
        self.data
            .abilities
            .get(index)
            .ok_or(DuelError::InvalidAbility(index))
    }

    /// Campaign chapters in play order.
    #[must_use]
    pub fn chapters(&self) -> &[ChapterData] {
        &self.data.chapters
    }

    /// Build a fresh human character with the starting kit.
    #[must_use]
    pub fn starting_combatant(&self, name: impl Into<String>, config: &DuelConfig) -> Combatant {
        let mut combatant = Combatant::new(
            name,
            config.start_hp,
            config.start_mana,
            config.base_strength,
        )
        .with_gold(config.start_gold);
        combatant
            .inventory
            .extend(self.data.starting_inventory.iter().cloned());
        combatant.abilities.extend(
            self.data
                .starting_abilities
                .iter()
                .filter_map(|&index| self.data.abilities.get(index).cloned()),
        );
        combatant
    }

    /// Build the autonomous boss of a chapter.
    ///
    /// The scripted ability, if any, is the boss's only ability (index 0).
    #[must_use]
    pub fn chapter_enemy(&self, chapter: &ChapterData) -> Combatant {
        let enemy = &chapter.enemy;
        let mut combatant = Combatant::new(enemy.name.clone(), enemy.hp, enemy.mana, enemy.strength);
        combatant.kind = CombatantKind::Autonomous;
        if let Some(ability) = enemy.ability.and_then(|index| self.data.abilities.get(index)) {
            combatant.learn(ability.clone());
        }
        combatant
    }

    /// Draw `min..=max` random items (with replacement) as loot.
    #[must_use]
    pub fn random_loot<R: Rng>(&self, rng: &mut R, min: usize, max: usize) -> Vec<Item> {
        if self.data.items.is_empty() {
            return Vec::new();
        }
        let count = rng.gen_range(min..=max.max(min));
        (0..count)
            .map(|_| self.data.items[rng.gen_range(0..self.data.items.len())].clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::components::{AbilityKind, ItemKind};

    #[test]
    fn test_builtin_catalog_parses() {
        let catalog = Catalog::builtin().unwrap();
        assert_eq!(catalog.items().len(), 15);
        assert_eq!(catalog.abilities().len(), 9);
        assert_eq!(catalog.chapters().len(), 7);
    }

    #[test]
    fn test_builtin_values() {
        let catalog = Catalog::builtin().unwrap();
        let fang = catalog.item_named("Serpent Fang").unwrap();
        assert_eq!(fang.kind, ItemKind::Weapon);
        assert_eq!(fang.attack, 18);

        let last_breath = catalog.ability(0).unwrap();
        assert_eq!(last_breath.kind, AbilityKind::Damage);
        assert_eq!(last_breath.mana_cost, 80);
        assert_eq!(last_breath.damage, 100);
    }

    #[test]
    fn test_lookup_out_of_range() {
        let catalog = Catalog::builtin().unwrap();
        assert_eq!(catalog.ability(99), Err(DuelError::InvalidAbility(99)));
        assert_eq!(catalog.item(15), Err(DuelError::InvalidItem(15)));
    }

    #[test]
    fn test_starting_combatant() {
        let catalog = Catalog::builtin().unwrap();
        let hero = catalog.starting_combatant("Inquisitor", &DuelConfig::default());
        assert_eq!(hero.hp(), 100);
        assert_eq!(hero.mana(), 50);
        assert_eq!(hero.gold, 100);
        assert_eq!(hero.strength(), 10);
        assert_eq!(hero.inventory.len(), 4);
        let names: Vec<&str> = hero.abilities.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, ["Steel Tempest", "Storm Sign", "Healing"]);
    }

    #[test]
    fn test_chapter_enemy_is_autonomous() {
        let catalog = Catalog::builtin().unwrap();
        let enemy = catalog.chapter_enemy(&catalog.chapters()[2]);
        assert_eq!(enemy.kind, CombatantKind::Autonomous);
        assert_eq!(enemy.hp(), 110);
        assert_eq!(enemy.strength(), 18);
        assert!(enemy.abilities.is_empty());
    }

    #[test]
    fn test_dangling_ability_rejected() {
        let ron_text = r#"CatalogData(items: [], abilities: [], starting_abilities: [3])"#;
        let err = Catalog::from_ron_str("inline", ron_text).unwrap_err();
        assert!(matches!(err, DuelError::InvalidState(_)));
    }

    #[test]
    fn test_parse_error_names_source() {
        let err = Catalog::from_ron_str("broken.ron", "CatalogData(").unwrap_err();
        assert!(matches!(
            err,
            DuelError::CatalogParse { ref source_name, .. } if source_name == "broken.ron"
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let err = Catalog::load("no/such/catalog.ron").unwrap_err();
        assert!(matches!(
            err,
            DuelError::CatalogParse { ref source_name, .. } if source_name.ends_with("catalog.ron")
        ));
    }

    #[test]
    fn test_random_loot_count_in_range() {
        let catalog = Catalog::builtin().unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let loot = catalog.random_loot(&mut rng, 2, 4);
            assert!((2..=4).contains(&loot.len()));
        }
    }
}
