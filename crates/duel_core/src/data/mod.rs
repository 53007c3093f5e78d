//! Data structures for catalog configuration.
//!
//! This module contains pure data structures that define items, abilities,
//! the starting kit and campaign chapters. All structs are designed to be
//! deserialized from RON files.
//!
//! **Note:** This module contains no IO - it only defines data types.
//! Reading override files from disk is handled by `duel_net`.

mod chapter_data;

pub use chapter_data::{ChapterData, EnemyData};

use serde::{Deserialize, Serialize};

use crate::components::{Ability, Item};

/// Complete catalog definition.
///
/// # Example RON
///
/// ```ron
/// CatalogData(
///     items: [
///         Item(name: "Serpent Fang", kind: Weapon, attack: 18, price: 125),
///     ],
///     abilities: [
///         Ability(name: "Steel Tempest", kind: Damage, damage: 10, mana_cost: 5),
///     ],
///     starting_inventory: [],
///     starting_abilities: [0],
///     chapters: [],
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogData {
    /// Every purchasable/lootable item. The merchant stocks all of them.
    pub items: Vec<Item>,

    /// Every ability, referenced by index elsewhere.
    pub abilities: Vec<Ability>,

    /// Items a fresh character carries.
    #[serde(default)]
    pub starting_inventory: Vec<Item>,

    /// Indices into `abilities` a fresh character knows.
    #[serde(default)]
    pub starting_abilities: Vec<usize>,

    /// Campaign chapters in play order.
    #[serde(default)]
    pub chapters: Vec<ChapterData>,
}
