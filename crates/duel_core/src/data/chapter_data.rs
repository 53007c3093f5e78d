//! Campaign chapter data structures.

use serde::{Deserialize, Serialize};

/// Stats of an autonomous boss.
///
/// Bosses fight with bare strength: no equipment, no buffs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnemyData {
    /// Display name.
    pub name: String,
    /// Starting (and maximum) HP.
    pub hp: i32,
    /// Starting (and maximum) mana.
    #[serde(default)]
    pub mana: i32,
    /// Melee strength.
    pub strength: i32,
    /// Index into the catalog abilities for the scripted ability slot.
    #[serde(default)]
    pub ability: Option<usize>,
}

/// A single campaign chapter.
///
/// # Example RON
///
/// ```ron
/// ChapterData(
///     enemy: EnemyData(name: "Judge Varek", hp: 110, mana: 50, strength: 18),
///     gold_drop: 70,
///     reward_ability: 2,
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterData {
    /// The boss of this chapter.
    pub enemy: EnemyData,
    /// Gold awarded on victory.
    pub gold_drop: i32,
    /// Index into the catalog abilities learned on victory.
    pub reward_ability: usize,
}
