//! Test fixtures and helpers.
//!
//! Pre-built combatants and controllers for consistent testing.

use std::collections::VecDeque;

use duel_core::catalog::Catalog;
use duel_core::combatant::Combatant;
use duel_core::components::{Ability, BodyPart, Item};
use duel_core::controller::Controller;
use duel_core::duel::DuelConfig;
use duel_core::engine::Action;
use duel_core::error::DuelError;

/// Built-in catalog.
///
/// # Panics
///
/// Panics if the embedded catalog fails to parse.
#[must_use]
pub fn catalog() -> Catalog {
    Catalog::builtin().expect("embedded catalog parses")
}

/// A fresh character with the default starting kit.
#[must_use]
pub fn starting_hero(name: &str) -> Combatant {
    catalog().starting_combatant(name, &DuelConfig::default())
}

/// A plain 100 HP / 50 mana / strength 10 fighter with nothing else.
#[must_use]
pub fn fighter(name: &str) -> Combatant {
    Combatant::new(name, 100, 50, 10)
}

/// A fighter with every ability kind and some gear.
///
/// Abilities: 0 Steel Tempest (damage), 1 Healing (heal), 2 Storm Sign (buff).
/// Inventory: 0 Serpent Fang, 1 Small Health Potion, 2 Small Mana Potion.
#[must_use]
pub fn battlemage(name: &str) -> Combatant {
    fighter(name)
        .with_ability(Ability::damage("Steel Tempest", 10, 5))
        .with_ability(Ability::heal("Healing", 25, 15))
        .with_ability(Ability::buff("Storm Sign", 10, 0, 10))
        .with_item(Item::weapon("Serpent Fang", 18).with_price(125))
        .with_item(Item::consumable("Small Health Potion", 20, 0).with_price(20))
        .with_item(Item::consumable("Small Mana Potion", 0, 15).with_price(15))
}

/// Melee action shorthand.
#[must_use]
pub const fn melee(attack: BodyPart, defend: BodyPart) -> Action {
    Action::Melee { attack, defend }
}

/// Replays a queue of actions, then repeats a fallback.
///
/// Records every rejection it is told about.
#[derive(Debug, Clone)]
pub struct ScriptedController {
    script: VecDeque<Action>,
    fallback: Action,
    /// Rejections received, in order.
    pub rejections: Vec<DuelError>,
}

impl ScriptedController {
    /// Play `script` in order, then `fallback` forever.
    #[must_use]
    pub fn new(script: impl IntoIterator<Item = Action>, fallback: Action) -> Self {
        Self {
            script: script.into_iter().collect(),
            fallback,
            rejections: Vec::new(),
        }
    }

    /// Always play `action`.
    #[must_use]
    pub fn repeating(action: Action) -> Self {
        Self::new([], action)
    }

    /// Actions not yet played.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl Controller for ScriptedController {
    fn choose_action(&mut self, _me: &Combatant, _opponent: &Combatant, _round: u32) -> Action {
        self.script.pop_front().unwrap_or(self.fallback)
    }

    fn reject(&mut self, error: &DuelError) {
        tracing::debug!(%error, "Scripted action rejected");
        self.rejections.push(error.clone());
    }
}
