//! Action sources.
//!
//! A [`Controller`] picks the next [`Action`] for one side of a duel. Human
//! frontends implement it by prompting; [`Autonomous`] implements it with an
//! injected random number generator so runs stay reproducible.

use rand::Rng;

use crate::combatant::Combatant;
use crate::components::BodyPart;
use crate::engine::Action;
use crate::error::DuelError;

/// Supplies actions for one combatant.
pub trait Controller {
    /// Choose an action for `me` against `opponent` in the given round.
    fn choose_action(&mut self, me: &Combatant, opponent: &Combatant, round: u32) -> Action;

    /// Called when the previous choice was rejected. The driver asks again
    /// after this returns.
    fn reject(&mut self, error: &DuelError) {
        tracing::debug!(%error, "Action rejected");
    }
}

impl<C: Controller + ?Sized> Controller for &mut C {
    fn choose_action(&mut self, me: &Combatant, opponent: &Combatant, round: u32) -> Action {
        (**self).choose_action(me, opponent, round)
    }

    fn reject(&mut self, error: &DuelError) {
        (**self).reject(error);
    }
}

impl<C: Controller + ?Sized> Controller for Box<C> {
    fn choose_action(&mut self, me: &Combatant, opponent: &Combatant, round: u32) -> Action {
        (**self).choose_action(me, opponent, round)
    }

    fn reject(&mut self, error: &DuelError) {
        (**self).reject(error);
    }
}

/// Autonomous policy: uniform random attack and defense zones.
///
/// With an ability cadence of `n`, every `n`-th choice casts the first
/// affordable ability instead, falling back to melee when none is.
#[derive(Debug, Clone)]
pub struct Autonomous<R> {
    rng: R,
    ability_cadence: Option<u32>,
    choices: u32,
}

impl<R: Rng> Autonomous<R> {
    /// Create a melee-only policy.
    #[must_use]
    pub fn new(rng: R) -> Self {
        Self {
            rng,
            ability_cadence: None,
            choices: 0,
        }
    }

    /// Builder method to cast an ability every `cadence` choices.
    ///
    /// `None` or `Some(0)` disables casting.
    #[must_use]
    pub fn with_ability_cadence(mut self, cadence: Option<u32>) -> Self {
        self.ability_cadence = cadence;
        self
    }

    /// Draw a uniformly random zone.
    pub fn random_zone(&mut self) -> BodyPart {
        BodyPart::ALL[self.rng.gen_range(0..BodyPart::ALL.len())]
    }

    fn casting_turn(&self) -> bool {
        matches!(self.ability_cadence, Some(n) if n > 0 && self.choices % n == 0)
    }
}

impl<R: Rng> Controller for Autonomous<R> {
    fn choose_action(&mut self, me: &Combatant, _opponent: &Combatant, _round: u32) -> Action {
        self.choices = self.choices.wrapping_add(1);
        if self.casting_turn() {
            let affordable = me
                .abilities
                .iter()
                .position(|ability| ability.mana_cost <= me.mana());
            if let Some(index) = affordable {
                return Action::Ability {
                    index,
                    defend: Some(self.random_zone()),
                };
            }
        }
        Action::Melee {
            attack: self.random_zone(),
            defend: self.random_zone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::components::Ability;

    #[test]
    fn test_autonomous_is_seeded() {
        let me = Combatant::new("Ghoul", 50, 0, 8);
        let mut a = Autonomous::new(StdRng::seed_from_u64(42));
        let mut b = Autonomous::new(StdRng::seed_from_u64(42));
        for round in 1..=20 {
            assert_eq!(
                a.choose_action(&me, &me, round),
                b.choose_action(&me, &me, round)
            );
        }
    }

    #[test]
    fn test_autonomous_covers_every_zone() {
        let mut policy = Autonomous::new(StdRng::seed_from_u64(1));
        let mut seen = [false; 4];
        for _ in 0..200 {
            seen[policy.random_zone().index()] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn test_melee_only_by_default() {
        let me = Combatant::new("Lich", 100, 100, 10).with_ability(Ability::damage("Bolt", 10, 5));
        let mut policy = Autonomous::new(StdRng::seed_from_u64(3));
        for round in 1..=10 {
            assert!(matches!(
                policy.choose_action(&me, &me, round),
                Action::Melee { .. }
            ));
        }
    }

    #[test]
    fn test_ability_cadence() {
        let me = Combatant::new("Lich", 100, 100, 10).with_ability(Ability::damage("Bolt", 10, 5));
        let mut policy = Autonomous::new(StdRng::seed_from_u64(3)).with_ability_cadence(Some(3));
        let casts: Vec<bool> = (1..=6)
            .map(|round| {
                matches!(
                    policy.choose_action(&me, &me, round),
                    Action::Ability { index: 0, .. }
                )
            })
            .collect();
        assert_eq!(casts, [false, false, true, false, false, true]);
    }

    #[test]
    fn test_cadence_falls_back_without_mana() {
        let me = Combatant::new("Lich", 100, 0, 10).with_ability(Ability::damage("Bolt", 10, 5));
        let mut policy = Autonomous::new(StdRng::seed_from_u64(3)).with_ability_cadence(Some(1));
        assert!(matches!(
            policy.choose_action(&me, &me, 1),
            Action::Melee { .. }
        ));
    }
}
