//! Local duel driver.
//!
//! [`Duel`] owns both combatants and walks the round state machine: the
//! attacker's choice resolves first, then the defender answers, then the melee
//! exchange and the terminal check. Rejected choices are handed back to the
//! controller and asked again without consuming the round.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::combatant::Combatant;
use crate::controller::Controller;
use crate::engine::{begin_round, PendingRound, RoundOutcome, Side, Verdict};
use crate::error::{DuelError, Result};

/// Times a controller may be re-asked in one phase before the duel gives up.
const MAX_SELECTION_ATTEMPTS: u32 = 32;

/// Tunable numbers for character creation and campaign progression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DuelConfig {
    /// Starting and maximum HP for new characters.
    pub start_hp: i32,
    /// Starting and maximum mana for new characters.
    pub start_mana: i32,
    /// Starting gold.
    pub start_gold: i32,
    /// Base strength.
    pub base_strength: i32,
    /// HP restored after each campaign victory.
    pub heal_between_chapters: i32,
    /// Mana restored after each campaign victory.
    pub mana_between_chapters: i32,
    /// Autonomous combatants cast every `n`-th turn when set.
    pub autonomous_ability_cadence: Option<u32>,
    /// Fewest loot items dropped by a defeated boss.
    pub loot_min: usize,
    /// Most loot items dropped by a defeated boss.
    pub loot_max: usize,
    /// Round cap for unattended runs; `None` plays until someone falls.
    pub max_rounds: Option<u32>,
}

impl Default for DuelConfig {
    fn default() -> Self {
        Self {
            start_hp: 100,
            start_mana: 50,
            start_gold: 100,
            base_strength: 10,
            heal_between_chapters: 30,
            mana_between_chapters: 10,
            autonomous_ability_cadence: None,
            loot_min: 2,
            loot_max: 4,
            max_rounds: None,
        }
    }
}

impl DuelConfig {
    /// Parse a config from RON text. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`DuelError::CatalogParse`] if the text is not valid RON.
    pub fn from_ron_str(source_name: &str, ron_text: &str) -> Result<Self> {
        ron::from_str(ron_text).map_err(|e| DuelError::CatalogParse {
            source_name: source_name.to_string(),
            message: e.to_string(),
        })
    }
}

/// A local duel between two combatants.
///
/// The first combatant attacks in every round.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Duel {
    attacker: Combatant,
    defender: Combatant,
    round: u32,
    verdict: Verdict,
}

impl Duel {
    /// Start a duel at round 1.
    #[must_use]
    pub fn new(attacker: Combatant, defender: Combatant) -> Self {
        let verdict = Verdict::decide(attacker.is_alive(), defender.is_alive());
        Self {
            attacker,
            defender,
            round: 1,
            verdict,
        }
    }

    /// The side acting first each round.
    #[must_use]
    pub const fn attacker(&self) -> &Combatant {
        &self.attacker
    }

    /// The side answering each round.
    #[must_use]
    pub const fn defender(&self) -> &Combatant {
        &self.defender
    }

    /// Current round (1-based; the next round to be played).
    #[must_use]
    pub const fn round(&self) -> u32 {
        self.round
    }

    /// Latest terminal check.
    #[must_use]
    pub const fn verdict(&self) -> Verdict {
        self.verdict
    }

    /// Whether a side has fallen.
    #[must_use]
    pub const fn is_over(&self) -> bool {
        self.verdict.is_terminal()
    }

    /// The winning combatant, once the duel is over.
    #[must_use]
    pub const fn winner(&self) -> Option<&Combatant> {
        match self.verdict {
            Verdict::Continue => None,
            Verdict::Victory(Side::Attacker) => Some(&self.attacker),
            Verdict::Victory(Side::Defender) => Some(&self.defender),
        }
    }

    /// Take both combatants back (attacker first).
    #[must_use]
    pub fn into_combatants(self) -> (Combatant, Combatant) {
        (self.attacker, self.defender)
    }

    /// Play one round, asking each controller until it supplies a valid action.
    ///
    /// # Errors
    ///
    /// - [`DuelError::InvalidState`] if the duel is already over or a
    ///   controller keeps supplying rejected actions
    /// - any non-recoverable engine error
    pub fn play_round<A, D>(&mut self, attacker: &mut A, defender: &mut D) -> Result<RoundOutcome>
    where
        A: Controller + ?Sized,
        D: Controller + ?Sized,
    {
        if self.is_over() {
            return Err(DuelError::InvalidState("Duel is already over".to_string()));
        }
        let round = self.round;
        let _span = tracing::debug_span!("round", round).entered();

        let pending = self.select_attacker(attacker)?;
        let outcome = self.select_defender(defender, &pending)?;

        self.verdict = outcome.verdict;
        self.round += 1;
        tracing::info!(
            round,
            attacker_hp = outcome.attacker.hp,
            defender_hp = outcome.defender.hp,
            verdict = ?outcome.verdict,
            "Round resolved"
        );
        Ok(outcome)
    }

    fn select_attacker<A: Controller + ?Sized>(&mut self, controller: &mut A) -> Result<PendingRound> {
        for _ in 0..MAX_SELECTION_ATTEMPTS {
            let action = controller.choose_action(&self.attacker, &self.defender, self.round);
            match begin_round(&mut self.attacker, &mut self.defender, action) {
                Ok(pending) => return Ok(pending),
                Err(e) if e.is_recoverable() => controller.reject(&e),
                Err(e) => return Err(e),
            }
        }
        Err(DuelError::InvalidState(format!(
            "{} supplied no valid action after {MAX_SELECTION_ATTEMPTS} attempts",
            self.attacker.name
        )))
    }

    fn select_defender<D: Controller + ?Sized>(
        &mut self,
        controller: &mut D,
        pending: &PendingRound,
    ) -> Result<RoundOutcome> {
        for _ in 0..MAX_SELECTION_ATTEMPTS {
            let action = controller.choose_action(&self.defender, &self.attacker, self.round);
            match pending.finish(&mut self.attacker, &mut self.defender, &action) {
                Ok(outcome) => return Ok(outcome),
                Err(e) if e.is_recoverable() => controller.reject(&e),
                Err(e) => return Err(e),
            }
        }
        Err(DuelError::InvalidState(format!(
            "{} supplied no valid action after {MAX_SELECTION_ATTEMPTS} attempts",
            self.defender.name
        )))
    }

    /// Play rounds until a side falls or `max_rounds` more rounds have been
    /// played. Returns the final verdict ([`Verdict::Continue`] when capped).
    ///
    /// # Errors
    ///
    /// Propagates errors from [`play_round`](Self::play_round).
    pub fn run<A, D>(
        &mut self,
        attacker: &mut A,
        defender: &mut D,
        max_rounds: Option<u32>,
    ) -> Result<Verdict>
    where
        A: Controller + ?Sized,
        D: Controller + ?Sized,
    {
        let mut played = 0;
        while !self.is_over() && max_rounds.map_or(true, |cap| played < cap) {
            self.play_round(attacker, defender)?;
            played += 1;
        }
        Ok(self.verdict)
    }

    /// Hash of the full duel state, for determinism checks.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }

    /// Serialize duel state to bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| DuelError::InvalidState(format!("Failed to serialize duel: {e}")))
    }

    /// Deserialize duel state from bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails.
    pub fn deserialize(data: &[u8]) -> Result<Self> {
        bincode::deserialize(data)
            .map_err(|e| DuelError::InvalidState(format!("Failed to deserialize duel: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::components::{Ability, BodyPart};
    use crate::controller::Autonomous;
    use crate::engine::Action;

    /// Replays a fixed list of actions, cycling.
    struct Fixed {
        actions: Vec<Action>,
        next: usize,
        rejections: usize,
    }

    impl Fixed {
        fn new(actions: Vec<Action>) -> Self {
            Self {
                actions,
                next: 0,
                rejections: 0,
            }
        }
    }

    impl Controller for Fixed {
        fn choose_action(&mut self, _: &Combatant, _: &Combatant, _: u32) -> Action {
            let action = self.actions[self.next % self.actions.len()];
            self.next += 1;
            action
        }

        fn reject(&mut self, _error: &DuelError) {
            self.rejections += 1;
        }
    }

    fn melee(attack: BodyPart, defend: BodyPart) -> Action {
        Action::Melee { attack, defend }
    }

    #[test]
    fn test_defaults() {
        let config = DuelConfig::default();
        assert_eq!(config.start_hp, 100);
        assert_eq!(config.start_mana, 50);
        assert_eq!(config.autonomous_ability_cadence, None);
    }

    #[test]
    fn test_config_from_partial_ron() {
        let config = DuelConfig::from_ron_str("inline", "(start_hp: 150, max_rounds: Some(40))")
            .unwrap();
        assert_eq!(config.start_hp, 150);
        assert_eq!(config.max_rounds, Some(40));
        assert_eq!(config.start_gold, 100);
    }

    #[test]
    fn test_round_counter_advances() {
        let mut duel = Duel::new(
            Combatant::new("A", 100, 0, 10),
            Combatant::new("D", 100, 0, 10),
        );
        let mut a = Fixed::new(vec![melee(BodyPart::Head, BodyPart::Head)]);
        let mut d = Fixed::new(vec![melee(BodyPart::Head, BodyPart::Head)]);
        duel.play_round(&mut a, &mut d).unwrap();
        duel.play_round(&mut a, &mut d).unwrap();
        assert_eq!(duel.round(), 3);
        assert_eq!(duel.attacker().hp(), 100);
    }

    #[test]
    fn test_rejected_choice_is_asked_again() {
        let mut duel = Duel::new(
            Combatant::new("A", 100, 50, 10).with_ability(Ability::damage("Last Breath", 100, 80)),
            Combatant::new("D", 100, 0, 10),
        );
        let mut a = Fixed::new(vec![
            Action::Ability {
                index: 0,
                defend: None,
            },
            melee(BodyPart::Legs, BodyPart::Arms),
        ]);
        let mut d = Fixed::new(vec![melee(BodyPart::Head, BodyPart::Head)]);
        duel.play_round(&mut a, &mut d).unwrap();
        assert_eq!(a.rejections, 1);
        assert_eq!(duel.attacker().mana(), 50);
        assert_eq!(duel.defender().hp(), 90);
        assert_eq!(duel.round(), 2);
    }

    #[test]
    fn test_persistent_rejection_gives_up() {
        let mut duel = Duel::new(
            Combatant::new("A", 100, 0, 10),
            Combatant::new("D", 100, 0, 10),
        );
        let mut a = Fixed::new(vec![Action::Item {
            index: 0,
            defend: BodyPart::Head,
        }]);
        let mut d = Fixed::new(vec![melee(BodyPart::Head, BodyPart::Head)]);
        let err = duel.play_round(&mut a, &mut d).unwrap_err();
        assert!(matches!(err, DuelError::InvalidState(_)));
        assert_eq!(duel.round(), 1);
    }

    #[test]
    fn test_run_until_knockout() {
        let mut duel = Duel::new(
            Combatant::new("A", 100, 0, 25),
            Combatant::new("D", 50, 0, 5),
        );
        let mut a = Fixed::new(vec![melee(BodyPart::Torso, BodyPart::Legs)]);
        let mut d = Fixed::new(vec![melee(BodyPart::Head, BodyPart::Head)]);
        let verdict = duel.run(&mut a, &mut d, None).unwrap();
        assert_eq!(verdict, Verdict::Victory(Side::Attacker));
        assert_eq!(duel.round(), 3);
        assert_eq!(duel.winner().map(|c| c.name.as_str()), Some("A"));
        assert!(duel.play_round(&mut a, &mut d).is_err());
    }

    #[test]
    fn test_run_respects_round_cap() {
        let mut duel = Duel::new(
            Combatant::new("A", 100, 0, 10),
            Combatant::new("D", 100, 0, 10),
        );
        let mut a = Fixed::new(vec![melee(BodyPart::Head, BodyPart::Head)]);
        let mut d = Fixed::new(vec![melee(BodyPart::Head, BodyPart::Head)]);
        assert_eq!(duel.run(&mut a, &mut d, Some(5)).unwrap(), Verdict::Continue);
        assert_eq!(duel.round(), 6);
    }

    #[test]
    fn test_seeded_runs_hash_equal() {
        let play = || {
            let mut duel = Duel::new(
                Combatant::new("A", 100, 0, 10),
                Combatant::new("D", 100, 0, 10),
            );
            let mut a = Autonomous::new(StdRng::seed_from_u64(11));
            let mut d = Autonomous::new(StdRng::seed_from_u64(12));
            duel.run(&mut a, &mut d, Some(100)).unwrap();
            duel.state_hash()
        };
        assert_eq!(play(), play());
    }

    #[test]
    fn test_serialize_roundtrip() {
        let mut duel = Duel::new(
            Combatant::new("A", 100, 0, 10),
            Combatant::new("D", 100, 0, 10),
        );
        let mut a = Fixed::new(vec![melee(BodyPart::Arms, BodyPart::Head)]);
        let mut d = Fixed::new(vec![melee(BodyPart::Head, BodyPart::Legs)]);
        duel.play_round(&mut a, &mut d).unwrap();
        let restored = Duel::deserialize(&duel.serialize().unwrap()).unwrap();
        assert_eq!(restored, duel);
        assert_eq!(restored.state_hash(), duel.state_hash());
    }
}
