//! Determinism testing utilities.
//!
//! Provides a harness for verifying that duels produce identical results
//! given identical inputs.
//!
//! # Testing Strategy
//!
//! Network duels replay each announced action on both peers, so resolution
//! must be a pure function of the combatants and the action. Sources of
//! non-determinism include:
//!
//! - **System randomness**: autonomous combatants and loot draw from an
//!   injected, seeded `StdRng`; nothing reads the thread RNG.
//!
//! - **HashMap iteration order**: combatant state only uses `Vec`s.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: engine rules against fixed actions
//! 2. **Property tests**: random actions still resolve deterministically
//! 3. **Integration tests**: full seeded duels are reproducible
//! 4. **Parallel tests**: running N duels on threads all match

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

use duel_core::combatant::Combatant;
use duel_core::controller::Autonomous;
use duel_core::duel::Duel;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of steps taken per run.
    pub steps: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic duel).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that every run matched, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Duel is non-deterministic!\n\
                 Runs: {}\n\
                 Steps: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.steps,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a state machine multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run
/// * `steps` - Number of steps per run
/// * `setup` - Function to create initial state
/// * `step` - Function to advance state by one step
/// * `hash` - Function to compute state hash
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    steps: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..steps {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        steps,
    }
}

/// A duel between two seeded autonomous policies.
#[derive(Debug, Clone)]
pub struct SeededDuel {
    /// Duel state.
    pub duel: Duel,
    /// Attacker policy.
    pub attacker: Autonomous<StdRng>,
    /// Defender policy.
    pub defender: Autonomous<StdRng>,
}

impl SeededDuel {
    /// Pair two combatants under policies seeded from `seed`.
    #[must_use]
    pub fn new(attacker: Combatant, defender: Combatant, seed: u64) -> Self {
        Self {
            duel: Duel::new(attacker, defender),
            attacker: Autonomous::new(StdRng::seed_from_u64(seed)),
            defender: Autonomous::new(StdRng::seed_from_u64(seed.wrapping_add(1))),
        }
    }

    /// Builder method to make both policies cast on a cadence.
    #[must_use]
    pub fn with_ability_cadence(mut self, cadence: Option<u32>) -> Self {
        self.attacker = self.attacker.with_ability_cadence(cadence);
        self.defender = self.defender.with_ability_cadence(cadence);
        self
    }

    /// Play one round unless the duel is over.
    ///
    /// # Panics
    ///
    /// Panics if the engine reports a non-recoverable error.
    pub fn step(&mut self) {
        if !self.duel.is_over() {
            self.duel
                .play_round(&mut self.attacker, &mut self.defender)
                .expect("seeded round resolves");
        }
    }

    /// Hash of the duel state.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        self.duel.state_hash()
    }
}

/// Replay a seeded duel twice and compare final hashes.
pub fn verify_duel_determinism<F>(setup_fn: F, rounds: u64) -> bool
where
    F: Fn() -> SeededDuel,
{
    verify_determinism(2, rounds, &setup_fn, SeededDuel::step, SeededDuel::state_hash)
        .is_deterministic
}

/// Result of parallel duel runs.
#[derive(Debug, Clone)]
pub struct ParallelDuelResult {
    /// Final state hash from each duel.
    pub hashes: Vec<u64>,
    /// Rounds each duel was allowed.
    pub rounds: u64,
}

impl ParallelDuelResult {
    /// Check if all duels produced identical results.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        self.hashes.windows(2).all(|w| w[0] == w[1])
    }

    /// Assert all duels matched.
    ///
    /// # Panics
    ///
    /// Panics if duels produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic() {
            panic!(
                "Parallel duels diverged!\n\
                 Duels: {}\n\
                 Rounds: {}\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.rounds,
                self.hashes
            );
        }
    }
}

/// Run N duels on scoped threads and collect final hashes.
///
/// # Panics
///
/// Panics if a worker thread panics.
pub fn run_parallel_duels<F>(setup_fn: F, num_duels: usize, rounds: u64) -> ParallelDuelResult
where
    F: Fn() -> SeededDuel + Sync,
{
    let hashes = thread::scope(|s| {
        let handles: Vec<_> = (0..num_duels)
            .map(|_| {
                s.spawn(|| {
                    let mut seeded = setup_fn();
                    for _ in 0..rounds {
                        seeded.step();
                    }
                    seeded.state_hash()
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().expect("duel thread completes"))
            .collect()
    });

    ParallelDuelResult { hashes, rounds }
}

/// Compare two runs round-by-round, finding the first divergence.
///
/// # Returns
///
/// `None` if the runs match, `Some(round)` if they diverge after that round.
pub fn find_first_divergence<F>(setup_fn: F, rounds: u64) -> Option<u64>
where
    F: Fn() -> SeededDuel,
{
    let mut a = setup_fn();
    let mut b = setup_fn();

    if a.state_hash() != b.state_hash() {
        return Some(0);
    }

    for round in 1..=rounds {
        a.step();
        b.step();

        if a.state_hash() != b.state_hash() {
            return Some(round);
        }
    }

    None
}

/// Verify that a bincode round-trip preserves duel state exactly.
pub fn verify_serialization_determinism<F>(setup_fn: F, rounds: u64) -> bool
where
    F: Fn() -> SeededDuel,
{
    let mut seeded = setup_fn();
    for _ in 0..rounds {
        seeded.step();
    }

    let hash_before = seeded.state_hash();

    let Ok(bytes) = seeded.duel.serialize() else {
        return false;
    };
    let Ok(restored) = Duel::deserialize(&bytes) else {
        return false;
    };

    hash_before == restored.state_hash()
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for duel inputs.
pub mod strategies {
    use duel_core::combatant::{Combatant, Snapshot};
    use duel_core::components::{BodyPart, Item};
    use duel_core::engine::Action;
    use proptest::prelude::*;

    /// Any body zone.
    pub fn arb_zone() -> impl Strategy<Value = BodyPart> {
        prop_oneof![
            Just(BodyPart::Head),
            Just(BodyPart::Torso),
            Just(BodyPart::Arms),
            Just(BodyPart::Legs),
        ]
    }

    /// Any melee action.
    pub fn arb_melee() -> impl Strategy<Value = Action> {
        (arb_zone(), arb_zone()).prop_map(|(attack, defend)| Action::Melee { attack, defend })
    }

    /// Any action with indices below `max_index` (may be out of range for a
    /// given combatant).
    pub fn arb_action(max_index: usize) -> impl Strategy<Value = Action> {
        prop_oneof![
            arb_melee(),
            (0..max_index, proptest::option::of(arb_zone()))
                .prop_map(|(index, defend)| Action::Ability { index, defend }),
            (0..max_index, arb_zone()).prop_map(|(index, defend)| Action::Item { index, defend }),
        ]
    }

    /// A sequence of actions.
    pub fn arb_action_sequence(max_len: usize) -> impl Strategy<Value = Vec<Action>> {
        proptest::collection::vec(arb_action(4), 1..max_len)
    }

    /// Any equippable or consumable item.
    pub fn arb_item() -> impl Strategy<Value = Item> {
        prop_oneof![
            (1i32..60).prop_map(|attack| Item::weapon("Blade", attack)),
            (1i32..60).prop_map(|defense| Item::armor("Plate", defense)),
            (0i32..50, 0i32..50).prop_map(|(hp, mana)| Item::consumable("Tonic", hp, mana)),
        ]
    }

    /// A combatant with random vitals, strength and inventory.
    pub fn arb_combatant() -> impl Strategy<Value = Combatant> {
        (
            1i32..500,
            0i32..200,
            1i32..60,
            0i32..1000,
            proptest::collection::vec(arb_item(), 0..6),
        )
            .prop_map(|(max_hp, max_mana, strength, gold, items)| {
                let mut combatant = Combatant::new("Rival", max_hp, max_mana, strength).with_gold(gold);
                combatant.inventory = items;
                combatant
            })
    }

    /// A snapshot whose vitals may exceed their maxima.
    pub fn arb_snapshot() -> impl Strategy<Value = Snapshot> {
        (arb_combatant(), -100i32..800, -50i32..400).prop_map(|(combatant, hp, mana)| {
            let mut snapshot = combatant.snapshot();
            snapshot.hp = hp;
            snapshot.mana = mana;
            snapshot
        })
    }
}
