//! Balance testing utilities.
//!
//! Runs many seeded duels between autonomous combatants to check that
//! matchups and campaign chapters land where the numbers say they should.

use duel_core::combatant::Combatant;
use duel_core::engine::{Side, Verdict};

use crate::determinism::SeededDuel;

/// Result of a single simulated duel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DuelResult {
    /// Winning side (`None` if the round cap was hit).
    pub winner: Option<Side>,
    /// Rounds played.
    pub rounds: u32,
    /// Attacker HP at the end.
    pub attacker_hp: i32,
    /// Defender HP at the end.
    pub defender_hp: i32,
}

/// Statistics for a set of duels.
#[derive(Debug, Clone, Default)]
pub struct BattleStats {
    /// Total duels run.
    pub total_duels: u32,
    /// Wins for the attacker.
    pub wins_attacker: u32,
    /// Wins for the defender.
    pub wins_defender: u32,
    /// Duels that hit the round cap.
    pub stalls: u32,
    /// Average rounds to resolution.
    pub avg_rounds: f64,
}

impl BattleStats {
    /// Attacker win rate (0.0 to 1.0).
    pub fn win_rate_attacker(&self) -> f64 {
        if self.total_duels == 0 {
            return 0.5;
        }
        self.wins_attacker as f64 / self.total_duels as f64
    }

    /// Defender win rate (0.0 to 1.0).
    pub fn win_rate_defender(&self) -> f64 {
        if self.total_duels == 0 {
            return 0.5;
        }
        self.wins_defender as f64 / self.total_duels as f64
    }

    /// Check if the matchup is balanced (attacker rate within range).
    pub fn is_balanced(&self, min_rate: f64, max_rate: f64) -> bool {
        let rate = self.win_rate_attacker();
        rate >= min_rate && rate <= max_rate
    }

    fn record(&mut self, result: &DuelResult) {
        let previous_total = f64::from(self.total_duels);
        self.total_duels += 1;
        match result.winner {
            Some(Side::Attacker) => self.wins_attacker += 1,
            Some(Side::Defender) => self.wins_defender += 1,
            None => self.stalls += 1,
        }
        self.avg_rounds = (self.avg_rounds * previous_total + f64::from(result.rounds))
            / f64::from(self.total_duels);
    }
}

/// Play one seeded duel to completion or the round cap.
pub fn simulate_duel(
    attacker: Combatant,
    defender: Combatant,
    seed: u64,
    max_rounds: u32,
) -> DuelResult {
    let mut seeded = SeededDuel::new(attacker, defender, seed);
    for _ in 0..max_rounds {
        if seeded.duel.is_over() {
            break;
        }
        seeded.step();
    }
    let duel = &seeded.duel;
    DuelResult {
        winner: match duel.verdict() {
            Verdict::Victory(side) => Some(side),
            Verdict::Continue => None,
        },
        rounds: duel.round() - 1,
        attacker_hp: duel.attacker().hp(),
        defender_hp: duel.defender().hp(),
    }
}

/// Play `count` duels with seeds `0..count` and aggregate.
pub fn run_matchup<A, D>(attacker: A, defender: D, count: u64, max_rounds: u32) -> BattleStats
where
    A: Fn() -> Combatant,
    D: Fn() -> Combatant,
{
    let mut stats = BattleStats::default();
    for seed in 0..count {
        let result = simulate_duel(attacker(), defender(), seed, max_rounds);
        stats.record(&result);
    }
    tracing::debug!(?stats, "Matchup finished");
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{catalog, fighter, starting_hero};

    #[test]
    fn test_stats_empty() {
        let stats = BattleStats::default();
        assert!((stats.win_rate_attacker() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_mirror_match_is_balanced() {
        let stats = run_matchup(|| fighter("A"), || fighter("B"), 200, 200);
        assert_eq!(stats.total_duels, 200);
        assert_eq!(stats.stalls, 0);
        assert!(stats.is_balanced(0.3, 0.7), "{stats:?}");
    }

    #[test]
    fn test_overwhelming_strength_wins() {
        let stats = run_matchup(
            || Combatant::new("Giant", 1000, 0, 100),
            || fighter("Peasant"),
            50,
            200,
        );
        assert_eq!(stats.wins_attacker, 50);
        assert!(stats.avg_rounds >= 1.0);
    }

    #[test]
    fn test_first_chapter_is_winnable() {
        let catalog = catalog();
        let boss = catalog.chapter_enemy(&catalog.chapters()[0]);
        let stats = run_matchup(|| starting_hero("Hero"), || boss.clone(), 100, 200);
        assert!(stats.win_rate_attacker() > 0.5, "{stats:?}");
    }
}
