//! Chapter progression against autonomous bosses.
//!
//! Each chapter is a [`Duel`] with the hero attacking first. A victory pays
//! the chapter's gold, random loot and a reward ability, then partially
//! restores the hero. A defeat ends the campaign. Buffs carry over.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::combatant::Combatant;
use crate::components::{Ability, Item};
use crate::controller::{Autonomous, Controller};
use crate::duel::{Duel, DuelConfig};
use crate::engine::{Side, Verdict};
use crate::error::{DuelError, Result};

/// A chapter ready to be fought.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chapter {
    /// 1-based chapter number.
    pub number: usize,
    /// The boss.
    pub enemy: Combatant,
    /// Gold paid on victory.
    pub gold_drop: i32,
    /// Ability learned on victory.
    pub reward: Ability,
}

/// Spoils of a won chapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reward {
    /// Gold added.
    pub gold: i32,
    /// Items added to the inventory.
    pub loot: Vec<Item>,
    /// Ability learned.
    pub ability: Ability,
    /// HP actually restored.
    pub healed: i32,
    /// Mana actually restored.
    pub mana: i32,
}

/// How a chapter ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChapterOutcome {
    /// The boss fell.
    Won(Reward),
    /// The hero fell.
    Lost,
    /// The round cap was reached first.
    Stalled,
}

/// How the whole campaign ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CampaignResult {
    /// Every chapter was won.
    Completed,
    /// The hero fell in the given chapter.
    Defeated {
        /// 1-based chapter number.
        chapter: usize,
    },
    /// The given chapter hit the round cap.
    Stalled {
        /// 1-based chapter number.
        chapter: usize,
    },
}

/// A hero's run through the catalog's chapters.
#[derive(Debug, Clone)]
pub struct Campaign {
    catalog: Catalog,
    config: DuelConfig,
    hero: Combatant,
    next: usize,
}

impl Campaign {
    /// Start at chapter 1.
    #[must_use]
    pub fn new(catalog: Catalog, config: DuelConfig, hero: Combatant) -> Self {
        Self {
            catalog,
            config,
            hero,
            next: 0,
        }
    }

    /// The hero between chapters.
    #[must_use]
    pub const fn hero(&self) -> &Combatant {
        &self.hero
    }

    /// Mutable hero access, for shopping and equipment between chapters.
    pub fn hero_mut(&mut self) -> &mut Combatant {
        &mut self.hero
    }

    /// The catalog in use.
    #[must_use]
    pub const fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Whether every chapter has been won.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.next >= self.catalog.chapters().len()
    }

    /// The next chapter to fight, if any remain.
    ///
    /// # Errors
    ///
    /// Returns [`DuelError::InvalidAbility`] if the reward ability is missing.
    pub fn current_chapter(&self) -> Result<Option<Chapter>> {
        let Some(data) = self.catalog.chapters().get(self.next) else {
            return Ok(None);
        };
        Ok(Some(Chapter {
            number: self.next + 1,
            enemy: self.catalog.chapter_enemy(data),
            gold_drop: data.gold_drop,
            reward: self.catalog.ability(data.reward_ability)?.clone(),
        }))
    }

    /// Fight the next chapter with `hero` choosing the hero's actions.
    ///
    /// The boss uses the autonomous policy drawing from `rng`, which also
    /// draws the loot.
    ///
    /// # Errors
    ///
    /// - [`DuelError::InvalidState`] if the campaign is already complete
    /// - errors from [`Duel::run`]
    pub fn fight_chapter<H, R>(&mut self, hero: &mut H, rng: &mut R) -> Result<ChapterOutcome>
    where
        H: Controller + ?Sized,
        R: Rng,
    {
        let chapter = self
            .current_chapter()?
            .ok_or_else(|| DuelError::InvalidState("Campaign is already complete".to_string()))?;
        tracing::info!(
            chapter = chapter.number,
            enemy = %chapter.enemy.name,
            "Chapter started"
        );

        let mut enemy_policy =
            Autonomous::new(&mut *rng).with_ability_cadence(self.config.autonomous_ability_cadence);
        let mut duel = Duel::new(self.hero.clone(), chapter.enemy.clone());
        let verdict = duel.run(hero, &mut enemy_policy, self.config.max_rounds)?;
        let (hero_after, _) = duel.into_combatants();
        self.hero = hero_after;

        let outcome = match verdict {
            Verdict::Victory(Side::Attacker) => {
                let reward = self.award_victory(&chapter, rng);
                self.next += 1;
                ChapterOutcome::Won(reward)
            }
            Verdict::Victory(Side::Defender) => ChapterOutcome::Lost,
            Verdict::Continue => ChapterOutcome::Stalled,
        };
        tracing::info!(chapter = chapter.number, ?outcome, "Chapter finished");
        Ok(outcome)
    }

    /// Pay out a won chapter and patch the hero up.
    pub fn award_victory<R: Rng>(&mut self, chapter: &Chapter, rng: &mut R) -> Reward {
        let loot = self
            .catalog
            .random_loot(rng, self.config.loot_min, self.config.loot_max);
        self.hero.gold += chapter.gold_drop;
        self.hero.inventory.extend(loot.iter().cloned());
        self.hero.learn(chapter.reward.clone());
        let healed = self.hero.restore_hp(self.config.heal_between_chapters);
        let mana = self.hero.restore_mana(self.config.mana_between_chapters);
        self.hero.debug_validate();
        Reward {
            gold: chapter.gold_drop,
            loot,
            ability: chapter.reward.clone(),
            healed,
            mana,
        }
    }

    /// Fight every remaining chapter in order.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`fight_chapter`](Self::fight_chapter).
    pub fn run<H, R>(&mut self, hero: &mut H, rng: &mut R) -> Result<CampaignResult>
    where
        H: Controller + ?Sized,
        R: Rng,
    {
        while !self.is_complete() {
            let chapter = self.next + 1;
            match self.fight_chapter(hero, rng)? {
                ChapterOutcome::Won(_) => {}
                ChapterOutcome::Lost => return Ok(CampaignResult::Defeated { chapter }),
                ChapterOutcome::Stalled => return Ok(CampaignResult::Stalled { chapter }),
            }
        }
        Ok(CampaignResult::Completed)
    }
}
