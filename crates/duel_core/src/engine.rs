//! Round and turn resolution.
//!
//! This module turns chosen [`Action`]s into damage, healing and buffs:
//! - Melee hits land iff the attack zone differs from the defended zone
//! - Melee damage is the attacker's effective strength (armor is not subtracted)
//! - Damage abilities are unblockable: `damage + floor(strength / 2)`
//! - A side that casts an ability or uses an item throws no melee that round
//!
//! # Round Order
//!
//! ```text
//! SelectAttackerAction -> begin_round (ability/item applied, melee queued)
//!   -> SelectDefenderAction -> PendingRound::finish (defender effect, melee exchange)
//!   -> Verdict (Continue | Victory)
//! ```
//!
//! Melee damage uses strength captured before either side's effect resolves.

use serde::{Deserialize, Serialize};

use crate::combatant::{Combatant, ItemUse};
use crate::components::{AbilityKind, BodyPart};
use crate::error::Result;

// ============================================================================
// Actions
// ============================================================================

/// A combatant's chosen move for one round (or one network turn).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    /// Strike a zone and guard a zone.
    Melee {
        /// Zone to strike.
        attack: BodyPart,
        /// Zone to guard.
        defend: BodyPart,
    },
    /// Cast a known ability. `defend: None` leaves every zone open.
    Ability {
        /// Index into the caster's abilities.
        index: usize,
        /// Zone to guard while casting.
        defend: Option<BodyPart>,
    },
    /// Consume or equip an inventory item, then guard.
    Item {
        /// Index into the user's inventory.
        index: usize,
        /// Zone to guard.
        defend: BodyPart,
    },
}

impl Action {
    /// Zone this action guards, if any.
    #[must_use]
    pub const fn guard(&self) -> Option<BodyPart> {
        match *self {
            Self::Melee { defend, .. } | Self::Item { defend, .. } => Some(defend),
            Self::Ability { defend, .. } => defend,
        }
    }

    /// Zone this action strikes, if it is a melee attack.
    #[must_use]
    pub const fn attack_zone(&self) -> Option<BodyPart> {
        match *self {
            Self::Melee { attack, .. } => Some(attack),
            Self::Ability { .. } | Self::Item { .. } => None,
        }
    }
}

/// Which side of a round an event or verdict refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// The side whose action is selected and resolved first.
    Attacker,
    /// The side answering the attacker.
    Defender,
}

impl Side {
    /// The other side.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Attacker => Self::Defender,
            Self::Defender => Self::Attacker,
        }
    }
}

// ============================================================================
// Outcomes
// ============================================================================

/// A single resolved effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    /// A melee strike, landed or blocked.
    Strike {
        /// Side that struck.
        side: Side,
        /// Zone struck.
        zone: BodyPart,
        /// Zone the target guarded, if any.
        guard: Option<BodyPart>,
        /// Damage dealt (zero when blocked).
        damage: i32,
        /// Whether the guard matched the zone.
        blocked: bool,
    },
    /// A damage ability hit the opponent.
    AbilityDamage {
        /// Caster side.
        side: Side,
        /// Ability name.
        ability: String,
        /// Damage dealt.
        damage: i32,
    },
    /// A heal ability restored the caster.
    Heal {
        /// Caster side.
        side: Side,
        /// Ability name.
        ability: String,
        /// HP actually restored after clamping.
        amount: i32,
    },
    /// A buff ability raised the caster's accumulators.
    Buff {
        /// Caster side.
        side: Side,
        /// Ability name.
        ability: String,
        /// Attack added.
        attack: i32,
        /// Defense added.
        defense: i32,
    },
    /// A consumable was used.
    ItemConsumed {
        /// User side.
        side: Side,
        /// Item name.
        item: String,
        /// HP actually restored.
        hp: i32,
        /// Mana actually restored.
        mana: i32,
    },
    /// A weapon or armor was equipped.
    ItemEquipped {
        /// User side.
        side: Side,
        /// Item name.
        item: String,
    },
}

/// Vitals after resolution, for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Vitals {
    /// Current HP.
    pub hp: i32,
    /// Current mana.
    pub mana: i32,
    /// Whether `hp > 0`.
    pub alive: bool,
}

impl Vitals {
    /// Read vitals from a combatant.
    #[must_use]
    pub const fn of(combatant: &Combatant) -> Self {
        Self {
            hp: combatant.hp(),
            mana: combatant.mana(),
            alive: combatant.is_alive(),
        }
    }
}

/// Terminal check result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    /// Both sides still standing.
    Continue,
    /// The duel is over; the given side won.
    Victory(Side),
}

impl Verdict {
    /// Decide the verdict from both sides' alive flags.
    ///
    /// The attacker is checked first: if it stands it wins, otherwise the
    /// defender is declared victor. A double knock-out therefore goes to the
    /// defender.
    #[must_use]
    pub const fn decide(attacker_alive: bool, defender_alive: bool) -> Self {
        match (attacker_alive, defender_alive) {
            (true, true) => Self::Continue,
            (true, false) => Self::Victory(Side::Attacker),
            (false, _) => Self::Victory(Side::Defender),
        }
    }

    /// Whether the duel is over.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Victory(_))
    }
}

/// Everything that happened in a two-sided round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundOutcome {
    /// Effects in resolution order.
    pub events: Vec<Event>,
    /// Attacker vitals after the round.
    pub attacker: Vitals,
    /// Defender vitals after the round.
    pub defender: Vitals,
    /// Terminal check.
    pub verdict: Verdict,
}

/// Everything that happened in a single-sided network turn.
///
/// The acting side is reported as [`Side::Attacker`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnOutcome {
    /// Effects in resolution order.
    pub events: Vec<Event>,
    /// Actor vitals after the turn.
    pub actor: Vitals,
    /// Target vitals after the turn.
    pub target: Vitals,
    /// Terminal check (actor checked first).
    pub verdict: Verdict,
}

// ============================================================================
// Resolution
// ============================================================================

/// Check that an action can be applied, without mutating anything.
///
/// # Errors
///
/// - [`DuelError::InvalidAbility`](crate::error::DuelError::InvalidAbility) /
///   [`DuelError::InsufficientMana`](crate::error::DuelError::InsufficientMana)
///   for abilities
/// - inventory errors from [`Combatant::check_item`] for items
pub fn validate_action(actor: &Combatant, action: &Action) -> Result<()> {
    match *action {
        Action::Melee { .. } => Ok(()),
        Action::Ability { index, .. } => {
            let ability = actor.ability(index)?;
            if actor.mana() < ability.mana_cost {
                return Err(crate::error::DuelError::InsufficientMana {
                    required: ability.mana_cost,
                    available: actor.mana(),
                });
            }
            Ok(())
        }
        Action::Item { index, .. } => actor.check_item(index).map(|_| ()),
    }
}

/// Apply the non-melee part of an action (ability or item) for `side`.
fn apply_effect(
    side: Side,
    actor: &mut Combatant,
    target: &mut Combatant,
    action: &Action,
) -> Result<Option<Event>> {
    match *action {
        Action::Melee { .. } => Ok(None),
        Action::Ability { index, .. } => {
            let ability = actor.ability(index)?.clone();
            actor.spend_mana(ability.mana_cost)?;
            let event = match ability.kind {
                AbilityKind::Damage => {
                    let damage = ability.damage + actor.strength().div_euclid(2);
                    target.take_damage(damage);
                    Event::AbilityDamage {
                        side,
                        ability: ability.name,
                        damage,
                    }
                }
                AbilityKind::Heal => {
                    let amount = actor.restore_hp(ability.heal);
                    Event::Heal {
                        side,
                        ability: ability.name,
                        amount,
                    }
                }
                AbilityKind::Buff => {
                    actor.buffs.apply(&ability);
                    Event::Buff {
                        side,
                        ability: ability.name,
                        attack: ability.attack_buff,
                        defense: ability.defense_buff,
                    }
                }
            };
            tracing::debug!(?event, caster = %actor.name, "Ability resolved");
            Ok(Some(event))
        }
        Action::Item { index, .. } => {
            let event = match actor.use_item(index)? {
                ItemUse::Consumed { item, hp, mana } => Event::ItemConsumed {
                    side,
                    item: item.name,
                    hp,
                    mana,
                },
                ItemUse::Equipped { item } => Event::ItemEquipped {
                    side,
                    item: item.name,
                },
            };
            Ok(Some(event))
        }
    }
}

/// Resolve one melee strike against a guard.
fn strike(
    side: Side,
    zone: BodyPart,
    strength: i32,
    target: &mut Combatant,
    guard: Option<BodyPart>,
) -> Event {
    let blocked = guard == Some(zone);
    let damage = if blocked { 0 } else { strength };
    target.take_damage(damage);
    let event = Event::Strike {
        side,
        zone,
        guard,
        damage,
        blocked,
    };
    tracing::debug!(?event, target = %target.name, "Strike resolved");
    event
}

/// A round whose attacker action has resolved and whose melee is queued.
///
/// Created by [`begin_round`]; completed by [`PendingRound::finish`], which
/// can be retried after a rejected defender action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRound {
    attacker_action: Action,
    attacker_strength: i32,
    events: Vec<Event>,
}

impl PendingRound {
    /// Apply the defender's action and the melee exchange.
    ///
    /// # Errors
    ///
    /// Returns the validation error for the defender's action without
    /// mutating either combatant; the pending round stays usable.
    pub fn finish(
        &self,
        attacker: &mut Combatant,
        defender: &mut Combatant,
        defender_action: &Action,
    ) -> Result<RoundOutcome> {
        validate_action(defender, defender_action)?;
        let defender_strength = defender.strength();
        let mut events = self.events.clone();

        if let Some(event) = apply_effect(Side::Defender, defender, attacker, defender_action)? {
            events.push(event);
        }

        if let Some(zone) = self.attacker_action.attack_zone() {
            events.push(strike(
                Side::Attacker,
                zone,
                self.attacker_strength,
                defender,
                defender_action.guard(),
            ));
        }
        if let Some(zone) = defender_action.attack_zone() {
            events.push(strike(
                Side::Defender,
                zone,
                defender_strength,
                attacker,
                self.attacker_action.guard(),
            ));
        }

        attacker.debug_validate();
        defender.debug_validate();

        let verdict = Verdict::decide(attacker.is_alive(), defender.is_alive());
        Ok(RoundOutcome {
            events,
            attacker: Vitals::of(attacker),
            defender: Vitals::of(defender),
            verdict,
        })
    }
}

/// Resolve the attacker's action immediately and queue its melee, if any.
///
/// # Errors
///
/// Returns the validation error for the attacker's action without mutating
/// either combatant.
pub fn begin_round(
    attacker: &mut Combatant,
    defender: &mut Combatant,
    attacker_action: Action,
) -> Result<PendingRound> {
    validate_action(attacker, &attacker_action)?;
    let attacker_strength = attacker.strength();
    let events = apply_effect(Side::Attacker, attacker, defender, &attacker_action)?
        .into_iter()
        .collect();
    Ok(PendingRound {
        attacker_action,
        attacker_strength,
        events,
    })
}

/// Resolve a full two-sided round.
///
/// Both actions are validated before anything is applied, so a rejected
/// action leaves both combatants untouched.
///
/// # Errors
///
/// Returns the first validation error (attacker checked first).
pub fn resolve_round(
    attacker: &mut Combatant,
    defender: &mut Combatant,
    attacker_action: Action,
    defender_action: Action,
) -> Result<RoundOutcome> {
    validate_action(attacker, &attacker_action)?;
    validate_action(defender, &defender_action)?;
    let pending = begin_round(attacker, defender, attacker_action)?;
    pending.finish(attacker, defender, &defender_action)
}

/// Resolve a single-sided turn, as played in network duels.
///
/// `target_guard` is the zone from the target's most recent announced action
/// (`None` before its first one).
///
/// # Errors
///
/// Returns the validation error for the action without mutating anything.
pub fn resolve_turn(
    actor: &mut Combatant,
    target: &mut Combatant,
    action: Action,
    target_guard: Option<BodyPart>,
) -> Result<TurnOutcome> {
    validate_action(actor, &action)?;
    let strength = actor.strength();
    let mut events: Vec<Event> = apply_effect(Side::Attacker, actor, target, &action)?
        .into_iter()
        .collect();
    if let Some(zone) = action.attack_zone() {
        events.push(strike(Side::Attacker, zone, strength, target, target_guard));
    }

    actor.debug_validate();
    target.debug_validate();

    Ok(TurnOutcome {
        events,
        actor: Vitals::of(actor),
        target: Vitals::of(target),
        verdict: Verdict::decide(actor.is_alive(), target.is_alive()),
    })
}
