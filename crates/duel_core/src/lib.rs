//! # Duel Core
//!
//! Deterministic combat core for two-combatant turn-based duels.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No IO (the catalog is embedded; file loading is opt-in)
//! - No system randomness (autonomous combatants take an injected [`rand::Rng`])
//!
//! This separation enables:
//! - Lockstep network duels (both peers replay the same announced actions)
//! - Hot-seat and PvE drivers sharing one engine
//! - Determinism testing
//!
//! ## Crate Structure
//!
//! - [`components`] - Zones, items, abilities, buff accumulators
//! - [`combatant`] - Combatant state, snapshots, inventory management
//! - [`catalog`] - Read-only item/ability tables and the starting kit
//! - [`engine`] - Round and turn resolution
//! - [`controller`] - Action sources (autonomous policy, driver hooks)
//! - [`duel`] - Local duel driver and configuration
//! - [`campaign`] - Chapter progression against autonomous bosses
//! - [`protocol`] - Network message envelope and ordering gate

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod campaign;
pub mod catalog;
pub mod combatant;
pub mod components;
pub mod controller;
pub mod data;
pub mod duel;
pub mod engine;
pub mod error;
pub mod protocol;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::campaign::{Campaign, CampaignResult, Chapter, ChapterOutcome, Reward};
    pub use crate::catalog::Catalog;
    pub use crate::combatant::{Combatant, CombatantKind, Snapshot};
    pub use crate::components::{Ability, AbilityKind, BodyPart, Buffs, Item, ItemKind};
    pub use crate::controller::{Autonomous, Controller};
    pub use crate::duel::{Duel, DuelConfig};
    pub use crate::engine::{
        begin_round, resolve_round, resolve_turn, validate_action, Action, Event, PendingRound,
        RoundOutcome, Side, TurnOutcome, Verdict, Vitals,
    };
    pub use crate::error::{DuelError, Result};
    pub use crate::protocol::{
        ActionKind, ActionMessage, GatePhase, GateViolation, Message, MessageKind, ProtocolGate,
    };
}
