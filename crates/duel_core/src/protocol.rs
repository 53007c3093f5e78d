//! Turn message protocol.
//!
//! Peers exchange [`Message`]s. The ordering contract is enforced on the
//! receiving side by [`ProtocolGate`]:
//!
//! ```text
//! Bootstrap:  Snapshot -> Ready
//! Combat:     (Action -> Snapshot)*   (one pair per opponent turn)
//! Always:     Chat, Disconnect        (never advance the gate)
//! ```
//!
//! Anything else is a [`GateViolation`] and the session must fail closed.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::combatant::Snapshot;
use crate::components::BodyPart;
use crate::engine::Action;
use crate::error::{DuelError, Result};

// ============================================================================
// Messages
// ============================================================================

/// Protocol envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Message {
    /// The acting side's action for this turn.
    Action(ActionMessage),
    /// Readiness barrier before combat.
    Ready,
    /// Combatant projection after bootstrap or an acting turn.
    Snapshot(Snapshot),
    /// Free text for display.
    Chat {
        /// Message text.
        text: String,
    },
    /// Graceful session end.
    Disconnect,
}

impl Message {
    /// Envelope kind.
    #[must_use]
    pub const fn kind(&self) -> MessageKind {
        match self {
            Self::Action(_) => MessageKind::Action,
            Self::Ready => MessageKind::Ready,
            Self::Snapshot(_) => MessageKind::Snapshot,
            Self::Chat { .. } => MessageKind::Chat,
            Self::Disconnect => MessageKind::Disconnect,
        }
    }

    /// Whether this message belongs to the turn sequence (as opposed to the
    /// side channel).
    #[must_use]
    pub const fn is_turn_message(&self) -> bool {
        self.kind().is_turn_kind()
    }
}

impl From<Action> for Message {
    fn from(action: Action) -> Self {
        Self::Action(action.into())
    }
}

/// Message kind tag, used in ordering errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    /// [`Message::Action`].
    Action,
    /// [`Message::Ready`].
    Ready,
    /// [`Message::Snapshot`].
    Snapshot,
    /// [`Message::Chat`].
    Chat,
    /// [`Message::Disconnect`].
    Disconnect,
}

impl MessageKind {
    /// Action, Snapshot and Ready drive the turn sequence.
    #[must_use]
    pub const fn is_turn_kind(self) -> bool {
        matches!(self, Self::Action | Self::Snapshot | Self::Ready)
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Action => "Action",
            Self::Ready => "Ready",
            Self::Snapshot => "Snapshot",
            Self::Chat => "Chat",
            Self::Disconnect => "Disconnect",
        };
        f.write_str(name)
    }
}

/// Action tag on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    /// Melee strike.
    Attack,
    /// Ability cast.
    Ability,
    /// Item use.
    Item,
}

/// Wire form of an [`Action`].
///
/// Every field is always present so the message reads the same in every
/// wire format; unused fields are `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionMessage {
    /// Action tag.
    pub kind: ActionKind,
    /// Struck zone (melee only).
    pub target: Option<BodyPart>,
    /// Guarded zone, if any.
    pub defend: Option<BodyPart>,
    /// Ability index (ability only).
    pub ability: Option<usize>,
    /// Inventory index (item only).
    pub item: Option<usize>,
}

impl From<Action> for ActionMessage {
    fn from(action: Action) -> Self {
        let blank = Self {
            kind: ActionKind::Attack,
            target: None,
            defend: action.guard(),
            ability: None,
            item: None,
        };
        match action {
            Action::Melee { attack, .. } => Self {
                target: Some(attack),
                ..blank
            },
            Action::Ability { index, .. } => Self {
                kind: ActionKind::Ability,
                ability: Some(index),
                ..blank
            },
            Action::Item { index, .. } => Self {
                kind: ActionKind::Item,
                item: Some(index),
                ..blank
            },
        }
    }
}

impl TryFrom<ActionMessage> for Action {
    type Error = DuelError;

    fn try_from(message: ActionMessage) -> Result<Self> {
        let missing = |field: &str| {
            DuelError::InvalidState(format!("{:?} action is missing its {field}", message.kind))
        };
        match message.kind {
            ActionKind::Attack => Ok(Self::Melee {
                attack: message.target.ok_or_else(|| missing("target zone"))?,
                defend: message.defend.ok_or_else(|| missing("defended zone"))?,
            }),
            ActionKind::Ability => Ok(Self::Ability {
                index: message.ability.ok_or_else(|| missing("ability index"))?,
                defend: message.defend,
            }),
            ActionKind::Item => Ok(Self::Item {
                index: message.item.ok_or_else(|| missing("item index"))?,
                defend: message.defend.ok_or_else(|| missing("defended zone"))?,
            }),
        }
    }
}

// ============================================================================
// Ordering gate
// ============================================================================

/// An inbound message arrived out of order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Protocol violation: expected {expected}, received {received}")]
pub struct GateViolation {
    /// Kind the gate was waiting for.
    pub expected: MessageKind,
    /// Kind that arrived.
    pub received: MessageKind,
}

/// Where the inbound sequence currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GatePhase {
    /// Waiting for the peer's bootstrap snapshot.
    AwaitSnapshot,
    /// Waiting for the peer's Ready.
    AwaitReady,
    /// Combat: waiting for the peer's next Action.
    AwaitAction,
    /// Combat: waiting for the Snapshot following the peer's Action.
    AwaitTurnSnapshot,
}

impl GatePhase {
    const fn expected(self) -> MessageKind {
        match self {
            Self::AwaitSnapshot | Self::AwaitTurnSnapshot => MessageKind::Snapshot,
            Self::AwaitReady => MessageKind::Ready,
            Self::AwaitAction => MessageKind::Action,
        }
    }
}

/// Receiving-side ordering state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProtocolGate {
    phase: GatePhase,
}

impl Default for ProtocolGate {
    fn default() -> Self {
        Self::new()
    }
}

impl ProtocolGate {
    /// Start in bootstrap.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            phase: GatePhase::AwaitSnapshot,
        }
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> GatePhase {
        self.phase
    }

    /// The turn-sequence kind the gate accepts next.
    #[must_use]
    pub const fn expected(&self) -> MessageKind {
        self.phase.expected()
    }

    /// Whether bootstrap has finished.
    #[must_use]
    pub const fn in_combat(&self) -> bool {
        matches!(
            self.phase,
            GatePhase::AwaitAction | GatePhase::AwaitTurnSnapshot
        )
    }

    /// Admit an inbound message kind, advancing the phase.
    ///
    /// Chat and Disconnect are always admitted and never advance.
    ///
    /// # Errors
    ///
    /// Returns [`GateViolation`] (and leaves the phase unchanged) when the
    /// kind is not the one expected.
    pub fn admit(&mut self, received: MessageKind) -> std::result::Result<(), GateViolation> {
        if !received.is_turn_kind() {
            return Ok(());
        }
        let expected = self.phase.expected();
        if received != expected {
            tracing::warn!(%expected, %received, "Out-of-order message");
            return Err(GateViolation { expected, received });
        }
        self.phase = match self.phase {
            GatePhase::AwaitSnapshot => GatePhase::AwaitReady,
            GatePhase::AwaitReady | GatePhase::AwaitTurnSnapshot => GatePhase::AwaitAction,
            GatePhase::AwaitAction => GatePhase::AwaitTurnSnapshot,
        };
        Ok(())
    }
}
