//! Error types for the duel core.

use thiserror::Error;

use crate::components::ItemKind;

/// Result type alias using [`DuelError`].
pub type Result<T> = std::result::Result<T, DuelError>;

/// Top-level error type for all duel core errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DuelError {
    /// Not enough mana to cast the selected ability.
    #[error("Insufficient mana: need {required}, have {available}")]
    InsufficientMana {
        /// Mana cost of the ability.
        required: i32,
        /// Mana the caster currently has.
        available: i32,
    },

    /// Ability index out of range.
    #[error("Invalid ability index: {0}")]
    InvalidAbility(usize),

    /// Inventory index out of range.
    #[error("Invalid inventory index: {0}")]
    InvalidItem(usize),

    /// Equipment index out of range.
    #[error("Invalid equipment index: {0}")]
    InvalidEquipment(usize),

    /// An item of this kind is already equipped.
    #[error("Equipment slot already occupied: {0:?}")]
    SlotOccupied(ItemKind),

    /// Item kind cannot be equipped or consumed.
    #[error("Item '{0}' cannot be used")]
    Unusable(String),

    /// Not enough gold to buy an item.
    #[error("Insufficient gold: need {required}, have {available}")]
    InsufficientGold {
        /// Price of the item.
        required: i32,
        /// Gold the buyer currently has.
        available: i32,
    },

    /// Data file parsing error.
    #[error("Failed to parse data '{source_name}': {message}")]
    CatalogParse {
        /// Name of the data source that failed to parse.
        source_name: String,
        /// Error message.
        message: String,
    },

    /// Invalid duel state.
    #[error("Invalid duel state: {0}")]
    InvalidState(String),
}

impl DuelError {
    /// Whether the caller can recover by selecting a different action.
    ///
    /// Recoverable errors never mutate state.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::InsufficientMana { .. }
                | Self::InvalidAbility(_)
                | Self::InvalidItem(_)
                | Self::InvalidEquipment(_)
                | Self::SlotOccupied(_)
                | Self::Unusable(_)
                | Self::InsufficientGold { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_errors_are_recoverable() {
        assert!(DuelError::InsufficientMana {
            required: 80,
            available: 50
        }
        .is_recoverable());
        assert!(DuelError::InvalidAbility(9).is_recoverable());
        assert!(DuelError::SlotOccupied(ItemKind::Weapon).is_recoverable());
    }

    #[test]
    fn test_data_errors_are_not_recoverable() {
        assert!(!DuelError::InvalidState("broken".into()).is_recoverable());
        assert!(!DuelError::CatalogParse {
            source_name: "catalog.ron".into(),
            message: "eof".into()
        }
        .is_recoverable());
    }

    #[test]
    fn test_error_messages() {
        let err = DuelError::InsufficientMana {
            required: 80,
            available: 50,
        };
        assert_eq!(err.to_string(), "Insufficient mana: need 80, have 50");
    }
}
