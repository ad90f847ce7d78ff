use thiserror::Error;

/// Errors raised by the dragon game core and its storage layer.
///
/// The first group wraps infrastructure failures; the second group is the set of
/// recoverable, user-facing conditions that are rendered back to the player.
#[derive(Debug, Error)]
pub enum GameError {
    /// Wrapper around sled's error type.
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    /// Wrapper around bincode serialization and deserialization errors.
    #[error("serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    /// Wrapper around IO errors (directory creation, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Returned when deserializing a record with an unexpected schema version.
    #[error("schema mismatch for {entity}: expected {expected}, got {found}")]
    SchemaMismatch {
        entity: &'static str,
        expected: u8,
        found: u8,
    },

    /// No record exists for the requested entity.
    #[error("not found: {0}")]
    EntityNotFound(String),

    /// The player has none of this item.
    #[error("you don't have any {0}")]
    ItemNotOwned(String),

    /// The item id is not part of the catalog.
    #[error("unknown item: {0}")]
    UnknownItem(String),

    #[error("not enough gold: need {needed}, have {available}")]
    InsufficientGold { needed: u32, available: u32 },

    #[error("the dragon is too tired: needs {needed} energy, has {available}")]
    InsufficientEnergy { needed: u32, available: u32 },

    #[error("still on cooldown for {remaining_secs}s")]
    OnCooldown { remaining_secs: i64 },

    #[error("daily bonus already claimed today")]
    AlreadyClaimedToday,

    /// Duel is missing, has the wrong status, belongs to someone else or expired.
    #[error("duel unavailable: {0}")]
    DuelUnavailable(String),

    #[error("invalid name: {0}")]
    InvalidName(String),

    /// Internal error (task join errors, unexpected conditions)
    #[error("internal error: {0}")]
    Internal(String),
}

impl GameError {
    /// True for conditions caused by the player's request rather than by the system.
    /// These are rendered as a message and never abort processing.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            GameError::EntityNotFound(_)
                | GameError::ItemNotOwned(_)
                | GameError::UnknownItem(_)
                | GameError::InsufficientGold { .. }
                | GameError::InsufficientEnergy { .. }
                | GameError::OnCooldown { .. }
                | GameError::AlreadyClaimedToday
                | GameError::DuelUnavailable(_)
                | GameError::InvalidName(_)
        )
    }
}
