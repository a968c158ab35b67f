use thiserror::Error;

/// Errors surfaced by the encounter and economy core.
///
/// Precondition variants are user-visible rejections: nothing was mutated when
/// one of them is returned. Storage variants wrap the sled/bincode layer.
#[derive(Debug, Error)]
pub enum GameError {
    /// Wrapper around sled's error type.
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    /// Wrapper around bincode serialization and deserialization errors.
    #[error("serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    /// Wrapper around JSON errors (prize pool snapshot).
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Wrapper around IO errors (directory creation, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored record was written by an incompatible schema.
    #[error("schema mismatch for {entity}: expected {expected}, found {found}")]
    SchemaMismatch {
        entity: &'static str,
        expected: u8,
        found: u8,
    },

    /// Returned when fetching a record that is not present.
    #[error("record not found: {0}")]
    NotFound(String),

    /// Player update lost every compare-and-swap race within the retry budget.
    #[error("stale write: player record changed underneath {attempts} attempts")]
    StaleWrite { attempts: u32 },

    /// Player is already in an encounter.
    #[error("you are already hunting")]
    AlreadyHunting,

    /// Player is away on an expedition.
    #[error("you are travelling and cannot do that right now")]
    Travelling,

    /// Player has no HP left to fight with.
    #[error("you have no health left, rest before fighting")]
    NoHealth,

    /// Action is still cooling down.
    #[error("{action} is on cooldown until {wait_until_ms}")]
    OnCooldown { action: String, wait_until_ms: i64 },

    /// Another command for the same player holds the lease.
    #[error("another action is already in progress for {0}")]
    Busy(String),

    /// No monster is available at the player's level.
    #[error("no monsters available at level {level}")]
    NoMonsters { level: u32 },

    /// Dungeon move was rejected (wall, bounds, locked door).
    #[error("{0}")]
    Blocked(String),

    /// Insufficient funds for transaction
    #[error("insufficient funds")]
    InsufficientFunds,

    /// Crafting inputs are not in the inventory.
    #[error("missing materials: {0}")]
    MissingMaterials(String),

    /// No recipe with that name exists.
    #[error("unknown recipe: {0}")]
    UnknownRecipe(String),

    /// The shared prize pool lock could not be taken in time.
    #[error("timed out waiting for the prize pool")]
    LockTimeout,

    /// Internal error (task join errors, unexpected conditions)
    #[error("internal error: {0}")]
    Internal(String),

    /// Operation does not apply to the current state (e.g. finishing an idle encounter).
    #[error("invalid state: {0}")]
    InvalidState(String),
}

impl GameError {
    /// True for rejections the player caused, as opposed to storage failures.
    pub fn is_precondition(&self) -> bool {
        !matches!(
            self,
            GameError::Sled(_)
                | GameError::Bincode(_)
                | GameError::Io(_)
                | GameError::Json(_)
                | GameError::SchemaMismatch { .. }
                | GameError::StaleWrite { .. }
                | GameError::LockTimeout
                | GameError::Internal(_)
        )
    }
}
