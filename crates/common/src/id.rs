//! ID generation utilities.

use ulid::Ulid;
use uuid::Uuid;

/// ID generator for entities and access tokens.
#[derive(Debug, Clone, Default)]
pub struct IdGenerator {
    _private: (),
}

impl IdGenerator {
    /// Create a new ID generator.
    #[must_use]
    pub const fn new() -> Self {
        Self { _private: () }
    }

    /// Generate a new ULID-based ID.
    ///
    /// ULIDs sort by creation time, which the repositories rely on when
    /// ordering by primary key.
    #[must_use]
    pub fn generate(&self) -> String {
        Ulid::new().to_string().to_lowercase()
    }

    /// Generate a random bearer token.
    #[must_use]
    pub fn generate_token(&self) -> String {
        // v4 has no time component, so tokens are not guessable from ids
        Uuid::new_v4().simple().to_string()
    }
}
