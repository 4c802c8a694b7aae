//! Pairing code generation.
//!
//! Codes are six random digits. Generation checks the store for a collision
//! before inserting and retries a bounded number of times; the store's unique
//! index is the backstop, and a unique violation on insert is retried too.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use shared::crypto::random_numeric_code;
use shared::validation::PAIRING_CODE_DIGITS;

use crate::models::{PairingCode, PairingCodeRejection};

/// Default number of generation attempts before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Errors from the pairing lifecycle.
#[derive(Debug, Error)]
pub enum PairingError {
    #[error("Pairing code not found")]
    NotFound,

    #[error("Pairing code has expired")]
    Expired,

    #[error("Pairing code has already been used")]
    AlreadyLinked,

    #[error("Could not generate a unique pairing code after {0} attempts")]
    ExhaustedAttempts(u32),

    #[error("Pairing store error: {0}")]
    Store(String),
}

impl From<PairingCodeRejection> for PairingError {
    fn from(rejection: PairingCodeRejection) -> Self {
        match rejection {
            PairingCodeRejection::Expired => PairingError::Expired,
            PairingCodeRejection::AlreadyLinked => PairingError::AlreadyLinked,
        }
    }
}

/// Outcome of inserting a new code.
#[derive(Debug)]
pub enum InsertOutcome {
    Inserted(PairingCode),
    /// The code already exists (unique violation).
    Conflict,
}

/// Storage seam for pairing codes.
#[async_trait]
pub trait PairingCodeStore: Send + Sync {
    /// Whether a code row with this value exists, linked or not.
    async fn code_exists(&self, code: &str) -> Result<bool, PairingError>;

    /// Inserts a fresh unlinked code.
    async fn insert_code(
        &self,
        code: &str,
        parent_id: Uuid,
        created_at: DateTime<Utc>,
    ) -> Result<InsertOutcome, PairingError>;
}

type CodeGenerator = Box<dyn Fn() -> String + Send + Sync>;

/// Creates pairing codes against a store.
pub struct PairingService<S> {
    store: S,
    max_attempts: u32,
    generator: CodeGenerator,
}

impl<S: PairingCodeStore> PairingService<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            generator: Box::new(|| random_numeric_code(PAIRING_CODE_DIGITS)),
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Replaces the random generator, used to force collisions in tests.
    pub fn with_generator<F>(mut self, generator: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        self.generator = Box::new(generator);
        self
    }

    /// Generates and stores a new code for `parent_id`.
    pub async fn create_code(&self, parent_id: Uuid) -> Result<PairingCode, PairingError> {
        for attempt in 1..=self.max_attempts {
            let code = (self.generator)();

            if self.store.code_exists(&code).await? {
                debug!(attempt, "Pairing code collision, retrying");
                continue;
            }

            match self.store.insert_code(&code, parent_id, Utc::now()).await? {
                InsertOutcome::Inserted(created) => return Ok(created),
                InsertOutcome::Conflict => {
                    debug!(attempt, "Pairing code insert conflicted, retrying");
                }
            }
        }

        warn!(
            parent_id = %parent_id,
            attempts = self.max_attempts,
            "Exhausted pairing code generation attempts"
        );
        Err(PairingError::ExhaustedAttempts(self.max_attempts))
    }
}

/// Checks a looked-up code can be linked at `now`.
pub fn validate_for_link(code: Option<&PairingCode>, now: DateTime<Utc>) -> Result<(), PairingError> {
    let code = code.ok_or(PairingError::NotFound)?;
    code.validate(now).map_err(PairingError::from)
}
