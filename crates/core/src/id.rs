//! Unique identifiers for tasks, channels and executions.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use ulid::Ulid;
use uuid::Uuid;

/// Shortest accepted identifier.
pub const MIN_ID_LEN: usize = 6;

/// Longest accepted identifier (enough for a hex encoded 256 bit hash).
pub const MAX_ID_LEN: usize = 64;

const BOOKING_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Errors raised when building an identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    /// Fewer than [`MIN_ID_LEN`] characters
    #[error("id `{0}` is shorter than {MIN_ID_LEN} characters")]
    TooShort(String),

    /// More than [`MAX_ID_LEN`] characters
    #[error("id of {0} characters is longer than {MAX_ID_LEN}")]
    TooLong(usize),
}

/// An opaque identifier used for task identity, channel addressing and tracing.
///
/// Length is checked on construction; equality is by value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UniqueId(String);

impl UniqueId {
    /// Generate a new random id (ULID text).
    pub fn new() -> Self {
        Self(Ulid::new().to_string())
    }

    /// Generate a random v4 UUID id.
    pub fn random_uuid() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Build a random id in a 'booking reference' style, e.g. `BZ13FG`.
    ///
    /// `length` is clamped into the accepted range.
    pub fn random(length: usize) -> Self {
        Self(booking_reference(length.clamp(MIN_ID_LEN, MAX_ID_LEN)))
    }

    /// Create from a provided string.
    pub fn from_string(id: impl Into<String>) -> Result<Self, IdError> {
        let id = id.into();
        let len = id.chars().count();
        if len < MIN_ID_LEN {
            return Err(IdError::TooShort(id));
        }
        if len > MAX_ID_LEN {
            return Err(IdError::TooLong(len));
        }
        Ok(Self(id))
    }

    /// The raw string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for UniqueId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UniqueId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for UniqueId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_string(s)
    }
}

impl TryFrom<String> for UniqueId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_string(value)
    }
}

impl From<UniqueId> for String {
    fn from(id: UniqueId) -> Self {
        id.0
    }
}

impl AsRef<str> for UniqueId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Random upper case alphanumeric string of the given length.
pub fn booking_reference(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| BOOKING_ALPHABET[rng.gen_range(0..BOOKING_ALPHABET.len())] as char)
        .collect()
}

/// Produces resource names following the backend's naming rules.
///
/// Mostly useful in test fakes.
pub trait IdGenerator: Send + Sync {
    /// Create the next id.
    fn create(&self) -> String;
}

/// Six character booking references.
#[derive(Debug, Default)]
pub struct RandomIdGenerator;

impl IdGenerator for RandomIdGenerator {
    fn create(&self) -> String {
        booking_reference(MIN_ID_LEN)
    }
}

/// `0001`, `0002`, ...
#[derive(Debug)]
pub struct SequentialIdGenerator {
    next: AtomicU64,
}

impl SequentialIdGenerator {
    /// Start counting from 1.
    pub fn new() -> Self {
        Self { next: AtomicU64::new(1) }
    }
}

impl Default for SequentialIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn create(&self) -> String {
        format!("{:04}", self.next.fetch_add(1, Ordering::Relaxed))
    }
}
