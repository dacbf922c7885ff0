use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Candidate-facing booking reference.
///
/// This is the reference the candidate sees on confirmation pages and
/// emails, and the key under which the scheduling and customer-record
/// systems correlate a booking. Wrapping the UUID keeps it from being
/// mixed up with other UUID-based identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookingRef(Uuid);

impl BookingRef {
    /// Creates a new random booking reference.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a booking reference from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for BookingRef {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for BookingRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for BookingRef {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<BookingRef> for Uuid {
    fn from(id: BookingRef) -> Self {
        id.0
    }
}

/// Unique identifier for a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandidateId(Uuid);

impl CandidateId {
    /// Creates a new random candidate ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a candidate ID from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for CandidateId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CandidateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for CandidateId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<CandidateId> for Uuid {
    fn from(id: CandidateId) -> Self {
        id.0
    }
}
