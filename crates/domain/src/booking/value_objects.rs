//! Value objects for the booking domain.

use common::CandidateId;
use serde::{Deserialize, Serialize};

/// Money amount in pence to avoid floating point issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money {
    /// Amount in pence (e.g., 2300 = £23.00)
    pence: i64,
}

impl Money {
    /// Creates a new Money amount from pence.
    pub fn from_pence(pence: i64) -> Self {
        Self { pence }
    }

    /// Creates a new Money amount from a whole-pound value.
    pub fn from_pounds(pounds: i64) -> Self {
        Self {
            pence: pounds * 100,
        }
    }

    /// Returns zero money.
    pub fn zero() -> Self {
        Self { pence: 0 }
    }

    /// Returns the amount in pence.
    pub fn pence(&self) -> i64 {
        self.pence
    }

    /// Returns the pound portion (whole number).
    pub fn pounds(&self) -> i64 {
        self.pence / 100
    }

    /// Returns the pence portion (remainder after pounds).
    pub fn pence_part(&self) -> i64 {
        self.pence.abs() % 100
    }

    /// Returns true if the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.pence == 0
    }

    /// Returns true if the amount is positive.
    pub fn is_positive(&self) -> bool {
        self.pence > 0
    }

    /// Formats the amount as the two-decimal string the payment service
    /// expects, without a currency symbol (e.g., `"23.00"`).
    pub fn to_amount_string(&self) -> String {
        if self.pence < 0 {
            format!("-{}.{:02}", self.pounds().abs(), self.pence_part())
        } else {
            format!("{}.{:02}", self.pounds(), self.pence_part())
        }
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.pence < 0 {
            write!(f, "-£{}.{:02}", self.pounds().abs(), self.pence_part())
        } else {
            write!(f, "£{}.{:02}", self.pounds(), self.pence_part())
        }
    }
}

impl std::ops::Add for Money {
    type Output = Money;

    fn add(self, rhs: Self) -> Self::Output {
        Money {
            pence: self.pence + rhs.pence,
        }
    }
}

impl std::ops::Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Self) -> Self::Output {
        Money {
            pence: self.pence - rhs.pence,
        }
    }
}

/// Category of theory test being booked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TestType {
    /// Car theory test.
    Car,
    /// Motorcycle theory test.
    Motorcycle,
    /// Lorry (LGV) theory test.
    Lgv,
    /// Bus and coach (PCV) theory test.
    Pcv,
}

impl TestType {
    /// Returns the standard fee charged for this test type.
    pub fn standard_fee(&self) -> Money {
        match self {
            TestType::Car | TestType::Motorcycle => Money::from_pence(2300),
            TestType::Lgv | TestType::Pcv => Money::from_pence(2600),
        }
    }

    /// Returns the test type name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            TestType::Car => "Car",
            TestType::Motorcycle => "Motorcycle",
            TestType::Lgv => "Lgv",
            TestType::Pcv => "Pcv",
        }
    }
}

impl std::fmt::Display for TestType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Scheduling region a test centre belongs to.
///
/// Reservations and releases are scoped to the owning region; the
/// scheduling system routes by this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Region {
    A,
    B,
    C,
}

impl Region {
    /// Returns the region code the scheduling system expects.
    pub fn as_str(&self) -> &'static str {
        match self {
            Region::A => "a",
            Region::B => "b",
            Region::C => "c",
        }
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A test centre where theory tests are sat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCentre {
    /// Scheduling-system centre identifier.
    pub id: String,
    /// Human-readable centre name.
    pub name: String,
    /// Region the centre belongs to.
    pub region: Region,
}

impl TestCentre {
    /// Creates a new test centre.
    pub fn new(id: impl Into<String>, name: impl Into<String>, region: Region) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            region,
        }
    }
}

/// A time-boxed hold on scheduling capacity.
///
/// Reservation ids are scheduling-system-scoped and ephemeral: one exists
/// only between reserve and either confirm or release, and is never
/// reused across bookings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReservationId(String);

impl ReservationId {
    /// Creates a reservation id from the scheduling system's value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the reservation id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ReservationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ReservationId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ReservationId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Driving licence number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LicenceNumber(String);

impl LicenceNumber {
    /// Creates a licence number, normalising to upper case.
    pub fn new(number: impl Into<String>) -> Self {
        Self(number.into().to_uppercase())
    }

    /// Returns the licence number as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LicenceNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Payment-side identity reference for a candidate.
///
/// The payment service disambiguates payer identity by this value; it is
/// never absent on the wire. When a candidate record carries none, one is
/// derived deterministically from the candidate id so that repeat calls
/// for the same candidate always present the same reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersonReference(String);

impl PersonReference {
    /// Wraps a reference already held on the candidate record.
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    /// Derives a stable reference from the candidate id.
    pub fn derive(candidate_id: CandidateId) -> Self {
        Self(format!("P{}", candidate_id.as_uuid().simple()))
    }

    /// Returns the reference as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PersonReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
