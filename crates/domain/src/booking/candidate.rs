//! Candidate record as the remote systems need to see it.

use common::CandidateId;
use serde::{Deserialize, Serialize};

use super::{LicenceNumber, PersonReference};

/// Postal address held on the candidate record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub line_1: String,
    pub line_2: Option<String>,
    pub city: String,
    pub postcode: String,
}

impl Address {
    /// Creates a new address.
    pub fn new(
        line_1: impl Into<String>,
        line_2: Option<String>,
        city: impl Into<String>,
        postcode: impl Into<String>,
    ) -> Self {
        Self {
            line_1: line_1.into(),
            line_2,
            city: city.into(),
            postcode: postcode.into(),
        }
    }
}

/// A candidate booking a theory test.
///
/// Carries the attributes the remote systems require: the licence number
/// for the customer-record service, the email for notifications, and the
/// payment-side person reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: CandidateId,
    pub first_name: String,
    pub surname: String,
    pub licence_number: LicenceNumber,
    pub email: String,
    pub address: Address,
    /// Payment-system identity reference, if one is already held.
    pub person_reference: Option<PersonReference>,
}

impl Candidate {
    /// Returns the person reference to present to the payment service,
    /// deriving a stable one from the candidate id when none is held.
    pub fn payment_person_reference(&self) -> PersonReference {
        self.person_reference
            .clone()
            .unwrap_or_else(|| PersonReference::derive(self.id))
    }

    /// Returns the candidate's full name for notification content.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.surname)
    }
}
