use chrono::{DateTime, Duration, NaiveDate, Utc};
use eventease_shared::Masked;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::repository::Mutation;
use crate::CoreError;

/// Inquiry status in the lifecycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum InquiryStatus {
    New,
    Quoted,
    Accepted,
    Declined,
    Cancelled,
}

impl InquiryStatus {
    pub const ALL: [InquiryStatus; 5] = [
        InquiryStatus::New,
        InquiryStatus::Quoted,
        InquiryStatus::Accepted,
        InquiryStatus::Declined,
        InquiryStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InquiryStatus::New => "new",
            InquiryStatus::Quoted => "quoted",
            InquiryStatus::Accepted => "accepted",
            InquiryStatus::Declined => "declined",
            InquiryStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            InquiryStatus::Accepted | InquiryStatus::Declined | InquiryStatus::Cancelled
        )
    }
}

impl fmt::Display for InquiryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InquiryStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        InquiryStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CoreError::ValidationError(format!("Unknown inquiry status: {}", s)))
    }
}

/// The client's answer to a quote
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Accept,
    Decline,
}

impl Decision {
    pub fn resulting_status(&self) -> InquiryStatus {
        match self {
            Decision::Accept => InquiryStatus::Accepted,
            Decision::Decline => InquiryStatus::Declined,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Accept => "accept",
            Decision::Decline => "decline",
        }
    }
}

/// How the organizer reaches the client once a quote is accepted
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContactInfo {
    pub name: String,
    pub email: Masked<String>,
    pub phone: Masked<String>,
}

/// An organizer's priced offer, embedded in the inquiry it answers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Quote {
    pub organizer_id: String,
    pub organizer_name: String,
    pub amount: Decimal,
    pub currency: String,
    pub message: String,
    pub submitted_at: DateTime<Utc>,
}

/// Quote fields supplied by the engine; the store stamps `submitted_at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteDraft {
    pub organizer_id: String,
    pub organizer_name: String,
    pub amount: Decimal,
    pub currency: String,
    pub message: String,
}

impl QuoteDraft {
    pub fn into_quote(self, submitted_at: DateTime<Utc>) -> Quote {
        Quote {
            organizer_id: self.organizer_id,
            organizer_name: self.organizer_name,
            amount: self.amount,
            currency: self.currency,
            message: self.message,
            submitted_at,
        }
    }
}

/// Client-supplied fields of a new inquiry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewInquiry {
    pub event_type: String,
    pub event_date: NaiveDate,
    pub description: String,
    pub location: String,
    #[serde(default)]
    pub expected_guests: Option<u32>,
    pub contact: ContactInfo,
}

/// A client's request for event services; the unit of lifecycle tracking
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Inquiry {
    pub id: Uuid,
    pub client_id: String,
    pub event_type: String,
    pub event_date: NaiveDate,
    pub description: String,
    pub location: String,
    pub expected_guests: Option<u32>,
    pub contact: Option<ContactInfo>,
    pub organizer_id: Option<String>,
    pub status: InquiryStatus,
    pub quote: Option<Quote>,
    pub revision: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
}

impl Inquiry {
    pub fn new(id: Uuid, client_id: String, input: NewInquiry, now: DateTime<Utc>) -> Self {
        Self {
            id,
            client_id,
            event_type: input.event_type,
            event_date: input.event_date,
            description: input.description,
            location: input.location,
            expected_guests: input.expected_guests,
            contact: Some(input.contact),
            organizer_id: None,
            status: InquiryStatus::New,
            quote: None,
            revision: 1,
            created_at: now,
            updated_at: now,
            responded_at: None,
            cancellation_reason: None,
        }
    }

    pub fn is_owned_by(&self, client_id: &str) -> bool {
        self.client_id == client_id
    }

    /// Timestamp for the next transition: never earlier than `now`, always
    /// strictly after the current `updated_at`.
    pub fn next_updated_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let floor = self.updated_at + Duration::microseconds(1);
        if now > floor {
            now
        } else {
            floor
        }
    }

    /// Apply an already-guarded mutation. Stores call this only after the
    /// precondition check passed under the same write serialization.
    pub fn apply(&mut self, mutation: Mutation, at: DateTime<Utc>) {
        match mutation {
            Mutation::AttachQuote(draft) => {
                self.organizer_id = Some(draft.organizer_id.clone());
                self.quote = Some(draft.into_quote(at));
                self.status = InquiryStatus::Quoted;
            }
            Mutation::Respond { decision } => {
                self.status = decision.resulting_status();
                self.responded_at = Some(at);
            }
            Mutation::Cancel { reason } => {
                self.status = InquiryStatus::Cancelled;
                self.cancellation_reason = reason;
            }
        }
        self.revision += 1;
        self.updated_at = at;
    }
}
