use async_trait::async_trait;
use uuid::Uuid;

use crate::inquiry::{Decision, Inquiry, InquiryStatus, NewInquiry, QuoteDraft};
use crate::live::{Subscription, ViewScope};
use crate::CoreResult;

/// What the caller believed about the document when it decided to write.
///
/// A conditional apply succeeds only if the stored inquiry still matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Precondition {
    pub revision: u64,
    pub status: InquiryStatus,
}

impl Precondition {
    pub fn of(inquiry: &Inquiry) -> Self {
        Self {
            revision: inquiry.revision,
            status: inquiry.status,
        }
    }

    pub fn matches(&self, inquiry: &Inquiry) -> bool {
        inquiry.revision == self.revision
            && inquiry.status == self.status
            // a `new` inquiry must still be unclaimed
            && (self.status != InquiryStatus::New || inquiry.organizer_id.is_none())
    }
}

/// A guarded change to one inquiry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    AttachQuote(QuoteDraft),
    Respond { decision: Decision },
    Cancel { reason: Option<String> },
}

impl Mutation {
    pub fn target_status(&self) -> InquiryStatus {
        match self {
            Mutation::AttachQuote(_) => InquiryStatus::Quoted,
            Mutation::Respond { decision } => decision.resulting_status(),
            Mutation::Cancel { .. } => InquiryStatus::Cancelled,
        }
    }
}

/// Durable inquiry store; the single source of truth.
///
/// Implementations must make `apply_if` a single atomic check-and-write and
/// publish every committed change to their live view hub in commit order.
#[async_trait]
pub trait InquiryRepository: Send + Sync {
    /// Insert a new inquiry; the store assigns `id`, `revision` and timestamps.
    async fn insert(&self, client_id: &str, input: NewInquiry) -> CoreResult<Inquiry>;

    async fn get(&self, id: Uuid) -> CoreResult<Option<Inquiry>>;

    /// Inquiries matching `scope`, newest first.
    async fn list(&self, scope: &ViewScope) -> CoreResult<Vec<Inquiry>>;

    /// Apply `mutation` only if the stored inquiry still matches `expected`.
    ///
    /// Fails with `NotFound` for an unknown id and `StaleStateError` when the
    /// precondition no longer holds; the document is untouched in both cases.
    async fn apply_if(
        &self,
        id: Uuid,
        expected: Precondition,
        mutation: Mutation,
    ) -> CoreResult<Inquiry>;

    /// Register a live view: current snapshot plus every later matching commit.
    async fn subscribe(&self, scope: ViewScope) -> CoreResult<Subscription>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inquiry::ContactInfo;
    use chrono::{NaiveDate, Utc};
    use eventease_shared::Masked;

    fn inquiry() -> Inquiry {
        Inquiry::new(
            Uuid::new_v4(),
            "client-1".to_string(),
            NewInquiry {
                event_type: "Birthday Party".to_string(),
                event_date: NaiveDate::from_ymd_opt(2031, 3, 14).unwrap(),
                description: "DJ and decorations".to_string(),
                location: "45 Parkview Avenue, London".to_string(),
                expected_guests: Some(30),
                contact: ContactInfo {
                    name: "Sam".to_string(),
                    email: Masked::from("sam@example.com"),
                    phone: Masked::from("+44 131 496 0000"),
                },
            },
            Utc::now(),
        )
    }

    #[test]
    fn test_precondition_matches_current_state() {
        let inquiry = inquiry();
        assert!(Precondition::of(&inquiry).matches(&inquiry));
    }

    #[test]
    fn test_precondition_rejects_newer_revision() {
        let mut inquiry = inquiry();
        let expected = Precondition::of(&inquiry);
        inquiry.revision += 1;
        assert!(!expected.matches(&inquiry));
    }

    #[test]
    fn test_precondition_rejects_claimed_new_inquiry() {
        let mut inquiry = inquiry();
        let expected = Precondition::of(&inquiry);
        inquiry.organizer_id = Some("org-9".to_string());
        assert!(!expected.matches(&inquiry));
    }

    #[test]
    fn test_mutation_target_status() {
        assert_eq!(
            Mutation::Respond { decision: Decision::Decline }.target_status(),
            InquiryStatus::Declined
        );
        assert_eq!(
            Mutation::Cancel { reason: None }.target_status(),
            InquiryStatus::Cancelled
        );
    }
}
