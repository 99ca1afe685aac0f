//! Lifecycle Engine: the only path by which an inquiry changes status.
//!
//! Every operation follows the same shape: check the caller, validate input,
//! read the current document, consult the transition table, then issue one
//! conditional apply against the store. No locks are held between the read
//! and the write; the store's compare-and-set decides races.

use chrono::Duration;
use eventease_core::notify::ChangeNotifier;
use eventease_core::{
    Caller, Clock, CoreError, CoreResult, Decision, Inquiry, InquiryChange, InquiryRepository,
    InquiryStatus, Mutation, NewInquiry, Precondition, QuoteDraft, Role,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::expiry;
use crate::transition::{next_status, LifecycleEvent};
use crate::validation::{validate_new_inquiry, validate_quote};

/// Business rules that vary per deployment
#[derive(Debug, Clone)]
pub struct LifecycleRules {
    pub supported_currencies: Vec<String>,
    /// How long after creation a quote may still be submitted. `None` disables the check.
    pub response_window: Option<Duration>,
}

impl LifecycleRules {
    pub fn supports_currency(&self, code: &str) -> bool {
        self.supported_currencies
            .iter()
            .any(|supported| supported.eq_ignore_ascii_case(code))
    }
}

impl Default for LifecycleRules {
    fn default() -> Self {
        Self {
            supported_currencies: vec!["GBP".to_string(), "EUR".to_string(), "USD".to_string()],
            response_window: Some(Duration::hours(24)),
        }
    }
}

/// An organizer's quote as submitted
#[derive(Debug, Clone, Deserialize)]
pub struct QuoteSubmission {
    pub amount: Decimal,
    pub currency: String,
    #[serde(default)]
    pub message: String,
    /// Revision of the inquiry the organizer was looking at, if known
    #[serde(default)]
    pub expected_revision: Option<u64>,
}

pub struct LifecycleEngine {
    repo: Arc<dyn InquiryRepository>,
    notifier: Arc<dyn ChangeNotifier>,
    clock: Arc<dyn Clock>,
    rules: LifecycleRules,
}

impl LifecycleEngine {
    pub fn new(
        repo: Arc<dyn InquiryRepository>,
        notifier: Arc<dyn ChangeNotifier>,
        clock: Arc<dyn Clock>,
        rules: LifecycleRules,
    ) -> Self {
        Self {
            repo,
            notifier,
            clock,
            rules,
        }
    }

    pub fn rules(&self) -> &LifecycleRules {
        &self.rules
    }

    pub async fn create_inquiry(&self, caller: &Caller, input: NewInquiry) -> CoreResult<Inquiry> {
        caller.require_role(Role::Client)?;
        let input = validate_new_inquiry(input, self.clock.today())?;

        let inquiry = self.repo.insert(&caller.id, input).await?;
        tracing::info!(
            inquiry_id = %inquiry.id,
            client_id = %inquiry.client_id,
            event_type = %inquiry.event_type,
            "Inquiry created"
        );
        self.after_commit(&inquiry).await;
        Ok(inquiry)
    }

    /// Attach an organizer's quote to a `new` inquiry. First writer wins;
    /// the loser of a race gets `StaleStateError`.
    pub async fn submit_quote(
        &self,
        caller: &Caller,
        inquiry_id: Uuid,
        submission: QuoteSubmission,
    ) -> CoreResult<Inquiry> {
        caller.require_role(Role::Organizer)?;
        let currency = validate_quote(&submission, &self.rules)?;

        let current = self.load(inquiry_id).await?;
        if let Some(expected) = submission.expected_revision {
            if expected != current.revision {
                tracing::debug!(
                    inquiry_id = %inquiry_id,
                    expected,
                    actual = current.revision,
                    "Quote submitted against a stale view"
                );
                return Err(CoreError::StaleStateError(format!(
                    "inquiry {} changed since it was viewed (revision {} is now {})",
                    inquiry_id, expected, current.revision
                )));
            }
        }
        next_status(current.status, LifecycleEvent::QuoteSubmitted)?;
        if expiry::is_expired(&current, self.clock.now(), self.rules.response_window) {
            return Err(CoreError::ResponseWindowClosed { inquiry_id });
        }

        let draft = QuoteDraft {
            organizer_id: caller.id.clone(),
            organizer_name: caller.display_name().to_string(),
            amount: submission.amount,
            currency,
            message: submission.message.trim().to_string(),
        };

        let inquiry = match self
            .repo
            .apply_if(inquiry_id, Precondition::of(&current), Mutation::AttachQuote(draft))
            .await
        {
            Ok(inquiry) => inquiry,
            Err(e @ CoreError::StaleStateError(_)) => {
                tracing::warn!(
                    inquiry_id = %inquiry_id,
                    organizer_id = %caller.id,
                    "Quote lost a race with another organizer"
                );
                return Err(e);
            }
            Err(e) => return Err(e),
        };

        tracing::info!(
            inquiry_id = %inquiry.id,
            organizer_id = %caller.id,
            revision = inquiry.revision,
            "Quote submitted"
        );
        self.after_commit(&inquiry).await;
        Ok(inquiry)
    }

    /// The owning client accepts or declines a `quoted` inquiry.
    pub async fn respond_to_quote(
        &self,
        caller: &Caller,
        inquiry_id: Uuid,
        decision: Decision,
    ) -> CoreResult<Inquiry> {
        caller.require_role(Role::Client)?;
        let current = self.load(inquiry_id).await?;
        if !current.is_owned_by(&caller.id) {
            return Err(CoreError::AuthorizationError(format!(
                "inquiry {} does not belong to the caller",
                inquiry_id
            )));
        }

        let event = LifecycleEvent::for_decision(decision);
        next_status(current.status, event)?;

        let inquiry = match self
            .repo
            .apply_if(inquiry_id, Precondition::of(&current), Mutation::Respond { decision })
            .await
        {
            Ok(inquiry) => inquiry,
            Err(CoreError::StaleStateError(reason)) => {
                // someone else moved it first: report what it is now
                let latest = self.load(inquiry_id).await?;
                if latest.status != InquiryStatus::Quoted {
                    return Err(CoreError::invalid_transition(latest.status, event.action()));
                }
                return Err(CoreError::StaleStateError(reason));
            }
            Err(e) => return Err(e),
        };

        tracing::info!(
            inquiry_id = %inquiry.id,
            decision = decision.as_str(),
            revision = inquiry.revision,
            "Quote answered"
        );
        self.after_commit(&inquiry).await;
        Ok(inquiry)
    }

    /// Withdraw a `new` or `quoted` inquiry. Admins may cancel anything,
    /// clients only their own.
    pub async fn cancel_inquiry(
        &self,
        caller: &Caller,
        inquiry_id: Uuid,
        reason: Option<String>,
    ) -> CoreResult<Inquiry> {
        let current = self.load(inquiry_id).await?;
        let permitted = match caller.role {
            Role::Admin => true,
            Role::Client => current.is_owned_by(&caller.id),
            Role::Organizer => false,
        };
        if !permitted {
            return Err(CoreError::AuthorizationError(format!(
                "caller may not cancel inquiry {}",
                inquiry_id
            )));
        }

        next_status(current.status, LifecycleEvent::Cancelled)?;

        let reason = reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());
        let inquiry = self
            .repo
            .apply_if(inquiry_id, Precondition::of(&current), Mutation::Cancel { reason })
            .await?;

        tracing::info!(
            inquiry_id = %inquiry.id,
            cancelled_by = %caller.id,
            role = %caller.role,
            "Inquiry cancelled"
        );
        self.after_commit(&inquiry).await;
        Ok(inquiry)
    }

    async fn load(&self, inquiry_id: Uuid) -> CoreResult<Inquiry> {
        self.repo
            .get(inquiry_id)
            .await?
            .ok_or(CoreError::NotFound(inquiry_id))
    }

    async fn after_commit(&self, inquiry: &Inquiry) {
        let change = InquiryChange::committed(inquiry.clone());
        if let Err(e) = self.notifier.notify(&change).await {
            tracing::warn!(
                inquiry_id = %inquiry.id,
                error = %e,
                "Change notification failed; transition stays committed"
            );
        }
    }
}
