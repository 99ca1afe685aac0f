//! Role-Scoped Query Layer.
//!
//! Pure filters and sorts over the store: clients see only their own
//! inquiries, organizers and admins see everything. Organizer views have the
//! client's contact details removed until that organizer's quote is accepted.

use chrono::Duration;
use eventease_core::{
    Caller, Clock, CoreError, CoreResult, Inquiry, InquiryChange, InquiryRepository, InquiryStatus,
    Role, Subscription, ViewScope,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::expiry;

pub fn scope_for(caller: &Caller) -> ViewScope {
    match caller.role {
        Role::Client => ViewScope::Client(caller.id.clone()),
        Role::Organizer | Role::Admin => ViewScope::AllInquiries,
    }
}

pub fn can_view(caller: &Caller, inquiry: &Inquiry) -> bool {
    match caller.role {
        Role::Client => inquiry.is_owned_by(&caller.id),
        Role::Organizer | Role::Admin => true,
    }
}

pub fn redact_for(caller: &Caller, mut inquiry: Inquiry) -> Inquiry {
    if caller.role == Role::Organizer {
        let revealed = inquiry.status == InquiryStatus::Accepted
            && inquiry.organizer_id.as_deref() == Some(caller.id.as_str());
        if !revealed {
            inquiry.contact = None;
        }
    }
    inquiry
}

/// Organizer dashboard tabs over the one shared result set
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OrganizerTab {
    New,
    Quoted,
    Accepted,
    #[default]
    All,
}

impl OrganizerTab {
    pub fn includes(&self, status: InquiryStatus) -> bool {
        match self {
            OrganizerTab::New => status == InquiryStatus::New,
            OrganizerTab::Quoted => status == InquiryStatus::Quoted,
            OrganizerTab::Accepted => status == InquiryStatus::Accepted,
            OrganizerTab::All => true,
        }
    }

    pub fn filter(&self, inquiries: Vec<Inquiry>) -> Vec<Inquiry> {
        inquiries
            .into_iter()
            .filter(|inquiry| self.includes(inquiry.status))
            .collect()
    }
}

/// An inquiry as listed, plus its quoting countdown when one applies
#[derive(Debug, Clone, Serialize)]
pub struct InquirySummary {
    #[serde(flatten)]
    pub inquiry: Inquiry,
    pub time_remaining_secs: Option<i64>,
    pub countdown: Option<String>,
}

pub struct InquiryQueries {
    repo: Arc<dyn InquiryRepository>,
    clock: Arc<dyn Clock>,
    response_window: Option<Duration>,
}

impl InquiryQueries {
    pub fn new(
        repo: Arc<dyn InquiryRepository>,
        clock: Arc<dyn Clock>,
        response_window: Option<Duration>,
    ) -> Self {
        Self {
            repo,
            clock,
            response_window,
        }
    }

    /// Everything the caller may see, newest first.
    pub async fn list_visible(&self, caller: &Caller) -> CoreResult<Vec<Inquiry>> {
        let mut inquiries: Vec<Inquiry> = self
            .repo
            .list(&scope_for(caller))
            .await?
            .into_iter()
            .filter(|inquiry| can_view(caller, inquiry))
            .map(|inquiry| redact_for(caller, inquiry))
            .collect();
        inquiries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(inquiries)
    }

    pub async fn list_tab(&self, caller: &Caller, tab: OrganizerTab) -> CoreResult<Vec<Inquiry>> {
        Ok(tab.filter(self.list_visible(caller).await?))
    }

    pub async fn get_visible(&self, caller: &Caller, inquiry_id: Uuid) -> CoreResult<Inquiry> {
        let inquiry = self
            .repo
            .get(inquiry_id)
            .await?
            .ok_or(CoreError::NotFound(inquiry_id))?;
        if !can_view(caller, &inquiry) {
            tracing::debug!(inquiry_id = %inquiry_id, caller = %caller.id, "Point read refused");
            return Err(CoreError::AuthorizationError(format!(
                "inquiry {} does not belong to the caller",
                inquiry_id
            )));
        }
        Ok(redact_for(caller, inquiry))
    }

    pub fn summarize(&self, inquiry: Inquiry) -> InquirySummary {
        let remaining = expiry::time_remaining(&inquiry, self.clock.now(), self.response_window);
        InquirySummary {
            time_remaining_secs: remaining.map(|left| left.num_seconds()),
            countdown: remaining.map(expiry::countdown_label),
            inquiry,
        }
    }

    /// Live view of everything the caller may see.
    pub async fn watch_visible(&self, caller: &Caller) -> CoreResult<ScopedSubscription> {
        let inner = self.repo.subscribe(scope_for(caller)).await?;
        Ok(ScopedSubscription::new(inner, caller.clone()))
    }

    /// Live view of one inquiry; refused up front if the caller may not read it.
    pub async fn watch_inquiry(&self, caller: &Caller, inquiry_id: Uuid) -> CoreResult<ScopedSubscription> {
        self.get_visible(caller, inquiry_id).await?;
        let inner = self.repo.subscribe(ViewScope::Inquiry(inquiry_id)).await?;
        Ok(ScopedSubscription::new(inner, caller.clone()))
    }
}

/// A live subscription with the caller's visibility and redaction applied
pub struct ScopedSubscription {
    inner: Subscription,
    caller: Caller,
}

impl ScopedSubscription {
    fn new(inner: Subscription, caller: Caller) -> Self {
        Self { inner, caller }
    }

    pub fn id(&self) -> Uuid {
        self.inner.id()
    }

    pub fn snapshot(&self) -> Vec<Inquiry> {
        self.inner
            .snapshot()
            .iter()
            .filter(|inquiry| can_view(&self.caller, inquiry))
            .map(|inquiry| redact_for(&self.caller, inquiry.clone()))
            .collect()
    }

    pub fn take_snapshot(&mut self) -> Vec<Inquiry> {
        let caller = &self.caller;
        self.inner
            .take_snapshot()
            .into_iter()
            .filter(|inquiry| can_view(caller, inquiry))
            .map(|inquiry| redact_for(caller, inquiry))
            .collect()
    }

    pub async fn next(&mut self) -> CoreResult<Option<InquiryChange>> {
        loop {
            match self.inner.next().await? {
                Some(change) if can_view(&self.caller, &change.inquiry) => {
                    return Ok(Some(InquiryChange {
                        kind: change.kind,
                        inquiry: redact_for(&self.caller, change.inquiry),
                    }));
                }
                Some(_) => continue,
                None => return Ok(None),
            }
        }
    }

    pub fn is_active(&self) -> bool {
        self.inner.is_active()
    }

    pub fn cancel(&mut self) {
        self.inner.cancel();
    }
}
