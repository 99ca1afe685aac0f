//! Live View Synchronizer.
//!
//! Stores publish every committed inquiry change into a [`LiveViewHub`]; each
//! viewer holds a [`Subscription`] that starts from a snapshot and then yields
//! the matching pushes. Pushes for one document arrive in commit order.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use uuid::Uuid;

use crate::inquiry::{Inquiry, InquiryStatus};
use crate::{CoreError, CoreResult};

/// Which inquiries a viewer is watching
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewScope {
    /// A single inquiry, e.g. the quote detail page
    Inquiry(Uuid),
    /// Everything owned by one client
    Client(String),
    /// Every inquiry regardless of owner (organizer triage)
    AllInquiries,
}

impl ViewScope {
    pub fn matches(&self, inquiry: &Inquiry) -> bool {
        match self {
            ViewScope::Inquiry(id) => inquiry.id == *id,
            ViewScope::Client(client_id) => inquiry.client_id == *client_id,
            ViewScope::AllInquiries => true,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Created,
    Quoted,
    Accepted,
    Declined,
    Cancelled,
}

impl ChangeKind {
    /// Every status is entered by exactly one kind of transition.
    pub fn for_status(status: InquiryStatus) -> Self {
        match status {
            InquiryStatus::New => ChangeKind::Created,
            InquiryStatus::Quoted => ChangeKind::Quoted,
            InquiryStatus::Accepted => ChangeKind::Accepted,
            InquiryStatus::Declined => ChangeKind::Declined,
            InquiryStatus::Cancelled => ChangeKind::Cancelled,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Created => "created",
            ChangeKind::Quoted => "quoted",
            ChangeKind::Accepted => "accepted",
            ChangeKind::Declined => "declined",
            ChangeKind::Cancelled => "cancelled",
        }
    }
}

/// One committed write, carrying the document as it was committed
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InquiryChange {
    pub kind: ChangeKind,
    pub inquiry: Inquiry,
}

impl InquiryChange {
    pub fn committed(inquiry: Inquiry) -> Self {
        Self {
            kind: ChangeKind::for_status(inquiry.status),
            inquiry,
        }
    }
}

#[derive(Debug, Clone)]
enum FeedMessage {
    Committed(InquiryChange),
    Failed(String),
}

/// Fan-out point between a store and its live viewers.
#[derive(Clone)]
pub struct LiveViewHub {
    tx: broadcast::Sender<FeedMessage>,
    active: Arc<AtomicUsize>,
}

impl LiveViewHub {
    /// `capacity` bounds how far a slow subscriber may fall behind before it
    /// is cut off with a transport error.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            active: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Must be called in commit order for any single document.
    pub fn publish(&self, change: InquiryChange) {
        tracing::debug!(
            inquiry_id = %change.inquiry.id,
            revision = change.inquiry.revision,
            kind = change.kind.as_str(),
            "Publishing live change"
        );
        // no receivers is fine: nobody is watching
        let _ = self.tx.send(FeedMessage::Committed(change));
    }

    /// Report that the underlying transport broke; every open subscription
    /// receives a `TransportError` and finishes.
    pub fn fail(&self, reason: impl Into<String>) {
        let reason = reason.into();
        tracing::error!("Live feed failed: {}", reason);
        let _ = self.tx.send(FeedMessage::Failed(reason));
    }

    /// Open a subscription with an empty snapshot.
    ///
    /// Stores register first and read the snapshot second (or do both under
    /// one lock), then seed it with [`Subscription::with_snapshot`]; nothing
    /// committed after registration can be missed.
    pub fn register(&self, scope: ViewScope) -> Subscription {
        self.active.fetch_add(1, Ordering::SeqCst);
        let subscription = Subscription {
            id: Uuid::new_v4(),
            scope,
            snapshot: Vec::new(),
            seen: HashMap::new(),
            rx: Some(self.tx.subscribe()),
            active: self.active.clone(),
        };
        tracing::debug!(subscription_id = %subscription.id, scope = ?subscription.scope, "Live view registered");
        subscription
    }

    pub fn active_subscriptions(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

impl Default for LiveViewHub {
    fn default() -> Self {
        Self::new(256)
    }
}

/// Handle for one live view. Dropping it unregisters the view.
pub struct Subscription {
    id: Uuid,
    scope: ViewScope,
    snapshot: Vec<Inquiry>,
    seen: HashMap<Uuid, u64>,
    rx: Option<broadcast::Receiver<FeedMessage>>,
    active: Arc<AtomicUsize>,
}

impl Subscription {
    /// Seed the initial snapshot: filtered to the scope, newest first.
    pub fn with_snapshot(mut self, snapshot: Vec<Inquiry>) -> Self {
        let mut snapshot: Vec<Inquiry> = snapshot
            .into_iter()
            .filter(|inquiry| self.scope.matches(inquiry))
            .collect();
        snapshot.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        for inquiry in &snapshot {
            self.seen.insert(inquiry.id, inquiry.revision);
        }
        self.snapshot = snapshot;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn scope(&self) -> &ViewScope {
        &self.scope
    }

    pub fn snapshot(&self) -> &[Inquiry] {
        &self.snapshot
    }

    pub fn take_snapshot(&mut self) -> Vec<Inquiry> {
        std::mem::take(&mut self.snapshot)
    }

    pub fn is_active(&self) -> bool {
        self.rx.is_some()
    }

    /// Wait for the next matching change.
    ///
    /// Returns `Ok(None)` once the subscription has been cancelled. A
    /// transport failure is returned once as `TransportError`, after which the
    /// subscription is finished; it is never resumed automatically.
    pub async fn next(&mut self) -> CoreResult<Option<InquiryChange>> {
        loop {
            let rx = match self.rx.as_mut() {
                Some(rx) => rx,
                None => return Ok(None),
            };

            match rx.recv().await {
                Ok(FeedMessage::Committed(change)) => {
                    if !self.scope.matches(&change.inquiry) {
                        continue;
                    }
                    let last_seen = self.seen.get(&change.inquiry.id).copied().unwrap_or(0);
                    if change.inquiry.revision <= last_seen {
                        // already covered by the snapshot or an earlier push
                        continue;
                    }
                    self.seen.insert(change.inquiry.id, change.inquiry.revision);
                    return Ok(Some(change));
                }
                Ok(FeedMessage::Failed(reason)) => {
                    self.cancel();
                    return Err(CoreError::TransportError(reason));
                }
                Err(RecvError::Lagged(missed)) => {
                    self.cancel();
                    return Err(CoreError::TransportError(format!(
                        "live view fell behind by {} changes",
                        missed
                    )));
                }
                Err(RecvError::Closed) => {
                    self.cancel();
                    return Err(CoreError::TransportError("live feed closed".to_string()));
                }
            }
        }
    }

    /// Unregister. Safe to call any number of times.
    pub fn cancel(&mut self) {
        if self.rx.take().is_some() {
            self.active.fetch_sub(1, Ordering::SeqCst);
            tracing::debug!(subscription_id = %self.id, "Live view unregistered");
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}
