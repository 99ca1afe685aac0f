use async_trait::async_trait;
use eventease_core::{
    Clock, CoreError, CoreResult, Inquiry, InquiryChange, InquiryRepository, LiveViewHub, Mutation,
    NewInquiry, Precondition, Subscription, ViewScope,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Process-local inquiry store for tests and database-less runs.
///
/// Every write takes the one write guard, checks, applies and publishes
/// before releasing it, so pushes leave in commit order.
pub struct InMemoryInquiryRepository {
    inquiries: RwLock<HashMap<Uuid, Inquiry>>,
    hub: LiveViewHub,
    clock: Arc<dyn Clock>,
}

impl InMemoryInquiryRepository {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_hub(clock, LiveViewHub::default())
    }

    pub fn with_hub(clock: Arc<dyn Clock>, hub: LiveViewHub) -> Self {
        Self {
            inquiries: RwLock::new(HashMap::new()),
            hub,
            clock,
        }
    }

    pub fn hub(&self) -> &LiveViewHub {
        &self.hub
    }
}

#[async_trait]
impl InquiryRepository for InMemoryInquiryRepository {
    async fn insert(&self, client_id: &str, input: NewInquiry) -> CoreResult<Inquiry> {
        let mut inquiries = self.inquiries.write().await;
        let inquiry = Inquiry::new(Uuid::new_v4(), client_id.to_string(), input, self.clock.now());
        inquiries.insert(inquiry.id, inquiry.clone());
        self.hub.publish(InquiryChange::committed(inquiry.clone()));
        Ok(inquiry)
    }

    async fn get(&self, id: Uuid) -> CoreResult<Option<Inquiry>> {
        Ok(self.inquiries.read().await.get(&id).cloned())
    }

    async fn list(&self, scope: &ViewScope) -> CoreResult<Vec<Inquiry>> {
        let inquiries = self.inquiries.read().await;
        let mut matching: Vec<Inquiry> = inquiries
            .values()
            .filter(|inquiry| scope.matches(inquiry))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(matching)
    }

    async fn apply_if(
        &self,
        id: Uuid,
        expected: Precondition,
        mutation: Mutation,
    ) -> CoreResult<Inquiry> {
        let mut inquiries = self.inquiries.write().await;
        let inquiry = inquiries.get_mut(&id).ok_or(CoreError::NotFound(id))?;

        if !expected.matches(inquiry) {
            return Err(CoreError::StaleStateError(format!(
                "inquiry {} is {} at revision {}, expected {} at revision {}",
                id, inquiry.status, inquiry.revision, expected.status, expected.revision
            )));
        }

        let at = inquiry.next_updated_at(self.clock.now());
        inquiry.apply(mutation, at);
        let committed = inquiry.clone();
        self.hub.publish(InquiryChange::committed(committed.clone()));
        Ok(committed)
    }

    async fn subscribe(&self, scope: ViewScope) -> CoreResult<Subscription> {
        // holding the read guard keeps writers out between register and snapshot
        let inquiries = self.inquiries.read().await;
        let subscription = self.hub.register(scope);
        let snapshot = inquiries.values().cloned().collect();
        Ok(subscription.with_snapshot(snapshot))
    }
}
