use async_trait::async_trait;
use eventease_shared::models::events::InquiryChangedEvent;

use crate::live::InquiryChange;
use crate::CoreResult;

/// Out-of-process delivery of committed changes (mailers, analytics).
///
/// Called after the commit; a failure here never undoes the transition.
#[async_trait]
pub trait ChangeNotifier: Send + Sync {
    async fn notify(&self, change: &InquiryChange) -> CoreResult<()>;
}

/// Used when no message broker is configured
pub struct LogChangeNotifier;

#[async_trait]
impl ChangeNotifier for LogChangeNotifier {
    async fn notify(&self, change: &InquiryChange) -> CoreResult<()> {
        tracing::info!(
            inquiry_id = %change.inquiry.id,
            revision = change.inquiry.revision,
            "Inquiry {}",
            change.kind.as_str()
        );
        Ok(())
    }
}

pub fn changed_event(change: &InquiryChange) -> InquiryChangedEvent {
    let inquiry = &change.inquiry;
    InquiryChangedEvent {
        inquiry_id: inquiry.id,
        client_id: inquiry.client_id.clone(),
        organizer_id: inquiry.organizer_id.clone(),
        change: change.kind.as_str().to_string(),
        status: inquiry.status.as_str().to_string(),
        revision: inquiry.revision,
        quote_amount: inquiry.quote.as_ref().map(|q| q.amount.to_string()),
        quote_currency: inquiry.quote.as_ref().map(|q| q.currency.clone()),
        timestamp: inquiry.updated_at.timestamp(),
    }
}
