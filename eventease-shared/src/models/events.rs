use uuid::Uuid;

/// Published once per committed inquiry transition.
///
/// Carries no client contact details: downstream consumers (notification
/// mailers, analytics) look those up themselves if they are entitled to them.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
pub struct InquiryChangedEvent {
    pub inquiry_id: Uuid,
    pub client_id: String,
    pub organizer_id: Option<String>,
    pub change: String,
    pub status: String,
    pub revision: u64,
    pub quote_amount: Option<String>,
    pub quote_currency: Option<String>,
    pub timestamp: i64,
}

impl InquiryChangedEvent {
    /// Partition key; keeps every change of one inquiry on one partition so
    /// consumers see them in commit order.
    pub fn key(&self) -> String {
        self.inquiry_id.to_string()
    }
}

/// Sent to a live viewer right before its stream ends because the feed failed.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct LiveFeedErrorEvent {
    pub code: String,
    pub message: String,
}
