pub mod transition;
pub mod validation;
pub mod expiry;
pub mod engine;
pub mod query;

#[cfg(test)]
mod proptests;

pub use engine::{LifecycleEngine, LifecycleRules, QuoteSubmission};
pub use query::{InquiryQueries, InquirySummary, OrganizerTab, ScopedSubscription};
pub use transition::{next_status, LifecycleEvent};
