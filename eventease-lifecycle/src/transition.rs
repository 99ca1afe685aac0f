//! Inquiry status state machine.
//!
//! ```text
//! new ──quote──▶ quoted ──accept──▶ accepted
//!  │               │
//!  │               └────decline──▶ declined
//!  └──cancel──▶ cancelled ◀──cancel──┘ (from quoted)
//! ```

use eventease_core::{CoreError, CoreResult, Decision, InquiryStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    QuoteSubmitted,
    QuoteAccepted,
    QuoteDeclined,
    Cancelled,
}

impl LifecycleEvent {
    pub const ALL: [LifecycleEvent; 4] = [
        LifecycleEvent::QuoteSubmitted,
        LifecycleEvent::QuoteAccepted,
        LifecycleEvent::QuoteDeclined,
        LifecycleEvent::Cancelled,
    ];

    pub fn for_decision(decision: Decision) -> Self {
        match decision {
            Decision::Accept => LifecycleEvent::QuoteAccepted,
            Decision::Decline => LifecycleEvent::QuoteDeclined,
        }
    }

    /// Verb used in rejection messages
    pub fn action(&self) -> &'static str {
        match self {
            LifecycleEvent::QuoteSubmitted => "quote",
            LifecycleEvent::QuoteAccepted => "accept",
            LifecycleEvent::QuoteDeclined => "decline",
            LifecycleEvent::Cancelled => "cancel",
        }
    }
}

/// Pure transition table. Everything not listed is rejected.
pub fn next_status(from: InquiryStatus, event: LifecycleEvent) -> CoreResult<InquiryStatus> {
    use InquiryStatus::*;

    match (from, event) {
        (New, LifecycleEvent::QuoteSubmitted) => Ok(Quoted),
        (Quoted, LifecycleEvent::QuoteAccepted) => Ok(Accepted),
        (Quoted, LifecycleEvent::QuoteDeclined) => Ok(Declined),
        (New | Quoted, LifecycleEvent::Cancelled) => Ok(Cancelled),
        (from, event) => Err(CoreError::invalid_transition(from, event.action())),
    }
}

/// True if some event moves `from` to `to` in one step.
pub fn is_single_step(from: InquiryStatus, to: InquiryStatus) -> bool {
    LifecycleEvent::ALL
        .into_iter()
        .any(|event| matches!(next_status(from, event), Ok(next) if next == to))
}

/// Checks an observed status history (repeats allowed) against the table.
pub fn is_valid_path(observed: &[InquiryStatus]) -> bool {
    match observed.first() {
        Some(InquiryStatus::New) | None => {}
        Some(_) => return false,
    }
    observed
        .windows(2)
        .all(|pair| pair[0] == pair[1] || is_single_step(pair[0], pair[1]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let quoted = next_status(InquiryStatus::New, LifecycleEvent::QuoteSubmitted).unwrap();
        assert_eq!(quoted, InquiryStatus::Quoted);
        let accepted = next_status(quoted, LifecycleEvent::QuoteAccepted).unwrap();
        assert_eq!(accepted, InquiryStatus::Accepted);
    }

    #[test]
    fn test_cannot_accept_new_inquiry() {
        let result = next_status(InquiryStatus::New, LifecycleEvent::QuoteAccepted);
        assert!(matches!(
            result,
            Err(CoreError::InvalidTransitionError { from: InquiryStatus::New, .. })
        ));
    }

    #[test]
    fn test_cannot_quote_twice() {
        assert!(next_status(InquiryStatus::Quoted, LifecycleEvent::QuoteSubmitted).is_err());
    }

    #[test]
    fn test_terminal_states_reject_everything() {
        for terminal in [InquiryStatus::Accepted, InquiryStatus::Declined, InquiryStatus::Cancelled] {
            for event in LifecycleEvent::ALL {
                assert!(next_status(terminal, event).is_err(), "{:?} accepted {:?}", terminal, event);
            }
        }
    }

    #[test]
    fn test_path_validation() {
        use InquiryStatus::*;
        assert!(is_valid_path(&[New, New, Quoted, Accepted]));
        assert!(is_valid_path(&[New, Cancelled]));
        assert!(!is_valid_path(&[New, Accepted]));
        assert!(!is_valid_path(&[New, Quoted, Accepted, Quoted]));
        assert!(!is_valid_path(&[Quoted, Accepted]));
    }
}
