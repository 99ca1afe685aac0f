//! Property-based tests for the inquiry state machine

use crate::transition::*;
use eventease_core::InquiryStatus;
use proptest::prelude::*;

fn arb_event() -> impl Strategy<Value = LifecycleEvent> {
    prop_oneof![
        Just(LifecycleEvent::QuoteSubmitted),
        Just(LifecycleEvent::QuoteAccepted),
        Just(LifecycleEvent::QuoteDeclined),
        Just(LifecycleEvent::Cancelled),
    ]
}

fn arb_status() -> impl Strategy<Value = InquiryStatus> {
    prop_oneof![
        Just(InquiryStatus::New),
        Just(InquiryStatus::Quoted),
        Just(InquiryStatus::Accepted),
        Just(InquiryStatus::Declined),
        Just(InquiryStatus::Cancelled),
    ]
}

/// Position along the only forward direction the machine has.
fn depth(status: InquiryStatus) -> u8 {
    match status {
        InquiryStatus::New => 0,
        InquiryStatus::Quoted => 1,
        _ => 2,
    }
}

proptest! {
    #[test]
    fn prop_applied_events_form_valid_path(events in prop::collection::vec(arb_event(), 0..20)) {
        let mut status = InquiryStatus::New;
        let mut observed = vec![status];
        for event in events {
            if let Ok(next) = next_status(status, event) {
                status = next;
            }
            observed.push(status);
        }
        prop_assert!(is_valid_path(&observed));
    }

    #[test]
    fn prop_transitions_never_move_backwards(from in arb_status(), event in arb_event()) {
        if let Ok(to) = next_status(from, event) {
            prop_assert!(depth(to) > depth(from));
            prop_assert!(!from.is_terminal());
        }
    }

    #[test]
    fn prop_terminal_states_are_absorbing(from in arb_status(), event in arb_event()) {
        if from.is_terminal() {
            prop_assert!(next_status(from, event).is_err());
        }
    }

    #[test]
    fn prop_quoted_reaches_at_most_one_response(first in arb_event(), second in arb_event()) {
        let responses = [LifecycleEvent::QuoteAccepted, LifecycleEvent::QuoteDeclined];
        if responses.contains(&first) && responses.contains(&second) {
            let after_first = next_status(InquiryStatus::Quoted, first).unwrap();
            prop_assert!(next_status(after_first, second).is_err());
        }
    }
}
