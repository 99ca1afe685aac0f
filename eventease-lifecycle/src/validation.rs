//! Input checks that run before any store access.

use chrono::NaiveDate;
use eventease_core::{ContactInfo, CoreError, CoreResult, NewInquiry};
use eventease_shared::Masked;

use crate::engine::{LifecycleRules, QuoteSubmission};

const MAX_SHORT_FIELD: usize = 200;
const MAX_LONG_FIELD: usize = 4000;
const MAX_EXPECTED_GUESTS: u32 = 100_000;

fn required(field: &str, value: &str) -> CoreResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(CoreError::ValidationError(format!("{} is required", field)));
    }
    Ok(value.to_string())
}

fn bounded(field: &str, value: String, max: usize) -> CoreResult<String> {
    if value.chars().count() > max {
        return Err(CoreError::ValidationError(format!(
            "{} must be at most {} characters",
            field, max
        )));
    }
    Ok(value)
}

/// Trim and check a client's inquiry; returns the cleaned copy to store.
pub fn validate_new_inquiry(input: NewInquiry, today: NaiveDate) -> CoreResult<NewInquiry> {
    let event_type = bounded("event_type", required("event_type", &input.event_type)?, MAX_SHORT_FIELD)?;
    let description = bounded("description", required("description", &input.description)?, MAX_LONG_FIELD)?;
    let location = bounded("location", required("location", &input.location)?, MAX_SHORT_FIELD)?;

    if input.event_date < today {
        return Err(CoreError::ValidationError(format!(
            "event_date {} is in the past",
            input.event_date
        )));
    }

    if let Some(guests) = input.expected_guests {
        if guests > MAX_EXPECTED_GUESTS {
            return Err(CoreError::ValidationError(format!(
                "expected_guests must be at most {}",
                MAX_EXPECTED_GUESTS
            )));
        }
    }

    let name = bounded("contact.name", required("contact.name", &input.contact.name)?, MAX_SHORT_FIELD)?;
    let email = required("contact.email", input.contact.email.expose())?;
    if !email.contains('@') || email.starts_with('@') || email.ends_with('@') {
        return Err(CoreError::ValidationError("contact.email is not a valid address".to_string()));
    }
    let phone = bounded("contact.phone", required("contact.phone", input.contact.phone.expose())?, MAX_SHORT_FIELD)?;

    Ok(NewInquiry {
        event_type,
        event_date: input.event_date,
        description,
        location,
        expected_guests: input.expected_guests,
        contact: ContactInfo {
            name,
            email: Masked::new(email),
            phone: Masked::new(phone),
        },
    })
}

/// Check a quote against the rules; returns the normalised currency code.
pub fn validate_quote(submission: &QuoteSubmission, rules: &LifecycleRules) -> CoreResult<String> {
    if submission.amount <= rust_decimal::Decimal::ZERO {
        return Err(CoreError::ValidationError("amount must be greater than zero".to_string()));
    }
    if submission.amount.normalize().scale() > 2 {
        return Err(CoreError::ValidationError(
            "amount must have at most two decimal places".to_string(),
        ));
    }

    let currency = submission.currency.trim().to_ascii_uppercase();
    if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(CoreError::ValidationError(format!(
            "currency '{}' is not a three-letter code",
            submission.currency
        )));
    }
    if !rules.supports_currency(&currency) {
        return Err(CoreError::ValidationError(format!("currency {} is not supported", currency)));
    }

    if submission.message.chars().count() > MAX_LONG_FIELD {
        return Err(CoreError::ValidationError(format!(
            "message must be at most {} characters",
            MAX_LONG_FIELD
        )));
    }

    Ok(currency)
}
