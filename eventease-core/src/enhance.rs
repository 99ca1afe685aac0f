//! Text-enhancement collaborator used before an inquiry is submitted.
//!
//! It never touches lifecycle state, and a failing enhancer must not stop the
//! client from submitting the text they typed.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{CoreError, CoreResult};

pub const REFINED_MARKER: &str = "[Refined for clarity and a professional tone]";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnhancementContext {
    pub event_type: Option<String>,
    pub location: Option<String>,
    pub expected_guests: Option<u32>,
}

#[derive(Debug, thiserror::Error)]
pub enum EnhanceError {
    #[error("Enhancement service unavailable: {0}")]
    Unavailable(String),
    #[error("Enhancement rejected: {0}")]
    Rejected(String),
}

#[async_trait]
pub trait TextEnhancer: Send + Sync {
    async fn enhance(&self, text: &str, context: &EnhancementContext) -> Result<String, EnhanceError>;
}

/// Deterministic stand-in for a generative model: tidies whitespace,
/// capitalises sentences, terminates the text and marks it as refined.
pub struct ToneEnhancer;

#[async_trait]
impl TextEnhancer for ToneEnhancer {
    async fn enhance(&self, text: &str, context: &EnhancementContext) -> Result<String, EnhanceError> {
        let body = text.replace(REFINED_MARKER, "");
        let paragraphs: Vec<String> = body
            .split("\n\n")
            .map(tidy_paragraph)
            .filter(|p| !p.is_empty())
            .collect();

        if paragraphs.is_empty() {
            return Err(EnhanceError::Rejected("nothing to refine".to_string()));
        }

        let mut refined = paragraphs.join("\n\n");
        if let (Some(event_type), Some(guests)) = (&context.event_type, context.expected_guests) {
            if !refined.contains(&guests.to_string()) {
                refined.push_str(&format!("\n\nPlanned {} for around {} guests.", event_type, guests));
            }
        }
        refined.push_str("\n\n");
        refined.push_str(REFINED_MARKER);
        Ok(refined)
    }
}

fn tidy_paragraph(paragraph: &str) -> String {
    let collapsed = paragraph.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return collapsed;
    }

    let mut out = String::with_capacity(collapsed.len() + 1);
    let mut capitalise = true;
    for ch in collapsed.chars() {
        if capitalise && ch.is_alphabetic() {
            out.extend(ch.to_uppercase());
            capitalise = false;
        } else {
            out.push(ch);
        }
        if matches!(ch, '.' | '!' | '?') {
            capitalise = true;
        }
    }
    if !out.ends_with(['.', '!', '?']) {
        out.push('.');
    }
    out
}

#[derive(Debug, Clone, Serialize)]
pub struct EnhancementOutcome {
    pub text: String,
    pub enhanced: bool,
}

/// Run the enhancer, falling back to the original text if it fails.
pub async fn enhance_or_original(
    enhancer: &dyn TextEnhancer,
    text: &str,
    context: &EnhancementContext,
) -> CoreResult<EnhancementOutcome> {
    if text.trim().is_empty() {
        return Err(CoreError::ValidationError(
            "description required before it can be enhanced".to_string(),
        ));
    }

    match enhancer.enhance(text, context).await {
        Ok(refined) => Ok(EnhancementOutcome {
            text: refined,
            enhanced: true,
        }),
        Err(e) => {
            tracing::warn!("Description enhancement failed, keeping original text: {}", e);
            Ok(EnhancementOutcome {
                text: text.to_string(),
                enhanced: false,
            })
        }
    }
}
