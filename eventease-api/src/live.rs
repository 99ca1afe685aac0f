use std::convert::Infallible;

use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Extension, Router,
};
use eventease_core::Caller;
use eventease_lifecycle::ScopedSubscription;
use eventease_shared::models::events::LiveFeedErrorEvent;
use futures_util::stream::{self, Stream};
use serde::Serialize;
use uuid::Uuid;

use crate::{error::AppError, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/live/inquiries", get(watch_inquiries))
        .route("/v1/live/inquiries/{id}", get(watch_inquiry))
}

/// GET /v1/live/inquiries
/// Snapshot of everything the caller may see, then a `change` event per commit
pub async fn watch_inquiries(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let subscription = state.queries.watch_visible(&caller).await?;
    Ok(live_stream(state, subscription))
}

/// GET /v1/live/inquiries/{id}
/// Same as above for a single inquiry, e.g. the quote detail page
pub async fn watch_inquiry(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(inquiry_id): Path<Uuid>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let subscription = state.queries.watch_inquiry(&caller, inquiry_id).await?;
    Ok(live_stream(state, subscription))
}

enum Phase {
    Snapshot(ScopedSubscription),
    Live(ScopedSubscription),
    Done,
}

fn sse_event<T: Serialize>(name: &str, payload: &T) -> Event {
    Event::default().event(name).json_data(payload).unwrap_or_else(|e| {
        tracing::error!("Failed to encode live event: {}", e);
        Event::default().comment("encoding failed")
    })
}

/// Turns a subscription into an SSE stream. Dropping the stream (client went
/// away) drops the subscription, which unregisters it.
fn live_stream(
    state: AppState,
    subscription: ScopedSubscription,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    tracing::info!(subscription_id = %subscription.id(), "Live view opened");

    let events = stream::unfold(Phase::Snapshot(subscription), move |phase| {
        let state = state.clone();
        async move {
            match phase {
                Phase::Snapshot(mut subscription) => {
                    let summaries: Vec<_> = subscription
                        .take_snapshot()
                        .into_iter()
                        .map(|inquiry| state.queries.summarize(inquiry))
                        .collect();
                    Some((Ok(sse_event("snapshot", &summaries)), Phase::Live(subscription)))
                }
                Phase::Live(mut subscription) => match subscription.next().await {
                    Ok(Some(change)) => Some((Ok(sse_event("change", &change)), Phase::Live(subscription))),
                    Ok(None) => None,
                    Err(e) => {
                        tracing::warn!(subscription_id = %subscription.id(), "Live view ended: {}", e);
                        let payload = LiveFeedErrorEvent {
                            code: e.code().to_string(),
                            message: e.to_string(),
                        };
                        Some((Ok(sse_event("error", &payload)), Phase::Done))
                    }
                },
                Phase::Done => None,
            }
        }
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}
