//! Live status stream
//!
//! Server-sent events carrying the viewer's [`EventView`]. The subscription is
//! taken before the first snapshot read and lives exactly as long as the
//! response stream; a client disconnect drops both.

use std::convert::Infallible;
use std::time::Duration;
use axum::extract::{Path, State};
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use futures::Stream;
use tracing::{debug, warn};
use crate::api::AppState;
use crate::middleware::MaybeAuthUser;
use crate::models::EventId;
use crate::services::FeedSignal;
use crate::status::EventView;

/// Time-driven transitions (the event passing) have no change notification
const REEVALUATE_EVERY: Duration = Duration::from_secs(30);

/// Handle GET /events/{id}/status/stream
pub async fn status_stream(
    State(state): State<AppState>,
    Path(event_id): Path<EventId>,
    viewer: MaybeAuthUser,
) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    let mut subscription = state.services.feed.subscribe(event_id);
    let events = state.services.events.clone();
    let viewer_id = viewer.user_id().map(str::to_string);

    let stream = async_stream::stream! {
        let mut ticker = tokio::time::interval(REEVALUATE_EVERY);
        ticker.tick().await;
        let mut last: Option<EventView> = None;

        loop {
            match events.status_view(event_id, viewer_id.as_deref()).await {
                Ok(view) if last.as_ref() != Some(&view) => {
                    match SseEvent::default().event("status").json_data(&view) {
                        Ok(message) => yield Ok(message),
                        Err(e) => warn!(event_id = %event_id, error = %e, "Failed to encode status view"),
                    }
                    last = Some(view);
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(event_id = %event_id, error = %e, "Status re-read failed");
                    yield Ok(SseEvent::default().event("error").data(e.kind()));
                }
            }

            tokio::select! {
                signal = subscription.next() => match signal {
                    Some(FeedSignal::Changed(change)) => {
                        debug!(event_id = %event_id, kind = ?change.kind, "Re-deriving status after change");
                    }
                    Some(FeedSignal::Lagged(_)) => {}
                    None => break,
                },
                _ = ticker.tick() => {}
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}
