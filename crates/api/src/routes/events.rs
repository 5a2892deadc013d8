//! Server-sent stream of incident change notifications.

use std::convert::Infallible;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::{self, Stream, StreamExt};
use tracing::debug;

use crate::app::AppState;
use crate::error::ApiError;
use domain::services::{Delivery, IncidentChange};

/// SSE event name for every change.
pub const INCIDENT_CHANGE_EVENT: &str = "incident_change";

fn change_event(change: &IncidentChange) -> Event {
    Event::default()
        .event(INCIDENT_CHANGE_EVENT)
        .json_data(change)
        .unwrap_or_else(|_| Event::default().event(INCIDENT_CHANGE_EVENT).data("{}"))
}

/// GET /api/v1/incidents/events
///
/// Streams every incident change as an `incident_change` event. A client
/// that falls behind receives a single resync event in place of the
/// changes it missed.
pub async fn incident_events(
    State(state): State<AppState>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let realtime = state
        .realtime
        .as_ref()
        .ok_or_else(|| ApiError::ServiceUnavailable("Realtime updates are disabled".into()))?;

    let subscription = realtime.subscribe();
    debug!("Incident event stream opened");

    let events = stream::unfold(subscription, |mut subscription| async move {
        let change = match subscription.next().await? {
            Delivery::Change(change) => change,
            Delivery::Missed(count) => {
                debug!(missed = count, "Event stream lagged, sending resync");
                IncidentChange::resync()
            }
        };
        Some((Ok(change_event(&change)), subscription))
    })
    .take_until(realtime.closing());

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}
