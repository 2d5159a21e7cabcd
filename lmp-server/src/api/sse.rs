//! Live updates for the browser UI

use crate::AppState;
use axum::{
    extract::State,
    response::sse::{Event, Sse},
};
use futures::stream::Stream;
use std::convert::Infallible;

/// GET /api/events
///
/// Streams playlist and Bluetooth events as they happen.
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    lmp_common::sse::create_event_sse_stream(&state.events)
}
