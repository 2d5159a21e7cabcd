//! Server-Sent Events (SSE) utilities

use crate::events::EventBus;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{Stream, StreamExt};
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, info, warn};

/// Keep-alive interval for all event streams
pub const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// Stream every [`LmpEvent`](crate::LmpEvent) on the bus to one SSE client
///
/// The first frame is a `ConnectionStatus` event so the UI can show the
/// link as up before any domain event arrives. Lagged receivers drop the
/// missed events and keep going.
pub fn create_event_sse_stream(
    bus: &EventBus,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!("New SSE client connected");

    let rx = bus.subscribe();
    let hello = futures::stream::once(async {
        Ok(Event::default().event("ConnectionStatus").data("connected"))
    });

    let events = BroadcastStream::new(rx).filter_map(|result| async move {
        match result {
            Ok(event) => match serde_json::to_string(&event) {
                Ok(json) => {
                    let event_type = event.event_type();
                    debug!("Broadcasting SSE event: {}", event_type);
                    Some(Ok(Event::default().event(event_type).data(json)))
                }
                Err(e) => {
                    warn!("Failed to serialize event: {}", e);
                    None
                }
            },
            Err(e) => {
                warn!("SSE stream error: {:?}", e);
                None
            }
        }
    });

    Sse::new(hello.chain(events)).keep_alive(
        KeepAlive::new()
            .interval(KEEP_ALIVE_INTERVAL)
            .text("keep-alive"),
    )
}
