use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use std::convert::Infallible;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt as _;

use crate::state::AppState;

/// GET /events: SSE stream. Sends `connected` once, then `refresh` whenever
/// the dashboard changes. The channel is deregistered when the client goes
/// away and the stream is dropped.
pub async fn sse_events(State(app): State<AppState>) -> impl axum::response::IntoResponse {
    let (guard, rx) = app.hub.registry().register();
    let connected = tokio_stream::once(Ok::<Event, Infallible>(
        Event::default().event("connected").data("connected"),
    ));
    let signals = ReceiverStream::new(rx).map(move |signal| {
        let _registered = &guard;
        Ok::<Event, Infallible>(Event::default().event(signal.as_str()).data(signal.as_str()))
    });
    Sse::new(connected.chain(signals)).keep_alive(KeepAlive::default())
}
