//! Server-Sent Events carrier for the fan-out channel.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio_stream::StreamExt as _;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

use crate::filestore::FileStore;
use crate::server::{AppState, CurrentUser};
use crate::store::Store;

/// Each fan-out event becomes one SSE message named after the event, whose
/// data is the full `{"name", "data"}` JSON. A client that lags skips ahead
/// to the next snapshot.
pub(super) async fn stream<S: Store, F: FileStore>(
    State(state): State<Arc<AppState<S, F>>>,
    CurrentUser(identity): CurrentUser,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    tracing::debug!(username = %identity.username, "event stream opened");

    let events = BroadcastStream::new(state.events.subscribe()).filter_map(|received| {
        match received {
            Ok(event) => match Event::default().event(event.name()).json_data(&event) {
                Ok(sse) => Some(Ok(sse)),
                Err(e) => {
                    tracing::warn!(error = %e, "failed to encode fan-out event");
                    None
                }
            },
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "event stream lagged");
                None
            }
        }
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}
