//! Live notification stream.
//!
//! Each connection registers one channel with the hub. The channel is
//! deregistered when the response stream is dropped, which is how axum
//! signals a closed connection.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{self, Stream};
use tokio::sync::mpsc::Receiver;
use tracing::{debug, warn};

use domains::{LiveEvent, NotificationHub, SubscriptionHandle};

use crate::auth::CurrentUser;
use crate::metrics::Metrics;
use crate::state::AppState;

/// Owns a registered channel; dropping it unsubscribes.
struct LiveStream {
    hub: Arc<dyn NotificationHub>,
    metrics: Arc<Metrics>,
    handle: SubscriptionHandle,
    events: Receiver<LiveEvent>,
}

impl Drop for LiveStream {
    fn drop(&mut self) {
        self.hub.unsubscribe(&self.handle);
        self.metrics.live_subscriptions.dec();
        debug!(user_id = self.handle.user_id, subscription = %self.handle.id, "live stream closed");
    }
}

fn frame(event: &LiveEvent) -> Option<Event> {
    match Event::default().json_data(event) {
        Ok(frame) => Some(frame),
        Err(err) => {
            warn!(error = %err, "could not encode live event, skipping");
            None
        }
    }
}

fn live_events(live: LiveStream) -> impl Stream<Item = Result<Event, Infallible>> {
    stream::unfold(live, |mut live| async move {
        loop {
            let event = live.events.recv().await?;
            if let Some(frame) = frame(&event) {
                return Some((Ok(frame), live));
            }
        }
    })
}

pub async fn subscribe(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let subscription = state.hub.subscribe(user.id());
    state.metrics.live_subscriptions.inc();
    debug!(user_id = user.id(), subscription = %subscription.handle.id, "live stream opened");

    let live = LiveStream {
        hub: state.hub.clone(),
        metrics: state.metrics.clone(),
        handle: subscription.handle,
        events: subscription.events,
    };

    Sse::new(live_events(live)).keep_alive(KeepAlive::new().interval(state.web.keep_alive))
}
