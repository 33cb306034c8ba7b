//! Stream sessions - one per connected display client
//!
//! A session is opened by registering a subscriber (the client immediately
//! gets the current state), then suspends on the subscriber's channel and
//! emits one SSE event per message. It closes when the client goes away (the
//! HTTP layer drops the body stream, and with it the session) or when the
//! registry drops its channel at shutdown.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::{self, Stream};
use tracing::{debug, info};

use super::{ApiError, ApiState};
use crate::broadcast::{StateMessage, Subscriber, SubscriberId};
use crate::hub::{ControlError, OverlayHub};

/// Lifecycle phase of a session: `Connecting -> Streaming -> Closed`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Registered; the initial snapshot has not been handed out yet
    Connecting,
    /// At least one frame handed out
    Streaming,
    /// Unregistered; terminal
    Closed,
}

/// Per-connection delivery loop
pub struct StreamSession {
    subscriber: Subscriber,
    phase: SessionPhase,
    frames: u64,
}

impl StreamSession {
    /// Register a subscriber for a new connection
    pub fn open(hub: &OverlayHub) -> Result<Self, ControlError> {
        let subscriber = hub.subscribe()?;
        info!(
            "Stream {} connected ({} active)",
            subscriber.id(),
            hub.subscriber_count()
        );

        Ok(Self {
            subscriber,
            phase: SessionPhase::Connecting,
            frames: 0,
        })
    }

    pub fn id(&self) -> SubscriberId {
        self.subscriber.id()
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Messages handed out so far
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Wait for the next message to write
    ///
    /// Returns `None` and closes the session once the channel is gone.
    pub async fn next_message(&mut self) -> Option<StateMessage> {
        if self.phase == SessionPhase::Closed {
            return None;
        }

        match self.subscriber.recv().await {
            Some(message) => {
                self.frames += 1;
                self.phase = SessionPhase::Streaming;
                Some(message)
            },
            None => {
                self.close();
                None
            },
        }
    }

    /// Unregister and enter the terminal phase; idempotent
    pub fn close(&mut self) {
        if self.phase == SessionPhase::Closed {
            return;
        }
        self.phase = SessionPhase::Closed;
        self.subscriber.unregister();
        info!("Stream {} closed after {} frame(s)", self.id(), self.frames);
    }

    /// Turn the session into an SSE event stream
    ///
    /// Dropping the stream drops the session, which unregisters it.
    pub fn into_events(self) -> impl Stream<Item = Result<Event, Infallible>> + Send + 'static {
        stream::unfold(self, |mut session| async move {
            let message = session.next_message().await?;
            debug!("Stream {} -> frame {}", session.id(), session.frames);
            Some((Ok::<_, Infallible>(Event::default().data(&*message)), session))
        })
    }
}

impl Drop for StreamSession {
    fn drop(&mut self) {
        self.close();
    }
}

/// GET /stream - Server-Sent Events feed of the overlay state
pub(super) async fn stream_state(
    State(state): State<Arc<ApiState>>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let session = StreamSession::open(&state.hub)?;

    Ok(Sse::new(session.into_events()).keep_alive(
        KeepAlive::new()
            .interval(state.keep_alive)
            .text("keep-alive"),
    ))
}
