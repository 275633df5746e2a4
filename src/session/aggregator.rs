//! Folding a streamed session into one response.
//!
//! The runtime emits many events per call. Callers only want the text the
//! assistant produced plus the handle needed to continue the conversation.

use crate::session::events::SessionEvent;
use crate::session::orchestrator::OrchestratorError;
use futures::{Stream, StreamExt};
use tracing::debug;

/// Session id reported when the stream never announced one.
pub const FALLBACK_SESSION_ID: &str = "new-session";

/// Result of folding a whole event stream.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedSession {
    /// Id from the first init event, if any.
    pub session_id: Option<String>,
    /// Accumulated text, trimmed.
    pub response: String,
}

impl AggregatedSession {
    pub fn session_id_or_fallback(&self) -> String {
        self.session_id
            .clone()
            .unwrap_or_else(|| FALLBACK_SESSION_ID.to_string())
    }
}

/// Accumulates events one at a time.
///
/// Assistant turns are appended in arrival order, each turn's text blocks
/// joined with `\n`. A success result's payload is appended with no
/// separator at all.
#[derive(Debug, Default)]
pub struct SessionAggregator {
    session_id: Option<String>,
    content: String,
    events_seen: usize,
}

impl SessionAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, event: &SessionEvent) {
        self.events_seen += 1;

        match event {
            SessionEvent::System { .. } => {
                if self.session_id.is_none() {
                    if let Some(id) = event.init_session_id() {
                        debug!("Session initialized: {}", id);
                        self.session_id = Some(id.to_string());
                    }
                }
            }
            SessionEvent::Assistant { message } => {
                self.content.push_str(&message.joined_text());
            }
            SessionEvent::Result { .. } => {
                if let Some(payload) = event.success_payload() {
                    self.content.push_str(payload);
                }
            }
            SessionEvent::Unknown => {}
        }
    }

    pub fn finish(self) -> AggregatedSession {
        debug!(
            "Aggregated {} events into {} bytes",
            self.events_seen,
            self.content.len()
        );
        AggregatedSession {
            session_id: self.session_id,
            response: self.content.trim().to_string(),
        }
    }
}

/// Drain a stream to completion and fold it.
///
/// The first stream error aborts the fold and is returned unchanged.
pub async fn aggregate<S>(mut events: S) -> Result<AggregatedSession, OrchestratorError>
where
    S: Stream<Item = Result<SessionEvent, OrchestratorError>> + Unpin,
{
    let mut aggregator = SessionAggregator::new();

    while let Some(event) = events.next().await {
        aggregator.observe(&event?);
    }

    Ok(aggregator.finish())
}
