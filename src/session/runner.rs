//! Launching and resuming sessions.

use crate::config::SessionConfig;
use crate::interaction_log::{InteractionLog, LogEntry};
use crate::models::{LaunchResult, ResumeResult};
use crate::session::aggregator::{aggregate, AggregatedSession};
use crate::session::orchestrator::{Orchestrator, OrchestratorError, QueryOptions, QueryRequest};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Runs one external call per invocation and logs the exchange.
#[derive(Clone)]
pub struct SessionRunner {
    orchestrator: Arc<dyn Orchestrator>,
    defaults: SessionConfig,
    log: InteractionLog,
}

impl SessionRunner {
    pub fn new(orchestrator: Arc<dyn Orchestrator>, defaults: SessionConfig, log: InteractionLog) -> Self {
        debug!("Logging interactions to {}", log.path().display());
        Self {
            orchestrator,
            defaults,
            log,
        }
    }

    /// Options for a fresh session built from the configured defaults.
    pub fn launch_options(&self) -> QueryOptions {
        QueryOptions {
            max_turns: Some(self.defaults.max_turns),
            append_system_prompt: Some(self.defaults.append_system_prompt.clone()),
            max_tokens: self.defaults.max_tokens,
            resume: None,
        }
    }

    /// Start a session with the supervisor prompt.
    pub async fn launch(&self, prompt: &str, context: Value) -> Result<LaunchResult, OrchestratorError> {
        let request = QueryRequest::new(prompt, self.launch_options());
        let session = self.run("launch_session", request, context).await?;

        Ok(LaunchResult {
            session_id: session.session_id_or_fallback(),
            response: session.response,
        })
    }

    /// Send a follow-up prompt to an existing session.
    pub async fn resume(
        &self,
        session_id: &str,
        prompt: &str,
        context: Value,
    ) -> Result<ResumeResult, OrchestratorError> {
        let options = QueryOptions {
            resume: Some(session_id.to_string()),
            ..QueryOptions::default()
        };
        let request = QueryRequest::new(prompt, options);
        let mut context = context;
        if let Value::Object(ref mut map) = context {
            map.insert("sessionId".to_string(), json!(session_id));
        }

        let session = self.run("resume_session", request, context).await?;
        Ok(ResumeResult {
            response: session.response,
        })
    }

    /// Perform one call, fold its events and append a log entry.
    ///
    /// Errors from the call propagate untouched; a failed log write only
    /// produces a warning.
    pub async fn run(
        &self,
        function: &str,
        request: QueryRequest,
        context: Value,
    ) -> Result<AggregatedSession, OrchestratorError> {
        info!("{}: querying orchestrator", function);

        let events = self.orchestrator.query(request.clone()).await?;
        let session = aggregate(events).await?;

        let entry = LogEntry::now(function, &context, &request.prompt, &session.response);
        if let Err(e) = self.log.append(&entry) {
            warn!("{}", e);
        }

        info!(
            "{}: received {} characters",
            function,
            session.response.chars().count()
        );
        Ok(session)
    }
}
