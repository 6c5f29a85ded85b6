//! Turn orchestrator: the end-to-end pipeline for one chat turn. Publishes
//! the dataset on the session's first turn, appends the user message, drives
//! the streamed run to a terminal state and commits the assistant message,
//! partial or not, exactly once.

use crate::attachments::resolve_attachments;
use crate::config::AppConfig;
use crate::dataset::{to_csv, ClientRecord};
use crate::error::AssistantError;
use crate::publisher::publish_dataset;
use crate::relay::{drive_run, RenderSink, RunStatus};
use crate::remote::{ConversationId, RemoteClient};
use crate::sandbox::SandboxRunner;
use crate::session::{ChatMessage, Session};
use std::sync::Arc;

/// What one turn produced, for the caller to render and count.
#[derive(Debug)]
pub struct TurnReport {
    /// The assistant message as committed to the transcript.
    pub message: ChatMessage,
    pub status: RunStatus,
    /// Set when the event stream broke rather than the run failing remotely.
    pub transport_error: Option<String>,
    /// One entry per attachment that could not be resolved.
    pub attachment_errors: Vec<AssistantError>,
    pub sandbox_used: bool,
    pub sandbox_error: Option<String>,
}

pub struct TurnOrchestrator {
    client: Arc<dyn RemoteClient>,
    config: AppConfig,
}

impl TurnOrchestrator {
    pub fn new(client: Arc<dyn RemoteClient>, config: AppConfig) -> Self {
        Self { client, config }
    }

    /// Run one turn against `session`. `records` is the session's working
    /// dataset, already filtered; it is published remotely on the first turn
    /// and handed to the local fallback when that runs.
    ///
    /// An `Err` means the turn aborted before any run started (the run slot
    /// is released, no assistant message is committed). Once a run streams,
    /// every terminal state commits and returns `Ok`.
    pub async fn submit_turn(
        &self,
        session: &mut Session,
        prompt: &str,
        records: &[ClientRecord],
        sink: &mut dyn RenderSink,
    ) -> Result<TurnReport, AssistantError> {
        if !session.begin_turn(prompt) {
            return Err(AssistantError::TurnInProgress);
        }

        match self.prepare_run(session, prompt, records).await {
            Ok(conversation) => Ok(self.run_to_completion(session, conversation, records, sink).await),
            Err(e) => {
                session.abort_turn();
                Err(e)
            }
        }
    }

    /// Everything that must succeed before a run exists: first-turn dataset
    /// publish, conversation creation, message append.
    async fn prepare_run(
        &self,
        session: &mut Session,
        prompt: &str,
        records: &[ClientRecord],
    ) -> Result<ConversationId, AssistantError> {
        if !session.dataset_published {
            publish_dataset(self.client.as_ref(), records).await?;
            session.dataset_published = true;
        }

        let conversation = match session.conversation_id() {
            Some(id) => ConversationId(id.to_string()),
            None => {
                let id = self.client.create_conversation().await?;
                session.bind_conversation(id.0.clone());
                id
            }
        };

        self.client.append_user_message(&conversation, prompt).await?;
        Ok(conversation)
    }

    async fn run_to_completion(
        &self,
        session: &mut Session,
        conversation: ConversationId,
        records: &[ClientRecord],
        sink: &mut dyn RenderSink,
    ) -> TurnReport {
        let outcome = match self.client.start_run(&conversation).await {
            Ok(stream) => drive_run(stream, sink).await,
            Err(e) => {
                // The run never streamed; commit an empty failed message so
                // the slot is released and the transcript shows the turn.
                let message = ChatMessage::assistant("");
                session.finish_turn(message.clone());
                return TurnReport {
                    message,
                    status: RunStatus::Failed,
                    transport_error: Some(e.to_string()),
                    attachment_errors: Vec::new(),
                    sandbox_used: false,
                    sandbox_error: None,
                };
            }
        };

        let mut message = ChatMessage::assistant(outcome.text);
        if !outcome.code.is_empty() {
            message.code = Some(outcome.code);
        }
        if !outcome.output.is_empty() {
            message.output = Some(outcome.output);
        }

        let mut attachment_errors = Vec::new();
        if outcome.status == RunStatus::Completed && outcome.transport_error.is_none() {
            attachment_errors =
                resolve_attachments(self.client.as_ref(), &conversation, &mut message).await;
        }

        let (sandbox_used, sandbox_error) = if outcome.status == RunStatus::Completed {
            self.maybe_run_sandbox(&mut message, records).await
        } else {
            (false, None)
        };

        session.finish_turn(message.clone());
        TurnReport {
            message,
            status: outcome.status,
            transport_error: outcome.transport_error,
            attachment_errors,
            sandbox_used,
            sandbox_error,
        }
    }

    /// Local fallback: only when enabled, the run produced code, and no
    /// rendered image came back. A fallback failure never fails the turn.
    async fn maybe_run_sandbox(
        &self,
        message: &mut ChatMessage,
        records: &[ClientRecord],
    ) -> (bool, Option<String>) {
        if !self.config.sandbox_enabled || message.image.is_some() {
            return (false, None);
        }
        let Some(code) = message.code.clone() else {
            return (false, None);
        };
        let dataset = match to_csv(records) {
            Ok(bytes) => bytes,
            Err(e) => return (false, Some(e.to_string())),
        };

        let runner = SandboxRunner::new(&self.config);
        let result =
            tokio::task::spawn_blocking(move || runner.run(&code, &dataset)).await;

        match result {
            Ok(Ok(run)) => {
                if let Some(chart) = run.chart {
                    message.image = Some(chart);
                }
                if !run.stdout.trim().is_empty() {
                    let output = message.output.get_or_insert_with(String::new);
                    if !output.is_empty() {
                        output.push('\n');
                    }
                    output.push_str(run.stdout.trim_end());
                }
                (true, None)
            }
            Ok(Err(e)) => (true, Some(e.to_string())),
            Err(e) => (true, Some(e.to_string())),
        }
    }
}
