//! The single abstract remote-client capability the orchestrator is
//! parameterized by. Vendor wire-shape differences live in adapters
//! (`openai.rs`); everything above this trait is vendor-agnostic.

use crate::error::AssistantError;
use crate::relay::EventStream;
use async_trait::async_trait;

/// Opaque handle to a remote conversation ("thread").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationId(pub String);

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque handle to an uploaded or produced file resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileId(pub String);

impl std::fmt::Display for FileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A file reference attached to a remote message. The filename may fall back
/// to the file id when the metadata lookup failed.
#[derive(Debug, Clone)]
pub struct RemoteAttachment {
    pub file_id: FileId,
    pub filename: String,
}

/// One message as listed from the remote conversation. Only the fields the
/// attachment resolver needs.
#[derive(Debug, Clone)]
pub struct RemoteMessage {
    pub role: String,
    pub attachments: Vec<RemoteAttachment>,
}

impl RemoteMessage {
    pub fn is_assistant(&self) -> bool {
        self.role == "assistant"
    }
}

/// Operations consumed from the remote assistant/run/thread service.
///
/// Mutations fail with `RemoteWrite`, reads with `RemoteRead`.
/// Implementations never retry.
#[async_trait]
pub trait RemoteClient: Send + Sync {
    async fn create_conversation(&self) -> Result<ConversationId, AssistantError>;

    async fn append_user_message(
        &self,
        conversation: &ConversationId,
        text: &str,
    ) -> Result<(), AssistantError>;

    /// Start a streaming run bound to the configured assistant, with
    /// deterministic sampling (temperature 0). Yields ordered run events.
    async fn start_run(&self, conversation: &ConversationId) -> Result<EventStream, AssistantError>;

    /// List the conversation's messages, newest first.
    async fn list_messages(
        &self,
        conversation: &ConversationId,
    ) -> Result<Vec<RemoteMessage>, AssistantError>;

    async fn fetch_attachment(&self, file: &FileId) -> Result<Vec<u8>, AssistantError>;

    async fn upload_file(&self, filename: &str, bytes: Vec<u8>) -> Result<FileId, AssistantError>;

    /// Re-point the assistant's code-execution tool at `file`, replacing any
    /// prior file association.
    async fn update_tool_resources(&self, file: &FileId) -> Result<(), AssistantError>;
}
