use crate::relay::RunStatus;
use thiserror::Error;

/// Every failure the assistant panel can surface to the user.
///
/// Propagation policy: remote failures are caught at the call site and turned
/// into one user-visible message; nothing here is retried and nothing is
/// allowed to crash the server loop.
#[derive(Debug, Error)]
pub enum AssistantError {
    /// A required secret or setting is missing. Fatal, raised before any
    /// remote call is made.
    #[error("missing configuration: {0}")]
    Configuration(String),

    /// A mutating call to the remote service was rejected (append message,
    /// upload, tool-resource update, run start). Aborts the current turn.
    #[error("remote write failed: {0}")]
    RemoteWrite(String),

    /// A read from the remote service failed (message list, file content,
    /// event stream transport). Aborts the current turn.
    #[error("remote read failed: {0}")]
    RemoteRead(String),

    /// The run reached a terminal state other than `completed`. The partial
    /// assistant text accumulated so far is still committed to the transcript.
    #[error("run ended {status}")]
    RunTerminal { status: RunStatus },

    /// One produced file could not be fetched or decoded. Isolated: sibling
    /// attachments are still processed.
    #[error("attachment '{filename}' could not be resolved: {reason}")]
    AttachmentFetch { filename: String, reason: String },

    /// The local code-execution fallback exceeded its wall-clock budget.
    #[error("local execution timed out after {0} seconds")]
    LocalExecutionTimeout(u64),

    /// A turn was submitted while a prior run had not reached a terminal
    /// state. The transcript is left untouched.
    #[error("a turn is already in progress for this session")]
    TurnInProgress,
}

impl AssistantError {
    pub fn remote_write(context: &str, detail: impl std::fmt::Display) -> Self {
        Self::RemoteWrite(format!("{context}: {detail}"))
    }

    pub fn remote_read(context: &str, detail: impl std::fmt::Display) -> Self {
        Self::RemoteRead(format!("{context}: {detail}"))
    }
}
