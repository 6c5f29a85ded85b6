//! Session store: the chat transcript and the opaque handle to the open
//! remote conversation. One `Session` per browsing session, held in memory
//! for the life of the server process.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

/// Display classification of a produced file, derived from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentKind {
    Image,
    Tabular,
    Other,
}

impl AttachmentKind {
    pub fn from_filename(name: &str) -> Self {
        let lower = name.to_ascii_lowercase();
        if lower.ends_with(".png") || lower.ends_with(".jpg") || lower.ends_with(".jpeg") {
            AttachmentKind::Image
        } else if lower.ends_with(".csv") {
            AttachmentKind::Tabular
        } else {
            AttachmentKind::Other
        }
    }
}

/// A file produced by a completed run, fetched and classified for display.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub kind: AttachmentKind,
}

#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: Role,
    pub text: String,
    pub code: Option<String>,
    pub output: Option<String>,
    pub image: Option<Vec<u8>>,
    pub attachments: Vec<Attachment>,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            code: None,
            output: None,
            image: None,
            attachments: Vec::new(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            ..Self::user(text)
        }
    }
}

/// The transcript plus the conversation handle. The conversation id is
/// created once per session and never changes afterwards; at most one run is
/// active at a time, enforced by `begin_turn`.
#[derive(Debug)]
pub struct Session {
    pub id: Uuid,
    conversation_id: Option<String>,
    pub messages: Vec<ChatMessage>,
    run_active: bool,
    /// Set once the filtered dataset has been uploaded for this session.
    pub dataset_published: bool,
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            conversation_id: None,
            messages: Vec::new(),
            run_active: false,
            dataset_published: false,
        }
    }

    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    /// Record the conversation handle. Set-once: a second bind is ignored so
    /// the id stays immutable for the life of the session.
    pub fn bind_conversation(&mut self, id: String) {
        if self.conversation_id.is_none() {
            self.conversation_id = Some(id);
        }
    }

    pub fn run_active(&self) -> bool {
        self.run_active
    }

    /// Start a turn: append the user's message and mark a run in flight.
    /// Returns false (leaving the transcript untouched) when a prior run has
    /// not reached a terminal state yet.
    pub fn begin_turn(&mut self, user_text: &str) -> bool {
        if self.run_active {
            return false;
        }
        self.messages.push(ChatMessage::user(user_text));
        self.run_active = true;
        true
    }

    /// Commit the (possibly partial) assistant message and release the run
    /// slot. Called once per turn, in every terminal state.
    pub fn finish_turn(&mut self, assistant: ChatMessage) {
        self.messages.push(assistant);
        self.run_active = false;
    }

    /// Release the run slot without committing anything. Used when the turn
    /// aborted before a run ever started (publish or append failure).
    pub fn abort_turn(&mut self) {
        self.run_active = false;
    }

    /// The most recently committed assistant message, if any.
    pub fn last_assistant(&self) -> Option<&ChatMessage> {
        self.messages.iter().rev().find(|m| m.role == Role::Assistant)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Uuid-keyed map of live sessions, owned by the server. Each session sits
/// behind its own mutex so one turn fully finishes before the next starts.
#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<Uuid, Arc<Mutex<Session>>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an existing session, or lazily create one when the id is
    /// unknown or absent. Returns the id actually in use.
    pub async fn get_or_create(&self, id: Option<Uuid>) -> (Uuid, Arc<Mutex<Session>>) {
        if let Some(id) = id {
            let map = self.inner.read().await;
            if let Some(session) = map.get(&id) {
                return (id, Arc::clone(session));
            }
        }
        let session = Session::new();
        let id = session.id;
        let handle = Arc::new(Mutex::new(session));
        self.inner.write().await.insert(id, Arc::clone(&handle));
        (id, handle)
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}
