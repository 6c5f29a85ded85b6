use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{broadcast, RwLock};

use crate::config::{AppConfig, Secrets};
use crate::dataset::DatasetCache;
use crate::logger::{Logger, SessionMetrics};
use crate::orchestrator::TurnOrchestrator;
use crate::relay::RenderSink;
use crate::remote::RemoteClient;
use crate::session::SessionStore;

/// Shared state behind every dashboard handler.
pub struct DashboardState {
    pub config: AppConfig,
    pub dataset: DatasetCache,
    pub sessions: SessionStore,
    pub orchestrator: TurnOrchestrator,
    pub metrics: RwLock<SessionMetrics>,
    pub logger: Logger,
    /// Broadcast channel for pushing live run progress to WebSocket clients.
    pub event_tx: broadcast::Sender<ChatEvent>,
}

impl DashboardState {
    pub fn new(
        config: AppConfig,
        secrets: &Secrets,
        client: Arc<dyn RemoteClient>,
    ) -> anyhow::Result<Self> {
        let (event_tx, _) = broadcast::channel(100);
        let logger = Logger::new(&config.log_dir)?;
        Ok(Self {
            dataset: DatasetCache::new(secrets.sheet_url.clone(), config.dataset_ttl_secs),
            sessions: SessionStore::new(),
            orchestrator: TurnOrchestrator::new(client, config.clone()),
            metrics: RwLock::new(SessionMetrics::new()),
            logger,
            event_tx,
            config,
        })
    }

    /// Send an event, ignoring the error when no WebSocket client listens.
    pub fn broadcast(&self, event: ChatEvent) {
        let _ = self.event_tx.send(event);
    }
}

/// Live run progress, serialized as JSON over the events WebSocket.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    TextUpdated { session_id: String, text: String },
    ToolStarted { session_id: String },
    CodeUpdated { session_id: String, code: String },
    OutputAppended { session_id: String, entry: String },
    ToolFinished { session_id: String },
    RunFinished { session_id: String, status: String },
}

/// Render sink that forwards every frame onto the broadcast channel, tagged
/// with the session it belongs to.
pub struct BroadcastSink {
    tx: broadcast::Sender<ChatEvent>,
    session_id: String,
}

impl BroadcastSink {
    pub fn new(tx: broadcast::Sender<ChatEvent>, session_id: String) -> Self {
        Self { tx, session_id }
    }
}

impl RenderSink for BroadcastSink {
    fn text_updated(&mut self, full_text: &str) {
        let _ = self.tx.send(ChatEvent::TextUpdated {
            session_id: self.session_id.clone(),
            text: full_text.to_string(),
        });
    }

    fn tool_started(&mut self) {
        let _ = self.tx.send(ChatEvent::ToolStarted {
            session_id: self.session_id.clone(),
        });
    }

    fn code_updated(&mut self, code: &str) {
        let _ = self.tx.send(ChatEvent::CodeUpdated {
            session_id: self.session_id.clone(),
            code: code.to_string(),
        });
    }

    fn output_appended(&mut self, entry: &str) {
        let _ = self.tx.send(ChatEvent::OutputAppended {
            session_id: self.session_id.clone(),
            entry: entry.to_string(),
        });
    }

    fn tool_finished(&mut self) {
        let _ = self.tx.send(ChatEvent::ToolFinished {
            session_id: self.session_id.clone(),
        });
    }
}
