use askama::Template;

use crate::attachments::{csv_table, CsvTable};
use crate::dataset::DatasetMetrics;
use crate::logger::SessionMetrics;
use crate::session::{AttachmentKind, ChatMessage, Role};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

// ── Askama Templates ─────────────────────────────────────────────────

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate<'a> {
    pub countries: &'a [String],
    /// Pre-rendered overview partial, or an error banner.
    pub overview_html: &'a str,
    pub turns_submitted: usize,
    pub completed_runs: usize,
    pub failed_runs: usize,
    pub success_rate: f64,
}

#[derive(Template)]
#[template(path = "partials/overview.html")]
pub struct OverviewTemplate<'a> {
    pub total_clients: usize,
    pub active_clients: usize,
    pub inactive_clients: usize,
    pub conversion_rate: f64,
    pub marketplace_share: f64,
    pub monthly: &'a [(String, usize)],
}

#[derive(Template)]
#[template(path = "partials/transcript.html")]
pub struct TranscriptTemplate<'a> {
    pub session_id: &'a str,
    pub messages: &'a [MessageView],
}

#[derive(Template)]
#[template(path = "partials/stats.html")]
pub struct StatsTemplate {
    pub turns_submitted: usize,
    pub completed_runs: usize,
    pub failed_runs: usize,
    pub api_errors: usize,
    pub success_rate: f64,
}

/// One transcript message, flattened for the template.
pub struct MessageView {
    pub role: &'static str,
    pub text: String,
    pub code: String,
    pub output: String,
    /// Base64 PNG for an inline `<img>`, empty when the message has none.
    pub image_b64: String,
    /// Tabular attachments parsed into header/row form for `<table>` markup.
    pub tables: Vec<CsvTable>,
    pub attachment_names: Vec<String>,
}

impl MessageView {
    pub fn from_message(message: &ChatMessage) -> Self {
        Self {
            role: match message.role {
                Role::User => "user",
                Role::Assistant => "assistant",
            },
            text: message.text.clone(),
            code: message.code.clone().unwrap_or_default(),
            output: message.output.clone().unwrap_or_default(),
            image_b64: message
                .image
                .as_deref()
                .map(|bytes| BASE64.encode(bytes))
                .unwrap_or_default(),
            tables: message
                .attachments
                .iter()
                .filter(|a| a.kind == AttachmentKind::Tabular)
                .filter_map(|a| csv_table(&a.bytes).ok())
                .collect(),
            attachment_names: message
                .attachments
                .iter()
                .map(|a| a.filename.clone())
                .collect(),
        }
    }
}

// ── Render helpers (called from routes.rs) ───────────────────────────

pub fn render_overview(metrics: &DatasetMetrics) -> String {
    let template = OverviewTemplate {
        total_clients: metrics.total_clients,
        active_clients: metrics.active_clients,
        inactive_clients: metrics.inactive_clients,
        conversion_rate: metrics.conversion_rate,
        marketplace_share: metrics.marketplace_share,
        monthly: &metrics.monthly_trial_signups,
    };
    template.render().unwrap_or_default()
}

pub fn render_transcript(session_id: &str, messages: &[ChatMessage]) -> String {
    let views: Vec<MessageView> = messages.iter().map(MessageView::from_message).collect();
    let template = TranscriptTemplate {
        session_id,
        messages: &views,
    };
    template.render().unwrap_or_default()
}

pub fn render_stats(metrics: &SessionMetrics) -> String {
    let template = StatsTemplate {
        turns_submitted: metrics.turns_submitted,
        completed_runs: metrics.completed_runs,
        failed_runs: metrics.failed_runs,
        api_errors: metrics.api_errors,
        success_rate: metrics.success_rate(),
    };
    template.render().unwrap_or_default()
}

pub fn render_index(
    countries: &[String],
    overview_html: &str,
    metrics: &SessionMetrics,
) -> axum::response::Html<String> {
    let template = IndexTemplate {
        countries,
        overview_html,
        turns_submitted: metrics.turns_submitted,
        completed_runs: metrics.completed_runs,
        failed_runs: metrics.failed_runs,
        success_rate: metrics.success_rate(),
    };
    axum::response::Html(template.render().unwrap_or_else(|e| {
        let msg = e
            .to_string()
            .replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;");
        format!("<h1>Template error: {}</h1>", msg)
    }))
}
