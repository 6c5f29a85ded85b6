use axum::{
    extract::{Query, State},
    response::{Html, IntoResponse, Json},
    Form,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use super::state::{BroadcastSink, ChatEvent, DashboardState};
use super::templates;
use crate::dataset::{countries, filter_by_countries, DatasetMetrics};
use crate::error::AssistantError;

// ── GET / — main dashboard page ──────────────────────────────────────

pub async fn index(State(state): State<Arc<DashboardState>>) -> impl IntoResponse {
    let (country_list, overview_html) = match state.dataset.records().await {
        Ok(records) => (
            countries(&records),
            templates::render_overview(&DatasetMetrics::compute(&records)),
        ),
        Err(e) => {
            let _ = state.logger.log_error(&format!("dataset fetch: {e}"));
            (
                Vec::new(),
                format!(
                    r#"<div class="p-4 bg-red-900/30 border border-red-700 rounded text-red-300"><strong>Dataset unavailable:</strong> {}</div>"#,
                    html_escape(&e.to_string())
                ),
            )
        }
    };
    let metrics = state.metrics.read().await;
    templates::render_index(&country_list, &overview_html, &metrics)
}

// ── Country filter, shared by the overview and chat endpoints ───────

#[derive(Deserialize)]
pub struct FilterQuery {
    /// Comma-separated country codes; absent or empty keeps every record.
    pub countries: Option<String>,
}

fn parse_countries(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect()
}

// ── GET /api/overview — dataset KPIs as JSON ─────────────────────────

pub async fn get_overview(
    State(state): State<Arc<DashboardState>>,
    Query(query): Query<FilterQuery>,
) -> Result<Json<DatasetMetrics>, Html<String>> {
    let records = state
        .dataset
        .records()
        .await
        .map_err(|e| dataset_error(&state, &e))?;
    let filter = parse_countries(query.countries.as_deref());
    let filtered = filter_by_countries(&records, &filter);
    Ok(Json(DatasetMetrics::compute(&filtered)))
}

// ── GET /api/overview/html — KPI partial for HTMX swap ──────────────

pub async fn get_overview_html(
    State(state): State<Arc<DashboardState>>,
    Query(query): Query<FilterQuery>,
) -> Html<String> {
    let records = match state.dataset.records().await {
        Ok(r) => r,
        Err(e) => return dataset_error(&state, &e),
    };
    let filter = parse_countries(query.countries.as_deref());
    let filtered = filter_by_countries(&records, &filter);
    Html(templates::render_overview(&DatasetMetrics::compute(&filtered)))
}

// ── GET /api/countries — distinct countries for the filter widget ───

pub async fn get_countries(
    State(state): State<Arc<DashboardState>>,
) -> Result<Json<Vec<String>>, Html<String>> {
    let records = state
        .dataset
        .records()
        .await
        .map_err(|e| dataset_error(&state, &e))?;
    Ok(Json(countries(&records)))
}

// ── GET /api/stats — session metrics ─────────────────────────────────

pub async fn get_stats(State(state): State<Arc<DashboardState>>) -> impl IntoResponse {
    let m = state.metrics.read().await;
    Json(serde_json::json!({
        "turns_submitted": m.turns_submitted,
        "completed_runs": m.completed_runs,
        "failed_runs": m.failed_runs,
        "api_errors": m.api_errors,
        "attachment_failures": m.attachment_failures,
        "success_rate": m.success_rate(),
    }))
}

pub async fn get_stats_html(State(state): State<Arc<DashboardState>>) -> impl IntoResponse {
    let m = state.metrics.read().await;
    Html(templates::render_stats(&m))
}

// ── GET /api/transcript/html — transcript partial for one session ───

#[derive(Deserialize)]
pub struct TranscriptQuery {
    pub session_id: String,
}

pub async fn get_transcript_html(
    State(state): State<Arc<DashboardState>>,
    Query(query): Query<TranscriptQuery>,
) -> Html<String> {
    let requested = Uuid::parse_str(&query.session_id).ok();
    let (id, handle) = state.sessions.get_or_create(requested).await;
    let session = handle.lock().await;
    Html(templates::render_transcript(&id.to_string(), &session.messages))
}

// ── POST /api/chat — submit one turn, return the updated transcript ─

#[derive(Deserialize)]
pub struct ChatRequest {
    pub session_id: Option<String>,
    pub prompt: String,
    pub countries: Option<String>,
}

pub async fn chat(
    State(state): State<Arc<DashboardState>>,
    Form(req): Form<ChatRequest>,
) -> Html<String> {
    if req.prompt.trim().is_empty() {
        return Html(r#"<div class="text-yellow-400">Please enter a question.</div>"#.to_string());
    }

    let records = match state.dataset.records().await {
        Ok(r) => r,
        Err(e) => return dataset_error(&state, &e),
    };
    let filter = parse_countries(req.countries.as_deref());
    let filtered = filter_by_countries(&records, &filter);

    let requested = req.session_id.as_deref().and_then(|s| Uuid::parse_str(s).ok());
    let (id, handle) = state.sessions.get_or_create(requested).await;
    let mut session = handle.lock().await;

    {
        let mut m = state.metrics.write().await;
        m.turns_submitted += 1;
    }
    let _ = state.logger.log_turn(&id.to_string(), &req.prompt);

    let mut sink = BroadcastSink::new(state.event_tx.clone(), id.to_string());
    let result = state
        .orchestrator
        .submit_turn(&mut session, &req.prompt, &filtered, &mut sink)
        .await;

    match result {
        Ok(report) => {
            {
                let mut m = state.metrics.write().await;
                if report.status == crate::relay::RunStatus::Completed
                    && report.transport_error.is_none()
                {
                    m.completed_runs += 1;
                } else {
                    m.failed_runs += 1;
                }
                m.attachment_failures += report.attachment_errors.len();
                if report.transport_error.is_some() {
                    m.api_errors += 1;
                }
            }
            let _ = state.logger.log_run_outcome(
                &id.to_string(),
                &report.status.to_string(),
                &report.message.text,
            );
            for err in &report.attachment_errors {
                let _ = state.logger.log_error(&err.to_string());
            }
            if let Some(e) = &report.sandbox_error {
                let _ = state.logger.log_error(&format!("sandbox: {e}"));
            }
            state.broadcast(ChatEvent::RunFinished {
                session_id: id.to_string(),
                status: report.status.to_string(),
            });

            let mut html = templates::render_transcript(&id.to_string(), &session.messages);
            if report.status != crate::relay::RunStatus::Completed {
                let notice = AssistantError::RunTerminal {
                    status: report.status,
                };
                html.push_str(&format!(
                    r#"<div class="text-red-400 text-sm mt-2">{}; partial answer kept above.</div>"#,
                    html_escape(&notice.to_string())
                ));
            } else if let Some(transport) = &report.transport_error {
                html.push_str(&format!(
                    r#"<div class="text-red-400 text-sm mt-2">{}</div>"#,
                    html_escape(transport)
                ));
            }
            Html(html)
        }
        Err(AssistantError::TurnInProgress) => Html(
            r#"<div class="text-yellow-400">A question is still being answered for this session.</div>"#
                .to_string(),
        ),
        Err(e) => {
            {
                let mut m = state.metrics.write().await;
                m.api_errors += 1;
            }
            let _ = state.logger.log_error(&e.to_string());
            Html(format!(
                r#"<div class="p-4 bg-red-900/30 border border-red-700 rounded text-red-300"><strong>Error:</strong> {}</div>"#,
                html_escape(&e.to_string())
            ))
        }
    }
}

// ── Helpers ──────────────────────────────────────────────────────────

fn dataset_error(state: &DashboardState, e: &anyhow::Error) -> Html<String> {
    let _ = state.logger.log_error(&format!("dataset fetch: {e}"));
    Html(format!(
        r#"<div class="p-4 bg-red-900/30 border border-red-700 rounded text-red-300"><strong>Dataset unavailable:</strong> {}</div>"#,
        html_escape(&e.to_string())
    ))
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
