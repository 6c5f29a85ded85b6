//! Assistants-v2 HTTP adapter: the one place that knows the vendor's wire
//! shape. Streaming run progress arrives as server-sent events and is decoded
//! into the closed `RunEvent` set the relay consumes.

use crate::config::{AppConfig, Secrets};
use crate::error::AssistantError;
use crate::relay::{EventStream, RunEvent, RunStatus};
use crate::remote::{ConversationId, FileId, RemoteAttachment, RemoteClient, RemoteMessage};
use crate::utils::truncate_utf8;
use async_trait::async_trait;
use futures::stream::{Stream, StreamExt};
use reqwest::multipart;
use serde::Deserialize;
use serde_json::json;
use std::collections::VecDeque;
use std::pin::Pin;
use std::time::Duration;

const BETA_HEADER: &str = "OpenAI-Beta";
const BETA_VALUE: &str = "assistants=v2";

pub struct OpenAiClient {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
    assistant_id: String,
    request_timeout: Duration,
}

impl OpenAiClient {
    pub fn new(config: &AppConfig, secrets: &Secrets) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key: secrets.api_key.clone(),
            assistant_id: secrets.assistant_id.clone(),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.http
            .get(self.url(path))
            .bearer_auth(&self.api_key)
            .header(BETA_HEADER, BETA_VALUE)
            .timeout(self.request_timeout)
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.http
            .post(self.url(path))
            .bearer_auth(&self.api_key)
            .header(BETA_HEADER, BETA_VALUE)
            .timeout(self.request_timeout)
    }
}

/// Check a response status, reading (and truncating) the error body for the
/// user-visible message. `write` selects the error side of the taxonomy.
async fn expect_success(
    resp: reqwest::Response,
    context: &str,
    write: bool,
) -> Result<reqwest::Response, AssistantError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    let detail = format!("{status} {}", truncate_utf8(&body, 300));
    Err(if write {
        AssistantError::remote_write(context, detail)
    } else {
        AssistantError::remote_read(context, detail)
    })
}

// ── Wire types (responses) ──────────────────────────────────────────────

#[derive(Deserialize)]
struct CreatedObject {
    id: String,
}

#[derive(Deserialize)]
struct MessageList {
    data: Vec<ApiMessage>,
}

#[derive(Deserialize)]
struct ApiMessage {
    role: String,
    #[serde(default)]
    attachments: Option<Vec<ApiAttachment>>,
}

#[derive(Deserialize)]
struct ApiAttachment {
    file_id: Option<String>,
}

#[derive(Deserialize)]
struct FileMetadata {
    filename: Option<String>,
}

#[async_trait]
impl RemoteClient for OpenAiClient {
    async fn create_conversation(&self) -> Result<ConversationId, AssistantError> {
        let resp = self
            .post("/threads")
            .json(&json!({}))
            .send()
            .await
            .map_err(|e| AssistantError::remote_write("create conversation", e))?;
        let resp = expect_success(resp, "create conversation", true).await?;
        let created: CreatedObject = resp
            .json()
            .await
            .map_err(|e| AssistantError::remote_write("create conversation", e))?;
        Ok(ConversationId(created.id))
    }

    async fn append_user_message(
        &self,
        conversation: &ConversationId,
        text: &str,
    ) -> Result<(), AssistantError> {
        let resp = self
            .post(&format!("/threads/{conversation}/messages"))
            .json(&json!({ "role": "user", "content": text }))
            .send()
            .await
            .map_err(|e| AssistantError::remote_write("append message", e))?;
        expect_success(resp, "append message", true).await?;
        Ok(())
    }

    async fn start_run(&self, conversation: &ConversationId) -> Result<EventStream, AssistantError> {
        // No per-request timeout here: the stream stays open for the whole run.
        let resp = self
            .http
            .post(self.url(&format!("/threads/{conversation}/runs")))
            .bearer_auth(&self.api_key)
            .header(BETA_HEADER, BETA_VALUE)
            .json(&json!({
                "assistant_id": self.assistant_id,
                "temperature": 0,
                "stream": true,
            }))
            .send()
            .await
            .map_err(|e| AssistantError::remote_write("start run", e))?;
        let resp = expect_success(resp, "start run", true).await?;

        let bytes: Pin<Box<dyn Stream<Item = Result<Vec<u8>, reqwest::Error>> + Send>> =
            Box::pin(resp.bytes_stream().map(|r| r.map(|b| b.to_vec())));

        struct StreamState {
            bytes: Pin<Box<dyn Stream<Item = Result<Vec<u8>, reqwest::Error>> + Send>>,
            parser: SseParser,
            pending: VecDeque<RunEvent>,
            done: bool,
        }

        let state = StreamState {
            bytes,
            parser: SseParser::new(),
            pending: VecDeque::new(),
            done: false,
        };

        let events = futures::stream::unfold(state, |mut st| async move {
            loop {
                if let Some(event) = st.pending.pop_front() {
                    return Some((Ok(event), st));
                }
                if st.done {
                    return None;
                }
                match st.bytes.next().await {
                    Some(Ok(chunk)) => {
                        for frame in st.parser.feed(&chunk) {
                            st.pending.extend(decode_frame(&frame));
                        }
                    }
                    Some(Err(e)) => {
                        st.done = true;
                        return Some((Err(AssistantError::remote_read("run event stream", e)), st));
                    }
                    None => st.done = true,
                }
            }
        });

        Ok(Box::pin(events))
    }

    async fn list_messages(
        &self,
        conversation: &ConversationId,
    ) -> Result<Vec<RemoteMessage>, AssistantError> {
        let resp = self
            .get(&format!("/threads/{conversation}/messages"))
            .send()
            .await
            .map_err(|e| AssistantError::remote_read("list messages", e))?;
        let resp = expect_success(resp, "list messages", false).await?;
        let list: MessageList = resp
            .json()
            .await
            .map_err(|e| AssistantError::remote_read("list messages", e))?;

        let mut messages = Vec::with_capacity(list.data.len());
        for api in list.data {
            let mut attachments = Vec::new();
            for a in api.attachments.unwrap_or_default() {
                let Some(file_id) = a.file_id else { continue };
                let filename = self.lookup_filename(&file_id).await;
                attachments.push(RemoteAttachment {
                    file_id: FileId(file_id),
                    filename,
                });
            }
            messages.push(RemoteMessage {
                role: api.role,
                attachments,
            });
        }
        Ok(messages)
    }

    async fn fetch_attachment(&self, file: &FileId) -> Result<Vec<u8>, AssistantError> {
        let resp = self
            .get(&format!("/files/{file}/content"))
            .send()
            .await
            .map_err(|e| AssistantError::remote_read("fetch file content", e))?;
        let resp = expect_success(resp, "fetch file content", false).await?;
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| AssistantError::remote_read("fetch file content", e))?;
        Ok(bytes.to_vec())
    }

    async fn upload_file(&self, filename: &str, bytes: Vec<u8>) -> Result<FileId, AssistantError> {
        let part = multipart::Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str("application/octet-stream")
            .map_err(|e| AssistantError::remote_write("upload file", e))?;
        let form = multipart::Form::new()
            .text("purpose", "assistants")
            .part("file", part);

        let resp = self
            .http
            .post(self.url("/files"))
            .bearer_auth(&self.api_key)
            .header(BETA_HEADER, BETA_VALUE)
            .timeout(self.request_timeout)
            .multipart(form)
            .send()
            .await
            .map_err(|e| AssistantError::remote_write("upload file", e))?;
        let resp = expect_success(resp, "upload file", true).await?;
        let created: CreatedObject = resp
            .json()
            .await
            .map_err(|e| AssistantError::remote_write("upload file", e))?;
        Ok(FileId(created.id))
    }

    async fn update_tool_resources(&self, file: &FileId) -> Result<(), AssistantError> {
        let resp = self
            .post(&format!("/assistants/{}", self.assistant_id))
            .json(&json!({
                "tool_resources": {
                    "code_interpreter": { "file_ids": [file.0.as_str()] }
                }
            }))
            .send()
            .await
            .map_err(|e| AssistantError::remote_write("update tool resources", e))?;
        expect_success(resp, "update tool resources", true).await?;
        Ok(())
    }
}

impl OpenAiClient {
    /// Resolve a produced file's name from the files endpoint. A failed
    /// lookup falls back to the file id; classification then treats the file
    /// as a generic download.
    async fn lookup_filename(&self, file_id: &str) -> String {
        let resp = match self.get(&format!("/files/{file_id}")).send().await {
            Ok(r) if r.status().is_success() => r,
            _ => return file_id.to_string(),
        };
        match resp.json::<FileMetadata>().await {
            Ok(meta) => meta.filename.unwrap_or_else(|| file_id.to_string()),
            Err(_) => file_id.to_string(),
        }
    }
}

// ── Server-sent event decoding ──────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
struct SseFrame {
    event: String,
    data: String,
}

/// Incremental SSE framer: feed raw chunks, get back complete frames. Frames
/// may span chunk boundaries; a chunk may carry several frames.
struct SseParser {
    buf: String,
}

impl SseParser {
    fn new() -> Self {
        Self { buf: String::new() }
    }

    fn feed(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buf
            .push_str(&String::from_utf8_lossy(chunk).replace("\r\n", "\n"));
        let mut frames = Vec::new();
        while let Some(pos) = self.buf.find("\n\n") {
            let raw: String = self.buf[..pos].to_string();
            self.buf.drain(..pos + 2);
            if let Some(frame) = parse_frame(&raw) {
                frames.push(frame);
            }
        }
        frames
    }
}

fn parse_frame(raw: &str) -> Option<SseFrame> {
    let mut event = String::new();
    let mut data_lines: Vec<&str> = Vec::new();
    for line in raw.lines() {
        if let Some(rest) = line.strip_prefix("event:") {
            event = rest.trim().to_string();
        } else if let Some(rest) = line.strip_prefix("data:") {
            data_lines.push(rest.strip_prefix(' ').unwrap_or(rest));
        }
        // comment lines and unknown fields are ignored
    }
    if event.is_empty() && data_lines.is_empty() {
        return None;
    }
    Some(SseFrame {
        event,
        data: data_lines.join("\n"),
    })
}

// ── Event payload shapes (all fields optional: absent payload = no-op) ──

#[derive(Deserialize)]
struct MessageDeltaEnvelope {
    delta: Option<MessageDelta>,
}

#[derive(Deserialize)]
struct MessageDelta {
    content: Option<Vec<ContentPart>>,
}

#[derive(Deserialize)]
struct ContentPart {
    #[serde(rename = "type")]
    kind: Option<String>,
    text: Option<TextPart>,
}

#[derive(Deserialize)]
struct TextPart {
    value: Option<String>,
}

#[derive(Deserialize)]
struct StepObject {
    #[serde(rename = "type")]
    kind: Option<String>,
    step_details: Option<StepDetails>,
}

#[derive(Deserialize)]
struct StepDetails {
    #[serde(rename = "type")]
    kind: Option<String>,
}

#[derive(Deserialize)]
struct StepDeltaEnvelope {
    delta: Option<StepDelta>,
}

#[derive(Deserialize)]
struct StepDelta {
    step_details: Option<StepDetailsDelta>,
}

#[derive(Deserialize)]
struct StepDetailsDelta {
    tool_calls: Option<Vec<ToolCallDelta>>,
}

#[derive(Deserialize)]
struct ToolCallDelta {
    #[serde(rename = "type")]
    kind: Option<String>,
    code_interpreter: Option<CodeInterpreterDelta>,
}

#[derive(Deserialize)]
struct CodeInterpreterDelta {
    input: Option<String>,
    outputs: Option<Vec<CodeOutput>>,
}

#[derive(Deserialize)]
struct CodeOutput {
    #[serde(rename = "type")]
    kind: Option<String>,
    logs: Option<String>,
}

fn step_is_tool_call(step: &StepObject) -> bool {
    step.kind.as_deref() == Some("tool_calls")
        || step
            .step_details
            .as_ref()
            .and_then(|d| d.kind.as_deref())
            == Some("tool_calls")
}

/// Map one SSE frame onto run events. Unknown event types, malformed JSON
/// and absent fields all decode to nothing rather than failing the stream.
fn decode_frame(frame: &SseFrame) -> Vec<RunEvent> {
    if frame.data == "[DONE]" {
        return Vec::new();
    }
    match frame.event.as_str() {
        "thread.message.delta" => {
            let Ok(envelope) = serde_json::from_str::<MessageDeltaEnvelope>(&frame.data) else {
                return Vec::new();
            };
            envelope
                .delta
                .and_then(|d| d.content)
                .unwrap_or_default()
                .into_iter()
                .filter(|part| part.kind.as_deref() == Some("text"))
                .map(|part| RunEvent::TextDelta {
                    value: part.text.and_then(|t| t.value),
                })
                .collect()
        }
        "thread.run.step.created" => {
            let Ok(step) = serde_json::from_str::<StepObject>(&frame.data) else {
                return Vec::new();
            };
            if step_is_tool_call(&step) {
                vec![RunEvent::ToolStarted]
            } else {
                Vec::new()
            }
        }
        "thread.run.step.delta" => {
            let Ok(envelope) = serde_json::from_str::<StepDeltaEnvelope>(&frame.data) else {
                return Vec::new();
            };
            envelope
                .delta
                .and_then(|d| d.step_details)
                .and_then(|d| d.tool_calls)
                .unwrap_or_default()
                .into_iter()
                .filter(|tc| tc.kind.as_deref() == Some("code_interpreter"))
                .map(|tc| {
                    let ci = tc.code_interpreter;
                    let code = ci.as_ref().and_then(|c| c.input.clone());
                    let logs = ci
                        .and_then(|c| c.outputs)
                        .unwrap_or_default()
                        .into_iter()
                        .filter(|o| o.kind.as_deref() == Some("logs"))
                        .filter_map(|o| o.logs)
                        .collect();
                    RunEvent::ToolDelta { code, logs }
                })
                .collect()
        }
        "thread.run.step.completed" => {
            let Ok(step) = serde_json::from_str::<StepObject>(&frame.data) else {
                return Vec::new();
            };
            if step_is_tool_call(&step) {
                vec![RunEvent::ToolFinished]
            } else {
                Vec::new()
            }
        }
        "thread.run.queued" => vec![RunEvent::RunTerminal {
            status: RunStatus::Queued,
        }],
        "thread.run.in_progress" => vec![RunEvent::RunTerminal {
            status: RunStatus::InProgress,
        }],
        "thread.run.completed" => vec![RunEvent::RunTerminal {
            status: RunStatus::Completed,
        }],
        "thread.run.failed" => vec![RunEvent::RunTerminal {
            status: RunStatus::Failed,
        }],
        "thread.run.cancelled" => vec![RunEvent::RunTerminal {
            status: RunStatus::Cancelled,
        }],
        "thread.run.expired" => vec![RunEvent::RunTerminal {
            status: RunStatus::Expired,
        }],
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn client_for(server: &mockito::ServerGuard) -> OpenAiClient {
        let config = AppConfig {
            api_base: server.url(),
            request_timeout_secs: 5,
            ..AppConfig::default()
        };
        let secrets = Secrets {
            api_key: "sk-test".to_string(),
            assistant_id: "asst_test".to_string(),
            sheet_url: String::new(),
        };
        OpenAiClient::new(&config, &secrets)
    }

    // ── SSE framing ─────────────────────────────────────────────────────

    #[test]
    fn test_sse_single_frame() {
        let mut parser = SseParser::new();
        let frames = parser.feed(b"event: thread.run.completed\ndata: {}\n\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].event, "thread.run.completed");
        assert_eq!(frames[0].data, "{}");
    }

    #[test]
    fn test_sse_frame_split_across_chunks() {
        let mut parser = SseParser::new();
        assert!(parser.feed(b"event: thread.mess").is_empty());
        assert!(parser.feed(b"age.delta\ndata: {\"a\"").is_empty());
        let frames = parser.feed(b": 1}\n\nevent: x\ndata: y\n\n");
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].event, "thread.message.delta");
        assert_eq!(frames[0].data, "{\"a\": 1}");
        assert_eq!(frames[1].event, "x");
    }

    #[test]
    fn test_sse_crlf_line_endings() {
        let mut parser = SseParser::new();
        let frames = parser.feed(b"event: e\r\ndata: d\r\n\r\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data, "d");
    }

    #[test]
    fn test_sse_multiline_data_joined() {
        let mut parser = SseParser::new();
        let frames = parser.feed(b"data: line1\ndata: line2\n\n");
        assert_eq!(frames[0].data, "line1\nline2");
    }

    #[test]
    fn test_sse_comment_only_frame_dropped() {
        let mut parser = SseParser::new();
        let frames = parser.feed(b": keep-alive\n\n");
        assert!(frames.is_empty());
    }

    // ── Frame decoding ──────────────────────────────────────────────────

    fn frame(event: &str, data: &str) -> SseFrame {
        SseFrame {
            event: event.to_string(),
            data: data.to_string(),
        }
    }

    #[test]
    fn test_decode_text_delta() {
        let data = r#"{"delta":{"content":[{"type":"text","text":{"value":"Hello"}}]}}"#;
        let events = decode_frame(&frame("thread.message.delta", data));
        assert_eq!(
            events,
            vec![RunEvent::TextDelta {
                value: Some("Hello".to_string())
            }]
        );
    }

    #[test]
    fn test_decode_text_delta_without_value_is_empty_event() {
        let data = r#"{"delta":{"content":[{"type":"text"}]}}"#;
        let events = decode_frame(&frame("thread.message.delta", data));
        assert_eq!(events, vec![RunEvent::TextDelta { value: None }]);
    }

    #[test]
    fn test_decode_tool_step_created() {
        let data = r#"{"type":"tool_calls","step_details":{"type":"tool_calls"}}"#;
        let events = decode_frame(&frame("thread.run.step.created", data));
        assert_eq!(events, vec![RunEvent::ToolStarted]);
    }

    #[test]
    fn test_decode_message_creation_step_ignored() {
        let data = r#"{"type":"message_creation","step_details":{"type":"message_creation"}}"#;
        assert!(decode_frame(&frame("thread.run.step.created", data)).is_empty());
        assert!(decode_frame(&frame("thread.run.step.completed", data)).is_empty());
    }

    #[test]
    fn test_decode_tool_delta_code_and_logs() {
        let data = r#"{"delta":{"step_details":{"tool_calls":[{"type":"code_interpreter","code_interpreter":{"input":"import pandas","outputs":[{"type":"logs","logs":"14.2"},{"type":"image","file_id":"f1"}]}}]}}}"#;
        let events = decode_frame(&frame("thread.run.step.delta", data));
        assert_eq!(
            events,
            vec![RunEvent::ToolDelta {
                code: Some("import pandas".to_string()),
                logs: vec!["14.2".to_string()],
            }]
        );
    }

    #[test]
    fn test_decode_terminal_statuses() {
        for (event, status) in [
            ("thread.run.completed", RunStatus::Completed),
            ("thread.run.failed", RunStatus::Failed),
            ("thread.run.cancelled", RunStatus::Cancelled),
            ("thread.run.expired", RunStatus::Expired),
        ] {
            let events = decode_frame(&frame(event, "{}"));
            assert_eq!(events, vec![RunEvent::RunTerminal { status }]);
        }
    }

    #[test]
    fn test_decode_unknown_event_and_bad_json_tolerated() {
        assert!(decode_frame(&frame("thread.run.requires_action", "{}")).is_empty());
        assert!(decode_frame(&frame("thread.message.delta", "not json")).is_empty());
        assert!(decode_frame(&frame("", "[DONE]")).is_empty());
    }

    // ── HTTP adapter against a mock server ──────────────────────────────

    #[tokio::test]
    async fn test_create_conversation() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/threads")
            .match_header("authorization", "Bearer sk-test")
            .match_header("openai-beta", "assistants=v2")
            .with_body(r#"{"id":"thread_abc","object":"thread"}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let id = client.create_conversation().await.unwrap();
        assert_eq!(id, ConversationId("thread_abc".to_string()));
    }

    #[tokio::test]
    async fn test_append_message_rejection_is_remote_write() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/threads/thread_x/messages")
            .with_status(404)
            .with_body(r#"{"error":{"message":"No thread found"}}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let err = client
            .append_user_message(&ConversationId("thread_x".to_string()), "hi")
            .await
            .unwrap_err();
        assert!(matches!(err, AssistantError::RemoteWrite(_)));
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn test_start_run_streams_decoded_events() {
        let body = concat!(
            "event: thread.run.created\ndata: {}\n\n",
            "event: thread.message.delta\n",
            "data: {\"delta\":{\"content\":[{\"type\":\"text\",\"text\":{\"value\":\"Hi\"}}]}}\n\n",
            "event: thread.run.completed\ndata: {}\n\n",
            "data: [DONE]\n\n",
        );
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/threads/thread_1/runs")
            .with_header("content-type", "text/event-stream")
            .with_body(body)
            .create_async()
            .await;

        let client = client_for(&server);
        let stream = client
            .start_run(&ConversationId("thread_1".to_string()))
            .await
            .unwrap();
        let events: Vec<RunEvent> = stream.map(|r| r.unwrap()).collect().await;
        assert_eq!(
            events,
            vec![
                RunEvent::TextDelta {
                    value: Some("Hi".to_string())
                },
                RunEvent::RunTerminal {
                    status: RunStatus::Completed
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_list_messages_resolves_filenames() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/threads/thread_1/messages")
            .with_body(
                r#"{"data":[
                    {"role":"assistant","attachments":[{"file_id":"file_1"}]},
                    {"role":"user"}
                ]}"#,
            )
            .create_async()
            .await;
        server
            .mock("GET", "/files/file_1")
            .with_body(r#"{"id":"file_1","filename":"chart.png"}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let messages = client
            .list_messages(&ConversationId("thread_1".to_string()))
            .await
            .unwrap();
        assert_eq!(messages.len(), 2);
        assert!(messages[0].is_assistant());
        assert_eq!(messages[0].attachments.len(), 1);
        assert_eq!(messages[0].attachments[0].filename, "chart.png");
        assert!(messages[1].attachments.is_empty());
    }

    #[tokio::test]
    async fn test_list_messages_filename_falls_back_to_file_id() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/threads/thread_1/messages")
            .with_body(r#"{"data":[{"role":"assistant","attachments":[{"file_id":"file_9"}]}]}"#)
            .create_async()
            .await;
        // No /files/file_9 mock: the metadata lookup 501s

        let client = client_for(&server);
        let messages = client
            .list_messages(&ConversationId("thread_1".to_string()))
            .await
            .unwrap();
        assert_eq!(messages[0].attachments[0].filename, "file_9");
    }

    #[tokio::test]
    async fn test_fetch_attachment_bytes() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/files/file_1/content")
            .with_body(&b"raw bytes"[..])
            .create_async()
            .await;

        let client = client_for(&server);
        let bytes = client
            .fetch_attachment(&FileId("file_1".to_string()))
            .await
            .unwrap();
        assert_eq!(bytes, b"raw bytes");
    }

    #[tokio::test]
    async fn test_upload_file_returns_id() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/files")
            .match_header("authorization", "Bearer sk-test")
            .with_body(r#"{"id":"file_new","object":"file"}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let id = client
            .upload_file("clients.csv", b"a,b\n1,2\n".to_vec())
            .await
            .unwrap();
        assert_eq!(id, FileId("file_new".to_string()));
    }

    #[tokio::test]
    async fn test_update_tool_resources_targets_assistant() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/assistants/asst_test")
            .match_body(mockito::Matcher::PartialJsonString(
                r#"{"tool_resources":{"code_interpreter":{"file_ids":["file_1"]}}}"#.to_string(),
            ))
            .with_body(r#"{"id":"asst_test"}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        client
            .update_tool_resources(&FileId("file_1".to_string()))
            .await
            .unwrap();
        mock.assert_async().await;
    }
}
