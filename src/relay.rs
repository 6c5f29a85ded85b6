//! Event relay: consumes the ordered event stream of one remote run and
//! applies each event synchronously to the accumulating assistant message
//! and to the render targets (running text, code region, output region).

use crate::error::AssistantError;
use futures::stream::{Stream, StreamExt};
use std::pin::Pin;

/// Lifecycle of a remote run: `queued → in_progress → {completed | failed |
/// cancelled | expired}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Queued,
    InProgress,
    Completed,
    Failed,
    Cancelled,
    Expired,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunStatus::Completed | RunStatus::Failed | RunStatus::Cancelled | RunStatus::Expired
        )
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RunStatus::Queued => "queued",
            RunStatus::InProgress => "in_progress",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
            RunStatus::Cancelled => "cancelled",
            RunStatus::Expired => "expired",
        };
        write!(f, "{s}")
    }
}

/// Closed set of events a run stream can produce. Vendor callback shapes are
/// normalized into these variants by the remote adapter.
#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    /// Incremental suffix append to the assistant text. A missing value is a
    /// no-op, not an error.
    TextDelta { value: Option<String> },
    /// The code-execution tool was invoked: open one code region and one
    /// output region, both empty.
    ToolStarted,
    /// Incremental tool progress: code text to extend the code region and
    /// zero or more log entries to append to the output region.
    ToolDelta {
        code: Option<String>,
        logs: Vec<String>,
    },
    /// No further updates for the current tool invocation.
    ToolFinished,
    /// The run changed state; only terminal states end the relay.
    RunTerminal { status: RunStatus },
}

pub type EventStream = Pin<Box<dyn Stream<Item = Result<RunEvent, AssistantError>> + Send>>;

/// Rendering side effects, applied synchronously as events are consumed.
/// The dashboard implements this over a broadcast channel; tests record calls.
pub trait RenderSink: Send {
    /// Full accumulated assistant text after a delta was applied.
    fn text_updated(&mut self, full_text: &str);
    fn tool_started(&mut self);
    /// Full accumulated code after a code delta was applied.
    fn code_updated(&mut self, code: &str);
    /// One output log entry, in arrival order.
    fn output_appended(&mut self, entry: &str);
    fn tool_finished(&mut self);
}

/// Sink that renders nowhere. Used when no UI is listening.
pub struct NullSink;

impl RenderSink for NullSink {
    fn text_updated(&mut self, _full_text: &str) {}
    fn tool_started(&mut self) {}
    fn code_updated(&mut self, _code: &str) {}
    fn output_appended(&mut self, _entry: &str) {}
    fn tool_finished(&mut self) {}
}

/// Everything one run accumulated, in whatever terminal state it reached.
/// The caller commits `text`/`code`/`output` to the transcript regardless of
/// `status`, so partial progress is never lost.
#[derive(Debug, Clone)]
pub struct RelayOutcome {
    pub text: String,
    pub code: String,
    pub output: String,
    pub status: RunStatus,
    /// Set when the stream itself broke or ended without a terminal event.
    pub transport_error: Option<String>,
}

impl RelayOutcome {
    pub fn completed(&self) -> bool {
        self.status == RunStatus::Completed && self.transport_error.is_none()
    }
}

/// Drive a run's event stream to a terminal state.
///
/// Single logical thread of control: events are applied strictly in arrival
/// order and every side effect happens before the next event is read. There
/// is no batching, no coalescing and no retry.
pub async fn drive_run(mut events: EventStream, sink: &mut dyn RenderSink) -> RelayOutcome {
    let mut outcome = RelayOutcome {
        text: String::new(),
        code: String::new(),
        output: String::new(),
        status: RunStatus::InProgress,
        transport_error: None,
    };
    let mut tool_open = false;

    while let Some(item) = events.next().await {
        match item {
            Ok(RunEvent::TextDelta { value }) => {
                if let Some(v) = value {
                    outcome.text.push_str(&v);
                }
                sink.text_updated(&outcome.text);
            }
            Ok(RunEvent::ToolStarted) => {
                tool_open = true;
                sink.tool_started();
            }
            Ok(RunEvent::ToolDelta { code, logs }) => {
                // Deltas before any invocation opened have nowhere to render.
                if !tool_open {
                    continue;
                }
                if let Some(c) = code {
                    if !c.is_empty() {
                        outcome.code.push_str(&c);
                        sink.code_updated(&outcome.code);
                    }
                }
                for entry in logs {
                    if !outcome.output.is_empty() {
                        outcome.output.push('\n');
                    }
                    outcome.output.push_str(&entry);
                    sink.output_appended(&entry);
                }
            }
            Ok(RunEvent::ToolFinished) => {
                if tool_open {
                    tool_open = false;
                    sink.tool_finished();
                }
            }
            Ok(RunEvent::RunTerminal { status }) => {
                outcome.status = status;
                if status.is_terminal() {
                    break;
                }
            }
            Err(e) => {
                outcome.transport_error = Some(e.to_string());
                outcome.status = RunStatus::Failed;
                break;
            }
        }
    }

    if !outcome.status.is_terminal() {
        outcome.status = RunStatus::Failed;
        if outcome.transport_error.is_none() {
            outcome.transport_error =
                Some("event stream ended before the run reached a terminal state".to_string());
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    /// Sink that records every call, so tests can assert ordering and
    /// per-delta rendering.
    #[derive(Default)]
    struct RecordingSink {
        text_frames: Vec<String>,
        code_frames: Vec<String>,
        output_entries: Vec<String>,
        tools_started: usize,
        tools_finished: usize,
    }

    impl RenderSink for RecordingSink {
        fn text_updated(&mut self, full_text: &str) {
            self.text_frames.push(full_text.to_string());
        }
        fn tool_started(&mut self) {
            self.tools_started += 1;
        }
        fn code_updated(&mut self, code: &str) {
            self.code_frames.push(code.to_string());
        }
        fn output_appended(&mut self, entry: &str) {
            self.output_entries.push(entry.to_string());
        }
        fn tool_finished(&mut self) {
            self.tools_finished += 1;
        }
    }

    fn events(items: Vec<RunEvent>) -> EventStream {
        Box::pin(stream::iter(items.into_iter().map(Ok)))
    }

    fn text(v: &str) -> RunEvent {
        RunEvent::TextDelta {
            value: Some(v.to_string()),
        }
    }

    fn terminal(status: RunStatus) -> RunEvent {
        RunEvent::RunTerminal { status }
    }

    #[tokio::test]
    async fn test_text_deltas_concatenate_in_arrival_order() {
        let mut sink = RecordingSink::default();
        let stream = events(vec![
            text("The "),
            text("average "),
            text("trial length is 14 days."),
            terminal(RunStatus::Completed),
        ]);

        let outcome = drive_run(stream, &mut sink).await;
        assert_eq!(outcome.text, "The average trial length is 14 days.");
        assert_eq!(outcome.status, RunStatus::Completed);
        assert!(outcome.completed());
        // At least one visual update per delta, each a strict suffix extension
        assert_eq!(
            sink.text_frames,
            vec!["The ", "The average ", "The average trial length is 14 days."]
        );
    }

    #[tokio::test]
    async fn test_empty_and_missing_deltas_are_noops() {
        let mut sink = RecordingSink::default();
        let stream = events(vec![
            text("a"),
            RunEvent::TextDelta { value: None },
            RunEvent::TextDelta {
                value: Some(String::new()),
            },
            text("b"),
            terminal(RunStatus::Completed),
        ]);

        let outcome = drive_run(stream, &mut sink).await;
        assert_eq!(outcome.text, "ab");
        // Every delta still produced a render frame
        assert_eq!(sink.text_frames.len(), 4);
    }

    #[tokio::test]
    async fn test_tool_invocation_flow() {
        let mut sink = RecordingSink::default();
        let stream = events(vec![
            RunEvent::ToolStarted,
            RunEvent::ToolDelta {
                code: Some("import pandas".to_string()),
                logs: vec![],
            },
            RunEvent::ToolDelta {
                code: Some(" as pd".to_string()),
                logs: vec!["14.2".to_string()],
            },
            RunEvent::ToolFinished,
            terminal(RunStatus::Completed),
        ]);

        let outcome = drive_run(stream, &mut sink).await;
        assert_eq!(outcome.code, "import pandas as pd");
        assert_eq!(outcome.output, "14.2");
        assert_eq!(sink.tools_started, 1);
        assert_eq!(sink.tools_finished, 1);
        assert_eq!(sink.code_frames, vec!["import pandas", "import pandas as pd"]);
        assert_eq!(sink.output_entries, vec!["14.2"]);
    }

    #[tokio::test]
    async fn test_tool_delta_before_start_is_ignored() {
        let mut sink = RecordingSink::default();
        let stream = events(vec![
            RunEvent::ToolDelta {
                code: Some("orphan".to_string()),
                logs: vec!["lost".to_string()],
            },
            terminal(RunStatus::Completed),
        ]);

        let outcome = drive_run(stream, &mut sink).await;
        assert!(outcome.code.is_empty());
        assert!(outcome.output.is_empty());
        assert!(sink.code_frames.is_empty());
    }

    #[tokio::test]
    async fn test_output_entries_append_as_they_arrive() {
        let mut sink = RecordingSink::default();
        let stream = events(vec![
            RunEvent::ToolStarted,
            RunEvent::ToolDelta {
                code: None,
                logs: vec!["line 1".to_string(), "line 2".to_string()],
            },
            RunEvent::ToolDelta {
                code: None,
                logs: vec!["line 3".to_string()],
            },
            terminal(RunStatus::Completed),
        ]);

        let outcome = drive_run(stream, &mut sink).await;
        assert_eq!(outcome.output, "line 1\nline 2\nline 3");
        assert_eq!(sink.output_entries.len(), 3);
    }

    #[tokio::test]
    async fn test_failed_run_keeps_partial_text() {
        let mut sink = RecordingSink::default();
        let stream = events(vec![
            text("partial "),
            text("answer"),
            terminal(RunStatus::Failed),
        ]);

        let outcome = drive_run(stream, &mut sink).await;
        assert_eq!(outcome.text, "partial answer");
        assert_eq!(outcome.status, RunStatus::Failed);
        assert!(!outcome.completed());
    }

    #[tokio::test]
    async fn test_non_terminal_status_does_not_end_relay() {
        let mut sink = RecordingSink::default();
        let stream = events(vec![
            terminal(RunStatus::Queued),
            terminal(RunStatus::InProgress),
            text("hello"),
            terminal(RunStatus::Completed),
        ]);

        let outcome = drive_run(stream, &mut sink).await;
        assert_eq!(outcome.text, "hello");
        assert_eq!(outcome.status, RunStatus::Completed);
    }

    #[tokio::test]
    async fn test_transport_error_preserves_partial_and_fails() {
        let mut sink = RecordingSink::default();
        let items: Vec<Result<RunEvent, AssistantError>> = vec![
            Ok(text("kept")),
            Err(AssistantError::remote_read("event stream", "connection reset")),
        ];
        let stream: EventStream = Box::pin(stream::iter(items));

        let outcome = drive_run(stream, &mut sink).await;
        assert_eq!(outcome.text, "kept");
        assert_eq!(outcome.status, RunStatus::Failed);
        assert!(outcome.transport_error.unwrap().contains("connection reset"));
    }

    #[tokio::test]
    async fn test_stream_ending_without_terminal_state_fails() {
        let mut sink = RecordingSink::default();
        let stream = events(vec![text("hi")]);

        let outcome = drive_run(stream, &mut sink).await;
        assert_eq!(outcome.text, "hi");
        assert_eq!(outcome.status, RunStatus::Failed);
        assert!(outcome
            .transport_error
            .unwrap()
            .contains("before the run reached a terminal state"));
    }
}
