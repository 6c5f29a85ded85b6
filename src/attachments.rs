//! Attachment resolver: after a completed run, fetch the files the
//! assistant's newest message references and fold them into the committed
//! chat message. Each attachment resolves independently; one bad file never
//! hides its siblings.

use crate::error::AssistantError;
use crate::remote::{ConversationId, RemoteClient};
use crate::session::{Attachment, AttachmentKind, ChatMessage};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use std::io::Cursor;

/// Resolve the newest assistant message's attachments into `message`. Images
/// are re-encoded to PNG for the browser, tabular files are validated for
/// table rendering in the transcript, anything else becomes an inline
/// download link. Returns one `AttachmentFetch` error per file that failed.
pub async fn resolve_attachments(
    client: &dyn RemoteClient,
    conversation: &ConversationId,
    message: &mut ChatMessage,
) -> Vec<AssistantError> {
    let remote_messages = match client.list_messages(conversation).await {
        Ok(list) => list,
        Err(e) => return vec![e],
    };
    let Some(assistant_msg) = remote_messages.iter().find(|m| m.is_assistant()) else {
        return Vec::new();
    };

    let mut failures = Vec::new();
    for remote in &assistant_msg.attachments {
        let bytes = match client.fetch_attachment(&remote.file_id).await {
            Ok(b) => b,
            Err(e) => {
                failures.push(AssistantError::AttachmentFetch {
                    filename: remote.filename.clone(),
                    reason: e.to_string(),
                });
                continue;
            }
        };
        if let Err(reason) = apply_attachment(message, &remote.filename, bytes) {
            failures.push(AssistantError::AttachmentFetch {
                filename: remote.filename.clone(),
                reason,
            });
        }
    }
    failures
}

fn apply_attachment(
    message: &mut ChatMessage,
    filename: &str,
    bytes: Vec<u8>,
) -> Result<(), String> {
    let kind = AttachmentKind::from_filename(filename);
    match kind {
        AttachmentKind::Image => {
            let decoded = image::load_from_memory(&bytes)
                .map_err(|e| format!("image decode failed: {e}"))?;
            let mut png = Vec::new();
            decoded
                .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
                .map_err(|e| format!("png encode failed: {e}"))?;
            // One inline image slot; further images stay downloadable below.
            if message.image.is_none() {
                message.image = Some(png);
            }
        }
        AttachmentKind::Tabular => {
            // Parsed here so a broken file surfaces as a resolution failure;
            // the transcript renders the table from the stored bytes.
            csv_table(&bytes).map_err(|e| format!("csv parse failed: {e}"))?;
        }
        AttachmentKind::Other => {
            let link = format!(
                "\n\n[Download {filename}](data:application/octet-stream;base64,{})",
                BASE64.encode(&bytes)
            );
            message.text.push_str(&link);
        }
    }
    message.attachments.push(Attachment {
        filename: filename.to_string(),
        bytes,
        kind,
    });
    Ok(())
}

/// A tabular attachment parsed for display.
#[derive(Debug, Clone, PartialEq)]
pub struct CsvTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Parse arbitrary CSV bytes into headers and rows.
pub fn csv_table(bytes: &[u8]) -> Result<CsvTable, csv::Error> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(bytes);
    let headers = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        rows.push(record?.iter().map(|c| c.trim().to_string()).collect());
    }
    Ok(CsvTable { headers, rows })
}
