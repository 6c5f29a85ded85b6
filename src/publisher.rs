//! Publishes the working dataset to the remote side so the assistant's
//! code-execution tool can read it. Upload and tool re-pointing are one
//! logical step: if either fails the turn is abandoned before the
//! conversation is touched.

use crate::dataset::{to_csv, ClientRecord};
use crate::error::AssistantError;
use crate::remote::{FileId, RemoteClient};

pub const DATASET_FILENAME: &str = "client_data.csv";

/// Serialize `records`, upload them under the canonical filename and re-point
/// the assistant's tool resources at the new file. Returns the remote file id.
pub async fn publish_dataset(
    client: &dyn RemoteClient,
    records: &[ClientRecord],
) -> Result<FileId, AssistantError> {
    let bytes = to_csv(records)
        .map_err(|e| AssistantError::remote_write("serialize dataset", e.to_string()))?;
    let file_id = client.upload_file(DATASET_FILENAME, bytes).await?;
    client.update_tool_resources(&file_id).await?;
    Ok(file_id)
}
