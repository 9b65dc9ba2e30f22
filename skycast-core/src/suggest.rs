//! "Suggest an edit" submission. Simulated: nothing leaves the process.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

pub const SUBMIT_DELAY: Duration = Duration::from_millis(1500);

pub const SUBMITTED_MESSAGE: &str = "Successfully submitted edit suggestions";

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SuggestedEdit {
    pub temperature: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionReceipt {
    pub edit: SuggestedEdit,
    pub message: &'static str,
}

pub async fn submit_suggestion(edit: SuggestedEdit, delay: Duration) -> SubmissionReceipt {
    info!(
        temperature = %edit.temperature,
        description = %edit.description,
        "submitting edit suggestion"
    );

    tokio::time::sleep(delay).await;

    SubmissionReceipt {
        edit,
        message: SUBMITTED_MESSAGE,
    }
}
