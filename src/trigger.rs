//! Trigger boundary
//!
//! The UI that fires actions and shows status text is an external
//! collaborator; it talks to the pipeline through the small
//! request/response shapes defined here. All payloads are serde structs so
//! the boundary can be carried over any message transport as JSON.

use serde::{Deserialize, Serialize};
use tracing::warn;
use url::Url;

use crate::error::Error;
use crate::page::PageDriver;
use crate::pipeline::{Artifact, Pipeline};

/// Health-check action.
pub const ACTION_PING: &str = "ping";
/// Recovery action.
pub const ACTION_PARSE_SCRIPT: &str = "parseScript";

/// A single action request from the trigger surface.
///
/// An explicit `url` selects the direct-fetch path; its absence means
/// "use the current page" and selects the live-page path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerRequest {
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Outcome reported back to the trigger surface. A failure carries a
/// human-readable message naming the stage that failed; the control
/// re-enables either way.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Response to [`ACTION_PING`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PingResponse {
    pub status: String,
}

/// Answer a ping from the trigger surface.
pub fn handle_ping() -> PingResponse {
    PingResponse {
        status: "ok".to_string(),
    }
}

/// Handle a recovery trigger end to end.
///
/// Returns the boundary response together with the packaged artifact on
/// success; saving the artifact's bytes is the caller's boundary step.
pub async fn handle_parse(
    pipeline: &Pipeline,
    request: &TriggerRequest,
    driver: Option<&mut dyn PageDriver>,
) -> (TriggerResponse, Option<Artifact>) {
    let outcome = run(pipeline, request, driver).await;
    match outcome {
        Ok(artifact) => (
            TriggerResponse {
                success: true,
                filename: Some(artifact.filename.clone()),
                error: None,
            },
            Some(artifact),
        ),
        Err(err) => {
            warn!(%err, "operation failed");
            (
                TriggerResponse {
                    success: false,
                    filename: None,
                    error: Some(err.to_string()),
                },
                None,
            )
        }
    }
}

async fn run(
    pipeline: &Pipeline,
    request: &TriggerRequest,
    driver: Option<&mut dyn PageDriver>,
) -> Result<Artifact, Error> {
    match (&request.url, driver) {
        (Some(raw), _) => {
            let target = Url::parse(raw)
                .map_err(|e| Error::Precondition(format!("invalid target location: {e}")))?;
            pipeline.run_fetch(&target).await
        }
        (None, Some(driver)) => pipeline.run_page(driver).await,
        (None, None) => Err(Error::Precondition(
            "no target location and no live page available".to_string(),
        )),
    }
}
