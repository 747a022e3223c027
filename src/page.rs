//! Live-page acquisition: probe messaging and the injection fallback
//!
//! The browser tab hosting the page is an external collaborator. This
//! module defines the seam to it: a request/response message to an in-page
//! extraction probe, plus a one-shot script-injection query used when the
//! probe does not answer.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::error::Error as PipelineError;

/// Action name understood by the in-page extraction probe.
pub const GET_PRE_CONTENT: &str = "getPreContent";

/// Request sent to the in-page probe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeRequest {
    pub action: String,
}

impl ProbeRequest {
    /// Ask the probe for the `<pre>` text content of its page.
    pub fn get_pre_content() -> Self {
        Self {
            action: GET_PRE_CONTENT.to_string(),
        }
    }
}

/// Response from the in-page probe. `content` is `None` when the page has
/// no `<pre>` element.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeResponse {
    pub content: Option<String>,
}

/// Failure to get any response out of the page context.
///
/// Distinct from a probe that answers with no content: these mean the
/// message never produced an answer at all, which is what triggers the
/// injection fallback.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// No probe listener is registered in the page.
    #[error("no probe listener in page")]
    NoListener,
    /// The host reported an error delivering the message.
    #[error("probe transport error: {0}")]
    Transport(String),
}

/// Seam to the live browser page.
///
/// Implementations wrap whatever drives the real tab. One navigation is
/// issued per operation and nothing is persisted across operations.
#[async_trait]
pub trait PageDriver: Send {
    /// Current page location.
    fn location(&self) -> Url;

    /// Navigate the live page in place.
    async fn navigate(&mut self, url: &Url) -> Result<(), PipelineError>;

    /// Send a request to the in-page probe and await its response.
    async fn probe(&mut self, request: ProbeRequest) -> Result<ProbeResponse, ProbeError>;

    /// One-shot script injection that queries the DOM for the first
    /// `<pre>` element directly, bypassing the probe.
    async fn inject_pre_query(&mut self) -> Result<Option<String>, ProbeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_request_wire_shape() {
        let json = serde_json::to_string(&ProbeRequest::get_pre_content()).unwrap();
        assert_eq!(json, r#"{"action":"getPreContent"}"#);
    }

    #[test]
    fn test_probe_response_roundtrip() {
        let resp: ProbeResponse = serde_json::from_str(r#"{"content":null}"#).unwrap();
        assert_eq!(resp.content, None);
        let resp: ProbeResponse =
            serde_json::from_str(r#"{"content":"{\"a\":1}"}"#).unwrap();
        assert_eq!(resp.content.as_deref(), Some("{\"a\":1}"));
    }
}
