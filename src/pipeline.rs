//! Operation orchestration for both acquisition paths
//!
//! Each trigger runs exactly one operation: acquire the raw text (direct
//! fetch or live page), sanitize and parse it, recover nested script
//! payloads, and package the result as an indented JSON artifact. Only one
//! operation may be in flight at a time — the live tab is a shared
//! resource, so a second trigger is rejected with [`Error::Busy`] instead
//! of racing the navigation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::Error;
use crate::fetch;
use crate::location;
use crate::page::{PageDriver, ProbeRequest};
use crate::recover::{self, UnwrapMode};

/// Fixed settle delay after navigating the live page. Client-side rendering
/// and any bot-challenge interstitial need time to finish; this constant is
/// a heuristic, not a readiness guarantee.
pub const SETTLE_DELAY: Duration = Duration::from_secs(7);

/// Default timeout on the direct network fetch.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

const DEFAULT_USER_AGENT: &str = concat!("script_recovery/", env!("CARGO_PKG_VERSION"));

/// Tunables for one pipeline instance.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Wait after navigation before probing the live page.
    pub settle_delay: Duration,
    /// Timeout on the direct network fetch.
    pub fetch_timeout: Duration,
    /// User agent sent with direct fetches.
    pub user_agent: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            settle_delay: SETTLE_DELAY,
            fetch_timeout: FETCH_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Packaged output of a successful operation.
///
/// Produced only after the whole document recovered; a failed operation
/// never yields partial bytes.
#[derive(Debug, Clone)]
pub struct Artifact {
    /// Suggested save filename, `<prefix>_<identifier>.json`.
    pub filename: String,
    /// The recovered document as UTF-8 JSON with 2-space indentation.
    pub bytes: Vec<u8>,
}

impl Artifact {
    fn package(document: &Value, filename: String) -> Result<Self, Error> {
        let bytes = serde_json::to_vec_pretty(document)?;
        Ok(Self { filename, bytes })
    }
}

/// One-at-a-time recovery pipeline.
#[derive(Debug)]
pub struct Pipeline {
    config: PipelineConfig,
    client: reqwest::Client,
    busy: AtomicBool,
}

impl Pipeline {
    /// Fails when the HTTP client cannot be built from the configuration,
    /// e.g. a user agent with invalid header characters.
    pub fn new(config: PipelineConfig) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| Error::Config(e.to_string()))?;
        Ok(Self {
            config,
            client,
            busy: AtomicBool::new(false),
        })
    }

    /// Run the direct-fetch path for an explicit target location.
    ///
    /// The target is rewritten to its raw-document sibling, fetched over
    /// the network, and recovered with the precise key-based unwrap rule.
    pub async fn run_fetch(&self, target: &Url) -> Result<Artifact, Error> {
        let _slot = self.acquire()?;
        let raw_url = location::rewrite_script_location(target);
        info!(%raw_url, "fetching script document");
        let text = fetch::fetch_pre_text(&self.client, &raw_url, self.config.fetch_timeout).await?;
        let document = recover::recover_text(&text, UnwrapMode::KeyOnly)?;
        info!("document recovered");
        Artifact::package(&document, location::fetch_filename(&raw_url))
    }

    /// Run the live-page path against the current page of `driver`.
    ///
    /// Used when the raw document sits behind client-side rendering: the
    /// tab is navigated in place, given a fixed settle delay, then asked
    /// for the `<pre>` text via the in-page probe, falling back to direct
    /// script injection when the probe does not answer. Recovery runs with
    /// the substring heuristic because key alignment is not guaranteed in
    /// this path.
    pub async fn run_page(&self, driver: &mut dyn PageDriver) -> Result<Artifact, Error> {
        let _slot = self.acquire()?;

        let current = driver.location();
        if !location::is_script_page(&current) {
            return Err(Error::Precondition(format!(
                "open a janitorai.com/scripts/<id> page first (currently on {current})"
            )));
        }

        let raw_url = location::rewrite_script_location(&current);
        info!(%raw_url, "navigating live page to raw document");
        driver.navigate(&raw_url).await?;

        debug!(delay_ms = self.config.settle_delay.as_millis() as u64, "settling");
        tokio::time::sleep(self.config.settle_delay).await;

        // empty text means the page rendered without the container, same as
        // a missing <pre>
        let text = match driver.probe(ProbeRequest::get_pre_content()).await {
            Ok(response) => match response.content {
                Some(text) if !text.is_empty() => text,
                _ => return Err(Error::NoContentContainer),
            },
            Err(err) => {
                warn!(%err, "probe did not respond, falling back to script injection");
                match driver.inject_pre_query().await {
                    Ok(Some(text)) if !text.is_empty() => text,
                    _ => return Err(Error::Extraction),
                }
            }
        };

        debug!(len = text.len(), "page content extracted");
        let document = recover::recover_text(&text, UnwrapMode::KeyOrSubstring)?;
        info!("document recovered");
        Artifact::package(&document, location::page_filename(&raw_url))
    }

    fn acquire(&self) -> Result<BusySlot<'_>, Error> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(Error::Busy);
        }
        Ok(BusySlot { flag: &self.busy })
    }
}

/// Releases the in-flight slot on every exit path, success or failure, so
/// the trigger re-enables.
struct BusySlot<'a> {
    flag: &'a AtomicBool,
}

impl Drop for BusySlot<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::{ProbeError, ProbeResponse};
    use async_trait::async_trait;
    use serde_json::json;

    enum ProbeBehavior {
        Respond(Option<String>),
        Fail,
    }

    struct MockDriver {
        location: Url,
        probe_behavior: ProbeBehavior,
        inject_content: Option<String>,
        navigated: Vec<Url>,
        probe_calls: usize,
        inject_calls: usize,
    }

    impl MockDriver {
        fn new(location: &str, probe_behavior: ProbeBehavior) -> Self {
            Self {
                location: Url::parse(location).unwrap(),
                probe_behavior,
                inject_content: None,
                navigated: vec![],
                probe_calls: 0,
                inject_calls: 0,
            }
        }
    }

    #[async_trait]
    impl PageDriver for MockDriver {
        fn location(&self) -> Url {
            self.location.clone()
        }

        async fn navigate(&mut self, url: &Url) -> Result<(), Error> {
            self.navigated.push(url.clone());
            Ok(())
        }

        async fn probe(&mut self, request: ProbeRequest) -> Result<ProbeResponse, ProbeError> {
            assert_eq!(request.action, crate::page::GET_PRE_CONTENT);
            self.probe_calls += 1;
            match &self.probe_behavior {
                ProbeBehavior::Respond(content) => Ok(ProbeResponse {
                    content: content.clone(),
                }),
                ProbeBehavior::Fail => Err(ProbeError::NoListener),
            }
        }

        async fn inject_pre_query(&mut self) -> Result<Option<String>, ProbeError> {
            self.inject_calls += 1;
            Ok(self.inject_content.clone())
        }
    }

    fn test_pipeline() -> Pipeline {
        Pipeline::new(PipelineConfig {
            settle_delay: Duration::from_millis(0),
            ..PipelineConfig::default()
        })
        .unwrap()
    }

    const PAGE_URL: &str = "https://janitorai.com/scripts/42?id=abc";
    const OUTER: &str = r#"{"script": "{\"a\": 1}"}"#;

    #[tokio::test]
    async fn test_page_path_probe_success() {
        let mut driver = MockDriver::new(
            PAGE_URL,
            ProbeBehavior::Respond(Some(OUTER.to_string())),
        );
        let artifact = test_pipeline().run_page(&mut driver).await.unwrap();

        assert_eq!(artifact.filename, "janitorai_script_abc.json");
        assert_eq!(driver.probe_calls, 1);
        assert_eq!(driver.inject_calls, 0);
        assert_eq!(
            driver.navigated,
            vec![Url::parse("https://janitorai.com/hampter/script/42?id=abc").unwrap()]
        );

        let doc: serde_json::Value = serde_json::from_slice(&artifact.bytes).unwrap();
        assert_eq!(doc, json!({"script": {"a": 1}}));
    }

    #[tokio::test]
    async fn test_page_path_falls_back_to_injection_once() {
        let mut driver = MockDriver::new(PAGE_URL, ProbeBehavior::Fail);
        driver.inject_content = Some(OUTER.to_string());

        let artifact = test_pipeline().run_page(&mut driver).await.unwrap();
        assert_eq!(driver.probe_calls, 1);
        assert_eq!(driver.inject_calls, 1);
        assert_eq!(artifact.filename, "janitorai_script_abc.json");
    }

    #[tokio::test]
    async fn test_page_path_extraction_error_after_both_fail() {
        let mut driver = MockDriver::new(PAGE_URL, ProbeBehavior::Fail);

        let err = test_pipeline().run_page(&mut driver).await.unwrap_err();
        assert!(matches!(err, Error::Extraction));
        assert_eq!(driver.inject_calls, 1);
    }

    #[tokio::test]
    async fn test_page_path_probe_answers_without_container() {
        let mut driver = MockDriver::new(PAGE_URL, ProbeBehavior::Respond(None));

        let err = test_pipeline().run_page(&mut driver).await.unwrap_err();
        // probe answered, so the fallback is not consulted
        assert!(matches!(err, Error::NoContentContainer));
        assert_eq!(driver.inject_calls, 0);
    }

    #[tokio::test]
    async fn test_page_path_precondition() {
        let mut driver = MockDriver::new(
            "https://example.com/scripts/42",
            ProbeBehavior::Respond(Some(OUTER.to_string())),
        );

        let err = test_pipeline().run_page(&mut driver).await.unwrap_err();
        assert!(matches!(err, Error::Precondition(_)));
        assert!(driver.navigated.is_empty());
    }

    #[tokio::test]
    async fn test_page_path_outer_parse_failure_is_fatal() {
        let mut driver = MockDriver::new(
            PAGE_URL,
            ProbeBehavior::Respond(Some("{not valid".to_string())),
        );

        let err = test_pipeline().run_page(&mut driver).await.unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[tokio::test]
    async fn test_page_path_applies_substring_heuristic() {
        // the pre text is a JSON *string* that carries the script field;
        // only the heuristic mode unwraps it
        let quoted = serde_json::to_string(&json!({"script": {"a": 1}})).unwrap();
        let raw = serde_json::to_string(&quoted).unwrap();
        let mut driver = MockDriver::new(PAGE_URL, ProbeBehavior::Respond(Some(raw)));

        let artifact = test_pipeline().run_page(&mut driver).await.unwrap();
        let doc: serde_json::Value = serde_json::from_slice(&artifact.bytes).unwrap();
        assert_eq!(doc, json!({"script": {"a": 1}}));
    }

    #[test]
    fn test_invalid_user_agent_rejected_at_construction() {
        let err = Pipeline::new(PipelineConfig {
            user_agent: "bad\nagent".to_string(),
            ..PipelineConfig::default()
        })
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn test_page_path_empty_probe_content_means_no_container() {
        let mut driver =
            MockDriver::new(PAGE_URL, ProbeBehavior::Respond(Some(String::new())));

        let err = test_pipeline().run_page(&mut driver).await.unwrap_err();
        assert!(matches!(err, Error::NoContentContainer));
        assert_eq!(driver.inject_calls, 0);
    }

    #[tokio::test]
    async fn test_page_path_empty_injection_content_is_extraction_error() {
        let mut driver = MockDriver::new(PAGE_URL, ProbeBehavior::Fail);
        driver.inject_content = Some(String::new());

        let err = test_pipeline().run_page(&mut driver).await.unwrap_err();
        assert!(matches!(err, Error::Extraction));
        assert_eq!(driver.inject_calls, 1);
    }

    #[tokio::test]
    async fn test_second_trigger_rejected_while_busy() {
        let pipeline = Pipeline::new(PipelineConfig {
            settle_delay: Duration::from_millis(100),
            ..PipelineConfig::default()
        })
        .unwrap();
        let mut first = MockDriver::new(
            PAGE_URL,
            ProbeBehavior::Respond(Some(OUTER.to_string())),
        );
        let mut second = MockDriver::new(
            PAGE_URL,
            ProbeBehavior::Respond(Some(OUTER.to_string())),
        );

        // the first operation parks in its settle delay on the first poll,
        // so the joined second trigger sees the busy slot
        let (a, b) = tokio::join!(pipeline.run_page(&mut first), pipeline.run_page(&mut second));
        assert!(a.is_ok());
        assert!(matches!(b.unwrap_err(), Error::Busy));

        // slot released after completion; a fresh trigger runs again
        let mut third = MockDriver::new(
            PAGE_URL,
            ProbeBehavior::Respond(Some(OUTER.to_string())),
        );
        assert!(pipeline.run_page(&mut third).await.is_ok());
    }

    #[tokio::test]
    async fn test_artifact_is_two_space_indented() {
        let mut driver = MockDriver::new(
            PAGE_URL,
            ProbeBehavior::Respond(Some(OUTER.to_string())),
        );
        let artifact = test_pipeline().run_page(&mut driver).await.unwrap();
        let text = String::from_utf8(artifact.bytes).unwrap();
        assert!(text.contains("\n  \"script\""));
        assert!(text.contains("\n    \"a\": 1"));
    }

    mod fetch_path {
        use super::*;
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        #[tokio::test]
        async fn test_fetch_path_end_to_end() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/hampter/script/42"))
                .respond_with(ResponseTemplate::new(200).set_body_string(format!(
                    "<html><body><pre>{OUTER}</pre></body></html>"
                )))
                .mount(&server)
                .await;

            let target = Url::parse(&format!("{}/scripts/42", server.uri())).unwrap();
            let artifact = test_pipeline().run_fetch(&target).await.unwrap();

            assert_eq!(artifact.filename, "janitorai_42.json");
            let doc: serde_json::Value = serde_json::from_slice(&artifact.bytes).unwrap();
            assert_eq!(doc, json!({"script": {"a": 1}}));
        }

        #[tokio::test]
        async fn test_fetch_path_http_error_is_terminal() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .respond_with(ResponseTemplate::new(403))
                .mount(&server)
                .await;

            let target = Url::parse(&format!("{}/scripts/42", server.uri())).unwrap();
            let err = test_pipeline().run_fetch(&target).await.unwrap_err();
            assert!(matches!(err, Error::Http { status: 403 }));
        }
    }
}
