//! Direct-fetch acquisition of the raw script document

use std::time::Duration;

use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::extract;

/// Fetch `url` and return the text of the first `<pre>` element.
///
/// A non-success status is terminal and reported with its code; no retry is
/// attempted. The request carries an explicit timeout so a hung fetch
/// surfaces as [`Error::Timeout`] instead of blocking forever.
pub async fn fetch_pre_text(
    client: &reqwest::Client,
    url: &Url,
    timeout: Duration,
) -> Result<String, Error> {
    debug!(%url, "fetching raw document");
    let response = client
        .get(url.clone())
        .timeout(timeout)
        .send()
        .await
        .map_err(from_reqwest)?;

    let status = response.status();
    if !status.is_success() {
        return Err(Error::Http {
            status: status.as_u16(),
        });
    }

    let html = response.text().await.map_err(from_reqwest)?;
    debug!(len = html.len(), "raw document received");
    extract::pre_text(&html).ok_or(Error::NoContentContainer)
}

fn from_reqwest(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout
    } else {
        Error::Network(e.to_string())
    }
}

/// Blocking variant of [`fetch_pre_text`] using ureq, for callers without
/// an async runtime.
pub fn fetch_pre_text_blocking(agent: &ureq::Agent, url: &Url) -> Result<String, Error> {
    match agent.get(url.as_str()).call() {
        Ok(resp) if resp.status().is_success() => {
            let html = resp
                .into_body()
                .read_to_string()
                .map_err(|e| Error::Network(e.to_string()))?;
            extract::pre_text(&html).ok_or(Error::NoContentContainer)
        }
        Ok(resp) => Err(Error::Http {
            status: resp.status().as_u16(),
        }),
        Err(ureq::Error::StatusCode(status)) => Err(Error::Http { status }),
        Err(e) => Err(Error::Network(e.to_string())),
    }
}

/// Build a blocking agent with the given timeout and user agent.
pub fn blocking_agent(timeout: Duration, user_agent: &str) -> ureq::Agent {
    ureq::Agent::new_with_config(
        ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .user_agent(user_agent)
            .build(),
    )
}
