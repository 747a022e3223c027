//! Location rewrite and output filename derivation

use url::Url;

/// Path segment marking the public script page.
const SCRIPTS_SEGMENT: &str = "/scripts/";
/// Replacement segment pointing at the raw-document endpoint.
const RAW_SEGMENT: &str = "/hampter/script/";
/// Host the live-page path expects to be on.
const SCRIPT_HOST: &str = "janitorai.com";
/// Filename prefix for the direct-fetch path.
const FETCH_PREFIX: &str = "janitorai";
/// Filename prefix for the live-page path.
const PAGE_PREFIX: &str = "janitorai_script";

/// Rewrite a script page location to its raw-document sibling.
///
/// Replaces the first literal `/scripts/` in the path with
/// `/hampter/script/`. A location without that segment is returned
/// unchanged; the precondition check upstream rejects it before anything is
/// fetched on the live-page path.
pub fn rewrite_script_location(url: &Url) -> Url {
    let path = url.path();
    let Some(pos) = path.find(SCRIPTS_SEGMENT) else {
        return url.clone();
    };
    let new_path = format!(
        "{}{}{}",
        &path[..pos],
        RAW_SEGMENT,
        &path[pos + SCRIPTS_SEGMENT.len()..]
    );
    let mut rewritten = url.clone();
    rewritten.set_path(&new_path);
    rewritten
}

/// Whether `url` looks like a script page the live-page path can work on.
pub fn is_script_page(url: &Url) -> bool {
    let host_matches = url
        .host_str()
        .is_some_and(|h| h == SCRIPT_HOST || h.ends_with(&format!(".{SCRIPT_HOST}")));
    host_matches && url.path().contains(SCRIPTS_SEGMENT)
}

/// Save filename for the direct-fetch path: `janitorai_<last segment>.json`.
pub fn fetch_filename(url: &Url) -> String {
    format!("{FETCH_PREFIX}_{}.json", last_segment(url))
}

/// Save filename for the live-page path: `janitorai_script_<id>.json`.
///
/// `<id>` comes from the `id` query parameter, falling back to the last
/// path segment.
pub fn page_filename(url: &Url) -> String {
    let id = url
        .query_pairs()
        .find(|(k, _)| k == "id")
        .map(|(_, v)| v.into_owned())
        .unwrap_or_else(|| last_segment(url));
    format!("{PAGE_PREFIX}_{id}.json")
}

fn last_segment(url: &Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|s| !s.is_empty())
        .unwrap_or("script")
        .to_string()
}
