//! Nested-JSON script document recovery
//!
//! Recovers structured script documents from pages that embed them as
//! multiply-JSON-encoded strings inside an HTML `<pre>` element:
//! - control-character sanitization before every parse attempt
//! - recursive re-parsing of nested `script` payloads, to arbitrary depth
//! - two acquisition paths: direct network fetch of the raw-document
//!   endpoint, or a live page navigated in place with an in-page probe and
//!   a script-injection fallback

pub mod error;
pub mod extract;
pub mod fetch;
pub mod location;
pub mod page;
pub mod pipeline;
pub mod recover;
pub mod sanitize;
pub mod trigger;

pub use error::Error;
pub use page::{PageDriver, ProbeRequest, ProbeResponse};
pub use pipeline::{Artifact, Pipeline, PipelineConfig};
pub use recover::{recover, recover_text, UnwrapMode};
pub use sanitize::sanitize;
pub use trigger::{TriggerRequest, TriggerResponse};
