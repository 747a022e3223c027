//! Page-content extraction

use scraper::{Html, Selector};

/// Text content of the first `<pre>` element in `html`, if any.
///
/// The raw document endpoint serves the encoded script inside a single
/// `<pre>`; everything else on the page is noise. Returns `None` when the
/// container is absent.
pub fn pre_text(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("pre").unwrap();
    let element = document.select(&selector).next()?;
    Some(element.text().collect::<String>())
}
