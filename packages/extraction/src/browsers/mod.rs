//! Browser implementations.
//!
//! # Available Browsers
//!
//! - `HttpBrowser` - Fetches documents over HTTP and queries them with `scraper`
//!   (no JavaScript rendering)
//! - `MockBrowser` - Canned pages for tests, records every navigation

mod http;
mod mock;

pub use http::{HttpBrowser, HttpBrowserLauncher, HttpPage};
pub use mock::{MockBrowser, MockEvent, MockLauncher, MockPage};

use scraper::{Html, Selector};

use crate::error::{BrowserError, BrowserResult};
use crate::traits::browser::Element;

/// Run `selector` against an HTML document and snapshot every match.
pub(crate) fn select_elements(html: &str, selector: &str) -> BrowserResult<Vec<Element>> {
    let parsed = Selector::parse(selector)
        .map_err(|e| BrowserError::InvalidSelector(format!("{selector}: {e}")))?;
    let document = Html::parse_document(html);

    Ok(document
        .select(&parsed)
        .map(|el| Element {
            inner_html: el.inner_html(),
            text: el.text().collect::<String>(),
            attributes: el
                .value()
                .attrs()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        })
        .collect())
}
