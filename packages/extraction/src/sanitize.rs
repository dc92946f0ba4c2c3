//! Neutralize outbound references in chapter HTML.
//!
//! Packaged books must not fetch anything when opened, so link targets and
//! image sources are emptied. [`SanitizeMode::First`] touches only the first
//! `href` and the first `src` of a fragment, which is how existing books were
//! built; [`SanitizeMode::All`] empties every occurrence.

use lazy_static::lazy_static;
use regex::Regex;

use crate::types::config::SanitizeMode;

lazy_static! {
    static ref HREF_ATTR: Regex = Regex::new(r#"href="[^"]*""#).unwrap();
    static ref SRC_ATTR: Regex = Regex::new(r#"src="[^"]*""#).unwrap();
}

const EMPTY_HREF: &str = r#"href="""#;
const EMPTY_SRC: &str = r#"src="""#;

/// Empty hyperlink targets and image sources in `html`.
pub fn sanitize(html: &str, mode: SanitizeMode) -> String {
    match mode {
        SanitizeMode::First => {
            let without_link = HREF_ATTR.replace(html, EMPTY_HREF);
            SRC_ATTR.replace(&without_link, EMPTY_SRC).into_owned()
        }
        SanitizeMode::All => {
            let without_links = HREF_ATTR.replace_all(html, EMPTY_HREF);
            SRC_ATTR.replace_all(&without_links, EMPTY_SRC).into_owned()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAGMENT: &str =
        r#"<a href="http://evil.example">x</a><img src="http://evil.example/i.png">"#;

    #[test]
    fn test_empties_link_and_image() {
        assert_eq!(
            sanitize(FRAGMENT, SanitizeMode::First),
            r#"<a href="">x</a><img src="">"#
        );
        assert_eq!(
            sanitize(FRAGMENT, SanitizeMode::All),
            r#"<a href="">x</a><img src="">"#
        );
    }

    #[test]
    fn test_first_mode_only_touches_first_occurrence() {
        let html = r#"<a href="/1">a</a><a href="/2">b</a><img src="1.png"><img src="2.png">"#;
        assert_eq!(
            sanitize(html, SanitizeMode::First),
            r#"<a href="">a</a><a href="/2">b</a><img src=""><img src="2.png">"#
        );
    }

    #[test]
    fn test_all_mode_touches_every_occurrence() {
        let html = r#"<a href="/1">a</a><a href="/2">b</a><img src="1.png"><img src="2.png">"#;
        assert_eq!(
            sanitize(html, SanitizeMode::All),
            r#"<a href="">a</a><a href="">b</a><img src=""><img src="">"#
        );
    }

    #[test]
    fn test_plain_text_untouched() {
        assert_eq!(sanitize("<p>no links</p>", SanitizeMode::All), "<p>no links</p>");
    }
}
