//! HTML fixtures served by the mock browser.

#![allow(dead_code)]

use extraction::ChapterRef;
use url::Url;

pub const LISTING_URL: &str = "https://serial.test/series/my-series";

/// A chapter page as the source site renders it.
pub fn chapter_page(title: &str, published: &str, body: &str) -> String {
    format!(
        r#"<html><head><title>{title} | Serial Site</title>
        <meta property="article:published_time" content="{published}"></head>
        <body><div id="HetVerhaal">{body}</div></body></html>"#
    )
}

pub fn chapter_url(n: usize) -> String {
    format!("https://serial.test/verhaal/{n}")
}

/// Reference to chapter `n`, titled "My Series - n".
pub fn chapter_ref(n: usize) -> ChapterRef {
    ChapterRef::new(
        Url::parse(&chapter_url(n)).unwrap(),
        format!("My Series - {n}"),
    )
}

/// One listing row: title column with link, category, short date.
pub fn listing_row(n: usize, date: &str) -> String {
    format!(
        r#"<div class="Overzicht"><div><a href="/verhaal/{n}">My Series - {n}</a></div><div>Drama</div><div>{date}</div></div>"#
    )
}

pub fn listing_page(rows: &[String]) -> String {
    format!(
        r#"<html><body><div class="tab nobm">{}</div></body></html>"#,
        rows.join("")
    )
}
