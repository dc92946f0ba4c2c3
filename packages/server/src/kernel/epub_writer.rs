//! EPUB packaging.
//!
//! [`BaseEpubWriter`] is the seam between the job runner and the file
//! format. [`ZipEpubWriter`] produces an EPUB 3 container with an EPUB 2
//! NCX for older readers.

use std::io::Write;
use std::path::Path;

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// One chapter of a book, body markup already sanitized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookChapter {
    pub title: String,
    pub html: String,
}

/// Everything needed to package a book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Book {
    pub title: String,
    /// Stable identifier written into the package metadata (the job key).
    pub identifier: String,
    pub chapters: Vec<BookChapter>,
}

#[derive(Debug, Error)]
pub enum PackagingError {
    #[error("I/O error while writing EPUB: {0}")]
    Io(#[from] std::io::Error),

    #[error("zip error while writing EPUB: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("EPUB writer task failed: {0}")]
    Join(String),
}

#[async_trait]
pub trait BaseEpubWriter: Send + Sync {
    /// Write `book` to `path`. The file at `path` either holds a complete
    /// EPUB afterwards or is left untouched.
    async fn write(&self, book: &Book, path: &Path) -> Result<(), PackagingError>;
}

/// EPUB writer backed by the `zip` crate.
#[derive(Debug, Clone, Default)]
pub struct ZipEpubWriter {
    language: Option<String>,
}

impl ZipEpubWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }
}

#[async_trait]
impl BaseEpubWriter for ZipEpubWriter {
    async fn write(&self, book: &Book, path: &Path) -> Result<(), PackagingError> {
        let book = book.clone();
        let path = path.to_path_buf();
        let language = self.language.clone().unwrap_or_else(|| "nl".to_string());

        tokio::task::spawn_blocking(move || write_epub(&book, &path, &language))
            .await
            .map_err(|e| PackagingError::Join(e.to_string()))?
    }
}

fn write_epub(book: &Book, path: &Path, language: &str) -> Result<(), PackagingError> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)?;

    // Unique per write, so two jobs for one key never share a file.
    // Dropped (and deleted) on any error before the rename.
    let partial = tempfile::Builder::new()
        .prefix(".")
        .suffix(".partial")
        .tempfile_in(dir)?;
    write_archive(book, partial.as_file().try_clone()?, language)?;
    partial.persist(path).map_err(|e| e.error)?;
    Ok(())
}

fn write_archive(book: &Book, file: std::fs::File, language: &str) -> Result<(), PackagingError> {
    let mut zip = ZipWriter::new(file);

    // mimetype must be the first entry and stored uncompressed
    let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    zip.start_file("mimetype", stored)?;
    zip.write_all(b"application/epub+zip")?;

    zip.start_file("META-INF/container.xml", deflated)?;
    zip.write_all(CONTAINER_XML.as_bytes())?;

    zip.start_file("OEBPS/content.opf", deflated)?;
    zip.write_all(content_opf(book, language).as_bytes())?;

    zip.start_file("OEBPS/toc.ncx", deflated)?;
    zip.write_all(toc_ncx(book).as_bytes())?;

    zip.start_file("OEBPS/nav.xhtml", deflated)?;
    zip.write_all(nav_xhtml(book, language).as_bytes())?;

    for (index, chapter) in book.chapters.iter().enumerate() {
        zip.start_file(format!("OEBPS/{}", chapter_file(index)), deflated)?;
        zip.write_all(chapter_xhtml(chapter, language).as_bytes())?;
    }

    let file = zip.finish()?;
    file.sync_all()?;
    Ok(())
}

const CONTAINER_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>
"#;

fn chapter_file(index: usize) -> String {
    format!("chapter-{:03}.xhtml", index + 1)
}

fn content_opf(book: &Book, language: &str) -> String {
    let modified = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
    let mut manifest = String::new();
    let mut spine = String::new();
    for index in 0..book.chapters.len() {
        let id = format!("chapter-{:03}", index + 1);
        manifest.push_str(&format!(
            "    <item id=\"{id}\" href=\"{}\" media-type=\"application/xhtml+xml\"/>\n",
            chapter_file(index)
        ));
        spine.push_str(&format!("    <itemref idref=\"{id}\"/>\n"));
    }

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="book-id">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:identifier id="book-id">urn:serial-binder:{identifier}</dc:identifier>
    <dc:title>{title}</dc:title>
    <dc:language>{language}</dc:language>
    <meta property="dcterms:modified">{modified}</meta>
  </metadata>
  <manifest>
    <item id="nav" href="nav.xhtml" media-type="application/xhtml+xml" properties="nav"/>
    <item id="ncx" href="toc.ncx" media-type="application/x-dtbncx+xml"/>
{manifest}  </manifest>
  <spine toc="ncx">
{spine}  </spine>
</package>
"#,
        identifier = escape_xml(&book.identifier),
        title = escape_xml(&book.title),
        language = escape_xml(language),
    )
}

fn toc_ncx(book: &Book) -> String {
    let mut points = String::new();
    for (index, chapter) in book.chapters.iter().enumerate() {
        points.push_str(&format!(
            r#"    <navPoint id="nav-{n}" playOrder="{n}">
      <navLabel><text>{title}</text></navLabel>
      <content src="{file}"/>
    </navPoint>
"#,
            n = index + 1,
            title = escape_xml(&chapter.title),
            file = chapter_file(index),
        ));
    }

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <head>
    <meta name="dtb:uid" content="urn:serial-binder:{identifier}"/>
  </head>
  <docTitle><text>{title}</text></docTitle>
  <navMap>
{points}  </navMap>
</ncx>
"#,
        identifier = escape_xml(&book.identifier),
        title = escape_xml(&book.title),
    )
}

fn nav_xhtml(book: &Book, language: &str) -> String {
    let items: String = book
        .chapters
        .iter()
        .enumerate()
        .map(|(index, chapter)| {
            format!(
                "      <li><a href=\"{}\">{}</a></li>\n",
                chapter_file(index),
                escape_xml(&chapter.title)
            )
        })
        .collect();

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops" xml:lang="{language}">
<head><title>{title}</title></head>
<body>
  <nav epub:type="toc">
    <h1>{title}</h1>
    <ol>
{items}    </ol>
  </nav>
</body>
</html>
"#,
        language = escape_xml(language),
        title = escape_xml(&book.title),
    )
}

fn chapter_xhtml(chapter: &BookChapter, language: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" xml:lang="{language}">
<head><title>{title}</title></head>
<body>
  <h1>{title}</h1>
  {body}
</body>
</html>
"#,
        language = escape_xml(language),
        title = escape_xml(&chapter.title),
        body = to_xhtml(&chapter.html),
    )
}

lazy_static! {
    static ref VOID_ELEMENT: Regex =
        Regex::new(r"(?i)<(br|hr|img|input|meta|link|area|base|col|embed|source|track|wbr)\b([^>]*?)/?>")
            .unwrap();
    static ref NAMED_ENTITY: Regex = Regex::new(r"&(nbsp|hellip|mdash|ndash|lsquo|rsquo|ldquo|rdquo);").unwrap();
}

/// Close HTML void elements and replace the named entities XHTML does not
/// define, so that scraped markup parses as XML.
fn to_xhtml(html: &str) -> String {
    let closed = VOID_ELEMENT.replace_all(html, "<$1$2/>");
    NAMED_ENTITY
        .replace_all(&closed, |caps: &regex::Captures| {
            match &caps[1] {
                "nbsp" => "&#160;",
                "hellip" => "&#8230;",
                "mdash" => "&#8212;",
                "ndash" => "&#8211;",
                "lsquo" => "&#8216;",
                "rsquo" => "&#8217;",
                "ldquo" => "&#8220;",
                _ => "&#8221;",
            }
            .to_string()
        })
        .into_owned()
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn sample_book() -> Book {
        Book {
            title: "Tom & Jerry".into(),
            identifier: "5d41402abc4b2a76b9719d911017c592".into(),
            chapters: vec![
                BookChapter {
                    title: "Deel 1".into(),
                    html: "<p>Een<br>twee&nbsp;drie</p>".into(),
                },
                BookChapter {
                    title: "Deel 2".into(),
                    html: "<p>Vier</p>".into(),
                },
            ],
        }
    }

    fn read_entry(archive: &mut zip::ZipArchive<std::fs::File>, name: &str) -> String {
        let mut entry = archive.by_name(name).unwrap();
        let mut content = String::new();
        entry.read_to_string(&mut content).unwrap();
        content
    }

    #[tokio::test]
    async fn test_writes_epub_container() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.epub");

        ZipEpubWriter::new().write(&sample_book(), &path).await.unwrap();

        let mut archive = zip::ZipArchive::new(std::fs::File::open(&path).unwrap()).unwrap();
        {
            let first = archive.by_index(0).unwrap();
            assert_eq!(first.name(), "mimetype");
            assert_eq!(first.compression(), CompressionMethod::Stored);
        }
        assert_eq!(read_entry(&mut archive, "mimetype"), "application/epub+zip");
        assert!(read_entry(&mut archive, "META-INF/container.xml").contains("OEBPS/content.opf"));

        let opf = read_entry(&mut archive, "OEBPS/content.opf");
        assert!(opf.contains("<dc:title>Tom &amp; Jerry</dc:title>"));
        assert!(opf.contains("chapter-001.xhtml"));
        assert!(opf.contains("chapter-002.xhtml"));

        let chapter = read_entry(&mut archive, "OEBPS/chapter-001.xhtml");
        assert!(chapter.contains("<h1>Deel 1</h1>"));
        assert!(chapter.contains("<br/>"));
        assert!(chapter.contains("&#160;"));

        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_writes_to_one_path_leave_a_whole_book() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.epub");

        let writes: Vec<_> = ["First", "Second", "Third"]
            .into_iter()
            .map(|title| {
                let path = path.clone();
                let mut book = sample_book();
                book.title = title.to_string();
                tokio::spawn(async move { ZipEpubWriter::new().write(&book, &path).await })
            })
            .collect();
        for write in writes {
            write.await.unwrap().unwrap();
        }

        let mut archive = zip::ZipArchive::new(std::fs::File::open(&path).unwrap()).unwrap();
        let opf = read_entry(&mut archive, "OEBPS/content.opf");
        assert!(["First", "Second", "Third"]
            .iter()
            .any(|title| opf.contains(&format!("<dc:title>{title}</dc:title>"))));
        assert_eq!(read_entry(&mut archive, "OEBPS/chapter-002.xhtml").matches("Vier").count(), 1);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_spine_follows_chapter_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.epub");

        ZipEpubWriter::new().write(&sample_book(), &path).await.unwrap();

        let mut archive = zip::ZipArchive::new(std::fs::File::open(&path).unwrap()).unwrap();
        let nav = read_entry(&mut archive, "OEBPS/nav.xhtml");
        let first = nav.find("Deel 1").unwrap();
        let second = nav.find("Deel 2").unwrap();
        assert!(first < second);
    }

    #[test]
    fn test_to_xhtml_closes_void_elements() {
        assert_eq!(to_xhtml("a<br>b<hr class=\"x\">"), "a<br/>b<hr class=\"x\"/>");
        assert_eq!(to_xhtml("<img src=\"a.png\" />"), "<img src=\"a.png\" />");
        assert_eq!(to_xhtml("<p>x</p>"), "<p>x</p>");
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml("<a & 'b'>"), "&lt;a &amp; &apos;b&apos;&gt;");
    }
}
