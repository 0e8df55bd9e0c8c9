//! Per-format document extraction. Each extractor turns one file into zero or
//! more `{title, body, filetype}` records; the index build never looks at
//! which extractor produced a record.

use anyhow::{Context, Result};
use quick_xml::events::Event;
use scraper::{Html, Selector};
use serde::Deserialize;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use zip::ZipArchive;

#[derive(Debug, Clone, PartialEq)]
pub struct DocumentRecord {
    pub title: String,
    pub body: String,
    pub filetype: &'static str,
    pub url: Option<String>,
}

pub trait DocumentExtractor {
    /// Collection name the records belong to.
    fn filetype(&self) -> &'static str;
    fn extract(&self, path: &Path) -> Result<Vec<DocumentRecord>>;
}

fn file_stem(path: &Path) -> String {
    path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default()
}

pub struct TextExtractor;

impl DocumentExtractor for TextExtractor {
    fn filetype(&self) -> &'static str { "txt" }

    fn extract(&self, path: &Path) -> Result<Vec<DocumentRecord>> {
        let body = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        Ok(vec![DocumentRecord { title: file_stem(path), body, filetype: self.filetype(), url: None }])
    }
}

#[derive(Debug, Deserialize)]
struct JsonDoc {
    #[serde(default)]
    title: String,
    #[serde(default)]
    body: String,
    url: Option<String>,
}

/// `.json` holding one object or an array of objects, or `.jsonl` with one
/// object per line.
pub struct JsonExtractor;

impl JsonExtractor {
    fn record(&self, path: &Path, doc: JsonDoc) -> DocumentRecord {
        let name = path.file_name().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
        let title = if doc.title.is_empty() { name } else { format!("{name} {}", doc.title) };
        DocumentRecord { title, body: doc.body, filetype: self.filetype(), url: doc.url }
    }
}

impl DocumentExtractor for JsonExtractor {
    fn filetype(&self) -> &'static str { "json" }

    fn extract(&self, path: &Path) -> Result<Vec<DocumentRecord>> {
        let reader = BufReader::new(File::open(path)?);
        let mut docs = Vec::new();
        if path.extension().and_then(|s| s.to_str()) == Some("jsonl") {
            for line in reader.lines() {
                let line = line?;
                if line.trim().is_empty() { continue; }
                docs.push(serde_json::from_str::<JsonDoc>(&line)?);
            }
        } else {
            let json: serde_json::Value = serde_json::from_reader(reader)
                .with_context(|| format!("parsing {}", path.display()))?;
            match json {
                serde_json::Value::Array(arr) => {
                    for v in arr {
                        docs.push(serde_json::from_value(v)?);
                    }
                }
                serde_json::Value::Object(_) => docs.push(serde_json::from_value(json)?),
                _ => {}
            }
        }
        Ok(docs.into_iter().map(|d| self.record(path, d)).collect())
    }
}

/// XML and HTML: `<title>` if present, otherwise the file name; body is all
/// text content.
pub struct MarkupExtractor;

impl DocumentExtractor for MarkupExtractor {
    fn filetype(&self) -> &'static str { "xml" }

    fn extract(&self, path: &Path) -> Result<Vec<DocumentRecord>> {
        let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let doc = Html::parse_document(&text);
        let sel_title = Selector::parse("title").expect("valid selector");
        let sel_body = Selector::parse("body").expect("valid selector");
        let title = doc
            .select(&sel_title)
            .next()
            .map(|n| n.text().collect::<String>().trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| file_stem(path));
        let body = doc
            .select(&sel_body)
            .next()
            .map(|n| n.text().collect::<Vec<_>>().join(" "))
            .unwrap_or_default();
        Ok(vec![DocumentRecord { title, body, filetype: self.filetype(), url: None }])
    }
}

/// Text of every page, in page order. The title is the file name.
pub struct PdfExtractor;

impl DocumentExtractor for PdfExtractor {
    fn filetype(&self) -> &'static str { "pdf" }

    fn extract(&self, path: &Path) -> Result<Vec<DocumentRecord>> {
        let body = pdf_extract::extract_text(path).with_context(|| format!("extracting {}", path.display()))?;
        Ok(vec![DocumentRecord { title: file_stem(path), body, filetype: self.filetype(), url: None }])
    }
}

/// Word documents: the `w:t` runs of `word/document.xml`, paragraphs joined
/// with a space.
pub struct DocxExtractor;

impl DocxExtractor {
    fn paragraphs(xml: &str) -> Result<String> {
        let mut reader = quick_xml::Reader::from_str(xml);
        let mut body = String::new();
        let mut in_text = false;
        loop {
            match reader.read_event()? {
                Event::Start(e) if e.name().as_ref() == b"w:t" => in_text = true,
                Event::End(e) if e.name().as_ref() == b"w:t" => in_text = false,
                Event::End(e) if e.name().as_ref() == b"w:p" => body.push(' '),
                Event::Text(t) if in_text => body.push_str(&t.unescape()?),
                Event::Eof => break,
                _ => {}
            }
        }
        Ok(body.trim_end().to_string())
    }
}

impl DocumentExtractor for DocxExtractor {
    fn filetype(&self) -> &'static str { "docx" }

    fn extract(&self, path: &Path) -> Result<Vec<DocumentRecord>> {
        let mut archive = ZipArchive::new(File::open(path)?).with_context(|| format!("opening {}", path.display()))?;
        let mut xml = String::new();
        archive
            .by_name("word/document.xml")
            .with_context(|| format!("{} has no word/document.xml", path.display()))?
            .read_to_string(&mut xml)?;
        let body = Self::paragraphs(&xml)?;
        Ok(vec![DocumentRecord { title: file_stem(path), body, filetype: self.filetype(), url: None }])
    }
}

/// Pick the extractor for `path` by extension. `None` for unsupported files.
pub fn extractor_for(path: &Path) -> Option<Box<dyn DocumentExtractor>> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "txt" => Some(Box::new(TextExtractor)),
        "json" | "jsonl" => Some(Box::new(JsonExtractor)),
        "xml" | "html" | "htm" => Some(Box::new(MarkupExtractor)),
        "pdf" => Some(Box::new(PdfExtractor)),
        "docx" => Some(Box::new(DocxExtractor)),
        _ => None,
    }
}
