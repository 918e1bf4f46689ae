//! Region text extraction.
//!
//! The region is re-serialized the way a browser's `innerHTML` would be
//! (minus media and script subtrees), then flattened to plain text with a
//! fixed set of rewrites: paragraphs become blank-line separated blocks,
//! `<br>` becomes a newline, every other tag disappears and a small
//! whitelist of entities is decoded.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};

use crate::error::{Result, RolysError};

/// Subtrees dropped before any text is read.
const UNWANTED_ELEMENTS: &[&str] = &["script", "style", "img", "video", "audio", "iframe", "svg"];

/// Elements serialized without a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

static PARAGRAPH_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"<p\b[^>]*>").unwrap());
static LINE_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"<br\b[^>]*>").unwrap());
static ANY_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());
static ANY_ENTITY: Lazy<Regex> = Lazy::new(|| Regex::new(r"&#?[a-zA-Z0-9]+;").unwrap());
static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Decoded in this order, before the blanket entity strip.
const ENTITY_REPLACEMENTS: &[(&str, &str)] = &[
    ("&nbsp;", " "),
    ("&amp;", "&"),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&#39;", "'"),
    ("&awp;", ""),
];

/// Locate the content region in a parsed document.
pub fn find_region<'a>(document: &'a Html, selector: &str) -> Result<ElementRef<'a>> {
    let parsed = Selector::parse(selector)
        .map_err(|e| RolysError::Parse(format!("Invalid region selector '{}': {}", selector, e)))?;

    document
        .select(&parsed)
        .next()
        .ok_or_else(|| RolysError::RegionNotFound(selector.to_string()))
}

/// Inner HTML of `region` with the unwanted subtrees removed.
pub fn region_markup(region: ElementRef<'_>) -> String {
    let mut out = String::new();
    write_children(region, &mut out);
    out
}

fn write_children(parent: ElementRef<'_>, out: &mut String) {
    for child in parent.children() {
        match child.value() {
            Node::Text(text) => escape_text(text, out),
            Node::Element(element) => {
                let name = element.name();
                if UNWANTED_ELEMENTS.contains(&name) {
                    continue;
                }

                out.push('<');
                out.push_str(name);
                for (key, value) in element.attrs() {
                    out.push(' ');
                    out.push_str(key);
                    out.push_str("=\"");
                    escape_attribute(value, out);
                    out.push('"');
                }
                out.push('>');

                if !VOID_ELEMENTS.contains(&name) {
                    if let Some(child) = ElementRef::wrap(child) {
                        write_children(child, out);
                    }
                    out.push_str("</");
                    out.push_str(name);
                    out.push('>');
                }
            }
            _ => {}
        }
    }
}

fn escape_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
}

fn escape_attribute(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
}

/// Flatten region markup to paragraph-separated plain text.
pub fn markup_to_text(markup: &str) -> String {
    let flattened = PARAGRAPH_OPEN.replace_all(markup, "\n\n");
    let flattened = LINE_BREAK.replace_all(&flattened, "\n");
    let flattened = ANY_TAG.replace_all(&flattened, "");

    let mut text = flattened.into_owned();
    for (entity, replacement) in ENTITY_REPLACEMENTS {
        text = text.replace(entity, replacement);
    }
    let text = ANY_ENTITY.replace_all(&text, "");

    text.split('\n')
        .map(|line| WHITESPACE_RUN.replace_all(line, " ").trim().to_string())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
        .trim()
        .to_string()
}

/// Extract cleaned text from the region of a full page.
///
/// Fails with `RegionNotFound` when the selector misses and with
/// `EmptyExtraction` when nothing survives the cleanup.
pub fn extract_page_text(page_html: &str, selector: &str) -> Result<String> {
    let document = Html::parse_document(page_html);
    let region = find_region(&document, selector)?;
    let text = markup_to_text(&region_markup(region));

    if text.is_empty() {
        return Err(RolysError::EmptyExtraction);
    }
    Ok(text)
}

/// `page-text-<unix millis>.txt`
pub fn text_filename(now_millis: u64) -> String {
    format!("page-text-{}.txt", now_millis)
}
