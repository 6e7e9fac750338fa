//! Document extractors for various file formats
//!
//! Supports PDF, Markdown, and plain text documents. Extraction is
//! page-oriented: a PDF page that cannot be decoded contributes an empty page
//! instead of failing the whole document.

use crate::data::{Document, Page};
use crate::error::{RagError, Result};
use std::fmt::Display;

/// Separator placed between pages when joining them into one text
pub const PAGE_SEPARATOR: &str = "\n\n";

/// Trait for turning document bytes into per-page text
pub trait DocumentExtractor: Send + Sync {
    /// Extract every page of the document, in physical order
    fn extract_pages(&self, document: &Document) -> Result<Vec<Page>>;

    /// Check if this extractor can handle the given document
    fn can_extract(&self, document: &Document) -> bool;
}

/// PDF extractor backed by lopdf
pub struct PdfExtractor;

impl DocumentExtractor for PdfExtractor {
    fn extract_pages(&self, document: &Document) -> Result<Vec<Page>> {
        let pdf = lopdf::Document::load_mem(&document.bytes).map_err(|e| {
            RagError::extraction(format!("'{}' is not a readable PDF: {}", document.name, e))
        })?;

        let page_numbers: Vec<u32> = pdf.get_pages().keys().copied().collect();
        let pages = collect_pages(
            page_numbers
                .iter()
                .map(|&number| (number, pdf.extract_text(&[number]))),
        );

        let failed = pages.iter().filter(|p| p.failed).count();
        tracing::info!(
            "PDF processed: {} pages ({} unreadable)",
            pages.len(),
            failed
        );
        Ok(pages)
    }

    fn can_extract(&self, document: &Document) -> bool {
        document.extension().as_deref() == Some("pdf") || document.bytes.starts_with(b"%PDF-")
    }
}

/// Plain text and Markdown extractor; the whole file is a single page
pub struct PlainTextExtractor;

impl DocumentExtractor for PlainTextExtractor {
    fn extract_pages(&self, document: &Document) -> Result<Vec<Page>> {
        let text = std::str::from_utf8(&document.bytes).map_err(|e| {
            RagError::extraction(format!("'{}' is not valid UTF-8: {}", document.name, e))
        })?;
        let text = text.trim_start_matches('\u{feff}');

        Ok(vec![Page::new(1, text.to_string())])
    }

    fn can_extract(&self, document: &Document) -> bool {
        matches!(
            document.extension().as_deref(),
            Some("txt") | Some("md") | Some("markdown")
        )
    }
}

/// Multi-format extractor that delegates to specific extractors
pub struct MultiFormatExtractor {
    extractors: Vec<Box<dyn DocumentExtractor>>,
}

impl MultiFormatExtractor {
    /// Create a new multi-format extractor with all supported formats
    pub fn new() -> Self {
        let extractors: Vec<Box<dyn DocumentExtractor>> =
            vec![Box::new(PdfExtractor), Box::new(PlainTextExtractor)];

        Self { extractors }
    }
}

impl DocumentExtractor for MultiFormatExtractor {
    fn extract_pages(&self, document: &Document) -> Result<Vec<Page>> {
        for extractor in &self.extractors {
            if extractor.can_extract(document) {
                return extractor.extract_pages(document);
            }
        }

        Err(RagError::invalid_input(format!(
            "unsupported document type: '{}'",
            document.name
        )))
    }

    fn can_extract(&self, document: &Document) -> bool {
        self.extractors.iter().any(|e| e.can_extract(document))
    }
}

impl Default for MultiFormatExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Turn per-page extraction results into pages, absorbing page-level failures
///
/// Only the page number of a failed page is logged, never its content.
pub fn collect_pages<I, E>(results: I) -> Vec<Page>
where
    I: IntoIterator<Item = (u32, std::result::Result<String, E>)>,
    E: Display,
{
    results
        .into_iter()
        .map(|(number, result)| match result {
            Ok(text) => Page::new(number, text),
            Err(e) => {
                tracing::warn!("Failed to extract page {}: {}", number, e);
                Page::failed(number)
            }
        })
        .collect()
}

/// Join page texts with a blank line, skipping pages that produced no text
///
/// Failed pages leave no trace in the output: no extra separator is emitted
/// for them, unlike joining every page's text including the empty ones.
pub fn join_pages(pages: &[Page]) -> String {
    pages
        .iter()
        .map(|p| p.text.as_str())
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(PAGE_SEPARATOR)
}
