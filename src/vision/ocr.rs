//! Metadata text extraction
//!
//! Reads the export footer ("Made with <device> - 2024-12-17 12:24") and
//! turns it into [`Metadata`]. Character recognition itself is delegated to
//! a [`TextRecognizer`]; this module only crops, binarizes and parses.

use std::sync::OnceLock;

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveTime};
use image::GrayImage;
use regex::Regex;
use tracing::debug;

use crate::config::MetadataConfig;
use crate::shared::Metadata;

use super::ocr_preprocess::{crop_footer, crop_header, prepare_for_ocr};

/// OCR engine abstraction (allows mocking for tests)
pub trait TextRecognizer: Send + Sync {
    /// Recognize the text in a binarized strip (dark text on white)
    fn recognize(&self, image: &GrayImage) -> Result<String>;
}

/// Best-effort metadata source for a raw chart image.
///
/// Failures are reported, never fatal: the caller substitutes empty
/// metadata.
pub trait MetadataExtractor: Send + Sync {
    fn extract(&self, raw: &[u8]) -> Result<Metadata>;
}

/// Extractor that never finds anything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMetadata;

impl MetadataExtractor for NoMetadata {
    fn extract(&self, _raw: &[u8]) -> Result<Metadata> {
        Ok(Metadata::default())
    }
}

/// Reads metadata from the footer strip, falling back to the header strip
pub struct FooterMetadataExtractor<R> {
    recognizer: R,
    config: MetadataConfig,
}

impl<R: TextRecognizer> FooterMetadataExtractor<R> {
    /// Create an extractor with default strip sizes
    pub fn new(recognizer: R) -> Self {
        Self::with_config(recognizer, MetadataConfig::default())
    }

    /// Create an extractor with custom strip sizes
    pub fn with_config(recognizer: R, config: MetadataConfig) -> Self {
        Self { recognizer, config }
    }
}

impl<R: TextRecognizer> MetadataExtractor for FooterMetadataExtractor<R> {
    fn extract(&self, raw: &[u8]) -> Result<Metadata> {
        let image = image::load_from_memory(raw)
            .context("Failed to decode image for metadata")?
            .to_rgb8();

        let footer = prepare_for_ocr(&crop_footer(&image, self.config.footer_fraction));
        let footer_text = self
            .recognizer
            .recognize(&footer)
            .context("Footer text recognition failed")?;
        debug!("Footer text: {:?}", footer_text);

        if let Some(metadata) = parse_footer(&footer_text) {
            return Ok(metadata);
        }

        let header = prepare_for_ocr(&crop_header(&image, self.config.header_fraction));
        let header_text = self
            .recognizer
            .recognize(&header)
            .context("Header text recognition failed")?;
        debug!("Header text: {:?}", header_text);

        Ok(parse_footer(&header_text).unwrap_or_default())
    }
}

fn footer_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(r"(?i)Made with\s+(.+?)\s*[-–]\s*(\d{4}[-/]\d{2}[-/]\d{2})\s+(\d{1,2}:\d{2})").ok()
        })
        .as_ref()
}

fn date_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"\d{4}[-/]\d{2}[-/]\d{2}").ok())
        .as_ref()
}

/// Normalize `YYYY/MM/DD` to `YYYY-MM-DD`; `None` if not a calendar date
fn normalize_date(raw: &str) -> Option<String> {
    let normalized = raw.replace('/', "-");
    NaiveDate::parse_from_str(&normalized, "%Y-%m-%d")
        .ok()
        .map(|date| date.format("%Y-%m-%d").to_string())
}

/// Keep `H:MM`/`HH:MM` only if it is a real clock time, as `HH:MM`
fn normalize_time(raw: &str) -> Option<String> {
    NaiveTime::parse_from_str(raw, "%H:%M")
        .ok()
        .map(|time| time.format("%H:%M").to_string())
}

/// Parse recognized footer text.
///
/// The full form yields date, time and device (the device doubles as the
/// location). Otherwise the first valid date anywhere in the text is used
/// on its own. Returns `None` when no date can be found.
pub fn parse_footer(text: &str) -> Option<Metadata> {
    if let Some(captures) = footer_pattern().and_then(|p| p.captures(text)) {
        if let Some(date) = normalize_date(&captures[2]) {
            let device = captures[1].trim().to_string();
            return Some(Metadata {
                date: Some(date),
                time: normalize_time(&captures[3]),
                location: Some(device.clone()),
                device: Some(device),
            });
        }
    }

    date_pattern()?
        .find_iter(text)
        .find_map(|m| normalize_date(m.as_str()))
        .map(|date| Metadata {
            date: Some(date),
            ..Metadata::default()
        })
}
