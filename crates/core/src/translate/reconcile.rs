//! Validation of model replies and mapping translated text back onto timing.

use super::IndexedLine;
use crate::error::{Result, TranslateError};
use crate::srt::SubtitleRecord;
use std::collections::HashMap;
use tracing::debug;

/// Remove code fences and any prose before the first JSON token.
pub fn clean_json_text(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```") {
        // Language tag such as `json`.
        text = rest.trim_start_matches(|c: char| c.is_ascii_alphabetic());
    }
    text = text.trim_end();
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }
    match text.find(['[', '{']) {
        Some(pos) => text[pos..].trim(),
        None => text.trim(),
    }
}

/// Parse `raw` and rebuild `batch` with the translated text.
///
/// The reply must hold exactly as many entries as `batch`. Entries whose
/// index is not in `batch` are dropped without failing the batch, and the
/// output follows the order of the reply rather than the order of `batch`.
pub fn reconcile(raw: &str, batch: &[SubtitleRecord]) -> Result<Vec<SubtitleRecord>> {
    let cleaned = clean_json_text(raw);
    if cleaned.is_empty() {
        return Err(TranslateError::EmptyResponse);
    }
    let translated: Vec<IndexedLine> =
        serde_json::from_str(cleaned).map_err(TranslateError::MalformedResponse)?;
    if translated.len() != batch.len() {
        return Err(TranslateError::BatchSizeMismatch {
            expected: batch.len(),
            actual: translated.len(),
        });
    }

    let by_index: HashMap<u32, &SubtitleRecord> = batch.iter().map(|r| (r.index, r)).collect();
    let mut out = Vec::with_capacity(translated.len());
    for line in translated {
        let Some(orig) = by_index.get(&line.index) else {
            debug!("dropping unknown index {} from reply", line.index);
            continue;
        };
        out.push(SubtitleRecord {
            index: orig.index,
            start_ms: orig.start_ms,
            end_ms: orig.end_ms,
            text: line.text,
        });
    }
    Ok(out)
}
