//! Translation orchestration utilities.
//! This module wires subtitle batching, model calls, reply validation and output writing.

use crate::config::Config;
use crate::error::{Result, TranslateError};
use crate::srt::{self, SubtitleRecord};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, info, trace, warn};

pub mod batch;
pub mod openai;
pub mod prompt;
pub mod reconcile;
pub mod retry;

pub use batch::chunk_subtitles;
pub use prompt::AUTO_DETECT;
pub use retry::{BatchOutcome, RetryPolicy};

/// Represents a single line paired with its SRT index.
/// This is the only part of a record the model ever sees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedLine {
    /// SRT index associated with the line.
    pub index: u32,
    /// Text content of the line.
    pub text: String,
}

/// One remote request: instructions plus the `{index, text}` payload.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchRequest {
    pub system_prompt: String,
    pub lines: Vec<IndexedLine>,
}

impl BatchRequest {
    /// Build the request for `batch`, withholding timing.
    pub fn new(batch: &[SubtitleRecord], source_language: &str, target_language: &str) -> Self {
        Self {
            system_prompt: prompt::system_prompt(source_language, target_language),
            lines: batch
                .iter()
                .map(|r| IndexedLine {
                    index: r.index,
                    text: r.text.clone(),
                })
                .collect(),
        }
    }

    /// The user message, a compact JSON array of lines.
    pub fn payload(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.lines)
    }
}

/// Remote completion capability: send one batch, get the raw reply text.
#[async_trait]
pub trait Translator: Send + Sync {
    /// Translate `request` and return the model's unvalidated output.
    async fn translate_batch(&self, request: &BatchRequest) -> anyhow::Result<String>;
}

/// Per-job settings chosen by the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct JobOptions {
    /// Declared source language, or [`AUTO_DETECT`].
    pub source_language: String,
    pub target_language: String,
    pub batch_size: usize,
}

impl JobOptions {
    /// Options translating to `target_language` with auto-detected source.
    pub fn new(target_language: impl Into<String>) -> Self {
        Self {
            source_language: AUTO_DETECT.to_string(),
            target_language: target_language.into(),
            batch_size: crate::config::DEFAULT_BATCH_SIZE,
        }
    }
}

/// Batch translator: permit-gated remote calls, reply reconciliation and retries.
pub struct SubtitleTranslator<T> {
    translator: T,
    permits: Arc<Semaphore>,
    policy: RetryPolicy,
    timeout: Duration,
    debug: bool,
}

impl<T: Translator> SubtitleTranslator<T> {
    /// Wrap `translator` using the concurrency, timeout and retry settings of `config`.
    pub fn new(translator: T, config: &Config) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            translator,
            permits: Arc::new(Semaphore::new(config.max_concurrent_calls)),
            policy: RetryPolicy::from(config),
            timeout: config.request_timeout,
            debug: config.debug,
        })
    }

    /// Perform one remote call while holding a permit.
    /// The permit is dropped on every exit path, including timeouts.
    async fn call_remote(&self, request: &BatchRequest) -> Result<String> {
        let _permit = self.permits.acquire().await.map_err(anyhow::Error::from)?;
        match tokio::time::timeout(self.timeout, self.translator.translate_batch(request)).await {
            Ok(reply) => Ok(reply?),
            Err(_) => Err(TranslateError::Timeout(self.timeout)),
        }
    }

    /// Run a single translate-and-validate attempt for `batch`.
    pub async fn translate_batch_once(
        &self,
        batch: &[SubtitleRecord],
        source_language: &str,
        target_language: &str,
    ) -> Result<Vec<SubtitleRecord>> {
        let request = BatchRequest::new(batch, source_language, target_language);
        let first = batch.first().map_or(0, |r| r.index);
        if self.debug {
            debug!(
                "sending batch starting at index {first}:\n{}",
                serde_json::to_string_pretty(&request.lines).unwrap_or_default()
            );
        }
        let raw = self.call_remote(&request).await?;
        if self.debug {
            debug!("raw model response for batch starting at {first}:\n{raw}");
        }
        reconcile::reconcile(&raw, batch)
    }

    /// Translate `batch`, retrying per the policy and falling back to the
    /// untranslated input once attempts run out.
    pub async fn translate_batch(
        &self,
        batch: &[SubtitleRecord],
        source_language: &str,
        target_language: &str,
    ) -> BatchOutcome<Vec<SubtitleRecord>> {
        if batch.is_empty() {
            return BatchOutcome::Translated(Vec::new());
        }
        let first = batch[0].index;
        retry::run_with_fallback(
            &self.policy,
            first,
            move |_| self.translate_batch_once(batch, source_language, target_language),
            || batch.to_vec(),
        )
        .await
    }

    /// Translate every record, one batch at a time, in input order.
    pub async fn translate_all(
        &self,
        records: &[SubtitleRecord],
        job: &JobOptions,
    ) -> Result<Vec<SubtitleRecord>> {
        trace!(
            "translate_all records={} batch_size={}",
            records.len(),
            job.batch_size
        );
        let batches = chunk_subtitles(records, job.batch_size)?;
        let mut translated = Vec::with_capacity(records.len());
        let mut done = 0;
        let mut fallbacks = 0;
        let mut last_ms: Option<u128> = None;
        for batch in batches {
            let begin = Instant::now();
            let outcome = self
                .translate_batch(batch, &job.source_language, &job.target_language)
                .await;
            let elapsed = begin.elapsed().as_millis();
            if outcome.is_fallback() {
                fallbacks += 1;
            }
            translated.extend(outcome.into_inner());

            let start = done;
            done += batch.len();
            info!("translated lines {}-{} in {} ms", start + 1, done, elapsed);
            let remaining = records.len() - done;
            if let Some(prev) = last_ms.filter(|_| remaining > 0) {
                let estimate = estimate_remaining(prev, elapsed, remaining, job.batch_size);
                info!("ETA: {}", format_eta(estimate));
            }
            last_ms = Some(elapsed);
            info!("completed {}%", done * 100 / records.len());
        }
        if fallbacks > 0 {
            warn!("{fallbacks} batch(es) kept their original text");
        }
        ensure_output(records, translated)
    }

    /// Like [`translate_all`](Self::translate_all) but dispatches all batches
    /// at once; the permit pool still caps simultaneous remote calls.
    pub async fn translate_all_concurrent(
        &self,
        records: &[SubtitleRecord],
        job: &JobOptions,
    ) -> Result<Vec<SubtitleRecord>> {
        trace!(
            "translate_all_concurrent records={} batch_size={}",
            records.len(),
            job.batch_size
        );
        let batches = chunk_subtitles(records, job.batch_size)?;
        let outcomes = futures::future::join_all(
            batches.map(|b| self.translate_batch(b, &job.source_language, &job.target_language)),
        )
        .await;
        let fallbacks = outcomes.iter().filter(|o| o.is_fallback()).count();
        if fallbacks > 0 {
            warn!("{fallbacks} batch(es) kept their original text");
        }
        let translated = outcomes.into_iter().flat_map(BatchOutcome::into_inner).collect();
        ensure_output(records, translated)
    }
}

/// Fail when a non-empty input produced nothing.
fn ensure_output(
    records: &[SubtitleRecord],
    translated: Vec<SubtitleRecord>,
) -> Result<Vec<SubtitleRecord>> {
    if !records.is_empty() && translated.is_empty() {
        return Err(TranslateError::NoTranslatableContent);
    }
    Ok(translated)
}

/// Path of the translated file: `stem.{target}.srt` next to `input`.
pub fn output_path(input: &Path, target_language: &str) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    let ext = input
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| "srt".to_string());
    input.with_file_name(format!("{stem}.{target_language}.{ext}"))
}

/// Whether `path` looks like an output already produced for `target_language`.
fn is_translation_output(path: &Path, target_language: &str) -> bool {
    path.file_stem()
        .map(Path::new)
        .and_then(Path::extension)
        .map(|tag| tag.to_string_lossy().eq_ignore_ascii_case(target_language))
        .unwrap_or(false)
}

/// Translate one SRT file and write the result alongside it.
/// Returns the path of the written file.
pub async fn process_file<T: Translator>(
    input: &Path,
    translator: &SubtitleTranslator<T>,
    job: &JobOptions,
) -> anyhow::Result<PathBuf> {
    info!("translating {}", input.display());
    let records = srt::load_file(input)?;
    let mut translated = translator.translate_all(&records, job).await?;
    if translated.is_empty() {
        return Err(TranslateError::NoTranslatableContent.into());
    }
    // Replies may reorder entries within a batch.
    translated.sort_by_key(|r| r.index);
    let out_path = output_path(input, &job.target_language);
    srt::save_file(&out_path, &translated)?;
    info!("translated subtitles saved to {}", out_path.display());
    Ok(out_path)
}

/// Translate every `*.srt` file directly inside `dir`, in name order.
pub async fn process_folder<T: Translator>(
    dir: &Path,
    translator: &SubtitleTranslator<T>,
    job: &JobOptions,
) -> anyhow::Result<Vec<PathBuf>> {
    trace!("process_folder dir={}", dir.display());
    let mut inputs = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_srt = path
            .extension()
            .map(|e| e.eq_ignore_ascii_case("srt"))
            .unwrap_or(false);
        if !path.is_file() || !is_srt {
            continue;
        }
        if is_translation_output(&path, &job.target_language) {
            debug!("skipping existing translation {}", path.display());
            continue;
        }
        inputs.push(path);
    }
    inputs.sort();
    if inputs.is_empty() {
        warn!("no .srt files found in {}", dir.display());
    }
    let mut outputs = Vec::with_capacity(inputs.len());
    for input in inputs {
        outputs.push(process_file(&input, translator, job).await?);
    }
    Ok(outputs)
}

/// Estimate remaining time in milliseconds for the translation.
/// The way this works is by averaging `prev_ms` and `curr_ms` and
/// multiplying by the number of batches left.
fn estimate_remaining(prev_ms: u128, curr_ms: u128, remaining: usize, batch: usize) -> u128 {
    let avg = (prev_ms + curr_ms) / 2;
    let batches = remaining.div_ceil(batch);
    avg * batches as u128
}

/// Format a duration in milliseconds as "X minute Y seconds".
fn format_eta(ms: u128) -> String {
    let total_secs = ms / 1000;
    let minutes = total_secs / 60;
    let seconds = total_secs % 60;
    if minutes > 0 {
        format!(
            "{} minute{} {} second{}",
            minutes,
            if minutes == 1 { "" } else { "s" },
            seconds,
            if seconds == 1 { "" } else { "s" }
        )
    } else {
        format!("{} second{}", seconds, if seconds == 1 { "" } else { "s" })
    }
}
