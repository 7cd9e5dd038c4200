//! Splitting subtitle sequences into request-sized batches.

use crate::error::{Result, TranslateError};
use crate::srt::SubtitleRecord;

/// Split `records` into contiguous batches of at most `batch_size` entries.
/// Only the last batch may be shorter.
pub fn chunk_subtitles(
    records: &[SubtitleRecord],
    batch_size: usize,
) -> Result<std::slice::Chunks<'_, SubtitleRecord>> {
    if batch_size == 0 {
        return Err(TranslateError::InvalidConfiguration(
            "batch size must be at least 1".into(),
        ));
    }
    Ok(records.chunks(batch_size))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(n: u32) -> Vec<SubtitleRecord> {
        (1..=n)
            .map(|i| SubtitleRecord {
                index: i,
                start_ms: u64::from(i) * 1000,
                end_ms: u64::from(i) * 1000 + 500,
                text: format!("line {i}"),
            })
            .collect()
    }

    #[test]
    fn covers_every_record_in_order() {
        for n in [0u32, 1, 49, 50, 51, 120] {
            for size in [1usize, 3, 50, 200] {
                let input = records(n);
                let batches: Vec<_> = chunk_subtitles(&input, size).unwrap().collect();
                assert_eq!(batches.len(), (n as usize).div_ceil(size));
                assert!(batches.iter().all(|b| !b.is_empty() && b.len() <= size));
                let joined: Vec<SubtitleRecord> = batches.concat();
                assert_eq!(joined, input);
            }
        }
    }

    #[test]
    fn last_batch_holds_the_remainder() {
        let input = records(7);
        let sizes: Vec<usize> = chunk_subtitles(&input, 3).unwrap().map(<[_]>::len).collect();
        assert_eq!(sizes, vec![3, 3, 1]);
    }

    #[test]
    fn zero_batch_size_is_invalid() {
        let err = chunk_subtitles(&records(2), 0).unwrap_err();
        assert!(matches!(err, TranslateError::InvalidConfiguration(_)));
    }
}
