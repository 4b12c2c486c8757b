//! Batch derivation and idempotency hashing.
//!
//! Batches are pure functions of `(text, current_index)`: re-deriving the
//! batch at the same cursor always yields the same slice and the same hash.
//! That determinism is what lets the runner detect already-delivered batches
//! without an outbox table.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{DomainError, DomainResult};

/// A bounded slice of remaining text plus its idempotency hash.
///
/// Ephemeral: never persisted beyond the owning job's `last_batch_hash`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypingBatch {
    pub text: String,
    /// Char offset of the batch start in the job text.
    pub start_index: usize,
    /// Char offset one past the last char of the batch.
    pub end_index: usize,
    /// `hex(sha256(text || ":" || start_index))`.
    pub hash: String,
}

impl TypingBatch {
    pub fn char_len(&self) -> usize {
        self.end_index - self.start_index
    }
}

/// Content+position fingerprint for a batch.
pub fn batch_hash(text: &str, start_index: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hasher.update(b":");
    hasher.update(start_index.to_le_bytes());
    format!("{:x}", hasher.finalize())
}

/// Slices the remaining text into bounded batches.
///
/// Cuts prefer a position just after whitespace so batches tend to end on
/// word boundaries; the cut point depends only on the text and the cursor.
#[derive(Debug, Clone, Copy)]
pub struct BatchBuilder {
    min_chars: usize,
    max_chars: usize,
}

impl BatchBuilder {
    pub fn new(min_chars: usize, max_chars: usize) -> DomainResult<Self> {
        if min_chars == 0 {
            return Err(DomainError::validation("batch size floor must be >= 1"));
        }
        if max_chars < min_chars {
            return Err(DomainError::validation(format!(
                "batch size ceiling {max_chars} below floor {min_chars}"
            )));
        }
        Ok(Self {
            min_chars,
            max_chars,
        })
    }

    /// Derive the batch starting at `current_index`, or `None` at end of text.
    pub fn next_batch(&self, text: &str, current_index: usize) -> Option<TypingBatch> {
        let remaining: Vec<char> = text.chars().skip(current_index).collect();
        if remaining.is_empty() {
            return None;
        }

        let take = if remaining.len() <= self.max_chars {
            remaining.len()
        } else {
            self.word_boundary_cut(&remaining)
        };

        let batch_text: String = remaining[..take].iter().collect();
        let hash = batch_hash(&batch_text, current_index);
        Some(TypingBatch {
            text: batch_text,
            start_index: current_index,
            end_index: current_index + take,
            hash,
        })
    }

    /// Cut point within `[min_chars, max_chars]`: the position just after the
    /// last whitespace in that window, or the ceiling when the window has none.
    fn word_boundary_cut(&self, remaining: &[char]) -> usize {
        let window = &remaining[..self.max_chars];
        window
            .iter()
            .enumerate()
            .skip(self.min_chars.saturating_sub(1))
            .rev()
            .find(|(_, c)| c.is_whitespace())
            .map(|(i, _)| i + 1)
            .unwrap_or(self.max_chars)
    }
}
