//! Typo planning.
//!
//! Occasionally a human types a neighboring key, notices, and backs up. The
//! delivery boundary is append-only, so a planned mistake surfaces as extra
//! time at the mistake position (notice + correction), not as document edits.
//! Draws come from the job's seeded rng, so plans replay identically from a
//! checkpoint.

use serde::{Deserialize, Serialize};

use crate::rng::SeededRng;

/// Chance of one planned mistake per batch.
pub const DEFAULT_MISTAKE_PROBABILITY: f64 = 0.03;

const QWERTY_ROWS: [&str; 3] = ["qwertyuiop", "asdfghjkl", "zxcvbnm"];

/// One planned typo and its timing cost.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MistakePlan {
    /// Char offset within the batch where the typo lands.
    pub char_index: usize,
    pub intended: char,
    pub typed: char,
    /// Time until the typist notices the error.
    pub notice_delay_ms: u64,
    /// Time spent backing up and retyping.
    pub correction_delay_ms: u64,
}

impl MistakePlan {
    pub fn total_extra_ms(&self) -> u64 {
        self.notice_delay_ms + self.correction_delay_ms
    }
}

/// Plans at most one mistake per batch.
#[derive(Debug, Clone, Copy)]
pub struct MistakePlanner {
    probability: f64,
}

impl MistakePlanner {
    pub fn new(probability: f64) -> Self {
        Self {
            probability: probability.clamp(0.0, 1.0),
        }
    }

    pub fn plan(&self, text: &str, rng: &mut SeededRng) -> Option<MistakePlan> {
        if !rng.chance(self.probability) {
            return None;
        }

        let candidates: Vec<(usize, char)> = text
            .chars()
            .enumerate()
            .filter(|(_, c)| c.is_ascii_alphabetic())
            .collect();
        if candidates.is_empty() {
            return None;
        }

        let pick = rng.range_u64(0, candidates.len() as u64 - 1) as usize;
        let (char_index, intended) = candidates[pick];
        let typed = neighbor_key(intended, rng)?;

        Some(MistakePlan {
            char_index,
            intended,
            typed,
            notice_delay_ms: rng.range_u64(150, 600),
            correction_delay_ms: rng.range_u64(250, 700),
        })
    }
}

impl Default for MistakePlanner {
    fn default() -> Self {
        Self::new(DEFAULT_MISTAKE_PROBABILITY)
    }
}

/// A horizontally adjacent key on the same QWERTY row, case preserved.
fn neighbor_key(c: char, rng: &mut SeededRng) -> Option<char> {
    let lower = c.to_ascii_lowercase();
    for row in QWERTY_ROWS {
        if let Some(pos) = row.find(lower) {
            let chars: Vec<char> = row.chars().collect();
            let neighbors: Vec<char> = match pos {
                0 => vec![chars[1]],
                p if p == chars.len() - 1 => vec![chars[p - 1]],
                p => vec![chars[p - 1], chars[p + 1]],
            };
            let pick = rng.range_u64(0, neighbors.len() as u64 - 1) as usize;
            let typo = neighbors[pick];
            return Some(if c.is_ascii_uppercase() {
                typo.to_ascii_uppercase()
            } else {
                typo
            });
        }
    }
    None
}
