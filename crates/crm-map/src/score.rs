//! Name similarity for column-to-field matching.
//!
//! Names are normalized (case, separators, common API suffixes) and then
//! compared with a matching-blocks ratio: twice the number of characters in
//! the longest common blocks divided by the combined length.

/// Suffixes removed after lower-casing. `__c` is stripped before separators
/// are dropped so custom-field names compare by their stem.
const CUSTOM_SUFFIX: &str = "__c";
const TRAILING_SUFFIXES: [&str; 2] = ["id", "name"];

/// Normalize a column or field name for comparison.
///
/// Lower-cases, strips a trailing `__c`, removes underscores and spaces,
/// then strips a trailing `id` and a trailing `name` (each at most once,
/// in that order).
pub fn normalize_name(raw: &str) -> String {
    let lower = raw.to_lowercase();
    let stem = lower.strip_suffix(CUSTOM_SUFFIX).unwrap_or(&lower);
    let mut normalized: String = stem.chars().filter(|c| *c != '_' && *c != ' ').collect();
    for suffix in TRAILING_SUFFIXES {
        if let Some(stripped) = normalized.strip_suffix(suffix) {
            normalized = stripped.to_string();
        }
    }
    normalized
}

/// Similarity of two names in `[0, 1]`.
///
/// Reflexive, and symmetric because the block search runs in both
/// directions and the higher ratio wins. An empty normalized name scores 0
/// against any non-empty one.
pub fn similarity(a: &str, b: &str) -> f64 {
    let left: Vec<char> = normalize_name(a).chars().collect();
    let right: Vec<char> = normalize_name(b).chars().collect();
    matching_blocks_ratio(&left, &right).max(matching_blocks_ratio(&right, &left))
}

/// Ratio of matched characters, `2 * M / (|a| + |b|)`.
///
/// Two empty sequences are identical and score 1.
pub fn matching_blocks_ratio<T: PartialEq>(a: &[T], b: &[T]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    let matched = matched_len(a, b, 0, a.len(), 0, b.len());
    (2 * matched) as f64 / total as f64
}

/// Total length of matching blocks in `a[alo..ahi]` vs `b[blo..bhi]`.
fn matched_len<T: PartialEq>(
    a: &[T],
    b: &[T],
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> usize {
    let (i, j, size) = longest_match(a, b, alo, ahi, blo, bhi);
    if size == 0 {
        return 0;
    }
    size + matched_len(a, b, alo, i, blo, j) + matched_len(a, b, i + size, ahi, j + size, bhi)
}

/// Longest common block within the given ranges.
///
/// Ties go to the block starting earliest in `a`, then earliest in `b`.
fn longest_match<T: PartialEq>(
    a: &[T],
    b: &[T],
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let width = bhi.saturating_sub(blo);
    let mut best = (alo, blo, 0);
    // Run lengths ending at each b position for the previous row of a.
    let mut previous = vec![0usize; width + 1];
    let mut current = vec![0usize; width + 1];
    for i in alo..ahi {
        for j in blo..bhi {
            let slot = j - blo + 1;
            current[slot] = if a[i] == b[j] { previous[slot - 1] + 1 } else { 0 };
            let run = current[slot];
            if run > best.2 {
                best = (i + 1 - run, j + 1 - run, run);
            }
        }
        std::mem::swap(&mut previous, &mut current);
    }
    best
}
