//! Token-overlap similarity over whitespace-tokenized text.
//!
//! Both texts become token multisets; the overlap is the sum over tokens of
//! the smaller count, divided by the larger total. Order is irrelevant and
//! one edited word costs one token, however long the document.

use rustc_hash::FxHashMap;

fn token_counts(text: &str) -> (FxHashMap<&str, usize>, usize) {
    let mut counts: FxHashMap<&str, usize> = FxHashMap::default();
    let mut total = 0;
    for token in text.split_whitespace() {
        *counts.entry(token).or_insert(0) += 1;
        total += 1;
    }
    (counts, total)
}

/// Similarity in `[0.0, 1.0]`. Two empty texts are identical (1.0); one
/// empty side against a non-empty one scores 0.0.
pub fn token_overlap_similarity(old: &str, new: &str) -> f64 {
    let (old_counts, old_total) = token_counts(old);
    let (new_counts, new_total) = token_counts(new);

    match (old_total, new_total) {
        (0, 0) => return 1.0,
        (0, _) | (_, 0) => return 0.0,
        _ => {}
    }

    let (small, large) = if old_counts.len() <= new_counts.len() {
        (&old_counts, &new_counts)
    } else {
        (&new_counts, &old_counts)
    };
    let overlap: usize = small
        .iter()
        .map(|(token, &count)| count.min(large.get(token).copied().unwrap_or(0)))
        .sum();

    overlap as f64 / old_total.max(new_total) as f64
}
