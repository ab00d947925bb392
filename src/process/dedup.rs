// src/process/dedup.rs
use std::{collections::HashSet, hash::Hash};

/// Keeps the first record seen for each natural key, preserving input order.
pub fn dedup_first<T, K, F>(records: impl IntoIterator<Item = T>, key: F) -> Vec<T>
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|r| seen.insert(key(r)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_occurrence_wins() {
        let rows = vec![
            ("A", 1),
            ("B", 2),
            ("A", 3),
            ("C", 4),
            ("B", 5),
            ("A", 6),
        ];
        let out = dedup_first(rows, |(k, _)| *k);
        assert_eq!(out, vec![("A", 1), ("B", 2), ("C", 4)]);
    }

    #[test]
    fn one_per_key_for_any_duplicate_pattern() {
        for n in 1..20usize {
            let rows: Vec<(usize, usize)> = (0..n * 3).map(|i| (i % n, i)).collect();
            let out = dedup_first(rows, |(k, _)| *k);
            assert_eq!(out.len(), n);
            for (k, first) in out {
                assert_eq!(k, first);
            }
        }
    }

    #[test]
    fn empty_input() {
        let out: Vec<(u8, u8)> = dedup_first(Vec::new(), |(k, _): &(u8, u8)| *k);
        assert!(out.is_empty());
    }
}
