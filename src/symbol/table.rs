//! Frequency counting for symbol assignment.
//!
//! The first build pass feeds every line to a [`SymbolCounter`]. Once the
//! corpus is exhausted, [`SymbolCounter::assign_values`] ranks each table by
//! descending count and hands out dense ids, most frequent first.

use std::borrow::Borrow;
use std::hash::Hash;

use ahash::AHashMap;

use crate::phrase::line::PhraseLine;
use crate::symbol::maps::{SymbolMap, SymbolMaps};

/// Insertion-ordered occurrence counts of one symbol kind.
#[derive(Debug, Clone)]
pub struct FrequencyTable<K> {
    index: AHashMap<K, usize>,
    entries: Vec<(K, u32)>,
}

impl<K: Hash + Eq + Clone> FrequencyTable<K> {
    /// Create an empty table.
    pub fn new() -> Self {
        FrequencyTable {
            index: AHashMap::new(),
            entries: Vec::new(),
        }
    }

    /// Record one occurrence of `symbol`.
    pub fn add<Q>(&mut self, symbol: &Q)
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ToOwned<Owned = K> + ?Sized,
    {
        match self.index.get(symbol) {
            Some(&slot) => {
                let count = &mut self.entries[slot].1;
                *count = count.saturating_add(1);
            }
            None => {
                self.index.insert(symbol.to_owned(), self.entries.len());
                self.entries.push((symbol.to_owned(), 1));
            }
        }
    }

    /// Occurrences of `symbol` seen so far.
    pub fn count<Q>(&self, symbol: &Q) -> u32
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.index
            .get(symbol)
            .map(|&slot| self.entries[slot].1)
            .unwrap_or(0)
    }

    /// Number of distinct symbols.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Symbols ordered by descending count; ties keep first-seen order.
    pub fn ranked(&self) -> Vec<(K, u32)> {
        let mut ranked = self.entries.clone();
        // `sort_by` is stable.
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked
    }

    /// Assign dense ids in rank order.
    pub fn assign(&self) -> SymbolMap<K> {
        SymbolMap::from_ranked(self.ranked().into_iter().map(|(symbol, _)| symbol))
    }
}

impl<K: Hash + Eq + Clone> Default for FrequencyTable<K> {
    fn default() -> Self {
        Self::new()
    }
}

/// Counts every symbol kind observed in a phrase table.
#[derive(Debug, Clone, Default)]
pub struct SymbolCounter {
    phrases: FrequencyTable<String>,
    words: FrequencyTable<Vec<u8>>,
    alignments: FrequencyTable<Vec<u8>>,
    lines: u64,
}

impl SymbolCounter {
    /// Create an empty counter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Count the target phrase, its words and its alignment.
    pub fn count_line(&mut self, line: &PhraseLine) {
        self.phrases.add(line.target.as_str());
        for word in line.target_words() {
            self.words.add(word.as_bytes());
        }
        if !line.alignment.is_empty() {
            self.alignments.add(line.alignment.as_slice());
        }
        self.lines += 1;
    }

    /// Number of lines counted.
    pub fn lines(&self) -> u64 {
        self.lines
    }

    /// Target phrase counts.
    pub fn phrases(&self) -> &FrequencyTable<String> {
        &self.phrases
    }

    /// Word token counts.
    pub fn words(&self) -> &FrequencyTable<Vec<u8>> {
        &self.words
    }

    /// Alignment counts.
    pub fn alignments(&self) -> &FrequencyTable<Vec<u8>> {
        &self.alignments
    }

    /// Rank every table and produce the id snapshot shared by encoder and decoder.
    pub fn assign_values(&self) -> SymbolMaps {
        SymbolMaps::new(
            self.phrases.assign(),
            self.words.assign(),
            self.alignments.assign(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::maps::FIRST_SYMBOL_ID;

    fn counter_for(lines: &[(&str, &str)]) -> SymbolCounter {
        let mut counter = SymbolCounter::new();
        for (source, target) in lines {
            counter.count_line(&PhraseLine::new(source, target, vec![0.5]));
        }
        counter
    }

    #[test]
    fn test_ranked_is_stable() {
        let mut table = FrequencyTable::<String>::new();
        for symbol in ["b", "a", "c", "a", "c", "d"] {
            table.add(symbol);
        }
        let ranked: Vec<_> = table.ranked().into_iter().map(|(s, _)| s).collect();
        assert_eq!(ranked, vec!["a", "c", "b", "d"]);
        assert_eq!(table.count("a"), 2);
        assert_eq!(table.count("zzz"), 0);
    }

    #[test]
    fn test_ids_are_monotonic_in_count() {
        let counter = counter_for(&[
            ("s1", "the cat"),
            ("s2", "the dog"),
            ("s3", "a dog"),
            ("s4", "the dog"),
            ("s5", "the bird"),
        ]);
        let maps = counter.assign_values();

        let words = maps.words();
        let ids: Vec<u32> = words.iter().map(|(id, _)| id).collect();
        assert_eq!(ids.first(), Some(&FIRST_SYMBOL_ID));
        for pair in ids.windows(2) {
            let (i, j) = (pair[0], pair[1]);
            assert!(i < j);
            let count_i = counter.words().count(words.symbol(i).unwrap().as_slice());
            let count_j = counter.words().count(words.symbol(j).unwrap().as_slice());
            assert!(count_i >= count_j, "id {i} has {count_i}, id {j} has {count_j}");
        }

        assert_eq!(maps.word_id(b"the"), Some(1));
        assert_eq!(maps.word_id(b"dog"), Some(2));
        assert_eq!(maps.phrase_id("the dog"), Some(1));
    }

    #[test]
    fn test_zero_is_never_assigned() {
        let counter = counter_for(&[("x", "only")]);
        let maps = counter.assign_values();
        assert_eq!(maps.phrase_id("only"), Some(FIRST_SYMBOL_ID));
        assert!(maps.phrase(0).is_none());
        assert!(maps.word(0).is_none());
    }

    #[test]
    fn test_alignment_counted_only_when_present() {
        let mut counter = SymbolCounter::new();
        counter.count_line(&PhraseLine::new("a", "b", vec![]));
        counter.count_line(&PhraseLine::new("a", "c", vec![]).with_alignment(&[(0, 0)]));
        assert_eq!(counter.alignments().len(), 1);
        assert_eq!(counter.lines(), 2);
    }
}
