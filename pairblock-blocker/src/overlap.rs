//! Token-overlap blocking via an inverted index.
//!
//! The left relation's overlap attribute is tokenized once and indexed
//! (token to row positions); each right row then probes the index with its
//! own distinct tokens and accumulates a per-left-row frequency count. Left
//! rows sharing at least `overlap_size` tokens with the right row qualify.
//! Cost is proportional to the total token count on both sides, which is
//! the point of this strategy: the cross product is never enumerated.

use std::sync::Arc;

use arrow::array::{Array, StringArray};
use arrow::compute::cast;
use arrow::datatypes::DataType;
use pairblock_catalog::Catalog;
use pairblock_relation::Relation;
use pairblock_result::{Error, Result};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::OutputOptions;
use crate::common::{
    candset_metadata, key_row_map, process_output_attrs, require_registered_key, resolve_fk,
};
use crate::output::{CandsetSpec, assemble_candset, retain_candset_rows};

/// Stop words dropped when `remove_stop_words` is enabled.
const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "he", "in", "is", "it",
    "its", "on", "that", "the", "to", "was", "were", "will", "with",
];

/// Tokenization and threshold options for overlap blocking.
///
/// `word_level` defaults to true; to tokenize into character q-grams,
/// explicitly disable it and set `q_gram_size`. Setting both is a
/// configuration error, caught before any other work.
#[derive(Clone, Debug)]
pub struct OverlapOptions {
    /// Drop the fixed stop-word list after word splitting.
    pub remove_stop_words: bool,
    /// Character q-gram size; mutually exclusive with `word_level`.
    pub q_gram_size: Option<usize>,
    /// Tokenize into whitespace-separated words.
    pub word_level: bool,
    /// Minimum number of shared tokens for a pair to qualify.
    pub overlap_size: usize,
}

impl Default for OverlapOptions {
    fn default() -> Self {
        Self {
            remove_stop_words: false,
            q_gram_size: None,
            word_level: true,
            overlap_size: 1,
        }
    }
}

impl OverlapOptions {
    pub fn with_remove_stop_words(mut self, remove: bool) -> Self {
        self.remove_stop_words = remove;
        self
    }

    pub fn with_q_gram_size(mut self, q: usize) -> Self {
        self.q_gram_size = Some(q);
        self
    }

    pub fn with_word_level(mut self, word_level: bool) -> Self {
        self.word_level = word_level;
        self
    }

    pub fn with_overlap_size(mut self, overlap_size: usize) -> Self {
        self.overlap_size = overlap_size;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.word_level && self.q_gram_size.is_some() {
            return Err(Error::Configuration(
                "word_level and q_gram_size cannot be set together; word_level defaults to \
                 true, so explicitly disable it to use q-grams"
                    .to_string(),
            ));
        }
        if self.q_gram_size == Some(0) {
            return Err(Error::Configuration(
                "q_gram_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Blocks tuple pairs sharing enough tokens in an overlap attribute.
pub struct OverlapBlocker {
    catalog: Arc<Catalog>,
}

impl OverlapBlocker {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog }
    }

    /// Block two base relations on token overlap.
    ///
    /// Rows with a null overlap-attribute value are silently excluded, and a
    /// value whose token set comes out empty never contributes pairs. Output
    /// is right-major (probe order), with qualifying left rows in ascending
    /// row order within each right row.
    pub fn block_tables(
        &self,
        ltable: &Arc<Relation>,
        rtable: &Arc<Relation>,
        l_overlap_attr: &str,
        r_overlap_attr: &str,
        options: &OverlapOptions,
        output: &OutputOptions,
    ) -> Result<Arc<Relation>> {
        options.validate()?;
        tracing::info!(
            ltable = %ltable.name(),
            rtable = %rtable.name(),
            "required metadata: ltable key, rtable key"
        );
        let l_key = require_registered_key(&self.catalog, ltable, "left")?;
        let r_key = require_registered_key(&self.catalog, rtable, "right")?;
        let l_text = text_column(ltable, l_overlap_attr, "left")?;
        let r_text = text_column(rtable, r_overlap_attr, "right")?;
        let l_output_attrs =
            process_output_attrs(ltable, &l_key, &output.l_output_attrs, "left")?;
        let r_output_attrs =
            process_output_attrs(rtable, &r_key, &output.r_output_attrs, "right")?;

        // Inverted index over the left side: token -> row positions. Token
        // sets are deduplicated per row, so a position appears at most once
        // per token.
        let mut index: FxHashMap<String, Vec<u32>> = FxHashMap::default();
        for row in 0..ltable.num_rows() {
            if l_text.is_null(row) {
                continue;
            }
            for token in tokenize(l_text.value(row), options) {
                index.entry(token).or_default().push(row as u32);
            }
        }

        let mut pairs: Vec<(u32, u32)> = Vec::new();
        for r_row in 0..rtable.num_rows() {
            if r_text.is_null(r_row) {
                continue;
            }
            let mut freq: FxHashMap<u32, usize> = FxHashMap::default();
            for token in tokenize(r_text.value(r_row), options) {
                if let Some(postings) = index.get(&token) {
                    for &l_row in postings {
                        *freq.entry(l_row).or_insert(0) += 1;
                    }
                }
            }
            let mut qualifying: Vec<u32> = freq
                .into_iter()
                .filter(|(_, count)| *count >= options.overlap_size)
                .map(|(l_row, _)| l_row)
                .collect();
            qualifying.sort_unstable();
            for l_row in qualifying {
                pairs.push((l_row, r_row as u32));
            }
        }

        let spec = CandsetSpec {
            ltable,
            rtable,
            l_key: &l_key,
            r_key: &r_key,
            l_output_attrs,
            r_output_attrs,
            l_prefix: &output.l_output_prefix,
            r_prefix: &output.r_output_prefix,
        };
        assemble_candset(&self.catalog, &spec, &pairs)
    }

    /// Narrow an existing candidate set to pairs whose overlap-attribute
    /// token sets intersect in at least `overlap_size` tokens.
    ///
    /// Unlike `block_tables`, this path compares the two token sets
    /// directly, so `overlap_size = 0` retains every pair. A null value
    /// tokenizes to the empty set.
    pub fn block_candset(
        &self,
        candset: &Arc<Relation>,
        l_overlap_attr: &str,
        r_overlap_attr: &str,
        options: &OverlapOptions,
    ) -> Result<Arc<Relation>> {
        options.validate()?;
        let meta = candset_metadata(&self.catalog, candset)?;
        let l_text = text_column(&meta.ltable, l_overlap_attr, "left")?;
        let r_text = text_column(&meta.rtable, r_overlap_attr, "right")?;
        let l_rows = key_row_map(&meta.ltable, &meta.l_key)?;
        let r_rows = key_row_map(&meta.rtable, &meta.r_key)?;
        let fk_l = candset.column(&meta.fk_ltable)?;
        let fk_r = candset.column(&meta.fk_rtable)?;

        let mut keep: Vec<u32> = Vec::new();
        for row in 0..candset.num_rows() {
            let l_row = resolve_fk(&l_rows, fk_l, row, &meta.fk_ltable)? as usize;
            let r_row = resolve_fk(&r_rows, fk_r, row, &meta.fk_rtable)? as usize;
            let l_tokens = row_token_set(&l_text, l_row, options);
            let r_tokens = row_token_set(&r_text, r_row, options);
            let overlap = l_tokens.intersection(&r_tokens).count();
            if overlap >= options.overlap_size {
                keep.push(row as u32);
            }
        }
        retain_candset_rows(&self.catalog, candset, &meta, &keep)
    }
}

/// Fetch an overlap attribute as strings, casting with a warning when the
/// column is not already textual.
fn text_column(relation: &Relation, attr: &str, side: &str) -> Result<StringArray> {
    let column = relation.column(attr)?;
    if let Some(strings) = column.as_any().downcast_ref::<StringArray>() {
        return Ok(strings.clone());
    }
    tracing::warn!(
        relation = %relation.name(),
        attribute = attr,
        side,
        "overlap attribute is not of type string; converting to string temporarily"
    );
    let casted = cast(column, &DataType::Utf8)?;
    casted
        .as_any()
        .downcast_ref::<StringArray>()
        .cloned()
        .ok_or_else(|| Error::Internal("cast to Utf8 did not produce a string array".to_string()))
}

fn row_token_set(text: &StringArray, row: usize, options: &OverlapOptions) -> FxHashSet<String> {
    if text.is_null(row) {
        return FxHashSet::default();
    }
    tokenize(text.value(row), options).into_iter().collect()
}

/// Tokenize one attribute value into a deduplicated token list.
///
/// Pipeline: drop non-ASCII scalars and trim, strip ASCII punctuation,
/// lowercase, whitespace-split (optionally dropping stop words), dedup
/// preserving first occurrence. With a q-gram size set, the surviving words
/// are re-joined with single spaces and a character window of that size is
/// slid over the string; a string shorter than the window yields no tokens.
fn tokenize(value: &str, options: &OverlapOptions) -> Vec<String> {
    let ascii: String = value.chars().filter(char::is_ascii).collect();
    let cleaned: String = ascii
        .trim()
        .chars()
        .filter(|c| !c.is_ascii_punctuation())
        .collect();
    let lowered = cleaned.to_lowercase();

    let mut seen: FxHashSet<&str> = FxHashSet::default();
    let mut words: Vec<&str> = Vec::new();
    for word in lowered.split_whitespace() {
        if options.remove_stop_words && STOP_WORDS.contains(&word) {
            continue;
        }
        if seen.insert(word) {
            words.push(word);
        }
    }

    match options.q_gram_size {
        None => words.into_iter().map(str::to_string).collect(),
        Some(q) => {
            let joined = words.join(" ");
            let chars: Vec<char> = joined.chars().collect();
            if chars.len() < q {
                return Vec::new();
            }
            let mut grams: Vec<String> = Vec::new();
            let mut seen: FxHashSet<String> = FxHashSet::default();
            for window in chars.windows(q) {
                let gram: String = window.iter().collect();
                if seen.insert(gram.clone()) {
                    grams.push(gram);
                }
            }
            grams
        }
    }
}
