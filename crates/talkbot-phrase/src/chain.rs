use std::collections::HashMap;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::PhraseError;

/// Word adjacency table built from a flat token sequence.
///
/// Successor lists keep duplicates, so sampling uniformly from a list is
/// weighted by how often each transition was observed.
#[derive(Debug, Clone, Default)]
pub struct WordChain {
    words: Vec<String>,
    successors: HashMap<String, Vec<String>>,
}

impl WordChain {
    /// Tokenize every message on whitespace and record each consecutive pair.
    pub fn from_contents<I, S>(contents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let words: Vec<String> = contents
            .into_iter()
            .flat_map(|c| {
                c.as_ref()
                    .split_whitespace()
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .collect();

        let mut successors: HashMap<String, Vec<String>> = HashMap::new();
        for pair in words.windows(2) {
            successors
                .entry(pair[0].clone())
                .or_default()
                .push(pair[1].clone());
        }

        Self { words, successors }
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    /// Observed successors of `word`, in order of observation.
    pub fn successors(&self, word: &str) -> Option<&[String]> {
        self.successors.get(word).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.successors.is_empty()
    }

    /// Random walk: one uniformly chosen seed word followed by `word_count`
    /// successors, joined with single spaces.
    pub fn generate<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        word_count: usize,
    ) -> Result<String, PhraseError> {
        if self.words.is_empty() {
            return Err(PhraseError::insufficient("no stored words"));
        }
        if self.successors.is_empty() {
            return Err(PhraseError::insufficient("no word pairs to build a chain"));
        }

        let mut phrase: Vec<&str> = Vec::with_capacity(word_count + 1);
        let seed = self
            .words
            .choose(rng)
            .ok_or_else(|| PhraseError::insufficient("no stored words"))?;
        phrase.push(seed);

        for _ in 0..word_count {
            let last = phrase[phrase.len() - 1];
            let next = self
                .successors(last)
                .and_then(|s| s.choose(rng))
                .ok_or_else(|| {
                    PhraseError::insufficient(format!("word {last:?} has no recorded successor"))
                })?;
            phrase.push(next);
        }

        Ok(phrase.join(" "))
    }
}
