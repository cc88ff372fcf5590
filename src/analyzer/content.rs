//! Text metrics over the extracted page text

use std::collections::{BTreeMap, HashMap};

/// Number of keywords kept in the density map
pub const MAX_KEYWORDS: usize = 10;

const STOP_WORDS: &[&str] = &[
    "a", "an", "the", "and", "or", "but", "is", "are", "was", "were", "be", "to", "of", "in",
    "that", "have", "it", "for", "on", "with",
];

/// Whitespace-tokenized word count
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Simplified Flesch reading-ease score
///
/// `206.835 - 1.015 * (words / sentences)`, where sentences are the
/// `.`-delimited segments of the text (at least one). Returns 0 for text
/// without words.
pub fn readability_score(text: &str) -> f64 {
    let words = count_words(text);
    let sentences = text.split('.').count().max(1);

    if words == 0 {
        return 0.0;
    }

    206.835 - 1.015 * (words as f64 / sentences as f64)
}

/// Extracted text length as a percentage of the raw document size
pub fn text_to_html_ratio(text_len: usize, raw_size: u64) -> f64 {
    if raw_size == 0 {
        return 0.0;
    }
    text_len as f64 / raw_size as f64 * 100.0
}

/// Density (percent of all words) of the most frequent keywords
///
/// Words are lowercased; words shorter than three bytes and stop words are
/// not keywords but still count toward the total. Only the top
/// [`MAX_KEYWORDS`] survive; equal densities are ordered lexically.
pub fn keyword_density(text: &str) -> BTreeMap<String, f64> {
    let lowered = text.to_lowercase();
    let words: Vec<&str> = lowered.split_whitespace().collect();
    let total = words.len();

    if total == 0 {
        return BTreeMap::new();
    }

    let mut frequency: HashMap<&str, usize> = HashMap::new();
    for word in words {
        if word.len() < 3 || is_stop_word(word) {
            continue;
        }
        *frequency.entry(word).or_default() += 1;
    }

    let mut ranked: Vec<(&str, usize)> = frequency.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    ranked
        .into_iter()
        .take(MAX_KEYWORDS)
        .map(|(word, count)| (word.to_string(), count as f64 / total as f64 * 100.0))
        .collect()
}

pub fn is_stop_word(word: &str) -> bool {
    STOP_WORDS.contains(&word)
}
