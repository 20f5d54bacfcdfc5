//! Trend extraction over scraped headline titles.
//!
//! Titles are tokenized into lowercase terms, common words are dropped, and
//! the remaining terms are ranked by how many titles mention them.

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;

/// Terms shorter than this are ignored.
const MIN_TERM_LEN: usize = 3;

/// Words too common in headlines to say anything about a trend.
const STOPWORDS: &[&str] = &[
    "about", "after", "again", "all", "also", "and", "any", "are", "because", "been", "before",
    "being", "between", "but", "can", "could", "did", "does", "down", "during", "for", "from",
    "had", "has", "have", "her", "here", "him", "his", "how", "into", "its", "just", "more",
    "most", "new", "news", "not", "now", "off", "old", "one", "only", "other", "our", "out",
    "over", "says", "she", "should", "than", "that", "the", "their", "them", "then", "there",
    "these", "they", "this", "those", "through", "too", "under", "until", "was", "were", "what",
    "when", "where", "which", "while", "who", "why", "will", "with", "would", "you", "your",
];

/// A ranked term and the number of titles that mention it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Trend {
    pub term: String,
    pub count: usize,
}

/// Splits a title into lowercase terms worth ranking.
///
/// Drops short tokens, pure numbers and stopwords. Order follows the title
/// and duplicates are kept.
pub fn tokenize(title: &str) -> Vec<String> {
    title
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| token.chars().count() >= MIN_TERM_LEN)
        .map(str::to_lowercase)
        .filter(|token| !token.chars().all(|c| c.is_ascii_digit()))
        .filter(|token| !STOPWORDS.contains(&token.as_str()))
        .collect()
}

/// Ranks terms across `titles` and returns the top `top_n`.
///
/// Each title counts a term at most once, so one repetitive headline cannot
/// push a term to the top. Ties are broken alphabetically.
pub fn extract_trends<I, S>(titles: I, top_n: usize) -> Vec<Trend>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut counts: HashMap<String, usize> = HashMap::new();
    for title in titles {
        let distinct: BTreeSet<String> = tokenize(title.as_ref()).into_iter().collect();
        for term in distinct {
            *counts.entry(term).or_default() += 1;
        }
    }

    let mut ranked: Vec<Trend> = counts
        .into_iter()
        .map(|(term, count)| Trend { term, count })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.term.cmp(&b.term)));
    ranked.truncate(top_n);
    ranked
}
