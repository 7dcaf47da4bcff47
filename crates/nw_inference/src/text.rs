//! Deterministic text cleanup applied before any inference.
//!
//! The pipeline is order-sensitive: lower-case, expand contractions, strip
//! retweet markers, emails, URLs and markup, drop stopwords, fold accents,
//! drop the remaining special characters, stem to base form, trim. Pure
//! function of its input; two calls with the same input always produce the
//! same output.

use deunicode::deunicode;
use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use std::collections::{HashMap, HashSet};

lazy_static! {
    static ref RT_RE: Regex = Regex::new(r"\brt\b").unwrap();
    static ref EMAIL_RE: Regex = Regex::new(r"[\w.+-]+@[\w-]+\.[\w.-]+").unwrap();
    static ref URL_RE: Regex = Regex::new(r"(?:https?://|www\.)\S+").unwrap();
    static ref TAG_RE: Regex = Regex::new(r"<[^>]*>").unwrap();
    static ref SPECIAL_RE: Regex = Regex::new(r"[^a-z0-9\s]").unwrap();
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
    static ref CONTRACTIONS: HashMap<&'static str, &'static str> = IRREGULAR
        .iter()
        .copied()
        .collect();
    static ref STOPWORDS: HashSet<&'static str> = STOPWORD_LIST.iter().copied().collect();
}

const IRREGULAR: &[(&str, &str)] = &[
    ("ain't", "is not"),
    ("can't", "cannot"),
    ("shan't", "shall not"),
    ("won't", "will not"),
    ("let's", "let us"),
    ("i'm", "i am"),
];

const SUFFIX_RULES: &[(&str, &str)] = &[
    ("n't", " not"),
    ("'re", " are"),
    ("'ve", " have"),
    ("'ll", " will"),
    ("'d", " would"),
    ("'s", " is"),
];

const STOPWORD_LIST: &[&str] = &[
    "a", "about", "above", "after", "again", "all", "am", "an", "and", "any", "are", "as", "at",
    "be", "because", "been", "before", "being", "below", "between", "both", "but", "by", "can",
    "did", "do", "does", "doing", "down", "during", "each", "few", "for", "from", "further",
    "had", "has", "have", "having", "he", "her", "here", "hers", "him", "his", "how", "i", "if",
    "in", "into", "is", "it", "its", "just", "me", "more", "most", "my", "no", "nor", "not",
    "now", "of", "off", "on", "once", "only", "or", "other", "our", "ours", "out", "over",
    "own", "same", "she", "should", "so", "some", "such", "than", "that", "the", "their",
    "theirs", "them", "then", "there", "these", "they", "this", "those", "through", "to", "too",
    "under", "until", "up", "very", "was", "we", "were", "what", "when", "where", "which",
    "while", "who", "whom", "why", "will", "with", "you", "your", "yours",
];

fn expand_word(word: &str) -> String {
    if let Some(expanded) = CONTRACTIONS.get(word) {
        return (*expanded).to_string();
    }
    for (suffix, replacement) in SUFFIX_RULES {
        if let Some(stem) = word.strip_suffix(suffix) {
            if !stem.is_empty() {
                return format!("{stem}{replacement}");
            }
        }
    }
    word.to_string()
}

fn expand_contractions(text: &str) -> String {
    text.split_whitespace()
        .map(expand_word)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Normalize free text for classification.
pub fn normalize(text: &str) -> String {
    let lowered = text.to_lowercase().replace('\u{2019}', "'");
    let expanded = expand_contractions(&lowered);
    let s = RT_RE.replace_all(&expanded, " ");
    let s = EMAIL_RE.replace_all(&s, " ");
    let s = URL_RE.replace_all(&s, " ");
    let s = TAG_RE.replace_all(&s, " ");
    let kept = s
        .split_whitespace()
        .filter(|w| !STOPWORDS.contains(*w))
        .collect::<Vec<_>>()
        .join(" ");
    let folded = deunicode(&kept);
    let stripped = SPECIAL_RE.replace_all(&folded, "");
    stripped
        .split_whitespace()
        .map(|w| STEMMER.stem(w).into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}
