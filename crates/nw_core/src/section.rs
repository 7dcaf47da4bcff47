//! Canonicalization of hierarchical section labels.
//!
//! `normalize` is applied identically to the filter input and to the stored
//! value at comparison time, so matching is symmetric no matter which side
//! carries extra punctuation, case or diacritics.

use deunicode::deunicode;
use lazy_static::lazy_static;
use percent_encoding::percent_decode_str;
use regex::Regex;

lazy_static! {
    static ref NON_ALNUM: Regex = Regex::new(r"[^a-z0-9]+").unwrap();
    static ref SLUG_DROP: Regex = Regex::new(r"[^a-z0-9\s/_-]+").unwrap();
    static ref SLUG_SEP: Regex = Regex::new(r"[\s/]+").unwrap();
    static ref DASH_RUN: Regex = Regex::new(r"-+").unwrap();
}

/// Canonical matching key for a section label: percent-decoded, case-folded,
/// diacritic-stripped, `&` spelled out, every separator and punctuation mark
/// removed. Idempotent.
pub fn normalize(label: &str) -> String {
    let decoded = percent_decode_str(label.trim()).decode_utf8_lossy();
    let folded = deunicode(&decoded).to_lowercase().replace('&', "and");
    NON_ALNUM.replace_all(&folded, "").into_owned()
}

/// URL-safe slug for a label or path segment: lowercase, `&` -> "and",
/// whitespace and `/` runs collapsed to `-`.
pub fn slugify(label: &str) -> String {
    let folded = deunicode(label.trim()).to_lowercase().replace('&', "and");
    let kept = SLUG_DROP.replace_all(&folded, "");
    let dashed = SLUG_SEP.replace_all(&kept, "-");
    DASH_RUN
        .replace_all(&dashed, "-")
        .trim_matches('-')
        .to_string()
}
