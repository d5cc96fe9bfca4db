// File: voucherbot-core/src/upstream/extract.rs

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use tracing::warn;

/// Shape of one LNURL-withdraw code: case-insensitive `lnurl` prefix
/// followed by at least 20 alphanumeric characters. Real codes encode a
/// full URL and are far longer; anything shorter is a fragment.
pub const CODE_SHAPE: &str = r"(?i)lnurl[0-9a-z]{20,}";

static CODE_ANYWHERE: Lazy<Regex> =
    Lazy::new(|| Regex::new(CODE_SHAPE).expect("code shape regex"));
static CODE_FULL_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^lnurl[0-9a-z]{20,}$").expect("code line regex"));

/// Parses a raw CSV-export response into validated, deduplicated codes,
/// normalized to uppercase, first-seen order preserved.
///
/// The exporter nominally returns one code per line, but under error it
/// returns an HTML page instead; when markup markers are present the
/// whole text is scanned for code-shaped substrings rather than
/// trusting line structure. Zero valid codes is an empty vec, never an
/// error; the caller decides whether that is fatal.
pub fn extract_codes(raw: &str) -> Vec<String> {
    let text = raw.trim();
    let lowered = text.to_lowercase();
    let looks_like_markup = lowered.contains("<html")
        || lowered.contains("<!doctype")
        || lowered.contains("<script");

    let mut seen = HashSet::new();
    let mut codes = Vec::new();
    let mut push = |candidate: &str| {
        let code = candidate.to_uppercase();
        if seen.insert(code.clone()) {
            codes.push(code);
        }
    };

    if looks_like_markup {
        warn!("Export response looks like HTML, scanning for embedded codes");
        for m in CODE_ANYWHERE.find_iter(text) {
            push(m.as_str());
        }
    } else {
        for line in text.lines() {
            let line = line.trim();
            if CODE_FULL_LINE.is_match(line) {
                push(line);
            }
        }
    }

    codes
}
