//! Column-name sanitization.
//!
//! Raw header strings become identifiers that are safe to interpolate into
//! generated queries: ASCII-only, never starting with a digit, unique
//! case-insensitively within one call. The function is total — any sequence
//! of strings, including empty and non-ASCII input, produces a same-length
//! output in the same order.

use std::collections::HashSet;

/// Sanitizes an ordered sequence of raw column names.
///
/// Per name: trim, replace characters outside `[A-Za-z0-9_\- ]` with `_`,
/// collapse whitespace and underscore runs, strip edge underscores, prefix
/// `col_` when the result starts with a digit, substitute `column_<index>`
/// when the result is empty, then resolve case-insensitive collisions with
/// `_1`, `_2`, … suffixes.
pub fn sanitize_columns(names: &[String]) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut sanitized: Vec<String> = Vec::with_capacity(names.len());

    for raw in names {
        let mut clean = scrub(raw.trim());

        if clean.chars().next().is_some_and(|c| c.is_ascii_digit()) {
            clean = format!("col_{clean}");
        }

        if clean.is_empty() {
            clean = format!("column_{}", sanitized.len());
        }

        let base = clean.clone();
        let mut counter = 1usize;
        while seen.contains(&clean.to_ascii_lowercase()) {
            clean = format!("{base}_{counter}");
            counter += 1;
        }

        seen.insert(clean.to_ascii_lowercase());
        sanitized.push(clean);
    }

    sanitized
}

/// Replaces unsafe characters with `_`, collapses runs, strips edges.
/// Spaces and every replaced character funnel into the same underscore
/// collapse so `"a  %% b"` becomes `a_b`, not `a___b`.
fn scrub(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_was_underscore = false;

    for c in name.chars() {
        let mapped = match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' => Some(c),
            '_' | ' ' => None,
            _ => None,
        };
        match mapped {
            Some(keep) => {
                out.push(keep);
                last_was_underscore = false;
            }
            None => {
                if !last_was_underscore && !out.is_empty() {
                    out.push('_');
                }
                last_was_underscore = true;
            }
        }
    }

    while out.ends_with('_') {
        out.pop();
    }
    out
}
