//! Canonical text form for offset computation.
//!
//! Every offset in this crate is a character index into *normalized* text.
//! Normalization applies Unicode canonical composition (NFC) so that visually
//! identical but differently-encoded sequences produce identical offsets, and
//! rewrites `\r\n`/`\r` line endings to `\n` so newline counting is stable
//! across platforms and paste sources.

use unicode_normalization::{is_nfc, UnicodeNormalization};

/// Normalize raw editor text into the canonical form all offsets refer to.
///
/// Idempotent: `normalize(normalize(s)) == normalize(s)`.
pub fn normalize(text: &str) -> String {
    let unified = unify_newlines(text);
    if is_nfc(&unified) {
        unified
    } else {
        unified.nfc().collect()
    }
}

/// Normalize optional input, mapping absence to the empty string.
///
/// Callers deserializing loosely-shaped payloads use this so a missing text
/// field degrades to `""` instead of an error.
pub fn normalize_opt(text: Option<&str>) -> String {
    match text {
        Some(text) => normalize(text),
        None => String::new(),
    }
}

fn unify_newlines(text: &str) -> String {
    if !text.contains('\r') {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\r' {
            // \r\n collapses to \n, bare \r becomes \n
            if chars.peek() == Some(&'\n') {
                chars.next();
            }
            out.push('\n');
        } else {
            out.push(c);
        }
    }
    out
}
