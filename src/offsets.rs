//! Character-offset helpers.
//!
//! Offsets throughout the crate count Unicode scalar values (chars), never
//! bytes. These helpers bridge between the char-offset model and the byte
//! indices `&str` slicing needs, returning `None` rather than panicking when
//! an offset is out of range.

/// Number of chars in `s`.
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Byte index of the char at `char_idx`, or `s.len()` when `char_idx` equals
/// the char count. `None` when past the end.
pub fn byte_index(s: &str, char_idx: usize) -> Option<usize> {
    if char_idx == 0 {
        return Some(0);
    }
    let mut seen = 0;
    for (byte_idx, _) in s.char_indices() {
        if seen == char_idx {
            return Some(byte_idx);
        }
        seen += 1;
    }
    if seen == char_idx {
        Some(s.len())
    } else {
        None
    }
}

/// Char index of the char starting at `byte_idx`.
///
/// `byte_idx` must lie on a char boundary; counts chars before it.
pub fn char_index(s: &str, byte_idx: usize) -> usize {
    s[..byte_idx].chars().count()
}

/// Slice `s` by char range `[start, end)`, or `None` when out of range.
pub fn char_slice(s: &str, start: usize, end: usize) -> Option<&str> {
    if start > end {
        return None;
    }
    let start_byte = byte_index(s, start)?;
    let end_byte = byte_index(s, end)?;
    Some(&s[start_byte..end_byte])
}

/// Replace the char range `[start, end)` of `s` with `replacement`.
///
/// Returns `None` when the range is out of bounds.
pub fn splice(s: &str, start: usize, end: usize, replacement: &str) -> Option<String> {
    if start > end {
        return None;
    }
    let start_byte = byte_index(s, start)?;
    let end_byte = byte_index(s, end)?;
    let mut out = String::with_capacity(s.len() - (end_byte - start_byte) + replacement.len());
    out.push_str(&s[..start_byte]);
    out.push_str(replacement);
    out.push_str(&s[end_byte..]);
    Some(out)
}
