//! Char-boundary safe slicing.

/// The first `n` characters of `s`.
pub fn head_chars(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// The last `n` characters of `s`.
pub fn tail_chars(s: &str, n: usize) -> &str {
    if n == 0 {
        return "";
    }
    match s.char_indices().rev().nth(n - 1) {
        Some((idx, _)) => &s[idx..],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multibyte_boundaries() {
        let s = "王林走进了山门";
        assert_eq!(head_chars(s, 2), "王林");
        assert_eq!(tail_chars(s, 2), "山门");
        assert_eq!(tail_chars(s, 100), s);
        assert_eq!(head_chars(s, 0), "");
        assert_eq!(tail_chars(s, 0), "");
    }
}
