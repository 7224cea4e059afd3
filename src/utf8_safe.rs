//! UTF-8 helpers for streamed bytes and column-bounded terminal text.
//!
//! Everything here respects character boundaries and glyph widths so chat text
//! containing CJK or emoji never splits a code point or overruns a pane.

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Incremental decoder for a byte stream that may split multi-byte characters
/// across reads. Incomplete tails are held back until the next push.
#[derive(Debug, Default)]
pub struct Utf8Reassembler {
    pending: Vec<u8>,
}

impl Utf8Reassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode everything that forms complete characters. Invalid sequences become U+FFFD.
    pub fn push(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        let mut out = String::new();
        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(text) => {
                    out.push_str(text);
                    self.pending.clear();
                    break;
                }
                Err(err) => {
                    let valid = err.valid_up_to();
                    out.push_str(std::str::from_utf8(&self.pending[..valid]).unwrap_or_default());
                    match err.error_len() {
                        Some(bad) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid + bad);
                        }
                        None => {
                            self.pending.drain(..valid);
                            break;
                        }
                    }
                }
            }
        }
        out
    }

    /// Flush at end of stream; a dangling partial character becomes U+FFFD.
    pub fn finish(&mut self) -> String {
        if self.pending.is_empty() {
            return String::new();
        }
        self.pending.clear();
        char::REPLACEMENT_CHARACTER.to_string()
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}

fn glyph_width(ch: char) -> usize {
    UnicodeWidthChar::width(ch).unwrap_or(0)
}

pub fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

/// Return a slice of the string bounded by display columns rather than raw characters.
/// A wide glyph straddling either edge is left out.
pub fn window_by_columns(s: &str, start_cols: usize, width_cols: usize) -> &str {
    if width_cols == 0 || s.is_empty() {
        return "";
    }
    let end_cols = start_cols.saturating_add(width_cols);
    let mut col = 0usize;
    let mut start_byte = None;
    let mut end_byte = s.len();
    for (idx, ch) in s.char_indices() {
        let next_col = col + glyph_width(ch);
        if start_byte.is_none() && col >= start_cols {
            start_byte = Some(idx);
        }
        if start_byte.is_some() && next_col > end_cols {
            end_byte = idx;
            break;
        }
        col = next_col;
    }
    match start_byte {
        Some(start) if start <= end_byte => &s[start..end_byte],
        _ => "",
    }
}

/// Truncate to `max_cols` display columns, marking the cut with an ellipsis.
pub fn ellipsize_columns(s: &str, max_cols: usize) -> String {
    if display_width(s) <= max_cols {
        return s.to_string();
    }
    if max_cols <= 1 {
        return "…".to_string();
    }
    format!("{}…", window_by_columns(s, 0, max_cols - 1))
}

/// Hard-wrap text into lines of at most `width` columns. Embedded newlines start
/// a new line; words are kept whole when they fit.
pub fn wrap_by_columns(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    for raw_line in text.split('\n') {
        let mut line = String::new();
        let mut line_cols = 0usize;
        for word in raw_line.split_inclusive(' ') {
            let word_cols = display_width(word);
            if line_cols + word_cols <= width {
                line.push_str(word);
                line_cols += word_cols;
                continue;
            }
            if !line.is_empty() && word_cols <= width {
                lines.push(std::mem::take(&mut line).trim_end().to_string());
                line.push_str(word);
                line_cols = word_cols;
                continue;
            }
            for ch in word.chars() {
                let ch_cols = glyph_width(ch);
                if line_cols + ch_cols > width && !line.is_empty() {
                    lines.push(std::mem::take(&mut line));
                    line_cols = 0;
                }
                line.push(ch);
                line_cols += ch_cols;
            }
        }
        lines.push(line.trim_end().to_string());
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reassembles_split_multibyte_sequences() {
        let bytes = "分拣完成 ✅".as_bytes();
        let mut decoder = Utf8Reassembler::new();
        let mut out = String::new();
        for chunk in bytes.chunks(1) {
            out.push_str(&decoder.push(chunk));
        }
        out.push_str(&decoder.finish());
        assert_eq!(out, "分拣完成 ✅");
        assert!(!decoder.has_pending());
    }

    #[test]
    fn holds_back_incomplete_tail() {
        let euro = "€".as_bytes();
        let mut decoder = Utf8Reassembler::new();
        assert_eq!(decoder.push(&[b'a', euro[0], euro[1]]), "a");
        assert!(decoder.has_pending());
        assert_eq!(decoder.push(&euro[2..]), "€");
    }

    #[test]
    fn invalid_bytes_become_replacement_chars() {
        let mut decoder = Utf8Reassembler::new();
        assert_eq!(decoder.push(&[b'o', 0xff, b'k']), "o\u{fffd}k");
        decoder.push(&[0xe2, 0x82]);
        assert_eq!(decoder.finish(), "\u{fffd}");
    }

    #[test]
    fn window_by_columns_respects_wide_glyphs() {
        assert_eq!(window_by_columns("abcdef", 0, 3), "abc");
        assert_eq!(window_by_columns("abcdef", 2, 3), "cde");
        assert_eq!(window_by_columns("abcdef", 10, 5), "");
        assert_eq!(window_by_columns("你好世界", 0, 4), "你好");
        assert_eq!(window_by_columns("你好世界", 0, 3), "你");
    }

    #[test]
    fn ellipsize_columns_counts_display_width() {
        assert_eq!(ellipsize_columns("hello", 10), "hello");
        assert_eq!(ellipsize_columns("hello world", 8), "hello w…");
        assert_eq!(ellipsize_columns("你好世界", 5), "你好…");
        assert_eq!(ellipsize_columns("test", 1), "…");
    }

    #[test]
    fn wraps_on_words_and_splits_long_ones() {
        assert_eq!(
            wrap_by_columns("move the red capsule", 9),
            vec!["move the", "red", "capsule"]
        );
        assert_eq!(wrap_by_columns("abcdefgh", 3), vec!["abc", "def", "gh"]);
        assert_eq!(wrap_by_columns("a\nb", 10), vec!["a", "b"]);
        assert_eq!(wrap_by_columns("", 10), vec![""]);
    }
}
