//! Greedy line wrapping
//!
//! Widths are counted in characters, not bytes.

/// Wrap `text` greedily into lines of at most `max_chars` characters.
///
/// Words are packed onto the current line while
/// `line_len + 1 + word_len <= max_chars`; otherwise a new line starts.
/// A word longer than `max_chars` is split into `max_chars`-sized chunks.
/// Blank input yields no lines.
pub fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines = Vec::new();
    let mut line = String::new();
    let mut line_len = 0usize;

    for word in text.split_whitespace() {
        for chunk in split_long_word(word, max_chars) {
            let chunk_len = chunk.chars().count();
            if line_len == 0 {
                line.push_str(chunk);
                line_len = chunk_len;
            } else if line_len + 1 + chunk_len <= max_chars {
                line.push(' ');
                line.push_str(chunk);
                line_len += 1 + chunk_len;
            } else {
                lines.push(std::mem::take(&mut line));
                line.push_str(chunk);
                line_len = chunk_len;
            }
        }
    }

    if line_len > 0 {
        lines.push(line);
    }
    lines
}

/// Number of lines `wrap_text` would produce
pub fn line_count(text: &str, max_chars: usize) -> usize {
    wrap_text(text, max_chars).len()
}

fn split_long_word(word: &str, max_chars: usize) -> Vec<&str> {
    if word.chars().count() <= max_chars {
        return vec![word];
    }
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut count = 0;
    for (idx, _) in word.char_indices() {
        if count == max_chars {
            chunks.push(&word[start..idx]);
            start = idx;
            count = 0;
        }
        count += 1;
    }
    chunks.push(&word[start..]);
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packs_words_greedily() {
        let lines = wrap_text("the quick brown fox jumps over the lazy dog", 10);
        assert_eq!(lines, ["the quick", "brown fox", "jumps over", "the lazy", "dog"]);
    }

    #[test]
    fn test_exact_fit_stays_on_line() {
        // "aaaa bbbbb" is exactly 10 characters
        assert_eq!(wrap_text("aaaa bbbbb c", 10), ["aaaa bbbbb", "c"]);
        assert_eq!(wrap_text("aaaa bbbbbb", 10), ["aaaa", "bbbbbb"]);
    }

    #[test]
    fn test_greedy_not_balanced() {
        // A balanced wrap would give "aaa bb" / "cc dddd"; greedy fills the first line
        assert_eq!(wrap_text("aaa bb cc dddd", 9), ["aaa bb cc", "dddd"]);
    }

    #[test]
    fn test_collapses_whitespace() {
        assert_eq!(wrap_text("  a \n\t b  ", 20), ["a b"]);
    }

    #[test]
    fn test_blank_input() {
        assert!(wrap_text("", 10).is_empty());
        assert!(wrap_text("   ", 10).is_empty());
        assert_eq!(line_count("", 10), 0);
    }

    #[test]
    fn test_long_word_is_split() {
        assert_eq!(wrap_text("abcdefghij xy", 4), ["abcd", "efgh", "ij", "xy"]);
    }

    #[test]
    fn test_counts_characters_not_bytes() {
        let lines = wrap_text("niño año señal", 8);
        assert_eq!(lines, ["niño año", "señal"]);
    }

    #[test]
    fn test_no_line_exceeds_width() {
        let text = "Paciente con neumonia adquirida en la comunidad, evolucion favorable \
                    tras antibioterapia intravenosa; supercalifragilisticexpialidocious \
                    afebril desde el tercer dia, PCR en descenso, tolera dieta oral.";
        for width in 1..=60 {
            for line in wrap_text(text, width) {
                assert!(line.chars().count() <= width, "width {}: {:?}", width, line);
                assert!(!line.is_empty());
            }
        }
    }

    #[test]
    fn test_deterministic_line_count() {
        let text = "one two three four five six seven eight nine ten";
        let first = line_count(text, 12);
        for _ in 0..5 {
            assert_eq!(line_count(text, 12), first);
        }
    }

    #[test]
    fn test_preserves_all_words_in_order() {
        let text = "alpha beta gamma delta epsilon zeta eta theta";
        let joined = wrap_text(text, 11).join(" ");
        assert_eq!(joined, text);
    }
}
