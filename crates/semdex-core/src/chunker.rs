//! Line-bounded chunking with overlap.
//!
//! A chunk grows line by line until the next line would push it past the
//! character budget. Each line costs its character count plus one for the
//! newline separator. The next chunk restarts `overlap_lines` lines before
//! the end of the previous one, so neighbouring chunks share context.

/// Split text into lines on `\n`, `\r\n`, a lone `\r` and the Unicode line
/// and paragraph separators. A trailing break does not start an empty line.
pub fn split_lines(text: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if !is_line_break(c) {
            continue;
        }
        lines.push(&text[start..i]);
        start = i + c.len_utf8();
        if c == '\r' && matches!(chars.peek(), Some((_, '\n'))) {
            chars.next();
            start += 1;
        }
    }
    if start < text.len() {
        lines.push(&text[start..]);
    }
    lines
}

fn is_line_break(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\u{0b}' | '\u{0c}' | '\u{1c}' | '\u{1d}' | '\u{1e}' | '\u{85}' | '\u{2028}' | '\u{2029}'
    )
}

/// One chunk of a file. Lines are 1-based; `end_line` is exclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkSpan {
    pub text: String,
    pub start_line: usize,
    pub end_line: usize,
}

/// Lazy iterator over the chunks of a line sequence.
///
/// Cloning the iterator (or calling [`chunk_lines`] again) restarts the
/// sequence; the output only depends on the inputs.
#[derive(Debug, Clone)]
pub struct LineChunker<'a, S> {
    lines: &'a [S],
    max_chars: usize,
    overlap_lines: usize,
    start: usize,
    done: bool,
}

pub fn chunk_lines<S: AsRef<str>>(
    lines: &[S],
    max_chars: usize,
    overlap_lines: usize,
) -> LineChunker<'_, S> {
    LineChunker { lines, max_chars, overlap_lines, start: 0, done: false }
}

impl<S: AsRef<str>> LineChunker<'_, S> {
    /// Returns the 0-based index one past the last line of the chunk that
    /// begins at `start`. Always greater than `start`.
    fn grow(&self, start: usize) -> usize {
        let mut cursor = start;
        let mut length = 0usize;
        while cursor < self.lines.len() {
            let line_len = self.lines[cursor].as_ref().chars().count() + 1;
            if length + line_len > self.max_chars {
                if cursor == start {
                    // A single line over budget still forms a chunk on its own.
                    cursor += 1;
                }
                break;
            }
            length += line_len;
            cursor += 1;
        }
        cursor
    }
}

impl<S: AsRef<str>> Iterator for LineChunker<'_, S> {
    type Item = ChunkSpan;

    fn next(&mut self) -> Option<ChunkSpan> {
        while !self.done {
            let total = self.lines.len();
            let start = self.start;
            if start >= total {
                self.done = true;
                break;
            }

            let cursor = self.grow(start);
            debug_assert!(cursor > start);

            if cursor >= total {
                self.done = true;
            } else {
                // Overlap never moves the cursor backwards or in place.
                self.start = cursor.saturating_sub(self.overlap_lines).max(start + 1);
            }

            let joined = self.lines[start..cursor]
                .iter()
                .map(AsRef::as_ref)
                .collect::<Vec<&str>>()
                .join("\n");
            let trimmed = joined.trim();
            if trimmed.is_empty() {
                continue;
            }
            return Some(ChunkSpan {
                text: trimmed.to_string(),
                start_line: start + 1,
                end_line: cursor + 1,
            });
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spans(lines: &[String], max_chars: usize, overlap: usize) -> Vec<(usize, usize)> {
        chunk_lines(lines, max_chars, overlap).map(|c| (c.start_line, c.end_line)).collect()
    }

    fn repeated(n: usize, width: usize) -> Vec<String> {
        (0..n).map(|i| format!("{:0>width$}", i, width = width)).collect()
    }

    #[test]
    fn split_lines_handles_every_break_style() {
        assert_eq!(split_lines("a\rb\r\nc\nd"), vec!["a", "b", "c", "d"]);
        assert_eq!(split_lines("a\n\nb\n"), vec!["a", "", "b"]);
        assert_eq!(split_lines("x\u{2028}y\u{85}z"), vec!["x", "y", "z"]);
        assert_eq!(split_lines("\r\n"), vec![""]);
        assert!(split_lines("").is_empty());
    }

    #[test]
    fn carriage_return_files_chunk_like_newline_files() {
        let lf = "alpha\nbeta\ngamma\ndelta";
        let cr = lf.replace('\n', "\r");
        let spans = |text: &str| {
            chunk_lines(&split_lines(text), 12, 1).map(|c| (c.start_line, c.end_line)).collect::<Vec<_>>()
        };
        assert_eq!(spans(&cr), spans(lf));
        assert!(spans(lf).len() > 1);
    }

    #[test]
    fn empty_input_yields_nothing() {
        let lines: Vec<String> = Vec::new();
        assert_eq!(chunk_lines(&lines, 100, 3).count(), 0);
    }

    #[test]
    fn small_file_fits_in_one_chunk() {
        let lines = repeated(5, 10);
        let chunks: Vec<ChunkSpan> = chunk_lines(&lines, 1200, 0).collect();
        assert_eq!(chunks.len(), 1);
        assert_eq!((chunks[0].start_line, chunks[0].end_line), (1, 6));
        assert_eq!(chunks[0].text, lines.join("\n"));
    }

    #[test]
    fn overlap_larger_than_chunk_still_advances() {
        let lines = repeated(10, 200);
        let got = spans(&lines, 450, 3);
        assert_eq!(got[0], (1, 3));
        for pair in got.windows(2) {
            assert!(pair[1].0 > pair[0].0, "start must advance: {got:?}");
            assert_ne!(pair[0], pair[1]);
        }
        assert_eq!(got.last().map(|s| s.1), Some(11));
    }

    #[test]
    fn overlap_reincludes_tail_lines() {
        let lines = repeated(10, 9); // 10 chars per line with separator
        let got = spans(&lines, 50, 2);
        assert_eq!(got[0], (1, 6));
        assert_eq!(got[1], (4, 9));
        assert_eq!(got[2], (7, 11));
        assert_eq!(got.len(), 3);
    }

    #[test]
    fn oversized_line_is_forced_alone() {
        let lines = vec!["x".repeat(5000), "short".to_string()];
        let got: Vec<ChunkSpan> = chunk_lines(&lines, 100, 0).collect();
        assert_eq!(got.len(), 2);
        assert_eq!((got[0].start_line, got[0].end_line), (1, 2));
        assert_eq!(got[0].text.len(), 5000);
        assert_eq!(got[1].text, "short");
    }

    #[test]
    fn zero_budget_makes_single_line_chunks() {
        let lines = repeated(4, 3);
        assert_eq!(spans(&lines, 0, 2), vec![(1, 2), (2, 3), (3, 4), (4, 5)]);
    }

    #[test]
    fn whitespace_chunks_are_dropped_but_cursor_moves() {
        let lines: Vec<String> =
            vec!["   ".into(), "\t".into(), "".into(), "body".into()];
        let got: Vec<ChunkSpan> = chunk_lines(&lines, 4, 0).collect();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].text, "body");
        assert_eq!((got[0].start_line, got[0].end_line), (4, 5));
    }

    #[test]
    fn content_is_trimmed() {
        let lines = vec!["".to_string(), "  fn main() {}  ".to_string(), "".to_string()];
        let got: Vec<ChunkSpan> = chunk_lines(&lines, 1000, 0).collect();
        assert_eq!(got[0].text, "fn main() {}");
        assert_eq!((got[0].start_line, got[0].end_line), (1, 4));
    }

    #[test]
    fn budget_counts_characters_not_bytes() {
        // 4 chars + separator = 5 per line, but 8 bytes of UTF-8 each.
        let lines = vec!["жжжж".to_string(), "жжжж".to_string()];
        let got = spans(&lines, 10, 0);
        assert_eq!(got, vec![(1, 3)]);
    }

    #[test]
    fn chunks_cover_every_line_and_respect_invariants() {
        for n in [1usize, 2, 7, 31] {
            for max_chars in [5usize, 40, 120] {
                for overlap in [0usize, 1, 3] {
                    let lines = repeated(n, 7);
                    let chunks: Vec<ChunkSpan> = chunk_lines(&lines, max_chars, overlap).collect();
                    let mut covered_to = 1;
                    let mut prev_start = 0;
                    for c in &chunks {
                        assert!(c.start_line < c.end_line);
                        assert!(!c.text.is_empty());
                        assert!(c.start_line > prev_start);
                        assert!(c.start_line <= covered_to, "gap before {c:?}");
                        covered_to = covered_to.max(c.end_line);
                        prev_start = c.start_line;
                    }
                    assert_eq!(covered_to, n + 1);
                }
            }
        }
    }

    #[test]
    fn iterator_is_restartable() {
        let lines = repeated(12, 20);
        let chunker = chunk_lines(&lines, 60, 1);
        let first: Vec<ChunkSpan> = chunker.clone().collect();
        let second: Vec<ChunkSpan> = chunker.collect();
        assert_eq!(first, second);
        assert_eq!(first, chunk_lines(&lines, 60, 1).collect::<Vec<_>>());
    }
}
