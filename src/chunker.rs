//! C1 Chunker: split file text into overlapping line-windows for embedding.
//!
//! Grounded on `semantic.rs::extract_chunks`'s blank-line/size-bounded split,
//! generalized to a fixed sliding window rather than blank-line boundaries.

const WINDOW_LINES: usize = 25;
const OVERLAP_LINES: usize = 5;
const STRIDE_LINES: usize = WINDOW_LINES - OVERLAP_LINES;
const MIN_TRIMMED_LEN: usize = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub content: String,
    /// 1-based, inclusive.
    pub line_start: usize,
    /// 1-based, inclusive, clipped to file length.
    pub line_end: usize,
}

/// Split `text` into 25-line windows sliding by 20 lines (5-line overlap).
/// A window is emitted only if its trimmed content is longer than 30 chars.
pub fn chunk(text: &str) -> Vec<Chunk> {
    if text.len() < 50 {
        return Vec::new();
    }

    let lines: Vec<&str> = text.lines().collect();
    if lines.is_empty() {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    let mut start = 0usize;
    loop {
        let end = (start + WINDOW_LINES).min(lines.len());
        let window = &lines[start..end];
        let content = window.join("\n");
        if content.trim().len() > MIN_TRIMMED_LEN {
            chunks.push(Chunk {
                content,
                line_start: start + 1,
                line_end: end,
            });
        }

        if end >= lines.len() {
            break;
        }
        start += STRIDE_LINES;
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(n: usize) -> String {
        (0..n).map(|i| format!("line {i} is long enough to matter")).collect::<Vec<_>>().join("\n")
    }

    #[test]
    fn short_file_produces_no_chunks() {
        assert!(chunk("too short").is_empty());
    }

    #[test]
    fn small_nontrivial_file_produces_one_chunk() {
        let text = lines(10);
        let chunks = chunk(&text);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].line_start, 1);
        assert_eq!(chunks[0].line_end, 10);
    }

    #[test]
    fn sliding_window_overlaps_by_five_lines() {
        let text = lines(60);
        let chunks = chunk(&text);
        assert!(chunks.len() >= 2);
        assert_eq!(chunks[0].line_start, 1);
        assert_eq!(chunks[0].line_end, 25);
        assert_eq!(chunks[1].line_start, 21);
    }

    #[test]
    fn last_chunk_is_clipped_to_file_length() {
        let text = lines(42);
        let chunks = chunk(&text);
        let last = chunks.last().unwrap();
        assert_eq!(last.line_end, 42);
        assert!(last.line_end <= 42);
    }

    #[test]
    fn low_content_tail_chunk_is_skipped() {
        // 21 real lines then a single near-empty line as a "tail" window.
        let mut text = lines(21);
        text.push('\n');
        text.push('x');
        let chunks = chunk(&text);
        // No chunk's trimmed content is <= 30 chars.
        for c in &chunks {
            assert!(c.content.trim().len() > MIN_TRIMMED_LEN);
        }
    }

    #[test]
    fn concatenation_covers_every_line_modulo_skipped_tail() {
        let text = lines(100);
        let chunks = chunk(&text);
        let mut covered = std::collections::HashSet::new();
        for c in &chunks {
            for l in c.line_start..=c.line_end {
                covered.insert(l);
            }
        }
        for l in 1..=100 {
            assert!(covered.contains(&l), "line {l} not covered");
        }
    }
}
