//! Recursive text chunking with overlap.
//!
//! Text is cut at the largest boundary that keeps pieces under the chunk
//! size (paragraph, line, sentence, word, then single characters). Adjacent
//! pieces are merged greedily and the tail of each emitted chunk, up to the
//! overlap budget, is carried into the next one.

use std::collections::VecDeque;

use crate::error::ConfigError;
use crate::models::{Chunk, ChunkingConfig, Document};

/// Separators tried in order. Each stays attached to the end of the piece it closes.
pub const DEFAULT_SEPARATORS: &[&str] = &["\n\n", "\n", ". ", "! ", "? ", " ", ""];

/// A trimmed span of the input text. Offsets are in characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSegment {
    pub content: String,
    pub start: usize,
    pub end: usize,
}

/// Text chunker that splits documents into overlapping chunks.
#[derive(Debug, Clone)]
pub struct TextChunker {
    /// Maximum chunk length in characters
    chunk_size: usize,
    /// Maximum characters shared by consecutive chunks
    chunk_overlap: usize,
    separators: Vec<Vec<char>>,
}

impl TextChunker {
    /// Create a new text chunker with the given configuration.
    pub fn new(config: &ChunkingConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            chunk_size: config.chunk_size as usize,
            chunk_overlap: config.chunk_overlap as usize,
            separators: DEFAULT_SEPARATORS
                .iter()
                .map(|s| s.chars().collect())
                .collect(),
        })
    }

    /// Create a chunker from raw sizes.
    pub fn from_sizes(chunk_size: u32, chunk_overlap: u32) -> Result<Self, ConfigError> {
        Self::new(&ChunkingConfig {
            chunk_size,
            chunk_overlap,
        })
    }

    /// Create a chunker with default settings (1000 / 200).
    pub fn with_defaults() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            separators: DEFAULT_SEPARATORS
                .iter()
                .map(|s| s.chars().collect())
                .collect(),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Chunk every page of a document. Chunks never cross page boundaries and
    /// are numbered sequentially across the whole document.
    pub fn chunk(&self, document: &Document) -> Vec<Chunk> {
        let mut chunks = Vec::new();

        for page in &document.pages {
            for segment in self.split(&page.text) {
                let seq = chunks.len() as u32;
                chunks.push(Chunk {
                    id: Chunk::generate_id(&document.checksum, seq),
                    seq,
                    content: segment.content,
                    page: Some(page.number),
                    start_offset: segment.start as u64,
                    end_offset: segment.end as u64,
                    source: document.name.clone(),
                });
            }
        }

        chunks
    }

    /// Split raw text into ordered, overlapping segments.
    pub fn split(&self, text: &str) -> Vec<TextSegment> {
        if text.is_empty() {
            return Vec::new();
        }

        let chars: Vec<char> = text.chars().collect();
        let mut spans = Vec::new();
        self.split_range(&chars, 0, chars.len(), &self.separators, &mut spans);

        spans
            .into_iter()
            .map(|(start, end)| TextSegment {
                content: chars[start..end].iter().collect(),
                start,
                end,
            })
            .collect()
    }

    fn split_range(
        &self,
        chars: &[char],
        start: usize,
        end: usize,
        separators: &[Vec<char>],
        out: &mut Vec<(usize, usize)>,
    ) {
        let Some(idx) = separators
            .iter()
            .position(|sep| sep.is_empty() || contains(&chars[start..end], sep))
        else {
            self.hard_split(chars, start, end, out);
            return;
        };
        let separator = &separators[idx];
        let finer = &separators[idx + 1..];

        let mut good = Vec::new();
        for (piece_start, piece_end) in split_keeping_separator(chars, start, end, separator) {
            if piece_end - piece_start < self.chunk_size {
                good.push((piece_start, piece_end));
                continue;
            }

            if !good.is_empty() {
                self.merge(chars, &good, out);
                good.clear();
            }
            if finer.is_empty() {
                self.hard_split(chars, piece_start, piece_end, out);
            } else {
                self.split_range(chars, piece_start, piece_end, finer, out);
            }
        }

        if !good.is_empty() {
            self.merge(chars, &good, out);
        }
    }

    /// Merge consecutive pieces into windows of at most `chunk_size`
    /// characters, carrying at most `chunk_overlap` characters forward.
    fn merge(&self, chars: &[char], pieces: &[(usize, usize)], out: &mut Vec<(usize, usize)>) {
        let mut window: VecDeque<(usize, usize)> = VecDeque::new();
        let mut total = 0usize;

        for &(start, end) in pieces {
            let len = end - start;

            if total + len > self.chunk_size && !window.is_empty() {
                push_trimmed(chars, window_bounds(&window), out);

                while total > self.chunk_overlap || (total + len > self.chunk_size && total > 0) {
                    match window.pop_front() {
                        Some((s, e)) => total -= e - s,
                        None => break,
                    }
                }
            }

            window.push_back((start, end));
            total += len;
        }

        if !window.is_empty() {
            push_trimmed(chars, window_bounds(&window), out);
        }
    }

    fn hard_split(&self, chars: &[char], start: usize, end: usize, out: &mut Vec<(usize, usize)>) {
        let step = self.chunk_size - self.chunk_overlap;
        let mut pos = start;
        while pos < end {
            let stop = (pos + self.chunk_size).min(end);
            push_trimmed(chars, (pos, stop), out);
            if stop == end {
                break;
            }
            pos += step;
        }
    }
}

fn window_bounds(window: &VecDeque<(usize, usize)>) -> (usize, usize) {
    let start = window.front().map_or(0, |w| w.0);
    let end = window.back().map_or(start, |w| w.1);
    (start, end)
}

fn push_trimmed(chars: &[char], (mut start, mut end): (usize, usize), out: &mut Vec<(usize, usize)>) {
    while start < end && chars[start].is_whitespace() {
        start += 1;
    }
    while end > start && chars[end - 1].is_whitespace() {
        end -= 1;
    }
    if start < end {
        out.push((start, end));
    }
}

fn contains(haystack: &[char], needle: &[char]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// Split `chars[start..end]` after each occurrence of `separator`. An empty
/// separator yields one piece per character.
fn split_keeping_separator(
    chars: &[char],
    start: usize,
    end: usize,
    separator: &[char],
) -> Vec<(usize, usize)> {
    if separator.is_empty() {
        return (start..end).map(|i| (i, i + 1)).collect();
    }

    let mut pieces = Vec::new();
    let mut piece_start = start;
    let mut i = start;
    while i + separator.len() <= end {
        if chars[i..i + separator.len()] == *separator {
            i += separator.len();
            pieces.push((piece_start, i));
            piece_start = i;
        } else {
            i += 1;
        }
    }
    if piece_start < end {
        pieces.push((piece_start, end));
    }
    pieces
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Page;
    use proptest::prelude::*;

    fn chunker(size: u32, overlap: u32) -> TextChunker {
        TextChunker::from_sizes(size, overlap).unwrap()
    }

    #[test]
    fn test_empty_text() {
        assert!(TextChunker::with_defaults().split("").is_empty());
        assert!(TextChunker::with_defaults().split("   \n\n  ").is_empty());
    }

    #[test]
    fn test_small_text_single_chunk() {
        let segments = TextChunker::with_defaults().split("Hello, world!");
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].content, "Hello, world!");
        assert_eq!((segments[0].start, segments[0].end), (0, 13));
    }

    #[test]
    fn test_invalid_sizes_rejected() {
        assert!(TextChunker::from_sizes(100, 100).is_err());
        assert!(TextChunker::from_sizes(0, 0).is_err());
    }

    #[test]
    fn test_2500_chars_make_three_overlapping_chunks() {
        let text = "abcd ".repeat(500);
        assert_eq!(text.chars().count(), 2500);

        let segments = chunker(1000, 200).split(&text);
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0].start, 0);
        assert_eq!(segments[1].start, 800);
        assert_eq!(segments[2].start, 1600);
        assert!(segments[0].content.ends_with(&segments[1].content[..199]));
        assert!(segments[1].content.ends_with(&segments[2].content[..199]));
    }

    #[test]
    fn test_prefers_paragraph_boundaries() {
        let text = "alpha beta gamma delta.\n\nepsilon zeta eta theta.";
        let segments = chunker(30, 5).split(text);
        let contents: Vec<&str> = segments.iter().map(|s| s.content.as_str()).collect();
        assert_eq!(
            contents,
            vec!["alpha beta gamma delta.", "epsilon zeta eta theta."]
        );
    }

    #[test]
    fn test_does_not_split_words() {
        let words = ["photosynthesis", "chlorophyll", "glucose", "sunlight", "energy"];
        let text = words.iter().cycle().take(200).copied().collect::<Vec<_>>().join(" ");
        let segments = chunker(60, 15).split(&text);

        assert!(segments.len() > 1);
        for segment in &segments {
            for word in segment.content.split_whitespace() {
                assert!(words.contains(&word), "split inside a word: {word}");
            }
        }
    }

    #[test]
    fn test_long_word_falls_back_to_characters() {
        let text = "x".repeat(250);
        let segments = chunker(100, 20).split(&text);
        assert!(segments.iter().all(|s| s.content.chars().count() <= 100));
        assert_eq!(segments.first().map(|s| s.start), Some(0));
        assert_eq!(segments.last().map(|s| s.end), Some(250));
    }

    #[test]
    fn test_multibyte_offsets_are_characters() {
        let text = "Ñino ñandú ".repeat(40);
        let chars: Vec<char> = text.chars().collect();
        for segment in chunker(50, 10).split(&text) {
            let expected: String = chars[segment.start..segment.end].iter().collect();
            assert_eq!(segment.content, expected);
        }
    }

    #[test]
    fn test_deterministic() {
        let text = "Sentence one. Sentence two! Sentence three? ".repeat(30);
        let c = chunker(120, 30);
        assert_eq!(c.split(&text), c.split(&text));
    }

    #[test]
    fn test_chunk_document_per_page() {
        let document = Document::new(
            "module.pdf",
            "checksum",
            vec![
                Page {
                    number: 1,
                    text: "Page one text.".to_string(),
                },
                Page {
                    number: 2,
                    text: String::new(),
                },
                Page {
                    number: 3,
                    text: "Page three text.".to_string(),
                },
            ],
        );
        let chunks = TextChunker::with_defaults().chunk(&document);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].seq, 0);
        assert_eq!(chunks[0].page, Some(1));
        assert_eq!(chunks[1].seq, 1);
        assert_eq!(chunks[1].page, Some(3));
        assert_eq!(chunks[1].source, "module.pdf");
        assert_eq!(chunks[1].id, Chunk::generate_id("checksum", 1));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(128))]

        #[test]
        fn prop_chunks_respect_size_and_overlap(
            text in "[a-z .!?\n]{0,3000}",
            chunk_size in 10u32..400,
            overlap_ratio in 0.0f64..0.9,
        ) {
            let chunk_overlap = ((f64::from(chunk_size) * overlap_ratio) as u32).min(chunk_size - 1);
            let segments = chunker(chunk_size, chunk_overlap).split(&text);
            let chars: Vec<char> = text.chars().collect();

            for segment in &segments {
                prop_assert!(segment.content.chars().count() <= chunk_size as usize);
                let expected: String = chars[segment.start..segment.end].iter().collect();
                prop_assert_eq!(&segment.content, &expected);
            }

            for pair in segments.windows(2) {
                prop_assert!(pair[1].start >= pair[0].start);
                let shared = pair[0].end.saturating_sub(pair[1].start);
                prop_assert!(shared <= chunk_overlap as usize);
            }

            for (i, c) in chars.iter().enumerate() {
                if !c.is_whitespace() {
                    prop_assert!(segments.iter().any(|s| s.start <= i && i < s.end));
                }
            }
        }
    }
}
