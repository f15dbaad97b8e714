use crate::error::IngestError;
use crate::extractor::FileKind;
use crate::models::{ChunkRecord, IngestionOptions, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use regex::Regex;
use sha2::{Digest, Sha256};

const SENTENCE_END_PATTERN: &str = r"[.!?]\s";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl From<&IngestionOptions> for ChunkingConfig {
    fn from(value: &IngestionOptions) -> Self {
        Self {
            chunk_size: value.chunk_size,
            chunk_overlap: value.chunk_overlap,
        }
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<(), IngestError> {
        if self.chunk_size == 0 {
            return Err(IngestError::InvalidChunkConfig(
                "chunk_size must be greater than zero".to_string(),
            ));
        }

        if self.chunk_overlap >= self.chunk_size {
            return Err(IngestError::InvalidChunkConfig(format!(
                "chunk_overlap {} must be smaller than chunk_size {}",
                self.chunk_overlap, self.chunk_size
            )));
        }

        Ok(())
    }
}

/// A contiguous byte range of the text handed to [`TextSplitter::split`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextSpan<'a> {
    pub start: usize,
    pub end: usize,
    pub text: &'a str,
}

/// Splits text into overlapping windows of at most `chunk_size` characters.
///
/// Each window is cut at the last paragraph break in its second half, else
/// the last line break, sentence end, or whitespace, else at the hard limit.
/// The next window starts `chunk_overlap` characters before the cut (never
/// more than half the chunk), moved to a word start inside the chunk when one
/// exists. Spans always cover the whole input and consecutive spans overlap
/// whenever the overlap is non-zero and the earlier chunk has two characters.
#[derive(Debug, Clone)]
pub struct TextSplitter {
    config: ChunkingConfig,
    sentence_end: Regex,
}

impl TextSplitter {
    pub fn new(config: ChunkingConfig) -> Result<Self, IngestError> {
        config.validate()?;

        Ok(Self {
            config,
            sentence_end: Regex::new(SENTENCE_END_PATTERN)?,
        })
    }

    pub fn split<'a>(&self, text: &'a str) -> Vec<TextSpan<'a>> {
        let mut spans = Vec::new();
        let mut start = 0;

        while start < text.len() {
            let hard_end = advance_chars(text, start, self.config.chunk_size);
            if hard_end >= text.len() {
                spans.push(TextSpan {
                    start,
                    end: text.len(),
                    text: &text[start..],
                });
                break;
            }

            let end = start + self.find_break(&text[start..hard_end]);
            spans.push(TextSpan {
                start,
                end,
                text: &text[start..end],
            });
            start = self.next_start(text, start, end);
        }

        spans
    }

    /// Returns the cut position within `window`, always past its midpoint.
    fn find_break(&self, window: &str) -> usize {
        let min = window.len() / 2;
        let past_min = |cut: usize| cut > min;

        window
            .rfind("\n\n")
            .map(|pos| pos + 2)
            .filter(|cut| past_min(*cut))
            .or_else(|| window.rfind('\n').map(|pos| pos + 1).filter(|cut| past_min(*cut)))
            .or_else(|| {
                self.sentence_end
                    .find_iter(window)
                    .last()
                    .map(|found| found.end())
                    .filter(|cut| past_min(*cut))
            })
            .or_else(|| {
                window
                    .char_indices()
                    .rev()
                    .find(|(_, ch)| ch.is_whitespace())
                    .map(|(pos, ch)| pos + ch.len_utf8())
                    .filter(|cut| past_min(*cut))
            })
            .unwrap_or(window.len())
    }

    fn next_start(&self, text: &str, start: usize, end: usize) -> usize {
        let offsets = text[start..end]
            .char_indices()
            .map(|(offset, _)| start + offset)
            .collect::<Vec<_>>();
        // Overlap is capped at half the chunk.
        let half = offsets.len() / 2;
        let back = self.config.chunk_overlap.min(half);
        if back == 0 {
            return end;
        }

        let candidate = offsets[offsets.len() - back];
        if text[..candidate].ends_with(char::is_whitespace) {
            return candidate;
        }

        let last_char = offsets[offsets.len() - 1];
        let forward = text[candidate..last_char]
            .char_indices()
            .find(|(_, ch)| ch.is_whitespace())
            .map(|(offset, ch)| candidate + offset + ch.len_utf8());
        if let Some(word_start) = forward {
            return word_start;
        }

        let floor = offsets[offsets.len() - half - 1];
        text[floor..candidate]
            .char_indices()
            .rev()
            .find(|(_, ch)| ch.is_whitespace())
            .map(|(offset, ch)| floor + offset + ch.len_utf8())
            .unwrap_or(candidate)
    }
}

/// Byte offset reached after moving `count` characters forward from `from`.
fn advance_chars(text: &str, from: usize, count: usize) -> usize {
    text[from..]
        .char_indices()
        .nth(count)
        .map(|(offset, _)| from + offset)
        .unwrap_or(text.len())
}

pub fn build_chunk_records(
    source_path: &str,
    file_kind: FileKind,
    text: &str,
    splitter: &TextSplitter,
) -> Vec<ChunkRecord> {
    splitter
        .split(text)
        .into_iter()
        .enumerate()
        .map(|(index, span)| {
            let chunk_index = index as u64;
            ChunkRecord {
                chunk_id: make_chunk_id(source_path, chunk_index, span.text),
                source_path: source_path.to_string(),
                file_kind,
                chunk_index,
                content: span.text.to_string(),
                start_offset: span.start,
                end_offset: span.end,
            }
        })
        .collect()
}

/// Rebuilds one document's text from its chunks, dropping the overlapping prefixes.
///
/// Chunks must belong to a single source and be in `chunk_index` order.
pub fn stitch_chunks(chunks: &[ChunkRecord]) -> String {
    let mut text = String::new();
    let mut covered = 0;

    for chunk in chunks {
        if chunk.end_offset <= covered && !text.is_empty() {
            continue;
        }
        let skip = covered.saturating_sub(chunk.start_offset);
        text.push_str(&chunk.content[skip..]);
        covered = chunk.end_offset;
    }

    text
}

fn make_chunk_id(source_path: &str, index: u64, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source_path.as_bytes());
    hasher.update(index.to_le_bytes());
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn splitter(chunk_size: usize, chunk_overlap: usize) -> TextSplitter {
        TextSplitter::new(ChunkingConfig {
            chunk_size,
            chunk_overlap,
        })
        .expect("valid config")
    }

    fn assert_covers(text: &str, spans: &[TextSpan<'_>]) {
        assert_eq!(spans.first().map(|span| span.start), Some(0));
        assert_eq!(spans.last().map(|span| span.end), Some(text.len()));
        for pair in spans.windows(2) {
            assert!(pair[1].start > pair[0].start);
            assert!(pair[1].start <= pair[0].end, "gap between chunks");
        }
    }

    #[test]
    fn empty_text_has_no_chunks() {
        assert!(splitter(100, 10).split("").is_empty());
    }

    #[test]
    fn short_text_is_a_single_chunk() {
        let spans = splitter(100, 10).split("Learn SQL, then Rust.");
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].text, "Learn SQL, then Rust.");
    }

    #[test]
    fn chunks_respect_the_character_limit() {
        let text = "word ".repeat(300);
        let spans = splitter(50, 10).split(&text);
        assert!(spans.len() > 1);
        for span in &spans {
            assert!(span.text.chars().count() <= 50);
        }
        assert_covers(&text, &spans);
    }

    #[test]
    fn paragraph_breaks_are_preferred() {
        let text = format!("{}\n\n{}", "a".repeat(30), "b".repeat(30));
        let spans = splitter(40, 5).split(&text);
        assert_eq!(spans[0].text, format!("{}\n\n", "a".repeat(30)));
    }

    #[test]
    fn sentence_ends_are_preferred_over_spaces() {
        let text = "Find a mentor early. Build small projects every week and ship them.";
        let spans = splitter(40, 0).split(text);
        assert_eq!(spans[0].text, "Find a mentor early. ");
        assert_covers(text, &spans);
    }

    #[test]
    fn unbroken_text_is_cut_at_the_limit() {
        let text = "x".repeat(95);
        let spans = splitter(40, 10).split(&text);
        assert_eq!(spans[0].text.len(), 40);
        assert_eq!(spans[1].start, 30);
        assert_covers(&text, &spans);
    }

    #[test]
    fn overlap_starts_at_a_word() {
        let text = "alpha beta gamma delta epsilon zeta eta theta iota kappa lambda";
        let spans = splitter(30, 12).split(text);
        for span in spans.iter().skip(1) {
            assert!(text[..span.start].ends_with(' '));
        }
        assert_covers(text, &spans);
    }

    #[test]
    fn short_chunks_still_overlap_the_next_one() {
        let cases = [
            (100, 80, format!("{}\n\n{}", "a".repeat(60), "b".repeat(200))),
            (300, 200, format!("{}\n\n{}", "word ".repeat(32), "x".repeat(400))),
            (40, 39, "Skills.\n\npython python python python python\n\n".repeat(6)),
            (10, 9, "ab\n\ncd\n\nef gh ij kl".to_string()),
        ];

        for (chunk_size, chunk_overlap, text) in cases {
            let spans = splitter(chunk_size, chunk_overlap).split(&text);
            assert_covers(&text, &spans);
            for (index, pair) in spans.windows(2).enumerate() {
                if pair[0].text.chars().count() > 1 {
                    assert!(
                        pair[1].start < pair[0].end,
                        "chunk {index} of {chunk_size}/{chunk_overlap} shares nothing with the next"
                    );
                }
            }
        }
    }

    #[test]
    fn overlap_backs_up_to_a_word_when_the_chunk_ends_in_whitespace() {
        let text = "aaaaaaaaa bbbbbbbbb cccccccccc";
        let spans = splitter(20, 5).split(text);
        assert_eq!(spans[0].text, "aaaaaaaaa bbbbbbbbb ");
        assert_eq!(spans[1].start, 10);
        assert_eq!(spans[1].text, "bbbbbbbbb cccccccccc");
    }

    #[test]
    fn multibyte_text_is_split_on_char_boundaries() {
        let text = "Ingénieur logiciel à Zürich — 5 ans d’expérience. ".repeat(20);
        let spans = splitter(37, 9).split(&text);
        assert_covers(&text, &spans);
        for span in &spans {
            assert!(span.text.chars().count() <= 37);
        }
    }

    #[test]
    fn stitched_chunks_reproduce_the_source_text() {
        let text = (0..40)
            .map(|index| format!("Paragraph {index} covers one career topic in detail."))
            .collect::<Vec<_>>()
            .join("\n\n");
        let records = build_chunk_records("roadmap.pdf", FileKind::Pdf, &text, &splitter(120, 30));

        assert!(records.len() > 1);
        assert_eq!(stitch_chunks(&records), text);
        for (index, record) in records.iter().enumerate() {
            assert_eq!(record.chunk_index, index as u64);
            assert_eq!(record.source_path, "roadmap.pdf");
        }
    }

    #[test]
    fn chunk_ids_are_deterministic() {
        let text = "Alpha.\n\nBeta.\n\nGamma.\n\nDelta.";
        let first = build_chunk_records("a.docx", FileKind::Docx, text, &splitter(12, 3));
        let second = build_chunk_records("a.docx", FileKind::Docx, text, &splitter(12, 3));
        assert_eq!(first, second);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let result = TextSplitter::new(ChunkingConfig {
            chunk_size: 10,
            chunk_overlap: 10,
        });
        assert!(matches!(result, Err(IngestError::InvalidChunkConfig(_))));
    }
}
