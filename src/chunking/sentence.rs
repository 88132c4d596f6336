//! Sentence-packing chunker.

use super::{ChunkSpan, ChunkingConfig};

const TERMINATORS: [char; 3] = ['.', '!', '?'];
const CLOSERS: [char; 4] = ['"', '\'', ')', ']'];

/// A sentence located in the source text.
#[derive(Debug, Clone, Copy)]
struct Sentence {
    byte_start: usize,
    byte_end: usize,
    char_start: usize,
    char_end: usize,
}

/// Greedy sentence chunker with sentence-level overlap.
///
/// Text no longer than the chunk size comes back unchanged as a single
/// chunk, surrounding whitespace included. Longer text is cut into
/// contiguous slices that each start at a sentence start and end at a
/// sentence end. A sentence longer than the chunk size is emitted on its
/// own, never cut.
#[derive(Debug, Clone)]
pub struct SentenceChunker {
    size: usize,
    overlap: usize,
}

impl SentenceChunker {
    pub fn new(size: usize, overlap: usize) -> Self {
        Self {
            size: size.max(1),
            overlap,
        }
    }

    pub fn from_config(config: &ChunkingConfig) -> Self {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    /// Split text into ordered chunks.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        self.spans(text)
            .into_iter()
            .map(|span| span.slice(text).to_string())
            .collect()
    }

    /// Byte ranges of the chunks `chunk` would produce.
    ///
    /// Neighbouring spans overlap by the re-included sentences.
    pub fn spans(&self, text: &str) -> Vec<ChunkSpan> {
        let sentences = split_sentences(text);
        let mut spans = Vec::new();
        if sentences.is_empty() {
            return spans;
        }
        if text.chars().count() <= self.size {
            spans.push(ChunkSpan {
                start: 0,
                end: text.len(),
            });
            return spans;
        }

        let len = |first: usize, last: usize| sentences[last].char_end - sentences[first].char_start;

        let mut first = 0;
        let mut next = 0;
        while next < sentences.len() {
            // Drop carried-over sentences until the first new one fits.
            while first < next && len(first, next) > self.size {
                first += 1;
            }

            let mut last = next;
            next += 1;
            while next < sentences.len() && len(first, next) <= self.size {
                last = next;
                next += 1;
            }

            spans.push(ChunkSpan {
                start: sentences[first].byte_start,
                end: sentences[last].byte_end,
            });

            if next >= sentences.len() {
                break;
            }

            let mut carried = last + 1;
            while carried > first && len(carried - 1, last) <= self.overlap {
                carried -= 1;
            }
            first = carried.min(next);
        }

        spans
    }
}

impl Default for SentenceChunker {
    fn default() -> Self {
        Self::from_config(&ChunkingConfig::default())
    }
}

/// Locate sentences: runs of text ending in terminal punctuation that is
/// followed by whitespace or the end of the text.
fn split_sentences(text: &str) -> Vec<Sentence> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let byte_at = |i: usize| chars.get(i).map(|(b, _)| *b).unwrap_or(text.len());

    let mut sentences = Vec::new();
    let mut start: Option<usize> = None;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i].1;
        if start.is_none() {
            if c.is_whitespace() {
                i += 1;
                continue;
            }
            start = Some(i);
        }

        if TERMINATORS.contains(&c) {
            let mut j = i + 1;
            while j < chars.len() && (TERMINATORS.contains(&chars[j].1) || CLOSERS.contains(&chars[j].1)) {
                j += 1;
            }
            if j == chars.len() || chars[j].1.is_whitespace() {
                if let Some(s) = start.take() {
                    sentences.push(Sentence {
                        byte_start: byte_at(s),
                        byte_end: byte_at(j),
                        char_start: s,
                        char_end: j,
                    });
                }
            }
            i = j;
            continue;
        }

        i += 1;
    }

    // Trailing text without terminal punctuation.
    if let Some(s) = start {
        let mut end = chars.len();
        while end > s && chars[end - 1].1.is_whitespace() {
            end -= 1;
        }
        sentences.push(Sentence {
            byte_start: byte_at(s),
            byte_end: byte_at(end),
            char_start: s,
            char_end: end,
        });
    }

    sentences
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 59 characters, ends with a period.
    const LOREM: &str = "Lorem ipsum dolor sit amet, consectetur adipiscing elit ok.";

    fn lorem(count: usize) -> String {
        vec![LOREM; count].join(" ")
    }

    #[test]
    fn test_empty_input() {
        let chunker = SentenceChunker::new(800, 100);
        assert!(chunker.chunk("").is_empty());
        assert!(chunker.chunk("  \n\t ").is_empty());
    }

    #[test]
    fn test_short_text_is_single_chunk() {
        let chunker = SentenceChunker::new(800, 100);
        let text = "First sentence. Second one! A question? Trailing words";
        assert_eq!(chunker.chunk(text), vec![text.to_string()]);
    }

    #[test]
    fn test_short_text_keeps_surrounding_whitespace() {
        let chunker = SentenceChunker::new(800, 100);
        assert_eq!(chunker.chunk(" Hi. "), vec![" Hi. ".to_string()]);
        assert_eq!(chunker.chunk("\nTwo lines.\nSecond.\n"), vec!["\nTwo lines.\nSecond.\n".to_string()]);
    }

    #[test]
    fn test_chunks_respect_size() {
        let chunker = SentenceChunker::new(800, 100);
        let text = lorem(15);
        assert_eq!(text.chars().count(), 899);

        let chunks = chunker.chunk(&text);
        assert_eq!(chunks.len(), 2);
        assert!(chunks.iter().all(|c| c.chars().count() <= 800));
        assert_eq!(chunks[0], lorem(13));
        // One sentence of overlap, then the two remaining ones.
        assert_eq!(chunks[1], lorem(3));
    }

    #[test]
    fn test_oversized_sentence_is_not_split() {
        let chunker = SentenceChunker::new(20, 5);
        let long = "This sentence is much longer than twenty characters.";
        let text = format!("Short one. {} Tiny.", long);

        let chunks = chunker.chunk(&text);
        assert_eq!(chunks, vec!["Short one.", long, "Tiny."]);
    }

    #[test]
    fn test_overlap_reincludes_trailing_sentence() {
        let chunker = SentenceChunker::new(30, 10);
        let chunks = chunker.chunk("Aaaa bbb. Cccc ddd. Eeee fff. Ggg.");

        assert_eq!(chunks, vec!["Aaaa bbb. Cccc ddd. Eeee fff.", "Eeee fff. Ggg."]);
    }

    #[test]
    fn test_decimal_point_is_not_a_boundary() {
        let chunker = SentenceChunker::new(12, 0);
        let chunks = chunker.chunk("Pi is 3.14 roughly. Yes.");
        assert_eq!(chunks, vec!["Pi is 3.14 roughly.", "Yes."]);
    }

    #[test]
    fn test_rechunking_stitched_output_is_stable() {
        let chunker = SentenceChunker::new(120, 40);
        let text = "One sentence here. Another sentence follows it! Does a third appear? \
                    It does. The fourth is slightly longer than the others were. \
                    Five. Six is here too. Seven closes the paragraph.";

        let spans = chunker.spans(text);
        assert!(spans.len() > 1);

        // Strip the overlap: keep each chunk's text past the previous chunk's end.
        let mut stitched = spans[0].slice(text).to_string();
        for pair in spans.windows(2) {
            stitched.push_str(&text[pair[0].end..pair[1].end]);
        }

        assert_eq!(chunker.chunk(&stitched), chunker.chunk(text));
    }

    #[test]
    fn test_multibyte_text() {
        let chunker = SentenceChunker::new(10, 0);
        let chunks = chunker.chunk("Grüße dich. Ça va? Très bien.");
        assert_eq!(chunks, vec!["Grüße dich.", "Ça va?", "Très bien."]);
    }
}
