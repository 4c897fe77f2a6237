//! Boundary-aware sliding-window chunker.
//!
//! Each chunk holds at most `chunk_size` characters. Before falling back to a
//! hard cut, the window end is pulled back to the nearest paragraph break,
//! then sentence end, then word break. The next chunk starts `chunk_overlap`
//! characters before the previous one ended, so consecutive chunks always
//! share exactly `chunk_overlap` characters.

use super::{Chunk, ChunkingConfig};
use crate::ingest::Document;

/// Places a chunk may end, from most to least preferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    Paragraph,
    Sentence,
    Word,
}

impl Boundary {
    const PREFERENCE: [Boundary; 3] = [Boundary::Paragraph, Boundary::Sentence, Boundary::Word];

    /// Whether a cut between `chars[pos - 1]` and `chars[pos]` lands on this boundary.
    fn matches(self, chars: &[char], pos: usize) -> bool {
        if pos == 0 || pos >= chars.len() {
            return false;
        }
        let prev = chars[pos - 1];
        match self {
            Boundary::Paragraph => prev == '\n' && pos >= 2 && chars[pos - 2] == '\n',
            Boundary::Sentence => {
                prev == '\n'
                    || matches!(prev, '。' | '！' | '？' | '；')
                    || (matches!(prev, '.' | '!' | '?') && chars[pos].is_whitespace())
            }
            Boundary::Word => prev.is_whitespace(),
        }
    }
}

/// Splits documents into overlapping, boundary-aligned chunks.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecursiveChunker {
    config: ChunkingConfig,
}

impl RecursiveChunker {
    pub fn new(config: ChunkingConfig) -> Self {
        Self { config }
    }

    /// Lazily chunk a single document.
    pub fn chunks<'a>(&self, document: &'a Document) -> ChunkIter<'a> {
        ChunkIter::new(document, self.config)
    }

    /// Chunk a single document eagerly.
    pub fn split(&self, document: &Document) -> Vec<Chunk> {
        self.chunks(document).collect()
    }
}

/// Iterator over the chunks of one document.
pub struct ChunkIter<'a> {
    document: &'a Document,
    chars: Vec<char>,
    config: ChunkingConfig,
    start: usize,
    index: usize,
    done: bool,
}

impl<'a> ChunkIter<'a> {
    fn new(document: &'a Document, config: ChunkingConfig) -> Self {
        // Whitespace-only documents produce nothing to embed.
        let done = document.text.trim().is_empty();
        let chars = if done { Vec::new() } else { document.text.chars().collect() };
        Self {
            document,
            chars,
            config,
            start: 0,
            index: 0,
            done,
        }
    }

    /// Pick where the chunk starting at `self.start` ends, given it cannot reach the end of text.
    fn window_end(&self, hard_end: usize) -> usize {
        let size = self.config.chunk_size();
        let overlap = self.config.chunk_overlap();

        // The cut must leave room for progress past the overlap, and should not
        // shrink the chunk below half its size.
        let min_end = self.start + (overlap + 1).max(size / 2);

        for boundary in Boundary::PREFERENCE {
            if let Some(pos) = (min_end..=hard_end)
                .rev()
                .find(|&pos| boundary.matches(&self.chars, pos))
            {
                return pos;
            }
        }
        hard_end
    }
}

impl Iterator for ChunkIter<'_> {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        if self.done || self.start >= self.chars.len() {
            self.done = true;
            return None;
        }

        let len = self.chars.len();
        let hard_end = (self.start + self.config.chunk_size()).min(len);
        let end = if hard_end == len { len } else { self.window_end(hard_end) };

        let text: String = self.chars[self.start..end].iter().collect();
        let chunk = Chunk::new(&self.document.source, self.index, self.start, text);

        self.index += 1;
        if end == len {
            self.done = true;
        } else {
            self.start = end - self.config.chunk_overlap();
        }

        Some(chunk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunker(size: usize, overlap: usize) -> RecursiveChunker {
        RecursiveChunker::new(ChunkingConfig::new(size, overlap).unwrap())
    }

    /// Rebuild the text by dropping each chunk's overlapping prefix.
    fn reconstruct(chunks: &[Chunk], overlap: usize) -> String {
        let mut out = String::new();
        for (i, chunk) in chunks.iter().enumerate() {
            let skip = if i == 0 { 0 } else { overlap };
            out.extend(chunk.text.chars().skip(skip));
        }
        out
    }

    fn sample_text() -> String {
        let mut text = String::new();
        for p in 0..6 {
            for s in 0..5 {
                text.push_str(&format!("Paragraph {p} sentence {s} talks about towers and rivers. "));
            }
            text.push_str("\n\n");
        }
        text
    }

    #[test]
    fn test_short_document_is_single_chunk() {
        let doc = Document::new("a.txt", "The Eiffel Tower is in Paris.");
        let chunks = chunker(1000, 200).split(&doc);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, doc.text);
        assert_eq!(chunks[0].index, 0);
        assert_eq!(chunks[0].source, "a.txt");
    }

    #[test]
    fn test_empty_and_blank_documents_yield_nothing() {
        assert!(chunker(10, 2).split(&Document::new("e.txt", "")).is_empty());
        assert!(chunker(10, 2).split(&Document::new("w.txt", "  \n\n ")).is_empty());
    }

    #[test]
    fn test_chunks_respect_size_and_overlap() {
        let doc = Document::new("s.txt", sample_text());
        let (size, overlap) = (200, 40);
        let chunks = chunker(size, overlap).split(&doc);
        assert!(chunks.len() > 3);

        for chunk in &chunks {
            assert!(chunk.char_len <= size, "chunk {} too long", chunk.index);
        }
        for pair in chunks.windows(2) {
            let tail: String = pair[0].text.chars().skip(pair[0].char_len - overlap).collect();
            let head: String = pair[1].text.chars().take(overlap).collect();
            assert_eq!(tail, head);
            assert_eq!(pair[1].start, pair[0].end() - overlap);
            assert_eq!(pair[1].index, pair[0].index + 1);
        }
        assert_eq!(reconstruct(&chunks, overlap), doc.text);
    }

    #[test]
    fn test_prefers_paragraph_then_word_boundaries() {
        let text = format!("{}\n\n{}", "a".repeat(60), "word ".repeat(40));
        let doc = Document::new("p.txt", text);
        let chunks = chunker(100, 10).split(&doc);

        assert!(chunks[0].text.ends_with("\n\n"));
        // Later chunks have no paragraph or sentence breaks, so they end after a space.
        for chunk in &chunks[1..chunks.len() - 1] {
            assert!(chunk.text.ends_with(' '), "chunk {:?}", chunk.text);
        }
        assert_eq!(reconstruct(&chunks, 10), doc.text);
    }

    #[test]
    fn test_hard_cut_without_boundaries() {
        let doc = Document::new("x.txt", "x".repeat(25));
        let chunks = chunker(10, 3).split(&doc);
        let lens: Vec<usize> = chunks.iter().map(|c| c.char_len).collect();
        // Starts advance by chunk_size - overlap = 7.
        assert_eq!(lens, vec![10, 10, 10, 4]);
        assert_eq!(chunks.iter().map(|c| c.start).collect::<Vec<_>>(), vec![0, 7, 14, 21]);
        assert_eq!(reconstruct(&chunks, 3), doc.text);
    }

    #[test]
    fn test_multibyte_text_is_cut_on_characters() {
        let doc = Document::new("zh.txt", "艾菲爾鐵塔位於巴黎。".repeat(30));
        let chunks = chunker(50, 10).split(&doc);
        for chunk in &chunks {
            assert!(chunk.char_len <= 50);
        }
        assert!(chunks[0].text.ends_with('。'));
        assert_eq!(reconstruct(&chunks, 10), doc.text);
    }

    #[test]
    fn test_zero_overlap() {
        let doc = Document::new("z.txt", "one two three four five six seven eight nine ten");
        let chunks = chunker(12, 0).split(&doc);
        let joined: String = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(joined, doc.text);
    }

    #[test]
    fn test_iterator_is_lazy_and_finite() {
        let doc = Document::new("l.txt", "y".repeat(10_000));
        let mut iter = chunker(100, 99).chunks(&doc);
        assert_eq!(iter.next().map(|c| c.start), Some(0));
        assert_eq!(iter.next().map(|c| c.start), Some(1));
        assert!(iter.count() > 0);
    }
}
