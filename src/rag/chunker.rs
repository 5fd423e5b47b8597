//! Recursive separator-based text chunking.
//!
//! Text is split on the widest separator present (paragraph, line, sentence
//! punctuation, space, character), oversized pieces are split again with the
//! remaining separators, and the resulting pieces are merged greedily up to
//! `chunk_size` characters with up to `chunk_overlap` characters of trailing
//! context carried into the next chunk.
//!
//! All work happens on byte ranges of the source text, so every [`Chunk`] is a
//! contiguous slice of its [`Document`]. Lengths are counted in `char`s.

use std::collections::VecDeque;
use std::ops::Range;

use crate::types::{AppError, Chunk, Document, Result};

/// Separators tried in order, widest granularity first. The trailing empty
/// string means "split into characters".
pub const DEFAULT_SEPARATORS: &[&str] = &[
    "\n\n", "\n", "。", "！", "？", "；", "，", ". ", "! ", "? ", " ", "",
];

#[derive(Debug, Clone)]
pub struct Chunker {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl Chunker {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(AppError::Config("chunk_size must be positive".into()));
        }
        if chunk_overlap >= chunk_size {
            return Err(AppError::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                chunk_overlap, chunk_size
            )));
        }

        Ok(Self {
            chunk_size,
            chunk_overlap,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        })
    }

    pub fn with_separators<I, S>(mut self, separators: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.separators = separators.into_iter().map(Into::into).collect();
        self
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Splits `document` into ordered, non-empty chunks.
    pub fn split<'a>(&self, document: &'a Document) -> Vec<Chunk<'a>> {
        let text = document.text.as_str();
        let mut ranges = Vec::new();
        self.split_range(text, 0..text.len(), &self.separators, &mut ranges);

        let mut chunks = Vec::with_capacity(ranges.len());
        let mut cursor = 0;
        let mut line = 1;
        for (index, range) in ranges.into_iter().enumerate() {
            // Starts are strictly increasing, so line numbers are counted once.
            line += count_newlines(&text[cursor..range.start]);
            cursor = range.start;

            let content = &text[range.clone()];
            chunks.push(Chunk {
                content,
                source: document.source.as_str(),
                index,
                start: range.start,
                line_from: line,
                line_to: line + count_newlines(content),
            });
        }

        tracing::debug!(
            source = %document.source,
            chunks = chunks.len(),
            chunk_size = self.chunk_size,
            chunk_overlap = self.chunk_overlap,
            "Document split"
        );

        chunks
    }

    fn split_range(
        &self,
        doc: &str,
        range: Range<usize>,
        separators: &[String],
        out: &mut Vec<Range<usize>>,
    ) {
        let text = &doc[range.clone()];

        let Some((separator, remaining)) = pick_separator(text, separators) else {
            self.hard_split(doc, range, out);
            return;
        };

        let mut good: Vec<(Range<usize>, usize)> = Vec::new();
        for piece in split_keep_start(text, separator) {
            let piece = (piece.start + range.start)..(piece.end + range.start);
            let len = doc[piece.clone()].chars().count();

            if len < self.chunk_size {
                good.push((piece, len));
                continue;
            }

            if !good.is_empty() {
                self.merge(doc, &good, out);
                good.clear();
            }

            if remaining.is_empty() {
                self.hard_split(doc, piece, out);
            } else {
                self.split_range(doc, piece, remaining, out);
            }
        }

        if !good.is_empty() {
            self.merge(doc, &good, out);
        }
    }

    /// Greedily merges contiguous pieces into chunks of at most `chunk_size`
    /// characters, keeping up to `chunk_overlap` characters of the previous
    /// chunk's tail at the start of the next one.
    fn merge(&self, doc: &str, pieces: &[(Range<usize>, usize)], out: &mut Vec<Range<usize>>) {
        let mut current: VecDeque<usize> = VecDeque::new();
        let mut total = 0usize;

        for (i, (_, len)) in pieces.iter().enumerate() {
            if total + len > self.chunk_size && !current.is_empty() {
                emit(doc, span(pieces, &current), out);

                while total > self.chunk_overlap
                    || (total + len > self.chunk_size && total > 0)
                {
                    match current.pop_front() {
                        Some(front) => total -= pieces[front].1,
                        None => break,
                    }
                }
            }

            current.push_back(i);
            total += len;
        }

        if !current.is_empty() {
            emit(doc, span(pieces, &current), out);
        }
    }

    /// Last resort for text with no usable separator: fixed windows of
    /// `chunk_size` characters.
    fn hard_split(&self, doc: &str, range: Range<usize>, out: &mut Vec<Range<usize>>) {
        let text = &doc[range.clone()];
        let mut window_start = 0;
        let mut count = 0;

        for (offset, _) in text.char_indices() {
            if count == self.chunk_size {
                emit(doc, (range.start + window_start)..(range.start + offset), out);
                window_start = offset;
                count = 0;
            }
            count += 1;
        }

        if window_start < text.len() {
            emit(doc, (range.start + window_start)..range.end, out);
        }
    }
}

/// Convenience wrapper mirroring the chunking contract in one call.
pub fn split<'a>(
    document: &'a Document,
    chunk_size: usize,
    chunk_overlap: usize,
    separators: &[&str],
) -> Result<Vec<Chunk<'a>>> {
    let chunker =
        Chunker::new(chunk_size, chunk_overlap)?.with_separators(separators.iter().copied());
    Ok(chunker.split(document))
}

/// First separator that is empty or occurs in `text`, plus the finer
/// separators left for recursion.
fn pick_separator<'s>(text: &str, separators: &'s [String]) -> Option<(&'s str, &'s [String])> {
    for (i, sep) in separators.iter().enumerate() {
        if sep.is_empty() {
            return Some(("", &separators[..0]));
        }
        if text.contains(sep.as_str()) {
            return Some((sep.as_str(), &separators[i + 1..]));
        }
    }

    separators
        .last()
        .map(|sep| (sep.as_str(), &separators[..0]))
}

/// Splits `text` before every occurrence of `separator`, so each separator
/// stays attached to the start of the following piece. Empty pieces are
/// dropped; an empty separator yields single characters.
fn split_keep_start(text: &str, separator: &str) -> Vec<Range<usize>> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(i, c)| i..i + c.len_utf8())
            .collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    for (pos, _) in text.match_indices(separator) {
        if pos > start {
            pieces.push(start..pos);
        }
        start = pos;
    }
    if start < text.len() {
        pieces.push(start..text.len());
    }
    pieces
}

fn span(pieces: &[(Range<usize>, usize)], current: &VecDeque<usize>) -> Range<usize> {
    match (current.front(), current.back()) {
        (Some(&first), Some(&last)) => pieces[first].0.start..pieces[last].0.end,
        _ => 0..0,
    }
}

/// Pushes the trimmed range unless it is blank.
fn emit(doc: &str, range: Range<usize>, out: &mut Vec<Range<usize>>) {
    let text = &doc[range.clone()];
    let start = range.start + (text.len() - text.trim_start().len());
    let end = range.start + text.trim_end().len();
    if start < end {
        out.push(start..end);
    }
}

fn count_newlines(text: &str) -> usize {
    text.bytes().filter(|b| *b == b'\n').count()
}
