//! Recursive character splitter with overlap
//!
//! Text is cut at the coarsest boundary that yields pieces no longer than the
//! chunk size: paragraphs, then lines, then sentences, then words, and only
//! then individual characters. Pieces keep their trailing separator so that
//! they tile the source text exactly. Pieces are then packed greedily into
//! chunks, carrying up to `chunk_overlap` characters of whole pieces forward.

use std::collections::VecDeque;
use unicode_segmentation::UnicodeSegmentation;

use crate::config::ChunkingConfig;
use crate::error::{Error, Result};
use crate::types::{Chunk, MinimalDocument};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SplitLevel {
    Separator(&'static str),
    Sentence,
    Character,
}

const LEVELS: &[SplitLevel] = &[
    SplitLevel::Separator("\n\n"),
    SplitLevel::Separator("\n"),
    SplitLevel::Sentence,
    SplitLevel::Separator(" "),
    SplitLevel::Character,
];

/// A chunk-sized slice of a text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextSpan<'a> {
    /// Char offset of the slice within the text
    pub start: usize,
    pub text: &'a str,
}

#[derive(Debug, Clone, Copy)]
struct Piece {
    byte_start: usize,
    char_start: usize,
    byte_len: usize,
    char_len: usize,
}

/// Splitter with a character budget and overlap
#[derive(Debug, Clone)]
pub struct RecursiveTextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl RecursiveTextSplitter {
    /// Create a splitter; `chunk_overlap` must be smaller than `chunk_size`
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::config("chunk_size must be positive"));
        }
        if chunk_overlap >= chunk_size {
            return Err(Error::config(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                chunk_overlap, chunk_size
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn from_config(config: &ChunkingConfig) -> Result<Self> {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split every document, numbering chunks per document
    pub fn split_documents(&self, docs: &[MinimalDocument]) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        for doc in docs {
            chunks.extend(self.split_text(&doc.text).into_iter().enumerate().map(
                |(i, span)| Chunk {
                    text: span.text.to_string(),
                    source: doc.source.clone(),
                    chunk_index: i as u32,
                    start: span.start,
                },
            ));
        }
        chunks
    }

    /// Split one text into overlapping spans
    pub fn split_text<'a>(&self, text: &'a str) -> Vec<TextSpan<'a>> {
        let mut pieces = Vec::new();
        self.collect_pieces(text, LEVELS, &mut pieces);
        self.merge(text, &pieces)
    }

    fn collect_pieces<'a>(&self, text: &'a str, levels: &[SplitLevel], out: &mut Vec<&'a str>) {
        if text.is_empty() {
            return;
        }
        if char_len(text) <= self.chunk_size {
            out.push(text);
            return;
        }

        let Some((level, rest)) = levels.split_first() else {
            push_chars(text, out);
            return;
        };

        let segments: Vec<&'a str> = match level {
            SplitLevel::Separator(sep) => text.split_inclusive(*sep).collect(),
            SplitLevel::Sentence => text.split_sentence_bounds().collect(),
            SplitLevel::Character => {
                push_chars(text, out);
                return;
            }
        };

        // Separator absent: this level cannot help
        if segments.len() <= 1 {
            self.collect_pieces(text, rest, out);
            return;
        }

        for segment in segments {
            if char_len(segment) <= self.chunk_size {
                out.push(segment);
            } else {
                self.collect_pieces(segment, rest, out);
            }
        }
    }

    fn merge<'a>(&self, text: &'a str, pieces: &[&'a str]) -> Vec<TextSpan<'a>> {
        let mut spans = Vec::new();
        let mut window: VecDeque<Piece> = VecDeque::new();
        let mut total = 0usize;
        let mut byte_pos = 0usize;
        let mut char_pos = 0usize;

        for piece in pieces {
            let piece = Piece {
                byte_start: byte_pos,
                char_start: char_pos,
                byte_len: piece.len(),
                char_len: char_len(piece),
            };
            byte_pos += piece.byte_len;
            char_pos += piece.char_len;

            if total + piece.char_len > self.chunk_size && !window.is_empty() {
                emit(text, &window, &mut spans);
                while let Some(front) = window.front() {
                    if total > self.chunk_overlap || total + piece.char_len > self.chunk_size {
                        total -= front.char_len;
                        window.pop_front();
                    } else {
                        break;
                    }
                }
            }

            total += piece.char_len;
            window.push_back(piece);
        }

        if !window.is_empty() {
            emit(text, &window, &mut spans);
        }

        spans
    }
}

fn emit<'a>(text: &'a str, window: &VecDeque<Piece>, spans: &mut Vec<TextSpan<'a>>) {
    let (Some(first), Some(last)) = (window.front(), window.back()) else {
        return;
    };
    let slice = &text[first.byte_start..last.byte_start + last.byte_len];
    if slice.trim().is_empty() {
        return;
    }
    spans.push(TextSpan {
        start: first.char_start,
        text: slice,
    });
}

fn push_chars<'a>(text: &'a str, out: &mut Vec<&'a str>) {
    out.extend(
        text.char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()]),
    );
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}
