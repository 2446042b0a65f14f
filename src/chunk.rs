//! Recursive size-bounded text chunker.
//!
//! Splits extracted document text into overlapping chunks that respect a
//! configurable character budget. Splitting prefers paragraph boundaries
//! (`\n\n`), then line boundaries, then spaces, then hard character cuts,
//! so chunks stay semantically coherent when the text allows it.
//!
//! Chunks whose trimmed length falls below `min_chunk_len` are discarded
//! rather than indexed as near-empty fragments.

use crate::config::ChunkingConfig;
use crate::models::Chunk;

/// Fallback ladder: paragraphs, lines, spaces, then raw character cuts.
const SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// Split `text` into chunk strings, in document order.
///
/// Deterministic: identical input and parameters produce an identical
/// sequence. Consecutive chunks overlap by at most `chunk_overlap`
/// characters. Every returned chunk is trimmed and at least
/// `min_chunk_len` characters long.
pub fn split_text(text: &str, config: &ChunkingConfig) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let pieces = split_pieces(text, &SEPARATORS, config.chunk_size);
    let merged = merge_with_overlap(&pieces, config.chunk_size, config.chunk_overlap);

    merged
        .iter()
        .map(|c| c.trim().to_string())
        .filter(|c| char_len(c) >= config.min_chunk_len)
        .collect()
}

/// Split `text` and wrap the surviving chunks as [`Chunk`]s with contiguous
/// ordinals starting at 0.
pub fn chunk_document(source: &str, text: &str, config: &ChunkingConfig) -> Vec<Chunk> {
    split_text(text, config)
        .into_iter()
        .enumerate()
        .map(|(ordinal, text)| Chunk::new(source, ordinal, text))
        .collect()
}

/// Recursively break `text` into pieces no longer than `chunk_size`
/// characters, keeping each separator attached to the piece it terminates
/// so that merging is pure concatenation.
fn split_pieces(text: &str, separators: &[&str], chunk_size: usize) -> Vec<String> {
    if char_len(text) <= chunk_size {
        return vec![text.to_string()];
    }

    let sep = match separators.first() {
        Some(s) if !s.is_empty() => *s,
        _ => return hard_cut(text, chunk_size),
    };

    let parts: Vec<&str> = text.split_inclusive(sep).collect();
    if parts.len() == 1 {
        // Separator absent at this level; try the next finer one.
        return split_pieces(text, &separators[1..], chunk_size);
    }

    let mut out = Vec::new();
    for part in parts {
        if char_len(part) <= chunk_size {
            out.push(part.to_string());
        } else {
            out.extend(split_pieces(part, &separators[1..], chunk_size));
        }
    }
    out
}

/// Cut every `chunk_size` characters, respecting UTF-8 boundaries.
fn hard_cut(text: &str, chunk_size: usize) -> Vec<String> {
    let mut out = Vec::new();
    let mut buf = String::new();
    let mut count = 0;
    for ch in text.chars() {
        buf.push(ch);
        count += 1;
        if count == chunk_size {
            out.push(std::mem::take(&mut buf));
            count = 0;
        }
    }
    if !buf.is_empty() {
        out.push(buf);
    }
    out
}

/// Greedily pack pieces into chunks of at most `chunk_size` characters,
/// seeding each new chunk with up to `overlap` trailing characters of the
/// previous one so context survives the boundary.
fn merge_with_overlap(pieces: &[String], chunk_size: usize, overlap: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for piece in pieces {
        let piece_len = char_len(piece);
        if !current.is_empty() && char_len(&current) + piece_len > chunk_size {
            let seed_budget = chunk_size.saturating_sub(piece_len).min(overlap);
            let seed = char_tail(&current, seed_budget);
            chunks.push(std::mem::take(&mut current));
            // Drop leading whitespace so the next chunk never opens mid-separator.
            current = seed.trim_start().to_string();
        }
        current.push_str(piece);
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// The last `n` characters of `s`, at a character boundary.
fn char_tail(s: &str, n: usize) -> String {
    if n == 0 {
        return String::new();
    }
    let total = char_len(s);
    s.chars().skip(total.saturating_sub(n)).collect()
}
