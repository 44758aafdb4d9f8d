//! Splitting long text into size-limited blocks.
//!
//! Tabular command output is the typical input: a record starts at a line
//! beginning with a non-space character and continues over indented lines.
//!
//! ```text
//! VLAN  Name   Status    Ports
//! 132   Blue   active    Cpu, Po1, Po2, Po3
//!                        Po6, Po7, Po8
//! 133   Red    active    Cpu, Po1, Po2, Po3
//! ```
//!
//! Wrapping keeps each record in one piece whenever it fits, so a section
//! block never ends halfway through a VLAN. Records are handed to textwrap's
//! first-fit algorithm as fragments; widths count characters because that is
//! what the section limit counts.

use textwrap::core::Fragment;
use textwrap::wrap_algorithms::wrap_first_fit;

/// Maximum text length of a section block.
pub const SECTION_TEXT_LIMIT: usize = 3000;

/// Packs text blocks into chunks of at most `width` characters.
///
/// A block starts at a newline followed by a non-whitespace character. Blocks
/// are packed first-fit; a block longer than `width` is split at the width
/// when `break_long_words` is set and emitted whole otherwise. Chunks holding
/// only whitespace are dropped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextBlockWrapper {
    /// Maximum chunk length in characters.
    pub width: usize,
    /// Split blocks that are longer than `width`.
    pub break_long_words: bool,
}

impl Default for TextBlockWrapper {
    fn default() -> Self {
        Self::new(SECTION_TEXT_LIMIT)
    }
}

impl TextBlockWrapper {
    /// A wrapper producing chunks of at most `width` characters.
    pub fn new(width: usize) -> Self {
        Self {
            width,
            break_long_words: true,
        }
    }

    /// Set whether over-long blocks are split.
    pub fn with_break_long_words(mut self, break_long_words: bool) -> Self {
        self.break_long_words = break_long_words;
        self
    }

    /// Split `text` into chunks.
    pub fn wrap(&self, text: &str) -> Vec<String> {
        let width = self.width.max(1);
        let mut blocks = Vec::new();
        for block in split_blocks(text).into_iter().map(Block::new) {
            if block.record.is_empty() {
                continue;
            }
            if self.break_long_words && block.len() > width {
                blocks.extend(block.break_apart(width));
            } else {
                blocks.push(block);
            }
        }
        wrap_first_fit(&blocks, &[width as f64])
            .into_iter()
            .map(join)
            .filter(|chunk| !is_blank(chunk))
            .collect()
    }
}

/// One record and the whitespace that separates it from the next.
#[derive(Clone, Copy, Debug)]
struct Block<'a> {
    record: &'a str,
    trailing: &'a str,
}

impl<'a> Block<'a> {
    fn new(segment: &'a str) -> Self {
        let record = segment.trim_end();
        Self {
            record,
            trailing: &segment[record.len()..],
        }
    }

    fn len(&self) -> usize {
        self.record.chars().count()
    }

    fn break_apart(self, width: usize) -> Vec<Block<'a>> {
        let mut pieces = Vec::new();
        let mut rest = self.record;
        while let Some((idx, _)) = rest.char_indices().nth(width) {
            pieces.push(Block {
                record: &rest[..idx],
                trailing: "",
            });
            rest = &rest[idx..];
        }
        pieces.push(Block {
            record: rest,
            trailing: self.trailing,
        });
        pieces
    }
}

impl Fragment for Block<'_> {
    fn width(&self) -> f64 {
        self.len() as f64
    }

    fn whitespace_width(&self) -> f64 {
        self.trailing.chars().count() as f64
    }

    fn penalty_width(&self) -> f64 {
        0.0
    }
}

fn join(line: &[Block<'_>]) -> String {
    let mut chunk = String::new();
    for (idx, block) in line.iter().enumerate() {
        chunk.push_str(block.record);
        if idx + 1 < line.len() {
            chunk.push_str(block.trailing);
        }
    }
    chunk
}

/// Split after every newline that is followed by a non-whitespace character.
fn split_blocks(text: &str) -> Vec<&str> {
    let mut blocks = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();
    while let Some((idx, c)) = chars.next() {
        if c == '\n' && chars.peek().is_some_and(|(_, next)| !next.is_whitespace()) {
            blocks.push(&text[start..=idx]);
            start = idx + 1;
        }
    }
    if start < text.len() {
        blocks.push(&text[start..]);
    }
    blocks
}

fn is_blank(s: &str) -> bool {
    s.chars().all(char::is_whitespace)
}
