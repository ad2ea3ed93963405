//! Byte offset ↔ line/column conversion
//!
//! Columns are counted in UTF-16 code units, the unit editors speak.

use crate::span::Span;
use serde::{Deserialize, Serialize};

/// Zero-based line and UTF-16 column
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct LineCol {
    pub line: u32,
    pub col: u32,
}

impl LineCol {
    pub fn new(line: u32, col: u32) -> Self {
        Self { line, col }
    }
}

/// Start offsets of every line in a text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineIndex {
    line_starts: Vec<usize>,
    len: usize,
}

impl LineIndex {
    /// Lines end at `\n`, `\r\n`, or a lone `\r`, as in the LSP.
    pub fn new(text: &str) -> Self {
        let bytes = text.as_bytes();
        let mut line_starts = vec![0];
        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'\r' if bytes.get(i + 1) == Some(&b'\n') => {
                    i += 1;
                    line_starts.push(i + 1);
                }
                b'\n' | b'\r' => line_starts.push(i + 1),
                _ => {}
            }
            i += 1;
        }
        Self {
            line_starts,
            len: text.len(),
        }
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Line and UTF-16 column of `offset`; offsets past the end clamp to it
    pub fn line_col(&self, text: &str, offset: usize) -> LineCol {
        let offset = offset.min(self.len);
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        let start = self.line_starts[line];
        let col = text
            .get(start..offset)
            .map(|prefix| prefix.encode_utf16().count())
            .unwrap_or(0);
        LineCol::new(line as u32, col as u32)
    }

    /// Byte offset of a line/column, or `None` if it lies outside the text.
    ///
    /// A column past the end of its line is rejected; the end of a line
    /// (just before its newline) is accepted.
    pub fn offset(&self, text: &str, position: LineCol) -> Option<usize> {
        let start = *self.line_starts.get(position.line as usize)?;
        let end = self
            .line_starts
            .get(position.line as usize + 1)
            .copied()
            .unwrap_or(self.len);
        let line = text.get(start..end)?;
        let line = line.strip_suffix('\n').unwrap_or(line);
        let line = line.strip_suffix('\r').unwrap_or(line);

        let mut units = 0;
        for (i, ch) in line.char_indices() {
            if units == position.col as usize {
                return Some(start + i);
            }
            units += ch.len_utf16();
            if units > position.col as usize {
                // column falls inside a surrogate pair
                return None;
            }
        }
        (units == position.col as usize).then_some(start + line.len())
    }

    /// Convert a byte span to a pair of line/columns
    pub fn range(&self, text: &str, span: Span) -> (LineCol, LineCol) {
        (self.line_col(text, span.start), self.line_col(text, span.end))
    }
}
