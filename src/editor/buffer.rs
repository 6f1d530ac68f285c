//! Document buffer backed by ropey
//!
//! Holds the markdown source being previewed. Every edit bumps the version so
//! the preview session can tell which text a layout pass was computed from.

use crate::markdown::PAGE_BREAK_MARKER;
use ropey::Rope;

/// Line ending style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum LineEnding {
    /// Unix-style line endings (LF: \n)
    #[default]
    Lf,
    /// Windows-style line endings (CRLF: \r\n)
    Crlf,
}

impl LineEnding {
    /// Detect line ending from text
    fn detect(text: &str) -> Self {
        if text.contains("\r\n") {
            LineEnding::Crlf
        } else {
            LineEnding::Lf
        }
    }
}

/// Markdown source with a monotonically increasing version
#[derive(Debug, Clone)]
pub struct DocumentBuffer {
    rope: Rope,

    /// Line ending of the loaded file, restored on `text()`
    line_ending: LineEnding,

    /// Incremented on each change
    version: u64,
}

impl DocumentBuffer {
    /// Create a buffer from document text
    pub fn from_text(text: &str) -> Self {
        let line_ending = LineEnding::detect(text);
        // Normalize to LF internally
        let normalized = text.replace("\r\n", "\n");
        Self {
            rope: Rope::from_str(&normalized),
            line_ending,
            version: 0,
        }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    /// Convert (line, column) to character offset, clamping the column
    pub fn line_col_to_char(&self, line: usize, col: usize) -> Option<usize> {
        if line >= self.rope.len_lines() {
            return None;
        }
        let line_start = self.rope.line_to_char(line);
        let content = self.rope.line(line);
        let line_len = content
            .chars()
            .take_while(|&c| c != '\n' && c != '\r')
            .count();
        Some(line_start + col.min(line_len))
    }

    /// Insert text at character position
    fn insert(&mut self, char_idx: usize, text: &str) {
        if text.is_empty() {
            return;
        }
        let idx = char_idx.min(self.rope.len_chars());
        self.rope.insert(idx, &text.replace("\r\n", "\n"));
        self.version += 1;
    }

    /// Insert an explicit page break at `char_idx`.
    ///
    /// The marker is surrounded by blank lines so it always parses as its own
    /// HTML block. Returns the offset just past the inserted text.
    pub fn insert_page_break(&mut self, char_idx: usize) -> usize {
        let idx = char_idx.min(self.rope.len_chars());
        let snippet = format!("\n\n{}\n\n", PAGE_BREAK_MARKER);
        let inserted = snippet.chars().count();
        self.insert(idx, &snippet);
        idx + inserted
    }

    /// Replace the whole document. No-op when the text is unchanged.
    pub fn set_text(&mut self, text: &str) {
        let normalized = text.replace("\r\n", "\n");
        if self.rope == normalized.as_str() {
            return;
        }
        self.line_ending = LineEnding::detect(text);
        self.rope = Rope::from_str(&normalized);
        self.version += 1;
    }

    /// Document text with LF line endings, as fed to the renderer
    pub fn normalized_text(&self) -> String {
        self.rope.to_string()
    }

    /// Document text with the original line endings restored
    pub fn text(&self) -> String {
        let content = self.rope.to_string();
        match self.line_ending {
            LineEnding::Lf => content,
            LineEnding::Crlf => content.replace('\n', "\r\n"),
        }
    }
}
