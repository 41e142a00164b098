//! The document buffer seen by the engines.
//!
//! Hosts own the buffer between calls; every operation borrows it through
//! `TextBuffer`, plans its edits, and returns a rewritten copy. The engines
//! themselves build their working copies as `EditorRope`s. Offsets in this
//! API are always char offsets (Unicode scalar values); the byte
//! conversions exist for embedders that must talk to byte- or UTF-16-
//! indexed surfaces.

use std::ops::Range;

use smol_str::{SmolStr, ToSmolStr};

/// Read and edit access to a document buffer, addressed in char offsets.
pub trait TextBuffer {
    fn len_chars(&self) -> usize;

    /// Length in UTF-8 bytes.
    fn len_bytes(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len_chars() == 0
    }

    /// Insert `text` before the char at `char_offset`.
    fn insert(&mut self, char_offset: usize, text: &str);

    fn delete(&mut self, char_range: Range<usize>);

    fn replace(&mut self, char_range: Range<usize>, text: &str) {
        self.delete(char_range.clone());
        self.insert(char_range.start, text);
    }

    /// Copy out a range. None when the range runs past the end.
    fn slice(&self, char_range: Range<usize>) -> Option<SmolStr>;

    /// The char at an offset. None past the end.
    fn char_at(&self, char_offset: usize) -> Option<char>;

    /// The whole buffer as an owned `String`.
    fn to_string(&self) -> String;

    fn char_to_byte(&self, char_offset: usize) -> usize;

    fn byte_to_char(&self, byte_offset: usize) -> usize;
}

/// Rope-backed buffer: O(log n) edits and offset conversions, so working
/// copies stay cheap even for large documents.
#[derive(Clone, Default)]
pub struct EditorRope {
    rope: ropey::Rope,
}

impl EditorRope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_str(s: &str) -> Self {
        Self {
            rope: ropey::Rope::from_str(s),
        }
    }

    /// The underlying rope, for callers that need its richer API.
    pub fn rope(&self) -> &ropey::Rope {
        &self.rope
    }
}

impl TextBuffer for EditorRope {
    fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    fn len_bytes(&self) -> usize {
        self.rope.len_bytes()
    }

    fn insert(&mut self, char_offset: usize, text: &str) {
        self.rope.insert(char_offset, text);
    }

    fn delete(&mut self, char_range: Range<usize>) {
        self.rope.remove(char_range);
    }

    fn slice(&self, char_range: Range<usize>) -> Option<SmolStr> {
        if char_range.end > self.rope.len_chars() {
            return None;
        }
        Some(self.rope.slice(char_range).to_smolstr())
    }

    fn char_at(&self, char_offset: usize) -> Option<char> {
        if char_offset >= self.rope.len_chars() {
            return None;
        }
        Some(self.rope.char(char_offset))
    }

    fn to_string(&self) -> String {
        self.rope.to_string()
    }

    fn char_to_byte(&self, char_offset: usize) -> usize {
        self.rope.char_to_byte(char_offset)
    }

    fn byte_to_char(&self, byte_offset: usize) -> usize {
        self.rope.byte_to_char(byte_offset)
    }
}

impl From<&str> for EditorRope {
    fn from(s: &str) -> Self {
        Self::from_str(s)
    }
}

impl From<String> for EditorRope {
    fn from(s: String) -> Self {
        Self::from_str(&s)
    }
}
