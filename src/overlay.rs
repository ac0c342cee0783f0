//! Deferred text edits over an immutable source string.
//!
//! Edits are recorded against byte offsets of the original text and applied in
//! one pass by [`EditOverlay::materialize`]. The original string is never
//! mutated, so every piece of output can be traced back to the offset it came
//! from, which is what the source map emitter relies on.

/// Whether an edit adds text at a point or replaces a range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum EditKind {
    Insert,
    Overwrite,
}

/// A single pending edit with position information.
#[derive(Debug, Clone)]
struct Edit {
    start: usize,
    end: usize,
    kind: EditKind,
    text: String,
    /// Issue order, used to keep inserts at one position stable.
    seq: usize,
}

/// A contiguous piece of materialized output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Chunk<'s> {
    /// Copied verbatim from the original starting at byte `start`.
    Original { start: usize, text: &'s str },
    /// Replaces an original range beginning at byte `start`.
    Replaced { start: usize, text: &'s str },
    /// New text with no counterpart in the original.
    Inserted { text: &'s str },
}

impl<'s> Chunk<'s> {
    pub fn text(&self) -> &'s str {
        match self {
            Chunk::Original { text, .. } | Chunk::Replaced { text, .. } | Chunk::Inserted { text } => {
                *text
            }
        }
    }
}

/// Ordered set of inserts and overwrites keyed by original offsets.
///
/// Overwrite ranges must be disjoint and no insert may land strictly inside an
/// overwritten range. Violations are programming errors and panic.
#[derive(Debug)]
pub struct EditOverlay<'a> {
    original: &'a str,
    edits: Vec<Edit>,
}

impl<'a> EditOverlay<'a> {
    pub fn new(original: &'a str) -> Self {
        Self {
            original,
            edits: Vec::new(),
        }
    }

    pub fn original(&self) -> &'a str {
        self.original
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// Schedules `text` to appear immediately before original byte `pos`.
    ///
    /// Several inserts at the same position come out in the order issued.
    pub fn insert(&mut self, pos: usize, text: impl Into<String>) {
        let text = text.into();
        self.check_offset(pos);
        if let Some(edit) = self
            .overwrites()
            .find(|edit| edit.start < pos && pos < edit.end)
        {
            panic!(
                "insert at {} falls inside overwritten range {}..{}",
                pos, edit.start, edit.end
            );
        }
        self.push(pos, pos, EditKind::Insert, text);
    }

    /// Schedules `text` at the end of the original.
    pub fn append(&mut self, text: impl Into<String>) {
        self.insert(self.original.len(), text);
    }

    /// Schedules the replacement of `original[start..end]` with `text`.
    ///
    /// A replacement that ends with the very text it replaces is recorded as an
    /// insert of the new prefix, so the kept text stays mapped character for
    /// character.
    pub fn overwrite(&mut self, start: usize, end: usize, text: impl Into<String>) {
        let text = text.into();
        assert!(start <= end, "overwrite range {}..{} is reversed", start, end);
        self.check_offset(start);
        self.check_offset(end);

        let original = self.original;
        let replaced = &original[start..end];
        if let Some(prefix) = text.strip_suffix(replaced) {
            if !prefix.is_empty() {
                self.insert(start, prefix.to_string());
            }
            return;
        }

        if let Some(edit) = self
            .overwrites()
            .find(|edit| edit.start < end && start < edit.end)
        {
            panic!(
                "overwrite {}..{} overlaps overwritten range {}..{}",
                start, end, edit.start, edit.end
            );
        }
        if let Some(edit) = self
            .edits
            .iter()
            .find(|edit| edit.kind == EditKind::Insert && start < edit.start && edit.start < end)
        {
            panic!(
                "overwrite {}..{} would swallow insert at {}",
                start, end, edit.start
            );
        }
        self.push(start, end, EditKind::Overwrite, text);
    }

    /// Applies every edit against the original text in offset order.
    pub fn materialize(&self) -> Vec<Chunk<'_>> {
        let mut edits: Vec<&Edit> = self.edits.iter().collect();
        edits.sort_by_key(|edit| (edit.start, edit.kind, edit.seq));

        let mut chunks = Vec::with_capacity(edits.len() * 2 + 1);
        let mut cursor = 0;
        for edit in edits {
            if edit.start > cursor {
                chunks.push(Chunk::Original {
                    start: cursor,
                    text: &self.original[cursor..edit.start],
                });
                cursor = edit.start;
            }
            match edit.kind {
                EditKind::Insert if !edit.text.is_empty() => {
                    chunks.push(Chunk::Inserted { text: &edit.text });
                }
                EditKind::Insert => {}
                EditKind::Overwrite => {
                    chunks.push(Chunk::Replaced {
                        start: edit.start,
                        text: &edit.text,
                    });
                    cursor = edit.end;
                }
            }
        }
        if cursor < self.original.len() {
            chunks.push(Chunk::Original {
                start: cursor,
                text: &self.original[cursor..],
            });
        }
        chunks
    }

    /// Materializes the overlay into the final text.
    pub fn render(&self) -> String {
        self.materialize().iter().map(Chunk::text).collect()
    }

    fn overwrites(&self) -> impl Iterator<Item = &Edit> {
        self.edits
            .iter()
            .filter(|edit| edit.kind == EditKind::Overwrite)
    }

    fn check_offset(&self, pos: usize) {
        assert!(
            pos <= self.original.len() && self.original.is_char_boundary(pos),
            "offset {} is not a char boundary of a {} byte source",
            pos,
            self.original.len()
        );
    }

    fn push(&mut self, start: usize, end: usize, kind: EditKind, text: String) {
        let seq = self.edits.len();
        self.edits.push(Edit {
            start,
            end,
            kind,
            text,
            seq,
        });
    }
}
