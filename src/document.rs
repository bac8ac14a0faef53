// src/document.rs
//
// Edit-operation interface to the report document. Offsets are char offsets
// into the plain text, never byte offsets.

use std::collections::HashSet;

use crate::command::{Alignment, TextCase, TextMark};
use crate::error::EditError;

/// Half-open char range; `from == to` is a caret
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Selection {
    pub from: usize,
    pub to: usize,
}

impl Selection {
    pub fn caret(pos: usize) -> Self {
        Self { from: pos, to: pos }
    }

    pub fn is_empty(&self) -> bool {
        self.from == self.to
    }
}

/// Operations the engine needs from a rich-text editor.
///
/// Text insertion replaces the current selection and leaves a caret after the
/// inserted text.
pub trait DocumentEditor: Send {
    fn plain_text(&self) -> String;
    /// Document length in chars
    fn size(&self) -> usize;
    fn selection(&self) -> Selection;
    fn set_selection(&mut self, from: usize, to: usize) -> Result<(), EditError>;

    fn insert_text(&mut self, text: &str) -> Result<(), EditError>;
    fn set_content(&mut self, text: &str) -> Result<(), EditError>;
    fn delete_range(&mut self, from: usize, to: usize) -> Result<(), EditError>;
    fn insert_hard_break(&mut self) -> Result<(), EditError>;
    fn split_block(&mut self) -> Result<(), EditError>;

    fn toggle_mark(&mut self, mark: TextMark) -> Result<(), EditError>;
    fn set_alignment(&mut self, alignment: Alignment) -> Result<(), EditError>;
    fn change_case(&mut self, from: usize, to: usize, case: TextCase) -> Result<(), EditError>;

    /// `Ok(false)` when there is nothing to undo
    fn undo(&mut self) -> Result<bool, EditError>;
    /// `Ok(false)` when there is nothing to redo
    fn redo(&mut self) -> Result<bool, EditError>;
    fn select_all(&mut self) -> Result<(), EditError>;
    fn clear(&mut self) -> Result<(), EditError>;
}

/// Undo steps kept per document; the oldest are dropped first
pub const MAX_UNDO_DEPTH: usize = 100;

#[derive(Debug, Clone)]
struct Snapshot {
    chars: Vec<char>,
    selection: Selection,
    marks: HashSet<TextMark>,
    alignment: Alignment,
}

/// Plain-text document with snapshot undo/redo. Marks and alignment are
/// tracked as editor state only.
#[derive(Debug, Clone)]
pub struct MemoryDocument {
    chars: Vec<char>,
    selection: Selection,
    marks: HashSet<TextMark>,
    alignment: Alignment,
    undo_stack: Vec<Snapshot>,
    redo_stack: Vec<Snapshot>,
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDocument {
    pub fn new() -> Self {
        Self {
            chars: Vec::new(),
            selection: Selection::default(),
            marks: HashSet::new(),
            alignment: Alignment::Left,
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
        }
    }

    /// Document with initial content and the caret at the end
    pub fn with_text(text: &str) -> Self {
        let chars: Vec<char> = text.chars().collect();
        let end = chars.len();
        Self {
            chars,
            selection: Selection::caret(end),
            ..Self::new()
        }
    }

    pub fn is_mark_active(&self, mark: TextMark) -> bool {
        self.marks.contains(&mark)
    }

    pub fn alignment(&self) -> Alignment {
        self.alignment
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            chars: self.chars.clone(),
            selection: self.selection,
            marks: self.marks.clone(),
            alignment: self.alignment,
        }
    }

    fn restore(&mut self, snapshot: Snapshot) {
        self.chars = snapshot.chars;
        self.selection = snapshot.selection;
        self.marks = snapshot.marks;
        self.alignment = snapshot.alignment;
    }

    /// Push an undo step before a mutation
    fn checkpoint(&mut self) {
        let snapshot = self.snapshot();
        if self.undo_stack.len() == MAX_UNDO_DEPTH {
            self.undo_stack.remove(0);
        }
        self.undo_stack.push(snapshot);
        self.redo_stack.clear();
    }

    fn check_range(&self, from: usize, to: usize) -> Result<(), EditError> {
        if from > to || to > self.chars.len() {
            return Err(EditError::InvalidRange {
                start: from,
                end: to,
                size: self.chars.len(),
            });
        }
        Ok(())
    }

    fn replace_selection(&mut self, text: &str) {
        let Selection { from, to } = self.selection;
        let inserted: Vec<char> = text.chars().collect();
        let caret = from + inserted.len();
        self.chars.splice(from..to, inserted);
        self.selection = Selection::caret(caret);
    }
}

impl DocumentEditor for MemoryDocument {
    fn plain_text(&self) -> String {
        self.chars.iter().collect()
    }

    fn size(&self) -> usize {
        self.chars.len()
    }

    fn selection(&self) -> Selection {
        self.selection
    }

    fn set_selection(&mut self, from: usize, to: usize) -> Result<(), EditError> {
        self.check_range(from, to)?;
        self.selection = Selection { from, to };
        Ok(())
    }

    fn insert_text(&mut self, text: &str) -> Result<(), EditError> {
        self.checkpoint();
        self.replace_selection(text);
        Ok(())
    }

    fn set_content(&mut self, text: &str) -> Result<(), EditError> {
        self.checkpoint();
        self.chars = text.chars().collect();
        self.selection = Selection::caret(self.chars.len());
        Ok(())
    }

    fn delete_range(&mut self, from: usize, to: usize) -> Result<(), EditError> {
        self.check_range(from, to)?;
        self.checkpoint();
        self.chars.drain(from..to);
        self.selection = Selection::caret(from);
        Ok(())
    }

    fn insert_hard_break(&mut self) -> Result<(), EditError> {
        self.checkpoint();
        self.replace_selection("\n");
        Ok(())
    }

    fn split_block(&mut self) -> Result<(), EditError> {
        self.checkpoint();
        self.replace_selection("\n\n");
        Ok(())
    }

    fn toggle_mark(&mut self, mark: TextMark) -> Result<(), EditError> {
        self.checkpoint();
        if !self.marks.remove(&mark) {
            self.marks.insert(mark);
        }
        Ok(())
    }

    fn set_alignment(&mut self, alignment: Alignment) -> Result<(), EditError> {
        self.checkpoint();
        self.alignment = alignment;
        Ok(())
    }

    fn change_case(&mut self, from: usize, to: usize, case: TextCase) -> Result<(), EditError> {
        self.check_range(from, to)?;
        self.checkpoint();
        let segment: String = self.chars[from..to].iter().collect();
        let changed = match case {
            TextCase::Upper => segment.to_uppercase(),
            TextCase::Lower => segment.to_lowercase(),
        };
        let changed: Vec<char> = changed.chars().collect();
        let new_to = from + changed.len();
        self.chars.splice(from..to, changed);
        // Keep the selection over the changed text when it covered it
        if self.selection == (Selection { from, to }) {
            self.selection = Selection { from, to: new_to };
        } else if self.selection.to > self.chars.len() {
            self.selection = Selection::caret(self.chars.len());
        }
        Ok(())
    }

    fn undo(&mut self) -> Result<bool, EditError> {
        match self.undo_stack.pop() {
            Some(previous) => {
                let current = self.snapshot();
                self.redo_stack.push(current);
                self.restore(previous);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn redo(&mut self) -> Result<bool, EditError> {
        match self.redo_stack.pop() {
            Some(next) => {
                let current = self.snapshot();
                self.undo_stack.push(current);
                self.restore(next);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn select_all(&mut self) -> Result<(), EditError> {
        self.selection = Selection { from: 0, to: self.chars.len() };
        Ok(())
    }

    fn clear(&mut self) -> Result<(), EditError> {
        self.checkpoint();
        self.chars.clear();
        self.selection = Selection::default();
        Ok(())
    }
}
