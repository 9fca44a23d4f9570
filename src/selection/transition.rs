//! The selection transition table.
//!
//! Every cursor or mode change goes through [`transition`], so the rule
//! "plain navigation drops back to line mode" lives in one place.

use crate::diff::FileDiff;

/// How much of the diff the cursor selects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionMode {
    #[default]
    Line,
    Range,
    Hunk,
}

/// User intent, independent of how it was triggered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionEvent {
    CycleSelection { forward: bool },
    CycleHunk { forward: bool },
    Adjust(isize),
    SelectTop,
    SelectBottom,
    ToggleRange,
    ToggleHunk,
    /// Pointer drag to a line
    SelectLine(usize),
    /// Pointer press on a line
    SelectNewLineForRange(usize),
    SetLineMode,
}

/// Cursor position, range anchor and mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub mode: SelectionMode,
    pub selected: usize,
    pub anchor: usize,
}

impl Cursor {
    pub fn line(idx: usize) -> Self {
        Self {
            mode: SelectionMode::Line,
            selected: idx,
            anchor: idx,
        }
    }

    pub fn range(idx: usize) -> Self {
        Self {
            mode: SelectionMode::Range,
            ..Self::line(idx)
        }
    }

    /// Inclusive bounds of what this cursor selects in `diff`
    pub fn selected_range(&self, diff: &FileDiff) -> (usize, usize) {
        match self.mode {
            SelectionMode::Line => (self.selected, self.selected),
            SelectionMode::Range => (
                self.anchor.min(self.selected),
                self.anchor.max(self.selected),
            ),
            SelectionMode::Hunk => hunk_bounds(diff, self.selected),
        }
    }
}

/// Apply `event` to `cursor`. Indices are clamped to the diff's lines.
pub fn transition(event: SelectionEvent, cursor: Cursor, diff: &FileDiff) -> Cursor {
    let last = diff.line_count().saturating_sub(1);
    let clamp = |idx: usize| idx.min(last);
    let moved = |idx: usize| Cursor::line(clamp(idx));

    match event {
        SelectionEvent::CycleSelection { forward } => {
            let (first, last_selected) = match cursor.mode {
                SelectionMode::Hunk => hunk_bounds(diff, cursor.selected),
                _ => (cursor.selected, cursor.selected),
            };
            if forward {
                moved(last_selected.saturating_add(1))
            } else {
                moved(first.saturating_sub(1))
            }
        }
        SelectionEvent::CycleHunk { forward } => {
            let Some(current) = diff.hunk_index_for_line(cursor.selected) else {
                return moved(cursor.selected);
            };
            let target = if forward {
                (current + 1).min(diff.hunks.len() - 1)
            } else {
                current.saturating_sub(1)
            };
            moved(diff.hunks[target].first_line_idx)
        }
        SelectionEvent::Adjust(delta) => moved(cursor.selected.saturating_add_signed(delta)),
        SelectionEvent::SelectTop => Cursor {
            selected: 0,
            ..cursor
        },
        SelectionEvent::SelectBottom => Cursor {
            selected: last,
            ..cursor
        },
        SelectionEvent::ToggleRange => match cursor.mode {
            SelectionMode::Range => Cursor::line(cursor.selected),
            _ => Cursor::range(cursor.selected),
        },
        SelectionEvent::ToggleHunk => match cursor.mode {
            SelectionMode::Hunk => Cursor::line(cursor.selected),
            _ => Cursor {
                mode: SelectionMode::Hunk,
                ..Cursor::line(cursor.selected)
            },
        },
        SelectionEvent::SelectLine(idx) => Cursor {
            selected: clamp(idx),
            ..cursor
        },
        SelectionEvent::SelectNewLineForRange(idx) => Cursor::range(clamp(idx)),
        SelectionEvent::SetLineMode => Cursor {
            mode: SelectionMode::Line,
            ..cursor
        },
    }
}

/// Body bounds of the hunk around `idx`, never past the last line
fn hunk_bounds(diff: &FileDiff, idx: usize) -> (usize, usize) {
    let last = diff.line_count().saturating_sub(1);
    diff.hunk_for_line(idx)
        .map(|hunk| (hunk.first_line_idx.min(last), hunk.last_line_idx().min(last)))
        .unwrap_or((idx, idx))
}
