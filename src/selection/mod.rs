//! Cursor and selection over one file's diff.

pub mod transition;
pub mod viewport;

use crate::diff::{FileDiff, Hunk};
use crate::render;

pub use transition::{Cursor, SelectionEvent, SelectionMode, transition};

/// Selection over a single parsed diff.
///
/// Replaced wholesale when the underlying diff changes; see [`SelectionState::new`].
#[derive(Debug, Clone)]
pub struct SelectionState {
    diff_text: String,
    diff: FileDiff,
    selected_line_idx: usize,
    range_start_idx: usize,
    mode: SelectionMode,
}

impl SelectionState {
    /// Build a state for `diff_text`, or `None` when nothing in it can be selected.
    ///
    /// An explicit `selected_line_idx` starts a range there. Otherwise the
    /// cursor of `old_state` carries over to the next stageable line when it
    /// still fits in the new diff, keeping hunk mode but dropping a range.
    /// Without either the cursor lands on the first stageable line.
    pub fn new(
        diff_text: &str,
        selected_line_idx: Option<usize>,
        old_state: Option<&SelectionState>,
    ) -> Option<Self> {
        let diff = FileDiff::parse(diff_text);
        let first_stageable = *diff.stageable_lines().first()?;
        let last_idx = diff.line_count().saturating_sub(1);

        let cursor = match (selected_line_idx, old_state) {
            (Some(idx), _) => Cursor::range(idx.min(last_idx)),
            (None, Some(old)) if old.selected_line_idx <= last_idx => {
                let idx = diff
                    .next_stageable_line_index(old.selected_line_idx)
                    .unwrap_or(first_stageable);
                match old.mode {
                    SelectionMode::Hunk => Cursor {
                        mode: SelectionMode::Hunk,
                        ..Cursor::line(idx)
                    },
                    _ => Cursor::line(idx),
                }
            }
            _ => Cursor::line(first_stageable),
        };

        tracing::debug!(
            lines = diff.line_count(),
            hunks = diff.hunks.len(),
            selected = cursor.selected,
            mode = ?cursor.mode,
            "new selection state"
        );

        Some(Self {
            diff_text: diff_text.to_string(),
            diff,
            selected_line_idx: cursor.selected,
            range_start_idx: cursor.anchor,
            mode: cursor.mode,
        })
    }

    pub fn diff_text(&self) -> &str {
        &self.diff_text
    }

    pub fn diff(&self) -> &FileDiff {
        &self.diff
    }

    pub fn selected_line_idx(&self) -> usize {
        self.selected_line_idx
    }

    pub fn range_start_idx(&self) -> usize {
        self.range_start_idx
    }

    pub fn mode(&self) -> SelectionMode {
        self.mode
    }

    pub fn line_count(&self) -> usize {
        self.diff.line_count()
    }

    pub fn cursor(&self) -> Cursor {
        Cursor {
            mode: self.mode,
            selected: self.selected_line_idx,
            anchor: self.range_start_idx,
        }
    }

    /// Feed one event through the transition table
    pub fn apply(&mut self, event: SelectionEvent) {
        let next = transition(event, self.cursor(), &self.diff);
        self.selected_line_idx = next.selected;
        self.range_start_idx = next.anchor;
        self.mode = next.mode;
    }

    pub fn cycle_selection(&mut self, forward: bool) {
        self.apply(SelectionEvent::CycleSelection { forward });
    }

    pub fn cycle_hunk(&mut self, forward: bool) {
        self.apply(SelectionEvent::CycleHunk { forward });
    }

    pub fn adjust_selected_line_idx(&mut self, delta: isize) {
        self.apply(SelectionEvent::Adjust(delta));
    }

    pub fn select_top(&mut self) {
        self.apply(SelectionEvent::SelectTop);
    }

    pub fn select_bottom(&mut self) {
        self.apply(SelectionEvent::SelectBottom);
    }

    pub fn toggle_select_range(&mut self) {
        self.apply(SelectionEvent::ToggleRange);
    }

    pub fn toggle_select_hunk(&mut self) {
        self.apply(SelectionEvent::ToggleHunk);
    }

    pub fn select_line(&mut self, idx: usize) {
        self.apply(SelectionEvent::SelectLine(idx));
    }

    pub fn select_new_line_for_range(&mut self, idx: usize) {
        self.apply(SelectionEvent::SelectNewLineForRange(idx));
    }

    pub fn set_line_select_mode(&mut self) {
        self.apply(SelectionEvent::SetLineMode);
    }

    /// Inclusive `(first, last)` indices of the current selection
    pub fn selected_range(&self) -> (usize, usize) {
        self.cursor().selected_range(&self.diff)
    }

    /// The hunk containing the cursor
    pub fn current_hunk(&self) -> Option<&Hunk> {
        self.diff.hunk_for_line(self.selected_line_idx)
    }

    /// New-file line number at the cursor, for jumping into an editor
    pub fn current_line_number(&self) -> Option<usize> {
        self.current_hunk()
            .map(|hunk| hunk.line_number_of_line(self.selected_line_idx))
    }

    /// Coloured diff with the selection and `included` lines highlighted
    pub fn render_for_line_indices(&self, included: &[usize]) -> String {
        render::render(&self.diff, Some(self.selected_range()), included, true)
    }

    pub fn render_plain(&self) -> String {
        render::render(&self.diff, None, &[], false)
    }

    /// Raw text of the selected lines
    pub fn plain_render_selected(&self) -> String {
        let (first, last) = self.selected_range();
        render::plain_render_lines(&self.diff, first, last)
    }

    pub fn calculate_origin(&self, current_origin: usize, viewport_height: usize) -> usize {
        viewport::calculate_origin(
            current_origin,
            viewport_height,
            self.selected_line_idx,
            self.line_count(),
        )
    }
}
