//! Owners of the active selection state.
//!
//! A panel holds at most one [`SelectionState`] behind a mutex. The state
//! can be swapped by a refresh from another thread, so every read-then-act
//! sequence runs inside a single [`LineByLinePanel::with_active`] call.
//! When a panel also touches a [`PatchManager`](crate::manager::PatchManager),
//! the panel lock is always taken first.

pub mod patch_building;
pub mod staging;

pub use patch_building::{PatchBuildingPanel, Toggled};
pub use staging::{ApplyOutcome, StagingPanel};

use error_set::error_set;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::collab::ExternalError;
use crate::manager::PatchManagerError;
use crate::selection::{SelectionEvent, SelectionState};

error_set! {
    /// Errors from panel actions
    PanelError := {
        #[display("Could not prepare patch file: {message}")]
        TempFile { message: String },
        ExternalError(ExternalError),
        PatchManagerError(PatchManagerError),
    }
}

/// The diff currently shown and its selection
#[derive(Debug, Clone)]
pub struct ActiveDiff {
    pub path: String,
    pub state: SelectionState,
}

/// Scroll origin and where the cursor sits relative to it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub origin: usize,
    pub cursor_row: usize,
}

#[derive(Debug, Default)]
pub struct LineByLinePanel {
    active: Mutex<Option<ActiveDiff>>,
}

impl LineByLinePanel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the state with one for `diff_text`.
    ///
    /// The old cursor carries over when `path` is unchanged. Returns `false`
    /// when the diff has nothing to select, in which case the panel is
    /// cleared.
    pub fn refresh(&self, path: &str, diff_text: &str, selected_line_idx: Option<usize>) -> bool {
        let mut active = self.lock();

        let old_state = active
            .as_ref()
            .filter(|old| old.path == path)
            .map(|old| &old.state);
        let state = SelectionState::new(diff_text, selected_line_idx, old_state);

        tracing::debug!(path, selectable = state.is_some(), "refreshing panel");

        *active = state.map(|state| ActiveDiff {
            path: path.to_string(),
            state,
        });
        active.is_some()
    }

    pub fn escape(&self) {
        *self.lock() = None;
    }

    pub fn is_active(&self) -> bool {
        self.lock().is_some()
    }

    /// Run `f` on the active diff while holding the lock; `None` when nothing is loaded
    pub fn with_active<R>(&self, f: impl FnOnce(&mut ActiveDiff) -> R) -> Option<R> {
        self.lock().as_mut().map(f)
    }

    fn lock(&self) -> MutexGuard<'_, Option<ActiveDiff>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// What both line-by-line panels offer their presentation layer.
///
/// Implementors only supply the panel and, optionally, which lines are
/// already part of a custom patch.
pub trait LineByLineContext {
    fn panel(&self) -> &LineByLinePanel;

    /// Lines of `path` to mark as already included
    fn included_line_indices(&self, _path: &str) -> Vec<usize> {
        Vec::new()
    }

    /// Returns `false` when nothing is loaded
    fn handle_event(&self, event: SelectionEvent) -> bool {
        self.panel()
            .with_active(|active| active.state.apply(event))
            .is_some()
    }

    fn content_to_render(&self) -> Option<String> {
        self.panel().with_active(|active| {
            let included = self.included_line_indices(&active.path);
            active.state.render_for_line_indices(&included)
        })
    }

    fn focus_selection(&self, origin: usize, height: usize) -> Option<Viewport> {
        self.panel().with_active(|active| {
            let origin = active.state.calculate_origin(origin, height);
            Viewport {
                origin,
                cursor_row: active.state.selected_line_idx().saturating_sub(origin),
            }
        })
    }

    /// Jump to a line, leaving any range or hunk selection
    fn navigate_to(&self, idx: usize) -> bool {
        self.panel()
            .with_active(|active| {
                active.state.set_line_select_mode();
                active.state.select_line(idx);
            })
            .is_some()
    }

    fn copy_selected(&self) -> Option<String> {
        self.panel()
            .with_active(|active| active.state.plain_render_selected())
    }
}
