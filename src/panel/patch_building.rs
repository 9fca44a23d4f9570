use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{LineByLineContext, LineByLinePanel, PanelError};
use crate::collab::{DiffSource, ExternalEditor};
use crate::manager::PatchManager;
use crate::selection::SelectionMode;

/// What a toggle did to the custom patch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggled {
    Added,
    Removed,
    /// No diff is loaded
    Inactive,
}

/// Browses a file's diff between two refs and toggles lines into a shared
/// [`PatchManager`]
#[derive(Debug)]
pub struct PatchBuildingPanel<S> {
    panel: LineByLinePanel,
    manager: Arc<Mutex<PatchManager<S>>>,
}

impl<S: DiffSource> LineByLineContext for PatchBuildingPanel<S> {
    fn panel(&self) -> &LineByLinePanel {
        &self.panel
    }

    fn included_line_indices(&self, path: &str) -> Vec<usize> {
        self.manager().get_file_inc_line_indices(path)
    }
}

impl<S: DiffSource> PatchBuildingPanel<S> {
    pub fn new(manager: Arc<Mutex<PatchManager<S>>>) -> Self {
        Self {
            panel: LineByLinePanel::new(),
            manager,
        }
    }

    /// Load `path`'s diff from the patch being built; `false` when it has nothing to select
    pub fn refresh(&self, path: &str, selected_line_idx: Option<usize>) -> Result<bool, PanelError> {
        let diff = self.manager().file_diff(path)?.to_string();
        Ok(self.panel.refresh(path, &diff, selected_line_idx))
    }

    /// Add the selection to the patch, or remove it when the cursor line is already in
    pub fn toggle_selection_for_patch(&self) -> Result<Toggled, PanelError> {
        self.panel
            .with_active(|active| -> Result<Toggled, PanelError> {
                let mut manager = self.manager();
                let cursor = active.state.selected_line_idx();
                let (first, last) = active.state.selected_range();

                let toggled = if manager
                    .get_file_inc_line_indices(&active.path)
                    .contains(&cursor)
                {
                    manager.remove_file_line_range(&active.path, first, last)?;
                    Toggled::Removed
                } else {
                    manager.add_file_line_range(&active.path, first, last)?;
                    Toggled::Added
                };

                if active.state.mode() == SelectionMode::Range {
                    active.state.set_line_select_mode();
                }
                Ok(toggled)
            })
            .unwrap_or(Ok(Toggled::Inactive))
    }

    /// Open the file under `repo_root` in `editor` at the cursor's new-file line.
    ///
    /// Returns `false` when no diff is loaded.
    pub fn edit_file(
        &self,
        editor: &impl ExternalEditor,
        repo_root: &Path,
    ) -> Result<bool, PanelError> {
        let Some((path, line)) = self.panel.with_active(|active| {
            let line = active.state.current_line_number().unwrap_or(1);
            (repo_root.join(&active.path), line)
        }) else {
            return Ok(false);
        };

        editor.edit_file_at_line(&path, line)?;
        Ok(true)
    }

    /// Leave the panel, dropping a custom patch that ended up empty
    pub fn escape(&self) {
        self.panel.escape();

        let mut manager = self.manager();
        if manager.active() && manager.is_empty() {
            manager.reset();
        }
    }

    fn manager(&self) -> MutexGuard<'_, PatchManager<S>> {
        self.manager.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
