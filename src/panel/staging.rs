use std::io::Write;

use super::{LineByLineContext, LineByLinePanel, PanelError};
use crate::collab::{
    ApplyDirection, ApplyTarget, DiffSelector, DiffSource, ExternalEditor, PatchApplier,
};
use crate::patch::{PatchOptions, modified_patch_for_range};
use crate::selection::SelectionMode;

/// Lines above the first body line in an extracted patch: `---`, `+++` and `@@`
const PATCH_HEADER_LINES: usize = 3;

/// Result of an action that may or may not reach the applier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    /// The selection held no changes
    NothingToApply,
    /// No diff is loaded
    Inactive,
}

/// Stages, unstages and discards selected lines.
///
/// `staged` panels show the index against `HEAD`, the others the working
/// tree against the index.
#[derive(Debug, Default)]
pub struct StagingPanel {
    panel: LineByLinePanel,
    staged: bool,
}

impl LineByLineContext for StagingPanel {
    fn panel(&self) -> &LineByLinePanel {
        &self.panel
    }
}

impl StagingPanel {
    pub fn new(staged: bool) -> Self {
        Self {
            panel: LineByLinePanel::new(),
            staged,
        }
    }

    pub fn staged(&self) -> bool {
        self.staged
    }

    pub fn selector(&self, path: &str) -> DiffSelector {
        let path = path.to_string();
        if self.staged {
            DiffSelector::Staged { path }
        } else {
            DiffSelector::Unstaged { path }
        }
    }

    /// Load `path`'s diff from `source`; `false` when it has nothing to select
    pub fn refresh_from(
        &self,
        source: &impl DiffSource,
        path: &str,
        selected_line_idx: Option<usize>,
    ) -> Result<bool, PanelError> {
        let diff = source.diff_text(&self.selector(path))?;
        Ok(self.panel.refresh(path, &diff, selected_line_idx))
    }

    /// Apply the selected lines.
    ///
    /// Forward selections are staged. Reverse selections are unstaged on a
    /// staged panel and discarded from the working tree otherwise.
    pub fn apply_selection(
        &self,
        applier: &impl PatchApplier,
        reverse: bool,
    ) -> Result<ApplyOutcome, PanelError> {
        let staged = self.staged;

        self.panel
            .with_active(|active| -> Result<ApplyOutcome, PanelError> {
                let (first, last) = active.state.selected_range();
                let patch = modified_patch_for_range(
                    &active.path,
                    active.state.diff_text(),
                    first,
                    last,
                    PatchOptions::default().reverse(reverse),
                );
                if patch.is_empty() {
                    return Ok(ApplyOutcome::NothingToApply);
                }

                applier.apply_patch(
                    &patch,
                    apply_target(staged, reverse),
                    ApplyDirection::Forward,
                )?;

                if active.state.mode() == SelectionMode::Range {
                    active.state.set_line_select_mode();
                }
                Ok(ApplyOutcome::Applied)
            })
            .unwrap_or(Ok(ApplyOutcome::Inactive))
    }

    /// Let the user edit the current hunk, then apply what they left.
    ///
    /// The hunk is written to a temporary patch file and opened at the
    /// cursor's line. The edited patch has its headers recomputed and is
    /// applied to the index, reversed on a staged panel.
    pub fn edit_hunk(
        &self,
        editor: &impl ExternalEditor,
        applier: &impl PatchApplier,
    ) -> Result<ApplyOutcome, PanelError> {
        let staged = self.staged;

        self.panel
            .with_active(|active| -> Result<ApplyOutcome, PanelError> {
                let Some(hunk) = active.state.current_hunk() else {
                    return Ok(ApplyOutcome::NothingToApply);
                };
                let offset = active
                    .state
                    .selected_line_idx()
                    .saturating_sub(hunk.first_line_idx);
                let patch = modified_patch_for_range(
                    &active.path,
                    active.state.diff_text(),
                    hunk.first_line_idx,
                    hunk.last_line_idx(),
                    PatchOptions::default(),
                );
                if patch.is_empty() {
                    return Ok(ApplyOutcome::NothingToApply);
                }

                let mut file = tempfile::Builder::new()
                    .prefix("git-linewise-")
                    .suffix(".patch")
                    .tempfile()
                    .map_err(temp_file_error)?;
                file.write_all(patch.as_bytes()).map_err(temp_file_error)?;
                file.flush().map_err(temp_file_error)?;

                editor.edit_file_at_line(file.path(), PATCH_HEADER_LINES + offset + 1)?;

                let edited = std::fs::read_to_string(file.path()).map_err(temp_file_error)?;
                let line_count = edited.lines().count();
                let renormalized = modified_patch_for_range(
                    &active.path,
                    &edited,
                    0,
                    line_count,
                    PatchOptions::default(),
                );
                if renormalized.is_empty() {
                    return Ok(ApplyOutcome::NothingToApply);
                }

                applier.apply_patch(
                    &renormalized,
                    ApplyTarget::Index,
                    ApplyDirection::from_reverse(staged),
                )?;
                Ok(ApplyOutcome::Applied)
            })
            .unwrap_or(Ok(ApplyOutcome::Inactive))
    }
}

/// Where a selection extracted with `reverse` from a staged or unstaged diff goes.
///
/// Staging and unstaging touch the index; discarding touches the working tree.
pub fn apply_target(staged: bool, reverse: bool) -> ApplyTarget {
    if !reverse || staged {
        ApplyTarget::Index
    } else {
        ApplyTarget::WorkingTree
    }
}

fn temp_file_error(e: std::io::Error) -> PanelError {
    PanelError::TempFile {
        message: e.to_string(),
    }
}
