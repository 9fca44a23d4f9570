//! Seams to the outside world: where diffs come from, where patches go,
//! and how a file is opened for editing.

use error_set::error_set;
use std::path::Path;

error_set! {
    /// Failures reported by an external collaborator
    ExternalError := {
        #[display("Could not get diff for {path}: {reason}")]
        DiffUnavailable { path: String, reason: String },
        #[display("Patch rejected: {reason}")]
        ApplyRejected { reason: String },
        #[display("Editor failed: {reason}")]
        EditorFailed { reason: String },
    }
}

/// Which diff of a file to fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffSelector {
    /// Working tree against the index
    Unstaged { path: String },
    /// Index against `HEAD`
    Staged { path: String },
    /// Between two refs, optionally swapped
    Refs {
        from: String,
        to: String,
        reverse: bool,
        path: String,
    },
}

impl DiffSelector {
    pub fn path(&self) -> &str {
        match self {
            DiffSelector::Unstaged { path }
            | DiffSelector::Staged { path }
            | DiffSelector::Refs { path, .. } => path,
        }
    }
}

/// Supplies non-coloured unified diff text
pub trait DiffSource {
    fn diff_text(&self, selector: &DiffSelector) -> Result<String, ExternalError>;
}

impl<F> DiffSource for F
where
    F: Fn(&DiffSelector) -> Result<String, ExternalError>,
{
    fn diff_text(&self, selector: &DiffSelector) -> Result<String, ExternalError> {
        self(selector)
    }
}

/// Where a patch is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyTarget {
    Index,
    WorkingTree,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApplyDirection {
    #[default]
    Forward,
    Reverse,
}

impl ApplyDirection {
    pub fn from_reverse(reverse: bool) -> Self {
        if reverse {
            ApplyDirection::Reverse
        } else {
            ApplyDirection::Forward
        }
    }
}

/// Applies patch text. Rejections carry the reason verbatim.
pub trait PatchApplier {
    fn apply_patch(
        &self,
        patch: &str,
        target: ApplyTarget,
        direction: ApplyDirection,
    ) -> Result<(), ExternalError>;
}

/// Opens a file at a line and returns once the user is done with it
pub trait ExternalEditor {
    fn edit_file_at_line(&self, path: &Path, line: usize) -> Result<(), ExternalError>;
}
