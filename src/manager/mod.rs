//! Accumulates a custom patch across files.
//!
//! The manager records, per file, which rendered line indices of that file's
//! diff between two refs belong to the patch. Diffs are fetched from a
//! [`DiffSource`] the first time a file is touched and cached until
//! [`PatchManager::reset`] or [`PatchManager::start`].

mod ranges;

pub use ranges::LineRanges;

use error_set::error_set;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use crate::collab::{ApplyDirection, ApplyTarget, DiffSelector, DiffSource, ExternalError, PatchApplier};
use crate::diff::FileDiff;
use crate::patch::{PatchOptions, modified_patch_for_lines};
use crate::render;

error_set! {
    /// Errors from building or applying a custom patch
    PatchManagerError := {
        #[display("No custom patch has been started")]
        NotStarted,
        ExternalError(ExternalError),
    }
}

/// The two refs a custom patch is built between
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchTarget {
    pub from: String,
    pub to: String,
    pub reverse: bool,
}

/// How much of a file is in the patch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchStatus {
    Unselected,
    Whole,
    Part,
}

#[derive(Debug, Clone)]
struct FileInfo {
    diff: String,
    line_count: usize,
    stageable: Vec<usize>,
    ranges: LineRanges,
}

impl FileInfo {
    fn new(diff: String) -> Self {
        let parsed = FileDiff::parse(&diff);
        Self {
            line_count: parsed.line_count(),
            stageable: parsed.stageable_lines(),
            diff,
            ranges: LineRanges::new(),
        }
    }

    fn status(&self) -> PatchStatus {
        if self.ranges.is_empty() {
            PatchStatus::Unselected
        } else if self.stageable.iter().all(|&idx| self.ranges.contains(idx)) {
            PatchStatus::Whole
        } else {
            PatchStatus::Part
        }
    }
}

#[derive(Debug)]
pub struct PatchManager<S> {
    source: S,
    target: Option<PatchTarget>,
    files: BTreeMap<String, FileInfo>,
    active: bool,
}

impl<S: DiffSource> PatchManager<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            target: None,
            files: BTreeMap::new(),
            active: false,
        }
    }

    /// Begin a new patch between the refs in `target`, dropping any previous one
    pub fn start(&mut self, target: PatchTarget) {
        tracing::debug!(from = %target.from, to = %target.to, reverse = target.reverse, "starting custom patch");
        self.files.clear();
        self.target = Some(target);
    }

    pub fn target(&self) -> Option<&PatchTarget> {
        self.target.as_ref()
    }

    /// Whether a patch for these refs needs a fresh [`start`](Self::start)
    pub fn new_patch_required(&self, from: &str, to: &str, reverse: bool) -> bool {
        self.target
            .as_ref()
            .is_none_or(|target| target.from != from || target.to != to || target.reverse != reverse)
    }

    /// The diff whose line indices the ranges for `path` refer to
    pub fn file_diff(&mut self, path: &str) -> Result<&str, PatchManagerError> {
        Ok(&self.file_info(path)?.diff)
    }

    pub fn add_file_line_range(
        &mut self,
        path: &str,
        first: usize,
        last: usize,
    ) -> Result<(), PatchManagerError> {
        tracing::debug!(path, first, last, "adding lines to custom patch");
        self.file_info(path)?.ranges.add(first, last);
        self.active = true;
        Ok(())
    }

    pub fn remove_file_line_range(
        &mut self,
        path: &str,
        first: usize,
        last: usize,
    ) -> Result<(), PatchManagerError> {
        tracing::debug!(path, first, last, "removing lines from custom patch");
        self.file_info(path)?.ranges.remove(first, last);
        Ok(())
    }

    /// Include every line of the file's diff
    pub fn add_file_whole(&mut self, path: &str) -> Result<(), PatchManagerError> {
        let info = self.file_info(path)?;
        if info.line_count > 0 {
            info.ranges.add(0, info.line_count - 1);
            self.active = true;
        }
        Ok(())
    }

    pub fn remove_file(&mut self, path: &str) {
        if let Some(info) = self.files.get_mut(path) {
            info.ranges.clear();
        }
    }

    pub fn get_file_inc_line_indices(&self, path: &str) -> Vec<usize> {
        self.files
            .get(path)
            .map(|info| info.ranges.indices())
            .unwrap_or_default()
    }

    pub fn get_file_status(&self, path: &str) -> PatchStatus {
        self.files
            .get(path)
            .map_or(PatchStatus::Unselected, FileInfo::status)
    }

    pub fn is_empty(&self) -> bool {
        self.files.values().all(|info| info.ranges.is_empty())
    }

    /// True once anything was added since the last [`reset`](Self::reset)
    pub fn active(&self) -> bool {
        self.active
    }

    pub fn reset(&mut self) {
        tracing::debug!("resetting custom patch");
        self.files.clear();
        self.target = None;
        self.active = false;
    }

    /// Files with at least one included line, in path order
    pub fn all_files_in_patch(&self) -> Vec<&str> {
        self.files
            .iter()
            .filter(|(_, info)| !info.ranges.is_empty())
            .map(|(path, _)| path.as_str())
            .collect()
    }

    /// The patch for one file, empty when nothing of it is included
    pub fn render_patch_for_file(
        &self,
        path: &str,
        plain: bool,
        reverse: bool,
        keep_original_header: bool,
    ) -> String {
        let Some(info) = self.files.get(path) else {
            return String::new();
        };

        let patch = match info.status() {
            PatchStatus::Unselected => return String::new(),
            PatchStatus::Whole if keep_original_header && !reverse => info.diff.clone(),
            _ => modified_patch_for_lines(
                path,
                &info.diff,
                &info.ranges.indices(),
                PatchOptions::default()
                    .reverse(reverse)
                    .keep_original_header(keep_original_header),
            ),
        };

        if plain {
            patch
        } else {
            render::colorize_patch(&patch)
        }
    }

    /// All included files as one patch, in path order
    pub fn render_aggregated_patch(&self, plain: bool) -> String {
        self.files
            .keys()
            .map(|path| self.render_patch_for_file(path, plain, false, true))
            .filter(|patch| !patch.is_empty())
            .map(|patch| if patch.ends_with('\n') { patch } else { patch + "\n" })
            .collect()
    }

    /// Apply the whole custom patch in one call
    pub fn apply_patches(
        &self,
        applier: &impl PatchApplier,
        target: ApplyTarget,
        reverse: bool,
    ) -> Result<(), PatchManagerError> {
        let patch = self.render_aggregated_patch(true);
        if patch.is_empty() {
            tracing::debug!("custom patch is empty, nothing to apply");
            return Ok(());
        }

        applier.apply_patch(&patch, target, ApplyDirection::from_reverse(reverse))?;
        Ok(())
    }

    fn file_info(&mut self, path: &str) -> Result<&mut FileInfo, PatchManagerError> {
        let target = self.target.as_ref().ok_or(PatchManagerError::NotStarted)?;

        match self.files.entry(path.to_string()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let diff = self.source.diff_text(&DiffSelector::Refs {
                    from: target.from.clone(),
                    to: target.to.clone(),
                    reverse: target.reverse,
                    path: path.to_string(),
                })?;
                Ok(entry.insert(FileInfo::new(diff)))
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;
    use std::cell::RefCell;

    // 0-1 file header, hunk A: header 2, body 3..=6; hunk B: header 7, body 8..=10
    const NOTES: &str = "\
--- a/notes.txt
+++ b/notes.txt
@@ -1,3 +1,3 @@
 one
-two
+TWO
 three
@@ -10,2 +10,3 @@ section
 ten
+ten and a half
 eleven
";

    const SMALL: &str = "--- a/small.txt\n+++ b/small.txt\n@@ -1 +1 @@\n-a\n+b\n";

    type Source = fn(&DiffSelector) -> Result<String, ExternalError>;

    fn source(selector: &DiffSelector) -> Result<String, ExternalError> {
        match selector.path() {
            "notes.txt" => Ok(NOTES.to_string()),
            "small.txt" => Ok(SMALL.to_string()),
            path => Err(ExternalError::DiffUnavailable {
                path: path.to_string(),
                reason: "unknown path".to_string(),
            }),
        }
    }

    fn target() -> PatchTarget {
        PatchTarget {
            from: "HEAD~1".to_string(),
            to: "HEAD".to_string(),
            reverse: false,
        }
    }

    fn manager() -> PatchManager<Source> {
        let mut manager = PatchManager::new(source as Source);
        manager.start(target());
        manager
    }

    #[derive(Default)]
    struct RecordingApplier {
        calls: RefCell<Vec<(String, ApplyTarget, ApplyDirection)>>,
    }

    impl PatchApplier for RecordingApplier {
        fn apply_patch(
            &self,
            patch: &str,
            target: ApplyTarget,
            direction: ApplyDirection,
        ) -> Result<(), ExternalError> {
            self.calls
                .borrow_mut()
                .push((patch.to_string(), target, direction));
            Ok(())
        }
    }

    #[test]
    fn requires_start() {
        let mut manager = PatchManager::new(source as Source);
        assert!(matches!(
            manager.add_file_line_range("notes.txt", 4, 5),
            Err(PatchManagerError::NotStarted)
        ));
        assert!(!manager.active());
    }

    #[test]
    fn diff_source_errors_surface() {
        let mut manager = manager();
        assert!(matches!(
            manager.add_file_line_range("missing.txt", 0, 1),
            Err(PatchManagerError::ExternalError(ExternalError::DiffUnavailable { .. }))
        ));
    }

    #[test]
    fn add_and_remove_ranges() {
        let mut manager = manager();
        manager.add_file_line_range("notes.txt", 4, 5).unwrap();
        manager.add_file_line_range("notes.txt", 9, 9).unwrap();
        assert_eq!(manager.get_file_inc_line_indices("notes.txt"), vec![4, 5, 9]);
        assert_eq!(manager.get_file_status("notes.txt"), PatchStatus::Whole);

        manager.remove_file_line_range("notes.txt", 5, 9).unwrap();
        assert_eq!(manager.get_file_inc_line_indices("notes.txt"), vec![4]);
        assert_eq!(manager.get_file_status("notes.txt"), PatchStatus::Part);
        assert!(!manager.is_empty());

        manager.remove_file_line_range("notes.txt", 0, 20).unwrap();
        assert!(manager.is_empty());
        assert!(manager.active());
        assert_eq!(manager.get_file_status("notes.txt"), PatchStatus::Unselected);

        manager.reset();
        assert!(!manager.active());
        assert!(manager.target().is_none());
    }

    #[test]
    fn whole_file_and_removal() {
        let mut manager = manager();
        manager.add_file_whole("small.txt").unwrap();
        assert_eq!(manager.get_file_status("small.txt"), PatchStatus::Whole);
        assert_eq!(manager.get_file_inc_line_indices("small.txt"), vec![0, 1, 2, 3, 4]);

        manager.remove_file("small.txt");
        assert!(manager.is_empty());
        assert!(manager.all_files_in_patch().is_empty());
    }

    #[test]
    fn renders_partial_file() {
        let mut manager = manager();
        manager.add_file_line_range("notes.txt", 9, 9).unwrap();

        assert_eq!(
            manager.render_patch_for_file("notes.txt", true, false, true),
            "--- a/notes.txt\n+++ b/notes.txt\n@@ -10,2 +10,3 @@ section\n ten\n+ten and a half\n eleven\n"
        );
        assert_eq!(
            manager.render_patch_for_file("notes.txt", true, true, false),
            "--- a/notes.txt\n+++ b/notes.txt\n@@ -10,3 +10,2 @@ section\n ten\n-ten and a half\n eleven\n"
        );
        assert_eq!(manager.render_patch_for_file("small.txt", true, false, true), "");
    }

    #[test]
    fn whole_file_renders_original_diff() {
        let mut manager = manager();
        manager.add_file_whole("small.txt").unwrap();
        assert_eq!(manager.render_patch_for_file("small.txt", true, false, true), SMALL);
        assert!(
            manager
                .render_patch_for_file("small.txt", false, false, true)
                .contains("\x1b[32m+b\x1b[0m")
        );
    }

    #[test]
    fn aggregated_patch_in_path_order() {
        let mut manager = manager();
        manager.add_file_whole("small.txt").unwrap();
        manager.add_file_line_range("notes.txt", 4, 5).unwrap();

        assert_eq!(manager.all_files_in_patch(), vec!["notes.txt", "small.txt"]);
        assert_eq!(
            manager.render_aggregated_patch(true),
            format!("--- a/notes.txt\n+++ b/notes.txt\n@@ -1,3 +1,3 @@\n one\n-two\n+TWO\n three\n{SMALL}")
        );
    }

    #[test]
    fn apply_patches_in_one_call() {
        let mut manager = manager();
        let applier = RecordingApplier::default();

        manager.apply_patches(&applier, ApplyTarget::WorkingTree, true).unwrap();
        assert!(applier.calls.borrow().is_empty());

        manager.add_file_whole("small.txt").unwrap();
        manager.apply_patches(&applier, ApplyTarget::WorkingTree, true).unwrap();

        let calls = applier.calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0],
            (SMALL.to_string(), ApplyTarget::WorkingTree, ApplyDirection::Reverse)
        );
    }

    #[test]
    fn new_patch_required_for_other_refs() {
        let manager = manager();
        assert!(!manager.new_patch_required("HEAD~1", "HEAD", false));
        assert!(manager.new_patch_required("HEAD~1", "HEAD", true));
        assert!(manager.new_patch_required("HEAD~2", "HEAD", false));
        assert!(PatchManager::new(source as Source).new_patch_required("a", "b", false));
    }

    #[test]
    fn start_drops_previous_files() {
        let mut manager = manager();
        manager.add_file_line_range("notes.txt", 4, 4).unwrap();
        manager.start(target());
        assert!(manager.is_empty());
    }
}
