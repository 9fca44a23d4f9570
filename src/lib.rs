use error_set::error_set;
use std::path::PathBuf;

pub mod collab;
pub mod config;
pub mod diff;
pub mod git;
pub mod manager;
pub mod panel;
pub mod parse;
pub mod patch;
pub mod render;
pub mod selection;

pub use collab::{
    ApplyDirection, ApplyTarget, DiffSelector, DiffSource, ExternalEditor, ExternalError,
    PatchApplier,
};
pub use config::{Config, ConfigError};
pub use diff::{FileDiff, Hunk, LineKind};
pub use git::{CommandEditor, GitCommandError, GitRepo};
pub use manager::{PatchManager, PatchManagerError, PatchStatus, PatchTarget};
pub use panel::{ApplyOutcome, LineByLineContext, PanelError, PatchBuildingPanel, StagingPanel};
pub use parse::ParseError;
pub use patch::PatchOptions;
pub use selection::{SelectionEvent, SelectionMode, SelectionState};

error_set! {
    /// Top-level error for git-linewise operations
    LineStagerError := {
        #[display("No changes found in {file}")]
        NoChanges { file: String },
        ParseError(ParseError),
        ConfigError(ConfigError),
        GitCommandError(GitCommandError),
        ExternalError(ExternalError),
        PanelError(PanelError),
        PatchManagerError(PatchManagerError),
    }
}

/// Main interface for git-linewise operations
pub struct LineStager {
    repo: GitRepo,
    config: Config,
}

impl LineStager {
    /// Create a new LineStager for the given repository path
    pub fn new(repo_path: impl Into<PathBuf>, config: Config) -> Self {
        Self {
            repo: GitRepo::new(repo_path, config.diff.context_lines),
            config,
        }
    }

    pub fn repo(&self) -> &GitRepo {
        &self.repo
    }

    /// Render a file's diff with the selection highlighted.
    ///
    /// Without `selected` the cursor sits on the first change. `plain`
    /// (or `render.color = false`) prints the diff as is.
    ///
    /// # Examples
    /// ```no_run
    /// # use git_linewise::{Config, LineStager};
    /// let stager = LineStager::new(".", Config::default());
    /// println!("{}", stager.show("flake.nix", false, Some(4), false).unwrap());
    /// ```
    pub fn show(
        &self,
        path: &str,
        staged: bool,
        selected: Option<usize>,
        plain: bool,
    ) -> Result<String, LineStagerError> {
        let panel = StagingPanel::new(staged);
        if !panel.refresh_from(&self.repo, path, selected)? {
            return Err(no_changes(path));
        }

        let rendered = if plain || !self.config.render.color {
            panel
                .panel()
                .with_active(|active| active.state.render_plain())
        } else {
            panel.content_to_render()
        };
        rendered.ok_or_else(|| no_changes(path))
    }

    /// Stage lines of the working tree diff
    ///
    /// # Examples
    /// ```no_run
    /// # use git_linewise::{Config, LineStager};
    /// let stager = LineStager::new(".", Config::default());
    /// stager.stage("flake.nix:5").unwrap();
    /// stager.stage("file.nix:4..9,12").unwrap();
    /// ```
    pub fn stage(&self, file_ref: &str) -> Result<ApplyOutcome, LineStagerError> {
        self.apply_refs(file_ref, false, false)
    }

    /// Remove lines of the staged diff from the index
    pub fn unstage(&self, file_ref: &str) -> Result<ApplyOutcome, LineStagerError> {
        self.apply_refs(file_ref, true, true)
    }

    /// Throw away lines of the working tree diff
    pub fn discard(&self, file_ref: &str) -> Result<ApplyOutcome, LineStagerError> {
        self.apply_refs(file_ref, false, true)
    }

    /// Extract the referenced lines of `diff_text` as a standalone patch.
    ///
    /// `diff_text` may cover several files; indices then refer to the
    /// referenced file's own section.
    pub fn extract(
        diff_text: &str,
        file_ref: &str,
        options: PatchOptions,
    ) -> Result<String, LineStagerError> {
        let refs = parse::parse_file_refs(file_ref)?;
        let full = diff::Diff::parse(diff_text);
        let section = match full.files.len() {
            0 | 1 => diff_text,
            _ => full.file(&refs.file).ok_or_else(|| no_changes(&refs.file))?,
        };

        Ok(patch::modified_patch_for_lines(
            &refs.file,
            section,
            &refs.indices(),
            options,
        ))
    }

    /// Assemble a custom patch from lines of several files between two refs.
    ///
    /// Returns the aggregate patch, coloured unless `plain`. With `apply` it
    /// is also applied to the working tree, reversed when `reverse`.
    pub fn build(
        &self,
        from: &str,
        to: &str,
        file_refs: &[String],
        reverse: bool,
        apply: bool,
        plain: bool,
    ) -> Result<String, LineStagerError> {
        let mut manager = PatchManager::new(self.repo.clone());
        manager.start(PatchTarget {
            from: from.to_string(),
            to: to.to_string(),
            reverse: false,
        });

        for file_ref in file_refs {
            let refs = parse::parse_file_refs(file_ref)?;
            for line_ref in &refs.refs {
                let (first, last) = line_ref.bounds();
                manager.add_file_line_range(&refs.file, first, last)?;
            }
        }

        if apply {
            manager.apply_patches(&self.repo, ApplyTarget::WorkingTree, reverse)?;
        }

        Ok(manager.render_aggregated_patch(plain || !self.config.render.color))
    }

    /// Edit the hunk around line `idx` in the configured editor and apply the result
    pub fn edit_hunk(
        &self,
        path: &str,
        idx: usize,
        staged: bool,
    ) -> Result<ApplyOutcome, LineStagerError> {
        let panel = StagingPanel::new(staged);
        if !panel.refresh_from(&self.repo, path, None)? {
            return Err(no_changes(path));
        }
        panel.navigate_to(idx);

        let editor = CommandEditor::new(self.config.editor_command());
        Ok(panel.edit_hunk(&editor, &self.repo)?)
    }

    /// Apply referenced lines of the staged or unstaged diff in one patch
    fn apply_refs(
        &self,
        file_ref: &str,
        staged: bool,
        reverse: bool,
    ) -> Result<ApplyOutcome, LineStagerError> {
        let refs = parse::parse_file_refs(file_ref)?;
        let panel = StagingPanel::new(staged);
        let diff_output = self.repo.diff(&panel.selector(&refs.file))?;

        if diff_output.trim().is_empty() {
            return Err(no_changes(&refs.file));
        }

        let patch = patch::modified_patch_for_lines(
            &refs.file,
            &diff_output,
            &refs.indices(),
            PatchOptions::default().reverse(reverse),
        );
        if patch.is_empty() {
            return Ok(ApplyOutcome::NothingToApply);
        }

        self.repo.apply(
            &patch,
            panel::staging::apply_target(staged, reverse),
            ApplyDirection::Forward,
        )?;
        Ok(ApplyOutcome::Applied)
    }
}

fn no_changes(path: &str) -> LineStagerError {
    LineStagerError::NoChanges {
        file: path.to_string(),
    }
}
