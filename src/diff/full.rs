use super::file::FileDiff;

/// The diff of one file, still as text, cut out of a multi-file diff
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSection {
    pub path: String,
    pub text: String,
}

/// A complete git diff covering any number of files
#[derive(Debug, Default)]
pub struct Diff {
    pub files: Vec<FileSection>,
}

impl Diff {
    /// Split `git diff` output into per-file sections.
    ///
    /// Text without any `diff --git` line is treated as a single file.
    /// Sections whose path cannot be determined are dropped.
    pub fn parse(text: &str) -> Self {
        let mut files = Vec::new();
        let mut current = String::new();

        for line in text.split_terminator('\n') {
            if line.starts_with("diff --git ") && !current.is_empty() {
                files.extend(section(std::mem::take(&mut current)));
            }
            current.push_str(line);
            current.push('\n');
        }

        if !current.is_empty() {
            files.extend(section(current));
        }

        Diff { files }
    }

    /// Text of the section for `path`
    pub fn file(&self, path: &str) -> Option<&str> {
        self.files
            .iter()
            .find(|section| section.path == path)
            .map(|section| section.text.as_str())
    }
}

fn section(text: String) -> Option<FileSection> {
    let path = FileDiff::parse(&text).path()?.to_string();
    Some(FileSection { path, text })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;

    #[test]
    fn parse_empty_diff() {
        let diff = Diff::parse("");
        assert!(diff.files.is_empty());
    }

    #[test]
    fn parse_single_file_without_git_header() {
        let diff = Diff::parse("--- a/a.txt\n+++ b/a.txt\n@@ -1 +1 @@\n-x\n+y\n");
        assert_eq!(diff.files.len(), 1);
        assert_eq!(diff.files[0].path, "a.txt");
    }

    #[test]
    fn parse_multiple_files() {
        let text = "\
diff --git a/flake.nix b/flake.nix
index abc1234..def5678 100644
--- a/flake.nix
+++ b/flake.nix
@@ -136,0 +137 @@
+      debug = true;
diff --git a/zsh.nix b/zsh.nix
index 6f2e06d..110fff0 100644
--- a/zsh.nix
+++ b/zsh.nix
@@ -15 +14,0 @@ line 14
-      enableAutosuggestions = true;
";
        let diff = Diff::parse(text);
        assert_eq!(diff.files.len(), 2);
        assert_eq!(diff.files[0].path, "flake.nix");
        assert_eq!(diff.files[1].path, "zsh.nix");
        assert_eq!(
            diff.file("zsh.nix").unwrap(),
            "diff --git a/zsh.nix b/zsh.nix\nindex 6f2e06d..110fff0 100644\n--- a/zsh.nix\n+++ b/zsh.nix\n@@ -15 +14,0 @@ line 14\n-      enableAutosuggestions = true;\n"
        );
        assert!(diff.file("missing.nix").is_none());
    }
}
