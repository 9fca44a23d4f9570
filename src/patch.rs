//! Carving appliable sub-patches out of a single file's diff.
//!
//! The extractor re-walks the original diff and keeps, per hunk, every
//! context line plus the selected changes. Unselected changes are turned
//! into whatever keeps the hunk appliable against the side of the file it
//! will be applied to: a removal that is not selected still exists in the
//! pre-image, so it becomes context; an addition that is not selected does
//! not exist there, so it is dropped. Hunk headers are recomputed from the
//! surviving lines.
//!
//! An empty string is returned when nothing is left to apply.
//!
//! ```
//! use git_linewise::patch::{PatchOptions, modified_patch_for_range};
//!
//! let diff = "--- a/f\n+++ b/f\n@@ -1,2 +1,2 @@\n-a\n+b\n c\n";
//! let patch = modified_patch_for_range("f", diff, 4, 4, PatchOptions::default());
//! assert_eq!(patch, "--- a/f\n+++ b/f\n@@ -1,2 +1,3 @@\n a\n+b\n c\n");
//! ```

use crate::diff::{FileDiff, Hunk, HunkHeader};

/// How to turn a selection into a patch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatchOptions {
    /// Produce a patch that undoes the selected changes
    pub reverse: bool,
    /// Reuse the diff's own file header instead of a minimal `---`/`+++` pair
    pub keep_original_header: bool,
}

impl PatchOptions {
    pub fn reverse(mut self, reverse: bool) -> Self {
        self.reverse = reverse;
        self
    }

    pub fn keep_original_header(mut self, keep: bool) -> Self {
        self.keep_original_header = keep;
        self
    }
}

/// Build a patch containing only the changes in `[first_line_idx, last_line_idx]`.
///
/// The bounds may be given in either order.
pub fn modified_patch_for_range(
    file_path: &str,
    diff_text: &str,
    first_line_idx: usize,
    last_line_idx: usize,
    options: PatchOptions,
) -> String {
    let (first, last) = if first_line_idx <= last_line_idx {
        (first_line_idx, last_line_idx)
    } else {
        (last_line_idx, first_line_idx)
    };

    transform(file_path, diff_text, |idx| idx >= first && idx <= last, options)
}

/// Build a patch containing only the changes at the given line indices
pub fn modified_patch_for_lines(
    file_path: &str,
    diff_text: &str,
    line_indices: &[usize],
    options: PatchOptions,
) -> String {
    let mut selected = line_indices.to_vec();
    selected.sort_unstable();
    selected.dedup();

    transform(
        file_path,
        diff_text,
        |idx| selected.binary_search(&idx).is_ok(),
        options,
    )
}

fn transform<F>(file_path: &str, diff_text: &str, is_selected: F, options: PatchOptions) -> String
where
    F: Fn(usize) -> bool,
{
    let diff = FileDiff::parse(diff_text);

    let mut start_offset: isize = 0;
    let mut hunks = Vec::new();
    for hunk in &diff.hunks {
        let body = updated_lines(hunk, &is_selected, options.reverse);
        if let Some(formatted) = format_hunk(hunk, &body, &mut start_offset, options.reverse) {
            hunks.push(formatted);
        }
    }

    if hunks.is_empty() {
        tracing::debug!(file_path, "selection contains no changes");
        return String::new();
    }

    tracing::debug!(
        file_path,
        hunks = hunks.len(),
        reverse = options.reverse,
        "extracted patch"
    );

    let mut patch = if options.keep_original_header {
        diff.preamble
            .iter()
            .map(|line| format!("{line}\n"))
            .collect::<String>()
    } else {
        format!("--- a/{file_path}\n+++ b/{file_path}\n")
    };
    patch.extend(hunks);
    patch
}

/// Filter a hunk's body down to the lines that survive the selection
fn updated_lines<F>(hunk: &Hunk, is_selected: &F, reverse: bool) -> Vec<String>
where
    F: Fn(usize) -> bool,
{
    let mut skipped_marker_idx = None;
    let mut lines = Vec::with_capacity(hunk.lines.len());

    for line in &hunk.lines {
        let Some(first) = line.content.chars().next() else {
            lines.push(" ".to_string());
            continue;
        };
        let text = line.text();

        if first == '\\' {
            if skipped_marker_idx != Some(line.index) {
                lines.push(line.content.clone());
            }
            continue;
        }

        let selected = is_selected(line.index);
        match transformed_prefix(first, reverse, selected) {
            Some(' ') => lines.push(format!(" {text}")),
            Some(prefix) if selected => lines.push(format!("{prefix}{text}")),
            // the marker that follows a dropped line describes that line
            _ => skipped_marker_idx = Some(line.index + 1),
        }
    }

    settle_no_newline_markers(lines)
}

/// Keep `\ No newline at end of file` only after the last line of a side.
///
/// A context line without newline that is followed by more new-side lines
/// is split into a removal and an addition that ends in a newline. An
/// addition in the same spot simply loses its marker.
fn settle_no_newline_markers(body: Vec<String>) -> Vec<String> {
    let last_new = body
        .iter()
        .rposition(|line| line.starts_with(|c: char| c == '+' || c == ' '));
    let mut settled = Vec::with_capacity(body.len() + 1);
    let mut lines = body.into_iter().enumerate().peekable();

    while let Some((idx, line)) = lines.next() {
        let Some((_, marker)) = lines.next_if(|(_, next)| next.starts_with('\\')) else {
            settled.push(line);
            continue;
        };

        if Some(idx) == last_new || line.starts_with('-') {
            settled.push(line);
            settled.push(marker);
        } else if let Some(text) = line.strip_prefix(' ') {
            settled.push(format!("-{text}"));
            settled.push(marker);
            settled.push(format!("+{text}"));
        } else {
            settled.push(line);
        }
    }

    settled
}

/// The prefix a line carries in the output, or `None` for unknown lines
fn transformed_prefix(first: char, reverse: bool, selected: bool) -> Option<char> {
    let prefix = match (first, reverse) {
        ('+', true) if !selected => ' ',
        ('+', true) => '-',
        ('-', true) => '+',
        ('-', false) if !selected => ' ',
        (prefix @ ('+' | '-' | ' '), _) => prefix,
        _ => return None,
    };
    Some(prefix)
}

/// Render a filtered hunk with a recomputed header, or `None` if it has no changes
fn format_hunk(
    hunk: &Hunk,
    body: &[String],
    start_offset: &mut isize,
    reverse: bool,
) -> Option<String> {
    let count = |prefixes: &[char]| {
        body.iter()
            .filter(|line| line.chars().next().is_some_and(|c| prefixes.contains(&c)))
            .count()
    };

    if count(&['+', '-']) == 0 {
        return None;
    }

    let old_len = count(&[' ', '-']);
    let new_len = count(&['+', ' ']);
    let old_start = if reverse {
        hunk.new_start
    } else {
        hunk.old_start
    };

    let mut new_start = old_start as isize + *start_offset;
    if old_len == 0 {
        new_start += 1;
    }
    if new_len == 0 {
        new_start -= 1;
    }
    *start_offset += new_len as isize - old_len as isize;

    let header = HunkHeader {
        old_start,
        old_len,
        new_start: new_start.max(0) as usize,
        new_len,
        heading: hunk.heading.clone(),
    };

    let mut formatted = format!("{header}\n");
    for line in body {
        formatted.push_str(line);
        formatted.push('\n');
    }
    Some(formatted)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;

    const TWO_HUNKS: &str = "\
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

    #[test]
    fn changed_lines_of_first_hunk_only() {
        let patch = modified_patch_for_range("notes.txt", TWO_HUNKS, 4, 5, PatchOptions::default());
        assert_eq!(
            patch,
            "--- a/notes.txt\n+++ b/notes.txt\n@@ -1,3 +1,3 @@\n one\n-two\n+TWO\n three\n"
        );
    }

    #[test]
    fn range_bounds_in_any_order() {
        let forward = modified_patch_for_range("notes.txt", TWO_HUNKS, 4, 5, PatchOptions::default());
        let backward = modified_patch_for_range("notes.txt", TWO_HUNKS, 5, 4, PatchOptions::default());
        assert_eq!(forward, backward);
    }

    #[test]
    fn only_the_addition() {
        let patch = modified_patch_for_range("notes.txt", TWO_HUNKS, 5, 5, PatchOptions::default());
        assert_eq!(
            patch,
            "--- a/notes.txt\n+++ b/notes.txt\n@@ -1,3 +1,4 @@\n one\n two\n+TWO\n three\n"
        );
    }

    #[test]
    fn only_the_removal() {
        let patch = modified_patch_for_range("notes.txt", TWO_HUNKS, 4, 4, PatchOptions::default());
        assert_eq!(
            patch,
            "--- a/notes.txt\n+++ b/notes.txt\n@@ -1,3 +1,2 @@\n one\n-two\n three\n"
        );
    }

    #[test]
    fn second_hunk_shifts_by_earlier_changes() {
        let patch = modified_patch_for_range("notes.txt", TWO_HUNKS, 4, 9, PatchOptions::default());
        assert_eq!(
            patch,
            "--- a/notes.txt\n+++ b/notes.txt\n@@ -1,3 +1,3 @@\n one\n-two\n+TWO\n three\n@@ -10,2 +10,3 @@ section\n ten\n+ten and a half\n eleven\n"
        );

        // dropping the removal from the first hunk moves the second one down
        let patch = modified_patch_for_lines("notes.txt", TWO_HUNKS, &[5, 9], PatchOptions::default());
        assert_eq!(
            patch,
            "--- a/notes.txt\n+++ b/notes.txt\n@@ -1,3 +1,4 @@\n one\n two\n+TWO\n three\n@@ -10,2 +11,3 @@ section\n ten\n+ten and a half\n eleven\n"
        );
    }

    #[test]
    fn context_only_range_is_empty() {
        assert_eq!(
            modified_patch_for_range("notes.txt", TWO_HUNKS, 0, 3, PatchOptions::default()),
            ""
        );
        assert_eq!(
            modified_patch_for_range("notes.txt", TWO_HUNKS, 6, 8, PatchOptions::default()),
            ""
        );
        assert_eq!(
            modified_patch_for_lines("notes.txt", TWO_HUNKS, &[], PatchOptions::default()),
            ""
        );
    }

    #[test]
    fn reverse_whole_hunk() {
        let options = PatchOptions::default().reverse(true);
        let patch = modified_patch_for_range("notes.txt", TWO_HUNKS, 3, 6, options);
        assert_eq!(
            patch,
            "--- a/notes.txt\n+++ b/notes.txt\n@@ -1,3 +1,3 @@\n one\n+two\n-TWO\n three\n"
        );
    }

    #[test]
    fn reverse_only_the_addition() {
        let options = PatchOptions::default().reverse(true);
        let patch = modified_patch_for_range("notes.txt", TWO_HUNKS, 5, 5, options);
        assert_eq!(
            patch,
            "--- a/notes.txt\n+++ b/notes.txt\n@@ -1,3 +1,2 @@\n one\n-TWO\n three\n"
        );
    }

    #[test]
    fn reverse_only_the_removal() {
        let options = PatchOptions::default().reverse(true);
        let patch = modified_patch_for_range("notes.txt", TWO_HUNKS, 4, 4, options);
        assert_eq!(
            patch,
            "--- a/notes.txt\n+++ b/notes.txt\n@@ -1,3 +1,4 @@\n one\n+two\n TWO\n three\n"
        );
    }

    #[test]
    fn keep_original_header() {
        let diff = "\
diff --git a/f b/f
index 1111111..2222222 100644
--- a/f
+++ b/f
@@ -1 +1 @@
-a
+b
";
        let options = PatchOptions::default().keep_original_header(true);
        let patch = modified_patch_for_range("ignored", diff, 0, 100, options);
        assert_eq!(patch, diff);
    }

    #[test]
    fn pure_insertion_without_context() {
        let diff = "--- a/f\n+++ b/f\n@@ -5,0 +6,2 @@\n+one\n+two\n";
        let patch = modified_patch_for_range("f", diff, 4, 4, PatchOptions::default());
        assert_eq!(patch, "--- a/f\n+++ b/f\n@@ -5,0 +6 @@\n+two\n");
    }

    #[test]
    fn pure_deletion_without_context() {
        let diff = "--- a/f\n+++ b/f\n@@ -10,2 +9,0 @@\n-gone\n-also gone\n";
        let patch = modified_patch_for_range("f", diff, 3, 3, PatchOptions::default());
        assert_eq!(patch, "--- a/f\n+++ b/f\n@@ -10,2 +10 @@\n-gone\n also gone\n");
    }

    #[test]
    fn new_file_keeps_zero_start() {
        let diff = "--- /dev/null\n+++ b/new.txt\n@@ -0,0 +1,2 @@\n+first\n+second\n";
        let patch = modified_patch_for_range("new.txt", diff, 3, 3, PatchOptions::default());
        assert_eq!(patch, "--- a/new.txt\n+++ b/new.txt\n@@ -0,0 +1 @@\n+first\n");
    }

    #[test]
    fn no_newline_marker_follows_its_line() {
        let diff = "\
--- a/f
+++ b/f
@@ -1,2 +1,2 @@
 keep
-old
\\ No newline at end of file
+new
\\ No newline at end of file
";
        // selecting only the removal drops the addition and its marker
        let patch = modified_patch_for_range("f", diff, 4, 4, PatchOptions::default());
        assert_eq!(
            patch,
            "--- a/f\n+++ b/f\n@@ -1,2 +1 @@\n keep\n-old\n\\ No newline at end of file\n"
        );

        // selecting both keeps both markers
        let patch = modified_patch_for_range("f", diff, 4, 6, PatchOptions::default());
        assert_eq!(patch, diff);
    }

    #[test]
    fn unselected_removal_without_newline_gains_one() {
        let diff = "\
--- a/f
+++ b/f
@@ -1,2 +1,2 @@
 keep
-old
\\ No newline at end of file
+new
\\ No newline at end of file
";
        // only the addition: `old` stays but can no longer end the file
        let patch = modified_patch_for_range("f", diff, 6, 6, PatchOptions::default());
        assert_eq!(
            patch,
            "--- a/f\n+++ b/f\n@@ -1,2 +1,3 @@\n keep\n-old\n\\ No newline at end of file\n+old\n+new\n\\ No newline at end of file\n"
        );

        // reversed, the restored `old` comes before the kept `new`
        let options = PatchOptions::default().reverse(true);
        let patch = modified_patch_for_range("f", diff, 4, 4, options);
        assert_eq!(
            patch,
            "--- a/f\n+++ b/f\n@@ -1,2 +1,3 @@\n keep\n+old\n new\n\\ No newline at end of file\n"
        );
    }

    #[test]
    fn crlf_lines_survive_extraction() {
        let diff = "--- a/f\n+++ b/f\n@@ -1,3 +1,3 @@\n a\r\n-b\r\n+B\r\n c\r\n";
        let patch = modified_patch_for_range("f", diff, 5, 5, PatchOptions::default());
        assert_eq!(
            patch,
            "--- a/f\n+++ b/f\n@@ -1,3 +1,4 @@\n a\r\n b\r\n+B\r\n c\r\n"
        );
    }

    #[test]
    fn transformed_prefixes() {
        assert_eq!(transformed_prefix('+', false, true), Some('+'));
        assert_eq!(transformed_prefix('+', false, false), Some('+'));
        assert_eq!(transformed_prefix('-', false, false), Some(' '));
        assert_eq!(transformed_prefix('-', true, false), Some('+'));
        assert_eq!(transformed_prefix('+', true, false), Some(' '));
        assert_eq!(transformed_prefix('+', true, true), Some('-'));
        assert_eq!(transformed_prefix(' ', true, true), Some(' '));
        assert_eq!(transformed_prefix('x', false, true), None);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::diff::LineKind;
    use proptest::prelude::*;

    /// Apply `patch` to `text`, checking every context line, removed line,
    /// hunk start and hunk count. `None` when the patch does not apply.
    fn apply(patch: &str, text: &str) -> Option<String> {
        let parsed = FileDiff::parse(patch);
        let old: Vec<&str> = text.lines().collect();
        let mut out: Vec<&str> = Vec::new();
        let mut pos = 0;

        for hunk in &parsed.hunks {
            let start = if hunk.old_len == 0 {
                hunk.old_start
            } else {
                hunk.old_start.checked_sub(1)?
            };
            if start < pos || start > old.len() {
                return None;
            }
            out.extend(&old[pos..start]);
            pos = start;

            let expected_new_start = out.len() + usize::from(hunk.new_len > 0);
            if hunk.new_start != expected_new_start {
                return None;
            }

            let (mut old_len, mut new_len) = (0, 0);
            for line in &hunk.lines {
                let text = line.text();
                match line.kind {
                    LineKind::Context | LineKind::Removed => {
                        if old.get(pos) != Some(&text) {
                            return None;
                        }
                        pos += 1;
                        old_len += 1;
                        if line.kind == LineKind::Context {
                            out.push(text);
                            new_len += 1;
                        }
                    }
                    LineKind::Added => {
                        out.push(text);
                        new_len += 1;
                    }
                }
            }
            if (old_len, new_len) != (hunk.old_len, hunk.new_len) {
                return None;
            }
        }

        out.extend(&old[pos..]);
        Some(out.iter().map(|line| format!("{line}\n")).collect())
    }

    /// A file diff made of hunks that each open with a context line, plus
    /// the pre-image and post-image it describes
    fn arb_diff() -> impl Strategy<Value = (String, String, String)> {
        let op = (0u8..3, prop::sample::select(vec!["a", "b", "c", "d"]));
        let hunk = (
            prop::sample::select(vec!["x", "y"]),
            prop::collection::vec(op, 1..6),
        );
        prop::collection::vec(hunk, 1..4).prop_map(|hunks| {
            let mut diff = String::from("--- a/f\n+++ b/f\n");
            let (mut pre, mut post) = (String::new(), String::new());
            let (mut old_start, mut new_start) = (1, 1);

            for (first, ops) in hunks {
                let mut body = format!(" {first}\n");
                pre.push_str(&format!("{first}\n"));
                post.push_str(&format!("{first}\n"));
                let (mut old_len, mut new_len) = (1, 1);

                for (kind, text) in ops {
                    match kind {
                        0 => {
                            body.push_str(&format!(" {text}\n"));
                            pre.push_str(&format!("{text}\n"));
                            post.push_str(&format!("{text}\n"));
                            old_len += 1;
                            new_len += 1;
                        }
                        1 => {
                            body.push_str(&format!("-{text}\n"));
                            pre.push_str(&format!("{text}\n"));
                            old_len += 1;
                        }
                        _ => {
                            body.push_str(&format!("+{text}\n"));
                            post.push_str(&format!("{text}\n"));
                            new_len += 1;
                        }
                    }
                }

                diff.push_str(&format!("@@ -{old_start},{old_len} +{new_start},{new_len} @@\n"));
                diff.push_str(&body);
                old_start += old_len;
                new_start += new_len;
            }

            (diff, pre, post)
        })
    }

    proptest! {
        /// Every line selected forward extracts the whole diff, and reversed undoes it
        #[test]
        fn whole_diff_applies_both_ways((diff, pre, post) in arb_diff()) {
            let last = FileDiff::parse(&diff).line_count();
            let forward = modified_patch_for_range("f", &diff, 0, last, PatchOptions::default());
            let reverse = modified_patch_for_range("f", &diff, 0, last, PatchOptions::default().reverse(true));

            if forward.is_empty() {
                prop_assert_eq!(&pre, &post);
            } else {
                prop_assert_eq!(apply(&forward, &pre), Some(post.clone()));
                prop_assert_eq!(apply(&reverse, &post), Some(pre));
            }
        }

        /// Applying a partial patch and then its reverse restores the pre-image
        #[test]
        fn forward_then_reverse_restores(
            (diff, pre, _post) in arb_diff(),
            a in 0usize..40,
            b in 0usize..40,
        ) {
            let forward = modified_patch_for_range("f", &diff, a, b, PatchOptions::default());
            prop_assume!(!forward.is_empty());

            let applied = apply(&forward, &pre);
            prop_assert!(applied.is_some(), "forward patch does not apply:\n{}", forward);
            let mid = applied.unwrap_or_default();

            // the forward patch is itself the diff from the pre-image to `mid`
            let last = FileDiff::parse(&forward).line_count();
            let reverse = modified_patch_for_range("f", &forward, 0, last, PatchOptions::default().reverse(true));
            prop_assert_eq!(apply(&reverse, &mid), Some(pre));
        }

        /// A partial reverse patch applies to the post-image
        #[test]
        fn partial_reverse_applies_to_post_image(
            (diff, _pre, post) in arb_diff(),
            a in 0usize..40,
            b in 0usize..40,
        ) {
            let reverse = modified_patch_for_range("f", &diff, a, b, PatchOptions::default().reverse(true));
            prop_assume!(!reverse.is_empty());
            prop_assert!(apply(&reverse, &post).is_some(), "reverse patch does not apply:\n{}", reverse);
        }
    }
}
