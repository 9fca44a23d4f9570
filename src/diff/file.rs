use super::hunk::{DiffLine, Hunk, HunkHeader, LineKind};

/// What a physical line of the rendered diff is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineRole {
    /// `diff --git`, `index`, `---`, `+++` and friends
    FileHeader,
    /// The `@@` line of a hunk
    HunkHeader,
    /// A hunk body line or a line of the trailing block
    Body(LineKind),
}

/// A physical line of the rendered diff together with its index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderedLine<'a> {
    pub index: usize,
    pub text: &'a str,
    pub role: LineRole,
}

/// A parsed unified diff for a single file.
///
/// Every physical line of the input has exactly one index: preamble lines
/// come first, then each hunk's `@@` header followed by its body, then any
/// trailing lines the parser could not attach to a hunk.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FileDiff {
    /// File header lines before the first hunk
    pub preamble: Vec<String>,
    pub hunks: Vec<Hunk>,
    /// Remainder of a malformed diff, kept as context
    pub trailing: Vec<DiffLine>,
}

impl FileDiff {
    /// Parse the diff of one file.
    ///
    /// Never fails. A missing or unreadable hunk header where one is
    /// expected turns the rest of the input into a trailing context block.
    /// Lines are split on `\n` only; a `\r` stays part of the line.
    pub fn parse(text: &str) -> Self {
        let mut diff = FileDiff::default();
        let mut expect_hunk = false;
        let mut index = 0;
        let mut lines = text.split_terminator('\n');

        while let Some(line) = lines.next() {
            if line.starts_with("@@") {
                match HunkHeader::parse(line) {
                    Some(header) => {
                        diff.hunks.push(Hunk::new(line, header, index + 1));
                    }
                    None => {
                        tracing::warn!(index, line, "unreadable hunk header, keeping rest as context");
                        diff.push_trailing(line, &mut lines, index);
                        break;
                    }
                }
            } else if let Some(hunk) = diff.hunks.last_mut() {
                hunk.lines.push(DiffLine::new(line, index));
            } else if expect_hunk {
                tracing::warn!(index, line, "missing hunk header, keeping rest as context");
                diff.push_trailing(line, &mut lines, index);
                break;
            } else {
                expect_hunk = line.starts_with("+++ ");
                diff.preamble.push(line.to_string());
            }
            index += 1;
        }

        diff
    }

    fn push_trailing<'a>(
        &mut self,
        first: &str,
        rest: &mut impl Iterator<Item = &'a str>,
        first_idx: usize,
    ) {
        self.trailing.push(trailing_line(first, first_idx));
        for (offset, line) in rest.enumerate() {
            self.trailing.push(trailing_line(line, first_idx + 1 + offset));
        }
    }

    /// File path from the `+++ b/` header, falling back to `--- a/`
    pub fn path(&self) -> Option<&str> {
        let find = |prefix: &str| {
            self.preamble
                .iter()
                .find_map(|line| line.strip_prefix(prefix))
                .map(|path| path.trim_end_matches('\r'))
                .filter(|path| !path.is_empty())
        };
        find("+++ b/").or_else(|| find("--- a/"))
    }

    /// Total number of physical lines
    pub fn line_count(&self) -> usize {
        self.preamble.len()
            + self
                .hunks
                .iter()
                .map(|hunk| hunk.lines.len() + 1)
                .sum::<usize>()
            + self.trailing.len()
    }

    /// Walk every physical line in order
    pub fn lines(&self) -> impl Iterator<Item = RenderedLine<'_>> {
        let preamble = self
            .preamble
            .iter()
            .enumerate()
            .map(|(index, text)| RenderedLine {
                index,
                text,
                role: LineRole::FileHeader,
            });

        let hunks = self.hunks.iter().flat_map(|hunk| {
            let header = RenderedLine {
                index: hunk.header_idx(),
                text: &hunk.header,
                role: LineRole::HunkHeader,
            };
            std::iter::once(header).chain(hunk.lines.iter().map(body_line))
        });

        preamble
            .chain(hunks)
            .chain(self.trailing.iter().map(body_line))
    }

    /// Raw text of the line at `idx`
    pub fn line_text(&self, idx: usize) -> Option<&str> {
        if let Some(line) = self.preamble.get(idx) {
            return Some(line);
        }

        if let Some(hunk) = self.hunk_for_line(idx) {
            if idx == hunk.header_idx() {
                return Some(&hunk.header);
            }
            if let Some(line) = hunk.line(idx) {
                return Some(&line.content);
            }
        }

        self.trailing
            .iter()
            .find(|line| line.index == idx)
            .map(|line| line.content.as_str())
    }

    /// Index of the hunk whose header is at or before `idx`.
    ///
    /// Preamble lines belong to the first hunk, trailing lines to the last.
    /// `None` only when there are no hunks at all.
    pub fn hunk_index_for_line(&self, idx: usize) -> Option<usize> {
        if self.hunks.is_empty() {
            return None;
        }

        let after = self
            .hunks
            .partition_point(|hunk| hunk.header_idx() <= idx);
        Some(after.saturating_sub(1))
    }

    pub fn hunk_for_line(&self, idx: usize) -> Option<&Hunk> {
        self.hunk_index_for_line(idx)
            .and_then(|i| self.hunks.get(i))
    }

    /// Indices of all added and removed lines, in order
    pub fn stageable_lines(&self) -> Vec<usize> {
        self.hunks
            .iter()
            .flat_map(|hunk| hunk.lines.iter())
            .filter(|line| line.kind.is_change())
            .map(|line| line.index)
            .collect()
    }

    pub fn is_stageable(&self, idx: usize) -> bool {
        self.hunk_for_line(idx)
            .and_then(|hunk| hunk.line(idx))
            .is_some_and(|line| line.kind.is_change())
    }

    /// First stageable line at or after `idx`, else the last stageable line
    pub fn next_stageable_line_index(&self, idx: usize) -> Option<usize> {
        let stageable = self.stageable_lines();
        stageable
            .iter()
            .copied()
            .find(|&line| line >= idx)
            .or_else(|| stageable.last().copied())
    }
}

fn trailing_line(text: &str, index: usize) -> DiffLine {
    DiffLine {
        content: text.to_string(),
        kind: LineKind::Context,
        index,
    }
}

fn body_line(line: &DiffLine) -> RenderedLine<'_> {
    RenderedLine {
        index: line.index,
        text: &line.content,
        role: LineRole::Body(line.kind),
    }
}
