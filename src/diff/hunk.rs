use nom::{
    IResult, Parser,
    bytes::complete::tag,
    character::complete::{char, digit1},
    combinator::{map_res, opt, rest},
    sequence::preceded,
};
use std::fmt;

/// Syntactic classification of a line inside a hunk body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// Anything that is not `+` or `-` prefixed, including `\ No newline` markers
    Context,
    /// `+` prefixed line
    Added,
    /// `-` prefixed line
    Removed,
}

impl LineKind {
    /// Classify a raw diff line by its first character
    pub fn of(raw: &str) -> Self {
        match raw.as_bytes().first() {
            Some(b'+') => LineKind::Added,
            Some(b'-') => LineKind::Removed,
            _ => LineKind::Context,
        }
    }

    /// Added or removed lines are the ones a selection can stage
    pub fn is_change(self) -> bool {
        !matches!(self, LineKind::Context)
    }
}

/// One physical line of a hunk body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffLine {
    /// The raw line, prefix character included
    pub content: String,
    pub kind: LineKind,
    /// Position within the full rendered diff
    pub index: usize,
}

impl DiffLine {
    pub fn new(content: &str, index: usize) -> Self {
        Self {
            content: content.to_string(),
            kind: LineKind::of(content),
            index,
        }
    }

    /// Line content without the leading prefix character
    pub fn text(&self) -> &str {
        let mut chars = self.content.chars();
        chars.next();
        chars.as_str()
    }

    /// `\ No newline at end of file` marker
    pub fn is_no_newline_marker(&self) -> bool {
        self.content.starts_with('\\')
    }
}

/// Numbers carried by a `@@ -a,b +c,d @@heading` line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HunkHeader {
    pub old_start: usize,
    pub old_len: usize,
    pub new_start: usize,
    pub new_len: usize,
    /// Text after the closing `@@`, leading space included
    pub heading: String,
}

impl HunkHeader {
    /// Parse a hunk header line, returning `None` if it is not one
    pub fn parse(line: &str) -> Option<Self> {
        header(line).ok().map(|(_, header)| header)
    }
}

fn number(input: &str) -> IResult<&str, usize> {
    map_res(digit1, str::parse::<usize>).parse(input)
}

fn header(input: &str) -> IResult<&str, HunkHeader> {
    let (input, (_, old_start, old_len, _, new_start, new_len, _, heading)) = (
        tag("@@ -"),
        number,
        opt(preceded(char(','), number)),
        tag(" +"),
        number,
        opt(preceded(char(','), number)),
        tag(" @@"),
        rest,
    )
        .parse(input)?;

    Ok((
        input,
        HunkHeader {
            old_start,
            old_len: old_len.unwrap_or(1),
            new_start,
            new_len: new_len.unwrap_or(1),
            heading: heading.trim_end_matches('\r').to_string(),
        },
    ))
}

impl fmt::Display for HunkHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let old_part = match self.old_len {
            1 => format!("-{}", self.old_start),
            n => format!("-{},{}", self.old_start, n),
        };

        let new_part = match self.new_len {
            1 => format!("+{}", self.new_start),
            n => format!("+{},{}", self.new_start, n),
        };

        write!(f, "@@ {} {} @@{}", old_part, new_part, self.heading)
    }
}

/// A single hunk from a unified diff
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hunk {
    /// The raw `@@` line as it appeared in the diff
    pub header: String,
    pub old_start: usize,
    pub old_len: usize,
    pub new_start: usize,
    pub new_len: usize,
    pub heading: String,
    /// Index of the first body line; the header sits one line above
    pub first_line_idx: usize,
    pub lines: Vec<DiffLine>,
}

impl Hunk {
    pub fn new(raw_header: &str, header: HunkHeader, first_line_idx: usize) -> Self {
        Self {
            header: raw_header.to_string(),
            old_start: header.old_start,
            old_len: header.old_len,
            new_start: header.new_start,
            new_len: header.new_len,
            heading: header.heading,
            first_line_idx,
            lines: Vec::new(),
        }
    }

    /// Index of the `@@` line
    pub fn header_idx(&self) -> usize {
        self.first_line_idx.saturating_sub(1)
    }

    /// Index of the last body line (the first body index for an empty hunk)
    pub fn last_line_idx(&self) -> usize {
        self.first_line_idx + self.lines.len().saturating_sub(1)
    }

    pub fn contains(&self, idx: usize) -> bool {
        idx >= self.first_line_idx && idx <= self.last_line_idx()
    }

    /// Line at a diff index, if it is one of this hunk's body lines
    pub fn line(&self, idx: usize) -> Option<&DiffLine> {
        idx.checked_sub(self.first_line_idx)
            .and_then(|offset| self.lines.get(offset))
    }

    /// New-file line number of the line at `idx`, clamped to the hunk body.
    ///
    /// Removed lines report the position they would occupy in the new file.
    pub fn line_number_of_line(&self, idx: usize) -> usize {
        let offset = idx
            .saturating_sub(self.first_line_idx)
            .min(self.lines.len().saturating_sub(1));

        self.new_start
            + self.lines[..offset]
                .iter()
                .filter(|line| line.kind != LineKind::Removed && !line.is_no_newline_marker())
                .count()
    }
}
