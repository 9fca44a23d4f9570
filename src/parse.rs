//! Parsing for `file:refs` syntax into rendered line indices.
//!
//! Indices are zero-based positions in the diff as `git-linewise show`
//! prints it, file header lines included.
//!
//! # Syntax
//!
//! The expected format is `FILE:REFS` where:
//! - `FILE` is a file path (cannot be empty, may itself contain `:`)
//! - `REFS` is a comma-separated list of line references
//!
//! # Line Reference Types
//!
//! - `N` - the line at index N
//! - `N..M` - lines N through M (inclusive)
//!
//! # Examples
//!
//! ```
//! use git_linewise::parse::{parse_file_refs, LineRef};
//!
//! let refs = parse_file_refs("flake.nix:4").unwrap();
//! assert_eq!(refs.file, "flake.nix");
//! assert_eq!(refs.refs, vec![LineRef::Line(4)]);
//!
//! let refs = parse_file_refs("config.nix:3..6,9").unwrap();
//! assert_eq!(refs.refs, vec![LineRef::Range(3, 6), LineRef::Line(9)]);
//! ```

use error_set::error_set;

error_set! {
    /// Errors from parsing file:refs syntax
    ParseError := {
        /// Input string does not contain a colon separator
        #[display("Invalid format '{input}': expected 'file:refs'")]
        InvalidFormat { input: String },
        /// File name portion before the colon is empty or whitespace
        #[display("Invalid format '{input}': file name cannot be empty")]
        EmptyFileName { input: String },
        /// No line references provided after the colon
        #[display("No line references provided")]
        EmptyRefs,
        /// Line index could not be parsed
        #[display("Invalid line index '{value}'")]
        InvalidLineIndex { value: String },
        /// Range has start greater than end
        #[display("Invalid range {start}..{end}: start must be <= end")]
        InvalidRange { start: usize, end: usize },
    }
}

/// A reference to rendered diff lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineRef {
    Line(usize),
    /// Inclusive start and end
    Range(usize, usize),
}

impl LineRef {
    /// Inclusive `(first, last)` bounds
    pub fn bounds(self) -> (usize, usize) {
        match self {
            LineRef::Line(idx) => (idx, idx),
            LineRef::Range(start, end) => (start, end),
        }
    }
}

/// Parsed file reference with line selections.
#[derive(Debug, Clone, PartialEq)]
pub struct FileLineRefs {
    /// The file path
    pub file: String,
    /// The line references to select in this file
    pub refs: Vec<LineRef>,
}

impl FileLineRefs {
    /// Every referenced index, sorted and without duplicates
    pub fn indices(&self) -> Vec<usize> {
        let mut indices: Vec<usize> = self
            .refs
            .iter()
            .flat_map(|line_ref| {
                let (start, end) = line_ref.bounds();
                start..=end
            })
            .collect();
        indices.sort_unstable();
        indices.dedup();
        indices
    }
}

/// Parse a file:refs string into structured data.
///
/// The refs are taken after the last `:` so paths containing colons work.
///
/// # Errors
///
/// Returns [`ParseError`] if:
/// - Input doesn't contain `:` separator
/// - File name is empty or whitespace
/// - No line references provided
/// - Line indices are invalid
pub fn parse_file_refs(input: &str) -> Result<FileLineRefs, ParseError> {
    let Some((file, refs)) = input.rsplit_once(':') else {
        return Err(ParseError::InvalidFormat {
            input: input.to_string(),
        });
    };

    let file = file.trim();
    if file.is_empty() {
        return Err(ParseError::EmptyFileName {
            input: input.to_string(),
        });
    }

    Ok(FileLineRefs {
        file: file.to_string(),
        refs: parse_line_refs(refs)?,
    })
}

/// Parse the line references part (after the colon)
/// Examples: "4", "3..6", "4,9"
fn parse_line_refs(input: &str) -> Result<Vec<LineRef>, ParseError> {
    let refs: Vec<LineRef> = input
        .split(',')
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .map(parse_single_ref)
        .collect::<Result<Vec<_>, _>>()?;

    if refs.is_empty() {
        return Err(ParseError::EmptyRefs);
    }

    Ok(refs)
}

fn parse_single_ref(input: &str) -> Result<LineRef, ParseError> {
    match input.split_once("..") {
        Some((start, end)) => {
            let start = parse_index(start)?;
            let end = parse_index(end)?;
            if start > end {
                return Err(ParseError::InvalidRange { start, end });
            }
            Ok(LineRef::Range(start, end))
        }
        None => Ok(LineRef::Line(parse_index(input)?)),
    }
}

fn parse_index(input: &str) -> Result<usize, ParseError> {
    input
        .trim()
        .parse::<usize>()
        .map_err(|_| ParseError::InvalidLineIndex {
            value: input.to_string(),
        })
}
