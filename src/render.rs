//! Text rendering of a parsed diff.
//!
//! Colours are plain ANSI SGR sequences. Selected lines get a background,
//! lines already included in a custom patch get a highlighted prefix column.

use crate::diff::{FileDiff, LineKind, LineRole, RenderedLine};

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const CYAN: &str = "\x1b[36m";
const INCLUDED_BG: &str = "\x1b[42m";
const SELECTED_BG: &str = "\x1b[44m";

/// Render the whole diff.
///
/// `selection` is an inclusive `(first, last)` index range, `included` the
/// indices to mark as already part of a custom patch.
pub fn render(
    diff: &FileDiff,
    selection: Option<(usize, usize)>,
    included: &[usize],
    color: bool,
) -> String {
    let is_selected = |idx: usize| selection.is_some_and(|(first, last)| idx >= first && idx <= last);

    diff.lines()
        .map(|line| {
            if color {
                format_line(
                    line.text,
                    style_for(&line),
                    is_selected(line.index),
                    included.contains(&line.index),
                )
            } else {
                line.text.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Raw text of the lines in `[first, last]`, joined by newlines
pub fn plain_render_lines(diff: &FileDiff, first: usize, last: usize) -> String {
    diff.lines()
        .filter(|line| line.index >= first && line.index <= last)
        .map(|line| line.text)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Colour an arbitrary patch with nothing selected
pub fn colorize_patch(patch: &str) -> String {
    if patch.is_empty() {
        return String::new();
    }
    render(&FileDiff::parse(patch), None, &[], true)
}

fn style_for(line: &RenderedLine<'_>) -> &'static str {
    match line.role {
        LineRole::FileHeader => BOLD,
        LineRole::HunkHeader => CYAN,
        LineRole::Body(LineKind::Added) => GREEN,
        LineRole::Body(LineKind::Removed) => RED,
        LineRole::Body(LineKind::Context) => "",
    }
}

fn format_line(text: &str, style: &str, selected: bool, included: bool) -> String {
    let mut text_style = style.to_string();
    if selected {
        text_style.push_str(SELECTED_BG);
    }

    if !included {
        return paint(&text_style, text);
    }
    let prefix_style = format!("{text_style}{INCLUDED_BG}");

    match text.chars().next() {
        Some(first) if text.len() > first.len_utf8() => {
            let (prefix, rest) = text.split_at(first.len_utf8());
            paint(&prefix_style, prefix) + &paint(&text_style, rest)
        }
        _ => paint(&prefix_style, text),
    }
}

fn paint(style: &str, text: &str) -> String {
    if style.is_empty() || text.is_empty() {
        text.to_string()
    } else {
        format!("{style}{text}{RESET}")
    }
}
