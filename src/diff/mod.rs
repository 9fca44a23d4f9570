pub mod file;
pub mod full;
pub mod hunk;

pub use file::{FileDiff, LineRole, RenderedLine};
pub use full::Diff;
pub use hunk::{DiffLine, Hunk, HunkHeader, LineKind};
