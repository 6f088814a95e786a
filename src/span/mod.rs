//! Span Module - text location primitives
//!
//! - `position`: zero-based (row, column) points
//! - `range`: ordered start/end pair, shifted in place by edits
//! - `delta`: a text replacement coming from an editor or a structural edit
//! - `sector`: a typed range owned by a task, a transition or the workflow
//!
//! Columns count chars, not bytes.

mod delta;
mod position;
mod range;
mod sector;

pub use delta::Delta;
pub use position::Position;
pub use range::Range;
pub use sector::{Sector, SectorOwner, SectorType, TransitionId};
