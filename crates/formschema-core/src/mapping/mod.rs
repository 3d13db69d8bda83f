//! Repeatable field mapping
//!
//! Resolves unbounded lists of client entries (addresses, employers, family
//! members) onto the finite, pattern-named fields of a form layout.

mod field;
mod mapper;
mod section;

pub use field::{MappingError, RepeatableFieldMapping};
pub use mapper::{DropReason, EntryDropped, SectionMapping, map_section};
pub use section::{RepeatableSection, SectionError};
