pub mod osm;
pub mod records;

pub use osm::{Child, Element, ElementKind, TagEntry};
pub use records::{Record, RecordBundle};
