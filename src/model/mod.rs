pub mod config;
pub mod hierarchy;
pub mod note;
pub mod semantic;
pub mod version;

pub use config::*;
pub use hierarchy::{HierarchyDescriptor, Role};
pub use note::{FrontMatter, NotePath};
pub use semantic::{SemanticType, StatusGlyph};
pub use version::{Direction, Segment, VersionValue};
