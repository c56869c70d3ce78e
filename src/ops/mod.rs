pub mod property_map;
pub mod reconcile;
pub mod render;
pub mod tag_colors;
pub mod template;
pub mod types;

pub use property_map::PropertyMap;
pub use tag_colors::TagColors;
