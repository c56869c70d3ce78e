pub mod front_matter;

pub use front_matter::{parse_front_matter, render_note, split};
