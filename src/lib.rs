//! Typed front-matter properties for markdown vaults.
//!
//! Notes named `DD_name` sit in a two-level hierarchy: the first digit picks
//! a category, the second marks the note as a parent (`0`) or a child.
//! The [`engine::Engine`] keeps a vault-wide map from metadata keys to
//! semantic types, follows keys when they are renamed, writes derived values
//! back, and applies role templates. Hosts plug in through the traits in
//! [`host`].

pub mod cli;
pub mod engine;
pub mod host;
pub mod io;
pub mod model;
pub mod ops;
pub mod parse;
