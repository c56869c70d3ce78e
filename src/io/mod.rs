pub mod config_io;
pub mod memory;
pub mod settings_io;
pub mod vault;
pub mod watcher;

pub use memory::{MemoryVault, MemoryView};
pub use vault::{FsVault, discover_vault};
pub use watcher::{VaultEvent, VaultWatcher};
