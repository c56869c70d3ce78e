pub mod scheduler;
pub mod service;
pub mod settings;

pub use scheduler::{Clock, ManualClock, Scheduler, SystemClock, Task};
pub use service::{Confirm, Engine, EngineError, NormalizeReport, RepaintOutcome, SkipReason};
pub use settings::{MemorySink, PersistedSettings, Settings, SettingsError, SettingsSink};
