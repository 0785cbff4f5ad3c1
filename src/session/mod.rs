//! Progressive rendering and persistent session state.

pub mod format;
pub mod history;
pub mod images;
pub mod playback;
pub mod queue;
pub mod settings;

pub use format::*;
pub use history::SearchHistoryStore;
pub use images::*;
pub use playback::*;
pub use queue::{EnqueueOutcome, QueueStore};
pub use settings::{load_settings, SessionSettings};
