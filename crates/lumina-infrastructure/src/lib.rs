//! File-backed persistence for LUMINA.
//!
//! Everything the application remembers between runs lives as JSON files
//! under the configuration directory, written through an atomic-rename
//! storage layer.

pub mod history;
pub mod memory;
pub mod paths;
pub mod profile;
pub mod storage;

pub use history::JsonHistoryRepository;
pub use memory::JsonMemoryRepository;
pub use paths::LuminaPaths;
pub use profile::UserProfileStore;
pub use storage::atomic_json::AtomicJsonFile;
