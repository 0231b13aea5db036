pub mod config;
pub mod error;
pub mod memory;
pub mod mode;
pub mod prompt;
pub mod session;
pub mod user;

// Re-export common error type
pub use error::LuminaError;
