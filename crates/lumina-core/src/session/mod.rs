//! Chat session domain: messages, citations, the session model, and the
//! persistence trait.

pub mod message;
pub mod model;
pub mod repository;

pub use message::{Attachment, Citation, CitationSource, Message, MessageRole};
pub use model::Session;
pub use repository::SessionRepository;
