//! Storage primitives.

pub mod atomic_json;
