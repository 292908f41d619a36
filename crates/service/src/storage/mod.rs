//! Storage abstractions for service layer
//!
//! Each collection is one JSON array on disk, re-read on every call and
//! rewritten in full on every mutation.

pub mod json_collection_store;

pub use json_collection_store::JsonCollectionStore;
