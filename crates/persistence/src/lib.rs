//! In-memory session and feedback stores (spec §6 external interfaces).
//!
//! No database driver lives in this workspace's dependency stack, so
//! `InMemorySessionStore`/`InMemoryFeedbackStore` are the only implementors
//! shipped. Both are trait objects behind `rag_core::{SessionStore,
//! FeedbackStore}`, so a durable backend can be swapped in later without
//! touching the server.

pub mod feedback;
pub mod sessions;

pub use feedback::InMemoryFeedbackStore;
pub use sessions::InMemorySessionStore;
