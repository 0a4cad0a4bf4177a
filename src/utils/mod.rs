//! Utility modules shared by the command tree
//!
//! Provides the shared-state handle and the recursive merge it is built on.

pub mod merge;
pub mod state;

pub use merge::recursive_merge;
pub use state::SharedState;
