//! Command implementations for gitsync

pub mod sync;
pub mod version;
