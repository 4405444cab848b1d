//! Filesystem capability implementations

pub mod local;
pub mod memory;
