//! Filesystem capability layer for the staging engine.
//!
//! The engine never touches `std::fs` or `tokio::fs` directly. Every side
//! effect (directory creation, recursive copy, rename, hashing, writing the
//! manifest) goes through [`FilesystemOperations`], which has two
//! implementations:
//! - [`LocalFilesystem`]: the real filesystem via `tokio::fs`
//! - [`MemoryFilesystem`]: an in-memory tree used by tests and dry runs
//!
//! Operations receive a [`PlatformContext`] so implementations can emit
//! platform events on the run's event channel.

pub mod core;
pub mod filesystem;
pub mod implementations;

pub use core::{Platform, PlatformContext};
pub use filesystem::FilesystemOperations;
pub use implementations::local::LocalFilesystem;
pub use implementations::memory::MemoryFilesystem;
