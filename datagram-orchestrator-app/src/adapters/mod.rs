//! Storage adapters for the CLI.

#[cfg(feature = "file-store")]
mod file;

#[cfg(feature = "file-store")]
pub use file::FileStore;
