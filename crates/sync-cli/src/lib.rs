//! sync-cli library: Exposes internal modules for testing.
//!
//! This is a thin library layer over the CLI components, allowing
//! integration tests to access the native filesystem and the file-backed
//! document store.

pub mod file_store;
pub mod native_fs;

pub use file_store::FileDocStore;
pub use native_fs::NativeFs;
