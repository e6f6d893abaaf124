//! sync-core: Shared library for folder-to-document synchronization.
//!
//! This crate provides the core functionality for:
//! - Building a hashed tree representation of a markdown folder
//! - Converting the tree to flat styled-paragraph document mutations
//! - Converting a remote document back to markdown and sections
//! - Three-way conflict detection, line merge and diff
//! - The per-folder sync decision procedure and its persisted metadata
//! - FileSystem, DocumentStore and TokenProvider trait abstractions

pub mod convert;
pub mod document;
pub mod engine;
pub mod frontmatter;
pub mod fs;
pub mod markdown;
pub mod merge;
pub mod metadata;
pub mod sections;
pub mod store;
pub mod tree;

pub use document::{DocMutation, Paragraph, ParagraphStyle, RemoteDocument, Section, StyledRun};
pub use engine::{BatchReport, SyncConfig, SyncEngine, SyncResult};
pub use fs::{FileEntry, FileSystem, InMemoryFs};
pub use merge::{ConflictInfo, ConflictKind, ContentDiff, DiffKind};
pub use metadata::{RemoteHash, SyncMetadata, METADATA_FILENAME};
pub use store::{DocumentHandle, DocumentStore, InMemoryDocStore, StaticTokens, TokenProvider};
pub use tree::{NodeKind, TreeNode};
