//! Page-at-a-time reader for images and (nested) zip archives.
//!
//! Ingestion runs `traverse` → `archive` → `file_list`; the `viewer` walks
//! the resulting [`FileList`] and keeps its place in a [`PositionStore`].

pub mod app;
pub mod archive;
pub mod config;
pub mod error;
pub mod file_list;
pub mod ingest;
pub mod media;
pub mod position;
pub mod traverse;
pub mod viewer;

pub use error::{Error, Result};
pub use file_list::{DisplayEntry, FileList, Fingerprint, SortPolicy};
pub use ingest::{ingest, Ingested, Source};
pub use media::{FileHandle, MediaKind};
pub use position::PositionStore;
pub use viewer::{Navigation, Viewer, ViewerState};
