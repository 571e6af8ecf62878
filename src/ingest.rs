//! Turns a picker selection or a drop into a [`FileList`].

use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use log::{info, warn};

use crate::archive::{self, ArchiveFailure};
use crate::file_list::{FileList, SortPolicy};
use crate::media::FileHandle;
use crate::traverse::{self, DropEntry};

/// Where the paths came from.
#[derive(Debug, Clone)]
pub enum Source {
    /// Files chosen in a file dialog; taken as-is.
    Picker(Vec<PathBuf>),
    /// Files and folders dropped on the window; folders are walked.
    Drop(Vec<PathBuf>),
}

#[derive(Debug)]
pub struct Ingested {
    pub list: FileList,
    pub failures: Vec<ArchiveFailure>,
    /// Paths that were not images or zips, or could not be opened.
    pub ignored: usize,
}

pub fn ingest(source: Source, policy: SortPolicy) -> Ingested {
    let paths = match source {
        Source::Picker(paths) => paths,
        Source::Drop(paths) => {
            let entries: Vec<DropEntry> = paths.into_iter().map(DropEntry::from_path).collect();
            traverse::collect_files(&entries)
        }
    };

    let total = paths.len();
    let handles: Vec<FileHandle> = paths
        .iter()
        .filter_map(|path| match FileHandle::open(path) {
            Ok(handle) => handle,
            Err(e) => {
                warn!("Cannot open {}: {}", path.display(), e);
                None
            }
        })
        .collect();
    let ignored = total - handles.len();

    let expansion = archive::expand(handles);
    let list = FileList::build(expansion.files, policy);
    info!(
        "Ingested {} pages from {} paths ({} ignored, {} archive failures)",
        list.len(),
        total,
        ignored,
        expansion.failures.len()
    );

    Ingested {
        list,
        failures: expansion.failures,
        ignored,
    }
}

/// One ingestion running off the UI thread.
pub struct IngestJob {
    rx: Receiver<Ingested>,
}

impl IngestJob {
    pub fn spawn(source: Source, policy: SortPolicy) -> Self {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            // The receiver is gone if a newer job replaced this one.
            let _ = tx.send(ingest(source, policy));
        });
        Self { rx }
    }

    /// Returns the result once, when it is ready.
    pub fn poll(&self) -> Option<Ingested> {
        match self.rx.try_recv() {
            Ok(ingested) => Some(ingested),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                warn!("Ingestion thread ended without a result");
                Some(Ingested {
                    list: FileList::empty(),
                    failures: Vec::new(),
                    ignored: 0,
                })
            }
        }
    }
}
