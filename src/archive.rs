//! Recursive zip expansion.
//!
//! The expander turns a set of images and zip archives into a flat,
//! deterministically ordered list of images. Archives nested inside
//! archives are expanded in place, depth-first, with each level sorted by
//! name so the output never depends on decompression timing.

use std::io::{Cursor, Read};
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::thread;

use log::{debug, warn};
use zip::ZipArchive;

use crate::error::{Error, Result};
use crate::media::{is_metadata, FileHandle, MediaKind};

type MemoryArchive = ZipArchive<Cursor<Arc<[u8]>>>;

/// Upper bound on threads used to decompress the members of one archive.
const MAX_MEMBER_WORKERS: usize = 8;

/// A branch of the expansion that was dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveFailure {
    /// Name of the archive, or `archive/member` when only one member failed.
    pub name: String,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct Expansion {
    pub files: Vec<FileHandle>,
    pub failures: Vec<ArchiveFailure>,
}

/// Expands every archive in `candidates`, returning images only.
///
/// A corrupt archive contributes nothing and is reported in
/// [`Expansion::failures`]; the rest of the set is still expanded.
pub fn expand(candidates: Vec<FileHandle>) -> Expansion {
    let mut roots: Vec<FileHandle> = candidates
        .into_iter()
        .filter(|f| !is_metadata(f.name()))
        .collect();
    roots.sort_by(|a, b| a.name().cmp(b.name()));

    // Reversed so that popping yields the sorted order.
    let mut pending: Vec<FileHandle> = roots.into_iter().rev().collect();
    let mut expansion = Expansion::default();

    while let Some(handle) = pending.pop() {
        match handle.kind() {
            MediaKind::Image => expansion.files.push(handle),
            MediaKind::Zip => match open_members(&handle, &mut expansion.failures) {
                Ok(members) => pending.extend(members.into_iter().rev()),
                Err(e) => {
                    warn!("Skipping archive {}: {}", handle.name(), e);
                    expansion.failures.push(ArchiveFailure {
                        name: handle.name().to_owned(),
                        reason: e.to_string(),
                    });
                }
            },
        }
    }

    expansion
}

/// Reads the recognised members of one archive, sorted by name.
///
/// Members that fail to decompress are recorded in `failures` and left out.
fn open_members(handle: &FileHandle, failures: &mut Vec<ArchiveFailure>) -> Result<Vec<FileHandle>> {
    let bytes = handle.bytes()?;
    let archive_len = bytes.len();
    let archive = ZipArchive::new(Cursor::new(bytes)).map_err(|source| Error::Archive {
        name: handle.name().to_owned(),
        source,
    })?;

    let picks: Vec<(usize, String, MediaKind)> = (0..archive.len())
        .filter_map(|index| {
            let name = archive.name_for_index(index)?;
            let kind = MediaKind::of_member(name)?;
            Some((index, name.to_owned(), kind))
        })
        .collect();

    debug!(
        "{}: {} of {} entries recognised",
        handle.name(),
        picks.len(),
        archive.len()
    );

    let mut members = Vec::with_capacity(picks.len());
    for result in materialize(&archive, handle.name(), archive_len, &picks) {
        match result {
            Ok(member) => members.push(member),
            Err(e) => {
                warn!("{}", e);
                if let Error::Member { archive, member, source } = &e {
                    failures.push(ArchiveFailure {
                        name: format!("{archive}/{member}"),
                        reason: source.to_string(),
                    });
                }
            }
        }
    }

    members.sort_by(|a, b| a.name().cmp(b.name()));
    Ok(members)
}

/// Decompresses `picks` on a few scoped threads, each with its own clone of
/// the parsed archive. Results come back in no particular order.
fn materialize(
    archive: &MemoryArchive,
    archive_name: &str,
    archive_len: usize,
    picks: &[(usize, String, MediaKind)],
) -> Vec<Result<FileHandle>> {
    if picks.is_empty() {
        return Vec::new();
    }

    let workers = thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
        .clamp(1, MAX_MEMBER_WORKERS)
        .min(picks.len());
    let chunk_len = picks.len().div_ceil(workers);

    thread::scope(|scope| {
        let handles: Vec<_> = picks
            .chunks(chunk_len)
            .map(|chunk| {
                let mut archive = archive.clone();
                scope.spawn(move || {
                    chunk
                        .iter()
                        .map(|(index, name, kind)| read_member(&mut archive, archive_name, archive_len, *index, name, *kind))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        handles
            .into_iter()
            .flat_map(|h| match h.join() {
                Ok(results) => results,
                Err(_) => {
                    warn!("A worker reading {} panicked; its members are lost", archive_name);
                    Vec::new()
                }
            })
            .collect()
    })
}

fn read_member(
    archive: &mut MemoryArchive,
    archive_name: &str,
    archive_len: usize,
    index: usize,
    member: &str,
    kind: MediaKind,
) -> Result<FileHandle> {
    let to_error = |source: std::io::Error| Error::Member {
        archive: archive_name.to_owned(),
        member: member.to_owned(),
        source,
    };

    let mut file = archive
        .by_index(index)
        .map_err(|e| to_error(e.into()))?;
    let mut buffer = Vec::with_capacity(member_capacity(file.size(), archive_len));
    file.read_to_end(&mut buffer).map_err(to_error)?;

    Ok(FileHandle::from_bytes(
        format!("{archive_name}/{member}"),
        kind,
        buffer,
    ))
}

/// Initial buffer size for a member: the size the header declares, capped
/// at the length of the archive holding it.
fn member_capacity(declared: u64, archive_len: usize) -> usize {
    usize::try_from(declared).unwrap_or(usize::MAX).min(archive_len)
}
