use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::ImageFormat;

/// Folder macOS adds to archives it creates; never holds real pages.
pub const METADATA_PREFIX: &str = "__MACOSX";

const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "gif", "webp"];

/// Content type carried by a [`FileHandle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Zip,
}

impl MediaKind {
    /// Classifies a file picked or dropped by the user.
    ///
    /// Any format the `image` crate knows counts as an image here, the same
    /// way a browser would hand over anything with an `image/*` type. Archive
    /// members go through the stricter [`MediaKind::of_member`].
    pub fn of_upload(name: &str) -> Option<Self> {
        if is_zip_name(name) {
            return Some(Self::Zip);
        }
        ImageFormat::from_path(name).ok().map(|_| Self::Image)
    }

    /// Classifies a member of a zip archive by extension allowlist.
    pub fn of_member(name: &str) -> Option<Self> {
        if is_metadata(name) {
            return None;
        }
        match extension(name)?.as_str() {
            "zip" => Some(Self::Zip),
            ext if IMAGE_EXTENSIONS.contains(&ext) => Some(Self::Image),
            _ => None,
        }
    }
}

pub fn is_metadata(name: &str) -> bool {
    name.starts_with(METADATA_PREFIX)
}

fn is_zip_name(name: &str) -> bool {
    extension(name).is_some_and(|ext| ext == "zip")
}

fn extension(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
}

#[derive(Clone)]
enum Content {
    Disk(PathBuf),
    Memory(Arc<[u8]>),
}

/// Immutable reference to one image or archive, on disk or unpacked in memory.
#[derive(Clone)]
pub struct FileHandle {
    name: String,
    size: u64,
    kind: MediaKind,
    content: Content,
}

impl FileHandle {
    /// Stats a file chosen by the user. Returns `Ok(None)` for unsupported files.
    pub fn open(path: &Path) -> io::Result<Option<Self>> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        let Some(kind) = MediaKind::of_upload(&name) else {
            return Ok(None);
        };
        let metadata = fs::metadata(path)?;
        Ok(Some(Self {
            name,
            size: metadata.len(),
            kind,
            content: Content::Disk(path.to_path_buf()),
        }))
    }

    pub fn from_bytes(name: impl Into<String>, kind: MediaKind, bytes: impl Into<Arc<[u8]>>) -> Self {
        let bytes = bytes.into();
        Self {
            name: name.into(),
            size: bytes.len() as u64,
            kind,
            content: Content::Memory(bytes),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn is_zip(&self) -> bool {
        self.kind == MediaKind::Zip
    }

    /// Returns the full content, reading it from disk if needed.
    pub fn bytes(&self) -> io::Result<Arc<[u8]>> {
        match &self.content {
            Content::Disk(path) => Ok(fs::read(path)?.into()),
            Content::Memory(bytes) => Ok(Arc::clone(bytes)),
        }
    }
}

impl fmt::Debug for FileHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("FileHandle");
        s.field("name", &self.name)
            .field("size", &self.size)
            .field("kind", &self.kind);
        if let Content::Disk(path) = &self.content {
            s.field("path", path);
        }
        s.finish()
    }
}
