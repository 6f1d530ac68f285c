//! Document reading and atomic output writes
//!
//! Markdown sources are read with BOM detection (UTF-8, UTF-16 LE/BE) and a
//! size limit. Rendered output is written through a temp file in the target
//! directory followed by a rename, so a preview or export file is never seen
//! half-written.

use crate::error::{FileError, FileResult};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Largest document accepted (10 MB)
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Detected encoding of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileEncoding {
    #[default]
    Utf8,
    Utf8Bom,
    Utf16Le,
    Utf16Be,
    /// Not valid UTF-8; decoded lossily
    Unknown,
}

/// A decoded markdown source
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub path: PathBuf,
    pub content: String,
    pub encoding: FileEncoding,
    pub size_bytes: u64,
    /// Whether replacement characters were substituted while decoding
    pub lossy: bool,
}

fn detect_encoding(bytes: &[u8]) -> FileEncoding {
    match bytes {
        [0xEF, 0xBB, 0xBF, ..] => FileEncoding::Utf8Bom,
        [0xFF, 0xFE, ..] => FileEncoding::Utf16Le,
        [0xFE, 0xFF, ..] => FileEncoding::Utf16Be,
        _ if std::str::from_utf8(bytes).is_ok() => FileEncoding::Utf8,
        _ => FileEncoding::Unknown,
    }
}

fn decode_utf16(bytes: &[u8], from_bytes: fn([u8; 2]) -> u16) -> (String, bool) {
    let mut lossy = bytes.len() % 2 != 0;
    let units = bytes.chunks_exact(2).map(|c| from_bytes([c[0], c[1]]));
    let text = char::decode_utf16(units)
        .map(|r| {
            r.unwrap_or_else(|_| {
                lossy = true;
                char::REPLACEMENT_CHARACTER
            })
        })
        .collect();
    (text, lossy)
}

fn decode_utf8(bytes: &[u8]) -> (String, bool) {
    match std::str::from_utf8(bytes) {
        Ok(s) => (s.to_string(), false),
        Err(_) => (String::from_utf8_lossy(bytes).into_owned(), true),
    }
}

fn decode(path: &Path, bytes: Vec<u8>) -> SourceDocument {
    let encoding = detect_encoding(&bytes);
    let (content, lossy) = match encoding {
        FileEncoding::Utf8 | FileEncoding::Unknown => decode_utf8(&bytes),
        FileEncoding::Utf8Bom => decode_utf8(&bytes[3..]),
        FileEncoding::Utf16Le => decode_utf16(&bytes[2..], u16::from_le_bytes),
        FileEncoding::Utf16Be => decode_utf16(&bytes[2..], u16::from_be_bytes),
    };
    if lossy {
        log::warn!("{} is not valid {:?}; decoded lossily", path.display(), encoding);
    }
    SourceDocument {
        path: path.to_path_buf(),
        size_bytes: bytes.len() as u64,
        content,
        encoding,
        lossy,
    }
}

fn check_size(path: &Path, size: u64) -> FileResult<()> {
    if size > MAX_FILE_SIZE {
        return Err(FileError::FileTooLarge {
            path: path.to_path_buf(),
            size,
            max_size: MAX_FILE_SIZE,
        });
    }
    Ok(())
}

fn read_error(path: &Path, source: std::io::Error) -> FileError {
    if source.kind() == std::io::ErrorKind::NotFound {
        FileError::NotFound(path.to_path_buf())
    } else {
        FileError::ReadError {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Read a markdown document with encoding detection
pub async fn read_file(path: impl AsRef<Path>) -> FileResult<SourceDocument> {
    let path = path.as_ref();
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|e| read_error(path, e))?;
    check_size(path, metadata.len())?;

    let bytes = tokio::fs::read(path).await.map_err(|e| read_error(path, e))?;
    Ok(decode(path, bytes))
}

/// Hidden sibling used as the staging file for an atomic write
fn temp_path_for(path: &Path) -> PathBuf {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let stamp = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    parent.join(format!(".{}.{}.tmp", filename, stamp))
}

/// Write `content` to `path` via temp file and rename
pub async fn write_file_atomic(path: impl AsRef<Path>, content: &str) -> FileResult<()> {
    let path = path.as_ref();
    ensure_parent_dir(path).await?;
    let temp_path = temp_path_for(path);

    let result = async {
        let mut file = tokio::fs::File::create(&temp_path).await?;
        tokio::io::AsyncWriteExt::write_all(&mut file, content.as_bytes()).await?;
        tokio::io::AsyncWriteExt::flush(&mut file).await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(&temp_path, path).await
    }
    .await;

    if let Err(source) = result {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(FileError::WriteError {
            path: path.to_path_buf(),
            source,
        });
    }
    log::debug!("wrote {} ({} bytes)", path.display(), content.len());
    Ok(())
}

/// Blocking variant of [`write_file_atomic`]
pub fn write_file_atomic_sync(path: impl AsRef<Path>, content: &str) -> FileResult<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| FileError::DirectoryError {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let temp_path = temp_path_for(path);

    let result = (|| {
        let mut file = std::fs::File::create(&temp_path)?;
        file.write_all(content.as_bytes())?;
        file.flush()?;
        file.sync_all()?;
        drop(file);
        std::fs::rename(&temp_path, path)
    })();

    if let Err(source) = result {
        let _ = std::fs::remove_file(&temp_path);
        return Err(FileError::WriteError {
            path: path.to_path_buf(),
            source,
        });
    }
    Ok(())
}

/// Create the parent directory of `path` if missing
pub async fn ensure_parent_dir(path: impl AsRef<Path>) -> FileResult<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| FileError::DirectoryError {
                path: parent.to_path_buf(),
                source,
            })?;
    }
    Ok(())
}
