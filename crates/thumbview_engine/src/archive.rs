use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Component, Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use thiserror::Error;
use thumbview_core::ItemId;
use thumbview_logging::{thumb_debug, thumb_info, thumb_warn};

use crate::compression::seekable_tar;
use crate::decode::{decode_entry_name, NameEncoding};
use crate::persist::{AtomicFileWriter, PersistError};

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("no entry named {0:?} in archive")]
    NotFound(String),
    #[error("entry {name:?} is corrupted: {message}")]
    Corrupted { name: String, message: String },
    #[error("archive is closed")]
    Closed,
    #[error("entry name {0:?} escapes the destination directory")]
    UnsafePath(String),
    #[error("failed to open archive: {0}")]
    Open(#[source] io::Error),
    #[error(transparent)]
    Persist(#[from] PersistError),
}

/// Thread-safe access to the source bytes of a collection's items.
pub trait ExtractionService: Send + Sync {
    /// Decoded entry names in archive order.
    fn list(&self) -> Vec<ItemId>;

    fn extract(&self, name: &str) -> Result<Vec<u8>, ExtractError>;

    /// Releases the underlying handle; later extractions fail with `Closed`.
    fn close(&self);
}

#[derive(Debug, Clone)]
struct EntryInfo {
    raw_name: Vec<u8>,
    offset: u64,
    size: u64,
}

/// Plain tar archive indexed once at open time.
///
/// The tar reader is not safe for concurrent reads, so every extraction seeks and
/// reads under one mutex. Lookups go through a name index built up front, which
/// keeps the critical section down to a seek and a bounded read.
#[derive(Debug)]
pub struct TarArchive<R> {
    handle: Mutex<Option<R>>,
    entries: Vec<(ItemId, EntryInfo)>,
    by_name: HashMap<ItemId, usize>,
    by_raw: HashMap<Vec<u8>, usize>,
}

impl TarArchive<File> {
    /// Opens a plain, gzip, bzip2 or xz compressed tarball.
    pub fn open(path: &Path, encoding: NameEncoding) -> Result<Self, ExtractError> {
        let file = File::open(path).map_err(ExtractError::Open)?;
        let (file, compression) = seekable_tar(file).map_err(ExtractError::Open)?;
        let archive = Self::from_reader(file, encoding)?;
        thumb_info!(
            "Opened {:?} archive {:?} with {} entries",
            compression,
            path,
            archive.entries.len()
        );
        Ok(archive)
    }
}

impl<R: Read + Seek> TarArchive<R> {
    /// Indexes every regular file entry, reading from the start of `reader`.
    pub fn from_reader(mut reader: R, encoding: NameEncoding) -> Result<Self, ExtractError> {
        reader.seek(SeekFrom::Start(0)).map_err(ExtractError::Open)?;

        let mut entries: Vec<(ItemId, EntryInfo)> = Vec::new();
        let mut by_name: HashMap<ItemId, usize> = HashMap::new();
        let mut by_raw: HashMap<Vec<u8>, usize> = HashMap::new();

        let mut archive = tar::Archive::new(reader);
        for entry in archive.entries().map_err(ExtractError::Open)? {
            let entry = entry.map_err(ExtractError::Open)?;
            if !entry.header().entry_type().is_file() {
                continue;
            }
            let raw_name = entry.path_bytes().into_owned();
            let info = EntryInfo {
                raw_name: raw_name.clone(),
                offset: entry.raw_file_position(),
                size: entry.size(),
            };

            let name = match decode_entry_name(&raw_name, encoding) {
                Ok(decoded) => decoded.name,
                Err(err) => {
                    thumb_warn!("{err}; keeping lossy name");
                    String::from_utf8_lossy(&raw_name).into_owned()
                }
            };

            // A repeated name keeps its first position but serves the later data.
            match by_name.get(&name) {
                Some(&idx) => {
                    thumb_debug!("duplicate entry {name:?}, later data wins");
                    entries[idx].1 = info;
                    by_raw.insert(raw_name, idx);
                }
                None => {
                    let idx = entries.len();
                    by_name.insert(name.clone(), idx);
                    by_raw.insert(raw_name, idx);
                    entries.push((name, info));
                }
            }
        }

        Ok(Self {
            handle: Mutex::new(Some(archive.into_inner())),
            entries,
            by_name,
            by_raw,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Raw, undecoded name bytes of a listed entry.
    pub fn raw_name(&self, name: &str) -> Option<&[u8]> {
        let idx = *self.by_name.get(name)?;
        Some(self.entries[idx].1.raw_name.as_slice())
    }

    /// Looks an entry up by its raw name bytes instead of the decoded name.
    pub fn extract_raw(&self, raw_name: &[u8]) -> Result<Vec<u8>, ExtractError> {
        let idx = *self
            .by_raw
            .get(raw_name)
            .ok_or_else(|| ExtractError::NotFound(String::from_utf8_lossy(raw_name).into_owned()))?;
        let (name, info) = &self.entries[idx];
        self.read_entry(name, info)
    }

    /// Extracts `name` into `destination_dir`, keeping the entry's sub-directories.
    pub fn extract_to(&self, name: &str, destination_dir: &Path) -> Result<PathBuf, ExtractError> {
        let relative = Path::new(name);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes || relative.as_os_str().is_empty() {
            return Err(ExtractError::UnsafePath(name.to_owned()));
        }

        let data = self.lookup(name)?;
        let writer = AtomicFileWriter::new(destination_dir.to_path_buf());
        Ok(writer.write(relative, &data)?)
    }

    fn lookup(&self, name: &str) -> Result<Vec<u8>, ExtractError> {
        let idx = *self
            .by_name
            .get(name)
            .ok_or_else(|| ExtractError::NotFound(name.to_owned()))?;
        self.read_entry(name, &self.entries[idx].1)
    }

    fn read_entry(&self, name: &str, info: &EntryInfo) -> Result<Vec<u8>, ExtractError> {
        let corrupted = |message: String| ExtractError::Corrupted {
            name: name.to_owned(),
            message,
        };

        let mut guard = self.handle.lock().unwrap_or_else(PoisonError::into_inner);
        let reader = guard.as_mut().ok_or(ExtractError::Closed)?;

        reader
            .seek(SeekFrom::Start(info.offset))
            .map_err(|e| corrupted(e.to_string()))?;
        // Cap the up-front allocation; a damaged header can claim any size.
        let mut data = Vec::with_capacity(info.size.min(1 << 20) as usize);
        Read::take(&mut *reader, info.size)
            .read_to_end(&mut data)
            .map_err(|e| corrupted(e.to_string()))?;
        drop(guard);

        if data.len() as u64 != info.size {
            return Err(corrupted(format!(
                "short read: {} of {} bytes",
                data.len(),
                info.size
            )));
        }
        Ok(data)
    }
}

impl<R: Read + Seek + Send> ExtractionService for TarArchive<R> {
    fn list(&self) -> Vec<ItemId> {
        self.entries.iter().map(|(name, _)| name.clone()).collect()
    }

    fn extract(&self, name: &str) -> Result<Vec<u8>, ExtractError> {
        self.lookup(name)
    }

    fn close(&self) {
        let mut guard = self.handle.lock().unwrap_or_else(PoisonError::into_inner);
        if guard.take().is_some() {
            thumb_debug!("archive closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn tar_of(files: &[(&str, &[u8])]) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        for (name, data) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, name, *data).unwrap();
        }
        builder.into_inner().unwrap()
    }

    #[test]
    fn unsafe_names_are_rejected_before_reading() {
        let archive =
            TarArchive::from_reader(Cursor::new(tar_of(&[("a.png", b"x")])), NameEncoding::Detect)
                .unwrap();
        let dir = tempfile::tempdir().unwrap();

        for name in ["../a.png", "/etc/a.png", ""] {
            let err = archive.extract_to(name, dir.path()).unwrap_err();
            assert!(matches!(err, ExtractError::UnsafePath(_)), "{name}: {err}");
        }
    }

    #[test]
    fn closed_archive_refuses_reads() {
        let archive =
            TarArchive::from_reader(Cursor::new(tar_of(&[("a.png", b"x")])), NameEncoding::Detect)
                .unwrap();
        archive.close();
        archive.close();
        assert!(matches!(archive.extract("a.png"), Err(ExtractError::Closed)));
        assert_eq!(archive.list(), vec!["a.png".to_string()]);
    }

    #[test]
    fn directories_are_not_listed() {
        let mut builder = tar::Builder::new(Vec::new());
        let mut dir = tar::Header::new_gnu();
        dir.set_entry_type(tar::EntryType::Directory);
        dir.set_size(0);
        dir.set_mode(0o755);
        dir.set_cksum();
        builder.append_data(&mut dir, "pages/", io::empty()).unwrap();
        let mut file = tar::Header::new_gnu();
        file.set_size(3);
        file.set_mode(0o644);
        file.set_cksum();
        builder.append_data(&mut file, "pages/1.png", &b"one"[..]).unwrap();
        let bytes = builder.into_inner().unwrap();

        let archive = TarArchive::from_reader(Cursor::new(bytes), NameEncoding::Detect).unwrap();
        assert_eq!(archive.list(), vec!["pages/1.png".to_string()]);
    }
}
