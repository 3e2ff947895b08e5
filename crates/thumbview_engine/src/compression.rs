use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};

use bzip2::read::BzDecoder;
use flate2::read::MultiGzDecoder;
use xz2::read::XzDecoder;

const GZIP_MAGIC: &[u8] = &[0x1f, 0x8b];
const BZIP2_MAGIC: &[u8] = b"BZh";
const XZ_MAGIC: &[u8] = &[0xfd, b'7', b'z', b'X', b'Z', 0x00];

/// Outer compression of a tarball, recognized by its magic bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Plain,
    Gzip,
    Bzip2,
    Xz,
}

impl Compression {
    pub fn from_magic(head: &[u8]) -> Self {
        if head.starts_with(GZIP_MAGIC) {
            Compression::Gzip
        } else if head.starts_with(BZIP2_MAGIC) {
            Compression::Bzip2
        } else if head.starts_with(XZ_MAGIC) {
            Compression::Xz
        } else {
            Compression::Plain
        }
    }

    /// Reads the first bytes of `reader` and rewinds it.
    pub fn sniff<R: Read + Seek>(reader: &mut R) -> io::Result<Self> {
        reader.seek(SeekFrom::Start(0))?;
        let mut head = Vec::with_capacity(XZ_MAGIC.len());
        reader
            .by_ref()
            .take(XZ_MAGIC.len() as u64)
            .read_to_end(&mut head)?;
        reader.seek(SeekFrom::Start(0))?;
        Ok(Self::from_magic(&head))
    }
}

/// Makes `file` readable as a plain tar with random access.
///
/// A compressed stream is decompressed once into an anonymous temp file, which
/// the archive then seeks in like any plain tar.
pub fn seekable_tar(mut file: File) -> io::Result<(File, Compression)> {
    let compression = Compression::sniff(&mut file)?;
    let mut decoder: Box<dyn Read> = match compression {
        Compression::Plain => return Ok((file, compression)),
        Compression::Gzip => Box::new(MultiGzDecoder::new(file)),
        Compression::Bzip2 => Box::new(BzDecoder::new(file)),
        Compression::Xz => Box::new(XzDecoder::new(file)),
    };
    let mut spool = tempfile::tempfile()?;
    io::copy(&mut decoder, &mut spool)?;
    spool.seek(SeekFrom::Start(0))?;
    Ok((spool, compression))
}
