use std::fmt::Write;
use std::sync::Arc;

use sha2::{Digest, Sha256};
use thumbview_engine::{ExtractionService, GenerateError, ThumbnailGenerator};

/// Stand-in thumbnail: a fingerprint of the entry's bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preview {
    pub byte_len: usize,
    pub digest: String,
    pub head: Vec<u8>,
}

impl Preview {
    fn of(data: &[u8], head_bytes: usize) -> Self {
        Self {
            byte_len: data.len(),
            digest: short_hash(data),
            head: data[..data.len().min(head_bytes)].to_vec(),
        }
    }
}

/// Builds [`Preview`]s from whatever the extraction service returns.
pub struct PreviewGenerator<S> {
    source: Arc<S>,
    head_bytes: usize,
}

impl<S> PreviewGenerator<S> {
    pub fn new(source: Arc<S>, head_bytes: usize) -> Self {
        Self { source, head_bytes }
    }
}

impl<S: ExtractionService + 'static> ThumbnailGenerator for PreviewGenerator<S> {
    type Thumbnail = Preview;

    fn generate(&self, uid: &str) -> Result<Preview, GenerateError> {
        let data = self.source.extract(uid)?;
        Ok(Preview::of(&data, self.head_bytes))
    }
}

fn short_hash(data: &[u8]) -> String {
    let digest = Sha256::digest(data);
    let mut hex = String::with_capacity(16);
    for byte in digest.iter().take(8) {
        let _ = write!(&mut hex, "{byte:02x}");
    }
    hex
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use thumbview_core::FailureKind;
    use thumbview_engine::{NameEncoding, TarArchive};

    fn archive() -> Arc<TarArchive<Cursor<Vec<u8>>>> {
        let mut builder = tar::Builder::new(Vec::new());
        let mut header = tar::Header::new_gnu();
        header.set_size(5);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, "a.png", &b"hello"[..]).unwrap();
        let bytes = builder.into_inner().unwrap();
        Arc::new(TarArchive::from_reader(Cursor::new(bytes), NameEncoding::Detect).unwrap())
    }

    #[test]
    fn preview_fingerprints_entry_bytes() {
        let generator = PreviewGenerator::new(archive(), 3);
        let preview = generator.generate("a.png").unwrap();
        assert_eq!(preview.byte_len, 5);
        assert_eq!(preview.head, b"hel");
        // sha256("hello")
        assert_eq!(preview.digest, "2cf24dba5fb0a30e");
    }

    #[test]
    fn missing_entry_is_not_found() {
        let generator = PreviewGenerator::new(archive(), 3);
        let err = generator.generate("b.png").unwrap_err();
        assert_eq!(err.kind, FailureKind::NotFound);
    }
}
