use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};

use crate::file_id::FileId;

/// Read position within one file identity.
///
/// Besides `(identity, offset)` the cursor keeps a copy of the first bytes
/// of the file. A file truncated and rewritten past the old offset between
/// two polls keeps its identity and looks like growth; the head no longer
/// matching is what gives it away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor {
    id: FileId,
    offset: u64,
    head: Vec<u8>,
}

impl Cursor {
    pub fn new(id: FileId, offset: u64) -> Self {
        Self {
            id,
            offset,
            head: Vec::new(),
        }
    }

    pub fn id(&self) -> FileId {
        self.id
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    #[cfg(test)]
    pub(crate) fn head_len(&self) -> usize {
        self.head.len()
    }

    /// Moves the offset forward. Never moves it back.
    pub(crate) fn advance(&mut self, bytes: u64) {
        self.offset += bytes;
    }

    /// Tops up the stored head to `max` bytes from the file.
    pub(crate) fn extend_head(&mut self, file: &mut File, max: usize) -> io::Result<()> {
        if self.head.len() >= max {
            return Ok(());
        }
        let want = (max - self.head.len()) as u64;
        file.seek(SeekFrom::Start(self.head.len() as u64))?;
        file.take(want).read_to_end(&mut self.head)?;
        Ok(())
    }

    /// Returns whether the file still starts with the stored head.
    pub(crate) fn head_matches(&self, file: &mut File) -> io::Result<bool> {
        if self.head.is_empty() {
            return Ok(true);
        }
        let mut current = Vec::with_capacity(self.head.len());
        file.seek(SeekFrom::Start(0))?;
        file.take(self.head.len() as u64)
            .read_to_end(&mut current)?;
        Ok(current == self.head)
    }
}
