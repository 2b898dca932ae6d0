//! File identity independent of the path string.
//!
//! Replacing the log at the same path yields a different identity, which is
//! how the tailer tells rotation apart from growth.

use std::fs::Metadata;

/// Device + inode on Unix. Elsewhere, the creation time stands in for the
/// inode, which still changes when the file is deleted and recreated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileId {
    dev: u64,
    ino: u64,
}

impl FileId {
    #[cfg(test)]
    pub(crate) fn new(dev: u64, ino: u64) -> Self {
        Self { dev, ino }
    }

    #[cfg(unix)]
    pub fn from_metadata(metadata: &Metadata) -> Self {
        use std::os::unix::fs::MetadataExt;

        Self {
            dev: metadata.dev(),
            ino: metadata.ino(),
        }
    }

    #[cfg(not(unix))]
    pub fn from_metadata(metadata: &Metadata) -> Self {
        let created = metadata
            .created()
            .ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);
        Self {
            dev: 0,
            ino: created,
        }
    }

    #[cfg(test)]
    pub(crate) fn from_file(file: &std::fs::File) -> std::io::Result<Self> {
        Ok(Self::from_metadata(&file.metadata()?))
    }

    #[cfg(test)]
    pub(crate) fn from_path(path: impl AsRef<std::path::Path>) -> std::io::Result<Self> {
        Ok(Self::from_metadata(&std::fs::metadata(path)?))
    }
}

impl std::fmt::Display for FileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.dev, self.ino)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;

    #[test]
    fn same_file_same_id() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let a = FileId::from_path(file.path()).unwrap();
        let b = FileId::from_file(file.as_file()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn stable_across_append() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let before = FileId::from_path(file.path()).unwrap();
        writeln!(file, "more").unwrap();
        file.flush().unwrap();
        assert_eq!(FileId::from_path(file.path()).unwrap(), before);
    }

    #[cfg(unix)]
    #[test]
    fn recreated_file_differs() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("Client.txt");
        std::fs::write(&path, "a").unwrap();
        let first = FileId::from_path(&path).unwrap();
        // Keep the old inode alive so it cannot be reused.
        let _old = File::open(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        std::fs::write(&path, "b").unwrap();
        assert_ne!(FileId::from_path(&path).unwrap(), first);
    }

    #[test]
    fn display() {
        assert_eq!(FileId::new(8, 42).to_string(), "8:42");
    }
}
