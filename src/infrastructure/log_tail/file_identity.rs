//! Physical identity of a tailed file.
//!
//! An identity is the inode plus a SHA-256 fingerprint of the first
//! [`FINGERPRINT_BYTES`] bytes. Files shorter than that are not identified
//! yet; the watcher waits for them to grow.

use sha2::{Digest, Sha256};
use std::fs::Metadata;
use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

pub const FINGERPRINT_BYTES: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileIdentity(String);

impl FileIdentity {
    pub fn new(inode: u64, head: &[u8]) -> Self {
        let digest = hex::encode(Sha256::digest(head));
        Self(format!("{inode}-{}", &digest[..16]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A freshly opened file positioned at its start.
pub struct OpenedFile {
    pub file: File,
    pub identity: FileIdentity,
    pub len: u64,
}

/// Opens `path` and computes its identity from the open handle.
///
/// Returns `Ok(None)` if the file does not exist or is still shorter than
/// [`FINGERPRINT_BYTES`].
pub async fn open_identified(path: &Path) -> io::Result<Option<OpenedFile>> {
    let mut file = match File::open(path).await {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };

    let metadata = file.metadata().await?;
    if metadata.len() < FINGERPRINT_BYTES as u64 {
        return Ok(None);
    }

    let mut head = [0u8; FINGERPRINT_BYTES];
    file.read_exact(&mut head).await?;
    file.seek(SeekFrom::Start(0)).await?;

    Ok(Some(OpenedFile {
        identity: FileIdentity::new(inode_of(&metadata), &head),
        len: metadata.len(),
        file,
    }))
}

/// Where a rotated file is expected: `<path>.1`.
pub fn rotated_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".1");
    PathBuf::from(name)
}

#[cfg(unix)]
fn inode_of(metadata: &Metadata) -> u64 {
    use std::os::unix::fs::MetadataExt;
    metadata.ino()
}

#[cfg(not(unix))]
fn inode_of(_metadata: &Metadata) -> u64 {
    0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_identity_depends_on_inode_and_head() {
        let head = [b'a'; FINGERPRINT_BYTES];
        let other = [b'b'; FINGERPRINT_BYTES];

        assert_eq!(FileIdentity::new(1, &head), FileIdentity::new(1, &head));
        assert_ne!(FileIdentity::new(1, &head), FileIdentity::new(2, &head));
        assert_ne!(FileIdentity::new(1, &head), FileIdentity::new(1, &other));
        assert!(FileIdentity::new(7, &head).as_str().starts_with("7-"));
    }

    #[test]
    fn test_rotated_path() {
        assert_eq!(
            rotated_path(Path::new("/var/log/edge/access.log")),
            PathBuf::from("/var/log/edge/access.log.1")
        );
    }

    #[tokio::test]
    async fn test_short_and_missing_files_are_not_identified() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("access.log");

        assert!(open_identified(&path).await.unwrap().is_none());

        std::fs::write(&path, b"short").unwrap();
        assert!(open_identified(&path).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_identity_stable_while_appending() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("access.log");
        std::fs::write(&path, [b'x'; 100]).unwrap();

        let first = open_identified(&path).await.unwrap().unwrap();
        assert_eq!(first.len, 100);

        let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(b"more data\n").unwrap();

        let second = open_identified(&path).await.unwrap().unwrap();
        assert_eq!(first.identity, second.identity);
        assert_eq!(second.len, 110);
    }
}
