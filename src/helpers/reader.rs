use crate::error::TableError;
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::io::Cursor;
use std::io::Read;
use std::io::Seek;
use std::io::SeekFrom;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

/// Signature of OLE compound files (encrypted OOXML packages and legacy `.xls`).
const COMPOUND_FILE_SIGNATURE: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

/// Where a spreadsheet package lives.
///
/// Cloning is cheap and every [`PackageSource::open`] yields an independent cursor,
/// which is how both streaming passes and the merge resolver read the same file.
#[derive(Clone)]
pub enum PackageSource {
    /// Package on the local filesystem
    Path(PathBuf),
    /// Package already held in memory
    Bytes(Arc<[u8]>),
}

impl PackageSource {
    /// Opens a fresh reader positioned at the start of the package.
    pub(crate) fn open(&self) -> Result<PackageReader, TableError> {
        match self {
            Self::Path(path) => Ok(PackageReader::Local(BufReader::new(File::open(path)?))),
            Self::Bytes(bytes) => Ok(PackageReader::Memory(Cursor::new(Arc::clone(bytes)))),
        }
    }

    /// Human readable name used in error and log messages.
    pub fn name(&self) -> String {
        match self {
            Self::Path(path) => path.to_string_lossy().to_string(),
            Self::Bytes(bytes) => format!("<memory: {} bytes>", bytes.len()),
        }
    }
}

impl fmt::Debug for PackageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PackageSource({})", self.name())
    }
}

impl From<&Path> for PackageSource {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

impl From<PathBuf> for PackageSource {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<&str> for PackageSource {
    fn from(path: &str) -> Self {
        Self::Path(PathBuf::from(path))
    }
}

impl From<Vec<u8>> for PackageSource {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes.into())
    }
}

/// A reader over either a local file or an in-memory package
pub(crate) enum PackageReader {
    /// Local file reader
    Local(BufReader<File>),
    /// Shared in-memory buffer
    Memory(Cursor<Arc<[u8]>>),
}

impl PackageReader {
    /// Checks whether the package is an OLE compound file rather than a ZIP container.
    /// The reader is rewound afterwards.
    pub(crate) fn is_compound_file(&mut self) -> Result<bool, TableError> {
        let mut signature = [0u8; 8];
        let mut filled = 0;
        while filled < signature.len() {
            match self.read(&mut signature[filled..])? {
                0 => break,
                count => filled += count,
            }
        }
        self.seek(SeekFrom::Start(0))?;
        Ok(filled == signature.len() && signature == COMPOUND_FILE_SIGNATURE)
    }
}

impl Read for PackageReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            PackageReader::Local(reader) => reader.read(buf),
            PackageReader::Memory(reader) => reader.read(buf),
        }
    }
}

impl Seek for PackageReader {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        match self {
            PackageReader::Local(reader) => reader.seek(pos),
            PackageReader::Memory(reader) => reader.seek(pos),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_sources_open_independent_cursors() {
        let source = PackageSource::from(b"PK\x03\x04rest".to_vec());
        let mut first = source.open().unwrap();
        let mut second = source.open().unwrap();

        let mut buffer = [0u8; 4];
        first.read_exact(&mut buffer).unwrap();
        assert_eq!(&buffer, b"PK\x03\x04");
        second.read_exact(&mut buffer).unwrap();
        assert_eq!(&buffer, b"PK\x03\x04");
    }

    #[test]
    fn detect_compound_file() {
        let mut bytes = COMPOUND_FILE_SIGNATURE.to_vec();
        bytes.extend_from_slice(&[0; 16]);
        let mut reader = PackageSource::from(bytes).open().unwrap();
        assert!(reader.is_compound_file().unwrap());
        assert_eq!(reader.stream_position().unwrap(), 0);

        let mut reader = PackageSource::from(b"PK".to_vec()).open().unwrap();
        assert!(!reader.is_compound_file().unwrap());
    }

    #[test]
    fn open_missing_local_file() {
        let source = PackageSource::from("non_existent_file.xlsx");
        assert!(source.open().is_err(), "Should fail to open non-existent file");
        assert_eq!(source.name(), "non_existent_file.xlsx");
    }
}
