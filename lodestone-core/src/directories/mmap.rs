//! Memory-mapped index directory
//!
//! Index files are immutable once finalized, so readers map them read-only
//! and share the mapping across all concurrent queries. Writers stage their
//! output in a `.tmp` sibling and rename it into place on `finish`, so a
//! reader never observes a half-written generation.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use memmap2::Mmap;

use super::OwnedBytes;

/// Directory of memory-mapped index files
///
/// No application-level cache - the OS page cache handles this.
#[derive(Debug, Clone)]
pub struct MmapDirectory {
    root: PathBuf,
}

impl MmapDirectory {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn resolve(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    pub fn exists(&self, name: &str) -> bool {
        self.resolve(name).is_file()
    }

    pub fn file_size(&self, name: &str) -> io::Result<u64> {
        Ok(fs::metadata(self.resolve(name))?.len())
    }

    /// Map a file read-only
    pub fn open_read(&self, name: &str) -> io::Result<OwnedBytes> {
        map_file(&self.resolve(name))
    }

    /// Map a file, reporting `None` instead of an error when it does not exist
    pub fn open_optional(&self, name: &str) -> io::Result<Option<OwnedBytes>> {
        match self.open_read(name) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Regular files directly under the root, sorted by name
    pub fn list_files(&self) -> io::Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                files.push(entry.path());
            }
        }
        files.sort();
        Ok(files)
    }

    pub fn delete(&self, name: &str) -> io::Result<()> {
        match fs::remove_file(self.resolve(name)) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }

    /// Open a staged writer for `name`
    pub fn streaming_writer(&self, name: &str) -> io::Result<StreamingWriter> {
        fs::create_dir_all(&self.root)?;
        StreamingWriter::create(self.resolve(name))
    }

    /// fsync the directory itself so renames are durable
    pub fn sync(&self) -> io::Result<()> {
        File::open(&self.root)?.sync_all()
    }
}

/// Map a file read-only; empty files map to an empty heap buffer
pub fn map_file(path: &Path) -> io::Result<OwnedBytes> {
    let file = File::open(path)?;
    if file.metadata()?.len() == 0 {
        return Ok(OwnedBytes::empty());
    }
    // SAFETY: index files are never modified after finalize; new generations
    // are written to a temp path and renamed over the old one.
    let mmap = unsafe { Mmap::map(&file)? };
    Ok(OwnedBytes::from_mmap(Arc::new(mmap)))
}

/// Buffered writer that publishes its file atomically on `finish`
///
/// Dropping an unfinished writer removes the partial temp file.
pub struct StreamingWriter {
    inner: Option<BufWriter<File>>,
    tmp_path: PathBuf,
    final_path: PathBuf,
    bytes_written: u64,
}

impl StreamingWriter {
    pub fn create(final_path: PathBuf) -> io::Result<Self> {
        let mut tmp_name = final_path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);
        let file = File::create(&tmp_path)?;
        Ok(Self {
            inner: Some(BufWriter::with_capacity(1 << 20, file)),
            tmp_path,
            final_path,
            bytes_written: 0,
        })
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn path(&self) -> &Path {
        &self.final_path
    }

    /// Flush, fsync and rename the temp file over the destination
    pub fn finish(mut self) -> io::Result<u64> {
        if let Some(writer) = self.inner.take() {
            let file = writer.into_inner().map_err(|e| e.into_error())?;
            file.sync_all()?;
        }
        fs::rename(&self.tmp_path, &self.final_path)?;
        Ok(self.bytes_written)
    }

    fn writer(&mut self) -> io::Result<&mut BufWriter<File>> {
        self.inner
            .as_mut()
            .ok_or_else(|| io::Error::other("writer already finished"))
    }
}

impl Write for StreamingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.writer()?.write(buf)?;
        self.bytes_written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer()?.flush()
    }
}

impl Drop for StreamingWriter {
    fn drop(&mut self) {
        if self.inner.take().is_some() {
            let _ = fs::remove_file(&self.tmp_path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_mmap_directory_basic() {
        let temp_dir = TempDir::new().unwrap();
        let dir = MmapDirectory::new(temp_dir.path());

        let mut writer = dir.streaming_writer("test.dat").unwrap();
        writer.write_all(b"Hello, mmap world!").unwrap();
        assert!(!dir.exists("test.dat"));
        assert_eq!(writer.finish().unwrap(), 18);

        assert!(dir.exists("test.dat"));
        assert_eq!(dir.file_size("test.dat").unwrap(), 18);

        let bytes = dir.open_read("test.dat").unwrap();
        assert!(bytes.is_mapped());
        assert_eq!(bytes.slice(7..11).as_slice(), b"mmap");
    }

    #[test]
    fn test_missing_file_is_none() {
        let temp_dir = TempDir::new().unwrap();
        let dir = MmapDirectory::new(temp_dir.path());
        assert!(dir.open_optional("nope.dat").unwrap().is_none());
    }

    #[test]
    fn test_abandoned_writer_leaves_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let dir = MmapDirectory::new(temp_dir.path());
        {
            let mut writer = dir.streaming_writer("partial.dat").unwrap();
            writer.write_all(&[1, 2, 3]).unwrap();
        }
        assert!(dir.list_files().unwrap().is_empty());
    }

    #[test]
    fn test_empty_file_maps_to_empty_bytes() {
        let temp_dir = TempDir::new().unwrap();
        let dir = MmapDirectory::new(temp_dir.path());
        dir.streaming_writer("empty.dat").unwrap().finish().unwrap();
        assert!(dir.open_read("empty.dat").unwrap().is_empty());
    }
}
