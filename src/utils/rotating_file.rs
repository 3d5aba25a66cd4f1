use chrono::{DateTime, Local};
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::MakeWriter;

use crate::utils::error::{Result, UpgradeError};

/// Append-only log file that moves itself aside to `<path>.<stamp>.bak`
/// once it reaches `max_bytes`, then continues in a fresh file.
#[derive(Clone)]
pub struct RotatingFile {
    inner: Arc<Mutex<Inner>>,
}

struct Inner {
    path: PathBuf,
    max_bytes: u64,
    file: Option<File>,
    size: u64,
}

impl RotatingFile {
    pub fn open(path: impl Into<PathBuf>, max_bytes: u64) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| UpgradeError::LogSetupError {
                path: path.clone(),
                message: format!("cannot create directory {}: {}", parent.display(), e),
            })?;
        }

        let (file, size) = open_append(&path).map_err(|e| UpgradeError::LogSetupError {
            path: path.clone(),
            message: e.to_string(),
        })?;

        Ok(Self {
            inner: Arc::new(Mutex::new(Inner {
                path,
                max_bytes,
                file: Some(file),
                size,
            })),
        })
    }

    /// Appends without ever rotating, for writers that do not own the log.
    pub fn append_only(path: impl Into<PathBuf>) -> Result<Self> {
        Self::open(path, u64::MAX)
    }

    pub fn path(&self) -> PathBuf {
        match self.inner.lock() {
            Ok(inner) => inner.path.clone(),
            Err(poisoned) => poisoned.into_inner().path.clone(),
        }
    }

    fn with_inner<T>(&self, f: impl FnOnce(&mut Inner) -> io::Result<T>) -> io::Result<T> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| io::Error::other("log file lock poisoned"))?;
        f(&mut inner)
    }
}

impl Inner {
    fn rotate_if_needed(&mut self) -> io::Result<()> {
        if self.size < self.max_bytes {
            return Ok(());
        }

        // Close the handle before renaming so Windows lets the move through.
        if let Some(mut file) = self.file.take() {
            file.flush()?;
        }
        let backup = backup_path(&self.path, Local::now());
        let renamed = fs::rename(&self.path, &backup);

        let (file, size) = open_append(&self.path)?;
        self.file = Some(file);
        self.size = size;
        renamed
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        // A failed rotation must not lose the line; keep appending to the
        // current file instead.
        if let Err(e) = self.rotate_if_needed() {
            eprintln!("log rotation failed for {}: {}", self.path.display(), e);
        }

        if self.file.is_none() {
            let (file, size) = open_append(&self.path)?;
            self.file = Some(file);
            self.size = size;
        }
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| io::Error::other("log file unavailable"))?;
        let written = file.write(buf)?;
        self.size += written as u64;
        Ok(written)
    }
}

fn open_append(path: &Path) -> io::Result<(File, u64)> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let size = file.metadata()?.len();
    Ok((file, size))
}

pub fn backup_path(path: &Path, at: DateTime<Local>) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(format!(".{}.bak", at.format("%Y%m%d-%H%M%S-%3f")));
    PathBuf::from(name)
}

pub struct RotatingFileWriter {
    target: RotatingFile,
}

impl Write for RotatingFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.target.with_inner(|inner| inner.write(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        self.target.with_inner(|inner| match inner.file.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        })
    }
}

impl<'a> MakeWriter<'a> for RotatingFile {
    type Writer = RotatingFileWriter;

    fn make_writer(&'a self) -> Self::Writer {
        RotatingFileWriter {
            target: self.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    #[test]
    fn test_backup_path_appends_timestamp() {
        let at = Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).single().unwrap();
        let backup = backup_path(Path::new("/var/log/upgrade.log"), at);
        assert_eq!(
            backup,
            PathBuf::from("/var/log/upgrade.log.20240309-070501-000.bak")
        );
    }

    #[test]
    fn test_open_creates_parent_directories() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("dir").join("run.log");

        let log = RotatingFile::open(&path, 1024).unwrap();
        let mut writer = log.make_writer();
        writer.write_all(b"hello\n").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "hello\n");
        assert_eq!(log.path(), path);
    }

    #[test]
    fn test_appends_to_existing_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("run.log");
        fs::write(&path, "earlier\n").unwrap();

        let log = RotatingFile::open(&path, 1024).unwrap();
        log.make_writer().write_all(b"later\n").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "earlier\nlater\n");
    }
}
