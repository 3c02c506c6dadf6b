use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use filetime::FileTime;

use crate::Result;
use crate::backend::{DocAttributes, FileBackend, FileKind};

/// Native filesystem backend using std::fs
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeFileBackend;

impl FileBackend for NativeFileBackend {
    fn kind(&self, path: &Path) -> FileKind {
        match fs::metadata(path) {
            Ok(meta) if meta.is_file() => FileKind::File,
            Ok(meta) if meta.is_dir() => FileKind::Directory,
            _ => FileKind::Other,
        }
    }

    fn attributes(&self, path: &Path) -> Result<DocAttributes> {
        let meta = fs::metadata(path)?;
        let modified = meta.modified()?;
        // Not every filesystem records a birth time; report the modification time instead.
        let created = meta.created().unwrap_or(modified);
        Ok(DocAttributes {
            created,
            modified,
            accessed: meta.accessed()?,
            size: meta.len(),
        })
    }

    fn open(&self, path: &Path) -> Result<Box<dyn Read>> {
        Ok(Box::new(fs::File::open(path)?))
    }

    fn list_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let entries = fs::read_dir(path)?
            .map(|res| res.map(|e| e.path()))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    fn set_last_access_time(&self, path: &Path, time: SystemTime) -> Result<()> {
        filetime::set_file_atime(path, FileTime::from_system_time(time))?;
        Ok(())
    }

    fn probe_content_type(&self, path: &Path) -> Option<String> {
        mime_guess::from_path(path).first().map(|mime| mime.to_string())
    }
}
