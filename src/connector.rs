use std::io;
use std::path::{Component, Path};
use std::time::SystemTime;

use chrono::{DateTime, Local, TimeZone};

use crate::backend::native::NativeFileBackend;
use crate::backend::{FileBackend, FileKind};
use crate::config::RootPath;
use crate::doc_id::DocId;
use crate::listing::{DocIdEncoder, HtmlListingWriter, ListingRenderer};
use crate::pusher::DocIdPusher;
use crate::response::{Request, Response};
use crate::{Error, Result};

pub const METADATA_LAST_MODIFIED: &str = "Last Modified Time";
pub const METADATA_CREATION_TIME: &str = "Creation Time";
pub const METADATA_LAST_ACCESS: &str = "Last Access Time";
pub const METADATA_FILE_SIZE: &str = "File Size";

/// Serves the files and directories below a configured root.
///
/// The connector holds no mutable state: the root is fixed at construction and
/// each content request is resolved independently, so a shared reference can
/// serve any number of requests concurrently when the backend allows it.
#[derive(Debug, Clone)]
pub struct FsConnector<B: FileBackend = NativeFileBackend> {
    root: RootPath,
    backend: B,
    encoder: DocIdEncoder,
}

impl FsConnector<NativeFileBackend> {
    /// Validates `root_source` and builds a connector over the local filesystem.
    pub fn from_config(root_source: &str, doc_id_base: &str) -> Result<Self> {
        let root = RootPath::from_config(root_source)?;
        let encoder = DocIdEncoder::new(doc_id_base)?;
        Ok(Self::new(root, NativeFileBackend, encoder))
    }
}

impl<B: FileBackend> FsConnector<B> {
    pub fn new(root: RootPath, backend: B, encoder: DocIdEncoder) -> Self {
        Self {
            root,
            backend,
            encoder,
        }
    }

    pub fn root(&self) -> &RootPath {
        &self.root
    }

    /// Pushes the root as the only seed identifier. Everything below it is
    /// discovered through directory listings.
    pub fn get_doc_ids(&self, pusher: &mut dyn DocIdPusher) -> Result<()> {
        log::trace!("entering get_doc_ids for {}", self.root.as_path().display());
        pusher.push_doc_ids(&[DocId::from_path(self.root.as_path())])?;
        log::trace!("exiting get_doc_ids");
        Ok(())
    }

    pub fn get_doc_content(&self, req: &Request, resp: &mut dyn Response) -> Result<()> {
        log::trace!("entering get_doc_content for {}", req.doc_id);
        let doc = req.doc_id.to_path();

        if !self.is_descendant_of_root(&doc) {
            log::info!(
                "Skipping {} since it is not a descendant of {}",
                doc.display(),
                self.root.as_path().display()
            );
            return resp.respond_not_found();
        }

        if self.backend.kind(&doc) == FileKind::Other {
            log::debug!("Skipping {} since it is not a file or directory", doc.display());
            return resp.respond_not_found();
        }

        let attrs = self.backend.attributes(&doc)?;
        let kind = self.backend.kind(&doc);

        resp.set_last_modified(attrs.modified);
        resp.add_metadata(METADATA_LAST_MODIFIED, &format_date(attrs.modified));
        resp.add_metadata(METADATA_CREATION_TIME, &format_date(attrs.created));
        resp.add_metadata(METADATA_LAST_ACCESS, &format_date(attrs.accessed));
        if kind == FileKind::File {
            if let Some(content_type) = self.backend.probe_content_type(&doc) {
                resp.set_content_type(&content_type);
            }
            resp.add_metadata(METADATA_FILE_SIZE, &attrs.size.to_string());
        }

        match kind {
            FileKind::File => self.write_file(&doc, attrs.accessed, resp)?,
            FileKind::Directory => self.write_listing(&req.doc_id, &doc, resp)?,
            FileKind::Other => {
                log::debug!("{} changed kind while being served", doc.display());
            }
        }
        log::trace!("exiting get_doc_content");
        Ok(())
    }

    /// True when the root is `path` itself or one of its ancestors.
    /// Comparison is by path component, so `/a/bb` is not below `/a/b`.
    pub fn is_descendant_of_root(&self, path: &Path) -> bool {
        path.ancestors().any(|ancestor| ancestor == self.root.as_path())
    }

    /// Copies the file into the response, then puts back the access time the
    /// read disturbed. The reader is closed before the restore runs; a copy
    /// error is returned only after the restore was attempted.
    fn write_file(
        &self,
        doc: &Path,
        last_access: SystemTime,
        resp: &mut dyn Response,
    ) -> Result<()> {
        let mut input = self.backend.open(doc)?;
        let copied = resp
            .output_stream()
            .and_then(|out| io::copy(&mut input, out).map_err(Error::from));
        drop(input);

        if let Err(err) = self.backend.set_last_access_time(doc, last_access) {
            // Read access does not imply write access.
            log::info!(
                "Unable to update last access time for {}: {}",
                doc.display(),
                err
            );
        }

        let bytes = copied?;
        log::debug!("Served {} bytes from {}", bytes, doc.display());
        Ok(())
    }

    fn write_listing(&self, doc_id: &DocId, doc: &Path, resp: &mut dyn Response) -> Result<()> {
        let mut writer = HtmlListingWriter::new(resp.output_stream()?, self.encoder.clone());
        writer.start(doc_id, &display_name(doc))?;
        for child in self.backend.list_dir(doc)? {
            match self.backend.kind(&child) {
                FileKind::File | FileKind::Directory => match DocId::try_from_path(&child) {
                    Some(child_id) => writer.add_link(&child_id, &display_name(&child))?,
                    None => log::warn!(
                        "Not listing {} since its path is not valid UTF-8",
                        child.display()
                    ),
                },
                FileKind::Other => log::trace!("Not listing {}", child.display()),
            }
        }
        writer.finish()
    }
}

/// Final path segment, `..` included. The whole path when there is none (e.g. `/`).
pub fn display_name(path: &Path) -> String {
    match path.components().next_back() {
        Some(Component::Normal(name)) => name.to_string_lossy().into_owned(),
        Some(Component::ParentDir) => "..".to_string(),
        _ => path.to_string_lossy().into_owned(),
    }
}

/// `yyyy-MM-dd` in the local time zone.
pub fn format_date(time: SystemTime) -> String {
    format_date_in(time, &Local)
}

fn format_date_in<Tz: TimeZone>(time: SystemTime, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    DateTime::<chrono::Utc>::from(time)
        .with_timezone(tz)
        .format("%Y-%m-%d")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DocAttributes;
    use crate::response::BufferedResponse;
    use std::cell::{Cell, RefCell};
    use std::io::Read;
    use std::path::PathBuf;
    use std::rc::Rc;
    use std::time::Duration;

    type Events = Rc<RefCell<Vec<&'static str>>>;

    struct FailingReader {
        events: Events,
        fail: bool,
        data: &'static [u8],
    }

    impl Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.fail {
                return Err(io::Error::other("disk gone"));
            }
            let n = self.data.len().min(buf.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    impl Drop for FailingReader {
        fn drop(&mut self) {
            self.events.borrow_mut().push("close");
        }
    }

    /// Backend with a fixed tree: `<root>/file.txt`, `<root>/sub/`, `<root>/sock`.
    struct MockBackend {
        root: PathBuf,
        events: Events,
        fail_copy: bool,
        fail_restore: bool,
        /// `file.txt` stops being a regular file after its first classification.
        file_vanishes: bool,
        file_kind_calls: Cell<usize>,
    }

    impl MockBackend {
        fn new(root: &Path) -> Self {
            Self {
                root: root.to_path_buf(),
                events: Rc::default(),
                fail_copy: false,
                fail_restore: false,
                file_vanishes: false,
                file_kind_calls: Cell::new(0),
            }
        }
    }

    impl FileBackend for MockBackend {
        fn kind(&self, path: &Path) -> FileKind {
            if path == self.root.join("file.txt") {
                self.file_kind_calls.set(self.file_kind_calls.get() + 1);
                if self.file_vanishes && self.file_kind_calls.get() > 1 {
                    return FileKind::Other;
                }
            }
            if path == self.root || path == self.root.join("sub") {
                FileKind::Directory
            } else if path == self.root.join("file.txt") {
                FileKind::File
            } else {
                FileKind::Other
            }
        }

        fn attributes(&self, _path: &Path) -> Result<DocAttributes> {
            let t = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
            Ok(DocAttributes {
                created: t,
                modified: t,
                accessed: t,
                size: 5,
            })
        }

        fn open(&self, _path: &Path) -> Result<Box<dyn Read>> {
            self.events.borrow_mut().push("open");
            Ok(Box::new(FailingReader {
                events: self.events.clone(),
                fail: self.fail_copy,
                data: b"hello",
            }))
        }

        fn list_dir(&self, _path: &Path) -> Result<Vec<PathBuf>> {
            Ok(vec![
                self.root.join("sock"),
                self.root.join("file.txt"),
                self.root.join("sub"),
            ])
        }

        fn set_last_access_time(&self, _path: &Path, _time: SystemTime) -> Result<()> {
            self.events.borrow_mut().push("restore");
            if self.fail_restore {
                return Err(Error::Io(io::Error::from(io::ErrorKind::PermissionDenied)));
            }
            Ok(())
        }

        fn probe_content_type(&self, _path: &Path) -> Option<String> {
            Some("text/plain".to_string())
        }
    }

    fn connector(backend: MockBackend, root: &Path) -> FsConnector<MockBackend> {
        FsConnector::new(
            RootPath::from_config(root.to_str().unwrap()).unwrap(),
            backend,
            DocIdEncoder::new("http://localhost:5678/doc/").unwrap(),
        )
    }

    fn request(path: &Path) -> Request {
        Request::new(DocId::from_path(path))
    }

    #[test]
    fn reader_is_closed_before_access_time_restore() {
        let dir = tempfile::tempdir().unwrap();
        let backend = MockBackend::new(dir.path());
        let events = backend.events.clone();
        let connector = connector(backend, dir.path());

        let mut resp = BufferedResponse::new();
        connector
            .get_doc_content(&request(&dir.path().join("file.txt")), &mut resp)
            .unwrap();

        assert_eq!(resp.body(), b"hello");
        assert_eq!(*events.borrow(), vec!["open", "close", "restore"]);
    }

    #[test]
    fn copy_failure_still_restores_then_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let mut backend = MockBackend::new(dir.path());
        backend.fail_copy = true;
        backend.fail_restore = true;
        let events = backend.events.clone();
        let connector = connector(backend, dir.path());

        let mut resp = BufferedResponse::new();
        let err = connector
            .get_doc_content(&request(&dir.path().join("file.txt")), &mut resp)
            .unwrap_err();

        assert!(err.to_string().contains("disk gone"));
        assert_eq!(*events.borrow(), vec!["open", "close", "restore"]);
    }

    #[test]
    fn restore_failure_is_swallowed() {
        let dir = tempfile::tempdir().unwrap();
        let mut backend = MockBackend::new(dir.path());
        backend.fail_restore = true;
        let connector = connector(backend, dir.path());

        let mut resp = BufferedResponse::new();
        connector
            .get_doc_content(&request(&dir.path().join("file.txt")), &mut resp)
            .unwrap();
        assert_eq!(resp.body(), b"hello");
        assert_eq!(resp.content_type(), Some("text/plain"));
        assert_eq!(resp.metadata_value(METADATA_FILE_SIZE), Some("5"));
    }

    #[test]
    fn listing_skips_entries_that_are_neither_file_nor_directory() {
        let dir = tempfile::tempdir().unwrap();
        let connector = connector(MockBackend::new(dir.path()), dir.path());

        let mut resp = BufferedResponse::new();
        connector
            .get_doc_content(&request(dir.path()), &mut resp)
            .unwrap();

        let html = String::from_utf8(resp.body().to_vec()).unwrap();
        assert_eq!(html.matches("<li>").count(), 2);
        assert!(html.contains(">file.txt</a>"));
        assert!(html.contains(">sub</a>"));
        assert!(!html.contains(">sock</a>"));
        assert_eq!(resp.content_type(), None);
        assert_eq!(resp.metadata_value(METADATA_FILE_SIZE), None);
    }

    #[test]
    fn entry_changing_kind_gets_metadata_only() {
        let dir = tempfile::tempdir().unwrap();
        let mut backend = MockBackend::new(dir.path());
        backend.file_vanishes = true;
        let events = backend.events.clone();
        let connector = connector(backend, dir.path());

        let mut resp = BufferedResponse::new();
        connector
            .get_doc_content(&request(&dir.path().join("file.txt")), &mut resp)
            .unwrap();

        assert!(!resp.is_not_found());
        assert!(resp.body().is_empty());
        assert_eq!(resp.content_type(), None);
        assert!(resp.last_modified().is_some());
        let keys: Vec<&str> = resp.metadata().iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(
            keys,
            vec![METADATA_LAST_MODIFIED, METADATA_CREATION_TIME, METADATA_LAST_ACCESS]
        );
        assert!(events.borrow().is_empty());
    }

    #[test]
    fn unsupported_kind_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let backend = MockBackend::new(dir.path());
        let events = backend.events.clone();
        let connector = connector(backend, dir.path());

        let mut resp = BufferedResponse::new();
        connector
            .get_doc_content(&request(&dir.path().join("sock")), &mut resp)
            .unwrap();
        assert!(resp.is_not_found());
        assert!(resp.metadata().is_empty());
        assert!(events.borrow().is_empty());
    }

    #[test]
    fn containment_respects_segment_boundaries() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("b");
        std::fs::create_dir(&root).unwrap();
        let connector = connector(MockBackend::new(&root), &root);

        assert!(connector.is_descendant_of_root(&root));
        assert!(connector.is_descendant_of_root(&root.join("x/y.txt")));
        assert!(!connector.is_descendant_of_root(&dir.path().join("bb")));
        assert!(!connector.is_descendant_of_root(&dir.path().join("bb/x")));
        assert!(!connector.is_descendant_of_root(dir.path()));
        assert!(!connector.is_descendant_of_root(Path::new("relative/b")));
    }

    #[test]
    fn seed_is_the_root_only() {
        let dir = tempfile::tempdir().unwrap();
        let connector = connector(MockBackend::new(dir.path()), dir.path());

        let mut ids: Vec<DocId> = Vec::new();
        connector.get_doc_ids(&mut ids).unwrap();
        assert_eq!(ids, vec![DocId::from_path(dir.path())]);
    }

    #[test]
    fn display_name_is_last_segment() {
        assert_eq!(display_name(Path::new("/srv/docs/report.txt")), "report.txt");
        assert_eq!(display_name(Path::new("/srv/docs")), "docs");
        assert_eq!(display_name(Path::new("/srv/docs/..")), "..");
        assert_eq!(display_name(Path::new("/")), "/");
    }

    #[test]
    fn dates_are_formatted_as_days() {
        let t = SystemTime::UNIX_EPOCH + Duration::from_secs(784111777);
        assert_eq!(format_date_in(t, &chrono::Utc), "1994-11-06");
        assert_eq!(format_date(t).len(), 10);
    }
}
