use std::io::Write;

use crate::Result;
use crate::doc_id::DocId;

/// Receives identifiers to register for indexing.
pub trait DocIdPusher {
    fn push_doc_ids(&mut self, doc_ids: &[DocId]) -> Result<()>;
}

impl DocIdPusher for Vec<DocId> {
    fn push_doc_ids(&mut self, doc_ids: &[DocId]) -> Result<()> {
        self.extend_from_slice(doc_ids);
        Ok(())
    }
}

/// Writes each identifier as a JSON string on its own line.
pub struct JsonLinesPusher<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesPusher<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> DocIdPusher for JsonLinesPusher<W> {
    fn push_doc_ids(&mut self, doc_ids: &[DocId]) -> Result<()> {
        for doc_id in doc_ids {
            serde_json::to_writer(&mut self.writer, doc_id)?;
            self.writer.write_all(b"\n")?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
