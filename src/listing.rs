use std::io::Write;

use url::Url;

use crate::doc_id::DocId;
use crate::{Error, Result};

/// Renders a directory as a list of links to its children.
pub trait ListingRenderer {
    fn start(&mut self, doc_id: &DocId, title: &str) -> Result<()>;

    fn add_link(&mut self, doc_id: &DocId, label: &str) -> Result<()>;

    fn finish(&mut self) -> Result<()>;
}

/// Maps document identifiers to URLs under a base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocIdEncoder {
    base: Url,
}

impl DocIdEncoder {
    pub fn new(base: &str) -> Result<Self> {
        let base = Url::parse(base)?;
        if base.cannot_be_a_base() {
            return Err(Error::Config(format!("{} cannot be used as a base URL", base)));
        }
        Ok(Self { base })
    }

    /// Appends the whole identifier to the base path as one percent-encoded
    /// segment. Its `/` separators become `%2F`, so `.` and `..` parts are kept
    /// literally instead of being collapsed as URL dot segments.
    pub fn encode(&self, doc_id: &DocId) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(doc_id.unique_id());
        }
        url
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Initial,
    Started,
    Finished,
}

/// Writes an HTML page with one link per child.
pub struct HtmlListingWriter<W: Write> {
    writer: W,
    encoder: DocIdEncoder,
    state: State,
}

impl<W: Write> HtmlListingWriter<W> {
    pub fn new(writer: W, encoder: DocIdEncoder) -> Self {
        Self {
            writer,
            encoder,
            state: State::Initial,
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn expect_state(&self, expected: State, action: &str) -> Result<()> {
        if self.state != expected {
            return Err(Error::Listing(format!(
                "cannot {} in state {:?}",
                action, self.state
            )));
        }
        Ok(())
    }
}

impl<W: Write> ListingRenderer for HtmlListingWriter<W> {
    fn start(&mut self, doc_id: &DocId, title: &str) -> Result<()> {
        self.expect_state(State::Initial, "start")?;
        let title = escape_html(title);
        writeln!(self.writer, "<!DOCTYPE html>")?;
        writeln!(
            self.writer,
            "<html><head><meta charset=\"UTF-8\"><title>Folder {}</title></head>",
            title
        )?;
        writeln!(self.writer, "<body><h1>Folder {}</h1>", title)?;
        log::trace!("started listing for {}", doc_id);
        writeln!(self.writer, "<ul>")?;
        self.state = State::Started;
        Ok(())
    }

    fn add_link(&mut self, doc_id: &DocId, label: &str) -> Result<()> {
        self.expect_state(State::Started, "add a link")?;
        writeln!(
            self.writer,
            "<li><a href=\"{}\">{}</a></li>",
            escape_html(self.encoder.encode(doc_id).as_str()),
            escape_html(label)
        )?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.expect_state(State::Started, "finish")?;
        writeln!(self.writer, "</ul>")?;
        writeln!(self.writer, "</body></html>")?;
        self.writer.flush()?;
        self.state = State::Finished;
        Ok(())
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
