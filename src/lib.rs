pub mod backend;
pub mod cli;
pub mod config;
pub mod connector;
pub mod doc_id;
pub mod error;
pub mod listing;
pub mod pusher;
pub mod response;

pub use connector::FsConnector;
pub use doc_id::DocId;
pub use error::{Error, Result};
pub use response::{BufferedResponse, Request, Response};

/// Resolves one identifier against the local filesystem and buffers the answer.
pub fn fetch(connector: &FsConnector, doc_id: DocId) -> Result<BufferedResponse> {
    let mut resp = BufferedResponse::new();
    connector.get_doc_content(&Request::new(doc_id), &mut resp)?;
    Ok(resp)
}
