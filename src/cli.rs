use clap::{Arg, ArgAction, ArgMatches, Command};
use std::ffi::OsString;
use std::path::PathBuf;

use crate::config::{ConnectorConfig, DEFAULT_DOC_ID_BASE};
use crate::doc_id::DocId;

#[derive(Debug)]
pub struct Config {
    pub config_file: Option<PathBuf>,
    pub root_source: String,
    pub doc_id_base: String,
    pub action: Action,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Print the seed identifiers
    Ids,
    /// Serve one document
    Get { doc_id: DocId, head: bool },
}

pub fn build_cli() -> Command {
    Command::new("fs-connector")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Expose a local filesystem tree to a document indexing pipeline")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .global(true)
                .help("YAML configuration file with filesystemadaptor.src and server.docIdBase"),
        )
        .arg(
            Arg::new("src")
                .short('s')
                .long("src")
                .value_name("PATH")
                .global(true)
                .help("Root directory to serve (overrides filesystemadaptor.src)"),
        )
        .arg(
            Arg::new("base-url")
                .short('b')
                .long("base-url")
                .value_name("URL")
                .global(true)
                .help("Base URL for links in directory listings (overrides server.docIdBase)"),
        )
        .subcommand(Command::new("ids").about("Print the seed document identifiers as JSON lines"))
        .subcommand(
            Command::new("get")
                .about("Write the content of one document to stdout")
                .arg(
                    Arg::new("doc_id")
                        .value_name("DOC_ID")
                        .help("Document identifier, an absolute path below the root")
                        .required(true),
                )
                .arg(
                    Arg::new("head")
                        .long("head")
                        .action(ArgAction::SetTrue)
                        .help("Print status and metadata as JSON instead of the body"),
                ),
        )
}

pub fn parse_args() -> crate::Result<Config> {
    config_from_matches(&build_cli().get_matches())
}

pub fn parse_args_from<I, T>(args: I) -> crate::Result<Config>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = build_cli()
        .try_get_matches_from(args)
        .map_err(|e| crate::Error::Parse(e.to_string()))?;
    config_from_matches(&matches)
}

fn config_from_matches(matches: &ArgMatches) -> crate::Result<Config> {
    let config_file = matches.get_one::<String>("config").map(PathBuf::from);
    let file_config = match &config_file {
        Some(path) => ConnectorConfig::load(path)?,
        None => ConnectorConfig::default(),
    };

    let root_source = matches
        .get_one::<String>("src")
        .cloned()
        .or(file_config.src)
        .unwrap_or_default();
    let doc_id_base = matches
        .get_one::<String>("base-url")
        .cloned()
        .or(file_config.doc_id_base)
        .unwrap_or_else(|| DEFAULT_DOC_ID_BASE.to_string());

    let action = match matches.subcommand() {
        Some(("ids", _)) => Action::Ids,
        Some(("get", sub)) => {
            let doc_id = sub
                .get_one::<String>("doc_id")
                .ok_or_else(|| crate::Error::Parse("Missing document identifier".to_string()))?;
            Action::Get {
                doc_id: DocId::new(doc_id.as_str()),
                head: sub.get_flag("head"),
            }
        }
        _ => return Err(crate::Error::Parse("Unknown command".to_string())),
    };

    Ok(Config {
        config_file,
        root_source,
        doc_id_base,
        action,
    })
}
