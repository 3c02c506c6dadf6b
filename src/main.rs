use std::io::{self, Write};
use std::process::ExitCode;

use anyhow::Context;
use fs_connector::FsConnector;
use fs_connector::cli::{self, Action};
use fs_connector::pusher::JsonLinesPusher;

fn main() -> anyhow::Result<ExitCode> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = cli::parse_args()?;
    if let Some(path) = &config.config_file {
        log::debug!("Using configuration file {}", path.display());
    }
    let connector = FsConnector::from_config(&config.root_source, &config.doc_id_base)
        .context("failed to initialize the connector")?;

    let mut stdout = io::stdout().lock();
    match config.action {
        Action::Ids => {
            let mut pusher = JsonLinesPusher::new(&mut stdout);
            connector.get_doc_ids(&mut pusher)?;
        }
        Action::Get { doc_id, head } => {
            let resp = fs_connector::fetch(&connector, doc_id.clone())
                .with_context(|| format!("failed to serve {doc_id}"))?;
            if head {
                serde_json::to_writer_pretty(&mut stdout, &resp.summary())?;
                writeln!(stdout)?;
            } else {
                stdout.write_all(resp.body())?;
            }
            stdout.flush()?;
            if resp.is_not_found() {
                log::warn!("{doc_id} not found");
                return Ok(ExitCode::from(2));
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}
