//! AnnoChat terminal client entry point.

use annochat_app::{Runtime, SessionConfig};
use annochat_client::{HttpTokenProvider, SystemEnv};
use annochat_tui::{Args, TerminalDriver, logging};
use clap::Parser;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    if let Some(path) = &args.log_file {
        logging::init(path, &args.log_level)?;
    }

    let config = args.client_config();
    tracing::info!(server = %config.server_url, token_url = %config.token_url, "starting");

    let tokens = HttpTokenProvider::new(config.token_url.clone(), config.connect_timeout)?;
    let driver = TerminalDriver::new(config)?;
    let mut runtime = Runtime::new(driver, SystemEnv::new(), tokens, SessionConfig::default());

    runtime.run().await?;
    Ok(())
}
