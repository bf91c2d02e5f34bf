#![cfg(not(tarpaulin_include))]

use clap::Parser;
use std::path::PathBuf;
use tsdash::app;
use tsdash::config::DashboardConfig;

#[derive(Parser, Debug)]
#[command(name = "website", about = "Serve the timeseries dashboard over HTTP")]
struct Args {
    /// JSON config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Spreadsheet to load, overrides the config file
    #[arg(long)]
    data: Option<PathBuf>,

    /// Address to listen on, overrides the config file
    #[arg(long)]
    bind: Option<String>,
}

/// Main entry point for the web application
///
/// Reads the config, applies command line overrides and runs the server
/// until it is stopped.
///
/// # Returns
/// * `Result<(), Box<dyn std::error::Error>>` - Success or error object
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut config = DashboardConfig::load(args.config.as_deref())?;
    if let Some(data) = args.data {
        config.data_path = data;
    }
    if let Some(bind) = args.bind {
        config.bind_address = bind;
    }

    app::run(config).await
}
