use std::env;
use std::error::Error;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use informer::modules::api::router;
use informer::modules::logging::{init_panel_logger, level_filter};
use informer::modules::service::UpdateService;
use informer::modules::store::ConfigStore;
use log::info;

#[derive(Parser)]
#[command(
    name = "informer_panel",
    version,
    about = "Control panel backend for the informer notification robots",
    long_about = None
)]
struct Cli {
    #[arg(short = 'c', long = "config", default_value = "./data/config.toml")]
    config: String,

    #[arg(
        short = 'l',
        long = "log-file",
        help = "Log file of the panel; defaults to the file named in the stored log settings"
    )]
    log_file: Option<String>,

    #[arg(
        long = "log-level",
        help = "trace, debug, info, warning or error; defaults to the stored log level"
    )]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let store = ConfigStore::open(&cli.config).await?;
    let settings = store.get_settings();

    let level_name = cli.log_level.unwrap_or(settings.log.level);
    let level =
        level_filter(&level_name).ok_or_else(|| format!("unknown log level {level_name:?}"))?;
    let log_file = PathBuf::from(cli.log_file.unwrap_or(settings.log.file));
    init_panel_logger(&log_file, level)?;

    // The store was opened before the logger existed.
    if store.created() {
        info!("Created default configuration at {}", store.path().display());
    } else {
        info!(
            "Loaded configuration from {} ({} robots)",
            store.path().display(),
            store.get_robots().len()
        );
    }

    let app = router(UpdateService::new(Arc::new(store)));

    let port = env::var("INFORMER_PANEL_PORT")
        .ok()
        .and_then(|val| val.parse::<u16>().ok())
        .unwrap_or(7878);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    info!("Control panel listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
