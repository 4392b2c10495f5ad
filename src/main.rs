use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use log::{error, info};

use vigia::configuration::config::Config;
use vigia::ingest::ingest_service::IngestService;
use vigia::realtime::registry::ChannelRegistry;
use vigia::realtime::router::BroadcastRouter;
use vigia::storage::alert_store::DbAlertStore;
use vigia::storage::db;
use vigia::storage::session_store::DbSessionStore;
use vigia::web_interface::web_server::WebServer;

#[derive(Parser)]
#[command(name = "vigia")]
#[command(version = "0.1.0")]
#[command(about = "Anti-cheat telemetry and alert monitoring hub")]
struct Args {
    /// Optional TOML configuration file; defaults apply when omitted
    config_file: Option<PathBuf>,

    /// Override the configured listen port
    #[arg(long, env = "VIGIA_PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .format_target(false)
        .init();

    println!(
        "
██╗   ██╗██╗ ██████╗ ██╗ █████╗
██║   ██║██║██╔════╝ ██║██╔══██╗
██║   ██║██║██║  ███╗██║███████║
╚██╗ ██╔╝██║██║   ██║██║██╔══██║
 ╚████╔╝ ██║╚██████╔╝██║██║  ██║
  ╚═══╝  ╚═╝ ╚═════╝ ╚═╝╚═╝  ╚═╝
================================
 Telemetry & alert monitor hub
================================
"
    );

    let args = Args::parse();

    let mut config = match &args.config_file {
        Some(path) => match Config::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                error!("Unable to import configuration from file: {}", e);
                std::process::exit(1);
            }
        },
        None => Config::default(),
    };
    if let Some(port) = args.port {
        config.port = port;
    }
    let addr = match config.socket_addr() {
        Ok(addr) => addr,
        Err(e) => {
            error!("Invalid bind address: {}", e);
            std::process::exit(1);
        }
    };

    info!("opening database at {}", config.database_path.display());
    let conn = match db::connect(&config.database_path).await {
        Ok(conn) => conn,
        Err(e) => {
            error!("Unable to open the session/alert store: {}", e);
            std::process::exit(1);
        }
    };

    let registry = Arc::new(ChannelRegistry::new());
    let ingest = Arc::new(IngestService::new(
        Arc::new(DbSessionStore::new(conn.clone())),
        Arc::new(DbAlertStore::new(conn)),
        BroadcastRouter::new(registry.clone()),
    ));

    WebServer::new(ingest, registry).start(addr).await;
}
