use std::net::SocketAddr;
use std::sync::Arc;

use log::info;
use warp::Filter;

use super::routes;
use super::ws;
use crate::ingest::ingest_service::IngestService;
use crate::realtime::registry::ChannelRegistry;

/// Web server exposing the ingestion/query API and the dashboard WebSocket.
pub struct WebServer {
    ingest: Arc<IngestService>,
    registry: Arc<ChannelRegistry>,
}

impl WebServer {
    pub fn new(ingest: Arc<IngestService>, registry: Arc<ChannelRegistry>) -> Self {
        Self { ingest, registry }
    }

    /// Serve until the process is stopped.
    pub async fn start(&self, addr: SocketAddr) {
        let ingest = &self.ingest;
        let routes = routes::root_route()
            .or(routes::telemetry_route(ingest.clone()))
            .or(routes::alert_route(ingest.clone()))
            .or(routes::sessions_route(ingest.clone()))
            .or(routes::session_route(ingest.clone()))
            .or(routes::alerts_route(ingest.clone()))
            .or(routes::handle_alert_route(ingest.clone()))
            .or(routes::stats_route(ingest.clone()))
            .or(routes::request_screenshot_route(ingest.clone()))
            .or(routes::kill_process_route(ingest.clone()))
            .or(ws::ws_route(self.registry.clone()));

        info!("listening on {}", addr);
        warp::serve(routes).run(addr).await;
    }
}
