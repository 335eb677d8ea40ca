//! HTTP tracker job starter.
use std::sync::Arc;

use swarm_tracker_configuration::{Core, HttpTracker as Config};

use crate::core::statistics::EventSender;
use crate::core::Logic;
use crate::servers::http::server::{HttpServer, RunningHttpServer};
use crate::servers::http::HttpTracker;

/// It starts a HTTP tracker server with the provided configuration.
///
/// # Errors
///
/// Will return an error if the server can't bind its listener.
pub async fn start_job(
    config: &Config,
    core_config: Core,
    logic: Arc<Logic>,
    stats_event_sender: Option<Box<dyn EventSender>>,
) -> Result<RunningHttpServer, std::io::Error> {
    let tracker = Arc::new(HttpTracker::new(logic, core_config, stats_event_sender));

    HttpServer::new(config.bind_address).start(tracker).await
}
