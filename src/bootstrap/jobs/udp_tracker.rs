//! UDP tracker job starter.
use std::sync::Arc;

use swarm_tracker_configuration::{Core, UdpTracker as Config};

use crate::core::statistics::EventSender;
use crate::core::Logic;
use crate::servers::udp::server::{RunningUdpServer, Server};
use crate::servers::udp::UdpTracker;

/// It starts a UDP tracker server with the provided configuration.
///
/// # Errors
///
/// Will return an error if the server can't bind its sockets.
pub fn start_job(
    config: &Config,
    core_config: Core,
    logic: Arc<Logic>,
    stats_event_sender: Option<Box<dyn EventSender>>,
) -> Result<RunningUdpServer, std::io::Error> {
    let tracker = Arc::new(UdpTracker::new(logic, core_config, config, stats_event_sender));

    Server::new(config.bind_address, config.workers).start(tracker)
}
