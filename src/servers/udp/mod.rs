//! The UDP tracker frontend, a `BitTorrent` tracker over UDP as described
//! in [BEP 15](https://www.bittorrent.org/beps/bep_0015.html).
//!
//! UDP is the cheap way to run a public tracker: no connection setup, no
//! TLS, one datagram in and one datagram out per request. The price is
//! that the source address of a datagram can be forged, which is why every
//! announce and scrape must present a [connection
//! ID](connection_cookie) previously obtained through a `connect`
//! round-trip from the same address.
//!
//! Request handling is split in three layers:
//!
//! - [`server`]: socket lifecycle, per-worker receive loops and the
//!   zero-on-put buffer pool.
//! - [`handlers`]: the per-datagram state machine (cookie validation,
//!   dispatch, error frames).
//! - [`request`]/[`response`]: the BEP 15 wire codec.
use std::sync::Arc;

use swarm_tracker_configuration::{Core, UdpTracker as Config};
use tokio::sync::mpsc::error::SendError;

use crate::core::statistics::{Event, EventSender};
use crate::core::Logic;
use crate::servers::udp::connection_cookie::ConnectionIdIssuer;

pub mod connection_cookie;
pub mod handlers;
pub mod request;
pub mod response;
pub mod server;

pub const UDP_TRACKER_LOG_TARGET: &str = "UDP TRACKER";

/// Everything a UDP worker needs to handle requests: the core pipeline,
/// the connection-ID issuer and the tracker policies.
pub struct UdpTracker {
    pub logic: Arc<Logic>,
    pub issuer: ConnectionIdIssuer,
    pub config: Core,
    pub enable_request_timing: bool,
    stats_event_sender: Option<Box<dyn EventSender>>,
}

impl UdpTracker {
    #[must_use]
    pub fn new(
        logic: Arc<Logic>,
        core_config: Core,
        udp_config: &Config,
        stats_event_sender: Option<Box<dyn EventSender>>,
    ) -> Self {
        let issuer = ConnectionIdIssuer::new(
            udp_config.private_key.as_deref(),
            std::time::Duration::from_secs(udp_config.max_clock_skew),
        );

        Self {
            logic,
            issuer,
            config: core_config,
            enable_request_timing: udp_config.enable_request_timing,
            stats_event_sender,
        }
    }

    pub async fn send_stats_event(&self, event: Event) -> Option<Result<(), SendError<Event>>> {
        match &self.stats_event_sender {
            None => None,
            Some(sender) => sender.send_event(event).await,
        }
    }
}
