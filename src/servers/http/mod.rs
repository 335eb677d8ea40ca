//! The HTTP tracker frontend.
//!
//! A thin transcoder: `GET /announce` and `GET /scrape` query strings are
//! parsed into the same announce/scrape structs the UDP frontend uses,
//! pushed through the same [`Logic`](crate::core::Logic), and the result
//! is rendered as a bencoded body. TLS termination and reverse-proxy
//! address resolution are out of scope; deploy behind a proxy if you need
//! them.
//!
//! Unlike UDP, HTTP can carry a 32-byte v2 infohash in the `info_hash`
//! parameter, so hybrid torrents enter the tracker through this frontend.
use std::sync::Arc;

use swarm_tracker_configuration::Core;
use tokio::sync::mpsc::error::SendError;

use crate::core::statistics::{Event, EventSender};
use crate::core::Logic;

pub mod requests;
pub mod responses;
pub mod server;

pub const HTTP_TRACKER_LOG_TARGET: &str = "HTTP TRACKER";

/// Shared state of the HTTP tracker routes.
pub struct HttpTracker {
    pub logic: Arc<Logic>,
    pub config: Core,
    stats_event_sender: Option<Box<dyn EventSender>>,
}

impl HttpTracker {
    #[must_use]
    pub fn new(logic: Arc<Logic>, config: Core, stats_event_sender: Option<Box<dyn EventSender>>) -> Self {
        Self {
            logic,
            config,
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
