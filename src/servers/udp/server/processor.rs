use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

use super::buffer_pool::BufferPool;
use super::bound_socket::BoundSocket;
use super::RawRequest;
use crate::core::statistics;
use crate::servers::udp::response::Response;
use crate::servers::udp::{handlers, UdpTracker, UDP_TRACKER_LOG_TARGET};

/// Handles one received datagram end to end: parse, dispatch, respond,
/// then kick off the deferred post-hook work and recycle the buffer.
pub struct Processor {
    socket: Arc<BoundSocket>,
    tracker: Arc<UdpTracker>,
    pool: Arc<BufferPool>,
}

impl Processor {
    #[must_use]
    pub fn new(socket: Arc<BoundSocket>, tracker: Arc<UdpTracker>, pool: Arc<BufferPool>) -> Self {
        Self { socket, tracker, pool }
    }

    pub async fn process_request(self, request: RawRequest) {
        let from = request.from;
        let start = self.tracker.enable_request_timing.then(Instant::now);

        let reply = handlers::handle_packet(request.payload(), from, &self.tracker).await;

        self.pool.release(request.buffer);

        if let Some(reply) = reply {
            self.send_response(from, reply.response).await;

            // The response is on the wire; swarm writes overlap with
            // whatever the client does next.
            if let Some(follow_up) = reply.follow_up {
                follow_up.spawn(&self.tracker);
            }
        }

        if let Some(start) = start {
            self.tracker
                .send_stats_event(statistics::Event::UdpRequestDuration(start.elapsed()))
                .await;
        }
    }

    async fn send_response(&self, target: SocketAddr, response: Response) {
        let mut payload = Vec::with_capacity(200);

        match response.write(&mut payload) {
            Ok(()) => {
                // A lost response does not matter; the client retransmits.
                match self.socket.send_to(&payload, target).await {
                    Ok(sent_bytes) => {
                        debug!(target: UDP_TRACKER_LOG_TARGET, %target, sent_bytes, "sent response");
                    }
                    Err(err) => {
                        tracing::warn!(target: UDP_TRACKER_LOG_TARGET, %target, %err, "failed to send response");
                    }
                }
            }
            Err(err) => {
                tracing::error!(target: UDP_TRACKER_LOG_TARGET, %err, "failed to serialize response");
            }
        }
    }
}
