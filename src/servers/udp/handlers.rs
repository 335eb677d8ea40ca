//! Handlers for the UDP server.
//!
//! The per-datagram state machine: undersized packets are silently
//! dropped, every non-connect action must present a valid connection ID
//! for the observed source address, and the rest is dispatched to the
//! matching handler. Announce and scrape run the core pre-hook pipeline
//! here; the post-hook work is handed back to the caller as a follow-up
//! so it can run after the response has been written.
use std::net::SocketAddr;
use std::sync::Arc;

use swarm_tracker_clock::Time;
use tracing::debug;

use super::request::{AnnounceRequest, MIN_PACKET_LEN};
use super::response::{
    AnnounceResponse, ConnectResponse, ErrorResponse, Response, ResponsePeer, ScrapeResponse, TorrentScrapeStatistics,
};
use super::{request, UdpTracker, UDP_TRACKER_LOG_TARGET};
use crate::core::context::RequestContext;
use crate::core::error::{ClientError, Error};
use crate::core::{self, peer_builder, statistics};
use crate::CurrentClock;

/// A handled request: the frame to send back, plus the deferred post-hook
/// work to run once the frame is on the wire.
pub struct Reply {
    pub response: Response,
    pub follow_up: Option<FollowUp>,
}

impl Reply {
    fn of(response: impl Into<Response>) -> Self {
        Self {
            response: response.into(),
            follow_up: None,
        }
    }
}

/// Post-hook work deferred until after the response write.
pub enum FollowUp {
    Announce(RequestContext, core::AnnounceRequest, core::AnnounceResponse),
    Scrape(RequestContext, core::ScrapeRequest, core::ScrapeResponse),
}

impl FollowUp {
    /// Runs the post-hook chain on a detached task. Cancellation of the
    /// request must not cancel this work, so the task owns everything.
    pub fn spawn(self, tracker: &Arc<UdpTracker>) {
        let tracker = tracker.clone();
        tokio::spawn(async move {
            match self {
                FollowUp::Announce(ctx, req, resp) => tracker.logic.after_announce(ctx, req, resp).await,
                FollowUp::Scrape(ctx, req, resp) => tracker.logic.after_scrape(ctx, req, resp).await,
            }
        });
    }
}

/// It handles an incoming UDP packet and builds the reply.
///
/// `None` means silence: undersized packets (DoS mitigation) and requests
/// cancelled mid-flight get no response at all.
pub async fn handle_packet(payload: &[u8], from: SocketAddr, tracker: &Arc<UdpTracker>) -> Option<Reply> {
    debug!(target: UDP_TRACKER_LOG_TARGET, ?from, len = payload.len(), "handling packet");

    if payload.len() < MIN_PACKET_LEN {
        // Malformed, no client packet is shorter. Explicitly nothing is
        // returned in case this is a DoS attempt.
        return None;
    }

    let result = match request::Request::from_bytes(payload, tracker.config.max_scrape_infohashes) {
        Ok(request::Request::Connect(connect)) => Ok(handle_connect(from, connect.transaction_id, tracker).await),
        Ok(request::Request::Announce(announce)) => handle_announce(from, &announce, tracker)
            .await
            .map_err(|err| (err, announce.transaction_id)),
        Ok(request::Request::Scrape(scrape)) => handle_scrape(from, &scrape, tracker)
            .await
            .map_err(|err| (err, scrape.transaction_id)),
        Err(request::ParseError::Sendable { transaction_id, err }) => Err((err.into(), transaction_id)),
        Err(request::ParseError::Unsendable { message }) => {
            debug!(target: UDP_TRACKER_LOG_TARGET, %message, "dropping unparseable packet");
            return None;
        }
    };

    match result {
        Ok(reply) => Some(reply),
        Err((Error::Cancelled, _)) => None,
        Err((err, transaction_id)) => Some(Reply::of(ErrorResponse {
            transaction_id,
            message: err.to_string(),
        })),
    }
}

/// It handles a `Connect` request: a fresh connection ID bound to the
/// source address and the current time.
async fn handle_connect(from: SocketAddr, transaction_id: i32, tracker: &Arc<UdpTracker>) -> Reply {
    let connection_id = tracker.issuer.generate(from.ip(), CurrentClock::now());

    let event = if from.is_ipv4() {
        statistics::Event::Udp4Connect
    } else {
        statistics::Event::Udp6Connect
    };
    tracker.send_stats_event(event).await;

    Reply::of(ConnectResponse {
        transaction_id,
        connection_id,
    })
}

/// It handles an `Announce` request through the core pipeline.
async fn handle_announce(from: SocketAddr, announce: &AnnounceRequest, tracker: &Arc<UdpTracker>) -> Result<Reply, Error> {
    if !tracker.issuer.validate(&announce.connection_id, from.ip(), CurrentClock::now()) {
        return Err(ClientError::BadConnectionId.into());
    }

    let req = core::AnnounceRequest {
        info_hash: announce.info_hash,
        peers: peer_builder::from_request(announce.peer_id, announce.port, from.ip(), announce.ip_address, &tracker.config),
        source_ip: from.ip(),
        uploaded: announce.bytes_uploaded.max(0).unsigned_abs(),
        downloaded: announce.bytes_downloaded.max(0).unsigned_abs(),
        left: announce.bytes_left.max(0).unsigned_abs(),
        event: announce.event,
        numwant: clamp_numwant(announce.peers_wanted, tracker),
    };

    let (ctx, resp) = tracker.logic.handle_announce(RequestContext::default(), &req).await?;

    let event = if from.is_ipv4() {
        statistics::Event::Udp4Announce
    } else {
        statistics::Event::Udp6Announce
    };
    tracker.send_stats_event(event).await;

    #[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
    let response = if announce.v6_dialect || from.is_ipv6() {
        Response::from(AnnounceResponse {
            transaction_id: announce.transaction_id,
            interval: resp.interval as i32,
            leechers: resp.incomplete as i32,
            seeders: resp.complete as i32,
            peers: resp
                .ipv6_peers
                .iter()
                .filter_map(|peer| match peer.peer_addr.ip() {
                    std::net::IpAddr::V6(ip) => Some(ResponsePeer {
                        ip_address: ip,
                        port: peer.peer_addr.port(),
                    }),
                    std::net::IpAddr::V4(_) => None,
                })
                .collect(),
        })
    } else {
        Response::from(AnnounceResponse {
            transaction_id: announce.transaction_id,
            interval: resp.interval as i32,
            leechers: resp.incomplete as i32,
            seeders: resp.complete as i32,
            peers: resp
                .ipv4_peers
                .iter()
                .filter_map(|peer| match peer.peer_addr.ip() {
                    std::net::IpAddr::V4(ip) => Some(ResponsePeer {
                        ip_address: ip,
                        port: peer.peer_addr.port(),
                    }),
                    std::net::IpAddr::V6(_) => None,
                })
                .collect(),
        })
    };

    Ok(Reply {
        response,
        follow_up: Some(FollowUp::Announce(ctx, req, resp)),
    })
}

/// It handles a `Scrape` request through the core pipeline.
async fn handle_scrape(
    from: SocketAddr,
    scrape: &request::ScrapeRequest,
    tracker: &Arc<UdpTracker>,
) -> Result<Reply, Error> {
    if !tracker.issuer.validate(&scrape.connection_id, from.ip(), CurrentClock::now()) {
        return Err(ClientError::BadConnectionId.into());
    }

    let req = core::ScrapeRequest {
        info_hashes: scrape.info_hashes.clone(),
    };

    let (ctx, resp) = tracker.logic.handle_scrape(RequestContext::default(), &req).await?;

    let event = if from.is_ipv4() {
        statistics::Event::Udp4Scrape
    } else {
        statistics::Event::Udp6Scrape
    };
    tracker.send_stats_event(event).await;

    #[allow(clippy::cast_possible_wrap)]
    let torrent_stats = resp
        .files
        .iter()
        .map(|entry| TorrentScrapeStatistics {
            seeders: entry.metadata.complete as i32,
            completed: entry.metadata.downloaded as i32,
            leechers: entry.metadata.incomplete as i32,
        })
        .collect();

    Ok(Reply {
        response: Response::from(ScrapeResponse {
            transaction_id: scrape.transaction_id,
            torrent_stats,
        }),
        follow_up: Some(FollowUp::Scrape(ctx, req, resp)),
    })
}

fn clamp_numwant(peers_wanted: i32, tracker: &Arc<UdpTracker>) -> u32 {
    if peers_wanted < 0 {
        tracker.config.default_numwant
    } else {
        u32::try_from(peers_wanted)
            .unwrap_or(tracker.config.default_numwant)
            .min(tracker.config.max_numwant)
    }
}
