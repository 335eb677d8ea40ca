//! Interval-variation pre-hook.
//!
//! Randomizes the announce interval per response so that a herd of clients
//! that all joined a swarm at the same moment spreads its re-announces out
//! instead of hammering the tracker in lockstep.
use async_trait::async_trait;
use rand::Rng;

use crate::core::context::RequestContext;
use crate::core::error::Error;
use crate::core::hooks::Hook;
use crate::core::{AnnounceRequest, AnnounceResponse, ScrapeRequest, ScrapeResponse};

pub struct IntervalVariationHook {
    /// Chance, in `[0, 1]`, that a given response gets its interval bumped.
    modify_probability: f64,
    /// Upper bound for the random bump, in seconds.
    max_increase_delta: u32,
    /// Also bump the minimum interval by the same delta.
    modify_min_interval: bool,
}

impl IntervalVariationHook {
    #[must_use]
    pub fn new(modify_probability: f64, max_increase_delta: u32, modify_min_interval: bool) -> Self {
        Self {
            modify_probability: modify_probability.clamp(0.0, 1.0),
            max_increase_delta: max_increase_delta.max(1),
            modify_min_interval,
        }
    }
}

#[async_trait]
impl Hook for IntervalVariationHook {
    async fn handle_announce(
        &self,
        ctx: RequestContext,
        _req: &AnnounceRequest,
        resp: &mut AnnounceResponse,
    ) -> Result<RequestContext, Error> {
        let mut rng = rand::thread_rng();

        if rng.gen_bool(self.modify_probability) {
            let delta = rng.gen_range(1..=self.max_increase_delta);
            resp.interval = resp.interval.saturating_add(delta);
            if self.modify_min_interval {
                resp.min_interval = resp.min_interval.saturating_add(delta);
            }
        }

        Ok(ctx)
    }

    async fn handle_scrape(
        &self,
        ctx: RequestContext,
        _req: &ScrapeRequest,
        _resp: &mut ScrapeResponse,
    ) -> Result<RequestContext, Error> {
        Ok(ctx)
    }
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};

    use swarm_tracker_primitives::announce_event::AnnounceEvent;
    use swarm_tracker_primitives::peer::{self, Peer};

    use super::IntervalVariationHook;
    use crate::core::context::RequestContext;
    use crate::core::fixtures::sample_info_hash;
    use crate::core::hooks::Hook;
    use crate::core::{AnnounceRequest, AnnounceResponse};

    fn sample_request() -> AnnounceRequest {
        let ip = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));
        AnnounceRequest {
            info_hash: sample_info_hash(),
            peers: vec![Peer {
                peer_id: peer::Id(*b"-qB00000000000000001"),
                peer_addr: SocketAddr::new(ip, 6881),
            }],
            source_ip: ip,
            uploaded: 0,
            downloaded: 0,
            left: 0,
            event: AnnounceEvent::None,
            numwant: 50,
        }
    }

    fn sample_response() -> AnnounceResponse {
        AnnounceResponse {
            interval: 1800,
            min_interval: 900,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn with_probability_one_the_interval_should_always_grow_within_the_delta() {
        let hook = IntervalVariationHook::new(1.0, 60, false);
        let mut resp = sample_response();

        hook.handle_announce(RequestContext::default(), &sample_request(), &mut resp)
            .await
            .unwrap();

        assert!(resp.interval > 1800);
        assert!(resp.interval <= 1860);
        assert_eq!(resp.min_interval, 900);
    }

    #[tokio::test]
    async fn with_probability_zero_the_intervals_should_be_untouched() {
        let hook = IntervalVariationHook::new(0.0, 60, true);
        let mut resp = sample_response();

        hook.handle_announce(RequestContext::default(), &sample_request(), &mut resp)
            .await
            .unwrap();

        assert_eq!(resp.interval, 1800);
        assert_eq!(resp.min_interval, 900);
    }

    #[tokio::test]
    async fn the_minimum_interval_should_follow_when_configured() {
        let hook = IntervalVariationHook::new(1.0, 60, true);
        let mut resp = sample_response();

        hook.handle_announce(RequestContext::default(), &sample_request(), &mut resp)
            .await
            .unwrap();

        assert_eq!(resp.interval - 1800, resp.min_interval - 900);
    }
}
