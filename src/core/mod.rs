//! The core tracker logic, independent of the delivery layer.
//!
//! Announce and scrape requests from any frontend (UDP or HTTP) are
//! transcoded into the structs in this module and pushed through the same
//! middleware pipeline:
//!
//! ```text
//! Delivery layer     Domain layer
//!
//!      UDP tracker |
//!     HTTP tracker |> Logic -> pre-hooks -> response
//!                  |          post-hooks -> peer store
//! ```
//!
//! [`Logic`] composes the registered [`hooks`](crate::core::hooks) around
//! a shared request/response pair. The pre-hook chain (caller-supplied
//! hooks, then the built-in response hook) assembles the response; the
//! post-hook chain (caller-supplied hooks, then the built-in
//! swarm-interaction hook) mutates the peer store and runs detached,
//! after the response has been written to the client.
use std::net::IpAddr;
use std::sync::Arc;

use swarm_tracker_configuration::AnnouncePolicy;
use swarm_tracker_peer_store::Storage;
use swarm_tracker_primitives::announce_event::AnnounceEvent;
use swarm_tracker_primitives::info_hash::InfoHash;
use swarm_tracker_primitives::peer::Peer;
use swarm_tracker_primitives::swarm_metadata::SwarmMetadata;
use tracing::debug;

use self::context::RequestContext;
use self::error::Error;
use self::hooks::response::ResponseHook;
use self::hooks::swarm::SwarmInteractionHook;
use self::hooks::Hook;

pub mod context;
pub mod error;
pub mod hooks;
pub mod peer_builder;
pub mod statistics;

const CORE_LOG_TARGET: &str = "CORE";

/// An announce request, as the domain layer sees it: the frontend has
/// already parsed the wire format and resolved the announcer's peer
/// representations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnounceRequest {
    pub info_hash: InfoHash,
    /// The peer entries this announce stands for, built by
    /// [`peer_builder::from_request`]. The first entry is the
    /// source-address peer.
    pub peers: Vec<Peer>,
    /// The packet source address, which decides the primary address
    /// family of the response.
    pub source_ip: IpAddr,
    pub uploaded: u64,
    pub downloaded: u64,
    pub left: u64,
    pub event: AnnounceEvent,
    /// Number of peers the client wants, already clamped by the frontend.
    pub numwant: u32,
}

impl AnnounceRequest {
    /// A peer with `left == 0` has the whole content.
    #[must_use]
    pub fn is_seeding(&self) -> bool {
        self.left == 0
    }
}

/// An announce response before serialization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnounceResponse {
    pub interval: u32,
    pub min_interval: u32,
    /// Number of seeders in the swarm.
    pub complete: u32,
    /// Number of leechers in the swarm.
    pub incomplete: u32,
    pub ipv4_peers: Vec<Peer>,
    pub ipv6_peers: Vec<Peer>,
}

/// A scrape request over one or more infohashes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeRequest {
    pub info_hashes: Vec<InfoHash>,
}

/// One scraped swarm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrapeEntry {
    pub info_hash: InfoHash,
    pub metadata: SwarmMetadata,
}

/// A scrape response: one entry per requested infohash, in request order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScrapeResponse {
    pub files: Vec<ScrapeEntry>,
}

/// The middleware pipeline: ordered pre- and post-hook execution around
/// announce and scrape requests.
pub struct Logic {
    announce_policy: AnnouncePolicy,
    pre_hooks: Vec<Box<dyn Hook>>,
    post_hooks: Vec<Box<dyn Hook>>,
}

impl Logic {
    /// Builds the pipeline. The built-in response hook is appended to the
    /// pre-hooks and the built-in swarm-interaction hook to the
    /// post-hooks, so caller-supplied hooks always run before them.
    #[must_use]
    pub fn new(
        announce_policy: AnnouncePolicy,
        store: Arc<dyn Storage>,
        mut pre_hooks: Vec<Box<dyn Hook>>,
        mut post_hooks: Vec<Box<dyn Hook>>,
    ) -> Self {
        pre_hooks.push(Box::new(ResponseHook::new(store.clone())));
        post_hooks.push(Box::new(SwarmInteractionHook::new(store)));

        Self {
            announce_policy,
            pre_hooks,
            post_hooks,
        }
    }

    /// Generates a response for an announce by running the pre-hook chain.
    ///
    /// # Errors
    ///
    /// Returns the first pre-hook error; the chain is aborted and the
    /// error is surfaced to the client.
    pub async fn handle_announce(
        &self,
        mut ctx: RequestContext,
        req: &AnnounceRequest,
    ) -> Result<(RequestContext, AnnounceResponse), Error> {
        let mut resp = AnnounceResponse {
            interval: self.announce_policy.interval,
            min_interval: self.announce_policy.interval_min,
            ..Default::default()
        };

        for hook in &self.pre_hooks {
            ctx = hook.handle_announce(ctx, req, &mut resp).await?;
        }

        debug!(target: CORE_LOG_TARGET, ?resp, "generated announce response");
        Ok((ctx, resp))
    }

    /// Runs the post-hook chain for an announce whose response has been
    /// sent. Hook failures are logged; the remaining hooks still run.
    pub async fn after_announce(&self, mut ctx: RequestContext, req: AnnounceRequest, mut resp: AnnounceResponse) {
        for hook in &self.post_hooks {
            match hook.handle_announce(ctx, &req, &mut resp).await {
                Ok(next_ctx) => ctx = next_ctx,
                Err(err) => {
                    tracing::error!(target: CORE_LOG_TARGET, %err, "post-announce hook failed");
                }
            }
        }
    }

    /// Generates a response for a scrape by running the pre-hook chain.
    ///
    /// # Errors
    ///
    /// Returns the first pre-hook error; the chain is aborted and the
    /// error is surfaced to the client.
    pub async fn handle_scrape(
        &self,
        mut ctx: RequestContext,
        req: &ScrapeRequest,
    ) -> Result<(RequestContext, ScrapeResponse), Error> {
        let mut resp = ScrapeResponse {
            files: Vec::with_capacity(req.info_hashes.len()),
        };

        for hook in &self.pre_hooks {
            ctx = hook.handle_scrape(ctx, req, &mut resp).await?;
        }

        debug!(target: CORE_LOG_TARGET, ?resp, "generated scrape response");
        Ok((ctx, resp))
    }

    /// Runs the post-hook chain for a scrape whose response has been sent.
    pub async fn after_scrape(&self, mut ctx: RequestContext, req: ScrapeRequest, mut resp: ScrapeResponse) {
        for hook in &self.post_hooks {
            match hook.handle_scrape(ctx, &req, &mut resp).await {
                Ok(next_ctx) => ctx = next_ctx,
                Err(err) => {
                    tracing::error!(target: CORE_LOG_TARGET, %err, "post-scrape hook failed");
                }
            }
        }
    }

    /// Pings every hook that depends on an external resource.
    ///
    /// # Errors
    ///
    /// Returns the first failing ping.
    pub async fn ping(&self) -> Result<(), Error> {
        for hook in self.pre_hooks.iter().chain(&self.post_hooks) {
            hook.ping().await?;
        }
        Ok(())
    }

    #[must_use]
    pub fn announce_policy(&self) -> AnnouncePolicy {
        self.announce_policy
    }
}


#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};
    use std::sync::Arc;

    use swarm_tracker_configuration::AnnouncePolicy;
    use swarm_tracker_peer_store::memory::MemoryPeerStore;
    use swarm_tracker_peer_store::{PeerStore as _, Storage};
    use swarm_tracker_primitives::announce_event::AnnounceEvent;
    use swarm_tracker_primitives::peer::{self, Peer};

    use async_trait::async_trait;

    use super::fixtures::sample_info_hash;
    use super::{AnnounceRequest, AnnounceResponse, Logic, ScrapeRequest, ScrapeResponse};
    use crate::core::context::RequestContext;
    use crate::core::error::{ClientError, Error};
    use crate::core::hooks::approval::TorrentApprovalHook;
    use crate::core::hooks::Hook;

    fn sample_store() -> Arc<dyn Storage> {
        Arc::new(MemoryPeerStore::new(4))
    }

    fn logic(store: &Arc<dyn Storage>, pre_hooks: Vec<Box<dyn Hook>>, post_hooks: Vec<Box<dyn Hook>>) -> Logic {
        Logic::new(AnnouncePolicy::new(1800, 900), store.clone(), pre_hooks, post_hooks)
    }

    fn announce(event: AnnounceEvent, left: u64) -> AnnounceRequest {
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
            left,
            event,
            numwant: 50,
        }
    }

    #[tokio::test]
    async fn a_first_announce_should_echo_the_policy_and_contain_the_caller_itself() {
        let store = sample_store();
        let logic = logic(&store, vec![], vec![]);

        let req = announce(AnnounceEvent::Started, 0);
        let (_ctx, resp) = logic.handle_announce(RequestContext::default(), &req).await.unwrap();

        assert_eq!(resp.interval, 1800);
        assert_eq!(resp.min_interval, 900);
        assert_eq!(resp.complete, 1);
        assert_eq!(resp.incomplete, 0);
        assert_eq!(resp.ipv4_peers, req.peers);
    }

    #[tokio::test]
    async fn an_announce_followed_by_a_scrape_should_show_the_seeder() {
        let store = sample_store();
        let logic = logic(&store, vec![], vec![]);

        let req = announce(AnnounceEvent::Started, 0);
        let (ctx, resp) = logic.handle_announce(RequestContext::default(), &req).await.unwrap();
        logic.after_announce(ctx, req, resp).await;

        let scrape = ScrapeRequest {
            info_hashes: vec![sample_info_hash()],
        };
        let (_ctx, resp) = logic.handle_scrape(RequestContext::default(), &scrape).await.unwrap();

        assert_eq!(resp.files.len(), 1);
        assert_eq!(resp.files[0].metadata.complete, 1);
        assert_eq!(resp.files[0].metadata.downloaded, 0);
        assert_eq!(resp.files[0].metadata.incomplete, 0);
    }

    #[tokio::test]
    async fn a_leecher_completing_the_download_should_graduate_and_snatch() {
        let store = sample_store();
        let logic = logic(&store, vec![], vec![]);

        let req = announce(AnnounceEvent::Started, 1000);
        let (ctx, resp) = logic.handle_announce(RequestContext::default(), &req).await.unwrap();
        logic.after_announce(ctx, req, resp).await;

        let req = announce(AnnounceEvent::Completed, 0);
        let (ctx, resp) = logic.handle_announce(RequestContext::default(), &req).await.unwrap();
        logic.after_announce(ctx, req, resp).await;

        let metadata = store.scrape_swarm(sample_info_hash()).await.unwrap();
        assert_eq!(metadata.complete, 1);
        assert_eq!(metadata.incomplete, 0);
        assert_eq!(metadata.downloaded, 1);
    }

    #[tokio::test]
    async fn a_denied_announce_should_abort_the_chain_and_leave_the_store_unchanged() {
        let store = sample_store();
        let approval = TorrentApprovalHook::new(store.clone(), &[sample_info_hash()], true)
            .await
            .unwrap();
        let logic = logic(&store, vec![Box::new(approval)], vec![]);

        let req = announce(AnnounceEvent::Started, 0);
        let result = logic.handle_announce(RequestContext::default(), &req).await;

        assert!(matches!(result, Err(Error::Client(ClientError::UnapprovedTorrent))));

        // The pre-hook chain aborted, so the frontend never runs the
        // post-hooks and the swarm is untouched.
        let metadata = store.scrape_swarm(sample_info_hash()).await.unwrap();
        assert_eq!(metadata.complete, 0);
        assert_eq!(store.metrics().seeders, 0);
    }

    struct FailingHook;

    #[async_trait]
    impl Hook for FailingHook {
        async fn handle_announce(
            &self,
            _ctx: RequestContext,
            _req: &AnnounceRequest,
            _resp: &mut AnnounceResponse,
        ) -> Result<RequestContext, Error> {
            Err(Error::internal("boom".to_owned()))
        }

        async fn handle_scrape(
            &self,
            _ctx: RequestContext,
            _req: &ScrapeRequest,
            _resp: &mut ScrapeResponse,
        ) -> Result<RequestContext, Error> {
            Err(Error::internal("boom".to_owned()))
        }
    }

    #[tokio::test]
    async fn a_failing_post_hook_should_not_stop_the_swarm_interaction_hook() {
        let store = sample_store();

        let logic = logic(&store, vec![], vec![Box::new(FailingHook)]);

        let req = announce(AnnounceEvent::Started, 0);
        let (ctx, resp) = logic.handle_announce(RequestContext::default(), &req).await.unwrap();
        logic.after_announce(ctx, req, resp).await;

        // The built-in swarm hook ran after the failing one.
        let metadata = store.scrape_swarm(sample_info_hash()).await.unwrap();
        assert_eq!(metadata.complete, 1);
    }

    #[tokio::test]
    async fn the_skip_swarm_interaction_flag_should_suppress_the_store_mutation() {
        let store = sample_store();
        let logic = logic(&store, vec![], vec![]);

        let req = announce(AnnounceEvent::Started, 0);
        let ctx = RequestContext::default().with_skip_swarm_interaction();
        let (ctx, resp) = logic.handle_announce(ctx, &req).await.unwrap();
        logic.after_announce(ctx, req, resp).await;

        assert_eq!(store.metrics().seeders, 0);
    }

    #[tokio::test]
    async fn a_scrape_should_be_bounded_to_the_requested_infohashes() {
        let store = sample_store();
        let logic = logic(&store, vec![], vec![]);

        let other = "ffffffffffffffffffffffffffffffffffffffff".parse().unwrap();
        let scrape = ScrapeRequest {
            info_hashes: vec![sample_info_hash(), other],
        };
        let (_ctx, resp) = logic.handle_scrape(RequestContext::default(), &scrape).await.unwrap();

        assert_eq!(resp.files.len(), 2);
        assert!(resp.files.iter().all(|entry| entry.metadata == Default::default()));
    }

    #[tokio::test]
    async fn ping_should_reach_the_built_in_hooks() {
        let store = sample_store();
        let logic = logic(&store, vec![], vec![]);

        logic.ping().await.unwrap();
    }
}
