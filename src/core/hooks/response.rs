//! The built-in response-assembly pre-hook.
//!
//! It fills the scrape counters and the peer lists of a response from the
//! peer store. It always runs last in the pre-hook chain, so admission
//! hooks have already had their say.
use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use swarm_tracker_peer_store::{Error as StoreError, PeerStore as _, Storage};

use crate::core::context::RequestContext;
use crate::core::error::Error;
use crate::core::hooks::Hook;
use crate::core::{AnnounceRequest, AnnounceResponse, ScrapeEntry, ScrapeRequest, ScrapeResponse};

pub struct ResponseHook {
    store: Arc<dyn Storage>,
}

impl ResponseHook {
    #[must_use]
    pub fn new(store: Arc<dyn Storage>) -> Self {
        Self { store }
    }

    async fn append_peers(&self, req: &AnnounceRequest, resp: &mut AnnounceResponse) -> Result<(), Error> {
        let seeding = req.left == 0;
        let mut budget = req.numwant as usize;

        // Anything an earlier hook already placed in the response counts
        // against the budget, primary family first.
        let v6_first = req.source_ip.is_ipv6();
        let mut peers = Vec::with_capacity(resp.ipv4_peers.len() + resp.ipv6_peers.len());
        if v6_first {
            peers.append(&mut resp.ipv6_peers);
            peers.append(&mut resp.ipv4_peers);
        } else {
            peers.append(&mut resp.ipv4_peers);
            peers.append(&mut resp.ipv6_peers);
        }
        if peers.len() > budget {
            peers.truncate(budget);
            budget = 0;
        } else {
            budget -= peers.len();
        }

        // The store unions a v2 swarm with its v1 truncation, so one fetch
        // per address family covers hybrid torrents too.
        for want_v6 in [v6_first, !v6_first] {
            if budget == 0 {
                break;
            }

            let fetched = match self.store.announce_peers(req.info_hash, seeding, budget, want_v6).await {
                Ok(fetched) => fetched,
                Err(StoreError::NotFound) => vec![],
                Err(err) => return Err(err.into()),
            };

            budget -= fetched.len();
            peers.extend(fetched);
        }

        // Some clients expect a minimum of their own peer representation
        // returned to them if they are the only peer in a swarm.
        if peers.is_empty() {
            if seeding {
                resp.complete += 1;
            } else {
                resp.incomplete += 1;
            }
            peers.extend(req.peers.iter().copied());
        }

        let mut unique_peers = HashSet::with_capacity(peers.len());
        for peer in peers {
            if unique_peers.insert(peer) {
                if peer.peer_addr.is_ipv6() {
                    resp.ipv6_peers.push(peer);
                } else {
                    resp.ipv4_peers.push(peer);
                }
            }
        }

        Ok(())
    }
}

#[async_trait]
impl Hook for ResponseHook {
    async fn handle_announce(
        &self,
        ctx: RequestContext,
        req: &AnnounceRequest,
        resp: &mut AnnounceResponse,
    ) -> Result<RequestContext, Error> {
        if ctx.skip_response_hook() {
            return Ok(ctx);
        }

        // Snatches are only reported on scrapes, not on announces.
        let metadata = self.store.scrape_swarm(req.info_hash).await?;
        resp.complete = metadata.complete;
        resp.incomplete = metadata.incomplete;

        self.append_peers(req, resp).await?;

        Ok(ctx)
    }

    async fn handle_scrape(
        &self,
        ctx: RequestContext,
        req: &ScrapeRequest,
        resp: &mut ScrapeResponse,
    ) -> Result<RequestContext, Error> {
        if ctx.skip_response_hook() {
            return Ok(ctx);
        }

        for info_hash in &req.info_hashes {
            let metadata = self.store.scrape_swarm(*info_hash).await?;
            resp.files.push(ScrapeEntry {
                info_hash: *info_hash,
                metadata,
            });
        }

        Ok(ctx)
    }

    async fn ping(&self) -> Result<(), Error> {
        Ok(self.store.ping().await?)
    }
}
