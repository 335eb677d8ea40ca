//! The built-in swarm-interaction post-hook.
//!
//! It classifies the announce event and applies the matching store
//! mutation after the response has already been written. It always runs
//! last in the post-hook chain.
use std::sync::Arc;

use async_trait::async_trait;
use swarm_tracker_peer_store::{Error as StoreError, PeerStore as _, Storage};
use swarm_tracker_primitives::announce_event::AnnounceEvent;

use crate::core::context::RequestContext;
use crate::core::error::Error;
use crate::core::hooks::Hook;
use crate::core::{AnnounceRequest, AnnounceResponse, ScrapeRequest, ScrapeResponse};

pub struct SwarmInteractionHook {
    store: Arc<dyn Storage>,
}

impl SwarmInteractionHook {
    #[must_use]
    pub fn new(store: Arc<dyn Storage>) -> Self {
        Self { store }
    }
}

fn tolerate_not_found(result: Result<(), StoreError>) -> Result<(), StoreError> {
    match result {
        Err(StoreError::NotFound) => Ok(()),
        other => other,
    }
}

#[async_trait]
impl Hook for SwarmInteractionHook {
    async fn handle_announce(
        &self,
        ctx: RequestContext,
        req: &AnnounceRequest,
        _resp: &mut AnnounceResponse,
    ) -> Result<RequestContext, Error> {
        if ctx.skip_swarm_interaction() {
            return Ok(ctx);
        }

        for peer in &req.peers {
            match req.event {
                AnnounceEvent::Stopped => {
                    // Deletes are idempotent; the peer may only be in one
                    // of the two sets, or already gone.
                    tolerate_not_found(self.store.delete_seeder(req.info_hash, *peer).await)?;
                    tolerate_not_found(self.store.delete_leecher(req.info_hash, *peer).await)?;
                }
                AnnounceEvent::Completed => {
                    self.store.graduate_leecher(req.info_hash, *peer).await?;
                }
                // Completed events also have left == 0, but matching them
                // above lets re-announcing seeders take the cheaper put.
                _ if req.left == 0 => {
                    self.store.put_seeder(req.info_hash, *peer).await?;
                }
                _ => {
                    self.store.put_leecher(req.info_hash, *peer).await?;
                }
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
        // Scrapes have no effect on the swarm.
        Ok(ctx)
    }

    async fn ping(&self) -> Result<(), Error> {
        Ok(self.store.ping().await?)
    }
}
