//! The middleware hook contract.
//!
//! A hook is anything that needs to interact with an announce or scrape
//! request and its response on the way through the tracker. The same
//! interface serves pre-hooks (validation, admission, response shaping)
//! and post-hooks (swarm mutation): the difference is only where they are
//! registered on the [`Logic`](crate::core::Logic).
use async_trait::async_trait;

use crate::core::context::RequestContext;
use crate::core::error::Error;
use crate::core::{AnnounceRequest, AnnounceResponse, ScrapeRequest, ScrapeResponse};

pub mod approval;
pub mod interval;
pub mod response;
pub mod swarm;

/// A request/response transformer composable into pre- and post-chains.
///
/// Hooks run sequentially in registration order. The returned context
/// replaces the previous one, so a hook can attach flags for the hooks
/// downstream. Returning an error from a pre-hook aborts the chain and the
/// error is surfaced to the client.
#[async_trait]
pub trait Hook: Sync + Send {
    async fn handle_announce(
        &self,
        ctx: RequestContext,
        req: &AnnounceRequest,
        resp: &mut AnnounceResponse,
    ) -> Result<RequestContext, Error>;

    async fn handle_scrape(
        &self,
        ctx: RequestContext,
        req: &ScrapeRequest,
        resp: &mut ScrapeResponse,
    ) -> Result<RequestContext, Error>;

    /// Liveness of whatever the hook depends on (storage, external
    /// services). Hooks without dependencies are always operational.
    async fn ping(&self) -> Result<(), Error> {
        Ok(())
    }
}
