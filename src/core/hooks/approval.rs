//! Torrent-approval pre-hook.
//!
//! Admission control by infohash: either only whitelisted torrents are
//! served, or blacklisted torrents are refused. The hash lists live in the
//! store's key/value side channel under their own namespace, so a remote
//! storage backend shares one list across tracker instances.
use std::sync::Arc;

use async_trait::async_trait;
use swarm_tracker_peer_store::{DataStore as _, PeerStore as _, Storage};
use swarm_tracker_primitives::info_hash::InfoHash;

use crate::core::context::RequestContext;
use crate::core::error::{ClientError, Error};
use crate::core::hooks::Hook;
use crate::core::{AnnounceRequest, AnnounceResponse, ScrapeRequest, ScrapeResponse};

/// Namespace for the approval list inside the [`swarm_tracker_peer_store::DataStore`].
pub const STORAGE_NAMESPACE: &str = "mw_approval";

pub struct TorrentApprovalHook {
    store: Arc<dyn Storage>,
    /// When set, the list names the *forbidden* hashes instead of the
    /// allowed ones.
    invert: bool,
}

impl TorrentApprovalHook {
    /// Seeds the approval namespace with `hashes` and returns the hook.
    ///
    /// # Errors
    ///
    /// Will return an error if the list can't be written to the store.
    pub async fn new(store: Arc<dyn Storage>, hashes: &[InfoHash], invert: bool) -> Result<Self, Error> {
        for hash in hashes {
            store.put(STORAGE_NAMESPACE, hash.bytes().to_vec(), vec![]).await?;
        }

        Ok(Self { store, invert })
    }

    async fn is_approved(&self, info_hash: InfoHash) -> Result<bool, Error> {
        let mut listed = self.store.contains(STORAGE_NAMESPACE, info_hash.bytes()).await?;

        // Hybrid torrents may be listed under either form.
        if !listed && info_hash.is_v2() {
            listed = self
                .store
                .contains(STORAGE_NAMESPACE, info_hash.truncate_v1().bytes())
                .await?;
        }

        Ok(listed != self.invert)
    }
}

#[async_trait]
impl Hook for TorrentApprovalHook {
    async fn handle_announce(
        &self,
        ctx: RequestContext,
        req: &AnnounceRequest,
        _resp: &mut AnnounceResponse,
    ) -> Result<RequestContext, Error> {
        if self.is_approved(req.info_hash).await? {
            Ok(ctx)
        } else {
            Err(ClientError::UnapprovedTorrent.into())
        }
    }

    async fn handle_scrape(
        &self,
        ctx: RequestContext,
        req: &ScrapeRequest,
        _resp: &mut ScrapeResponse,
    ) -> Result<RequestContext, Error> {
        for info_hash in &req.info_hashes {
            if !self.is_approved(*info_hash).await? {
                return Err(ClientError::UnapprovedTorrent.into());
            }
        }

        Ok(ctx)
    }

    async fn ping(&self) -> Result<(), Error> {
        Ok(self.store.ping().await?)
    }
}
