//! Application assembly.
//!
//! [`start`] wires the configured pieces together: the peer store and its
//! scheduled jobs, the middleware hooks, the core pipeline, the
//! statistics keeper, and one server per configured frontend. [`App`]
//! holds everything needed for an orderly shutdown: frontends first (so
//! no new requests arrive), then the store (which joins its GC and stats
//! tasks).
use std::sync::Arc;
use std::time::Duration;

use swarm_tracker_configuration::Configuration;
use swarm_tracker_peer_store::memory::MemoryPeerStore;
use swarm_tracker_peer_store::{PeerStore as _, Storage};
use swarm_tracker_primitives::info_hash::InfoHash;

use crate::bootstrap::jobs::{http_tracker, udp_tracker};
use crate::core::hooks::approval::TorrentApprovalHook;
use crate::core::hooks::interval::IntervalVariationHook;
use crate::core::hooks::Hook;
use crate::core::statistics::{self, Keeper};
use crate::core::Logic;
use crate::servers::http::server::RunningHttpServer;
use crate::servers::udp::server::RunningUdpServer;

/// The running application.
pub struct App {
    pub store: Arc<dyn Storage>,
    pub stats_repository: statistics::Repo,
    pub udp_servers: Vec<RunningUdpServer>,
    pub http_servers: Vec<RunningHttpServer>,
}

impl App {
    /// Stops the frontends, then the store.
    pub async fn stop(self) {
        for server in self.udp_servers {
            server.stop().await;
        }

        for server in self.http_servers {
            server.stop().await;
        }

        self.store.stop().await;
    }
}

/// Builds and starts every configured service.
///
/// # Errors
///
/// Will return an error if the configuration carries an unparseable
/// infohash list, if a hook can't reach the store, or if a server can't
/// bind.
pub async fn start(config: &Configuration) -> anyhow::Result<App> {
    let store: Arc<dyn Storage> = Arc::new(MemoryPeerStore::new(config.peer_store.effective_shard_count()));

    store.schedule_gc(
        Duration::from_secs(config.peer_store.gc_interval),
        Duration::from_secs(config.peer_store.peer_lifetime),
    );
    store.schedule_stats(Duration::from_secs(config.peer_store.stats_interval));

    let pre_hooks = build_pre_hooks(config, &store).await?;

    let logic = Arc::new(Logic::new(
        swarm_tracker_configuration::AnnouncePolicy::new(config.core.announce_interval, config.core.min_announce_interval),
        store.clone(),
        pre_hooks,
        vec![],
    ));

    logic
        .ping()
        .await
        .map_err(|err| anyhow::anyhow!("tracker hooks are not operational: {err}"))?;

    let mut keeper = Keeper::new();
    let stats_repository = keeper.repository.clone();

    let mut udp_servers = Vec::with_capacity(config.udp_trackers.len());
    for udp_config in &config.udp_trackers {
        let sender = keeper.run_event_listener();
        udp_servers.push(udp_tracker::start_job(
            udp_config,
            config.core.clone(),
            logic.clone(),
            Some(sender),
        )?);
    }

    let mut http_servers = Vec::with_capacity(config.http_trackers.len());
    for http_config in &config.http_trackers {
        let sender = keeper.run_event_listener();
        http_servers.push(http_tracker::start_job(http_config, config.core.clone(), logic.clone(), Some(sender)).await?);
    }

    Ok(App {
        store,
        stats_repository,
        udp_servers,
        http_servers,
    })
}

async fn build_pre_hooks(config: &Configuration, store: &Arc<dyn Storage>) -> anyhow::Result<Vec<Box<dyn Hook>>> {
    let mut hooks: Vec<Box<dyn Hook>> = vec![];

    if let Some(approval) = &config.middleware.torrent_approval {
        let (list, invert) = if approval.whitelist.is_empty() {
            (&approval.blacklist, true)
        } else {
            (&approval.whitelist, false)
        };

        let hashes = list
            .iter()
            .map(|hash| {
                hash.parse::<InfoHash>()
                    .map_err(|_| anyhow::anyhow!("invalid infohash in approval list: {hash}"))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        hooks.push(Box::new(TorrentApprovalHook::new(store.clone(), &hashes, invert).await?));
    }

    if let Some(variation) = &config.middleware.interval_variation {
        hooks.push(Box::new(IntervalVariationHook::new(
            variation.modify_probability,
            variation.max_increase_delta,
            variation.modify_min_interval,
        )));
    }

    Ok(hooks)
}

#[cfg(test)]
mod tests {
    use swarm_tracker_configuration::Configuration;

    use super::start;

    #[tokio::test]
    async fn the_app_should_start_and_stop_with_an_ephemeral_configuration() {
        let config = Configuration::ephemeral();

        let app = start(&config).await.unwrap();

        assert_eq!(app.udp_servers.len(), 1);
        assert_ne!(app.udp_servers[0].binding().port(), 0);

        app.stop().await;
    }

    #[tokio::test]
    async fn a_bad_approval_list_should_fail_startup() {
        let mut config = Configuration::ephemeral();
        config.middleware.torrent_approval = Some(swarm_tracker_configuration::TorrentApproval {
            whitelist: vec!["not-an-infohash".to_owned()],
            blacklist: vec![],
        });

        assert!(start(&config).await.is_err());
    }
}
