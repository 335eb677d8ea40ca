//! Integration tests for the in-memory peer store.
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::str::FromStr;

use swarm_tracker_peer_store::memory::MemoryPeerStore;
use swarm_tracker_peer_store::{DataStore, Error, PeerStore};
use swarm_tracker_primitives::info_hash::InfoHash;
use swarm_tracker_primitives::peer::{self, Peer};

fn sample_info_hash() -> InfoHash {
    InfoHash::from_str("3b245504cf5f11bbdbe1201cea6a6bf45aee1bc0").unwrap()
}

fn sample_v2_info_hash() -> InfoHash {
    InfoHash::from_str("d8dd32ac93357c368556af3ac1d95c9d76bd0dff6fa9833ecdac3d53134efabb").unwrap()
}

fn v4_peer(id_last_byte: u8, addr_last_octet: u8) -> Peer {
    let mut id = *b"-qB00000000000000000";
    id[19] = id_last_byte;
    Peer {
        peer_id: peer::Id(id),
        peer_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, addr_last_octet)), 6881),
    }
}

fn v6_peer(id_last_byte: u8) -> Peer {
    let mut id = *b"-qB00000000000000000";
    id[19] = id_last_byte;
    Peer {
        peer_id: peer::Id(id),
        peer_addr: SocketAddr::new(IpAddr::V6(Ipv6Addr::new(0xfd00, 0, 0, 0, 0, 0, 0, u16::from(id_last_byte))), 6881),
    }
}

#[tokio::test]
async fn a_peer_should_be_a_seeder_xor_a_leecher() {
    let store = MemoryPeerStore::new(4);
    let info_hash = sample_info_hash();
    let peer = v4_peer(1, 1);

    store.put_leecher(info_hash, peer).await.unwrap();
    store.put_seeder(info_hash, peer).await.unwrap();

    let metadata = store.scrape_swarm(info_hash).await.unwrap();
    assert_eq!(metadata.complete, 1);
    assert_eq!(metadata.incomplete, 0);

    store.put_leecher(info_hash, peer).await.unwrap();

    let metadata = store.scrape_swarm(info_hash).await.unwrap();
    assert_eq!(metadata.complete, 0);
    assert_eq!(metadata.incomplete, 1);
}

#[tokio::test]
async fn global_counters_should_match_the_sum_over_all_swarms_after_quiescence() {
    let store = MemoryPeerStore::new(4);
    let torrent_a = sample_info_hash();
    let torrent_b = InfoHash::from_str("ffffffffffffffffffffffffffffffffffffffff").unwrap();

    store.put_seeder(torrent_a, v4_peer(1, 1)).await.unwrap();
    store.put_leecher(torrent_a, v4_peer(2, 2)).await.unwrap();
    store.put_leecher(torrent_b, v4_peer(3, 3)).await.unwrap();
    store.graduate_leecher(torrent_b, v4_peer(3, 3)).await.unwrap();
    store.put_leecher(torrent_b, v4_peer(4, 4)).await.unwrap();
    store.delete_leecher(torrent_a, v4_peer(2, 2)).await.unwrap();

    let metrics = store.metrics();

    let scrape_a = store.scrape_swarm(torrent_a).await.unwrap();
    let scrape_b = store.scrape_swarm(torrent_b).await.unwrap();

    assert_eq!(metrics.seeders, u64::from(scrape_a.complete + scrape_b.complete));
    assert_eq!(metrics.leechers, u64::from(scrape_a.incomplete + scrape_b.incomplete));
    assert_eq!(metrics.swarms, 2);
}

#[tokio::test]
async fn graduating_a_leecher_should_count_a_snatch_exactly_once() {
    let store = MemoryPeerStore::new(4);
    let info_hash = sample_info_hash();
    let peer = v4_peer(1, 1);

    store.put_leecher(info_hash, peer).await.unwrap();
    store.graduate_leecher(info_hash, peer).await.unwrap();

    let metadata = store.scrape_swarm(info_hash).await.unwrap();
    assert_eq!(metadata.complete, 1);
    assert_eq!(metadata.incomplete, 0);
    assert_eq!(metadata.downloaded, 1);

    // A seeder re-announcing a completed event does not snatch again.
    store.graduate_leecher(info_hash, peer).await.unwrap();

    assert_eq!(store.scrape_swarm(info_hash).await.unwrap().downloaded, 1);
}

#[tokio::test]
async fn graduating_an_unknown_peer_should_behave_like_put_seeder() {
    let store = MemoryPeerStore::new(4);
    let info_hash = sample_info_hash();

    store.graduate_leecher(info_hash, v4_peer(1, 1)).await.unwrap();

    let metadata = store.scrape_swarm(info_hash).await.unwrap();
    assert_eq!(metadata.complete, 1);
    assert_eq!(metadata.downloaded, 0);
}

#[tokio::test]
async fn deleting_an_absent_peer_should_fail_with_not_found() {
    let store = MemoryPeerStore::new(4);
    let info_hash = sample_info_hash();

    assert_eq!(store.delete_seeder(info_hash, v4_peer(1, 1)).await, Err(Error::NotFound));
    assert_eq!(store.delete_leecher(info_hash, v4_peer(1, 1)).await, Err(Error::NotFound));

    store.put_seeder(info_hash, v4_peer(1, 1)).await.unwrap();

    assert_eq!(store.delete_leecher(info_hash, v4_peer(1, 1)).await, Err(Error::NotFound));
    assert_eq!(store.delete_seeder(info_hash, v4_peer(1, 1)).await, Ok(()));
}

#[tokio::test]
async fn scraping_an_unknown_swarm_should_return_zeroes() {
    let store = MemoryPeerStore::new(4);

    let metadata = store.scrape_swarm(sample_info_hash()).await.unwrap();

    assert_eq!(metadata.complete, 0);
    assert_eq!(metadata.incomplete, 0);
    assert_eq!(metadata.downloaded, 0);
}

#[tokio::test]
async fn announce_peers_should_return_at_most_the_wanted_number_without_duplicates() {
    let store = MemoryPeerStore::new(4);
    let info_hash = sample_info_hash();

    for i in 1..=10u8 {
        store.put_seeder(info_hash, v4_peer(i, i)).await.unwrap();
    }

    let peers = store.announce_peers(info_hash, false, 4, false).await.unwrap();

    assert_eq!(peers.len(), 4);
    let unique: std::collections::HashSet<_> = peers.iter().collect();
    assert_eq!(unique.len(), 4);
}

#[tokio::test]
async fn announce_peers_should_filter_by_address_family() {
    let store = MemoryPeerStore::new(4);
    let info_hash = sample_info_hash();

    store.put_seeder(info_hash, v4_peer(1, 1)).await.unwrap();
    store.put_seeder(info_hash, v6_peer(2)).await.unwrap();

    let v4_only = store.announce_peers(info_hash, false, 32, false).await.unwrap();
    let v6_only = store.announce_peers(info_hash, false, 32, true).await.unwrap();

    assert!(v4_only.iter().all(|peer| peer.peer_addr.is_ipv4()));
    assert!(v6_only.iter().all(|peer| peer.peer_addr.is_ipv6()));
    assert_eq!(v4_only.len(), 1);
    assert_eq!(v6_only.len(), 1);
}

#[tokio::test]
async fn a_seeder_should_only_be_told_about_leechers() {
    let store = MemoryPeerStore::new(4);
    let info_hash = sample_info_hash();

    store.put_seeder(info_hash, v4_peer(1, 1)).await.unwrap();
    store.put_seeder(info_hash, v4_peer(2, 2)).await.unwrap();
    store.put_leecher(info_hash, v4_peer(3, 3)).await.unwrap();

    let peers = store.announce_peers(info_hash, true, 32, false).await.unwrap();

    assert_eq!(peers, vec![v4_peer(3, 3)]);
}

#[tokio::test]
async fn a_leecher_should_be_told_about_seeders_before_other_leechers() {
    let store = MemoryPeerStore::new(4);
    let info_hash = sample_info_hash();

    store.put_seeder(info_hash, v4_peer(1, 1)).await.unwrap();
    store.put_leecher(info_hash, v4_peer(2, 2)).await.unwrap();
    store.put_leecher(info_hash, v4_peer(3, 3)).await.unwrap();

    // Only one slot: the seeder must win it.
    let peers = store.announce_peers(info_hash, false, 1, false).await.unwrap();

    assert_eq!(peers, vec![v4_peer(1, 1)]);
}

#[tokio::test]
async fn announcing_an_empty_swarm_should_return_no_peers_and_no_error() {
    let store = MemoryPeerStore::new(4);

    let peers = store.announce_peers(sample_info_hash(), false, 32, false).await.unwrap();

    assert!(peers.is_empty());
}

#[tokio::test]
async fn a_mutation_on_a_v2_infohash_should_be_mirrored_onto_its_v1_truncation() {
    let store = MemoryPeerStore::new(4);
    let v2 = sample_v2_info_hash();
    let v1 = v2.truncate_v1();

    store.put_seeder(v2, v4_peer(1, 1)).await.unwrap();

    // The truncated v1 swarm sees the peer too.
    let v1_peers = store.announce_peers(v1, false, 32, false).await.unwrap();
    assert_eq!(v1_peers, vec![v4_peer(1, 1)]);

    // Reads on the v2 hash union both swarms but dedup by peer identity.
    let v2_peers = store.announce_peers(v2, false, 32, false).await.unwrap();
    assert_eq!(v2_peers, vec![v4_peer(1, 1)]);

    // Scrape counters aggregate the v2 swarm and its v1 mirror.
    let metadata = store.scrape_swarm(v2).await.unwrap();
    assert_eq!(metadata.complete, 2);
}

#[tokio::test]
async fn deleting_a_v2_peer_should_remove_it_from_both_swarms() {
    let store = MemoryPeerStore::new(4);
    let v2 = sample_v2_info_hash();

    store.put_leecher(v2, v4_peer(1, 1)).await.unwrap();
    store.delete_leecher(v2, v4_peer(1, 1)).await.unwrap();

    assert_eq!(store.scrape_swarm(v2).await.unwrap().incomplete, 0);
    assert_eq!(store.scrape_swarm(v2.truncate_v1()).await.unwrap().incomplete, 0);
    assert_eq!(store.metrics().leechers, 0);
}

#[tokio::test]
async fn the_data_store_should_keep_namespaced_small_state() {
    let store = MemoryPeerStore::new(4);

    store.put("approval", b"key".to_vec(), b"value".to_vec()).await.unwrap();

    assert!(store.contains("approval", b"key").await.unwrap());
    assert!(!store.contains("other", b"key").await.unwrap());
    assert_eq!(store.load("approval", b"key").await.unwrap(), Some(b"value".to_vec()));

    store.delete("approval", b"key").await.unwrap();

    assert!(!store.contains("approval", b"key").await.unwrap());
    assert_eq!(store.delete("approval", b"key").await, Err(Error::NotFound));
}

#[tokio::test]
async fn stopping_the_store_should_join_the_scheduled_jobs() {
    let store = MemoryPeerStore::new(4);

    store.schedule_gc(std::time::Duration::from_secs(3600), std::time::Duration::from_secs(60));
    store.schedule_stats(std::time::Duration::from_secs(3600));

    store.stop().await;
}
