//! End-to-end tests for the HTTP tracker frontend.
use std::sync::Arc;
use std::time::Duration;

use swarm_tracker::core::Logic;
use swarm_tracker::servers::http::server::{HttpServer, RunningHttpServer};
use swarm_tracker::servers::http::HttpTracker;
use swarm_tracker_configuration::{AnnouncePolicy, Core};
use swarm_tracker_peer_store::memory::MemoryPeerStore;
use swarm_tracker_peer_store::{PeerStore as _, Storage};

// 3b245504cf5f11bbdbe1201cea6a6bf45aee1bc0, percent-encoded.
const INFO_HASH_PARAM: &str = "info_hash=%3B%24U%04%CF_%11%BB%DB%E1%20%1C%EAjk%F4Z%EE%1B%C0";

async fn start_tracker() -> (RunningHttpServer, Arc<dyn Storage>) {
    let store: Arc<dyn Storage> = Arc::new(MemoryPeerStore::new(8));
    let logic = Arc::new(Logic::new(AnnouncePolicy::new(1800, 900), store.clone(), vec![], vec![]));
    let tracker = Arc::new(HttpTracker::new(logic, Core::default(), None));

    let server = HttpServer::new("127.0.0.1:0".parse().unwrap()).start(tracker).await.unwrap();
    (server, store)
}

async fn get(server: &RunningHttpServer, path_and_query: &str) -> Vec<u8> {
    let url = format!("http://{}{path_and_query}", server.binding());
    let response = reqwest::get(url).await.unwrap();

    assert_eq!(response.status(), 200);
    response.bytes().await.unwrap().to_vec()
}

#[tokio::test]
async fn a_first_announce_should_return_a_bencoded_response_with_the_caller_itself() {
    let (server, _store) = start_tracker().await;

    let body = get(
        &server,
        &format!("/announce?{INFO_HASH_PARAM}&peer_id=-qB00000000000000001&port=6881&uploaded=0&downloaded=0&left=0"),
    )
    .await;

    let body = String::from_utf8_lossy(&body).into_owned();
    assert!(body.starts_with("d8:completei1e10:incompletei0e8:intervali1800e12:min intervali900e5:peers"));
    assert!(body.contains("4:porti6881e"));

    server.stop().await;
}

#[tokio::test]
async fn a_compact_announce_should_pack_the_caller_into_6_bytes() {
    let (server, _store) = start_tracker().await;

    let body = get(
        &server,
        &format!("/announce?{INFO_HASH_PARAM}&peer_id=-qB00000000000000001&port=6881&left=0&compact=1"),
    )
    .await;

    let body = String::from_utf8_lossy(&body).into_owned();
    assert!(body.contains("5:peers6:"));

    server.stop().await;
}

#[tokio::test]
async fn an_announce_followed_by_a_scrape_should_report_the_seeder() {
    let (server, _store) = start_tracker().await;

    get(
        &server,
        &format!("/announce?{INFO_HASH_PARAM}&peer_id=-qB00000000000000001&port=6881&left=0"),
    )
    .await;

    // The swarm mutation runs detached, after the response is built.
    tokio::time::sleep(Duration::from_millis(100)).await;

    let body = get(&server, &format!("/scrape?{INFO_HASH_PARAM}")).await;

    let body = String::from_utf8_lossy(&body).into_owned();
    assert!(body.starts_with("d5:filesd20:"));
    assert!(body.ends_with("d8:completei1e10:downloadedi0e10:incompletei0eeee"));

    server.stop().await;
}

#[tokio::test]
async fn an_announce_without_an_info_hash_should_return_a_failure_reason() {
    let (server, _store) = start_tracker().await;

    let body = get(&server, "/announce?peer_id=-qB00000000000000001&port=6881").await;

    let body = String::from_utf8_lossy(&body).into_owned();
    assert!(body.starts_with("d14:failure reason"));
    assert!(body.contains("info_hash"));

    server.stop().await;
}

#[tokio::test]
async fn a_stopped_event_should_remove_the_peer_from_the_swarm() {
    let (server, store) = start_tracker().await;

    get(
        &server,
        &format!("/announce?{INFO_HASH_PARAM}&peer_id=-qB00000000000000001&port=6881&left=500&event=started"),
    )
    .await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(store.metrics().leechers, 1);

    get(
        &server,
        &format!("/announce?{INFO_HASH_PARAM}&peer_id=-qB00000000000000001&port=6881&left=500&event=stopped"),
    )
    .await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(store.metrics().leechers, 0);

    server.stop().await;
}
