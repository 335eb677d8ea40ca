//! The HTTP server: axum routes and lifecycle.
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::extract::{ConnectInfo, RawQuery, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::{requests, responses, HttpTracker, HTTP_TRACKER_LOG_TARGET};
use crate::core::context::RequestContext;
use crate::core::error::Error;
use crate::core::statistics::Event;
use crate::core::{self, peer_builder};

/// A HTTP tracker instance controller with no instance running.
pub type StoppedHttpServer = HttpServer<Stopped>;

/// A HTTP tracker instance controller with a running instance.
pub type RunningHttpServer = HttpServer<Running>;

pub struct HttpServer<S> {
    pub state: S,
}

pub struct Stopped {
    bind_to: SocketAddr,
}

pub struct Running {
    binding: SocketAddr,
    halt: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl HttpServer<Stopped> {
    #[must_use]
    pub fn new(bind_to: SocketAddr) -> Self {
        Self {
            state: Stopped { bind_to },
        }
    }

    /// It binds the listener and starts serving.
    ///
    /// # Errors
    ///
    /// Will return an error if the listener can't be bound.
    pub async fn start(self, tracker: Arc<HttpTracker>) -> Result<HttpServer<Running>, std::io::Error> {
        let listener = tokio::net::TcpListener::bind(self.state.bind_to).await?;
        let binding = listener.local_addr()?;

        let (halt, mut halt_rx) = watch::channel(false);

        let app = router(tracker);

        let task = tokio::spawn(async move {
            let serve = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
                .with_graceful_shutdown(async move {
                    drop(halt_rx.changed().await);
                });

            if let Err(err) = serve.await {
                tracing::error!(target: HTTP_TRACKER_LOG_TARGET, %err, "server failed");
            }
        });

        tracing::info!(target: HTTP_TRACKER_LOG_TARGET, %binding, "started");

        Ok(HttpServer {
            state: Running { binding, halt, task },
        })
    }
}

impl HttpServer<Running> {
    #[must_use]
    pub fn binding(&self) -> SocketAddr {
        self.state.binding
    }

    /// It stops accepting connections and waits for the server task.
    pub async fn stop(self) {
        drop(self.state.halt.send(true));
        drop(self.state.task.await);

        tracing::info!(target: HTTP_TRACKER_LOG_TARGET, binding = %self.state.binding, "stopped");
    }
}

fn router(tracker: Arc<HttpTracker>) -> Router {
    Router::new()
        .route("/announce", get(handle_announce))
        .route("/scrape", get(handle_scrape))
        .with_state(tracker)
}

async fn handle_announce(
    State(tracker): State<Arc<HttpTracker>>,
    RawQuery(query): RawQuery,
    ConnectInfo(remote_addr): ConnectInfo<SocketAddr>,
) -> Response {
    match announce(&tracker, query.unwrap_or_default(), remote_addr.ip()).await {
        Ok(body) => (StatusCode::OK, body).into_response(),
        Err(Error::Cancelled) => StatusCode::SERVICE_UNAVAILABLE.into_response(),
        Err(err) => (StatusCode::OK, responses::error_body(&err)).into_response(),
    }
}

async fn announce(tracker: &Arc<HttpTracker>, query: String, source_ip: IpAddr) -> Result<Vec<u8>, Error> {
    let announce = requests::Announce::from_query(&query).map_err(Error::from)?;

    let numwant = announce
        .numwant
        .unwrap_or(tracker.config.default_numwant)
        .min(tracker.config.max_numwant);

    let req = core::AnnounceRequest {
        info_hash: announce.info_hash,
        peers: peer_builder::from_request(
            announce.peer_id,
            announce.port,
            source_ip,
            announce.advertised_ip,
            &tracker.config,
        ),
        source_ip,
        uploaded: announce.uploaded,
        downloaded: announce.downloaded,
        left: announce.left,
        event: announce.event,
        numwant,
    };

    let (ctx, resp) = tracker.logic.handle_announce(RequestContext::default(), &req).await?;

    let event = if source_ip.is_ipv4() {
        Event::Tcp4Announce
    } else {
        Event::Tcp6Announce
    };
    tracker.send_stats_event(event).await;

    let body = responses::announce_body(&resp, announce.compact)
        .map_err(|err| Error::internal(format!("bencoding announce response: {err}")))?;

    // The response body is built; swarm writes overlap with the send.
    let logic = tracker.logic.clone();
    tokio::spawn(async move { logic.after_announce(ctx, req, resp).await });

    Ok(body)
}

async fn handle_scrape(
    State(tracker): State<Arc<HttpTracker>>,
    RawQuery(query): RawQuery,
    ConnectInfo(remote_addr): ConnectInfo<SocketAddr>,
) -> Response {
    match scrape(&tracker, query.unwrap_or_default(), remote_addr.ip()).await {
        Ok(body) => (StatusCode::OK, body).into_response(),
        Err(Error::Cancelled) => StatusCode::SERVICE_UNAVAILABLE.into_response(),
        Err(err) => (StatusCode::OK, responses::error_body(&err)).into_response(),
    }
}

async fn scrape(tracker: &Arc<HttpTracker>, query: String, source_ip: IpAddr) -> Result<Vec<u8>, Error> {
    let scrape = requests::Scrape::from_query(&query, tracker.config.max_scrape_infohashes).map_err(Error::from)?;

    let req = core::ScrapeRequest {
        info_hashes: scrape.info_hashes,
    };

    let (ctx, resp) = tracker.logic.handle_scrape(RequestContext::default(), &req).await?;

    let event = if source_ip.is_ipv4() {
        Event::Tcp4Scrape
    } else {
        Event::Tcp6Scrape
    };
    tracker.send_stats_event(event).await;

    let body = responses::scrape_body(&resp).map_err(|err| Error::internal(format!("bencoding scrape response: {err}")))?;

    let logic = tracker.logic.clone();
    tokio::spawn(async move { logic.after_scrape(ctx, req, resp).await });

    Ok(body)
}
