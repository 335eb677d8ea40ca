//! Structs to collect and keep tracker metrics.
//!
//! The tracker collects the number of `connect`, `announce` and `scrape`
//! requests handled, for each frontend (UDP or HTTP) and for each IP
//! version used by the peers.
//!
//! The data is collected with an `event-sender -> event listener` model:
//! request handlers send an [`Event`] through an [`EventSender`], and the
//! [`Keeper`]'s listener task folds the events into the [`Repo`].
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use tokio::sync::mpsc::error::SendError;
use tokio::sync::{mpsc, RwLock, RwLockReadGuard};
use tracing::debug;

const CHANNEL_BUFFER_SIZE: usize = 65_535;

/// A statistics event.
///
/// - The `Tcp` prefix means the event was triggered by the HTTP tracker.
/// - The `Udp` prefix means the event was triggered by the UDP tracker.
/// - `4` or `6` is the IP version used by the peer.
#[derive(Debug, PartialEq, Eq)]
pub enum Event {
    Tcp4Announce,
    Tcp4Scrape,
    Tcp6Announce,
    Tcp6Scrape,
    Udp4Connect,
    Udp4Announce,
    Udp4Scrape,
    Udp6Connect,
    Udp6Announce,
    Udp6Scrape,
    /// Wall time spent handling one UDP request, recorded when request
    /// timing is enabled on the frontend.
    UdpRequestDuration(Duration),
}

/// Metrics collected by the tracker, per frontend and IP version.
#[derive(Debug, PartialEq, Eq, Default)]
pub struct Metrics {
    pub tcp4_announces_handled: u64,
    pub tcp4_scrapes_handled: u64,
    pub tcp6_announces_handled: u64,
    pub tcp6_scrapes_handled: u64,
    pub udp4_connections_handled: u64,
    pub udp4_announces_handled: u64,
    pub udp4_scrapes_handled: u64,
    pub udp6_connections_handled: u64,
    pub udp6_announces_handled: u64,
    pub udp6_scrapes_handled: u64,
    /// Number of UDP requests with a recorded duration.
    pub udp_requests_timed: u64,
    /// Sum of the recorded UDP request durations.
    pub udp_request_duration_total: Duration,
}

impl Metrics {
    /// Mean handling time of the timed UDP requests.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn udp_request_duration_avg(&self) -> Option<Duration> {
        (self.udp_requests_timed > 0)
            .then(|| self.udp_request_duration_total.div_f64(self.udp_requests_timed as f64))
    }
}

/// The service responsible for keeping tracker metrics: it listens to
/// statistics events and folds them into the repository.
pub struct Keeper {
    pub repository: Repo,
}

impl Default for Keeper {
    fn default() -> Self {
        Self::new()
    }
}

impl Keeper {
    #[must_use]
    pub fn new() -> Self {
        Self { repository: Repo::new() }
    }

    #[must_use]
    pub fn new_active_instance() -> (Box<dyn EventSender>, Repo) {
        let mut keeper = Self::new();

        let event_sender = keeper.run_event_listener();

        (event_sender, keeper.repository)
    }

    pub fn run_event_listener(&mut self) -> Box<dyn EventSender> {
        let (sender, receiver) = mpsc::channel::<Event>(CHANNEL_BUFFER_SIZE);

        let repository = self.repository.clone();

        tokio::spawn(async move { event_listener(receiver, repository).await });

        Box::new(Sender { sender })
    }
}

async fn event_listener(mut receiver: mpsc::Receiver<Event>, repository: Repo) {
    while let Some(event) = receiver.recv().await {
        event_handler(event, &repository).await;
    }
}

async fn event_handler(event: Event, repository: &Repo) {
    let mut metrics = repository.stats.write().await;

    match event {
        Event::Tcp4Announce => metrics.tcp4_announces_handled += 1,
        Event::Tcp4Scrape => metrics.tcp4_scrapes_handled += 1,
        Event::Tcp6Announce => metrics.tcp6_announces_handled += 1,
        Event::Tcp6Scrape => metrics.tcp6_scrapes_handled += 1,
        Event::Udp4Connect => metrics.udp4_connections_handled += 1,
        Event::Udp4Announce => metrics.udp4_announces_handled += 1,
        Event::Udp4Scrape => metrics.udp4_scrapes_handled += 1,
        Event::Udp6Connect => metrics.udp6_connections_handled += 1,
        Event::Udp6Announce => metrics.udp6_announces_handled += 1,
        Event::Udp6Scrape => metrics.udp6_scrapes_handled += 1,
        Event::UdpRequestDuration(duration) => {
            metrics.udp_requests_timed += 1;
            metrics.udp_request_duration_total += duration;
        }
    }

    drop(metrics);

    debug!("stats: {:?}", repository.get_stats().await);
}

/// A trait to allow sending statistics events.
#[async_trait]
#[cfg_attr(test, automock)]
pub trait EventSender: Sync + Send {
    async fn send_event(&self, event: Event) -> Option<Result<(), SendError<Event>>>;
}

/// The production [`EventSender`]: a channel into the keeper's listener
/// task.
pub struct Sender {
    sender: mpsc::Sender<Event>,
}

#[async_trait]
impl EventSender for Sender {
    async fn send_event(&self, event: Event) -> Option<Result<(), SendError<Event>>> {
        Some(self.sender.send(event).await)
    }
}

/// A repository for the tracker metrics.
#[derive(Clone)]
pub struct Repo {
    pub stats: Arc<RwLock<Metrics>>,
}

impl Default for Repo {
    fn default() -> Self {
        Self::new()
    }
}

impl Repo {
    #[must_use]
    pub fn new() -> Self {
        Self {
            stats: Arc::new(RwLock::new(Metrics::default())),
        }
    }

    pub async fn get_stats(&self) -> RwLockReadGuard<'_, Metrics> {
        self.stats.read().await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{event_handler, Event, Keeper, Metrics, Repo};

    #[tokio::test]
    async fn should_contain_zeroed_statistics_after_construction() {
        let keeper = Keeper::new();

        let stats = keeper.repository.get_stats().await;

        assert_eq!(*stats, Metrics::default());
    }

    #[tokio::test]
    async fn should_create_an_event_sender_to_send_statistical_events() {
        let mut keeper = Keeper::new();

        let event_sender = keeper.run_event_listener();

        let result = event_sender.send_event(Event::Udp4Connect).await;

        assert!(result.is_some());
    }

    #[tokio::test]
    async fn should_increase_the_matching_counter_when_it_receives_an_event() {
        let repository = Repo::new();

        event_handler(Event::Udp4Announce, &repository).await;
        event_handler(Event::Udp4Announce, &repository).await;
        event_handler(Event::Udp6Scrape, &repository).await;
        event_handler(Event::Tcp4Announce, &repository).await;

        let stats = repository.get_stats().await;

        assert_eq!(stats.udp4_announces_handled, 2);
        assert_eq!(stats.udp6_scrapes_handled, 1);
        assert_eq!(stats.tcp4_announces_handled, 1);
        assert_eq!(stats.udp4_scrapes_handled, 0);
    }

    #[tokio::test]
    async fn should_accumulate_request_durations_and_derive_the_average() {
        let repository = Repo::new();

        event_handler(Event::UdpRequestDuration(Duration::from_millis(2)), &repository).await;
        event_handler(Event::UdpRequestDuration(Duration::from_millis(4)), &repository).await;

        let stats = repository.get_stats().await;

        assert_eq!(stats.udp_requests_timed, 2);
        assert_eq!(stats.udp_request_duration_avg(), Some(Duration::from_millis(3)));
    }
}
