//! The UDP server: socket lifecycle and per-worker receive loops.
//!
//! A server runs `workers` parallel receive loops, each on its own socket
//! (bound with `SO_REUSEPORT` when there is more than one). A receive
//! loop never blocks on downstream work: every datagram is handed to a
//! short-lived handler task together with a pooled buffer.
//!
//! Shutdown closes the halt signal, which stops the receive loops; each
//! worker then waits for its in-flight handler tasks before exiting, so a
//! response that is being written still goes out.
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};

use self::bound_socket::BoundSocket;
use self::buffer_pool::{Buffer, BufferPool};
use self::processor::Processor;
use super::{UdpTracker, UDP_TRACKER_LOG_TARGET};

pub mod bound_socket;
pub mod buffer_pool;
pub mod processor;

/// Receive buffer size. No tracker datagram comes close to this.
pub const MAX_PACKET_SIZE: usize = 2048;

/// A datagram as it came off the socket, still in its pooled buffer.
pub struct RawRequest {
    pub buffer: Buffer,
    pub len: usize,
    pub from: SocketAddr,
}

impl RawRequest {
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.buffer[..self.len]
    }
}

/// A UDP server instance controller with no instance running.
#[allow(clippy::module_name_repetitions)]
pub type StoppedUdpServer = Server<Stopped>;

/// A UDP server instance controller with a running instance.
#[allow(clippy::module_name_repetitions)]
pub type RunningUdpServer = Server<Running>;

pub struct Server<S> {
    pub state: S,
}

/// A stopped UDP server state.
pub struct Stopped {
    bind_to: SocketAddr,
    workers: usize,
}

/// A running UDP server state.
pub struct Running {
    binding: SocketAddr,
    halt: watch::Sender<bool>,
    workers: Vec<JoinHandle<()>>,
}

impl Server<Stopped> {
    #[must_use]
    pub fn new(bind_to: SocketAddr, workers: usize) -> Self {
        Self {
            state: Stopped {
                bind_to,
                workers: workers.max(1),
            },
        }
    }

    /// It starts the receive loops and returns the running controller.
    ///
    /// # Errors
    ///
    /// Will return an error if the sockets can't be bound.
    pub fn start(self, tracker: Arc<UdpTracker>) -> Result<Server<Running>, std::io::Error> {
        let workers = self.state.workers;
        let reuse_port = workers > 1;

        let first = BoundSocket::new(self.state.bind_to, reuse_port)?;
        let binding = first.address();

        let mut sockets = vec![first];
        for _ in 1..workers {
            // Workers after the first bind the concrete address, so an
            // ephemeral port 0 resolves once.
            sockets.push(BoundSocket::new(binding, true)?);
        }

        let (halt, _) = watch::channel(false);

        let workers = sockets
            .into_iter()
            .map(|socket| {
                let socket = Arc::new(socket);
                let pool = Arc::new(BufferPool::new());
                let tracker = tracker.clone();
                let halt = halt.subscribe();
                tokio::spawn(run_worker(socket, tracker, pool, halt))
            })
            .collect();

        tracing::info!(target: UDP_TRACKER_LOG_TARGET, %binding, "started");

        Ok(Server {
            state: Running { binding, halt, workers },
        })
    }
}

impl Server<Running> {
    /// The address the server is bound to.
    #[must_use]
    pub fn binding(&self) -> SocketAddr {
        self.state.binding
    }

    /// It stops the receive loops and waits for the in-flight handlers.
    pub async fn stop(self) {
        drop(self.state.halt.send(true));

        for worker in self.state.workers {
            drop(worker.await);
        }

        tracing::info!(target: UDP_TRACKER_LOG_TARGET, binding = %self.state.binding, "stopped");
    }
}

async fn run_worker(
    socket: Arc<BoundSocket>,
    tracker: Arc<UdpTracker>,
    pool: Arc<BufferPool>,
    mut halt: watch::Receiver<bool>,
) {
    let mut handlers = JoinSet::new();

    loop {
        let mut buffer = pool.acquire();

        tokio::select! {
            _ = halt.changed() => {
                pool.release(buffer);
                break;
            }
            result = socket.recv_from(&mut buffer[..]) => match result {
                Ok((len, from)) => {
                    if len == 0 {
                        pool.release(buffer);
                        continue;
                    }

                    let processor = Processor::new(socket.clone(), tracker.clone(), pool.clone());
                    handlers.spawn(processor.process_request(RawRequest { buffer, len, from }));

                    // Reap whatever already finished; never blocks.
                    while handlers.try_join_next().is_some() {}
                }
                Err(err) if is_transient(&err) => {
                    pool.release(buffer);
                }
                Err(err) => {
                    pool.release(buffer);
                    tracing::error!(target: UDP_TRACKER_LOG_TARGET, %err, "receive loop failed");
                    break;
                }
            }
        }
    }

    // In-flight responses still go out; shutdown waits for them here.
    while handlers.join_next().await.is_some() {}
}

fn is_transient(err: &std::io::Error) -> bool {
    matches!(
        err.kind(),
        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut | std::io::ErrorKind::Interrupted
    )
}
