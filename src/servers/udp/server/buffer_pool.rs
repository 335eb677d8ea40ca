//! A pool of reusable receive buffers.
//!
//! Buffers are zeroed when they come back, so a short datagram can never
//! observe bytes of a previous request through a stale buffer tail.
use std::sync::Mutex;

use crate::servers::udp::server::MAX_PACKET_SIZE;

pub type Buffer = Box<[u8; MAX_PACKET_SIZE]>;

#[derive(Default)]
pub struct BufferPool {
    buffers: Mutex<Vec<Buffer>>,
}

impl BufferPool {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a zeroed buffer, allocating when the pool is dry.
    #[must_use]
    pub fn acquire(&self) -> Buffer {
        self.buffers
            .lock()
            .expect("buffer pool lock poisoned")
            .pop()
            .unwrap_or_else(|| Box::new([0u8; MAX_PACKET_SIZE]))
    }

    /// Zeroes the buffer and puts it back.
    pub fn release(&self, mut buffer: Buffer) {
        buffer.fill(0);
        self.buffers.lock().expect("buffer pool lock poisoned").push(buffer);
    }
}
