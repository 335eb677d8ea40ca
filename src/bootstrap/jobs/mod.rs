//! Jobs that start the configured services.
//!
//! Each job builds the per-frontend state and launches the matching
//! server, returning its running controller so the application can stop
//! it on shutdown.
pub mod http_tracker;
pub mod udp_tracker;
