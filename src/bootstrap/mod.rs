//! Application startup: logging and the jobs that run the configured
//! services.
pub mod jobs;
pub mod logging;
