//! Sets up the application logging.
//!
//! Everything logs through `tracing`; the subscriber writes to stdout
//! with the threshold taken from the `[logging]` configuration section.
use std::str::FromStr;
use std::sync::Once;

use tracing::level_filters::LevelFilter;

static INIT: Once = Once::new();

pub fn setup(threshold: &str) {
    let level = LevelFilter::from_str(threshold).unwrap_or(LevelFilter::INFO);

    if level == LevelFilter::OFF {
        return;
    }

    INIT.call_once(|| {
        tracing_subscriber::fmt().with_max_level(level).init();
    });

    tracing::info!("logging initialized");
}
