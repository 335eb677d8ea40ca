use clap::Parser;
use swarm_tracker::{app, bootstrap};
use swarm_tracker_configuration::{Configuration, UdpTracker};

#[derive(Parser, Debug)]
#[command(author, version, about = "A BitTorrent tracker over UDP and HTTP")]
struct Args {
    /// Path to the configuration file. Without one, a single UDP tracker
    /// on the default port is started.
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Configuration::load_from_file(path)?,
        None => Configuration {
            udp_trackers: vec![UdpTracker::default()],
            ..Default::default()
        },
    };

    bootstrap::logging::setup(&config.logging.threshold);

    let app = app::start(&config).await?;

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");

    app.stop().await;

    Ok(())
}
