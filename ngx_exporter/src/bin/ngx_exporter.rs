use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use clap::Parser;
use jemallocator::Jemalloc;
use metrics_exporter_prometheus::PrometheusBuilder;
use ngx_exporter::{
    collector::{self, Collector},
    config::{self, Config},
    httpd,
};
use tokio::{runtime::Builder, signal};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, util::SubscriberInitExt};

#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

#[derive(thiserror::Error, Debug)]
enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("Configuration error: {0}")]
    Config(#[from] config::Error),
    #[error("Unable to build collector: {0}")]
    Collector(#[from] collector::BuildError),
    #[error("Exposition listener failed: {0}")]
    Httpd(#[from] httpd::Error),
}

#[derive(Parser, Debug)]
#[clap(version, about, long_about = None)]
struct Cli {
    /// path on disk to the configuration file, optional when status URLs are
    /// given on the command line
    #[clap(long)]
    config_path: Option<PathBuf>,
    /// nginx `stub_status` URL to scrape, may be repeated
    #[clap(long)]
    stub_status_url: Vec<String>,
    /// nginx plus status URL to scrape, may be repeated
    #[clap(long)]
    plus_status_url: Vec<String>,
    /// upstream peer address to leave out of nginx plus scrapes, may be
    /// repeated
    #[clap(long)]
    exclude_upstream_peer: Vec<String>,
    /// prefix of every exported metric name
    #[clap(long)]
    namespace: Option<String>,
    /// address on which to expose metrics
    #[clap(long)]
    listen_address: Option<SocketAddr>,
    /// path under which to expose metrics
    #[clap(long)]
    metrics_path: Option<String>,
}

fn get_config(cli: Cli) -> Result<Config, Error> {
    let mut config = match cli.config_path {
        Some(ref path) => Config::from_path(path).map_err(|err| {
            error!("Could not load config file {}: {err}", path.display());
            err
        })?,
        None => Config::default(),
    };

    config.stub_status_urls.extend(cli.stub_status_url);
    config.plus_status_urls.extend(cli.plus_status_url);
    config
        .exclude_upstream_peers
        .extend(cli.exclude_upstream_peer);
    if let Some(namespace) = cli.namespace {
        config.namespace = namespace;
    }
    if let Some(addr) = cli.listen_address {
        config.listen_address = addr;
    }
    if let Some(path) = cli.metrics_path {
        config.metrics_path = path;
    }
    Ok(config)
}

async fn inner_main(config: Config) -> Result<(), Error> {
    let collector = Arc::new(Collector::from_config(&config)?);
    let recorder = Arc::new(PrometheusBuilder::new().build_recorder());

    httpd::run(
        config.listen_address,
        config.metrics_path,
        collector,
        recorder,
        async {
            if let Err(e) = signal::ctrl_c().await {
                error!("Unable to listen for shutdown signal: {e}");
            }
        },
    )
    .await?;
    Ok(())
}

fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_ansi(false)
        .finish()
        .init();

    let version = env!("CARGO_PKG_VERSION");
    info!("Starting ngx-exporter {version}.");

    let config = get_config(Cli::parse())?;

    let runtime = Builder::new_multi_thread()
        .enable_io()
        .enable_time()
        .build()?;
    let res = runtime.block_on(inner_main(config));
    info!("Bye. :)");
    res
}
