//! Scrape every configured endpoint and fold the results into the cache.
//!
//! A collection cycle fetches all endpoints concurrently, one task per
//! endpoint. Each task parses its body into measurements and hands them to a
//! single merge loop, the only writer to the [`SeriesCache`]. A failed
//! endpoint contributes nothing to the cycle and never aborts it.
//!
//! ## Metrics
//!
//! `<namespace>_last_scrape_duration_seconds`: Wall-clock time of the last cycle
//! `<namespace>_exporter_scrapes_total`: Cycles run since start-up
//!

use std::{sync::Arc, time::Instant};

use metrics::{counter, gauge};
use reqwest::header::CONTENT_TYPE;
use tokio::{
    sync::{Mutex, mpsc},
    task::JoinSet,
};
use tracing::{debug, error, trace, warn};
use url::Url;

use crate::{
    cache::SeriesCache,
    config::{self, Config, Endpoint},
    measurement::Measurement,
    normalize::normalize,
    scraper::{self, Format, plus, stub_status},
};

#[derive(thiserror::Error, Debug)]
/// Errors produced while scraping a single endpoint
pub enum Error {
    /// The request could not be made or the body not read.
    #[error("error making HTTP request to '{url}': {source}")]
    Http {
        /// Endpoint URL
        url: Url,
        /// Underlying client error
        #[source]
        source: reqwest::Error,
    },
    /// The endpoint answered with a non-success status.
    #[error("{url} returned HTTP status {status}")]
    Status {
        /// Endpoint URL
        url: Url,
        /// Status returned
        status: reqwest::StatusCode,
    },
    /// The endpoint served a content type its format does not allow.
    #[error("{url} returned unsupported content type '{content_type}'")]
    ContentType {
        /// Endpoint URL
        url: Url,
        /// Content type returned, without parameters
        content_type: String,
    },
    /// The body could not be parsed.
    #[error("{url}: {source}")]
    Scrape {
        /// Endpoint URL
        url: Url,
        /// Underlying parse error
        #[source]
        source: scraper::Error,
    },
}

/// Errors produced while building a [`Collector`]
#[derive(thiserror::Error, Debug)]
pub enum BuildError {
    /// See [`crate::config::Error`] for details.
    #[error(transparent)]
    Config(#[from] config::Error),
    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// The state of the cache after a collection cycle.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Prefix of every metric name, meta-measurements included.
    pub namespace: String,
    /// Every series observed since start-up.
    pub cache: SeriesCache,
    /// Wall-clock duration of the cycle, in seconds.
    pub last_scrape_duration_seconds: f64,
    /// Cycles run since start-up.
    pub scrapes_total: u64,
}

impl Snapshot {
    /// Publish this snapshot through the installed [`metrics`] recorder.
    ///
    /// Every series becomes a gauge family and every sample one gauge.
    pub fn expose(&self) {
        let ns = &self.namespace;
        gauge!(format!("{ns}_last_scrape_duration_seconds"))
            .set(self.last_scrape_duration_seconds);
        counter!(format!("{ns}_exporter_scrapes_total")).absolute(self.scrapes_total);

        for (name, series) in self.cache.iter() {
            for sample in series.samples() {
                let labels: Vec<(String, String)> = sample
                    .labels
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                gauge!(name.to_string(), &labels).set(sample.value);
            }
        }
    }
}

#[derive(Debug, Default)]
struct State {
    cache: SeriesCache,
    scrapes_total: u64,
    last_scrape_duration_seconds: f64,
}

/// The measurement collector.
#[derive(Debug)]
pub struct Collector {
    namespace: String,
    endpoints: Vec<Arc<Endpoint>>,
    client: reqwest::Client,
    state: Mutex<State>,
}

impl Collector {
    /// Create a new [`Collector`] over `endpoints`.
    #[must_use]
    pub fn new(namespace: String, endpoints: Vec<Endpoint>, client: reqwest::Client) -> Self {
        Self {
            namespace,
            endpoints: endpoints.into_iter().map(Arc::new).collect(),
            client,
            state: Mutex::new(State::default()),
        }
    }

    /// Create a new [`Collector`] from `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoints are invalid or the HTTP client cannot
    /// be built.
    pub fn from_config(config: &Config) -> Result<Self, BuildError> {
        let endpoints = config.endpoints()?;
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self::new(config.namespace.clone(), endpoints, client))
    }

    /// Run one collection cycle and return the resulting snapshot.
    ///
    /// Overlapping calls are serialized; a call waits for any cycle already in
    /// flight before starting its own.
    pub async fn collect(&self) -> Snapshot {
        let mut state = self.state.lock().await;
        let start = Instant::now();
        state.scrapes_total += 1;

        let (tx, mut rx) = mpsc::channel::<Vec<Measurement>>(self.endpoints.len().max(1));
        let mut join_set = JoinSet::new();
        for endpoint in &self.endpoints {
            let endpoint = Arc::clone(endpoint);
            let client = self.client.clone();
            let tx = tx.clone();
            join_set.spawn(async move {
                let mut out = Vec::new();
                if let Err(e) = scrape_endpoint(&client, &endpoint, &mut out).await {
                    warn!("{e}");
                }
                if !out.is_empty() && tx.send(out).await.is_err() {
                    error!("merge loop stopped before {} was merged", endpoint.url);
                }
            });
        }
        drop(tx);

        while let Some(batch) = rx.recv().await {
            merge(&mut state.cache, &self.namespace, batch);
        }
        while let Some(res) = join_set.join_next().await {
            if let Err(e) = res {
                error!("scrape task failed: {e}");
            }
        }

        state.last_scrape_duration_seconds = start.elapsed().as_secs_f64();
        debug!(
            duration_seconds = state.last_scrape_duration_seconds,
            series = state.cache.len(),
            "collection cycle complete"
        );

        Snapshot {
            namespace: self.namespace.clone(),
            cache: state.cache.clone(),
            last_scrape_duration_seconds: state.last_scrape_duration_seconds,
            scrapes_total: state.scrapes_total,
        }
    }
}

/// Fetch one endpoint and parse its body into `out`.
///
/// On a parse error `out` keeps whatever the parser emitted before failing.
async fn scrape_endpoint(
    client: &reqwest::Client,
    endpoint: &Endpoint,
    out: &mut Vec<Measurement>,
) -> Result<(), Error> {
    let url = &endpoint.url;
    let http_err = |source| Error::Http {
        url: url.clone(),
        source,
    };

    let resp = client.get(url.clone()).send().await.map_err(http_err)?;
    let status = resp.status();
    if !status.is_success() {
        return Err(Error::Status {
            url: url.clone(),
            status,
        });
    }

    if let Some(expected) = endpoint.format.expected_content_type() {
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .unwrap_or_default()
            .trim()
            .to_string();
        if content_type != expected {
            return Err(Error::ContentType {
                url: url.clone(),
                content_type,
            });
        }
    }

    let body = resp.bytes().await.map_err(http_err)?;
    trace!("fetched {} bytes from {url}", body.len());

    let res = match endpoint.format {
        Format::StubStatus => stub_status::scrape(&body[..], &endpoint.labels, out)
            .map_err(scraper::Error::from),
        Format::Plus => plus::scrape(&body[..], &endpoint.labels, &endpoint.exclude, out)
            .map_err(scraper::Error::from),
    };
    res.map_err(|source| Error::Scrape {
        url: url.clone(),
        source,
    })
}

/// Normalize `batch` into `cache`. Measurements that fail to normalize are
/// logged and dropped.
fn merge(cache: &mut SeriesCache, namespace: &str, batch: Vec<Measurement>) {
    for measurement in batch {
        match normalize(&measurement.value) {
            Ok(value) => {
                let name = format!("{namespace}_{}", measurement.name);
                cache.set(name, measurement.labels, value);
            }
            Err(e) => {
                error!("convert error for metric '{}': {e}", measurement.name);
            }
        }
    }
}
