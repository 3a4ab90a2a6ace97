//! Exporter configuration.
//!
//! A YAML file supplies the listener, the status URLs to scrape and the HTTP
//! client timeouts. Every problem found here is returned to the caller, and
//! [`Config::endpoints`] turns the URL lists into labeled [`Endpoint`]s.
use std::{
    fs, io,
    net::SocketAddr,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use serde::Deserialize;
use url::{Host, Url};

use crate::{
    measurement::Labels,
    scraper::{Format, plus::PeerFilter},
};

/// Errors produced by [`Config`]
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Error for a serde [`serde_yaml`].
    #[error("Failed to deserialize yaml: {0}")]
    SerdeYaml(#[from] serde_yaml::Error),
    /// Error reading config file
    #[error("Failed to read config file {path:?}: {source}")]
    ReadFile {
        /// File path
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: Box<io::Error>,
    },
    /// A status URL could not be parsed.
    #[error("unable to parse address '{url}': {source}")]
    InvalidUrl {
        /// The offending URL
        url: String,
        /// Underlying parse error
        #[source]
        source: url::ParseError,
    },
    /// A status URL has no host to label its measurements with.
    #[error("address '{0}' has no host")]
    MissingHost(String),
    /// Neither kind of status URL was configured.
    #[error("no nginx or nginx plus stats url specified")]
    NoEndpoints,
}

fn default_namespace() -> String {
    "nginx".to_string()
}

fn default_listen_address() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 9001))
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

fn default_connect_timeout_milliseconds() -> u64 {
    3_000
}

fn default_request_timeout_milliseconds() -> u64 {
    4_000
}

/// Main configuration struct for this program
#[derive(Debug, Deserialize, PartialEq, Eq, Clone)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Prefix of every exported metric name
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// Address on which to expose metrics
    #[serde(default = "default_listen_address")]
    pub listen_address: SocketAddr,
    /// Path under which to expose metrics
    #[serde(default = "default_metrics_path")]
    pub metrics_path: String,
    /// nginx `stub_status` URLs to scrape
    #[serde(default)]
    pub stub_status_urls: Vec<String>,
    /// nginx plus status URLs to scrape
    #[serde(default)]
    pub plus_status_urls: Vec<String>,
    /// Upstream peer addresses to leave out of nginx plus scrapes
    #[serde(default)]
    pub exclude_upstream_peers: Vec<String>,
    /// Time allowed to establish a connection to a status endpoint
    #[serde(default = "default_connect_timeout_milliseconds")]
    pub connect_timeout_milliseconds: u64,
    /// Time allowed for a whole status request
    #[serde(default = "default_request_timeout_milliseconds")]
    pub request_timeout_milliseconds: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            listen_address: default_listen_address(),
            metrics_path: default_metrics_path(),
            stub_status_urls: Vec::new(),
            plus_status_urls: Vec::new(),
            exclude_upstream_peers: Vec::new(),
            connect_timeout_milliseconds: default_connect_timeout_milliseconds(),
            request_timeout_milliseconds: default_request_timeout_milliseconds(),
        }
    }
}

impl Config {
    /// Read a [`Config`] from the YAML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a valid
    /// configuration.
    pub fn from_path(path: &Path) -> Result<Self, Error> {
        let contents = fs::read_to_string(path).map_err(|source| Error::ReadFile {
            path: path.to_path_buf(),
            source: Box::new(source),
        })?;
        Ok(serde_yaml::from_str(&contents)?)
    }

    /// Connect timeout as a [`Duration`].
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_milliseconds)
    }

    /// Request timeout as a [`Duration`].
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_milliseconds)
    }

    /// Build the endpoint list, `stub_status` URLs first.
    ///
    /// # Errors
    ///
    /// Returns an error if any URL is invalid or no URL is configured at all.
    pub fn endpoints(&self) -> Result<Vec<Endpoint>, Error> {
        if self.stub_status_urls.is_empty() && self.plus_status_urls.is_empty() {
            return Err(Error::NoEndpoints);
        }

        let exclude: Arc<PeerFilter> =
            Arc::new(self.exclude_upstream_peers.iter().cloned().collect());

        let stub = self
            .stub_status_urls
            .iter()
            .map(|url| Endpoint::new(url, Format::StubStatus, Arc::default()));
        let plus = self
            .plus_status_urls
            .iter()
            .map(|url| Endpoint::new(url, Format::Plus, Arc::clone(&exclude)));
        stub.chain(plus).collect()
    }
}

/// A status endpoint to scrape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Where the report is served.
    pub url: Url,
    /// Which report format the endpoint serves.
    pub format: Format,
    /// Base labels identifying this endpoint.
    pub labels: Labels,
    /// Upstream peers to skip when walking this endpoint's report.
    pub exclude: Arc<PeerFilter>,
}

impl Endpoint {
    /// Create a new [`Endpoint`], labeling it with the URL's host and port.
    ///
    /// # Errors
    ///
    /// Returns an error if `url` does not parse or has no host.
    pub fn new(url: &str, format: Format, exclude: Arc<PeerFilter>) -> Result<Self, Error> {
        let parsed = Url::parse(url).map_err(|source| Error::InvalidUrl {
            url: url.to_string(),
            source,
        })?;
        // IPv6 literals are labeled without their brackets
        let host = match parsed.host() {
            Some(Host::Domain(domain)) => domain.to_string(),
            Some(Host::Ipv4(addr)) => addr.to_string(),
            Some(Host::Ipv6(addr)) => addr.to_string(),
            None => return Err(Error::MissingHost(url.to_string())),
        };
        let port = parsed
            .port_or_known_default()
            .map(|p| p.to_string())
            .unwrap_or_default();

        let mut labels = Labels::new();
        labels.insert("server".to_string(), host);
        labels.insert("port".to_string(), port);

        Ok(Self {
            url: parsed,
            format,
            labels,
            exclude,
        })
    }
}
