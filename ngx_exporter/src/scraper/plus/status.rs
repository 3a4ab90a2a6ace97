//! The nginx plus status document.
//!
//! One flat model covers every historical version of the
//! `ngx_http_status_module` report. Fields that were added or removed
//! between versions are `Option`; the version a field appeared in is noted
//! alongside it. Missing or `null` non-optional fields decode to their
//! default, unknown fields are ignored.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer};

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Root of the status document.
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Status {
    /// Version of the document format.
    #[serde(deserialize_with = "null_as_default")]
    pub version: u32,
    /// Version of nginx.
    #[serde(deserialize_with = "null_as_default")]
    pub nginx_version: String,
    /// Address of the server that accepted the status request.
    #[serde(deserialize_with = "null_as_default")]
    pub address: String,
    /// Number of configuration reloads. Added in version 5.
    pub generation: Option<u64>,
    /// Time of the last configuration reload, in milliseconds. Added in
    /// version 2.
    pub load_timestamp: Option<u64>,
    /// Current time in milliseconds since the epoch.
    #[serde(deserialize_with = "null_as_default")]
    pub timestamp: u64,
    /// Process id of the worker that handled the status request. Added in
    /// version 6.
    pub pid: Option<u64>,
    /// Child process counters.
    pub processes: Option<Processes>,
    /// Client connection counters.
    #[serde(deserialize_with = "null_as_default")]
    pub connections: Connections,
    /// SSL counters. Added in version 6.
    pub ssl: Option<Ssl>,
    /// Client request counters.
    #[serde(deserialize_with = "null_as_default")]
    pub requests: Requests,
    /// Status zones, keyed by zone name. Added in version 2.
    #[serde(deserialize_with = "null_as_default")]
    pub server_zones: BTreeMap<String, ServerZone>,
    /// Upstream groups, keyed by upstream name.
    #[serde(deserialize_with = "null_as_default")]
    pub upstreams: BTreeMap<String, Upstream>,
    /// Caches, keyed by cache name. Added in version 2.
    #[serde(deserialize_with = "null_as_default")]
    pub caches: BTreeMap<String, Cache>,
    /// TCP/UDP proxy state.
    #[serde(deserialize_with = "null_as_default")]
    pub stream: Stream,
}

/// Child process counters.
#[derive(Debug, Default, Clone, Copy, Deserialize, PartialEq)]
#[serde(default)]
pub struct Processes {
    /// Number of abnormally terminated and respawned children. Added in
    /// version 5.
    pub respawned: Option<u64>,
}

/// Client connection counters.
#[derive(Debug, Default, Clone, Copy, Deserialize, PartialEq)]
#[serde(default)]
pub struct Connections {
    /// Accepted client connections.
    #[serde(deserialize_with = "null_as_default")]
    pub accepted: u64,
    /// Dropped client connections.
    #[serde(deserialize_with = "null_as_default")]
    pub dropped: u64,
    /// Current active client connections.
    #[serde(deserialize_with = "null_as_default")]
    pub active: u64,
    /// Current idle client connections.
    #[serde(deserialize_with = "null_as_default")]
    pub idle: u64,
}

/// SSL handshake counters.
#[derive(Debug, Default, Clone, Copy, Deserialize, PartialEq)]
#[serde(default)]
pub struct Ssl {
    /// Successful handshakes.
    #[serde(deserialize_with = "null_as_default")]
    pub handshakes: u64,
    /// Failed handshakes.
    #[serde(deserialize_with = "null_as_default")]
    pub handshakes_failed: u64,
    /// Session reuses during handshake.
    #[serde(deserialize_with = "null_as_default")]
    pub session_reuses: u64,
}

/// Client request counters.
#[derive(Debug, Default, Clone, Copy, Deserialize, PartialEq)]
#[serde(default)]
pub struct Requests {
    /// Total client requests.
    #[serde(deserialize_with = "null_as_default")]
    pub total: u64,
    /// Current client requests.
    #[serde(deserialize_with = "null_as_default")]
    pub current: u64,
}

/// Response counts by status class.
#[derive(Debug, Default, Clone, Copy, Deserialize, PartialEq)]
#[serde(default)]
pub struct Responses {
    /// `1xx` responses.
    #[serde(rename = "1xx")]
    #[serde(deserialize_with = "null_as_default")]
    pub responses_1xx: u64,
    /// `2xx` responses.
    #[serde(rename = "2xx")]
    #[serde(deserialize_with = "null_as_default")]
    pub responses_2xx: u64,
    /// `3xx` responses.
    #[serde(rename = "3xx")]
    #[serde(deserialize_with = "null_as_default")]
    pub responses_3xx: u64,
    /// `4xx` responses.
    #[serde(rename = "4xx")]
    #[serde(deserialize_with = "null_as_default")]
    pub responses_4xx: u64,
    /// `5xx` responses.
    #[serde(rename = "5xx")]
    #[serde(deserialize_with = "null_as_default")]
    pub responses_5xx: u64,
    /// All responses.
    #[serde(deserialize_with = "null_as_default")]
    pub total: u64,
}

/// An HTTP status zone.
#[derive(Debug, Default, Clone, Copy, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerZone {
    /// Requests being processed.
    #[serde(deserialize_with = "null_as_default")]
    pub processing: u64,
    /// Requests received from clients.
    #[serde(deserialize_with = "null_as_default")]
    pub requests: u64,
    /// Responses sent to clients.
    #[serde(deserialize_with = "null_as_default")]
    pub responses: Responses,
    /// Requests completed without sending a response. Added in version 6.
    pub discarded: Option<u64>,
    /// Bytes received from clients.
    #[serde(deserialize_with = "null_as_default")]
    pub received: u64,
    /// Bytes sent to clients.
    #[serde(deserialize_with = "null_as_default")]
    pub sent: u64,
}

/// An HTTP upstream group.
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Upstream {
    /// Servers in the group.
    #[serde(deserialize_with = "null_as_default")]
    pub peers: Vec<Peer>,
    /// Idle keepalive connections.
    #[serde(deserialize_with = "null_as_default")]
    pub keepalive: u64,
    /// Servers removed from the group but still processing requests. Added
    /// in version 6.
    #[serde(deserialize_with = "null_as_default")]
    pub zombies: u64,
    /// Request queue. Added in version 6.
    pub queue: Option<Queue>,
}

/// Upstream request queue.
#[derive(Debug, Default, Clone, Copy, Deserialize, PartialEq)]
#[serde(default)]
pub struct Queue {
    /// Requests in the queue.
    #[serde(deserialize_with = "null_as_default")]
    pub size: u64,
    /// Maximum queue size.
    #[serde(deserialize_with = "null_as_default")]
    pub max_size: u64,
    /// Requests rejected due to queue overflow.
    #[serde(deserialize_with = "null_as_default")]
    pub overflows: u64,
}

/// Health check counters for an upstream server.
#[derive(Debug, Default, Clone, Copy, Deserialize, PartialEq)]
#[serde(default)]
pub struct HealthChecks {
    /// Health check requests made.
    #[serde(deserialize_with = "null_as_default")]
    pub checks: u64,
    /// Failed health checks.
    #[serde(deserialize_with = "null_as_default")]
    pub fails: u64,
    /// Times the server became unhealthy.
    #[serde(deserialize_with = "null_as_default")]
    pub unhealthy: u64,
    /// Whether the last health check passed.
    pub last_passed: Option<bool>,
}

/// A server in an HTTP upstream group.
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Peer {
    /// Server id. Added in version 3.
    pub id: Option<u64>,
    /// Server address.
    #[serde(deserialize_with = "null_as_default")]
    pub server: String,
    /// Whether the server is a backup server.
    #[serde(deserialize_with = "null_as_default")]
    pub backup: bool,
    /// Server weight.
    #[serde(deserialize_with = "null_as_default")]
    pub weight: u64,
    /// One of `up`, `draining`, `down`, `unavail`, `checking`, `unhealthy`.
    #[serde(deserialize_with = "null_as_default")]
    pub state: String,
    /// Current active connections.
    #[serde(deserialize_with = "null_as_default")]
    pub active: u64,
    /// Idle keepalive connections. Removed in version 5.
    pub keepalive: Option<u64>,
    /// Connection limit. Added in version 3.
    pub max_conns: Option<u64>,
    /// Client requests forwarded to the server.
    #[serde(deserialize_with = "null_as_default")]
    pub requests: u64,
    /// Responses obtained from the server.
    #[serde(deserialize_with = "null_as_default")]
    pub responses: Responses,
    /// Bytes sent to the server.
    #[serde(deserialize_with = "null_as_default")]
    pub sent: u64,
    /// Bytes received from the server.
    #[serde(deserialize_with = "null_as_default")]
    pub received: u64,
    /// Unsuccessful attempts to communicate with the server.
    #[serde(deserialize_with = "null_as_default")]
    pub fails: u64,
    /// Times the server became unavailable.
    #[serde(deserialize_with = "null_as_default")]
    pub unavail: u64,
    /// Health check counters.
    #[serde(deserialize_with = "null_as_default")]
    pub health_checks: HealthChecks,
    /// Total time the server was unavailable, in milliseconds.
    #[serde(deserialize_with = "null_as_default")]
    pub downtime: u64,
    /// When the server became unavailable, in milliseconds since the epoch.
    #[serde(deserialize_with = "null_as_default")]
    pub downstart: u64,
    /// When the server was last selected. Added in version 4.
    pub selected: Option<u64>,
    /// Average time to get the response header. Added in version 5.
    pub header_time: Option<u64>,
    /// Average time to get the full response. Added in version 5.
    pub response_time: Option<u64>,
}

/// Cache outcome counters without write tracking.
#[derive(Debug, Default, Clone, Copy, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheOutcome {
    /// Responses read from the cache.
    #[serde(deserialize_with = "null_as_default")]
    pub responses: u64,
    /// Bytes read from the cache.
    #[serde(deserialize_with = "null_as_default")]
    pub bytes: u64,
}

/// Cache outcome counters with write tracking.
#[derive(Debug, Default, Clone, Copy, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheWrittenOutcome {
    /// Responses not taken from the cache.
    #[serde(deserialize_with = "null_as_default")]
    pub responses: u64,
    /// Bytes read from the proxied server.
    #[serde(deserialize_with = "null_as_default")]
    pub bytes: u64,
    /// Responses written to the cache.
    #[serde(deserialize_with = "null_as_default")]
    pub responses_written: u64,
    /// Bytes written to the cache.
    #[serde(deserialize_with = "null_as_default")]
    pub bytes_written: u64,
}

/// A proxy cache.
#[derive(Debug, Default, Clone, Copy, Deserialize, PartialEq)]
#[serde(default)]
pub struct Cache {
    /// Current cache size.
    #[serde(deserialize_with = "null_as_default")]
    pub size: u64,
    /// Maximum cache size.
    #[serde(deserialize_with = "null_as_default")]
    pub max_size: u64,
    /// Whether the cache loader is still loading data from disk.
    #[serde(deserialize_with = "null_as_default")]
    pub cold: bool,
    /// Cache hits.
    #[serde(deserialize_with = "null_as_default")]
    pub hit: CacheOutcome,
    /// Stale responses served.
    #[serde(deserialize_with = "null_as_default")]
    pub stale: CacheOutcome,
    /// Stale responses served while updating.
    #[serde(deserialize_with = "null_as_default")]
    pub updating: CacheOutcome,
    /// Stale responses revalidated. Added in version 3.
    pub revalidated: Option<CacheOutcome>,
    /// Cache misses.
    #[serde(deserialize_with = "null_as_default")]
    pub miss: CacheWrittenOutcome,
    /// Expired responses.
    #[serde(deserialize_with = "null_as_default")]
    pub expired: CacheWrittenOutcome,
    /// Cache bypasses.
    #[serde(deserialize_with = "null_as_default")]
    pub bypass: CacheWrittenOutcome,
}

/// TCP/UDP proxy state.
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Stream {
    /// Stream status zones, keyed by zone name.
    #[serde(deserialize_with = "null_as_default")]
    pub server_zones: BTreeMap<String, StreamServerZone>,
    /// Stream upstream groups, keyed by upstream name.
    #[serde(deserialize_with = "null_as_default")]
    pub upstreams: BTreeMap<String, StreamUpstream>,
}

/// Session counts by status class.
#[derive(Debug, Default, Clone, Copy, Deserialize, PartialEq)]
#[serde(default)]
pub struct Sessions {
    /// `1xx` sessions.
    #[serde(rename = "1xx")]
    #[serde(deserialize_with = "null_as_default")]
    pub sessions_1xx: u64,
    /// `2xx` sessions.
    #[serde(rename = "2xx")]
    #[serde(deserialize_with = "null_as_default")]
    pub sessions_2xx: u64,
    /// `3xx` sessions.
    #[serde(rename = "3xx")]
    #[serde(deserialize_with = "null_as_default")]
    pub sessions_3xx: u64,
    /// `4xx` sessions.
    #[serde(rename = "4xx")]
    #[serde(deserialize_with = "null_as_default")]
    pub sessions_4xx: u64,
    /// `5xx` sessions.
    #[serde(rename = "5xx")]
    #[serde(deserialize_with = "null_as_default")]
    pub sessions_5xx: u64,
    /// All completed sessions.
    #[serde(deserialize_with = "null_as_default")]
    pub total: u64,
}

/// A stream status zone.
#[derive(Debug, Default, Clone, Copy, Deserialize, PartialEq)]
#[serde(default)]
pub struct StreamServerZone {
    /// Client connections being processed.
    #[serde(deserialize_with = "null_as_default")]
    pub processing: u64,
    /// Connections accepted from clients.
    #[serde(deserialize_with = "null_as_default")]
    pub connections: u64,
    /// Completed sessions by status class.
    pub sessions: Option<Sessions>,
    /// Connections completed without creating a session. Added in version 7.
    pub discarded: Option<u64>,
    /// Bytes received from clients.
    #[serde(deserialize_with = "null_as_default")]
    pub received: u64,
    /// Bytes sent to clients.
    #[serde(deserialize_with = "null_as_default")]
    pub sent: u64,
}

/// A stream upstream group.
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct StreamUpstream {
    /// Servers in the group.
    #[serde(deserialize_with = "null_as_default")]
    pub peers: Vec<StreamPeer>,
    /// Servers removed from the group but still processing sessions.
    #[serde(deserialize_with = "null_as_default")]
    pub zombies: u64,
}

/// A server in a stream upstream group.
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct StreamPeer {
    /// Server id.
    pub id: Option<u64>,
    /// Server address.
    #[serde(deserialize_with = "null_as_default")]
    pub server: String,
    /// Whether the server is a backup server.
    #[serde(deserialize_with = "null_as_default")]
    pub backup: bool,
    /// Server weight.
    #[serde(deserialize_with = "null_as_default")]
    pub weight: u64,
    /// One of `up`, `down`, `unavail`, `checking`, `unhealthy`.
    #[serde(deserialize_with = "null_as_default")]
    pub state: String,
    /// Current connections.
    #[serde(deserialize_with = "null_as_default")]
    pub active: u64,
    /// Client connections forwarded to the server.
    #[serde(deserialize_with = "null_as_default")]
    pub connections: u64,
    /// Average time to connect to the server.
    pub connect_time: Option<u64>,
    /// Average time to receive the first byte.
    pub first_byte_time: Option<u64>,
    /// Average time to receive the last byte.
    pub response_time: Option<u64>,
    /// Bytes sent to the server.
    #[serde(deserialize_with = "null_as_default")]
    pub sent: u64,
    /// Bytes received from the server.
    #[serde(deserialize_with = "null_as_default")]
    pub received: u64,
    /// Unsuccessful attempts to communicate with the server.
    #[serde(deserialize_with = "null_as_default")]
    pub fails: u64,
    /// Times the server became unavailable.
    #[serde(deserialize_with = "null_as_default")]
    pub unavail: u64,
    /// Health check counters.
    #[serde(deserialize_with = "null_as_default")]
    pub health_checks: HealthChecks,
    /// Total time the server was unavailable, in milliseconds.
    #[serde(deserialize_with = "null_as_default")]
    pub downtime: u64,
    /// When the server became unavailable, in milliseconds since the epoch.
    #[serde(deserialize_with = "null_as_default")]
    pub downstart: u64,
    /// When the server was last selected.
    #[serde(deserialize_with = "null_as_default")]
    pub selected: u64,
}
