//! nginx plus status walker
//!
//! This module decodes the JSON document served by `ngx_http_status_module`
//! and flattens it into [`Measurement`]s. Nested, dynamically keyed
//! structures -- zones, upstreams, peers, caches -- contribute structural
//! labels naming the element a measurement belongs to.
//!
//! Fields that only exist in some versions of the document are emitted only
//! when present. An absent optional field never produces a zero.

pub mod status;

use std::io::Read;

use rustc_hash::FxHashSet;
use tracing::debug;

use self::status::{
    Cache, HealthChecks, Peer, Responses, ServerZone, Status, StreamPeer, StreamServerZone,
    StreamUpstream, Upstream,
};
use crate::measurement::{Labels, Measurement, RawValue, with_label};

#[derive(thiserror::Error, Debug)]
/// Errors produced by [`scrape`]
pub enum Error {
    /// The body was not a valid status document.
    #[error("Error while decoding JSON response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Upstream peers to leave out of the walk, matched by address.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeerFilter {
    excluded: FxHashSet<String>,
}

impl PeerFilter {
    /// Whether the peer at `address` is excluded.
    #[must_use]
    pub fn is_excluded(&self, address: &str) -> bool {
        self.excluded.contains(address)
    }

    /// Whether this filter excludes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.excluded.is_empty()
    }
}

impl<S> FromIterator<S> for PeerFilter
where
    S: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            excluded: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// Decode one status document from `reader` and flatten it into `out`.
///
/// Every measurement carries `labels` plus the structural labels of the
/// element it was read from. Peers matched by `exclude` contribute nothing.
///
/// # Errors
///
/// Returns [`Error::Decode`] if the body is not a valid status document. No
/// measurements are emitted in that case.
pub fn scrape<R>(
    reader: R,
    labels: &Labels,
    exclude: &PeerFilter,
    out: &mut Vec<Measurement>,
) -> Result<(), Error>
where
    R: Read,
{
    let status: Status = serde_json::from_reader(reader)?;
    debug!(
        version = status.version,
        nginx_version = %status.nginx_version,
        "decoded nginx plus status"
    );

    let mut walker = Walker { exclude, out };
    walker.processes(&status, labels);
    walker.connections(&status, labels);
    walker.ssl(&status, labels);
    walker.requests(&status, labels);
    walker.server_zones(&status, labels);
    walker.upstreams(&status, labels);
    walker.caches(&status, labels);
    walker.stream(&status, labels);
    Ok(())
}

const ZONE_RESPONSES: [&str; 6] = [
    "zone_responses_1xx",
    "zone_responses_2xx",
    "zone_responses_3xx",
    "zone_responses_4xx",
    "zone_responses_5xx",
    "zone_responses_total",
];

const PEER_RESPONSES: [&str; 6] = [
    "upstream_peer_responses_1xx",
    "upstream_peer_responses_2xx",
    "upstream_peer_responses_3xx",
    "upstream_peer_responses_4xx",
    "upstream_peer_responses_5xx",
    "upstream_peer_responses_total",
];

const PEER_HEALTH_CHECKS: [&str; 4] = [
    "upstream_peer_healthchecks_checks",
    "upstream_peer_healthchecks_fails",
    "upstream_peer_healthchecks_unhealthy",
    "upstream_peer_healthchecks_last_passed",
];

const STREAM_PEER_HEALTH_CHECKS: [&str; 4] = [
    "stream_upstream_peer_healthchecks_checks",
    "stream_upstream_peer_healthchecks_fails",
    "stream_upstream_peer_healthchecks_unhealthy",
    "stream_upstream_peer_healthchecks_last_passed",
];

struct Walker<'a> {
    exclude: &'a PeerFilter,
    out: &'a mut Vec<Measurement>,
}

impl Walker<'_> {
    fn emit(&mut self, name: &'static str, value: impl Into<RawValue>, labels: &Labels) {
        self.out.push(Measurement::new(name, value, labels));
    }

    fn emit_some<T>(&mut self, name: &'static str, value: Option<T>, labels: &Labels)
    where
        T: Into<RawValue>,
    {
        if let Some(value) = value {
            self.emit(name, value, labels);
        }
    }

    fn responses(&mut self, names: [&'static str; 6], r: &Responses, labels: &Labels) {
        let values = [
            r.responses_1xx,
            r.responses_2xx,
            r.responses_3xx,
            r.responses_4xx,
            r.responses_5xx,
            r.total,
        ];
        for (name, value) in names.into_iter().zip(values) {
            self.emit(name, value, labels);
        }
    }

    fn health_checks(&mut self, names: [&'static str; 4], hc: &HealthChecks, labels: &Labels) {
        self.emit(names[0], hc.checks, labels);
        self.emit(names[1], hc.fails, labels);
        self.emit(names[2], hc.unhealthy, labels);
        self.emit_some(names[3], hc.last_passed, labels);
    }

    fn processes(&mut self, status: &Status, labels: &Labels) {
        let respawned = status.processes.as_ref().and_then(|p| p.respawned);
        self.emit_some("processes_respawned", respawned, labels);
    }

    fn connections(&mut self, status: &Status, labels: &Labels) {
        let c = &status.connections;
        self.emit("connections_accepted", c.accepted, labels);
        self.emit("connections_dropped", c.dropped, labels);
        self.emit("connections_active", c.active, labels);
        self.emit("connections_idle", c.idle, labels);
    }

    fn ssl(&mut self, status: &Status, labels: &Labels) {
        if let Some(ssl) = &status.ssl {
            self.emit("ssl_handshakes", ssl.handshakes, labels);
            self.emit("ssl_handshakes_failed", ssl.handshakes_failed, labels);
            self.emit("ssl_session_reuses", ssl.session_reuses, labels);
        }
    }

    fn requests(&mut self, status: &Status, labels: &Labels) {
        self.emit("requests_total", status.requests.total, labels);
        self.emit("requests_current", status.requests.current, labels);
    }

    fn server_zones(&mut self, status: &Status, labels: &Labels) {
        for (name, zone) in &status.server_zones {
            let labels = with_label(labels, "zone", name);
            self.server_zone(zone, &labels);
        }
    }

    fn server_zone(&mut self, zone: &ServerZone, labels: &Labels) {
        self.emit("zone_processing", zone.processing, labels);
        self.emit("zone_requests", zone.requests, labels);
        self.responses(ZONE_RESPONSES, &zone.responses, labels);
        self.emit("zone_received", zone.received, labels);
        self.emit("zone_sent", zone.sent, labels);
        self.emit_some("zone_discarded", zone.discarded, labels);
    }

    fn upstreams(&mut self, status: &Status, labels: &Labels) {
        for (name, upstream) in &status.upstreams {
            let labels = with_label(labels, "upstream", name);
            self.upstream(upstream, &labels);
        }
    }

    fn upstream(&mut self, upstream: &Upstream, labels: &Labels) {
        self.emit("upstream_keepalive", upstream.keepalive, labels);
        self.emit("upstream_zombies", upstream.zombies, labels);

        if let Some(queue) = &upstream.queue {
            self.emit("upstream_queue_size", queue.size, labels);
            self.emit("upstream_queue_max_size", queue.max_size, labels);
            self.emit("upstream_queue_overflows", queue.overflows, labels);
        }

        for peer in &upstream.peers {
            if self.exclude.is_excluded(&peer.server) {
                debug!("skipping excluded upstream peer {}", peer.server);
                continue;
            }
            let labels = peer_labels(labels, &peer.server, peer.id);
            self.peer(peer, &labels);
        }
    }

    fn peer(&mut self, peer: &Peer, labels: &Labels) {
        self.emit("upstream_peer_backup", peer.backup, labels);
        self.emit("upstream_peer_weight", peer.weight, labels);
        self.emit("upstream_peer_state", peer.state.as_str(), labels);
        self.emit("upstream_peer_active", peer.active, labels);
        self.emit("upstream_peer_requests", peer.requests, labels);
        self.responses(PEER_RESPONSES, &peer.responses, labels);
        self.emit("upstream_peer_sent", peer.sent, labels);
        self.emit("upstream_peer_received", peer.received, labels);
        self.emit("upstream_peer_fails", peer.fails, labels);
        self.emit("upstream_peer_unavail", peer.unavail, labels);
        self.health_checks(PEER_HEALTH_CHECKS, &peer.health_checks, labels);
        self.emit("upstream_peer_downtime", peer.downtime, labels);
        self.emit("upstream_peer_downstart", peer.downstart, labels);
        self.emit_some("upstream_peer_selected", peer.selected, labels);
        self.emit_some("upstream_peer_header_time", peer.header_time, labels);
        self.emit_some("upstream_peer_response_time", peer.response_time, labels);
        self.emit_some("upstream_peer_max_conns", peer.max_conns, labels);
    }

    fn caches(&mut self, status: &Status, labels: &Labels) {
        for (name, cache) in &status.caches {
            let labels = with_label(labels, "cache", name);
            self.cache(cache, &labels);
        }
    }

    fn cache(&mut self, cache: &Cache, labels: &Labels) {
        self.emit("cache_size", cache.size, labels);
        self.emit("cache_max_size", cache.max_size, labels);
        self.emit("cache_cold", cache.cold, labels);

        self.emit("cache_hit_responses", cache.hit.responses, labels);
        self.emit("cache_hit_bytes", cache.hit.bytes, labels);
        self.emit("cache_stale_responses", cache.stale.responses, labels);
        self.emit("cache_stale_bytes", cache.stale.bytes, labels);
        self.emit("cache_updating_responses", cache.updating.responses, labels);
        self.emit("cache_updating_bytes", cache.updating.bytes, labels);
        if let Some(revalidated) = &cache.revalidated {
            self.emit("cache_revalidated_responses", revalidated.responses, labels);
            self.emit("cache_revalidated_bytes", revalidated.bytes, labels);
        }

        let miss = &cache.miss;
        self.emit("cache_miss_responses", miss.responses, labels);
        self.emit("cache_miss_bytes", miss.bytes, labels);
        self.emit("cache_miss_responses_written", miss.responses_written, labels);
        self.emit("cache_miss_bytes_written", miss.bytes_written, labels);

        let expired = &cache.expired;
        self.emit("cache_expired_responses", expired.responses, labels);
        self.emit("cache_expired_bytes", expired.bytes, labels);
        self.emit("cache_expired_responses_written", expired.responses_written, labels);
        self.emit("cache_expired_bytes_written", expired.bytes_written, labels);

        // Bypass is exported without a category prefix. Existing dashboards
        // depend on these names.
        let bypass = &cache.bypass;
        self.emit("cache_responses", bypass.responses, labels);
        self.emit("cache_bytes", bypass.bytes, labels);
        self.emit("cache_responses_written", bypass.responses_written, labels);
        self.emit("cache_bytes_written", bypass.bytes_written, labels);
    }

    fn stream(&mut self, status: &Status, labels: &Labels) {
        for (name, zone) in &status.stream.server_zones {
            let labels = with_label(labels, "zone", name);
            self.stream_zone(zone, &labels);
        }
        for (name, upstream) in &status.stream.upstreams {
            let labels = with_label(labels, "upstream", name);
            self.stream_upstream(upstream, &labels);
        }
    }

    fn stream_zone(&mut self, zone: &StreamServerZone, labels: &Labels) {
        self.emit("stream_zone_processing", zone.processing, labels);
        self.emit("stream_zone_connections", zone.connections, labels);
        self.emit("stream_zone_received", zone.received, labels);
        self.emit("stream_zone_sent", zone.sent, labels);
        if let Some(sessions) = &zone.sessions {
            self.emit("stream_zone_sessions_1xx", sessions.sessions_1xx, labels);
            self.emit("stream_zone_sessions_2xx", sessions.sessions_2xx, labels);
            self.emit("stream_zone_sessions_3xx", sessions.sessions_3xx, labels);
            self.emit("stream_zone_sessions_4xx", sessions.sessions_4xx, labels);
            self.emit("stream_zone_sessions_5xx", sessions.sessions_5xx, labels);
            self.emit("stream_zone_sessions_total", sessions.total, labels);
        }
        self.emit_some("stream_zone_discarded", zone.discarded, labels);
    }

    fn stream_upstream(&mut self, upstream: &StreamUpstream, labels: &Labels) {
        self.emit("stream_upstream_zombies", upstream.zombies, labels);

        for peer in &upstream.peers {
            if self.exclude.is_excluded(&peer.server) {
                debug!("skipping excluded stream upstream peer {}", peer.server);
                continue;
            }
            let labels = peer_labels(labels, &peer.server, peer.id);
            self.stream_peer(peer, &labels);
        }
    }

    fn stream_peer(&mut self, peer: &StreamPeer, labels: &Labels) {
        self.emit("stream_upstream_peer_backup", peer.backup, labels);
        self.emit("stream_upstream_peer_weight", peer.weight, labels);
        self.emit("stream_upstream_peer_state", peer.state.as_str(), labels);
        self.emit("stream_upstream_peer_active", peer.active, labels);
        self.emit("stream_upstream_peer_connections", peer.connections, labels);
        self.emit("stream_upstream_peer_sent", peer.sent, labels);
        self.emit("stream_upstream_peer_received", peer.received, labels);
        self.emit("stream_upstream_peer_fails", peer.fails, labels);
        self.emit("stream_upstream_peer_unavail", peer.unavail, labels);
        self.health_checks(STREAM_PEER_HEALTH_CHECKS, &peer.health_checks, labels);
        // Published under the health check prefix since the first release.
        self.emit("stream_upstream_peer_healthchecks_downtime", peer.downtime, labels);
        self.emit("stream_upstream_peer_healthchecks_downstart", peer.downstart, labels);
        self.emit("stream_upstream_peer_healthchecks_selected", peer.selected, labels);
        self.emit_some("stream_upstream_peer_connect_time", peer.connect_time, labels);
        self.emit_some("stream_upstream_peer_first_byte_time", peer.first_byte_time, labels);
        self.emit_some("stream_upstream_peer_response_time", peer.response_time, labels);
    }
}

fn peer_labels(upstream: &Labels, server: &str, id: Option<u64>) -> Labels {
    let mut labels = with_label(upstream, "serverAddress", server);
    if let Some(id) = id {
        labels.insert("id".to_string(), id.to_string());
    }
    labels
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_V6: &str = r#"
{
    "version": 6,
    "nginx_version":  "1.22.333",
    "address":        "1.2.3.4",
    "generation":     88,
    "load_timestamp": 1451606400000,
    "timestamp":      1451606400000,
    "pid":            9999,
    "processes": { "respawned": 9999 },
    "connections": {
        "accepted": 1234567890000,
        "dropped":  2345678900000,
        "active":   345,
        "idle":     567
    },
    "ssl": {
        "handshakes":        1234567800000,
        "handshakes_failed": 5432100000000,
        "session_reuses":    6543210000000
    },
    "requests": { "total": 9876543210000, "current": 98 },
    "server_zones": {
        "zone.a_80": {
            "processing": 12,
            "requests": 34,
            "responses": {
                "1xx": 111, "2xx": 222, "3xx": 333, "4xx": 444, "5xx": 555,
                "total": 999
            },
            "discarded": 11,
            "received": 22,
            "sent": 33
        }
    },
    "upstreams": {
        "first_upstream": {
            "queue": { "size": 100, "max_size": 1000, "overflows": 12 },
            "peers": [
                {
                    "id": 0,
                    "server": "1.2.3.123:80",
                    "backup": false,
                    "weight": 1,
                    "state": "up",
                    "active": 0,
                    "requests": 9876,
                    "responses": {
                        "1xx": 1111, "2xx": 2222, "3xx": 3333, "4xx": 4444,
                        "5xx": 5555, "total": 987654
                    },
                    "sent": 987654321,
                    "received": 87654321,
                    "fails": 98,
                    "unavail": 65,
                    "health_checks": {
                        "checks": 54, "fails": 32, "unhealthy": 21,
                        "last_passed": false
                    },
                    "downtime": 5432,
                    "downstart": 4321,
                    "selected": 1451606400000,
                    "header_time": 2451606400000,
                    "response_time": 3451606400000,
                    "max_conns": 1000000
                }
            ],
            "keepalive": 1,
            "zombies": 2
        }
    },
    "caches": {
        "cache_01": {
            "size": 12,
            "max_size": 23,
            "cold": false,
            "hit": { "responses": 34, "bytes": 45 },
            "stale": { "responses": 56, "bytes": 67 },
            "updating": { "responses": 78, "bytes": 89 },
            "revalidated": { "responses": 90, "bytes": 98 },
            "miss": {
                "responses": 87, "bytes": 76,
                "responses_written": 65, "bytes_written": 54
            },
            "expired": {
                "responses": 43, "bytes": 32,
                "responses_written": 21, "bytes_written": 10
            },
            "bypass": {
                "responses": 13, "bytes": 35,
                "responses_written": 57, "bytes_written": 79
            }
        }
    },
    "stream": {
        "server_zones": {
            "stream.zone.01": {
                "processing": 24, "connections": 46, "received": 68, "sent": 80
            }
        },
        "upstreams": {
            "upstream.01": {
                "peers": [
                    {
                        "id": 1,
                        "server": "5.4.3.2:2345",
                        "backup": false,
                        "weight": 1,
                        "state": "up",
                        "active": 0,
                        "connections": 0,
                        "sent": 0,
                        "received": 0,
                        "fails": 0,
                        "unavail": 0,
                        "downtime": 0,
                        "downstart": 0,
                        "selected": 0,
                        "health_checks": {
                            "checks": 40851, "fails": 0, "unhealthy": 0,
                            "last_passed": true
                        },
                        "connect_time": 993,
                        "first_byte_time": 994,
                        "response_time": 995
                    }
                ],
                "zombies": 0
            }
        }
    }
}
"#;

    fn base_labels() -> Labels {
        let mut labels = Labels::new();
        labels.insert("server".to_string(), "zone.a_80".to_string());
        labels.insert("port".to_string(), "8080".to_string());
        labels
    }

    fn run(body: &str, exclude: &PeerFilter) -> (Result<(), Error>, Vec<Measurement>) {
        let mut out = Vec::new();
        let res = scrape(body.as_bytes(), &base_labels(), exclude, &mut out);
        (res, out)
    }

    fn find<'a>(out: &'a [Measurement], name: &str) -> Vec<&'a Measurement> {
        out.iter().filter(|m| m.name == name).collect()
    }

    #[test]
    fn full_document_emits_every_field() {
        let (res, out) = run(VALID_V6, &PeerFilter::default());
        assert!(res.is_ok());
        assert_eq!(out.len(), 98);

        let respawned = find(&out, "processes_respawned");
        assert_eq!(respawned.len(), 1);
        assert_eq!(respawned[0].value, RawValue::U64(9999));
        assert_eq!(respawned[0].labels, base_labels());

        let accepted = find(&out, "connections_accepted");
        assert_eq!(accepted[0].value, RawValue::U64(1_234_567_890_000));
    }

    #[test]
    fn zone_labels_extend_base() {
        let (_, out) = run(VALID_V6, &PeerFilter::default());
        let zone_2xx = find(&out, "zone_responses_2xx");
        assert_eq!(zone_2xx.len(), 1);

        let mut expected = base_labels();
        expected.insert("zone".to_string(), "zone.a_80".to_string());
        assert_eq!(zone_2xx[0].labels, expected);
        assert_eq!(zone_2xx[0].value, RawValue::U64(222));
        assert_eq!(find(&out, "zone_discarded")[0].value, RawValue::U64(11));
    }

    #[test]
    fn peer_labels_extend_upstream() {
        let (_, out) = run(VALID_V6, &PeerFilter::default());
        let backup = find(&out, "upstream_peer_backup");
        assert_eq!(backup.len(), 1);

        let mut expected = base_labels();
        expected.insert("upstream".to_string(), "first_upstream".to_string());
        expected.insert("serverAddress".to_string(), "1.2.3.123:80".to_string());
        expected.insert("id".to_string(), "0".to_string());
        assert_eq!(backup[0].labels, expected);
        assert_eq!(backup[0].value, RawValue::Bool(false));

        let state = find(&out, "upstream_peer_state");
        assert_eq!(state[0].value, RawValue::Str("up".to_string()));
    }

    #[test]
    fn cache_names_and_values() {
        let (_, out) = run(VALID_V6, &PeerFilter::default());
        let value = |name| find(&out, name)[0].value.clone();

        assert_eq!(value("cache_max_size"), RawValue::U64(23));
        assert_eq!(value("cache_miss_bytes_written"), RawValue::U64(54));
        assert_eq!(value("cache_responses"), RawValue::U64(13));
        assert_eq!(value("cache_bytes"), RawValue::U64(35));
        assert_eq!(value("cache_responses_written"), RawValue::U64(57));
        assert_eq!(value("cache_bytes_written"), RawValue::U64(79));
        assert_eq!(value("cache_cold"), RawValue::Bool(false));
    }

    #[test]
    fn missing_max_conns_emits_nothing() {
        let body = VALID_V6.replace(r#""max_conns": 1000000"#, r#""weight_extra": 0"#);
        let (res, out) = run(&body, &PeerFilter::default());
        assert!(res.is_ok());
        assert!(find(&out, "upstream_peer_max_conns").is_empty());
        assert_eq!(out.len(), 97);
    }

    #[test]
    fn excluded_peers_are_skipped() {
        let exclude: PeerFilter = ["1.2.3.123:80", "5.4.3.2:2345"].into_iter().collect();
        let (res, out) = run(VALID_V6, &exclude);
        assert!(res.is_ok());

        assert!(out.iter().all(|m| !m.name.starts_with("upstream_peer_")));
        assert!(out.iter().all(|m| !m.name.starts_with("stream_upstream_peer_")));
        assert_eq!(find(&out, "upstream_keepalive").len(), 1);
        assert_eq!(find(&out, "upstream_zombies").len(), 1);
        assert_eq!(find(&out, "upstream_queue_size").len(), 1);
        assert_eq!(find(&out, "stream_upstream_zombies").len(), 1);
        assert_eq!(out.len(), 98 - 25 - 19);
    }

    #[test]
    fn exclusion_leaves_sibling_peers() {
        let body = r#"{
            "version": 6,
            "upstreams": {
                "backend": {
                    "peers": [
                        { "id": 0, "server": "10.0.0.1:80", "state": "up" },
                        { "id": 1, "server": "10.0.0.2:80", "state": "down" }
                    ],
                    "keepalive": 0,
                    "zombies": 0
                }
            }
        }"#;
        let exclude: PeerFilter = ["10.0.0.1:80"].into_iter().collect();
        let (res, out) = run(body, &exclude);
        assert!(res.is_ok());

        let states = find(&out, "upstream_peer_state");
        assert_eq!(states.len(), 1);
        assert_eq!(
            states[0].labels.get("serverAddress").map(String::as_str),
            Some("10.0.0.2:80")
        );
        assert_eq!(states[0].value, RawValue::Str("down".to_string()));
    }

    #[test]
    fn old_schema_skips_absent_fields() {
        // version 1 predates zones, caches, ssl, peer ids and timings
        let body = r#"{
            "version": 1,
            "nginx_version": "1.5.3",
            "address": "127.0.0.1",
            "timestamp": 1375000000000,
            "connections": { "accepted": 4, "dropped": 0, "active": 1, "idle": 0 },
            "requests": { "total": 10, "current": 1 },
            "upstreams": {
                "backend": {
                    "peers": [
                        { "server": "127.0.0.1:8080", "backup": true, "weight": 1,
                          "state": "up", "active": 0, "keepalive": 2, "requests": 3,
                          "health_checks": { "checks": 0, "fails": 0, "unhealthy": 0 } }
                    ],
                    "keepalive": 0
                }
            }
        }"#;
        let (res, out) = run(body, &PeerFilter::default());
        assert!(res.is_ok());

        assert!(find(&out, "processes_respawned").is_empty());
        assert!(find(&out, "ssl_handshakes").is_empty());
        assert!(find(&out, "upstream_queue_size").is_empty());
        assert!(find(&out, "upstream_peer_selected").is_empty());
        assert!(find(&out, "upstream_peer_healthchecks_last_passed").is_empty());

        let backup = find(&out, "upstream_peer_backup");
        assert_eq!(backup.len(), 1);
        assert_eq!(backup[0].value, RawValue::Bool(true));
        assert!(!backup[0].labels.contains_key("id"));
        // connections 4, requests 2, upstream 2, peer 20
        assert_eq!(out.len(), 28);
    }

    #[test]
    fn string_version_is_decode_error() {
        let body = VALID_V6.replacen(r#""version": 6"#, r#""version": "6""#, 1);
        let (res, out) = run(&body, &PeerFilter::default());
        assert!(matches!(res, Err(Error::Decode(_))));
        assert!(out.is_empty());
    }

    #[test]
    fn truncated_document_is_decode_error() {
        let (res, out) = run(&VALID_V6[..VALID_V6.len() / 2], &PeerFilter::default());
        assert!(matches!(res, Err(Error::Decode(_))));
        assert!(out.is_empty());
    }

    #[test]
    fn stream_sessions_when_present() {
        let body = r#"{
            "version": 7,
            "stream": {
                "server_zones": {
                    "dns": {
                        "processing": 1, "connections": 2,
                        "sessions": { "1xx": 0, "2xx": 5, "3xx": 0, "4xx": 1, "5xx": 0, "total": 6 },
                        "discarded": 3, "received": 4, "sent": 5
                    }
                }
            }
        }"#;
        let (res, out) = run(body, &PeerFilter::default());
        assert!(res.is_ok());
        assert_eq!(find(&out, "stream_zone_sessions_2xx")[0].value, RawValue::U64(5));
        assert_eq!(find(&out, "stream_zone_discarded")[0].value, RawValue::U64(3));
        assert_eq!(
            find(&out, "stream_zone_sessions_total")[0]
                .labels
                .get("zone")
                .map(String::as_str),
            Some("dns")
        );
    }

    #[test]
    fn null_counters_decode_as_zero() {
        let body = r#"{
            "version": 6,
            "connections": { "accepted": 4, "dropped": null, "active": 1, "idle": 0 },
            "requests": null,
            "upstreams": {
                "backend": {
                    "peers": [ { "server": "10.0.0.1:80", "state": null, "max_conns": null } ],
                    "keepalive": null
                }
            }
        }"#;
        let (res, out) = run(body, &PeerFilter::default());
        assert!(res.is_ok());

        assert_eq!(find(&out, "connections_accepted")[0].value, RawValue::U64(4));
        assert_eq!(find(&out, "connections_dropped")[0].value, RawValue::U64(0));
        assert_eq!(find(&out, "requests_total")[0].value, RawValue::U64(0));
        assert_eq!(find(&out, "upstream_keepalive")[0].value, RawValue::U64(0));
        assert_eq!(
            find(&out, "upstream_peer_state")[0].value,
            RawValue::Str(String::new())
        );
        assert!(find(&out, "upstream_peer_max_conns").is_empty());
    }
}
