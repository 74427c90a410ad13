//! ProxyRouter (C8) — resolves `match_id` via the MatchRegistry and
//! forwards the request to the hosting node's `advertise_address`
//! (spec.md §4.8). Re-resolves the node on every call (spec.md §9 open
//! question (c)); an implementation may add a short-TTL cache if
//! measured necessary.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName};
use reqwest::Method;
use stormstack_matches::MatchRegistry;
use tracing::warn;

use crate::error::{ProxyError, ProxyResult};

/// Request/response headers that must not be copied across a hop.
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

pub struct ProxyRouter {
    matches: MatchRegistry,
    client: reqwest::Client,
    enabled: bool,
}

impl ProxyRouter {
    pub fn new(matches: MatchRegistry, enabled: bool, timeout: Duration) -> Self {
        Self {
            matches,
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .expect("reqwest client config is valid"),
            enabled,
        }
    }

    /// Forward `method path_suffix` to the node hosting `match_id`,
    /// preserving headers (minus hop-by-hop) and body.
    pub async fn forward(
        &self,
        match_id: &str,
        method: Method,
        path_suffix: &str,
        headers: HeaderMap,
        body: Vec<u8>,
    ) -> ProxyResult<(u16, HeaderMap, Vec<u8>)> {
        if !self.enabled {
            return Err(ProxyError::Disabled);
        }

        let entry = self
            .matches
            .find(match_id)?
            .ok_or_else(|| ProxyError::MatchNotFound(match_id.to_string()))?;

        let url = format!("{}{path_suffix}", entry.advertise_address);
        let forwarded_headers = strip_hop_by_hop(headers);

        let response = self
            .client
            .request(method, &url)
            .headers(forwarded_headers)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProxyError::UpstreamTimeout
                } else {
                    ProxyError::UpstreamUnreachable(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        let response_headers = strip_hop_by_hop(response.headers().clone());
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ProxyError::UpstreamUnreachable(e.to_string()))?;

        Ok((status, response_headers, bytes.to_vec()))
    }

    /// Resolve the websocket URL to proxy to for `/ws/snapshots/{match_id}`.
    pub fn resolve_websocket(&self, match_id: &str) -> ProxyResult<String> {
        if !self.enabled {
            return Err(ProxyError::Disabled);
        }
        let entry = self
            .matches
            .find(match_id)?
            .ok_or_else(|| ProxyError::MatchNotFound(match_id.to_string()))?;
        Ok(entry.websocket_url)
    }
}

fn strip_hop_by_hop(mut headers: HeaderMap) -> HeaderMap {
    for name in HOP_BY_HOP {
        if let Ok(header_name) = HeaderName::from_bytes(name.as_bytes()) {
            headers.remove(header_name);
        } else {
            warn!(header = name, "could not parse hop-by-hop header name");
        }
    }
    headers
}
