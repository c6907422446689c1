// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Request Store Adapter
 * Stored-request access, mutable request specs, wire-format parsing and
 * the in-memory store used by tests and embedding hosts
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::errors::{RadarError, RadarResult};
use crate::types::{Phase, RequestSummary, MARKER_HEADER};

/// Headers stripped whenever baseline headers are copied into a brand-new
/// spec; the transport recomputes its own framing and host.
pub const HOP_HEADERS: [&str; 3] = ["Content-Length", "Transfer-Encoding", "Host"];

/// Insertion-ordered, case-insensitive multimap of header name/value pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMap {
    entries: Vec<(String, String)>,
}

impl HeaderMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, N, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (N, V)>,
        N: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: pairs
                .into_iter()
                .map(|(n, v)| (n.into(), v.into()))
                .collect(),
        }
    }

    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Replace every occurrence of `name` with a single entry.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        self.remove(name);
        self.entries.push((name.to_string(), value.into()));
    }

    pub fn remove(&mut self, name: &str) {
        self.entries
            .retain(|(n, _)| !n.eq_ignore_ascii_case(name));
    }

    /// First value for `name`, looked up case-insensitively.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copy with the hop-by-hop set removed, for building fresh specs from
    /// baseline headers.
    pub fn without_hop_headers(&self) -> Self {
        let mut copy = self.clone();
        for name in HOP_HEADERS {
            copy.remove(name);
        }
        copy
    }
}

/// A response captured alongside a stored request.
#[derive(Debug, Clone)]
pub struct StoredResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl StoredResponse {
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }
}

/// A request persisted in the host store, with its optional response.
#[derive(Debug, Clone)]
pub struct SavedRequest {
    pub id: String,
    pub method: String,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
    pub created_at: DateTime<Utc>,
    pub response: Option<StoredResponse>,
}

impl SavedRequest {
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }

    /// Clone into a mutable spec preserving method, URL, headers and body.
    pub fn to_spec(&self) -> RequestSpec {
        RequestSpec {
            method: self.method.clone(),
            url: self.url.clone(),
            headers: self.headers.clone(),
            body: self.body.clone(),
        }
    }

    pub fn summary(&self) -> RequestSummary {
        RequestSummary {
            id: self.id.clone(),
            method: self.method.clone(),
            url: self.url.clone(),
            created_at: self.created_at.to_rfc3339(),
            has_response: self.response.is_some(),
            status: self.response.as_ref().map(|r| r.status),
        }
    }

    /// True for requests the scanner itself produced, identified by the
    /// marker header under any casing.
    pub fn is_scanner_traffic(&self) -> bool {
        self.headers.contains(MARKER_HEADER)
    }
}

/// A mutable request specification about to be sent.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    pub method: String,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl RequestSpec {
    pub fn set_body_text(&mut self, text: &str) {
        self.body = text.as_bytes().to_vec();
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }

    /// Stamp the scan-phase marker header, replacing any previous value.
    pub fn set_marker(&mut self, phase: Phase) {
        self.headers.set(MARKER_HEADER, phase.as_str());
    }
}

/// Outcome of one transmission. A transport failure is not an error: it
/// surfaces as `response: None`.
#[derive(Debug, Clone)]
pub struct SentExchange {
    pub request_id: String,
    pub response: Option<StoredResponse>,
}

/// The host request store the engine runs against.
#[async_trait]
pub trait RequestStore: Send + Sync {
    /// Load a stored request by ID.
    async fn get(&self, id: &str) -> Result<Option<SavedRequest>>;

    /// Transmit a spec once, never retrying, and record the exchange.
    async fn send(&self, spec: &RequestSpec) -> Result<SentExchange>;

    /// Every stored request, oldest first.
    async fn list(&self) -> Result<Vec<SavedRequest>>;

    /// Persist a spec without sending it.
    async fn save(&self, spec: &RequestSpec) -> Result<SavedRequest>;
}

/// Input for wire-format request parsing.
#[derive(Debug, Clone)]
pub struct RawRequestInput {
    pub host: String,
    pub port: u32,
    pub is_tls: bool,
    pub raw: String,
}

/// Parse a wire-format HTTP/1 request into a spec.
///
/// CRLF is normalized, folded header continuations are joined with a
/// space, and stale framing headers are dropped.
pub fn parse_raw_request(input: &RawRequestInput) -> RadarResult<RequestSpec> {
    let host = input.host.trim();
    if host.is_empty() {
        return Err(RadarError::HostRequired);
    }
    if input.port < 1 || input.port > 65_535 {
        return Err(RadarError::PortInvalid);
    }

    let normalized = input.raw.replace("\r\n", "\n");
    if normalized.trim().is_empty() {
        return Err(RadarError::RequestEmpty);
    }

    let (head, body) = match normalized.split_once("\n\n") {
        Some((head, body)) => (head, body),
        None => (normalized.as_str(), ""),
    };

    let mut lines = head.lines();
    let request_line = lines.next().unwrap_or_default();
    let mut parts = request_line.split_whitespace();
    let method = parts.next().ok_or(RadarError::InvalidRequestLine)?;
    let target = parts.next().ok_or(RadarError::InvalidRequestLine)?;

    let url = if target.starts_with("http://") || target.starts_with("https://") {
        target.to_string()
    } else {
        let scheme = if input.is_tls { "https" } else { "http" };
        let path = if target.starts_with('/') {
            target.to_string()
        } else {
            format!("/{}", target)
        };
        format!("{}://{}:{}{}", scheme, host, input.port, path)
    };

    let mut headers = HeaderMap::new();
    for line in lines {
        if line.starts_with(' ') || line.starts_with('\t') {
            // Folded continuation: append to the previous header value.
            if let Some((_, value)) = headers.entries.last_mut() {
                value.push(' ');
                value.push_str(line.trim());
            }
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.append(name.trim(), value.trim());
        }
    }
    headers.remove("Content-Length");
    headers.remove("Transfer-Encoding");

    Ok(RequestSpec {
        method: method.to_string(),
        url,
        headers,
        body: body.as_bytes().to_vec(),
    })
}

/// Scripted response source for the in-memory store.
pub type Responder = dyn Fn(&RequestSpec) -> Option<StoredResponse> + Send + Sync;

/// In-memory request store with a pluggable responder. Used by the test
/// suites and by hosts that embed the engine without a platform store.
pub struct MemoryStore {
    requests: Mutex<Vec<SavedRequest>>,
    next_id: AtomicU64,
    responder: Mutex<Box<Responder>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            responder: Mutex::new(Box::new(|_| None)),
        }
    }

    pub fn with_responder<F>(responder: F) -> Self
    where
        F: Fn(&RequestSpec) -> Option<StoredResponse> + Send + Sync + 'static,
    {
        let store = Self::new();
        *store.responder.lock().unwrap() = Box::new(responder);
        store
    }

    pub fn set_responder<F>(&self, responder: F)
    where
        F: Fn(&RequestSpec) -> Option<StoredResponse> + Send + Sync + 'static,
    {
        *self.responder.lock().unwrap() = Box::new(responder);
    }

    fn next_id(&self) -> String {
        format!("req-{}", self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    /// Seed a stored request directly, returning its ID.
    pub fn insert(
        &self,
        method: &str,
        url: &str,
        headers: HeaderMap,
        body: &[u8],
        response: Option<StoredResponse>,
    ) -> String {
        let id = self.next_id();
        self.requests.lock().unwrap().push(SavedRequest {
            id: id.clone(),
            method: method.to_string(),
            url: url.to_string(),
            headers,
            body: body.to_vec(),
            created_at: Utc::now(),
            response,
        });
        id
    }

    /// Count of requests the scanner sent through this store.
    pub fn sent_count(&self) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.is_scanner_traffic())
            .count()
    }

    /// Marker header values of scanner traffic, in send order.
    pub fn sent_markers(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter_map(|r| r.headers.get(MARKER_HEADER).map(|v| v.to_string()))
            .collect()
    }
}

#[async_trait]
impl RequestStore for MemoryStore {
    async fn get(&self, id: &str) -> Result<Option<SavedRequest>> {
        Ok(self
            .requests
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == id)
            .cloned())
    }

    async fn send(&self, spec: &RequestSpec) -> Result<SentExchange> {
        let response = (self.responder.lock().unwrap())(spec);
        let id = self.next_id();
        self.requests.lock().unwrap().push(SavedRequest {
            id: id.clone(),
            method: spec.method.clone(),
            url: spec.url.clone(),
            headers: spec.headers.clone(),
            body: spec.body.clone(),
            created_at: Utc::now(),
            response: response.clone(),
        });
        Ok(SentExchange {
            request_id: id,
            response,
        })
    }

    async fn list(&self) -> Result<Vec<SavedRequest>> {
        Ok(self.requests.lock().unwrap().clone())
    }

    async fn save(&self, spec: &RequestSpec) -> Result<SavedRequest> {
        let saved = SavedRequest {
            id: self.next_id(),
            method: spec.method.clone(),
            url: spec.url.clone(),
            headers: spec.headers.clone(),
            body: spec.body.clone(),
            created_at: Utc::now(),
            response: None,
        };
        self.requests.lock().unwrap().push(saved.clone());
        Ok(saved)
    }
}

/// Canned JSON response helper for scripted responders.
pub fn json_response(status: u16, body: &str) -> StoredResponse {
    StoredResponse {
        status,
        headers: HeaderMap::from_pairs([("Content-Type", "application/json")]),
        body: body.as_bytes().to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_input(raw: &str) -> RawRequestInput {
        RawRequestInput {
            host: "api.example.com".to_string(),
            port: 8443,
            is_tls: true,
            raw: raw.to_string(),
        }
    }

    #[test]
    fn test_header_map_case_insensitive_multimap() {
        let mut headers = HeaderMap::new();
        headers.append("Set-Cookie", "a=1");
        headers.append("set-cookie", "b=2");
        headers.append("Content-Type", "application/json");

        assert_eq!(headers.get("SET-COOKIE"), Some("a=1"));
        assert_eq!(headers.get_all("Set-Cookie"), vec!["a=1", "b=2"]);
        assert!(headers.contains("content-type"));

        headers.set("set-COOKIE", "c=3");
        assert_eq!(headers.get_all("Set-Cookie"), vec!["c=3"]);
        assert_eq!(headers.len(), 2);
    }

    #[test]
    fn test_without_hop_headers() {
        let headers = HeaderMap::from_pairs([
            ("Host", "x"),
            ("content-length", "10"),
            ("Transfer-Encoding", "chunked"),
            ("Authorization", "Bearer t"),
        ]);
        let copy = headers.without_hop_headers();
        assert_eq!(copy.len(), 1);
        assert_eq!(copy.get("Authorization"), Some("Bearer t"));
    }

    #[test]
    fn test_parse_raw_relative_target() {
        let spec = parse_raw_request(&raw_input(
            "POST /api/profile HTTP/1.1\r\nContent-Type: application/json\r\nContent-Length: 13\r\n\r\n{\"plan\":\"free\"}",
        ))
        .unwrap();
        assert_eq!(spec.method, "POST");
        assert_eq!(spec.url, "https://api.example.com:8443/api/profile");
        assert_eq!(spec.headers.get("Content-Type"), Some("application/json"));
        assert!(!spec.headers.contains("Content-Length"));
        assert_eq!(spec.body_text(), "{\"plan\":\"free\"}");
    }

    #[test]
    fn test_parse_raw_absolute_target_kept() {
        let spec = parse_raw_request(&raw_input(
            "GET http://other.example.com/x HTTP/1.1\r\n\r\n",
        ))
        .unwrap();
        assert_eq!(spec.url, "http://other.example.com/x");
    }

    #[test]
    fn test_parse_raw_missing_leading_slash() {
        let input = RawRequestInput {
            host: "h".to_string(),
            port: 80,
            is_tls: false,
            raw: "GET x HTTP/1.1\n\n".to_string(),
        };
        assert_eq!(parse_raw_request(&input).unwrap().url, "http://h:80/x");
    }

    #[test]
    fn test_parse_raw_header_folding() {
        let spec = parse_raw_request(&raw_input(
            "GET / HTTP/1.1\nX-Long: first\n  continued part\nAccept: */*\n\n",
        ))
        .unwrap();
        assert_eq!(spec.headers.get("X-Long"), Some("first continued part"));
        assert_eq!(spec.headers.get("Accept"), Some("*/*"));
    }

    #[test]
    fn test_parse_raw_drops_framing_headers() {
        let spec = parse_raw_request(&raw_input(
            "PUT / HTTP/1.1\ncontent-length: 4\ntransfer-encoding: chunked\n\nbody",
        ))
        .unwrap();
        assert!(!spec.headers.contains("Content-Length"));
        assert!(!spec.headers.contains("Transfer-Encoding"));
        assert_eq!(spec.body_text(), "body");
    }

    #[test]
    fn test_parse_raw_validation_errors() {
        let mut input = raw_input("GET / HTTP/1.1\n\n");
        input.host = " ".to_string();
        assert_eq!(
            parse_raw_request(&input).unwrap_err().to_string(),
            "host is required"
        );

        let mut input = raw_input("GET / HTTP/1.1\n\n");
        input.port = 0;
        assert_eq!(
            parse_raw_request(&input).unwrap_err().to_string(),
            "port is invalid"
        );
        input.port = 70_000;
        assert_eq!(
            parse_raw_request(&input).unwrap_err().to_string(),
            "port is invalid"
        );

        assert_eq!(
            parse_raw_request(&raw_input("  \n  ")).unwrap_err().to_string(),
            "request is empty"
        );
        assert_eq!(
            parse_raw_request(&raw_input("JUSTONETOKEN\n\n"))
                .unwrap_err()
                .to_string(),
            "invalid request line"
        );
    }

    #[test]
    fn test_spec_marker_stamp_replaces_previous() {
        let mut spec = parse_raw_request(&raw_input("GET / HTTP/1.1\n\n")).unwrap();
        spec.set_marker(Phase::Baseline);
        spec.set_marker(Phase::Mutated);
        assert_eq!(spec.headers.get_all(MARKER_HEADER), vec!["mutated"]);
    }

    #[tokio::test]
    async fn test_memory_store_send_records_exchange() {
        let store = MemoryStore::with_responder(|spec| {
            (spec.url.ends_with("/ok")).then(|| json_response(200, "{}"))
        });
        let mut spec = parse_raw_request(&RawRequestInput {
            host: "h".into(),
            port: 80,
            is_tls: false,
            raw: "GET /ok HTTP/1.1\n\n".into(),
        })
        .unwrap();
        spec.set_marker(Phase::Baseline);

        let sent = store.send(&spec).await.unwrap();
        assert!(sent.response.is_some());
        assert_eq!(store.sent_markers(), vec!["baseline"]);

        let saved = store.get(&sent.request_id).await.unwrap().unwrap();
        assert!(saved.is_scanner_traffic());
        assert_eq!(saved.summary().status, Some(200));
    }
}
