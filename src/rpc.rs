// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Radar Host API
 * Host-facing operations behind the tagged result envelope: scan control,
 * request listing/preview, raw-request import and findings delivery
 *
 * Scans are serialized here; the engine itself assumes one scan at a time.
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::cancel::ScanToken;
use crate::errors::{RadarError, RadarResult};
use crate::scanner::{is_json_request, MassAssignmentScanner};
use crate::sink::{FindingsSink, SinkRecord};
use crate::store::{parse_raw_request, RawRequestInput, RequestStore, SavedRequest};
use crate::types::{
    Envelope, RequestPreview, RequestSummary, ScanConfig, ScanFinding, ScanResult,
};

/// Listing page size bounds.
const MIN_LIST_LIMIT: i64 = 1;
const MAX_LIST_LIMIT: i64 = 5000;

/// Cap on findings accepted per delivery.
const MAX_FINDINGS_PER_CREATE: usize = 200;

/// Preview bodies are truncated to this many chars.
const PREVIEW_BODY_MAX_CHARS: usize = 200_000;

/// Input of `create_findings`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFindingsRequest {
    pub request_id: String,
    pub findings: Vec<ScanFinding>,
}

/// Output of `create_findings`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedFindings {
    pub created: usize,
}

/// The RPC surface a host mounts. One scan runs at a time; concurrent
/// `run_scan` calls queue on the internal gate.
pub struct RadarApi {
    store: Arc<dyn RequestStore>,
    sink: Arc<dyn FindingsSink>,
    scanner: MassAssignmentScanner,
    scan_gate: tokio::sync::Mutex<()>,
    token: ScanToken,
}

impl RadarApi {
    pub fn new(store: Arc<dyn RequestStore>, sink: Arc<dyn FindingsSink>) -> Self {
        let scanner = MassAssignmentScanner::new(store.clone());
        Self {
            store,
            sink,
            scanner,
            scan_gate: tokio::sync::Mutex::new(()),
            token: ScanToken::new(),
        }
    }

    /// The cancellation token `stop_scan` raises. Exposed for hosts that
    /// wire their own stop control.
    pub fn token(&self) -> &ScanToken {
        &self.token
    }

    pub async fn run_scan(&self, target: &str, config: ScanConfig) -> Envelope<ScanResult> {
        let _running = self.scan_gate.lock().await;
        Envelope::from_result(self.scanner.run_scan(target, &config, &self.token).await)
    }

    /// Advisory stop: the running scan exits after its current mutation.
    pub fn stop_scan(&self) {
        info!("stop requested");
        self.token.cancel();
    }

    pub async fn list_json_requests(
        &self,
        filter: Option<&str>,
        limit: i64,
    ) -> Envelope<Vec<RequestSummary>> {
        Envelope::from_result(self.list_json_requests_inner(filter, limit).await)
    }

    async fn list_json_requests_inner(
        &self,
        filter: Option<&str>,
        limit: i64,
    ) -> RadarResult<Vec<RequestSummary>> {
        if limit < MIN_LIST_LIMIT {
            return Err(RadarError::LimitTooSmall);
        }
        if limit > MAX_LIST_LIMIT {
            return Err(RadarError::LimitTooLarge);
        }

        let needle = filter.unwrap_or("").trim().to_ascii_lowercase();
        let requests = self
            .store
            .list()
            .await
            .map_err(|e| RadarError::Store(e.to_string()))?;

        Ok(requests
            .iter()
            .filter(|r| !r.is_scanner_traffic())
            .filter(|r| is_json_request(r))
            .filter(|r| needle.is_empty() || r.url.to_ascii_lowercase().contains(&needle))
            .take(limit as usize)
            .map(SavedRequest::summary)
            .collect())
    }

    pub async fn get_request_summary(&self, id: &str) -> Envelope<RequestSummary> {
        Envelope::from_result(self.resolve(id).await.map(|r| r.summary()))
    }

    pub async fn get_request_preview(&self, id: &str) -> Envelope<RequestPreview> {
        Envelope::from_result(self.get_request_preview_inner(id).await)
    }

    async fn get_request_preview_inner(&self, id: &str) -> RadarResult<RequestPreview> {
        let saved = self.resolve(id).await?;

        let mut request_text = format!("{} {}\n", saved.method, saved.url);
        for (name, value) in saved.headers.iter() {
            request_text.push_str(&format!("{}: {}\n", name, value));
        }
        request_text.push('\n');
        request_text.push_str(&preview_body(&saved.body_text()));

        let response_text = saved.response.as_ref().map(|response| {
            let mut text = format!("{}\n", response.status);
            for (name, value) in response.headers.iter() {
                text.push_str(&format!("{}: {}\n", name, value));
            }
            text.push('\n');
            text.push_str(&preview_body(&response.body_text()));
            text
        });

        Ok(RequestPreview {
            request_id: saved.id,
            request_text,
            response_text,
        })
    }

    pub async fn save_request_from_raw(
        &self,
        input: RawRequestInput,
    ) -> Envelope<RequestSummary> {
        Envelope::from_result(self.save_request_from_raw_inner(input).await)
    }

    async fn save_request_from_raw_inner(
        &self,
        input: RawRequestInput,
    ) -> RadarResult<RequestSummary> {
        if input.raw.trim().is_empty() {
            return Err(RadarError::RawRequestEmpty);
        }
        let spec = parse_raw_request(&input)?;
        let saved = self
            .store
            .save(&spec)
            .await
            .map_err(|e| RadarError::Store(e.to_string()))?;
        info!("saved raw request {} {} as {}", saved.method, saved.url, saved.id);
        Ok(saved.summary())
    }

    pub async fn create_findings(
        &self,
        request: CreateFindingsRequest,
    ) -> Envelope<CreatedFindings> {
        Envelope::from_result(self.create_findings_inner(request).await)
    }

    async fn create_findings_inner(
        &self,
        request: CreateFindingsRequest,
    ) -> RadarResult<CreatedFindings> {
        if request.request_id.trim().is_empty() {
            return Err(RadarError::RequestIdRequired);
        }
        if request.findings.is_empty() {
            return Err(RadarError::FindingsEmpty);
        }
        if request.findings.len() > MAX_FINDINGS_PER_CREATE {
            return Err(RadarError::TooManyFindings);
        }

        let records: Vec<SinkRecord> = request
            .findings
            .iter()
            .map(|f| SinkRecord::from_finding(&request.request_id, f))
            .collect();

        let created = self
            .sink
            .create(records)
            .await
            .map_err(|e| RadarError::SinkFailed(e.to_string()))?;
        info!("delivered {} findings ({} new)", request.findings.len(), created);
        Ok(CreatedFindings { created })
    }

    async fn resolve(&self, id: &str) -> RadarResult<SavedRequest> {
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(RadarError::RequestIdRequired);
        }
        self.store
            .get(trimmed)
            .await
            .map_err(|e| RadarError::Store(e.to_string()))?
            .ok_or_else(|| RadarError::RequestNotFound(trimmed.to_string()))
    }
}

fn preview_body(text: &str) -> String {
    match text.char_indices().nth(PREVIEW_BODY_MAX_CHARS) {
        Some((index, _)) => text[..index].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;
    use crate::store::{json_response, HeaderMap, MemoryStore};

    fn api_with_store() -> (Arc<MemoryStore>, Arc<MemorySink>, RadarApi) {
        let store = Arc::new(MemoryStore::new());
        let sink = Arc::new(MemorySink::new());
        let api = RadarApi::new(store.clone(), sink.clone());
        (store, sink, api)
    }

    #[tokio::test]
    async fn test_list_limit_bounds() {
        let (_, _, api) = api_with_store();
        assert_eq!(
            api.list_json_requests(None, 0).await.error(),
            Some("limit must be >= 1")
        );
        assert_eq!(
            api.list_json_requests(None, 5001).await.error(),
            Some("limit must be <= 5000")
        );
    }

    #[tokio::test]
    async fn test_list_excludes_scanner_and_non_json_traffic() {
        let (store, _, api) = api_with_store();
        let json_headers = HeaderMap::from_pairs([("Content-Type", "application/json")]);
        store.insert("POST", "https://a/api", json_headers.clone(), br#"{"a":1}"#, None);
        store.insert("GET", "https://a/page", HeaderMap::new(), b"<html>", None);
        let mut marked = json_headers.clone();
        marked.append(crate::types::MARKER_HEADER, "mutated");
        store.insert("POST", "https://a/api", marked, br#"{"a":1}"#, None);

        let rows = api
            .list_json_requests(None, 100)
            .await
            .into_value()
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].url, "https://a/api");
    }

    #[tokio::test]
    async fn test_list_url_filter() {
        let (store, _, api) = api_with_store();
        let headers = HeaderMap::from_pairs([("Content-Type", "application/json")]);
        store.insert("POST", "https://a/users", headers.clone(), br#"{"a":1}"#, None);
        store.insert("POST", "https://a/orders", headers, br#"{"a":1}"#, None);

        let rows = api
            .list_json_requests(Some("ORDERS"), 100)
            .await
            .into_value()
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].url, "https://a/orders");
    }

    #[tokio::test]
    async fn test_preview_layout() {
        let (store, _, api) = api_with_store();
        let headers = HeaderMap::from_pairs([("Content-Type", "application/json")]);
        let id = store.insert(
            "POST",
            "https://a/api",
            headers,
            br#"{"a":1}"#,
            Some(json_response(200, r#"{"ok":true}"#)),
        );

        let preview = api.get_request_preview(&id).await.into_value().unwrap();
        assert_eq!(
            preview.request_text,
            "POST https://a/api\nContent-Type: application/json\n\n{\"a\":1}"
        );
        assert_eq!(
            preview.response_text.as_deref(),
            Some("200\nContent-Type: application/json\n\n{\"ok\":true}")
        );
    }

    #[tokio::test]
    async fn test_summary_not_found() {
        let (_, _, api) = api_with_store();
        assert_eq!(
            api.get_request_summary("nope").await.error(),
            Some("request nope not found")
        );
        assert_eq!(
            api.get_request_summary("  ").await.error(),
            Some("requestId is required")
        );
    }

    #[tokio::test]
    async fn test_save_request_from_raw() {
        let (_, _, api) = api_with_store();

        let empty = RawRequestInput {
            host: "h".into(),
            port: 80,
            is_tls: false,
            raw: "  ".into(),
        };
        assert_eq!(
            api.save_request_from_raw(empty).await.error(),
            Some("raw request is empty")
        );

        let input = RawRequestInput {
            host: "api.example.com".into(),
            port: 443,
            is_tls: true,
            raw: "POST /u HTTP/1.1\r\nContent-Type: application/json\r\n\r\n{\"a\":1}".into(),
        };
        let summary = api.save_request_from_raw(input).await.into_value().unwrap();
        assert_eq!(summary.method, "POST");
        assert_eq!(summary.url, "https://api.example.com:443/u");
        assert!(!summary.has_response);
    }

    #[tokio::test]
    async fn test_create_findings_validation_and_delivery() {
        let (_, sink, api) = api_with_store();
        let value = serde_json::json!(true);
        let finding = crate::classifier::FindingContext {
            baseline_request_id: "req-1",
            baseline_status: Some(200),
            field: "isAdmin",
            value: &value,
        }
        .build(crate::types::FindingKind::Reflected, "msg");

        let empty = CreateFindingsRequest {
            request_id: "req-1".into(),
            findings: vec![],
        };
        assert_eq!(api.create_findings(empty).await.error(), Some("findings is empty"));

        let too_many = CreateFindingsRequest {
            request_id: "req-1".into(),
            findings: vec![finding.clone(); MAX_FINDINGS_PER_CREATE + 1],
        };
        assert_eq!(
            api.create_findings(too_many).await.error(),
            Some("too many findings")
        );

        let ok = CreateFindingsRequest {
            request_id: "req-1".into(),
            findings: vec![finding],
        };
        let created = api.create_findings(ok).await.into_value().unwrap();
        assert_eq!(created.created, 1);
        assert_eq!(sink.records().len(), 1);
        assert_eq!(
            sink.records()[0].title,
            "Mass Assignment Radar: Reflected isAdmin"
        );
    }
}
