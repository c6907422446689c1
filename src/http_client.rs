// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Live Request Store
 * reqwest-backed RequestStore that sends specs over the wire and keeps an
 * in-process registry of every exchange for listing and preview
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use tracing::debug;

use crate::store::{
    HeaderMap, RequestSpec, RequestStore, SavedRequest, SentExchange, StoredResponse,
};

/// Maximum response body size (10MB) to prevent memory exhaustion.
const MAX_BODY_SIZE: usize = 10 * 1024 * 1024;

const DEFAULT_POOL_IDLE_PER_HOST: usize = 8;

/// Live `RequestStore`: transmits specs with reqwest and records every
/// exchange. Sends are single-shot; a transport failure is recorded as an
/// exchange with no response, never retried.
pub struct LiveStore {
    client: Client,
    requests: Mutex<Vec<SavedRequest>>,
    next_id: AtomicU64,
    max_body_size: usize,
}

impl LiveStore {
    pub fn new(timeout_secs: u64) -> Result<Self> {
        // Certificate validation stays on unless explicitly disabled for
        // dev targets with self-signed certificates.
        let accept_invalid_certs = std::env::var("ACCEPT_INVALID_CERTS")
            .unwrap_or_else(|_| "false".to_string())
            .parse::<bool>()
            .unwrap_or(false);

        // Redirects are disabled so status-code diffs see the raw status.
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .danger_accept_invalid_certs(accept_invalid_certs)
            .redirect(reqwest::redirect::Policy::none())
            .pool_max_idle_per_host(DEFAULT_POOL_IDLE_PER_HOST)
            .tcp_nodelay(true)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            requests: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            max_body_size: MAX_BODY_SIZE,
        })
    }

    fn next_id(&self) -> String {
        format!("req-{}", self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    fn record(&self, spec: &RequestSpec, response: Option<StoredResponse>) -> SentExchange {
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
        SentExchange {
            request_id: id,
            response,
        }
    }

    async fn transmit(&self, spec: &RequestSpec) -> Option<StoredResponse> {
        let method = match reqwest::Method::from_bytes(spec.method.as_bytes()) {
            Ok(m) => m,
            Err(e) => {
                debug!("invalid method {:?}: {}", spec.method, e);
                return None;
            }
        };

        let mut request = self.client.request(method, &spec.url);
        for (name, value) in spec.headers.iter() {
            // Host comes from the URL, Content-Length from the body.
            if name.eq_ignore_ascii_case("host") || name.eq_ignore_ascii_case("content-length") {
                continue;
            }
            request = request.header(name, value);
        }
        if !spec.body.is_empty() {
            request = request.body(spec.body.clone());
        }

        match request.send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                let mut headers = HeaderMap::new();
                for (name, value) in response.headers() {
                    if let Ok(value) = value.to_str() {
                        headers.append(name.as_str(), value);
                    }
                }
                let body_bytes = response.bytes().await.unwrap_or_default();
                let body = if body_bytes.len() > self.max_body_size {
                    body_bytes[..self.max_body_size].to_vec()
                } else {
                    body_bytes.to_vec()
                };
                Some(StoredResponse {
                    status,
                    headers,
                    body,
                })
            }
            Err(e) => {
                debug!("request to {} failed: {}", spec.url, e);
                None
            }
        }
    }
}

#[async_trait]
impl RequestStore for LiveStore {
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
        let response = self.transmit(spec).await;
        Ok(self.record(spec, response))
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
