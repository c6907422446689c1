// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Mass Assignment Scan Orchestrator
 * Baseline ensure, optional verification baseline, mutation loop with
 * per-mutation classification and cooperative cancellation
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use tracing::{debug, info};
use url::Url;

use crate::cancel::ScanToken;
use crate::classifier::{
    diff_primitives, reflection_message, reflects_value, snippet, FindingContext,
};
use crate::errors::{RadarError, RadarResult};
use crate::json_model::{get_all_primitives, parse_object};
use crate::mutator::{generate_mutations, Mutation};
use crate::store::{RequestSpec, RequestStore, SavedRequest};
use crate::types::{FindingKind, Phase, ScanConfig, ScanResult, VerificationConfig};

/// Bodies above this size are never JSON-sniffed; only an explicit
/// Content-Type lets them through.
const MAX_SNIFF_BODY_BYTES: usize = 1_000_000;

/// Decode the baseline body into a JSON object, enforcing the JSON-ish
/// request preconditions of the scan.
pub fn baseline_object(saved: &SavedRequest) -> RadarResult<Map<String, Value>> {
    let body = saved.body_text();
    let trimmed = body.trim();

    let declared_json = saved
        .headers
        .get("Content-Type")
        .map(|v| v.to_ascii_lowercase().contains("application/json"))
        .unwrap_or(false);

    if !declared_json {
        let sniffable = saved.body.len() <= MAX_SNIFF_BODY_BYTES
            && trimmed.starts_with('{')
            && serde_json::from_str::<Value>(trimmed)
                .map(|v| v.is_object())
                .unwrap_or(false);
        if !sniffable {
            return Err(RadarError::NotJsonContentType);
        }
    }

    if trimmed.is_empty() {
        return Err(RadarError::EmptyBody);
    }
    parse_object(trimmed)
}

/// Whether a stored request qualifies as a scannable JSON request; the
/// request listing applies the same rules.
pub fn is_json_request(saved: &SavedRequest) -> bool {
    baseline_object(saved).is_ok()
}

/// Resolve the follow-up URL against the baseline origin. Absolute
/// http(s) URLs are kept verbatim; anything else becomes an origin-rooted
/// path.
fn resolve_verification_url(baseline_url: &str, follow_up: &str) -> RadarResult<String> {
    let trimmed = follow_up.trim();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        return Ok(trimmed.to_string());
    }

    let base = Url::parse(baseline_url).map_err(|_| RadarError::BaselineUrlInvalid)?;
    let host = base.host_str().ok_or(RadarError::BaselineUrlInvalid)?;
    let authority = match base.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    };
    let path = if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    };
    Ok(format!("{}://{}{}", base.scheme(), authority, path))
}

async fn sleep_ms(ms: i64) {
    if ms > 0 {
        tokio::time::sleep(Duration::from_millis(ms as u64)).await;
    }
}

/// Verification follow-up state prepared once per scan.
struct VerifyContext {
    /// Spec template; the marker is stamped per send.
    spec: RequestSpec,
    delay_ms: i64,
    /// Flattened primitives of the verify-baseline response, present only
    /// when that response parsed to a JSON object.
    baseline_flat: Option<Vec<(String, String)>>,
    baseline_request_id: String,
}

pub struct MassAssignmentScanner {
    store: Arc<dyn RequestStore>,
}

impl MassAssignmentScanner {
    pub fn new(store: Arc<dyn RequestStore>) -> Self {
        Self { store }
    }

    /// Run one scan to completion (or cooperative cancellation), returning
    /// findings in mutation-enumeration order.
    pub async fn run_scan(
        &self,
        target: &str,
        config: &ScanConfig,
        token: &ScanToken,
    ) -> RadarResult<ScanResult> {
        config.validate()?;
        token.reset();

        let id = target.trim();
        if id.is_empty() {
            return Err(RadarError::RequestIdRequired);
        }

        let saved = self
            .store
            .get(id)
            .await
            .map_err(|e| RadarError::Store(e.to_string()))?
            .ok_or_else(|| RadarError::RequestNotFound(id.to_string()))?;

        info!("starting mass assignment scan for request {}", saved.id);

        let baseline_obj = baseline_object(&saved)?;
        let baseline_root = Value::Object(baseline_obj.clone());
        let baseline_spec = saved.to_spec();

        // Reuse the stored response; otherwise replay the baseline once.
        let baseline_response = match &saved.response {
            Some(response) => response.clone(),
            None => {
                let mut spec = baseline_spec.clone();
                spec.set_marker(Phase::Baseline);
                let sent = self
                    .store
                    .send(&spec)
                    .await
                    .map_err(|_| RadarError::BaselineSendFailed)?;
                sent.response.ok_or(RadarError::BaselineSendFailed)?
            }
        };
        let baseline_status = Some(baseline_response.status);

        let verify = self.prepare_verification(&saved, config).await?;

        let mutations = generate_mutations(&baseline_obj, config);
        if mutations.is_empty() {
            return Err(RadarError::NoMutations);
        }
        info!(
            "running {} mutations against {}",
            mutations.len(),
            saved.url
        );

        let mut findings = Vec::new();
        for (index, mutation) in mutations.iter().enumerate() {
            if token.is_cancelled() {
                info!(
                    "scan cancelled after {} of {} mutations",
                    index,
                    mutations.len()
                );
                break;
            }
            self.process_mutation(
                &saved,
                &baseline_spec,
                &baseline_root,
                baseline_status,
                mutation,
                config,
                verify.as_ref(),
                &mut findings,
            )
            .await;
        }

        info!("scan finished with {} findings", findings.len());
        Ok(ScanResult {
            request_id: saved.id.clone(),
            findings,
        })
    }

    /// Send the verify-baseline request and retain its flattened JSON
    /// state, when verification is configured.
    async fn prepare_verification(
        &self,
        saved: &SavedRequest,
        config: &ScanConfig,
    ) -> RadarResult<Option<VerifyContext>> {
        let VerificationConfig::FollowUp {
            url,
            method,
            body,
            delay_ms,
        } = &config.verification
        else {
            return Ok(None);
        };

        let resolved = resolve_verification_url(&saved.url, url)?;
        let method = match method.trim() {
            "" => "GET".to_string(),
            m => m.to_string(),
        };
        let spec = RequestSpec {
            method,
            url: resolved,
            headers: saved.headers.without_hop_headers(),
            body: body.as_bytes().to_vec(),
        };

        let mut first = spec.clone();
        first.set_marker(Phase::VerifyBaseline);
        let sent = self
            .store
            .send(&first)
            .await
            .map_err(|_| RadarError::VerificationSendFailed)?;
        let response = sent.response.ok_or(RadarError::VerificationNoResponse)?;

        let baseline_flat = serde_json::from_str::<Value>(&response.body_text())
            .ok()
            .filter(|v| v.is_object())
            .map(|v| get_all_primitives(&v, ""));
        if baseline_flat.is_none() {
            debug!("verify-baseline response is not a JSON object; state diff disabled");
        }

        Ok(Some(VerifyContext {
            spec,
            delay_ms: *delay_ms,
            baseline_flat,
            baseline_request_id: sent.request_id,
        }))
    }

    /// Classification steps for one mutation. Transport and parse failures
    /// here never abort the scan.
    #[allow(clippy::too_many_arguments)]
    async fn process_mutation(
        &self,
        saved: &SavedRequest,
        baseline_spec: &RequestSpec,
        baseline_root: &Value,
        baseline_status: Option<u16>,
        mutation: &Mutation,
        config: &ScanConfig,
        verify: Option<&VerifyContext>,
        findings: &mut Vec<crate::types::ScanFinding>,
    ) {
        let ctx = FindingContext {
            baseline_request_id: &saved.id,
            baseline_status,
            field: &mutation.field,
            value: &mutation.value,
        };

        let mut spec = baseline_spec.clone();
        spec.set_body_text(&mutation.body_text);
        spec.set_marker(Phase::Mutated);

        let sent = match self.store.send(&spec).await {
            Ok(sent) => sent,
            Err(e) => {
                debug!("mutated send failed for {}: {}", mutation.field, e);
                findings.push(ctx.build(FindingKind::NoResponse, "failed to send request"));
                return;
            }
        };
        let Some(mutated_response) = sent.response else {
            let mut finding = ctx.build(FindingKind::NoResponse, "failed to send request");
            finding.mutated_request_id = Some(sent.request_id);
            findings.push(finding);
            return;
        };
        let mutated_request_id = sent.request_id;
        let mutated_status = mutated_response.status;

        if let Some(baseline_code) = baseline_status {
            if mutated_status != baseline_code {
                let mut finding = ctx.build(
                    FindingKind::CodeChanged,
                    format!("status code changed {} -> {}", baseline_code, mutated_status),
                );
                finding.mutated_request_id = Some(mutated_request_id.clone());
                finding.mutated_status = Some(mutated_status);
                findings.push(finding);
            }
        }

        if let Some(verify) = verify {
            if let Some(baseline_flat) = &verify.baseline_flat {
                self.follow_up_diff(verify, baseline_flat, &ctx, findings).await;
            }
        }

        let body_text = mutated_response.body_text();
        if body_text.is_empty() {
            return;
        }
        let parsed: Value = match serde_json::from_str(&body_text) {
            Ok(parsed) => parsed,
            Err(_) => {
                let mut finding = ctx.build(FindingKind::NonJsonResponse, "response is not JSON");
                finding.mutated_request_id = Some(mutated_request_id);
                finding.mutated_status = Some(mutated_status);
                finding.mutated_snippet = Some(snippet(&body_text));
                findings.push(finding);
                return;
            }
        };

        if !reflects_value(&parsed, &mutation.field, &mutation.value) {
            return;
        }
        let mut finding = ctx.build(
            FindingKind::Reflected,
            reflection_message(baseline_root, &mutation.field, &mutation.value),
        );
        finding.mutated_request_id = Some(mutated_request_id);
        finding.mutated_status = Some(mutated_status);
        finding.mutated_snippet = Some(snippet(&body_text));
        findings.push(finding);

        if config.confirm_persistence {
            self.persistence_probe(
                baseline_spec,
                &ctx,
                mutation,
                config.persistence_delay_ms,
                findings,
            )
            .await;
        }
    }

    /// Re-fetch the follow-up URL and diff its flattened state against the
    /// verify-baseline snapshot. Any failure silently skips the diff.
    async fn follow_up_diff(
        &self,
        verify: &VerifyContext,
        baseline_flat: &[(String, String)],
        ctx: &FindingContext<'_>,
        findings: &mut Vec<crate::types::ScanFinding>,
    ) {
        sleep_ms(verify.delay_ms).await;

        let mut spec = verify.spec.clone();
        spec.set_marker(Phase::VerifyMutated);
        let sent = match self.store.send(&spec).await {
            Ok(sent) => sent,
            Err(e) => {
                debug!("verify follow-up send failed: {}", e);
                return;
            }
        };
        let Some(response) = sent.response else {
            return;
        };
        let body_text = response.body_text();
        let Ok(parsed) = serde_json::from_str::<Value>(&body_text) else {
            return;
        };
        if !parsed.is_object() {
            return;
        }

        let current = get_all_primitives(&parsed, "");
        let changes = diff_primitives(baseline_flat, &current);
        if changes.is_empty() {
            return;
        }

        let mut finding = ctx.build(
            FindingKind::StateChanged,
            format!("state changed via follow-up ({})", changes.join(", ")),
        );
        finding.verify_baseline_request_id = Some(verify.baseline_request_id.clone());
        finding.verify_request_id = Some(sent.request_id);
        finding.verify_snippet = Some(snippet(&body_text));
        findings.push(finding);
    }

    /// Replay the original baseline body and look for the injected value
    /// in the reply. Any failure silently ends the probe.
    async fn persistence_probe(
        &self,
        baseline_spec: &RequestSpec,
        ctx: &FindingContext<'_>,
        mutation: &Mutation,
        delay_ms: i64,
        findings: &mut Vec<crate::types::ScanFinding>,
    ) {
        sleep_ms(delay_ms).await;

        let mut spec = baseline_spec.clone();
        spec.set_marker(Phase::Persisted);
        let sent = match self.store.send(&spec).await {
            Ok(sent) => sent,
            Err(e) => {
                debug!("persistence probe send failed: {}", e);
                return;
            }
        };
        let Some(response) = sent.response else {
            return;
        };
        let body_text = response.body_text();
        let Ok(parsed) = serde_json::from_str::<Value>(&body_text) else {
            return;
        };
        if !reflects_value(&parsed, &mutation.field, &mutation.value) {
            return;
        }

        let mut finding = ctx.build(
            FindingKind::Persisted,
            "injected value present after baseline replay",
        );
        finding.persisted_request_id = Some(sent.request_id);
        finding.persisted_status = Some(response.status);
        finding.persisted_snippet = Some(snippet(&body_text));
        findings.push(finding);
    }
}
