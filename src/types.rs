// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Mass Assignment Radar Core Types
 * Scan configuration, findings and host-facing result shapes
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use serde::{Deserialize, Serialize};

use crate::errors::{RadarError, RadarResult};

/// Marker header stamped on every request the scanner sends.
/// Request listings use its presence to exclude plugin-generated traffic.
pub const MARKER_HEADER: &str = "X-Mass-Assignment-Radar";

/// Hard cap on mutations per scan, bounding network amplification.
pub const MAX_MUTATIONS_CAP: u32 = 256;

/// Upper bound on the user-supplied candidate field list.
pub const MAX_CANDIDATE_FIELDS: usize = 5000;

/// Upper bound for persistence/verification delays, in milliseconds.
pub const MAX_DELAY_MS: i64 = 10_000;

/// Scan phase, used as the marker header value of the request it sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Baseline,
    Mutated,
    Persisted,
    VerifyBaseline,
    VerifyMutated,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Baseline => "baseline",
            Phase::Mutated => "mutated",
            Phase::Persisted => "persisted",
            Phase::VerifyBaseline => "verify-baseline",
            Phase::VerifyMutated => "verify-mutated",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which value candidates the generator enumerates for every field.
/// The five modes are independent; custom values are appended after them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct ValueModes {
    pub boolean_true: bool,
    pub string_admin: bool,
    pub number_one: bool,
    pub number_plus_one: bool,
    pub number_minus_one: bool,
}

impl Default for ValueModes {
    fn default() -> Self {
        Self {
            boolean_true: true,
            string_admin: true,
            number_one: false,
            number_plus_one: false,
            number_minus_one: false,
        }
    }
}

/// Optional follow-up verification side channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "kind")]
pub enum VerificationConfig {
    #[default]
    Disabled,
    FollowUp {
        #[serde(default)]
        url: String,
        /// Empty string defaults to GET at send time.
        #[serde(default)]
        method: String,
        #[serde(default)]
        body: String,
        #[serde(default, rename = "delayMs")]
        delay_ms: i64,
    },
}

impl VerificationConfig {
    pub fn is_enabled(&self) -> bool {
        matches!(self, VerificationConfig::FollowUp { .. })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanConfig {
    #[serde(default = "default_max_mutations")]
    pub max_mutations: u32,

    #[serde(default = "default_true")]
    pub include_built_in_candidates: bool,

    #[serde(default)]
    pub candidate_fields: Vec<String>,

    #[serde(default)]
    pub custom_values: Vec<String>,

    #[serde(default)]
    pub mutate_existing_fields: bool,

    #[serde(default)]
    pub value_modes: ValueModes,

    #[serde(default)]
    pub confirm_persistence: bool,

    #[serde(default)]
    pub persistence_delay_ms: i64,

    #[serde(default)]
    pub verification: VerificationConfig,
}

fn default_max_mutations() -> u32 {
    32
}

fn default_true() -> bool {
    true
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_mutations: default_max_mutations(),
            include_built_in_candidates: true,
            candidate_fields: Vec::new(),
            custom_values: Vec::new(),
            mutate_existing_fields: false,
            value_modes: ValueModes::default(),
            confirm_persistence: false,
            persistence_delay_ms: 0,
            verification: VerificationConfig::Disabled,
        }
    }
}

impl ScanConfig {
    /// Enforce every configuration bound before any request is sent.
    pub fn validate(&self) -> RadarResult<()> {
        if self.max_mutations < 1 {
            return Err(RadarError::MaxMutationsTooSmall);
        }
        if self.max_mutations > MAX_MUTATIONS_CAP {
            return Err(RadarError::MaxMutationsTooLarge);
        }
        if self.persistence_delay_ms < 0 {
            return Err(RadarError::PersistenceDelayNegative);
        }
        if self.persistence_delay_ms > MAX_DELAY_MS {
            return Err(RadarError::PersistenceDelayTooLarge);
        }
        if self.candidate_fields.len() > MAX_CANDIDATE_FIELDS {
            return Err(RadarError::CandidateFieldsTooLarge);
        }
        if let VerificationConfig::FollowUp { url, delay_ms, .. } = &self.verification {
            if url.trim().is_empty() {
                return Err(RadarError::VerificationUrlRequired);
            }
            if *delay_ms < 0 {
                return Err(RadarError::VerificationDelayNegative);
            }
            if *delay_ms > MAX_DELAY_MS {
                return Err(RadarError::VerificationDelayTooLarge);
            }
        }
        Ok(())
    }
}

/// Outcome class of a single (field, value) mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FindingKind {
    Reflected,
    Persisted,
    CodeChanged,
    StateChanged,
    NonJsonResponse,
    NoResponse,
}

impl FindingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FindingKind::Reflected => "Reflected",
            FindingKind::Persisted => "Persisted",
            FindingKind::CodeChanged => "CodeChanged",
            FindingKind::StateChanged => "StateChanged",
            FindingKind::NonJsonResponse => "NonJsonResponse",
            FindingKind::NoResponse => "NoResponse",
        }
    }
}

impl std::fmt::Display for FindingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A classified outcome attributed to one (baseline, field, value, kind) tuple.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanFinding {
    /// Stable identifier: `{baselineId}:{kind}:{field}:{valueString}`.
    pub id: String,
    /// Baseline stored-request identifier.
    pub request_id: String,
    pub field: String,
    /// Injected value, stringified.
    pub value: String,
    pub kind: FindingKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baseline_status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mutated_status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persisted_status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mutated_request_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persisted_request_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verify_baseline_request_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verify_request_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mutated_snippet: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persisted_snippet: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verify_snippet: Option<String>,
    pub message: String,
    pub discovered_at: String,
}

/// Result of a single scan: the resolved baseline ID plus findings in
/// production order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResult {
    pub request_id: String,
    pub findings: Vec<ScanFinding>,
}

/// Listing row for a stored request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestSummary {
    pub id: String,
    pub method: String,
    pub url: String,
    /// ISO-8601 creation time.
    pub created_at: String,
    pub has_response: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

/// Rendered request/response preview text for one stored request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestPreview {
    pub request_id: String,
    pub request_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_text: Option<String>,
}

/// Tagged result envelope every host-facing operation returns.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Envelope<T> {
    Ok { value: T },
    Error { error: String },
}

impl<T> Envelope<T> {
    pub fn from_result(result: RadarResult<T>) -> Self {
        match result {
            Ok(value) => Envelope::Ok { value },
            Err(e) => Envelope::Error {
                error: e.to_string(),
            },
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Envelope::Ok { .. })
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            Envelope::Ok { value } => Some(value),
            Envelope::Error { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Envelope::Error { error } => Some(error),
            Envelope::Ok { .. } => None,
        }
    }
}
