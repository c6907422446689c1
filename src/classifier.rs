// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Finding Classifier
 * Decision rules turning baseline/mutated/persisted/verification responses
 * into findings with stable identifiers
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use chrono::Utc;
use serde_json::Value;
use std::collections::HashMap;

use crate::json_model::{contains_key_deep, get_primitive_deep, safe_stringify};
use crate::types::{FindingKind, ScanFinding};

/// Body snippets attached to findings are truncated to this many chars.
pub const SNIPPET_MAX_CHARS: usize = 4000;

/// Leaf names whose changes are expected churn on any follow-up response
/// and never count as a state change.
pub const NOISY_LEAF_NAMES: [&str; 9] = [
    "id",
    "createdAt",
    "updatedAt",
    "timestamp",
    "time",
    "iat",
    "exp",
    "nonce",
    "imageUrl",
];

/// Stable finding identifier within one scan.
pub fn finding_id(baseline_id: &str, kind: FindingKind, field: &str, value: &str) -> String {
    format!("{}:{}:{}:{}", baseline_id, kind, field, value)
}

/// Truncate a body to a findings-sized snippet, respecting char
/// boundaries.
pub fn snippet(text: &str) -> String {
    match text.char_indices().nth(SNIPPET_MAX_CHARS) {
        Some((index, _)) => text[..index].to_string(),
        None => text.to_string(),
    }
}

/// A flattened path is noisy when it equals a noisy leaf name or descends
/// into one (`.<name>` suffix).
pub fn is_noisy_path(path: &str) -> bool {
    NOISY_LEAF_NAMES.iter().any(|name| {
        path == *name || path.ends_with(&format!(".{}", name))
    })
}

/// Diff two flattened primitive maps: one `"<path>: <old> -> <new>"` entry
/// for every non-noisy path of the new map whose baseline value exists and
/// differs.
pub fn diff_primitives(
    baseline: &[(String, String)],
    current: &[(String, String)],
) -> Vec<String> {
    let old: HashMap<&str, &str> = baseline
        .iter()
        .map(|(p, v)| (p.as_str(), v.as_str()))
        .collect();

    current
        .iter()
        .filter(|(path, _)| !is_noisy_path(path))
        .filter_map(|(path, new)| {
            old.get(path.as_str()).and_then(|previous| {
                (*previous != new).then(|| format!("{}: {} -> {}", path, previous, new))
            })
        })
        .collect()
}

/// Message for a reflection, distinguished by what the baseline body held
/// at the injected field.
pub fn reflection_message(baseline: &Value, field: &str, injected: &Value) -> &'static str {
    if !contains_key_deep(baseline, field) {
        return "response contains injected key";
    }
    match get_primitive_deep(baseline, field) {
        Some(existing) if safe_stringify(existing) == safe_stringify(injected) => {
            "response echoed injected value"
        }
        _ => "response contains overridden value",
    }
}

/// True when the parsed response carries the injected value at the
/// injected field, compared by stringification.
pub fn reflects_value(parsed: &Value, field: &str, injected: &Value) -> bool {
    get_primitive_deep(parsed, field)
        .map(|found| safe_stringify(found) == safe_stringify(injected))
        .unwrap_or(false)
}

/// Per-mutation context shared by every finding it produces.
pub struct FindingContext<'a> {
    pub baseline_request_id: &'a str,
    pub baseline_status: Option<u16>,
    pub field: &'a str,
    pub value: &'a Value,
}

impl FindingContext<'_> {
    pub fn build(&self, kind: FindingKind, message: impl Into<String>) -> ScanFinding {
        let value = safe_stringify(self.value);
        ScanFinding {
            id: finding_id(self.baseline_request_id, kind, self.field, &value),
            request_id: self.baseline_request_id.to_string(),
            field: self.field.to_string(),
            value,
            kind,
            baseline_status: self.baseline_status,
            mutated_status: None,
            persisted_status: None,
            mutated_request_id: None,
            persisted_request_id: None,
            verify_baseline_request_id: None,
            verify_request_id: None,
            mutated_snippet: None,
            persisted_snippet: None,
            verify_snippet: None,
            message: message.into(),
            discovered_at: Utc::now().to_rfc3339(),
        }
    }
}
