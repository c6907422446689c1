// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Mass Assignment Mutation Generator
 * Deterministic, bounded enumeration of (field, value, body) mutations
 * over a baseline JSON object
 *
 * Ordering is a contract: fields first, then value candidates within each
 * field, identical inputs yielding byte-identical bodies.
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Number, Value};
use tracing::debug;

use crate::json_model::{get_primitive_deep, is_primitive, safe_stringify, set_deep};
use crate::types::ScanConfig;

/// Privilege-bearing field names every JSON API grows sooner or later.
pub const BUILTIN_CANDIDATE_FIELDS: [&str; 10] = [
    "isAdmin",
    "admin",
    "is_staff",
    "isStaff",
    "isSuperuser",
    "role",
    "roles",
    "permissions",
    "tier",
    "plan",
];

static NUMERIC_LITERAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?\d+(\.\d+)?$").expect("static regex"));

/// One fabricated request body: `body_text` is the canonical serialization
/// of the baseline object with `field` set to `value`.
#[derive(Debug, Clone, PartialEq)]
pub struct Mutation {
    pub field: String,
    pub value: Value,
    pub body_text: String,
}

/// A value to inject: either a fixed JSON value or an arithmetic delta
/// applied to whatever the baseline already holds at the field.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueCandidate {
    Fixed(Value),
    NumericDelta(i64),
}

/// Candidate field list: built-ins (if enabled), then configured fields,
/// trimmed, de-duplicated preserving first occurrence.
pub fn candidate_fields(config: &ScanConfig) -> Vec<String> {
    let mut fields: Vec<String> = Vec::new();
    if config.include_built_in_candidates {
        fields.extend(BUILTIN_CANDIDATE_FIELDS.iter().map(|f| f.to_string()));
    }
    fields.extend(config.candidate_fields.iter().cloned());

    let mut seen = std::collections::HashSet::new();
    fields
        .into_iter()
        .map(|f| f.trim().to_string())
        .filter(|f| !f.is_empty())
        .filter(|f| seen.insert(f.clone()))
        .collect()
}

/// Value candidate list in mode order, then custom values, falling back to
/// `[true]` when nothing is enabled.
pub fn value_candidates(config: &ScanConfig) -> Vec<ValueCandidate> {
    let mut candidates = Vec::new();
    let modes = &config.value_modes;
    if modes.boolean_true {
        candidates.push(ValueCandidate::Fixed(Value::Bool(true)));
    }
    if modes.string_admin {
        candidates.push(ValueCandidate::Fixed(Value::String("admin".to_string())));
    }
    if modes.number_one {
        candidates.push(ValueCandidate::Fixed(Value::Number(Number::from(1))));
    }
    if modes.number_plus_one {
        candidates.push(ValueCandidate::NumericDelta(1));
    }
    if modes.number_minus_one {
        candidates.push(ValueCandidate::NumericDelta(-1));
    }

    for raw in &config.custom_values {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(value) = coerce_custom_value(trimmed) {
            candidates.push(ValueCandidate::Fixed(value));
        }
    }

    if candidates.is_empty() {
        candidates.push(ValueCandidate::Fixed(Value::Bool(true)));
    }
    candidates
}

/// Coerce a custom value string the way a permissive config form would:
/// booleans and null by keyword, numeric literals as numbers, balanced
/// JSON composites parsed, everything else a literal string.
fn coerce_custom_value(trimmed: &str) -> Option<Value> {
    match trimmed {
        "true" => return Some(Value::Bool(true)),
        "false" => return Some(Value::Bool(false)),
        "null" => return Some(Value::Null),
        _ => {}
    }

    if NUMERIC_LITERAL.is_match(trimmed) {
        if !trimmed.contains('.') {
            if let Ok(n) = trimmed.parse::<i64>() {
                return Some(Value::Number(Number::from(n)));
            }
        }
        if let Ok(f) = trimmed.parse::<f64>() {
            if f.is_finite() {
                return Number::from_f64(f).map(Value::Number);
            }
            return None;
        }
    }

    let looks_composite = (trimmed.starts_with('{') && trimmed.ends_with('}'))
        || (trimmed.starts_with('[') && trimmed.ends_with(']'));
    if looks_composite {
        if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
            return Some(value);
        }
        // Malformed composite stays a literal string.
    }

    Some(Value::String(trimmed.to_string()))
}

/// Resolve a candidate against the baseline: fixed values pass through,
/// deltas apply to a numeric (or digit-string) existing value and are
/// skipped otherwise.
fn resolve_candidate(
    candidate: &ValueCandidate,
    existing: Option<&Value>,
) -> Option<Value> {
    match candidate {
        ValueCandidate::Fixed(value) => {
            if let Value::Number(n) = value {
                // Non-finite numbers are never injected.
                if n.as_f64().map(|f| !f.is_finite()).unwrap_or(false) {
                    return None;
                }
            }
            Some(value.clone())
        }
        ValueCandidate::NumericDelta(delta) => match existing? {
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(Value::Number(Number::from(i.saturating_add(*delta))))
                } else {
                    let f = n.as_f64()? + *delta as f64;
                    if f.is_finite() {
                        Number::from_f64(f).map(Value::Number)
                    } else {
                        None
                    }
                }
            }
            Value::String(s) if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) => {
                let n: i64 = s.parse().ok()?;
                Some(Value::String((n.saturating_add(*delta)).to_string()))
            }
            _ => None,
        },
    }
}

/// Enumerate mutations for `baseline` under `config`: fields outer, value
/// candidates inner, stopping at `max_mutations`.
pub fn generate_mutations(baseline: &Map<String, Value>, config: &ScanConfig) -> Vec<Mutation> {
    let fields = candidate_fields(config);
    let candidates = value_candidates(config);
    let root = Value::Object(baseline.clone());
    let max = config.max_mutations as usize;

    let mut mutations = Vec::new();
    'fields: for field in &fields {
        if !config.mutate_existing_fields && baseline.contains_key(field.as_str()) {
            continue;
        }
        let existing = get_primitive_deep(&root, field);

        for candidate in &candidates {
            if mutations.len() >= max {
                break 'fields;
            }
            let Some(value) = resolve_candidate(candidate, existing) else {
                continue;
            };
            if config.mutate_existing_fields {
                if let Some(current) = existing {
                    if is_primitive(current) && safe_stringify(current) == safe_stringify(&value) {
                        continue; // no-op mutation
                    }
                }
            }

            let mutated = set_deep(baseline, field, value.clone());
            let body_text = serde_json::to_string(&Value::Object(mutated))
                .unwrap_or_default();
            mutations.push(Mutation {
                field: field.clone(),
                value,
                body_text,
            });
        }
    }

    debug!(
        "generated {} mutations over {} candidate fields",
        mutations.len(),
        fields.len()
    );
    mutations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ValueModes;
    use serde_json::json;

    fn baseline() -> Map<String, Value> {
        crate::json_model::parse_object(r#"{"username":"u","plan":"free"}"#).unwrap()
    }

    fn admin_only_config() -> ScanConfig {
        ScanConfig {
            max_mutations: 16,
            value_modes: ValueModes {
                boolean_true: false,
                string_admin: true,
                number_one: false,
                number_plus_one: false,
                number_minus_one: false,
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_builtin_fields_skip_existing_keys() {
        let mutations = generate_mutations(&baseline(), &admin_only_config());
        let fields: Vec<&str> = mutations.iter().map(|m| m.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "isAdmin",
                "admin",
                "is_staff",
                "isStaff",
                "isSuperuser",
                "role",
                "roles",
                "permissions",
                "tier",
            ]
        );
        assert!(mutations.iter().all(|m| m.value == json!("admin")));
    }

    #[test]
    fn test_enumeration_is_deterministic() {
        let a = generate_mutations(&baseline(), &admin_only_config());
        let b = generate_mutations(&baseline(), &admin_only_config());
        assert_eq!(a, b);
        let bodies: Vec<&str> = a.iter().map(|m| m.body_text.as_str()).collect();
        let again: Vec<&str> = b.iter().map(|m| m.body_text.as_str()).collect();
        assert_eq!(bodies, again);
    }

    #[test]
    fn test_max_mutations_caps_output() {
        let mut config = admin_only_config();
        config.max_mutations = 3;
        let mutations = generate_mutations(&baseline(), &config);
        assert_eq!(mutations.len(), 3);
    }

    #[test]
    fn test_mutate_existing_attempts_changed_value_only() {
        let mut config = admin_only_config();
        config.mutate_existing_fields = true;
        let mutations = generate_mutations(&baseline(), &config);
        // "plan" exists with "free" != "admin", so it is attempted.
        assert!(mutations.iter().any(|m| m.field == "plan"));

        // Same stringification is a no-op and skipped.
        let base = crate::json_model::parse_object(r#"{"plan":"admin"}"#).unwrap();
        let mutations = generate_mutations(&base, &config);
        assert!(!mutations.iter().any(|m| m.field == "plan"));
    }

    #[test]
    fn test_numeric_delta_on_number_and_digit_string() {
        let base = crate::json_model::parse_object(r#"{"credits":10,"code":"0041"}"#).unwrap();
        let config = ScanConfig {
            include_built_in_candidates: false,
            candidate_fields: vec!["credits".into(), "code".into(), "name".into()],
            mutate_existing_fields: true,
            value_modes: ValueModes {
                boolean_true: false,
                string_admin: false,
                number_one: false,
                number_plus_one: true,
                number_minus_one: true,
            },
            ..Default::default()
        };
        let mutations = generate_mutations(&base, &config);
        let pairs: Vec<(String, String)> = mutations
            .iter()
            .map(|m| (m.field.clone(), safe_stringify(&m.value)))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("credits".to_string(), "11".to_string()),
                ("credits".to_string(), "9".to_string()),
                ("code".to_string(), "42".to_string()),
                ("code".to_string(), "40".to_string()),
                // "name" has no value in the baseline: both deltas skipped,
                // nothing emitted for it.
            ]
        );
    }

    #[test]
    fn test_delta_skipped_on_non_numeric_existing() {
        let config = ScanConfig {
            include_built_in_candidates: false,
            candidate_fields: vec!["plan".into()],
            mutate_existing_fields: true,
            value_modes: ValueModes {
                boolean_true: false,
                string_admin: false,
                number_one: false,
                number_plus_one: true,
                number_minus_one: false,
            },
            ..Default::default()
        };
        assert!(generate_mutations(&baseline(), &config).is_empty());
    }

    #[test]
    fn test_custom_value_coercion() {
        assert_eq!(coerce_custom_value("true"), Some(json!(true)));
        assert_eq!(coerce_custom_value("false"), Some(json!(false)));
        assert_eq!(coerce_custom_value("null"), Some(json!(null)));
        assert_eq!(coerce_custom_value("42"), Some(json!(42)));
        assert_eq!(coerce_custom_value("-7"), Some(json!(-7)));
        assert_eq!(coerce_custom_value("2.5"), Some(json!(2.5)));
        assert_eq!(
            coerce_custom_value(r#"{"a":1}"#),
            Some(json!({"a": 1}))
        );
        assert_eq!(coerce_custom_value("[1,2]"), Some(json!([1, 2])));
        // Malformed composite and arbitrary text stay literal strings.
        assert_eq!(coerce_custom_value("{malformed"), Some(json!("{malformed")));
        assert_eq!(coerce_custom_value("{oops]"), Some(json!("{oops]")));
        assert_eq!(coerce_custom_value("premium"), Some(json!("premium")));
    }

    #[test]
    fn test_value_candidates_fall_back_to_true() {
        let config = ScanConfig {
            value_modes: ValueModes {
                boolean_true: false,
                string_admin: false,
                number_one: false,
                number_plus_one: false,
                number_minus_one: false,
            },
            ..Default::default()
        };
        assert_eq!(
            value_candidates(&config),
            vec![ValueCandidate::Fixed(json!(true))]
        );
    }

    #[test]
    fn test_candidate_fields_trim_and_dedupe() {
        let config = ScanConfig {
            include_built_in_candidates: false,
            candidate_fields: vec![
                " credits ".into(),
                "".into(),
                "credits".into(),
                "tier".into(),
            ],
            ..Default::default()
        };
        assert_eq!(candidate_fields(&config), vec!["credits", "tier"]);
    }

    #[test]
    fn test_dotted_field_sets_nested_path() {
        let config = ScanConfig {
            include_built_in_candidates: false,
            candidate_fields: vec!["profile.role".into()],
            value_modes: ValueModes {
                boolean_true: false,
                string_admin: true,
                number_one: false,
                number_plus_one: false,
                number_minus_one: false,
            },
            ..Default::default()
        };
        let mutations = generate_mutations(&baseline(), &config);
        assert_eq!(mutations.len(), 1);
        let body: Value = serde_json::from_str(&mutations[0].body_text).unwrap();
        assert_eq!(
            crate::json_model::get_primitive_deep(&body, "profile.role"),
            Some(&json!("admin"))
        );
        // Untouched siblings survive canonical re-serialization.
        assert_eq!(
            crate::json_model::get_primitive_deep(&body, "username"),
            Some(&json!("u"))
        );
    }

    #[test]
    fn test_every_body_round_trips_through_lookup() {
        let config = ScanConfig {
            max_mutations: 256,
            mutate_existing_fields: true,
            value_modes: ValueModes {
                boolean_true: true,
                string_admin: true,
                number_one: true,
                number_plus_one: true,
                number_minus_one: true,
            },
            custom_values: vec!["null".into(), "3.5".into(), "free".into()],
            ..Default::default()
        };
        let base = crate::json_model::parse_object(r#"{"plan":"free","credits":2}"#).unwrap();
        for m in generate_mutations(&base, &config) {
            let body: Value = serde_json::from_str(&m.body_text).unwrap();
            let got = crate::json_model::get_primitive_deep(&body, &m.field)
                .unwrap_or(&Value::Null);
            assert_eq!(safe_stringify(got), safe_stringify(&m.value), "field {}", m.field);
        }
    }
}
