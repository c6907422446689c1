// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Findings Sink
 * Deduplicated issue delivery to the host findings database
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::{FindingKind, ScanFinding};

/// Reporter name attached to every delivered issue.
pub const REPORTER: &str = "Mass Assignment Radar";

/// One issue as delivered to the host sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SinkRecord {
    pub title: String,
    pub dedupe_key: String,
    pub reporter: String,
    /// The concrete stored request backing this issue.
    pub attached_request_id: String,
    pub finding: ScanFinding,
}

impl SinkRecord {
    /// Compose a sink record from a finding: title and dedupe key from the
    /// (kind, field) pair, attached request picked by outcome.
    pub fn from_finding(baseline_request_id: &str, finding: &ScanFinding) -> Self {
        let attached = match finding.kind {
            FindingKind::StateChanged => finding.verify_request_id.clone(),
            FindingKind::Persisted => finding.persisted_request_id.clone(),
            _ => None,
        }
        .or_else(|| finding.mutated_request_id.clone())
        .unwrap_or_else(|| baseline_request_id.to_string());

        Self {
            title: format!("{}: {} {}", REPORTER, finding.kind, finding.field),
            dedupe_key: format!("{}:{}:{}", baseline_request_id, finding.kind, finding.field),
            reporter: REPORTER.to_string(),
            attached_request_id: attached,
            finding: finding.clone(),
        }
    }
}

/// The host issue database.
#[async_trait]
pub trait FindingsSink: Send + Sync {
    /// Write records, coalescing on dedupe key. Returns the number of
    /// newly created issues.
    async fn create(&self, records: Vec<SinkRecord>) -> Result<usize>;
}

/// In-memory sink with dedupe-key overwrite semantics.
#[derive(Default)]
pub struct MemorySink {
    records: Mutex<Vec<SinkRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<SinkRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl FindingsSink for MemorySink {
    async fn create(&self, records: Vec<SinkRecord>) -> Result<usize> {
        let mut stored = self.records.lock().unwrap();
        let mut created = 0;
        for record in records {
            match stored
                .iter_mut()
                .find(|r| r.dedupe_key == record.dedupe_key)
            {
                Some(existing) => *existing = record,
                None => {
                    stored.push(record);
                    created += 1;
                }
            }
        }
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::FindingContext;
    use serde_json::json;

    fn finding(kind: FindingKind) -> ScanFinding {
        let value = json!(true);
        FindingContext {
            baseline_request_id: "req-1",
            baseline_status: Some(200),
            field: "isAdmin",
            value: &value,
        }
        .build(kind, "msg")
    }

    #[test]
    fn test_record_composition() {
        let f = finding(FindingKind::Reflected);
        let record = SinkRecord::from_finding("req-1", &f);
        assert_eq!(record.title, "Mass Assignment Radar: Reflected isAdmin");
        assert_eq!(record.dedupe_key, "req-1:Reflected:isAdmin");
        assert_eq!(record.reporter, "Mass Assignment Radar");
        assert_eq!(record.attached_request_id, "req-1"); // baseline fallback
    }

    #[test]
    fn test_attached_request_selection() {
        let mut f = finding(FindingKind::StateChanged);
        f.verify_request_id = Some("req-7".into());
        f.mutated_request_id = Some("req-5".into());
        assert_eq!(
            SinkRecord::from_finding("req-1", &f).attached_request_id,
            "req-7"
        );

        let mut f = finding(FindingKind::Persisted);
        f.persisted_request_id = Some("req-8".into());
        f.mutated_request_id = Some("req-5".into());
        assert_eq!(
            SinkRecord::from_finding("req-1", &f).attached_request_id,
            "req-8"
        );

        let mut f = finding(FindingKind::CodeChanged);
        f.mutated_request_id = Some("req-5".into());
        assert_eq!(
            SinkRecord::from_finding("req-1", &f).attached_request_id,
            "req-5"
        );

        // StateChanged without a known verify request falls through.
        let mut f = finding(FindingKind::StateChanged);
        f.mutated_request_id = Some("req-5".into());
        assert_eq!(
            SinkRecord::from_finding("req-1", &f).attached_request_id,
            "req-5"
        );
    }

    #[tokio::test]
    async fn test_memory_sink_overwrites_on_dedupe_key() {
        let sink = MemorySink::new();
        let first = SinkRecord::from_finding("req-1", &finding(FindingKind::Reflected));
        let mut second = SinkRecord::from_finding("req-1", &finding(FindingKind::Reflected));
        second.finding.message = "updated".to_string();

        assert_eq!(sink.create(vec![first]).await.unwrap(), 1);
        assert_eq!(sink.create(vec![second]).await.unwrap(), 0);

        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].finding.message, "updated");
    }
}
