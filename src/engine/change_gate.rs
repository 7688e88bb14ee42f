use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use tracing::debug;

use crate::data::{AggregatedData, Issue, PrId, PullRequest, Sprint};
use crate::error::Result;

/// The parts of an aggregated response that decide whether the tree changes.
#[derive(Debug, Serialize)]
pub struct HashPayload<'a> {
    pub pull_requests: &'a [PullRequest],
    pub issue_map: &'a BTreeMap<PrId, Vec<String>>,
    pub issue_details: &'a [Issue],
    pub sprints: &'a [Sprint],
    pub sprint_issues: &'a BTreeMap<u64, Vec<String>>,
    pub orphaned_issues: &'a [Issue],
}

impl<'a> HashPayload<'a> {
    pub fn of(data: &'a AggregatedData) -> Self {
        Self {
            pull_requests: &data.pull_requests,
            issue_map: &data.issue_map,
            issue_details: &data.issue_details,
            sprints: &data.sprints,
            sprint_issues: &data.sprint_issues,
            orphaned_issues: &data.orphaned_issues,
        }
    }
}

/// SHA-256 hex digest of the payload's canonical JSON form.
pub fn compute_hash(payload: &HashPayload<'_>) -> Result<String> {
    let value = serde_json::to_value(payload)?;
    Ok(digest_json(&value))
}

/// Digest of a JSON value with object keys in sorted order.
pub fn digest_json(value: &serde_json::Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical(value).to_string().as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Objects rebuilt with sorted keys, whatever order `serde_json::Map` keeps.
fn canonical(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.clone(), canonical(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(canonical).collect()),
        other => other.clone(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// New content; rebuild the tree.
    Changed,
    /// Same content; only the refresh time moved.
    Unchanged,
}

/// Remembers the last accepted content hash.
#[derive(Debug, Clone, Default)]
pub struct ChangeGate {
    last_hash: Option<String>,
    last_refreshed: Option<DateTime<Utc>>,
}

impl ChangeGate {
    pub fn observe(&mut self, hash: &str, refreshed_at: DateTime<Utc>) -> GateDecision {
        self.last_refreshed = Some(refreshed_at);
        if self.last_hash.as_deref() == Some(hash) {
            debug!(hash, "content unchanged");
            return GateDecision::Unchanged;
        }
        self.last_hash = Some(hash.to_string());
        GateDecision::Changed
    }

    /// Forget the last hash so the next observation is a change.
    pub fn reset(&mut self) {
        self.last_hash = None;
        self.last_refreshed = None;
    }

    pub fn last_refreshed(&self) -> Option<DateTime<Utc>> {
        self.last_refreshed
    }

    pub fn last_hash(&self) -> Option<&str> {
        self.last_hash.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::branch_graph::tests::pr;
    use chrono::TimeZone;

    fn payload_hash(prs: &[PullRequest], issue_map: &BTreeMap<PrId, Vec<String>>) -> String {
        let sprint_issues = BTreeMap::new();
        compute_hash(&HashPayload {
            pull_requests: prs,
            issue_map,
            issue_details: &[],
            sprints: &[],
            sprint_issues: &sprint_issues,
            orphaned_issues: &[],
        })
        .unwrap()
    }

    #[test]
    fn key_order_does_not_matter() {
        let a: serde_json::Value =
            serde_json::from_str(r#"{"id": 1, "title": "x", "nested": {"b": 2, "a": 1}}"#).unwrap();
        let b: serde_json::Value =
            serde_json::from_str(r#"{"nested": {"a": 1, "b": 2}, "title": "x", "id": 1}"#).unwrap();
        assert_eq!(digest_json(&a), digest_json(&b));
    }

    #[test]
    fn single_field_changes_digest() {
        let prs = vec![pr(1, "a", "main")];
        let map = BTreeMap::from([(1, vec!["P-1".to_string()])]);
        let before = payload_hash(&prs, &map);
        assert_eq!(before, payload_hash(&prs, &map));
        assert_eq!(before.len(), 64);

        let mut renamed = prs.clone();
        renamed[0].title = "PR 1 (rebased)".to_string();
        assert_ne!(before, payload_hash(&renamed, &map));

        let other_map = BTreeMap::from([(1, vec!["P-2".to_string()])]);
        assert_ne!(before, payload_hash(&prs, &other_map));
    }

    #[test]
    fn gate_reports_changes_and_tracks_refresh() {
        let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let t1 = Utc.with_ymd_and_hms(2024, 5, 1, 12, 1, 0).unwrap();
        let mut gate = ChangeGate::default();

        assert_eq!(gate.observe("aaa", t0), GateDecision::Changed);
        assert_eq!(gate.observe("aaa", t1), GateDecision::Unchanged);
        assert_eq!(gate.last_refreshed(), Some(t1));
        assert_eq!(gate.observe("bbb", t1), GateDecision::Changed);

        gate.reset();
        assert_eq!(gate.last_refreshed(), None);
        assert_eq!(gate.observe("bbb", t1), GateDecision::Changed);
    }
}
