//! Per-asset sync outcomes and aggregate reports
//!
//! Assets are processed independently, so reports carry one outcome per
//! asset rather than a single verdict. Reports sort by asset name, which
//! keeps output stable regardless of worker completion order.

use serde::Serialize;

/// Outcome of pulling one asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PullOutcome {
    /// The ledger shows this digest already applied.
    UpToDate,
    /// Extracted into the destination.
    Pulled { files: usize, pruned: usize },
    Failed { reason: String },
}

/// Outcome of pushing one asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PushOutcome {
    /// Packed digest matches the lock entry.
    Unchanged,
    Pushed { sha256: String, files: usize },
    /// Dry run: what an upload would change.
    WouldPush {
        old_sha256: Option<String>,
        new_sha256: String,
        files: usize,
    },
    /// The remote object exists and overwrite was not requested.
    SkippedConflict,
    Failed { reason: String },
}

/// One asset's result within a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetReport<O> {
    pub name: String,
    #[serde(flatten)]
    pub outcome: O,
}

/// Aggregate result of a pull run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PullReport {
    pub assets: Vec<AssetReport<PullOutcome>>,
}

/// Aggregate result of a push run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PushReport {
    pub assets: Vec<AssetReport<PushOutcome>>,
}

impl PullReport {
    pub(crate) fn from_outcomes(outcomes: Vec<(String, PullOutcome)>) -> Self {
        let mut assets: Vec<_> = outcomes
            .into_iter()
            .map(|(name, outcome)| AssetReport { name, outcome })
            .collect();
        assets.sort_by(|a, b| a.name.cmp(&b.name));
        Self { assets }
    }

    /// True when no asset failed.
    pub fn success(&self) -> bool {
        !self
            .assets
            .iter()
            .any(|a| matches!(a.outcome, PullOutcome::Failed { .. }))
    }

    pub fn get(&self, name: &str) -> Option<&PullOutcome> {
        self.assets
            .iter()
            .find(|a| a.name == name)
            .map(|a| &a.outcome)
    }
}

impl PushReport {
    pub(crate) fn from_outcomes(outcomes: Vec<(String, PushOutcome)>) -> Self {
        let mut assets: Vec<_> = outcomes
            .into_iter()
            .map(|(name, outcome)| AssetReport { name, outcome })
            .collect();
        assets.sort_by(|a, b| a.name.cmp(&b.name));
        Self { assets }
    }

    /// True when no asset failed. A skipped conflict is not a failure.
    pub fn success(&self) -> bool {
        !self
            .assets
            .iter()
            .any(|a| matches!(a.outcome, PushOutcome::Failed { .. }))
    }

    pub fn get(&self, name: &str) -> Option<&PushOutcome> {
        self.assets
            .iter()
            .find(|a| a.name == name)
            .map(|a| &a.outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn reports_sort_by_asset_name() {
        let report = PullReport::from_outcomes(vec![
            ("zeta".to_string(), PullOutcome::UpToDate),
            ("alpha".to_string(), PullOutcome::UpToDate),
        ]);
        let names: Vec<_> = report.assets.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }

    #[test]
    fn any_failure_fails_the_pull_report() {
        let report = PullReport::from_outcomes(vec![
            ("a".to_string(), PullOutcome::Pulled { files: 3, pruned: 0 }),
            (
                "b".to_string(),
                PullOutcome::Failed {
                    reason: "digest mismatch".to_string(),
                },
            ),
        ]);
        assert!(!report.success());
    }

    #[test]
    fn skipped_conflict_is_not_a_push_failure() {
        let report = PushReport::from_outcomes(vec![
            ("a".to_string(), PushOutcome::SkippedConflict),
            ("b".to_string(), PushOutcome::Unchanged),
        ]);
        assert!(report.success());
    }

    #[test]
    fn outcomes_serialize_with_status_tags() {
        let json = serde_json::to_value(AssetReport {
            name: "models".to_string(),
            outcome: PullOutcome::Pulled { files: 2, pruned: 1 },
        })
        .unwrap();
        assert_eq!(json["name"], "models");
        assert_eq!(json["status"], "pulled");
        assert_eq!(json["files"], 2);
    }
}
