//! Migration run reports

use super::projection::BatchCounts;
use super::schema::Stage;
use crate::graph::GraphStatistics;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Outcome of one stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    /// Every batch was read; no record failed
    Complete,
    /// Every batch was read, but some records failed to map or merge
    Partial,
    /// A batch could not be fetched; the stage stopped there
    Failed,
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageStatus::Complete => write!(f, "complete"),
            StageStatus::Partial => write!(f, "partial"),
            StageStatus::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageReport {
    pub stage: Stage,
    pub status: StageStatus,
    pub batches: usize,
    #[serde(flatten)]
    pub counts: BatchCounts,
    /// Rows rejected by the mapper; also included in `counts.failed`
    pub mapping_failures: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: u64,
}

impl StageReport {
    pub fn new(stage: Stage) -> Self {
        Self {
            stage,
            status: StageStatus::Complete,
            batches: 0,
            counts: BatchCounts::default(),
            mapping_failures: 0,
            error: None,
            duration_ms: 0,
        }
    }
}

/// Overall status of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    /// Every stage completed without record failures
    Complete,
    /// Some stages or records failed
    Partial,
    /// Every stage failed
    Failed,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Running => write!(f, "running"),
            RunStatus::Complete => write!(f, "complete"),
            RunStatus::Partial => write!(f, "partial"),
            RunStatus::Failed => write!(f, "failed"),
        }
    }
}

/// One migration run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub status: RunStatus,
    pub batch_size: usize,
    pub stages: Vec<StageReport>,
    /// Target graph after the run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graph: Option<GraphStatistics>,
}

impl MigrationReport {
    pub fn new(batch_size: usize) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: None,
            status: RunStatus::Running,
            batch_size,
            stages: Vec::new(),
            graph: None,
        }
    }

    pub fn add_stage(&mut self, report: StageReport) {
        self.stages.push(report);
    }

    pub fn stage(&self, stage: Stage) -> Option<&StageReport> {
        self.stages.iter().find(|report| report.stage == stage)
    }

    /// Stamp the finish time and compute the final status
    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
        self.status = self.compute_status();
    }

    fn compute_status(&self) -> RunStatus {
        if self.stages.is_empty() {
            return RunStatus::Complete;
        }
        let failed = self
            .stages
            .iter()
            .filter(|s| s.status == StageStatus::Failed)
            .count();
        let complete = self
            .stages
            .iter()
            .filter(|s| s.status == StageStatus::Complete)
            .count();

        if failed == self.stages.len() {
            RunStatus::Failed
        } else if complete == self.stages.len() {
            RunStatus::Complete
        } else {
            RunStatus::Partial
        }
    }

    /// Sum of every stage's counts
    pub fn totals(&self) -> BatchCounts {
        let mut totals = BatchCounts::default();
        for stage in &self.stages {
            totals += stage.counts;
        }
        totals
    }

    pub fn duration_ms(&self) -> Option<u64> {
        let finished = self.finished_at?;
        u64::try_from((finished - self.started_at).num_milliseconds()).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage(stage: Stage, status: StageStatus) -> StageReport {
        StageReport {
            status,
            ..StageReport::new(stage)
        }
    }

    #[test]
    fn test_status_rollup() {
        let mut report = MigrationReport::new(1000);
        report.add_stage(stage(Stage::Authors, StageStatus::Complete));
        report.add_stage(stage(Stage::Books, StageStatus::Complete));
        report.finish();
        assert_eq!(report.status, RunStatus::Complete);
        assert!(report.duration_ms().is_some());

        let mut report = MigrationReport::new(1000);
        report.add_stage(stage(Stage::Authors, StageStatus::Complete));
        report.add_stage(stage(Stage::Books, StageStatus::Failed));
        report.finish();
        assert_eq!(report.status, RunStatus::Partial);

        let mut report = MigrationReport::new(1000);
        report.add_stage(stage(Stage::Authors, StageStatus::Failed));
        report.finish();
        assert_eq!(report.status, RunStatus::Failed);
    }

    #[test]
    fn test_stage_counts_flatten_into_json() {
        let mut report = StageReport::new(Stage::Wrote);
        report.counts.created = 4;
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["stage"], "wrote");
        assert_eq!(json["created"], 4);
        assert!(json.get("error").is_none());
    }
}
