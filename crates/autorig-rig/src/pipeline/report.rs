//! Per-stage outcome of a populate run.

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use super::Stage;
use crate::error::RigError;

/// Outcome of one pipeline stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StageOutcome {
    /// The stage ran to completion.
    Completed {
        bones_added: usize,
        constraints_added: usize,
        drivers_added: usize,
    },
    /// The stage was aborted by an error. Whatever it built stays in place.
    Failed {
        #[serde(serialize_with = "serialize_error")]
        error: RigError,
    },
    /// The stage did not run because a stage it depends on did not complete.
    Skipped { reason: String },
}

fn serialize_error<S: Serializer>(error: &RigError, serializer: S) -> Result<S::Ok, S::Error> {
    let mut state = serializer.serialize_struct("RigError", 2)?;
    state.serialize_field("code", error.code())?;
    state.serialize_field("message", &error.to_string())?;
    state.end()
}

impl StageOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, StageOutcome::Completed { .. })
    }
}

/// Report entry for one stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageReport {
    pub stage: Stage,
    #[serde(flatten)]
    pub outcome: StageOutcome,
}

/// Report of a populate run, in stage order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PopulateReport {
    pub stages: Vec<StageReport>,
    /// Number of `Child Of` inverses baked after the stages ran.
    pub baked_inverses: usize,
}

impl PopulateReport {
    /// Returns the outcome recorded for `stage`.
    pub fn outcome(&self, stage: Stage) -> Option<&StageOutcome> {
        self.stages.iter().find(|s| s.stage == stage).map(|s| &s.outcome)
    }

    /// Returns true if `stage` ran to completion.
    pub fn completed(&self, stage: Stage) -> bool {
        self.outcome(stage).is_some_and(StageOutcome::is_completed)
    }

    /// Returns true if every stage completed.
    pub fn is_complete(&self) -> bool {
        self.stages.iter().all(|s| s.outcome.is_completed())
    }

    /// Returns the failed stages with their errors.
    pub fn failures(&self) -> impl Iterator<Item = (Stage, &RigError)> {
        self.stages.iter().filter_map(|s| match &s.outcome {
            StageOutcome::Failed { error } => Some((s.stage, error)),
            _ => None,
        })
    }

    /// Returns the stages that were skipped.
    pub fn skipped(&self) -> impl Iterator<Item = Stage> + '_ {
        self.stages
            .iter()
            .filter(|s| matches!(s.outcome, StageOutcome::Skipped { .. }))
            .map(|s| s.stage)
    }

    /// Total number of bones created by completed stages.
    pub fn bones_added(&self) -> usize {
        self.stages
            .iter()
            .map(|s| match s.outcome {
                StageOutcome::Completed { bones_added, .. } => bones_added,
                _ => 0,
            })
            .sum()
    }

    pub(crate) fn record(&mut self, stage: Stage, outcome: StageOutcome) {
        self.stages.push(StageReport { stage, outcome });
    }
}

impl Serialize for Stage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Side;
    use autorig_armature::ArmatureError;

    fn sample() -> PopulateReport {
        let mut report = PopulateReport::default();
        report.record(
            Stage::Spine,
            StageOutcome::Completed {
                bones_added: 12,
                constraints_added: 2,
                drivers_added: 7,
            },
        );
        report.record(
            Stage::Leg(Side::Left),
            StageOutcome::Failed {
                error: ArmatureError::missing_bone("calf_left_RST").into(),
            },
        );
        report.record(
            Stage::Foot(Side::Left),
            StageOutcome::Skipped {
                reason: "leg.left did not complete".into(),
            },
        );
        report
    }

    #[test]
    fn test_queries() {
        let report = sample();
        assert!(report.completed(Stage::Spine));
        assert!(!report.completed(Stage::Leg(Side::Left)));
        assert!(!report.is_complete());
        assert_eq!(report.bones_added(), 12);
        let failures: Vec<_> = report.failures().map(|(stage, _)| stage).collect();
        assert_eq!(failures, vec![Stage::Leg(Side::Left)]);
        assert_eq!(report.skipped().collect::<Vec<_>>(), vec![Stage::Foot(Side::Left)]);
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["stages"][0]["stage"], "spine");
        assert_eq!(json["stages"][0]["status"], "completed");
        assert_eq!(json["stages"][1]["stage"], "leg.left");
        assert_eq!(json["stages"][1]["error"]["code"], "ARM_003");
        assert_eq!(json["stages"][2]["status"], "skipped");
    }
}
