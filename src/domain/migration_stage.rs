//! Migration run stages and the rules for moving between them.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MigrationStage {
    Start,
    SchemaEnsured,
    ConstraintsReconciled,
    Backfilled,
    NullabilityTightened,
    Done,
}

impl MigrationStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "START",
            Self::SchemaEnsured => "SCHEMA_ENSURED",
            Self::ConstraintsReconciled => "CONSTRAINTS_RECONCILED",
            Self::Backfilled => "BACKFILLED",
            Self::NullabilityTightened => "NULLABILITY_TIGHTENED",
            Self::Done => "DONE",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "START" => Some(Self::Start),
            "SCHEMA_ENSURED" => Some(Self::SchemaEnsured),
            "CONSTRAINTS_RECONCILED" => Some(Self::ConstraintsReconciled),
            "BACKFILLED" => Some(Self::Backfilled),
            "NULLABILITY_TIGHTENED" => Some(Self::NullabilityTightened),
            "DONE" => Some(Self::Done),
            _ => None,
        }
    }

    pub fn all() -> &'static [Self] {
        &[
            Self::Start,
            Self::SchemaEnsured,
            Self::ConstraintsReconciled,
            Self::Backfilled,
            Self::NullabilityTightened,
            Self::Done,
        ]
    }

    /// The stage reached after this one completes. `Done` is terminal.
    pub fn next(&self) -> Option<Self> {
        match self {
            Self::Start => Some(Self::SchemaEnsured),
            Self::SchemaEnsured => Some(Self::ConstraintsReconciled),
            Self::ConstraintsReconciled => Some(Self::Backfilled),
            Self::Backfilled => Some(Self::NullabilityTightened),
            Self::NullabilityTightened => Some(Self::Done),
            Self::Done => None,
        }
    }
}

impl fmt::Display for MigrationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Legal stage transitions for a single run.
pub struct StageMachine;

impl StageMachine {
    /// Stages only move forward one step at a time; a restart always begins at `Start`.
    pub fn can_transition(from: MigrationStage, to: MigrationStage) -> bool {
        from.next() == Some(to) || (to == MigrationStage::Start && from != MigrationStage::Start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_walk_forward_to_done() {
        let mut stage = MigrationStage::Start;
        let mut seen = vec![stage];
        while let Some(next) = stage.next() {
            assert!(StageMachine::can_transition(stage, next));
            stage = next;
            seen.push(stage);
        }
        assert_eq!(seen, MigrationStage::all());
    }

    #[test]
    fn skipping_a_stage_is_rejected() {
        assert!(!StageMachine::can_transition(
            MigrationStage::SchemaEnsured,
            MigrationStage::Backfilled
        ));
        assert!(!StageMachine::can_transition(
            MigrationStage::Done,
            MigrationStage::Done
        ));
    }

    #[test]
    fn restart_from_any_stage() {
        assert!(StageMachine::can_transition(
            MigrationStage::Backfilled,
            MigrationStage::Start
        ));
        assert!(!StageMachine::can_transition(
            MigrationStage::Start,
            MigrationStage::Start
        ));
    }

    #[test]
    fn as_str_roundtrips() {
        for stage in MigrationStage::all() {
            assert_eq!(MigrationStage::from_str(stage.as_str()), Some(*stage));
        }
    }
}
