//! Object interaction modes.
//!
//! Structural edits (creating, removing, parenting and reshaping bones) are
//! valid in [`Mode::Edit`]. Pose data (locks, rotation modes, constraints and
//! drivers) is valid in [`Mode::Pose`]. Operations check the mode they need
//! and fail instead of switching on the caller's behalf.

use serde::{Deserialize, Serialize};

use crate::error::{ArmatureError, ArmatureResult};

/// Interaction mode of a scene object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Object mode.
    #[default]
    Object,
    /// Edit mode (rest geometry and hierarchy).
    Edit,
    /// Pose mode (armatures only).
    Pose,
}

impl Mode {
    /// Returns the host mode identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Object => "OBJECT",
            Mode::Edit => "EDIT",
            Mode::Pose => "POSE",
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of scene object, which determines the modes it supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Armature,
    Curve,
}

impl ObjectKind {
    /// Returns true if objects of this kind can enter `mode`.
    pub fn supports(&self, mode: Mode) -> bool {
        match self {
            ObjectKind::Armature => true,
            ObjectKind::Curve => mode != Mode::Pose,
        }
    }
}

/// Validates a mode transition for a named object.
pub fn check_transition(kind: ObjectKind, object: &str, mode: Mode) -> ArmatureResult<()> {
    if kind.supports(mode) {
        Ok(())
    } else {
        Err(ArmatureError::InvalidModeTransition {
            object: object.to_string(),
            requested: mode,
        })
    }
}

/// Checks that an object is in the mode an operation requires.
pub fn check_mode(
    operation: &'static str,
    object: &str,
    required: Mode,
    actual: Mode,
) -> ArmatureResult<()> {
    if required == actual {
        Ok(())
    } else {
        Err(ArmatureError::WrongMode {
            operation,
            object: object.to_string(),
            required,
            actual,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_curve_cannot_enter_pose_mode() {
        assert!(ObjectKind::Curve.supports(Mode::Edit));
        assert!(!ObjectKind::Curve.supports(Mode::Pose));
        assert!(ObjectKind::Armature.supports(Mode::Pose));

        let err = check_transition(ObjectKind::Curve, "spine_SPL", Mode::Pose).unwrap_err();
        assert_eq!(err.code(), "ARM_006");
    }

    #[test]
    fn test_check_mode() {
        assert!(check_mode("lock_transforms", "rig", Mode::Pose, Mode::Pose).is_ok());
        let err = check_mode("lock_transforms", "rig", Mode::Pose, Mode::Edit).unwrap_err();
        assert_eq!(
            err.to_string(),
            "'lock_transforms' requires POSE mode, but 'rig' is in EDIT mode"
        );
    }
}
