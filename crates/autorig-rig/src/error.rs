//! Error types for rig building and the rig operators.

use autorig_armature::{ArmatureError, ProductionState};
use thiserror::Error;

/// Result type for rig operations.
pub type RigResult<T> = Result<T, RigError>;

/// Errors that can occur while building or managing a rig.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RigError {
    /// A builder primitive failed.
    #[error(transparent)]
    Armature(#[from] ArmatureError),

    /// A required curve guide object is absent.
    #[error("curve '{name}' not found in rig")]
    MissingCurve { name: String },

    /// An operator that needs an active rig was called without one.
    #[error("no active rig")]
    NoActiveRig,

    /// The rig is in a production state the operator does not accept.
    #[error("cannot {operation} a rig in {state} state")]
    InvalidState {
        operation: &'static str,
        state: ProductionState,
    },

    /// The rig configuration is invalid.
    #[error("invalid rig config: {0}")]
    Config(String),
}

impl RigError {
    /// Returns the stable error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            RigError::Armature(err) => err.code(),
            RigError::MissingCurve { .. } => "RIG_001",
            RigError::NoActiveRig => "RIG_002",
            RigError::InvalidState { .. } => "RIG_003",
            RigError::Config(_) => "RIG_004",
        }
    }

    /// Returns true for name lookup failures of template entries.
    pub fn is_missing_name(&self) -> bool {
        match self {
            RigError::Armature(err) => err.is_missing_name(),
            RigError::MissingCurve { .. } => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_and_messages() {
        let err: RigError = ArmatureError::missing_bone("toe_left_RST").into();
        assert_eq!(err.code(), "ARM_003");
        assert_eq!(err.to_string(), "bone 'toe_left_RST' not found in armature");
        assert!(err.is_missing_name());

        let err = RigError::InvalidState {
            operation: "populate",
            state: ProductionState::Ready,
        };
        assert_eq!(err.to_string(), "cannot populate a rig in READY state");
        assert_eq!(err.code(), "RIG_003");
        assert!(!RigError::NoActiveRig.is_missing_name());
    }
}
