//! Error types for armature editing and evaluation.

use thiserror::Error;

use crate::expression::ExpressionError;
use crate::mode::Mode;

/// Result type for armature operations.
pub type ArmatureResult<T> = Result<T, ArmatureError>;

/// Errors that can occur while editing or evaluating an armature.
///
/// Every variant is detected at the call that caused it; the call is aborted
/// and nothing is retried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ArmatureError {
    /// A flag array had the wrong number of elements.
    #[error("invalid arity for {what}: expected {expected} elements, got {got}")]
    InvalidArity {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    /// A mode string was not a member of its enumeration.
    #[error("invalid {what} '{value}', expected one of: {expected}")]
    InvalidEnum {
        what: &'static str,
        value: String,
        expected: &'static str,
    },

    /// A bone name did not resolve.
    #[error("bone '{name}' not found in armature")]
    MissingBone { name: String },

    /// An object name did not resolve.
    #[error("object '{name}' not found")]
    MissingObject { name: String },

    /// A new name is already taken.
    #[error("name '{name}' already exists")]
    NameCollision { name: String },

    /// The object cannot enter the requested mode.
    #[error("object '{object}' cannot enter {requested} mode")]
    InvalidModeTransition { object: String, requested: Mode },

    /// The operation was called with the object in the wrong mode.
    #[error("'{operation}' requires {required} mode, but '{object}' is in {actual} mode")]
    WrongMode {
        operation: &'static str,
        object: String,
        required: Mode,
        actual: Mode,
    },

    /// Parenting would turn the hierarchy into something other than a tree.
    #[error("parenting '{child}' to '{parent}' would create a cycle")]
    HierarchyCycle { child: String, parent: String },

    /// An external keyframe was written to a locked channel.
    #[error("channel {channel} of bone '{bone}' is locked")]
    LockedChannel { bone: String, channel: String },

    /// A bone layer outside of the 32 available layers.
    #[error("layer {0} is not in range 0..32")]
    InvalidLayer(u8),

    /// A driver expression failed to parse or references unbound variables.
    #[error("invalid driver expression '{expression}': {source}")]
    InvalidExpression {
        expression: String,
        #[source]
        source: ExpressionError,
    },

    /// Drivers and constraints read each other in a loop.
    #[error("dependency cycle between bones: {}", bones.join(", "))]
    DriverCycle { bones: Vec<String> },

    /// A `Child Of` constraint was evaluated before its inverse was baked.
    #[error("'{constraint}' on bone '{bone}' has a pending inverse")]
    PendingInverse { bone: String, constraint: String },

    /// A numeric parameter outside of its accepted range.
    #[error("invalid parameter {name}: {message}")]
    InvalidParameter { name: &'static str, message: String },
}

impl ArmatureError {
    /// Creates a missing bone error.
    pub fn missing_bone(name: impl Into<String>) -> Self {
        Self::MissingBone { name: name.into() }
    }

    /// Creates a missing object error.
    pub fn missing_object(name: impl Into<String>) -> Self {
        Self::MissingObject { name: name.into() }
    }

    /// Creates a name collision error.
    pub fn name_collision(name: impl Into<String>) -> Self {
        Self::NameCollision { name: name.into() }
    }

    /// Creates an invalid parameter error.
    pub fn invalid_parameter(name: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            message: message.into(),
        }
    }

    /// Returns the stable error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            ArmatureError::InvalidArity { .. } => "ARM_001",
            ArmatureError::InvalidEnum { .. } => "ARM_002",
            ArmatureError::MissingBone { .. } => "ARM_003",
            ArmatureError::MissingObject { .. } => "ARM_004",
            ArmatureError::NameCollision { .. } => "ARM_005",
            ArmatureError::InvalidModeTransition { .. } => "ARM_006",
            ArmatureError::WrongMode { .. } => "ARM_007",
            ArmatureError::HierarchyCycle { .. } => "ARM_008",
            ArmatureError::LockedChannel { .. } => "ARM_009",
            ArmatureError::InvalidLayer(_) => "ARM_010",
            ArmatureError::InvalidExpression { .. } => "ARM_011",
            ArmatureError::DriverCycle { .. } => "ARM_012",
            ArmatureError::PendingInverse { .. } => "ARM_013",
            ArmatureError::InvalidParameter { .. } => "ARM_014",
        }
    }

    /// Returns true for name lookup failures (a template entry is absent).
    pub fn is_missing_name(&self) -> bool {
        matches!(
            self,
            ArmatureError::MissingBone { .. } | ArmatureError::MissingObject { .. }
        )
    }
}
