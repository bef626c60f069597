//! Drivers: expressions bound to one scalar property.

use serde::{Deserialize, Serialize};

use crate::bone::BoneId;
use crate::channel::{TransformChannel, TransformRead, TransformSpace};
use crate::constraint::ConstraintId;
use crate::error::{ArmatureError, ArmatureResult};
use crate::expression::{Expression, ExpressionError};
use crate::properties::SwitchProperty;

/// Stable driver identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DriverId(pub u32);

/// The property a driver writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DriverTarget {
    /// One pose channel of a bone.
    BoneChannel {
        bone: BoneId,
        channel: TransformChannel,
    },
    /// The influence of a constraint.
    ConstraintInfluence { constraint: ConstraintId },
    /// The visibility flag of a bone. True when the value is at least 0.5.
    BoneHide { bone: BoneId },
}

impl DriverTarget {
    /// Returns the bone whose evaluation this driver belongs to, if any.
    pub fn bone(&self) -> Option<BoneId> {
        match self {
            DriverTarget::BoneChannel { bone, .. } | DriverTarget::BoneHide { bone } => Some(*bone),
            DriverTarget::ConstraintInfluence { .. } => None,
        }
    }
}

/// What a driver variable reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VariableBinding {
    /// A transform component of a bone.
    Transform {
        bone: BoneId,
        read: TransformRead,
        #[serde(default)]
        space: TransformSpace,
    },
    /// A rig property.
    Property { property: SwitchProperty },
}

impl VariableBinding {
    /// Reads the local-space transform of a bone.
    pub fn transform(bone: BoneId, read: TransformRead) -> Self {
        Self::Transform {
            bone,
            read,
            space: TransformSpace::Local,
        }
    }

    /// Reads a switch property.
    pub fn property(property: SwitchProperty) -> Self {
        Self::Property { property }
    }

    /// Returns the bone this binding reads, if any.
    pub fn bone(&self) -> Option<BoneId> {
        match self {
            VariableBinding::Transform { bone, .. } => Some(*bone),
            VariableBinding::Property { .. } => None,
        }
    }
}

/// A named driver variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverVariable {
    pub name: String,
    pub binding: VariableBinding,
}

impl DriverVariable {
    pub fn new(name: impl Into<String>, binding: VariableBinding) -> Self {
        Self {
            name: name.into(),
            binding,
        }
    }
}

/// A driver attached to an armature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Driver {
    pub id: DriverId,
    pub target: DriverTarget,
    pub variables: Vec<DriverVariable>,
    pub expression: Expression,
}

impl Driver {
    /// Checks that every variable the expression references is bound exactly once.
    pub(crate) fn validate(&self) -> ArmatureResult<()> {
        let invalid = |source: ExpressionError| ArmatureError::InvalidExpression {
            expression: self.expression.source().to_string(),
            source,
        };

        for (idx, var) in self.variables.iter().enumerate() {
            if self.variables[..idx].iter().any(|v| v.name == var.name) {
                return Err(invalid(ExpressionError::SyntaxError(format!(
                    "variable '{}' is bound twice",
                    var.name
                ))));
            }
        }

        for name in self.expression.variables() {
            if !self.variables.iter().any(|v| v.name == name) {
                return Err(invalid(ExpressionError::UnknownVariable(name.to_string())));
            }
        }
        Ok(())
    }

    /// Returns the bones read by this driver's variables.
    pub fn read_bones(&self) -> impl Iterator<Item = BoneId> + '_ {
        self.variables.iter().filter_map(|v| v.binding.bone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn driver(expression: &str, variables: Vec<DriverVariable>) -> Driver {
        Driver {
            id: DriverId(0),
            target: DriverTarget::BoneHide { bone: BoneId(0) },
            variables,
            expression: Expression::parse(expression).unwrap(),
        }
    }

    #[test]
    fn test_validate_requires_bound_variables() {
        let var = DriverVariable::new("var", VariableBinding::property(SwitchProperty::LeftArm));
        assert!(driver("1-var", vec![var.clone()]).validate().is_ok());

        let err = driver("1-var_001", vec![var.clone()]).validate().unwrap_err();
        assert_eq!(err.code(), "ARM_011");

        let err = driver("var", vec![var.clone(), var]).validate().unwrap_err();
        assert!(err.to_string().contains("bound twice"));
    }

    #[test]
    fn test_read_bones() {
        let d = driver(
            "var + other",
            vec![
                DriverVariable::new("var", VariableBinding::transform(BoneId(4), TransformRead::RotX)),
                DriverVariable::new("other", VariableBinding::property(SwitchProperty::LeftLeg)),
            ],
        );
        assert_eq!(d.read_bones().collect::<Vec<_>>(), vec![BoneId(4)]);
        assert_eq!(DriverTarget::BoneHide { bone: BoneId(2) }.bone(), Some(BoneId(2)));
    }
}
