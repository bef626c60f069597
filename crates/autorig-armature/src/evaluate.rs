//! Pose evaluation of drivers and channel-space constraints.
//!
//! Bones are evaluated in dependency order. A bone depends on every bone its
//! drivers read and every bone its `Copy Rotation` / `Copy Transforms`
//! constraints copy from. Within a bone, drivers run first in creation order,
//! then the constraint stack runs top to bottom with influence blending.
//! Each constraint blends from the output of the one above it, as the host
//! stacks them: an FK/IK switch at `v` gives `(1-v)^2 * fk + v * ik` over an
//! unposed result bone, not the linear mix of its two inputs.
//! `IK`, `Child Of`, `Damped Track` and `Spline IK` are solver descriptors
//! and leave channel values unchanged.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use serde::Serialize;

use crate::armature::Armature;
use crate::bone::BoneId;
use crate::channel::{TransformChannel, TransformRead, TransformSpace};
use crate::constraint::{ChildOfInverse, ConstraintId, ConstraintKind};
use crate::driver::{Driver, DriverId, DriverTarget, VariableBinding};
use crate::error::{ArmatureError, ArmatureResult};
use crate::expression::ExpressionError;

/// Result of evaluating an armature.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EvaluatedPose {
    /// Final channel values per bone, in lock-flag order.
    pub channels: BTreeMap<BoneId, [f64; 9]>,
    /// Final visibility per bone.
    pub hidden: BTreeMap<BoneId, bool>,
    /// Final influence per constraint.
    pub influences: BTreeMap<ConstraintId, f64>,
    /// Drivers whose evaluation failed and were skipped.
    pub invalid_drivers: Vec<DriverId>,
    /// Bones in the order they were evaluated.
    pub order: Vec<BoneId>,
}

impl EvaluatedPose {
    /// Returns the evaluated value of one channel.
    pub fn value(&self, bone: BoneId, channel: TransformChannel) -> Option<f64> {
        self.channels.get(&bone).map(|c| c[channel.flag_index()])
    }

    /// Returns whether a bone is hidden.
    pub fn is_hidden(&self, bone: BoneId) -> bool {
        self.hidden.get(&bone).copied().unwrap_or(false)
    }

    /// Returns the evaluated influence of a constraint.
    pub fn influence(&self, constraint: ConstraintId) -> Option<f64> {
        self.influences.get(&constraint).copied()
    }

    /// Returns the cumulative local Y rotation along a chain.
    ///
    /// Entry `i` is the twist of bone `i` relative to the chain's parent.
    pub fn accumulated_twist(&self, chain: &[BoneId]) -> Vec<f64> {
        let y = TransformChannel::rotation(crate::channel::Axis::Y);
        chain
            .iter()
            .scan(0.0, |total, bone| {
                *total += self.value(*bone, y).unwrap_or(0.0);
                Some(*total)
            })
            .collect()
    }
}

fn read_value(values: &[f64; 9], read: TransformRead) -> f64 {
    let channels = read.channels();
    let sum: f64 = channels.iter().map(|c| values[c.flag_index()]).sum();
    sum / channels.len() as f64
}

/// Returns the bone whose evaluation step runs this driver.
fn driver_owner(armature: &Armature, driver: &Driver) -> Option<BoneId> {
    match driver.target {
        DriverTarget::BoneChannel { bone, .. } | DriverTarget::BoneHide { bone } => Some(bone),
        DriverTarget::ConstraintInfluence { constraint } => {
            armature.constraint(constraint).ok().map(|c| c.owner)
        }
    }
}

/// Orders bones so that every bone comes after the bones it reads.
fn dependency_order(armature: &Armature) -> ArmatureResult<Vec<BoneId>> {
    let mut deps: HashMap<BoneId, BTreeSet<BoneId>> = armature
        .bones()
        .map(|b| (b.id, BTreeSet::new()))
        .collect();

    for driver in armature.drivers() {
        if let Some(owner) = driver_owner(armature, driver) {
            for read in driver.read_bones().filter(|b| *b != owner) {
                deps.entry(owner).or_default().insert(read);
            }
        }
    }
    for constraint in armature.constraints() {
        if let Some(source) = constraint.kind.channel_source() {
            if source != constraint.owner {
                deps.entry(constraint.owner).or_default().insert(source);
            }
        }
    }

    let mut dependents: HashMap<BoneId, Vec<BoneId>> = HashMap::new();
    let mut pending: BTreeMap<BoneId, usize> = BTreeMap::new();
    for (bone, reads) in &deps {
        pending.insert(*bone, reads.len());
        for read in reads {
            dependents.entry(*read).or_default().push(*bone);
        }
    }

    let mut ready: VecDeque<BoneId> = pending
        .iter()
        .filter(|(_, n)| **n == 0)
        .map(|(b, _)| *b)
        .collect();
    let mut order = Vec::with_capacity(pending.len());

    while let Some(bone) = ready.pop_front() {
        order.push(bone);
        let mut unlocked: Vec<BoneId> = Vec::new();
        for dependent in dependents.get(&bone).into_iter().flatten() {
            if let Some(n) = pending.get_mut(dependent) {
                *n -= 1;
                if *n == 0 {
                    unlocked.push(*dependent);
                }
            }
        }
        unlocked.sort();
        ready.extend(unlocked);
    }

    if order.len() < pending.len() {
        let done: BTreeSet<BoneId> = order.iter().copied().collect();
        let bones = pending
            .keys()
            .filter(|b| !done.contains(b))
            .map(|b| armature.name_of(*b))
            .collect();
        return Err(ArmatureError::DriverCycle { bones });
    }
    Ok(order)
}

/// Evaluates every driver and channel-space constraint of an armature.
///
/// Fails with `PendingInverse` if a `Child Of` inverse has not been baked, and
/// with `DriverCycle` if bones read each other in a loop. A driver that fails
/// to evaluate is logged, skipped and listed in `invalid_drivers`.
pub fn evaluate(armature: &Armature) -> ArmatureResult<EvaluatedPose> {
    for constraint in armature.constraints() {
        if let ConstraintKind::ChildOf {
            inverse: ChildOfInverse::Pending,
            ..
        } = constraint.kind
        {
            return Err(ArmatureError::PendingInverse {
                bone: armature.name_of(constraint.owner),
                constraint: constraint.name.clone(),
            });
        }
    }

    let order = dependency_order(armature)?;
    let properties = armature.properties();
    let mut pose = EvaluatedPose::default();

    for bone_id in &order {
        let bone = armature.bone(*bone_id)?;
        let mut values = bone.pose.as_array();
        let mut hidden = bone.hide;
        let mut influences: HashMap<ConstraintId, f64> = armature
            .constraints_of(*bone_id)
            .map(|c| (c.id, c.influence))
            .collect();

        for driver in armature.drivers() {
            if driver_owner(armature, driver) != Some(*bone_id) {
                continue;
            }

            let lookup = |name: &str| -> Option<f64> {
                let var = driver.variables.iter().find(|v| v.name == name)?;
                Some(match var.binding {
                    VariableBinding::Property { property } => properties.switch(property),
                    VariableBinding::Transform { bone, read, space } => {
                        let raw = || armature.bone(bone).map(|b| b.pose.as_array()).ok();
                        let source = match space {
                            TransformSpace::Transform => raw()?,
                            TransformSpace::Local | TransformSpace::World => {
                                match pose.channels.get(&bone) {
                                    Some(evaluated) => *evaluated,
                                    None => raw()?,
                                }
                            }
                        };
                        read_value(&source, read)
                    }
                })
            };

            let value = match driver.expression.evaluate(lookup) {
                Ok(v) if v.is_finite() => v,
                Ok(v) => {
                    let err = ExpressionError::SyntaxError(format!("non-finite result {}", v));
                    record_invalid(&mut pose, armature, driver, err);
                    continue;
                }
                Err(err) => {
                    record_invalid(&mut pose, armature, driver, err);
                    continue;
                }
            };

            match driver.target {
                DriverTarget::BoneChannel { channel, .. } => values[channel.flag_index()] = value,
                DriverTarget::BoneHide { .. } => hidden = value >= 0.5,
                DriverTarget::ConstraintInfluence { constraint } => {
                    influences.insert(constraint, value.clamp(0.0, 1.0));
                }
            }
        }

        for constraint in armature.constraints_of(*bone_id) {
            let influence = influences.get(&constraint.id).copied().unwrap_or(1.0);
            pose.influences.insert(constraint.id, influence);

            match &constraint.kind {
                ConstraintKind::CopyRotation { target, axes, .. } => {
                    let source = pose.channels.get(target).copied().unwrap_or_default();
                    for (axis, used) in axes.iter().enumerate() {
                        if *used {
                            let idx = 3 + axis;
                            values[idx] = lerp(values[idx], source[idx], influence);
                        }
                    }
                }
                ConstraintKind::CopyTransforms { target, .. } => {
                    let source = pose.channels.get(target).copied().unwrap_or_default();
                    for idx in 0..9 {
                        values[idx] = lerp(values[idx], source[idx], influence);
                    }
                }
                ConstraintKind::LimitRotation { limits, .. } => {
                    for (axis, limit) in limits.iter().enumerate() {
                        let idx = 3 + axis;
                        values[idx] = lerp(values[idx], limit.apply(values[idx]), influence);
                    }
                }
                ConstraintKind::Ik { .. }
                | ConstraintKind::ChildOf { .. }
                | ConstraintKind::DampedTrack { .. }
                | ConstraintKind::SplineIk { .. } => {}
            }
        }

        pose.channels.insert(*bone_id, values);
        pose.hidden.insert(*bone_id, hidden);
    }

    pose.order = order;
    Ok(pose)
}

fn record_invalid(
    pose: &mut EvaluatedPose,
    armature: &Armature,
    driver: &Driver,
    err: ExpressionError,
) {
    tracing::warn!(
        armature = armature.name(),
        driver = driver.id.0,
        expression = driver.expression.source(),
        "Driver evaluation failed: {}",
        err
    );
    pose.invalid_drivers.push(driver.id);
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::Axis;
    use crate::constraint::{AxisLimit, Space};
    use crate::driver::DriverVariable;
    use crate::properties::SwitchProperty;
    use glam::DVec3;

    const ROT_X: TransformChannel = TransformChannel::rotation(Axis::X);
    const ROT_Y: TransformChannel = TransformChannel::rotation(Axis::Y);

    fn two_bones() -> (Armature, BoneId, BoneId) {
        let mut arm = Armature::new("rig");
        let a = arm.add_bone("a_HDL", DVec3::ZERO, DVec3::Z).unwrap();
        let b = arm.add_bone("b_RST", DVec3::Z, DVec3::Z * 2.0).unwrap();
        (arm, a, b)
    }

    #[test]
    fn test_driver_reads_evaluated_source() {
        let (mut arm, a, b) = two_bones();
        arm.add_driver(
            DriverTarget::BoneChannel { bone: b, channel: ROT_X },
            vec![DriverVariable::new("var", VariableBinding::transform(a, TransformRead::RotX))],
            "2.0*var",
        )
        .unwrap();
        arm.keyframe(a, ROT_X, 0.5).unwrap();

        let pose = evaluate(&arm).unwrap();
        assert_eq!(pose.value(b, ROT_X), Some(1.0));
        assert_eq!(pose.order, vec![a, b]);
    }

    #[test]
    fn test_copy_transforms_influence_blend() {
        let (mut arm, a, b) = two_bones();
        let con = arm
            .add_constraint(
                b,
                ConstraintKind::CopyTransforms {
                    target: a,
                    target_space: Space::World,
                },
            )
            .unwrap();
        arm.add_driver(
            DriverTarget::ConstraintInfluence { constraint: con },
            vec![DriverVariable::new("var", VariableBinding::property(SwitchProperty::LeftLeg))],
            "var",
        )
        .unwrap();
        arm.keyframe(a, ROT_Y, 1.0).unwrap();
        arm.properties_mut().set_switch(SwitchProperty::LeftLeg, 0.25);

        let pose = evaluate(&arm).unwrap();
        assert_eq!(pose.influence(con), Some(0.25));
        assert_eq!(pose.value(b, ROT_Y), Some(0.25));
    }

    #[test]
    fn test_limit_rotation_clamps() {
        let (mut arm, a, _) = two_bones();
        arm.add_constraint(
            a,
            ConstraintKind::LimitRotation {
                limits: [AxisLimit::new(-1.0, 0.0), AxisLimit::default(), AxisLimit::default()],
                owner_space: Space::Local,
            },
        )
        .unwrap();
        arm.keyframe(a, ROT_X, 2.0).unwrap();
        assert_eq!(evaluate(&arm).unwrap().value(a, ROT_X), Some(0.0));
        arm.keyframe(a, ROT_X, -3.0).unwrap();
        assert_eq!(evaluate(&arm).unwrap().value(a, ROT_X), Some(-1.0));
    }

    #[test]
    fn test_cycle_is_reported() {
        let (mut arm, a, b) = two_bones();
        arm.add_driver(
            DriverTarget::BoneChannel { bone: b, channel: ROT_X },
            vec![DriverVariable::new("var", VariableBinding::transform(a, TransformRead::RotX))],
            "var",
        )
        .unwrap();
        arm.add_driver(
            DriverTarget::BoneChannel { bone: a, channel: ROT_X },
            vec![DriverVariable::new("var", VariableBinding::transform(b, TransformRead::RotX))],
            "var",
        )
        .unwrap();
        let err = evaluate(&arm).unwrap_err();
        assert_eq!(
            err,
            ArmatureError::DriverCycle {
                bones: vec!["a_HDL".into(), "b_RST".into()]
            }
        );
    }

    #[test]
    fn test_pending_child_of_blocks_evaluation() {
        let (mut arm, a, b) = two_bones();
        arm.add_constraint(
            b,
            ConstraintKind::ChildOf {
                target: a,
                channels: [true; 9],
                inverse: ChildOfInverse::Pending,
            },
        )
        .unwrap();
        assert_eq!(evaluate(&arm).unwrap_err().code(), "ARM_013");
    }

    #[test]
    fn test_failing_driver_is_skipped() {
        let (mut arm, a, b) = two_bones();
        arm.add_driver(
            DriverTarget::BoneHide { bone: b },
            vec![DriverVariable::new("var", VariableBinding::transform(a, TransformRead::RotX))],
            "1/var",
        )
        .unwrap();
        let pose = evaluate(&arm).unwrap();
        assert_eq!(pose.invalid_drivers.len(), 1);
        assert!(!pose.is_hidden(b));
    }

    #[test]
    fn test_accumulated_twist() {
        let (mut arm, a, b) = two_bones();
        arm.keyframe(a, ROT_Y, 0.2).unwrap();
        arm.keyframe(b, ROT_Y, 0.3).unwrap();
        let twist = evaluate(&arm).unwrap().accumulated_twist(&[a, b]);
        assert!((twist[0] - 0.2).abs() < 1e-12);
        assert!((twist[1] - 0.5).abs() < 1e-12);
    }
}
