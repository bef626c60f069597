//! Constraint primitives.

use autorig_armature::channel::axis_flags;
use autorig_armature::constraint::unique_name;
use autorig_armature::mode::check_mode;
use autorig_armature::{
    Armature, ArmatureError, ArmatureResult, AxisLimit, ChildOfInverse, ConstraintId,
    ConstraintKind, Curve, Mode, ObjectChildOf, PoleTarget, RigInstance, Space, TrackAxis,
    XzScaleMode, YScaleMode,
};

use super::logged;

/// A constraint described by bone names, resolved when it is attached.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstraintSpec<'a> {
    CopyRotation {
        target: &'a str,
        axes: [bool; 3],
        space: Space,
    },
    CopyTransforms {
        target: &'a str,
        space: Space,
    },
    Ik {
        target: &'a str,
        /// Pole bone and pole angle in radians.
        pole: Option<(&'a str, f64)>,
        chain_count: u32,
    },
    ChildOf {
        target: &'a str,
        channels: [bool; 9],
    },
    DampedTrack {
        target: &'a str,
        track_axis: TrackAxis,
    },
    LimitRotation {
        limits: [AxisLimit; 3],
        space: Space,
    },
    SplineIk {
        curve: &'a str,
        chain_count: u32,
        fit_curve: bool,
    },
}

impl ConstraintSpec<'_> {
    fn resolve(&self, armature: &Armature) -> ArmatureResult<ConstraintKind> {
        Ok(match *self {
            ConstraintSpec::CopyRotation { target, axes, space } => ConstraintKind::CopyRotation {
                target: armature.bone_id(target)?,
                axes,
                target_space: space,
                owner_space: space,
            },
            ConstraintSpec::CopyTransforms { target, space } => ConstraintKind::CopyTransforms {
                target: armature.bone_id(target)?,
                target_space: space,
            },
            ConstraintSpec::Ik {
                target,
                pole,
                chain_count,
            } => ConstraintKind::Ik {
                target: armature.bone_id(target)?,
                pole: match pole {
                    Some((bone, angle)) => Some(PoleTarget {
                        bone: armature.bone_id(bone)?,
                        angle,
                    }),
                    None => None,
                },
                chain_count,
            },
            ConstraintSpec::ChildOf { target, channels } => ConstraintKind::ChildOf {
                target: armature.bone_id(target)?,
                channels,
                inverse: ChildOfInverse::Pending,
            },
            ConstraintSpec::DampedTrack { target, track_axis } => ConstraintKind::DampedTrack {
                target: armature.bone_id(target)?,
                track_axis,
                head_tail: 1.0,
            },
            ConstraintSpec::LimitRotation { limits, space } => ConstraintKind::LimitRotation {
                limits,
                owner_space: space,
            },
            ConstraintSpec::SplineIk {
                curve,
                chain_count,
                fit_curve,
            } => ConstraintKind::SplineIk {
                curve: curve.to_string(),
                chain_count,
                use_curve_radius: false,
                xz_scale_mode: XzScaleMode::BoneOriginal,
                y_scale_mode: if fit_curve {
                    YScaleMode::FitCurve
                } else {
                    YScaleMode::None
                },
            },
        })
    }
}

/// Attaches one constraint per owner bone, all sharing `spec`.
///
/// A `Child Of` constraint starts with a pending inverse; it must be baked
/// with [`bake_child_of_inverses`] before the rig is evaluated. Requires pose
/// mode.
pub fn attach_constraint<S: AsRef<str>>(
    armature: &mut Armature,
    owners: &[S],
    spec: ConstraintSpec<'_>,
) -> ArmatureResult<Vec<ConstraintId>> {
    logged("attach_constraint", || {
        armature.require_mode("attach_constraint", Mode::Pose)?;
        let kind = spec.resolve(armature)?;
        let owners = armature.bone_ids(owners)?;
        let mut ids = Vec::with_capacity(owners.len());
        for owner in owners {
            let id = armature.add_constraint(owner, kind.clone())?;
            tracing::debug!(
                bone = %armature.name_of(owner),
                constraint = %armature.constraint(id)?.name,
                "Attached constraint"
            );
            ids.push(id);
        }
        Ok(ids)
    })
}

pub fn copy_rotation<S: AsRef<str>>(
    armature: &mut Armature,
    owners: &[S],
    target: &str,
    axes: &[bool],
    space: Space,
) -> ArmatureResult<Vec<ConstraintId>> {
    let axes = logged("copy_rotation", || axis_flags("copy rotation axes", axes))?;
    attach_constraint(armature, owners, ConstraintSpec::CopyRotation { target, axes, space })
}

pub fn copy_transforms<S: AsRef<str>>(
    armature: &mut Armature,
    owners: &[S],
    target: &str,
    space: Space,
) -> ArmatureResult<Vec<ConstraintId>> {
    attach_constraint(armature, owners, ConstraintSpec::CopyTransforms { target, space })
}

/// Attaches an IK constraint and sets the IK axis locks of each owner.
#[allow(clippy::too_many_arguments)]
pub fn ik<S: AsRef<str>>(
    armature: &mut Armature,
    owners: &[S],
    target: &str,
    pole: Option<&str>,
    chain_count: u32,
    pole_angle: f64,
    ik_locks: &[bool],
) -> ArmatureResult<Vec<ConstraintId>> {
    let ik_locks = logged("ik", || axis_flags("ik locks", ik_locks))?;
    let ids = attach_constraint(
        armature,
        owners,
        ConstraintSpec::Ik {
            target,
            pole: pole.map(|p| (p, pole_angle)),
            chain_count,
        },
    )?;
    for id in armature.bone_ids(owners)? {
        armature.bone_mut(id)?.ik_locks = ik_locks;
    }
    Ok(ids)
}

/// Attaches a `Child Of` constraint using the nine channel flags.
pub fn child_of<S: AsRef<str>>(
    armature: &mut Armature,
    owners: &[S],
    target: &str,
    channels: &[bool],
) -> ArmatureResult<Vec<ConstraintId>> {
    let channels = logged("child_of", || channel_flags(channels))?;
    attach_constraint(armature, owners, ConstraintSpec::ChildOf { target, channels })
}

fn channel_flags(channels: &[bool]) -> ArmatureResult<[bool; 9]> {
    channels.try_into().map_err(|_| ArmatureError::InvalidArity {
        what: "child of channels",
        expected: 9,
        got: channels.len(),
    })
}

pub fn damped_track<S: AsRef<str>>(
    armature: &mut Armature,
    owners: &[S],
    target: &str,
    track_axis: TrackAxis,
) -> ArmatureResult<Vec<ConstraintId>> {
    attach_constraint(armature, owners, ConstraintSpec::DampedTrack { target, track_axis })
}

pub fn limit_rotation<S: AsRef<str>>(
    armature: &mut Armature,
    owners: &[S],
    limits: [AxisLimit; 3],
    space: Space,
) -> ArmatureResult<Vec<ConstraintId>> {
    attach_constraint(armature, owners, ConstraintSpec::LimitRotation { limits, space })
}

/// Attaches an object-level `Child Of` constraint to a curve.
///
/// Requires the curve in object mode.
pub fn object_child_of(
    armature: &Armature,
    curve: &mut Curve,
    target: &str,
    channels: &[bool],
) -> ArmatureResult<()> {
    logged("object_child_of", || {
        check_mode("object_child_of", &curve.name, Mode::Object, curve.mode())?;
        let flags = channel_flags(channels)?;
        let subtarget = armature.bone_id(target)?;
        let name = unique_name("Child Of", curve.constraints.iter().map(|c| c.name.as_str()));
        curve.constraints.push(ObjectChildOf {
            name,
            armature: armature.name().to_string(),
            subtarget,
            channels: flags,
            inverse: ChildOfInverse::Pending,
        });
        Ok(())
    })
}

/// Bakes every pending `Child Of` inverse of the rig.
///
/// The stored offset is the owner's rest position relative to the target's
/// head: the owner's head for bones, the first control point for curves.
/// Returns how many inverses were baked. Requires the armature in pose mode.
pub fn bake_child_of_inverses(rig: &mut RigInstance) -> ArmatureResult<usize> {
    logged("bake_child_of_inverses", || {
        let armature = &mut rig.armature;
        armature.require_mode("bake_child_of_inverses", Mode::Pose)?;

        let pending: Vec<(ConstraintId, glam::DVec3)> = armature
            .constraints()
            .iter()
            .filter_map(|c| match c.kind {
                ConstraintKind::ChildOf {
                    target,
                    inverse: ChildOfInverse::Pending,
                    ..
                } => Some((c.id, c.owner, target)),
                _ => None,
            })
            .map(|(id, owner, target)| -> ArmatureResult<_> {
                let offset = armature.bone(owner)?.head - armature.bone(target)?.head;
                Ok((id, offset))
            })
            .collect::<ArmatureResult<_>>()?;

        let mut baked = pending.len();
        for (id, offset) in pending {
            let constraint = armature.constraint_mut(id)?;
            if let ConstraintKind::ChildOf { inverse, .. } = &mut constraint.kind {
                *inverse = ChildOfInverse::Baked { offset };
            }
        }

        for curve in rig.curves.values_mut() {
            let origin = curve.points.first().map(|p| p.co).unwrap_or_default();
            for constraint in &mut curve.constraints {
                if constraint.inverse == ChildOfInverse::Pending {
                    let target = rig.armature.bone(constraint.subtarget)?.head;
                    constraint.inverse = ChildOfInverse::Baked { offset: origin - target };
                    baked += 1;
                }
            }
        }
        tracing::debug!(baked, "Baked Child Of inverses");
        Ok(baked)
    })
}

/// Removes every constraint and driver of the named bones.
///
/// Drivers go first since they reference constraints. Requires pose mode.
pub fn delete_constraints_and_drivers<S: AsRef<str>>(
    armature: &mut Armature,
    names: &[S],
) -> ArmatureResult<usize> {
    logged("delete_constraints_and_drivers", || {
        armature.require_mode("delete_constraints_and_drivers", Mode::Pose)?;
        let mut removed = 0;
        for id in armature.bone_ids(names)? {
            removed += armature.clear_drivers(id);
            removed += armature.clear_constraints(id);
        }
        Ok(removed)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::fixtures::{chain, straight_curve};
    use pretty_assertions::assert_eq;

    fn posed() -> Armature {
        let mut arm = chain();
        arm.set_mode(Mode::Pose).unwrap();
        arm
    }

    #[test]
    fn test_attach_one_per_owner() {
        let mut arm = posed();
        let ids = copy_transforms(&mut arm, &["root_RST", "mid_RST"], "ctrl_HDL", Space::World).unwrap();
        assert_eq!(ids.len(), 2);
        let owners: Vec<String> = ids
            .iter()
            .map(|id| arm.name_of(arm.constraint(*id).unwrap().owner))
            .collect();
        assert_eq!(owners, vec!["root_RST", "mid_RST"]);
    }

    #[test]
    fn test_attach_requires_pose_mode_and_known_target() {
        let mut arm = chain();
        let err = copy_transforms(&mut arm, &["root_RST"], "ctrl_HDL", Space::World).unwrap_err();
        assert_eq!(err.code(), "ARM_007");

        arm.set_mode(Mode::Pose).unwrap();
        let err = copy_transforms(&mut arm, &["root_RST"], "nope_HDL", Space::World).unwrap_err();
        assert_eq!(err, ArmatureError::missing_bone("nope_HDL"));
        assert!(arm.constraints().is_empty());
    }

    #[test]
    fn test_flag_arity() {
        let mut arm = posed();
        let err = copy_rotation(&mut arm, &["mid_RST"], "ctrl_HDL", &[true, true], Space::Local)
            .unwrap_err();
        assert_eq!(
            err,
            ArmatureError::InvalidArity {
                what: "copy rotation axes",
                expected: 3,
                got: 2
            }
        );
        let err = child_of(&mut arm, &["mid_RST"], "ctrl_HDL", &[false; 6]).unwrap_err();
        assert_eq!(err.code(), "ARM_001");
        let err = ik(&mut arm, &["mid_RST"], "end_RST", None, 2, 0.0, &[true; 4]).unwrap_err();
        assert_eq!(err.code(), "ARM_001");
    }

    #[test]
    fn test_ik_sets_axis_locks_and_pole() {
        let mut arm = posed();
        let ids = ik(&mut arm, &["mid_RST"], "end_RST", Some("ctrl_HDL"), 2, 1.5, &[false, true, true])
            .unwrap();
        let constraint = arm.constraint(ids[0]).unwrap();
        assert_eq!(constraint.name, "IK");
        match &constraint.kind {
            ConstraintKind::Ik { pole: Some(pole), chain_count, .. } => {
                assert_eq!(pole.bone, arm.bone_id("ctrl_HDL").unwrap());
                assert_eq!(pole.angle, 1.5);
                assert_eq!(*chain_count, 2);
            }
            other => panic!("unexpected constraint {:?}", other),
        }
        assert_eq!(arm.bone_named("mid_RST").unwrap().ik_locks, [false, true, true]);
    }

    #[test]
    fn test_bake_child_of_inverses() {
        let mut rig = RigInstance {
            armature: posed(),
            curves: Default::default(),
        };
        let curve = straight_curve();
        rig.curves.insert(curve.name.clone(), curve);

        let ids = child_of(&mut rig.armature, &["end_RST"], "ctrl_HDL", &[true; 9]).unwrap();
        let arm = &rig.armature;
        let curve = rig.curves.get_mut("guide_SPL").unwrap();
        object_child_of(arm, curve, "ctrl_HDL", &[true; 9]).unwrap();

        assert_eq!(bake_child_of_inverses(&mut rig).unwrap(), 2);
        match rig.armature.constraint(ids[0]).unwrap().kind {
            ConstraintKind::ChildOf {
                inverse: ChildOfInverse::Baked { offset },
                ..
            } => assert_eq!(offset, glam::DVec3::new(-1.0, 0.0, 2.0)),
            ref other => panic!("unexpected constraint {:?}", other),
        }
        let curve = &rig.curves["guide_SPL"];
        assert_eq!(
            curve.constraints[0].inverse,
            ChildOfInverse::Baked {
                offset: glam::DVec3::new(-1.0, 0.0, 0.0)
            }
        );
        assert_eq!(bake_child_of_inverses(&mut rig).unwrap(), 0);
    }

    #[test]
    fn test_object_child_of_requires_object_mode() {
        let arm = posed();
        let mut curve = straight_curve();
        curve.set_mode(Mode::Edit).unwrap();
        let err = object_child_of(&arm, &mut curve, "ctrl_HDL", &[true; 9]).unwrap_err();
        assert_eq!(err.code(), "ARM_007");
    }

    #[test]
    fn test_delete_constraints_and_drivers() {
        let mut arm = posed();
        copy_transforms(&mut arm, &["mid_RST"], "root_RST", Space::World).unwrap();
        copy_transforms(&mut arm, &["mid_RST"], "ctrl_HDL", Space::World).unwrap();
        copy_transforms(&mut arm, &["end_RST"], "ctrl_HDL", Space::World).unwrap();
        assert_eq!(delete_constraints_and_drivers(&mut arm, &["mid_RST"]).unwrap(), 2);
        assert_eq!(arm.constraints().len(), 1);
    }
}
