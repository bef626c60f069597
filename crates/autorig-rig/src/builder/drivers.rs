//! Driver primitives: switches, visibility and torsion.

use autorig_armature::{
    Armature, ArmatureError, ArmatureResult, Axis, ConstraintId, DriverId, DriverTarget,
    DriverVariable, Mode, Space, SwitchProperty, TransformChannel, TransformRead,
    VariableBinding,
};

use super::{copy_transforms, logged};

/// Attaches a driver writing `target`.
///
/// The expression may only use `+ - * /`, parentheses, numbers and the bound
/// variable names. Requires pose mode.
pub fn attach_driver(
    armature: &mut Armature,
    target: DriverTarget,
    variables: Vec<DriverVariable>,
    expression: &str,
) -> ArmatureResult<DriverId> {
    logged("attach_driver", || {
        armature.require_mode("attach_driver", Mode::Pose)?;
        let id = armature.add_driver(target, variables, expression)?;
        tracing::debug!(?target, expression, "Attached driver");
        Ok(id)
    })
}

/// Drives the visibility of a bone from a switch property bound as `var`.
pub fn add_hide_driver(
    armature: &mut Armature,
    bone: &str,
    switch: SwitchProperty,
    expression: &str,
) -> ArmatureResult<DriverId> {
    let bone = logged("add_hide_driver", || armature.bone_id(bone))?;
    attach_driver(
        armature,
        DriverTarget::BoneHide { bone },
        vec![DriverVariable::new("var", VariableBinding::property(switch))],
        expression,
    )
}

/// The two constraints of a FK/IK switch on one result bone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FkIkSwitch {
    pub fk: ConstraintId,
    pub ik: ConstraintId,
}

/// Makes `result` follow either `fk` or `ik` depending on `switch`.
///
/// Two world-space `Copy Transforms` constraints are driven with `1-var` and
/// `var`, so their influences always sum to one. The FK bone is hidden by
/// `var` and the IK bone by `1-var`.
pub fn create_fk_ik_switch(
    armature: &mut Armature,
    result: &str,
    fk: &str,
    ik: &str,
    switch: SwitchProperty,
) -> ArmatureResult<FkIkSwitch> {
    let fk_constraint = single(copy_transforms(armature, &[result], fk, Space::World)?)?;
    let ik_constraint = single(copy_transforms(armature, &[result], ik, Space::World)?)?;

    let var = || vec![DriverVariable::new("var", VariableBinding::property(switch))];
    attach_driver(
        armature,
        DriverTarget::ConstraintInfluence {
            constraint: fk_constraint,
        },
        var(),
        "1-var",
    )?;
    attach_driver(
        armature,
        DriverTarget::ConstraintInfluence {
            constraint: ik_constraint,
        },
        var(),
        "var",
    )?;

    add_hide_driver(armature, fk, switch, "var")?;
    add_hide_driver(armature, ik, switch, "1-var")?;
    Ok(FkIkSwitch {
        fk: fk_constraint,
        ik: ik_constraint,
    })
}

fn single(ids: Vec<ConstraintId>) -> ArmatureResult<ConstraintId> {
    ids.first().copied().ok_or_else(|| {
        ArmatureError::invalid_parameter("owners", "expected exactly one constraint owner")
    })
}

/// Distributes twist along a chain between the twist of `first` and `last`.
///
/// Every segment's Y rotation is driven from the local Y rotation of both end
/// bones, bound as `var_first` and `var_last`. Segment 0 copies `var_first`;
/// every later segment adds `(var_last - var_first) / (n - 1)`, so the
/// cumulative twist at segment `i` is `t_first + i / (n - 1) * (t_last - t_first)`.
pub fn chain_torsion<S: AsRef<str>>(
    armature: &mut Armature,
    chain: &[S],
    first: &str,
    last: &str,
) -> ArmatureResult<Vec<DriverId>> {
    let (segments, first, last) = logged("chain_torsion", || {
        armature.require_mode("chain_torsion", Mode::Pose)?;
        Ok((armature.bone_ids(chain)?, armature.bone_id(first)?, armature.bone_id(last)?))
    })?;

    let divider = segments.len().saturating_sub(1);
    let mut drivers = Vec::with_capacity(segments.len());
    for (idx, bone) in segments.into_iter().enumerate() {
        let expression = if idx == 0 {
            "var_first".to_string()
        } else {
            format!("-1/{divider}*var_first + 1/{divider}*var_last")
        };
        let twist = |bone| VariableBinding::transform(bone, TransformRead::RotY);
        let variables = vec![
            DriverVariable::new("var_first", twist(first)),
            DriverVariable::new("var_last", twist(last)),
        ];
        drivers.push(attach_driver(
            armature,
            DriverTarget::BoneChannel {
                bone,
                channel: TransformChannel::rotation(Axis::Y),
            },
            variables,
            &expression,
        )?);
    }
    Ok(drivers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::fixtures::chain;
    use autorig_armature::{evaluate, Pose};
    use pretty_assertions::assert_eq;

    fn posed() -> Armature {
        let mut arm = chain();
        arm.set_mode(Mode::Pose).unwrap();
        arm
    }

    #[test]
    fn test_attach_driver_rejects_bad_expressions() {
        let mut arm = posed();
        let bone = arm.bone_id("root_RST").unwrap();
        let target = DriverTarget::BoneHide { bone };
        let var = || vec![DriverVariable::new("var", VariableBinding::property(SwitchProperty::LeftArm))];

        let err = attach_driver(&mut arm, target, var(), "var +").unwrap_err();
        assert_eq!(err.code(), "ARM_011");
        let err = attach_driver(&mut arm, target, var(), "other * 2").unwrap_err();
        assert_eq!(err.code(), "ARM_011");
        assert!(arm.drivers().is_empty());

        arm.set_mode(Mode::Edit).unwrap();
        let err = attach_driver(&mut arm, target, var(), "var").unwrap_err();
        assert_eq!(err.code(), "ARM_007");
    }

    #[test]
    fn test_switch_influences_sum_to_one() {
        let mut arm = posed();
        let switch = create_fk_ik_switch(&mut arm, "end_RST", "root_RST", "ctrl_HDL", SwitchProperty::LeftArm)
            .unwrap();
        assert_eq!(arm.constraint(switch.fk).unwrap().name, "Copy Transforms");
        assert_eq!(arm.constraint(switch.ik).unwrap().name, "Copy Transforms.001");

        let fk_bone = arm.bone_id("root_RST").unwrap();
        let ik_bone = arm.bone_id("ctrl_HDL").unwrap();
        for v in [0.0, 0.3, 1.0] {
            arm.properties_mut().set_switch(SwitchProperty::LeftArm, v);
            let pose = evaluate(&arm).unwrap();
            let fk = pose.influence(switch.fk).unwrap();
            let ik = pose.influence(switch.ik).unwrap();
            assert!((fk + ik - 1.0).abs() < 1e-12);
            assert!((ik - v).abs() < 1e-12);
            assert_eq!(pose.is_hidden(fk_bone), v >= 0.5);
            assert_eq!(pose.is_hidden(ik_bone), 1.0 - v >= 0.5);
        }
    }

    #[test]
    fn test_chain_torsion_interpolates() {
        let mut arm = posed();
        arm.add_bone("twist_a_HDL", glam::DVec3::ZERO, glam::DVec3::Y).unwrap();
        arm.add_bone("twist_b_HDL", glam::DVec3::ZERO, glam::DVec3::Y).unwrap();
        let chain_names = ["root_RST", "mid_RST", "end_RST"];
        chain_torsion(&mut arm, &chain_names, "twist_a_HDL", "twist_b_HDL").unwrap();

        let exprs: Vec<&str> = arm.drivers().iter().map(|d| d.expression.source()).collect();
        assert_eq!(
            exprs,
            vec![
                "var_first",
                "-1/2*var_first + 1/2*var_last",
                "-1/2*var_first + 1/2*var_last"
            ]
        );

        let (t0, t1) = (0.2, 1.4);
        let a = arm.bone_id("twist_a_HDL").unwrap();
        let b = arm.bone_id("twist_b_HDL").unwrap();
        arm.bone_mut(a).unwrap().pose = Pose {
            rotation: [0.0, t0, 0.0],
            ..Pose::default()
        };
        arm.bone_mut(b).unwrap().pose.rotation[1] = t1;
        let pose = evaluate(&arm).unwrap();
        let ids = arm.bone_ids(&chain_names).unwrap();
        let twist = pose.accumulated_twist(&ids);
        for (i, value) in twist.iter().enumerate() {
            let expected = t0 + i as f64 / 2.0 * (t1 - t0);
            assert!((value - expected).abs() < 1e-12, "segment {}: {}", i, value);
        }
    }
}
