//! Spline-bound chains and hook handles.

use autorig_armature::{
    Armature, ArmatureError, ArmatureResult, BoneId, BoneLayer, BoneName, BoneRole, ConstraintKind,
    Curve, HookModifier, Mode, RotationMode, TransformLocks, XzScaleMode, YScaleMode,
};
use glam::DVec3;

use super::logged;

fn chain_name(prefix: &str, index: usize, role: BoneRole) -> String {
    BoneName::new(format!("{}{:02}", prefix, index + 1), role).to_string()
}

fn usable_length(curve: &Curve) -> ArmatureResult<f64> {
    let length = curve.length();
    if curve.points.len() < 2 || length.is_nan() || length <= f64::EPSILON {
        return Err(ArmatureError::invalid_parameter(
            "curve",
            format!("curve '{}' has no usable length", curve.name),
        ));
    }
    Ok(length)
}

/// Builds a `cuts + 1` segment result chain following `curve`.
///
/// Bones are named `{prefix}01_RST`, `{prefix}02_RST`, ... with joints at
/// equal arc-length fractions of the curve, so the rest shape matches the
/// curve. The last bone carries a `Spline IK` constraint over the whole chain.
/// Every channel is locked. Requires edit mode.
pub fn create_spline_chain(
    armature: &mut Armature,
    curve: &Curve,
    cuts: u32,
    prefix: &str,
    fit_curve: bool,
    layer: BoneLayer,
) -> ArmatureResult<Vec<BoneId>> {
    logged("create_spline_chain", || {
        armature.require_mode("create_spline_chain", Mode::Edit)?;
        usable_length(curve)?;
        let count = cuts as usize + 1;
        let names: Vec<String> =
            (0..count).map(|i| chain_name(prefix, i, BoneRole::Result)).collect();
        if let Some(taken) = names.iter().find(|n| armature.contains(n)) {
            return Err(ArmatureError::name_collision(taken.clone()));
        }

        let joints = (0..=count)
            .map(|i| curve.point_at_fraction(i as f64 / count as f64))
            .collect::<ArmatureResult<Vec<DVec3>>>()?;

        let mut chain: Vec<BoneId> = Vec::with_capacity(count);
        for (i, name) in names.iter().enumerate() {
            let id = armature.add_bone(name, joints[i], joints[i + 1])?;
            let bone = armature.bone_mut(id)?;
            bone.layer = layer;
            bone.deletable = true;
            bone.rotation_mode = RotationMode::Xyz;
            bone.locks = TransformLocks::ALL;
            if let Some(previous) = chain.last().copied() {
                armature.set_parent(id, Some(previous), true)?;
            }
            chain.push(id);
        }

        let last = chain[chain.len() - 1];
        armature.add_constraint(
            last,
            ConstraintKind::SplineIk {
                curve: curve.name.clone(),
                chain_count: cuts + 1,
                use_curve_radius: false,
                xz_scale_mode: XzScaleMode::BoneOriginal,
                y_scale_mode: if fit_curve {
                    YScaleMode::FitCurve
                } else {
                    YScaleMode::None
                },
            },
        )?;
        tracing::debug!(curve = %curve.name, bones = chain.len(), "Created spline chain");
        Ok(chain)
    })
}

/// Creates one handle bone per control point of `curve` and hooks the point
/// to it.
///
/// Handles are named `{prefix}01_HDL`, ... and point along +Z with length
/// `curve length / (2 * point count)`. Location and rotation stay free.
/// Each hook modifier is named after its handle. Requires the armature in
/// edit mode.
pub fn create_spline_hooks(
    armature: &mut Armature,
    curve: &mut Curve,
    prefix: &str,
    layer: BoneLayer,
) -> ArmatureResult<Vec<BoneId>> {
    logged("create_spline_hooks", || {
        armature.require_mode("create_spline_hooks", Mode::Edit)?;
        let length = usable_length(curve)? / (curve.points.len() as f64 * 2.0);
        let names: Vec<String> = (0..curve.points.len())
            .map(|i| chain_name(prefix, i, BoneRole::Handle))
            .collect();
        for name in &names {
            if armature.contains(name) || curve.modifiers.iter().any(|m| &m.name == name) {
                return Err(ArmatureError::name_collision(name.clone()));
            }
        }

        let mut handles = Vec::with_capacity(names.len());
        for (idx, name) in names.into_iter().enumerate() {
            let co = curve.points[idx].co;
            let id = armature.add_bone(&name, co, co + DVec3::Z * length)?;
            let bone = armature.bone_mut(id)?;
            bone.layer = layer;
            bone.deletable = true;
            bone.rotation_mode = RotationMode::Xyz;
            bone.locks = TransformLocks::LOCATION_ROTATION_FREE;
            curve.modifiers.push(HookModifier {
                name,
                armature: armature.name().to_string(),
                subtarget: id,
                points: vec![idx],
            });
            handles.push(id);
        }
        tracing::debug!(curve = %curve.name, handles = handles.len(), "Created spline hooks");
        Ok(handles)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::fixtures::{chain, straight_curve};
    use autorig_armature::BezierPoint;
    use pretty_assertions::assert_eq;

    fn layer(index: u8) -> BoneLayer {
        BoneLayer::new(index).unwrap()
    }

    #[test]
    fn test_spline_chain_follows_curve() {
        let mut arm = chain();
        let curve = straight_curve();
        let bones = create_spline_chain(&mut arm, &curve, 3, "spine", false, layer(23)).unwrap();
        let names: Vec<String> = bones.iter().map(|b| arm.name_of(*b)).collect();
        assert_eq!(names, vec!["spine01_RST", "spine02_RST", "spine03_RST", "spine04_RST"]);

        for (i, id) in bones.iter().enumerate() {
            let bone = arm.bone(*id).unwrap();
            assert!((bone.head.z - 0.5 * i as f64).abs() < 1e-9);
            assert!((bone.length() - 0.5).abs() < 1e-9);
            assert_eq!(bone.locks, TransformLocks::ALL);
            assert_eq!(bone.layer.index(), 23);
        }
        assert_eq!(arm.bone(bones[2]).unwrap().parent, Some(bones[1]));

        let constraints: Vec<_> = arm.constraints_of(bones[3]).collect();
        assert_eq!(constraints.len(), 1);
        assert_eq!(
            constraints[0].kind,
            ConstraintKind::SplineIk {
                curve: "guide_SPL".into(),
                chain_count: 4,
                use_curve_radius: false,
                xz_scale_mode: XzScaleMode::BoneOriginal,
                y_scale_mode: YScaleMode::None,
            }
        );
    }

    #[test]
    fn test_spline_chain_rejects_degenerate_curve() {
        let mut arm = chain();
        let curve = Curve::new("dot_SPL", vec![BezierPoint::new(DVec3::ZERO); 2]);
        let err = create_spline_chain(&mut arm, &curve, 2, "spine", true, layer(23)).unwrap_err();
        assert_eq!(err.code(), "ARM_014");
        assert_eq!(arm.bone_count(), 4);
    }

    #[test]
    fn test_spline_hooks() {
        let mut arm = chain();
        let mut curve = straight_curve();
        let handles = create_spline_hooks(&mut arm, &mut curve, "spine", layer(16)).unwrap();
        assert_eq!(handles.len(), 3);

        let last = arm.bone(handles[2]).unwrap();
        assert_eq!(last.name, "spine03_HDL");
        assert_eq!(last.head, DVec3::new(0.0, 0.0, 2.0));
        assert!((last.length() - 2.0 / 6.0).abs() < 1e-9);
        assert_eq!(last.locks, TransformLocks::LOCATION_ROTATION_FREE);

        assert_eq!(curve.modifiers.len(), 3);
        assert_eq!(curve.modifiers[1].name, "spine02_HDL");
        assert_eq!(curve.modifiers[1].subtarget, handles[1]);
        assert_eq!(curve.modifiers[1].points, vec![1]);

        let err = create_spline_hooks(&mut arm, &mut curve, "spine", layer(16)).unwrap_err();
        assert_eq!(err, ArmatureError::name_collision("spine01_HDL"));
    }
}
