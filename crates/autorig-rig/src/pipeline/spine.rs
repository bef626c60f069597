//! Spline-driven spine.

use autorig_armature::{InheritScale, Mode, RigInstance, TransformLocks};

use crate::builder::{
    chain_torsion, child_of, create_spline_chain, create_spline_hooks, duplicate_bones,
    lock_transforms, object_child_of, parent_bones,
};
use crate::config::RigConfig;
use crate::error::{RigError, RigResult};

pub(crate) const PREFIX: &str = "spine";
const HIPS: &str = "hips_location_HDL";

/// Hips and the chain root follow the first hook only in location and rotation.
const ROOT_FOLLOW: [bool; 9] = [true, true, true, true, true, true, false, false, false];
const MIDDLE_HANDLE_LOCKS: [bool; 9] = [false, false, false, false, true, false, true, true, true];

/// Bones the spine stage hands to the stages built on top of it.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SpineChain {
    /// Result chain, root first.
    pub result: Vec<String>,
    /// One hook handle per curve point.
    pub handles: Vec<String>,
}

impl SpineChain {
    pub fn root(&self) -> &str {
        &self.result[0]
    }

    pub fn top(&self) -> &str {
        &self.result[self.result.len() - 1]
    }
}

pub(crate) fn build(rig: &mut RigInstance, config: &RigConfig) -> RigResult<SpineChain> {
    let curve = rig
        .curves
        .get_mut(&config.spine_curve)
        .ok_or_else(|| RigError::MissingCurve {
            name: config.spine_curve.clone(),
        })?;
    let armature = &mut rig.armature;
    let center = config.center_bone.as_str();

    armature.set_mode(Mode::Edit)?;
    let result = create_spline_chain(
        armature,
        curve,
        config.spine_cuts,
        PREFIX,
        config.spine_fit_curve,
        config.result_layer()?,
    )?;
    let handles = create_spline_hooks(armature, curve, PREFIX, config.handle_layer()?)?;
    let result: Vec<String> = result.into_iter().map(|id| armature.name_of(id)).collect();
    let handles: Vec<String> = handles.into_iter().map(|id| armature.name_of(id)).collect();
    let (first, last) = (&handles[0], &handles[handles.len() - 1]);

    armature.set_mode(Mode::Pose)?;
    chain_torsion(armature, &result, first, last)?;

    armature.set_mode(Mode::Edit)?;
    duplicate_bones(armature, &[first], &[HIPS], config.handle_layer()?, true)?;
    parent_bones(armature, &handles, HIPS, false, true, InheritScale::Full)?;
    parent_bones(armature, &[HIPS], center, false, true, InheritScale::Full)?;
    parent_bones(armature, &result[..1], center, false, false, InheritScale::Full)?;

    armature.set_mode(Mode::Pose)?;
    child_of(armature, &result[..1], first, &ROOT_FOLLOW)?;
    object_child_of(armature, curve, first, &TransformLocks::ALL.0)?;

    lock_transforms(armature, &[HIPS], &TransformLocks::LOCATION_FREE.0)?;
    lock_transforms(armature, &[first], &TransformLocks::ROTATION_FREE.0)?;
    lock_transforms(armature, &[last], &TransformLocks::LOCATION_ROTATION_FREE.0)?;
    lock_transforms(armature, &handles[1..handles.len() - 1], &MIDDLE_HANDLE_LOCKS)?;

    tracing::debug!(result = result.len(), handles = handles.len(), "Built spine");
    Ok(SpineChain { result, handles })
}
