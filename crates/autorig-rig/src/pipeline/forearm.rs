//! Forearm torsion.
//!
//! A subdivided copy of the forearm distributes the hand's twist along its
//! segments. The twist source is a helper that copies the hand rotation
//! through a damped-track pair, so the forearm itself stays untwisted.

use autorig_armature::{BoneRole, InheritScale, Mode, RigInstance, Space, TrackAxis, TransformLocks};

use super::{derived, sided, Side};
use crate::builder::{
    assign_layer, assign_rotation_mode, chain_torsion, copy_rotation, damped_track,
    delete_constraints_and_drivers, duplicate_bones, lock_transforms, parent_bones, subdivide,
};
use crate::config::RigConfig;
use crate::error::RigResult;

pub(crate) fn build(rig: &mut RigInstance, config: &RigConfig, side: Side) -> RigResult<()> {
    let armature = &mut rig.armature;
    let forearm = sided("forearm", side, BoneRole::Auxiliary);
    let hand = sided("hand", side, BoneRole::Result);
    let part = derived(&forearm, "_part", BoneRole::Result);
    let torsion = derived(&hand, "_torsion", BoneRole::Auxiliary);
    let tracker = derived(&torsion, "_D", BoneRole::Auxiliary);
    let follower = derived(&torsion, "_E", BoneRole::Auxiliary);

    armature.set_mode(Mode::Edit)?;
    duplicate_bones(
        armature,
        &[&forearm, &hand],
        &[&part, &torsion],
        config.aux_layer()?,
        true,
    )?;

    armature.set_mode(Mode::Pose)?;
    delete_constraints_and_drivers(armature, &[&part, &torsion])?;

    armature.set_mode(Mode::Edit)?;
    assign_layer(armature, &[&part], config.result_layer()?)?;
    parent_bones(armature, &[&part, &torsion], &forearm, false, true, InheritScale::Full)?;
    let segments = subdivide(armature, &part, config.forearm_cuts)?;
    let mut parts = Vec::with_capacity(segments.len());
    for (idx, id) in segments.into_iter().enumerate() {
        let name = derived(&part, &(idx + 1).to_string(), BoneRole::Result);
        armature.rename_bone(id, &name)?;
        parts.push(name);
    }

    armature.set_mode(Mode::Pose)?;
    assign_rotation_mode(armature, &parts)?;
    lock_transforms(armature, &parts, &TransformLocks::ALL.0)?;

    armature.set_mode(Mode::Edit)?;
    duplicate_bones(armature, &[&torsion], &[&tracker], config.aux_layer()?, true)?;
    let halves = subdivide(armature, &tracker, 1)?;
    armature.rename_bone(halves[1], &follower)?;

    armature.set_mode(Mode::Pose)?;
    assign_rotation_mode(armature, &[&follower])?;
    lock_transforms(armature, &[&follower], &TransformLocks::ALL.0)?;
    damped_track(armature, &[&tracker], &hand, TrackAxis::TrackY)?;
    copy_rotation(armature, &[&follower], &hand, &[true; 3], Space::World)?;
    copy_rotation(armature, &[&torsion], &follower, &[true; 3], Space::Local)?;
    chain_torsion(armature, &parts, &forearm, &torsion)?;

    tracing::debug!(%side, segments = parts.len(), "Built forearm torsion");
    Ok(())
}
