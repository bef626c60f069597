//! Shoulder roots and handles.

use autorig_armature::{BoneEnd, BoneRole, InheritScale, Mode, RigInstance, TransformLocks};

use super::{sided, Side, SpineChain, ROTATION_CHANNELS};
use crate::builder::{
    add_bone_axis, assign_rotation_mode, child_of, connect_tail_head, lock_transforms, parent_bones,
};
use crate::config::RigConfig;
use crate::error::RigResult;

pub(crate) fn build(
    rig: &mut RigInstance,
    config: &RigConfig,
    spine: &SpineChain,
) -> RigResult<()> {
    let armature = &mut rig.armature;
    let shoulders = Side::ALL.map(|side| sided("shoulder", side, BoneRole::Result));
    let handles = Side::ALL.map(|side| sided("shoulder", side, BoneRole::Handle));
    let links = Side::ALL.map(|side| sided("shoulder_con", side, BoneRole::Auxiliary));

    armature.set_mode(Mode::Edit)?;
    for (shoulder, link) in shoulders.iter().zip(&links) {
        connect_tail_head(armature, spine.top(), shoulder, link, config.aux_layer()?, true)?;
    }
    for (shoulder, link) in shoulders.iter().zip(&links) {
        parent_bones(armature, &[shoulder], link, true, false, InheritScale::Full)?;
    }
    for (idx, side) in Side::ALL.into_iter().enumerate() {
        add_bone_axis(
            armature,
            &handles[idx],
            &shoulders[idx],
            &links[idx],
            BoneEnd::Head,
            side.inward(),
            config.shoulder_handle_length,
            true,
            config.handle_layer()?,
            true,
        )?;
    }

    armature.set_mode(Mode::Pose)?;
    assign_rotation_mode(armature, &shoulders)?;
    lock_transforms(armature, &shoulders, &TransformLocks::ALL.0)?;
    lock_transforms(armature, &handles, &TransformLocks::ROTATION_FREE.0)?;
    for (shoulder, handle) in shoulders.iter().zip(&handles) {
        child_of(armature, &[shoulder], handle, &ROTATION_CHANNELS)?;
    }
    Ok(())
}
