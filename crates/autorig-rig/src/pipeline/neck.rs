//! Neck and head.

use autorig_armature::{InheritScale, Mode, RigInstance, Space, TransformLocks};

use super::{SpineChain, ROTATION_CHANNELS};
use crate::builder::{
    assign_rotation_mode, child_of, connect_tail_head, copy_rotation, copy_transforms,
    duplicate_bones, ik, lock_transforms, parent_bones,
};
use crate::config::RigConfig;
use crate::error::RigResult;

const NECK: [&str; 3] = ["neck01_RST", "neck02_RST", "head_RST"];
const NECK_LINK: &str = "neck_con_AUX";
const NECK_HANDLE: &str = "neck_HDL";
const HEAD_HANDLE: &str = "head_HDL";

pub(crate) fn build(
    rig: &mut RigInstance,
    config: &RigConfig,
    spine: &SpineChain,
) -> RigResult<()> {
    let armature = &mut rig.armature;
    let [neck01, neck02, head] = NECK;

    armature.set_mode(Mode::Edit)?;
    connect_tail_head(armature, spine.top(), neck01, NECK_LINK, config.aux_layer()?, true)?;

    armature.set_mode(Mode::Pose)?;
    assign_rotation_mode(armature, &NECK)?;

    armature.set_mode(Mode::Edit)?;
    duplicate_bones(armature, &[neck01], &[NECK_HANDLE], config.handle_layer()?, true)?;
    duplicate_bones(armature, &[head], &[HEAD_HANDLE], config.handle_layer()?, true)?;

    armature.set_mode(Mode::Pose)?;
    lock_transforms(armature, &NECK, &TransformLocks::ALL.0)?;

    armature.set_mode(Mode::Edit)?;
    parent_bones(armature, &[NECK_HANDLE], NECK_LINK, true, false, InheritScale::Full)?;
    parent_bones(armature, &[HEAD_HANDLE], NECK_HANDLE, false, false, InheritScale::Full)?;

    armature.set_mode(Mode::Pose)?;
    let handles = [NECK_HANDLE, HEAD_HANDLE];
    lock_transforms(armature, &handles, &TransformLocks::LOCATION_ROTATION_FREE.0)?;
    copy_rotation(armature, &[neck01], NECK_HANDLE, &[true; 3], Space::World)?;
    child_of(armature, &handles, &config.center_bone, &ROTATION_CHANNELS)?;
    ik(armature, &[neck02], HEAD_HANDLE, None, 1, 0.0, &[false; 3])?;
    copy_transforms(armature, &[head], HEAD_HANDLE, Space::World)?;
    Ok(())
}
