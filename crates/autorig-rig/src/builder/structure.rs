//! Structural primitives: duplication, parenting, layers, locks and new bones.

use std::collections::{HashMap, HashSet};

use autorig_armature::{
    Armature, ArmatureError, ArmatureResult, AxisDirection, BoneEnd, BoneId, BoneLayer,
    InheritScale, Mode, RotationMode, TransformLocks,
};

use super::logged;

/// Duplicates bones and renames the duplicates.
///
/// `new_names[i]` names the duplicate of `names[i]`. A duplicate whose parent
/// is also being duplicated is parented to that parent's duplicate; otherwise
/// it keeps the original parent. Constraints are copied, with targets inside
/// the duplicated set remapped to their duplicates. Drivers are not copied.
///
/// Requires edit mode.
pub fn duplicate_bones<S: AsRef<str>, T: AsRef<str>>(
    armature: &mut Armature,
    names: &[S],
    new_names: &[T],
    layer: BoneLayer,
    deletable: bool,
) -> ArmatureResult<Vec<BoneId>> {
    logged("duplicate_bones", || {
        armature.require_mode("duplicate_bones", Mode::Edit)?;
        if names.len() != new_names.len() {
            return Err(ArmatureError::InvalidArity {
                what: "new bone names",
                expected: names.len(),
                got: new_names.len(),
            });
        }
        let sources = armature.bone_ids(names)?;
        let mut seen_sources = HashSet::new();
        if let Some(repeated) = sources.iter().find(|id| !seen_sources.insert(**id)) {
            return Err(ArmatureError::invalid_parameter(
                "names",
                format!("bone '{}' is listed more than once", armature.name_of(*repeated)),
            ));
        }
        let mut seen = HashSet::new();
        for name in new_names {
            let name = name.as_ref();
            if armature.contains(name) || !seen.insert(name) {
                return Err(ArmatureError::name_collision(name));
            }
        }

        let mut mapping = HashMap::new();
        for (source, new_name) in sources.iter().zip(new_names) {
            let original = armature.bone(*source)?.clone();
            let id = armature.add_bone(new_name.as_ref(), original.head, original.tail)?;
            let copy = armature.bone_mut(id)?;
            copy.roll = original.roll;
            copy.inherit_rotation = original.inherit_rotation;
            copy.inherit_scale = original.inherit_scale;
            copy.locks = original.locks;
            copy.ik_locks = original.ik_locks;
            copy.pose = original.pose;
            copy.hide = original.hide;
            copy.layer = layer;
            copy.deletable = deletable;
            copy.rotation_mode = RotationMode::Xyz;
            mapping.insert(*source, id);
        }

        for source in &sources {
            let original = armature.bone(*source)?;
            let parent = original
                .parent
                .map(|p| mapping.get(&p).copied().unwrap_or(p));
            let connected = original.connected;
            armature.set_parent(mapping[source], parent, connected)?;
        }

        let copied: Vec<_> = armature
            .constraints()
            .iter()
            .filter(|c| mapping.contains_key(&c.owner))
            .cloned()
            .collect();
        for constraint in copied {
            let mut kind = constraint.kind;
            kind.remap_bones(|b| mapping.get(&b).copied().unwrap_or(b));
            let id = armature.add_constraint(mapping[&constraint.owner], kind)?;
            armature.constraint_mut(id)?.influence = constraint.influence;
        }

        tracing::debug!(count = sources.len(), layer = layer.index(), "Duplicated bones");
        Ok(sources.iter().map(|s| mapping[s]).collect())
    })
}

/// Parents bones to `parent`. Geometry is not moved.
///
/// Requires edit mode.
pub fn parent_bones<S: AsRef<str>>(
    armature: &mut Armature,
    names: &[S],
    parent: &str,
    connect: bool,
    inherit_rotation: bool,
    inherit_scale: InheritScale,
) -> ArmatureResult<()> {
    logged("parent_bones", || {
        armature.require_mode("parent_bones", Mode::Edit)?;
        let parent = armature.bone_id(parent)?;
        for id in armature.bone_ids(names)? {
            armature.set_parent(id, Some(parent), connect)?;
            let bone = armature.bone_mut(id)?;
            bone.inherit_rotation = inherit_rotation;
            bone.inherit_scale = inherit_scale;
        }
        Ok(())
    })
}

/// Moves bones to a layer.
///
/// Requires edit mode.
pub fn assign_layer<S: AsRef<str>>(
    armature: &mut Armature,
    names: &[S],
    layer: BoneLayer,
) -> ArmatureResult<()> {
    logged("assign_layer", || {
        armature.require_mode("assign_layer", Mode::Edit)?;
        for id in armature.bone_ids(names)? {
            armature.bone_mut(id)?.layer = layer;
        }
        Ok(())
    })
}

/// Switches bones to XYZ Euler rotation, the mode drivers write.
///
/// Requires pose mode.
pub fn assign_rotation_mode<S: AsRef<str>>(
    armature: &mut Armature,
    names: &[S],
) -> ArmatureResult<()> {
    logged("assign_rotation_mode", || {
        armature.require_mode("assign_rotation_mode", Mode::Pose)?;
        for id in armature.bone_ids(names)? {
            armature.bone_mut(id)?.rotation_mode = RotationMode::Xyz;
        }
        Ok(())
    })
}

/// Sets the nine channel locks of bones.
///
/// `flags` must hold exactly nine values: location X, Y, Z, rotation X, Y, Z,
/// scale X, Y, Z. Requires pose mode.
pub fn lock_transforms<S: AsRef<str>>(
    armature: &mut Armature,
    names: &[S],
    flags: &[bool],
) -> ArmatureResult<()> {
    logged("lock_transforms", || {
        let locks = TransformLocks::from_slice(flags)?;
        armature.require_mode("lock_transforms", Mode::Pose)?;
        for id in armature.bone_ids(names)? {
            armature.bone_mut(id)?.locks = locks;
        }
        Ok(())
    })
}

/// Creates a bone from the tail of `tail_bone` to the head of `head_bone`.
///
/// The new bone is connected under `tail_bone` and `head_bone` is re-parented,
/// connected, under the new bone. All nine channels of the new bone are
/// locked. Requires edit mode.
pub fn connect_tail_head(
    armature: &mut Armature,
    tail_bone: &str,
    head_bone: &str,
    new_name: &str,
    layer: BoneLayer,
    deletable: bool,
) -> ArmatureResult<BoneId> {
    logged("connect_tail_head", || {
        armature.require_mode("connect_tail_head", Mode::Edit)?;
        let tail_id = armature.bone_id(tail_bone)?;
        let head_id = armature.bone_id(head_bone)?;
        let start = armature.bone(tail_id)?.tail;
        let end = armature.bone(head_id)?.head;

        let id = armature.add_bone(new_name, start, end)?;
        init_new_bone(armature, id, layer, deletable)?;
        armature.bone_mut(id)?.locks = TransformLocks::ALL;
        armature.set_parent(id, Some(tail_id), true)?;
        armature.set_parent(head_id, Some(id), true)?;
        let head = armature.bone_mut(head_id)?;
        head.inherit_rotation = true;
        head.inherit_scale = InheritScale::Full;
        Ok(id)
    })
}

/// Creates a bone at the head or tail of `reference`, pointing along `axis`.
///
/// The bone is parented to `parent` with full rotation and scale
/// inheritance. Requires edit mode.
#[allow(clippy::too_many_arguments)]
pub fn add_bone_axis(
    armature: &mut Armature,
    new_name: &str,
    reference: &str,
    parent: &str,
    end: BoneEnd,
    axis: AxisDirection,
    length: f64,
    connect: bool,
    layer: BoneLayer,
    deletable: bool,
) -> ArmatureResult<BoneId> {
    logged("add_bone_axis", || {
        armature.require_mode("add_bone_axis", Mode::Edit)?;
        if !(length.is_finite() && length > 0.0) {
            return Err(ArmatureError::invalid_parameter(
                "length",
                format!("bone length must be positive, got {}", length),
            ));
        }
        let head = armature.bone_named(reference)?.end(end);
        let parent = armature.bone_id(parent)?;

        let id = armature.add_bone(new_name, head, head + axis.unit() * length)?;
        init_new_bone(armature, id, layer, deletable)?;
        armature.set_parent(id, Some(parent), connect)?;
        Ok(id)
    })
}

/// Splits a bone into `cuts + 1` equal, connected segments.
///
/// The original bone becomes the first segment. New segments are named
/// `{name}.001`, `{name}.002`, ... and inherit the original's properties but
/// none of its constraints. Former children move to the last segment.
/// Returns the segments in chain order. Requires edit mode.
pub fn subdivide(armature: &mut Armature, name: &str, cuts: u32) -> ArmatureResult<Vec<BoneId>> {
    logged("subdivide", || {
        armature.require_mode("subdivide", Mode::Edit)?;
        let first = armature.bone_id(name)?;
        let original = armature.bone(first)?.clone();
        let segment_names: Vec<String> =
            (1..=cuts).map(|i| format!("{}.{:03}", original.name, i)).collect();
        if let Some(taken) = segment_names.iter().find(|n| armature.contains(n)) {
            return Err(ArmatureError::name_collision(taken.clone()));
        }

        let children = armature.children(first);
        let step = (original.tail - original.head) / f64::from(cuts + 1);
        let joint = |i: u32| original.head + step * f64::from(i);
        armature.bone_mut(first)?.tail = joint(1);

        let mut segments = vec![first];
        for (i, segment_name) in (1..=cuts).zip(&segment_names) {
            let id = armature.add_bone(segment_name, joint(i), joint(i + 1))?;
            let bone = armature.bone_mut(id)?;
            bone.roll = original.roll;
            bone.inherit_rotation = original.inherit_rotation;
            bone.inherit_scale = original.inherit_scale;
            bone.layer = original.layer;
            bone.deletable = original.deletable;
            bone.rotation_mode = original.rotation_mode;
            bone.locks = original.locks;
            bone.hide = original.hide;
            let previous = segments[segments.len() - 1];
            armature.set_parent(id, Some(previous), true)?;
            segments.push(id);
        }

        let last = segments[segments.len() - 1];
        for child in children {
            let connected = armature.bone(child)?.connected;
            armature.set_parent(child, Some(last), connected)?;
        }
        Ok(segments)
    })
}

/// Layer, deletable flag and rotation mode of a freshly created bone.
fn init_new_bone(
    armature: &mut Armature,
    id: BoneId,
    layer: BoneLayer,
    deletable: bool,
) -> ArmatureResult<()> {
    let bone = armature.bone_mut(id)?;
    bone.layer = layer;
    bone.deletable = deletable;
    bone.rotation_mode = RotationMode::Xyz;
    Ok(())
}
