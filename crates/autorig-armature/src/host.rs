//! Host adapter: renders structured references as host data paths.
//!
//! Inside the crate, drivers and constraints refer to bones by id and to
//! channels by enum. The manifest produced here is the only place where those
//! references become `pose.bones["name"]...` strings.

use serde::Serialize;
use serde_json::{json, Value};

use crate::armature::Armature;
use crate::channel::{ChannelKind, TransformChannel};
use crate::constraint::{ChildOfInverse, ConstraintKind};
use crate::driver::{Driver, DriverTarget, VariableBinding};
use crate::error::ArmatureResult;
use crate::rig::RigInstance;

/// Returns the pose data path and array index of a bone channel.
pub fn channel_path(bone: &str, channel: TransformChannel) -> (String, usize) {
    let property = match channel.kind {
        ChannelKind::Location => "location",
        ChannelKind::Rotation => "rotation_euler",
        ChannelKind::Scale => "scale",
    };
    (
        format!("pose.bones[\"{}\"].{}", bone, property),
        channel.axis.index(),
    )
}

/// Returns the armature-data path of a bone's visibility flag.
pub fn hide_path(bone: &str) -> String {
    format!("bones[\"{}\"].hide", bone)
}

/// Returns the data path of a constraint's influence.
pub fn influence_path(bone: &str, constraint: &str) -> String {
    format!(
        "pose.bones[\"{}\"].constraints[\"{}\"].influence",
        bone, constraint
    )
}

/// Which data block a driver is installed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverOwner {
    /// The armature object.
    Object,
    /// The armature data block.
    Data,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HostBone {
    pub name: String,
    pub parent: Option<String>,
    pub head: [f64; 3],
    pub tail: [f64; 3],
    pub roll: f64,
    pub use_connect: bool,
    pub use_inherit_rotation: bool,
    pub inherit_scale: &'static str,
    pub layer: u8,
    pub deletable: bool,
    pub rotation_mode: &'static str,
    pub lock_location: [bool; 3],
    pub lock_rotation: [bool; 3],
    pub lock_scale: [bool; 3],
    pub lock_ik: [bool; 3],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HostConstraint {
    pub bone: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub influence: f64,
    pub settings: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HostVariable {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bone_target: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transform_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transform_space: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_path: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HostDriver {
    pub owner: DriverOwner,
    pub data_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub array_index: Option<usize>,
    pub expression: String,
    pub variables: Vec<HostVariable>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HostCurve {
    pub name: String,
    pub constraints: Vec<Value>,
    pub modifiers: Vec<Value>,
}

/// Host-facing description of a rig.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HostManifest {
    pub armature: String,
    pub production_state: &'static str,
    pub bones: Vec<HostBone>,
    pub constraints: Vec<HostConstraint>,
    pub drivers: Vec<HostDriver>,
    pub curves: Vec<HostCurve>,
}

impl HostManifest {
    /// Builds the manifest of a rig.
    pub fn from_rig(rig: &RigInstance) -> ArmatureResult<Self> {
        let armature = &rig.armature;
        let mut bones = Vec::with_capacity(armature.bone_count());
        for bone in armature.bones() {
            bones.push(HostBone {
                name: bone.name.clone(),
                parent: bone.parent.map(|p| armature.name_of(p)),
                head: bone.head.to_array(),
                tail: bone.tail.to_array(),
                roll: bone.roll,
                use_connect: bone.connected,
                use_inherit_rotation: bone.inherit_rotation,
                inherit_scale: bone.inherit_scale.as_str(),
                layer: bone.layer.index(),
                deletable: bone.deletable,
                rotation_mode: bone.rotation_mode.as_str(),
                lock_location: bone.locks.location(),
                lock_rotation: bone.locks.rotation(),
                lock_scale: bone.locks.scale(),
                lock_ik: bone.ik_locks,
            });
        }

        let constraints = armature
            .constraints()
            .iter()
            .map(|c| HostConstraint {
                bone: armature.name_of(c.owner),
                name: c.name.clone(),
                kind: c.kind.type_id(),
                influence: c.influence,
                settings: constraint_settings(armature, &c.kind),
            })
            .collect();

        let drivers = armature
            .drivers()
            .iter()
            .map(|d| host_driver(armature, d))
            .collect::<ArmatureResult<Vec<_>>>()?;

        let curves = rig
            .curves
            .values()
            .map(|curve| HostCurve {
                name: curve.name.clone(),
                constraints: curve
                    .constraints
                    .iter()
                    .map(|c| {
                        json!({
                            "name": c.name,
                            "type": "CHILD_OF",
                            "target": c.armature,
                            "subtarget": armature.name_of(c.subtarget),
                            "use_channels": c.channels,
                            "set_inverse_pending": matches!(c.inverse, ChildOfInverse::Pending),
                        })
                    })
                    .collect(),
                modifiers: curve
                    .modifiers
                    .iter()
                    .map(|m| {
                        json!({
                            "name": m.name,
                            "type": "HOOK",
                            "object": m.armature,
                            "subtarget": armature.name_of(m.subtarget),
                            "points": m.points,
                        })
                    })
                    .collect(),
            })
            .collect();

        Ok(Self {
            armature: armature.name().to_string(),
            production_state: armature.properties().production_state.as_str(),
            bones,
            constraints,
            drivers,
            curves,
        })
    }

    /// Serializes the manifest to pretty-printed JSON.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

fn constraint_settings(armature: &Armature, kind: &ConstraintKind) -> Value {
    let name = |id| armature.name_of(id);
    match kind {
        ConstraintKind::CopyRotation {
            target,
            axes,
            target_space,
            owner_space,
        } => json!({
            "subtarget": name(*target),
            "use_x": axes[0],
            "use_y": axes[1],
            "use_z": axes[2],
            "target_space": target_space.as_str(),
            "owner_space": owner_space.as_str(),
        }),
        ConstraintKind::CopyTransforms {
            target,
            target_space,
        } => json!({
            "subtarget": name(*target),
            "target_space": target_space.as_str(),
        }),
        ConstraintKind::Ik {
            target,
            pole,
            chain_count,
        } => json!({
            "subtarget": name(*target),
            "pole_subtarget": pole.map(|p| name(p.bone)),
            "pole_angle": pole.map(|p| p.angle),
            "chain_count": chain_count,
        }),
        ConstraintKind::ChildOf {
            target,
            channels,
            inverse,
        } => json!({
            "subtarget": name(*target),
            "use_channels": channels,
            "set_inverse_pending": matches!(inverse, ChildOfInverse::Pending),
        }),
        ConstraintKind::DampedTrack {
            target,
            track_axis,
            head_tail,
        } => json!({
            "subtarget": name(*target),
            "track_axis": track_axis.as_str(),
            "head_tail": head_tail,
        }),
        ConstraintKind::LimitRotation {
            limits,
            owner_space,
        } => json!({
            "use_limit_x": limits[0].enabled,
            "use_limit_y": limits[1].enabled,
            "use_limit_z": limits[2].enabled,
            "min_x": limits[0].min,
            "max_x": limits[0].max,
            "min_y": limits[1].min,
            "max_y": limits[1].max,
            "min_z": limits[2].min,
            "max_z": limits[2].max,
            "owner_space": owner_space.as_str(),
        }),
        ConstraintKind::SplineIk {
            curve,
            chain_count,
            use_curve_radius,
            xz_scale_mode,
            y_scale_mode,
        } => json!({
            "target": curve,
            "chain_count": chain_count,
            "use_curve_radius": use_curve_radius,
            "xz_scale_mode": xz_scale_mode.as_str(),
            "y_scale_mode": y_scale_mode.as_str(),
        }),
    }
}

fn host_driver(armature: &Armature, driver: &Driver) -> ArmatureResult<HostDriver> {
    let (owner, data_path, array_index) = match driver.target {
        DriverTarget::BoneChannel { bone, channel } => {
            let (path, index) = channel_path(&armature.bone(bone)?.name, channel);
            (DriverOwner::Object, path, Some(index))
        }
        DriverTarget::BoneHide { bone } => {
            (DriverOwner::Data, hide_path(&armature.bone(bone)?.name), None)
        }
        DriverTarget::ConstraintInfluence { constraint } => {
            let constraint = armature.constraint(constraint)?;
            let path = influence_path(&armature.bone(constraint.owner)?.name, &constraint.name);
            (DriverOwner::Object, path, None)
        }
    };

    let variables = driver
        .variables
        .iter()
        .map(|var| match var.binding {
            VariableBinding::Transform { bone, read, space } => HostVariable {
                name: var.name.clone(),
                kind: "TRANSFORMS",
                bone_target: Some(armature.name_of(bone)),
                transform_type: Some(read.as_str()),
                transform_space: Some(space.as_str()),
                data_path: None,
            },
            VariableBinding::Property { property } => HostVariable {
                name: var.name.clone(),
                kind: "SINGLE_PROP",
                bone_target: None,
                transform_type: None,
                transform_space: None,
                data_path: Some(property.data_path()),
            },
        })
        .collect();

    Ok(HostDriver {
        owner,
        data_path,
        array_index,
        expression: driver.expression.source().to_string(),
        variables,
    })
}
