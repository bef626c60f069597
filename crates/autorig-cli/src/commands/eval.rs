//! Eval command implementation
//!
//! Evaluates the drivers and constraints of a rig and prints the resulting
//! channel values.

use anyhow::{bail, Context, Result};
use autorig_armature::{
    evaluate, BoneName, BoneRole, EvaluatedPose, RigInstance, SwitchProperty, TransformChannel,
};
use colored::Colorize;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::process::ExitCode;

use crate::input::load_rig;

/// Channel values of one bone.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoneValues {
    pub hidden: bool,
    pub channels: BTreeMap<String, f64>,
}

/// Parses `fk_ik_left_arm=0.5`.
fn parse_switch(assignment: &str) -> Result<(SwitchProperty, f64)> {
    let Some((name, value)) = assignment.split_once('=') else {
        bail!("expected property=value, got '{}'", assignment);
    };
    let property: SwitchProperty = name.trim().parse()?;
    let value: f64 = value
        .trim()
        .parse()
        .with_context(|| format!("invalid value in '{}'", assignment))?;
    Ok((property, value))
}

/// Parses `bone.rot_x=0.5`. The channel follows the last dot.
fn parse_pose(assignment: &str) -> Result<(String, TransformChannel, f64)> {
    let Some((target, value)) = assignment.split_once('=') else {
        bail!("expected bone.channel=value, got '{}'", assignment);
    };
    let Some((bone, channel)) = target.trim().rsplit_once('.') else {
        bail!("expected bone.channel=value, got '{}'", assignment);
    };
    let channel = TransformChannel::parse(channel)?;
    let value: f64 = value
        .trim()
        .parse()
        .with_context(|| format!("invalid value in '{}'", assignment))?;
    Ok((bone.to_string(), channel, value))
}

/// Applies switch values and keyed channels, then evaluates the rig.
///
/// Keying a locked channel fails.
pub fn evaluate_rig(
    rig: &mut RigInstance,
    sets: &[String],
    poses: &[String],
) -> Result<EvaluatedPose> {
    for assignment in sets {
        let (property, value) = parse_switch(assignment)?;
        rig.armature.properties_mut().set_switch(property, value);
    }
    for assignment in poses {
        let (bone, channel, value) = parse_pose(assignment)?;
        let id = rig.armature.bone_id(&bone)?;
        rig.armature
            .keyframe(id, channel, value)
            .with_context(|| format!("Failed to key '{}'", assignment))?;
    }
    evaluate(&rig.armature).context("Failed to evaluate rig")
}

/// Collects the values of `bones`, or of every result bone when empty.
pub fn collect_values(
    rig: &RigInstance,
    pose: &EvaluatedPose,
    bones: &[String],
) -> Result<BTreeMap<String, BoneValues>> {
    let names: Vec<String> = if bones.is_empty() {
        rig.armature
            .bone_names()
            .into_iter()
            .filter(|n| BoneName::parse(n).role() == BoneRole::Result)
            .collect()
    } else {
        bones.to_vec()
    };

    let mut values = BTreeMap::new();
    for name in names {
        let id = rig.armature.bone_id(&name)?;
        let channels = TransformChannel::ALL
            .iter()
            .filter_map(|c| pose.value(id, *c).map(|v| (c.to_string(), v)))
            .collect();
        values.insert(
            name,
            BoneValues {
                hidden: pose.is_hidden(id),
                channels,
            },
        );
    }
    Ok(values)
}

/// Run the eval command
///
/// # Arguments
/// * `rig_path` - Path to the rig JSON file
/// * `sets` - Switch assignments (`fk_ik_left_arm=1`)
/// * `poses` - Keyed channels (`bone.rot_x=0.5`)
/// * `bones` - Bones to print (default: every result bone)
/// * `json_output` - Print machine-readable JSON
///
/// # Returns
/// Exit code: 0 success
pub fn run(
    rig_path: &str,
    sets: &[String],
    poses: &[String],
    bones: &[String],
    json_output: bool,
) -> Result<ExitCode> {
    let mut rig = load_rig(Path::new(rig_path))?;
    let pose = evaluate_rig(&mut rig, sets, poses)?;
    let values = collect_values(&rig, &pose, bones)?;

    if json_output {
        let json = serde_json::to_string_pretty(&values).context("Failed to serialize values")?;
        println!("{}", json);
        return Ok(ExitCode::SUCCESS);
    }

    for (name, bone) in &values {
        let hidden = if bone.hidden {
            " (hidden)".dimmed().to_string()
        } else {
            String::new()
        };
        println!("{}{}", name.cyan().bold(), hidden);
        let line: Vec<String> = bone
            .channels
            .iter()
            .filter(|(_, v)| v.abs() > 1e-12)
            .map(|(c, v)| format!("{}={:.4}", c, v))
            .collect();
        if !line.is_empty() {
            println!("  {}", line.join(" "));
        }
    }
    if !pose.invalid_drivers.is_empty() {
        println!(
            "{} {} driver(s) failed to evaluate",
            "WARNING".yellow().bold(),
            pose.invalid_drivers.len()
        );
    }
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use autorig_armature::Axis;

    #[test]
    fn test_parse_switch() {
        let (property, value) = parse_switch("fk_ik_right_leg=0.25").unwrap();
        assert_eq!(property, SwitchProperty::RightLeg);
        assert_eq!(value, 0.25);
        assert!(parse_switch("fk_ik_left_arm").is_err());
        assert!(parse_switch("left_arm=1").is_err());
    }

    #[test]
    fn test_parse_pose_splits_at_last_dot() {
        let (bone, channel, value) = parse_pose("part_RST.001.rot_y=-1.5").unwrap();
        assert_eq!(bone, "part_RST.001");
        assert_eq!(channel, TransformChannel::rotation(Axis::Y));
        assert_eq!(value, -1.5);
        assert!(parse_pose("head_HDL=1").is_err());
        assert!(parse_pose("head_HDL.rot_w=1").is_err());
    }
}
