//! The armature object: a tree of bones plus its constraints and drivers.

use std::collections::{BTreeMap, HashMap};

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::bone::{Bone, BoneId};
use crate::channel::TransformChannel;
use crate::constraint::{unique_name, Constraint, ConstraintId, ConstraintKind};
use crate::driver::{Driver, DriverId, DriverTarget, DriverVariable};
use crate::error::{ArmatureError, ArmatureResult};
use crate::expression::Expression;
use crate::mode::{check_mode, check_transition, Mode, ObjectKind};
use crate::properties::RigProperties;

/// An armature object.
///
/// Bones are stored by [`BoneId`]; names are unique and indexed. Constraints
/// and drivers are kept in creation order, which is also their evaluation
/// order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ArmatureRepr", into = "ArmatureRepr")]
pub struct Armature {
    name: String,
    bones: BTreeMap<BoneId, Bone>,
    index: HashMap<String, BoneId>,
    constraints: Vec<Constraint>,
    drivers: Vec<Driver>,
    next_bone: u32,
    next_constraint: u32,
    next_driver: u32,
    mode: Mode,
    properties: RigProperties,
    template: Option<Vec<Bone>>,
}

impl Armature {
    /// Creates an empty armature.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bones: BTreeMap::new(),
            index: HashMap::new(),
            constraints: Vec::new(),
            drivers: Vec::new(),
            next_bone: 0,
            next_constraint: 0,
            next_driver: 0,
            mode: Mode::Object,
            properties: RigProperties::default(),
            template: None,
        }
    }

    /// Returns the object name.
    pub fn name(&self) -> &str {
        &self.name
    }

    // =========================================================================
    // Modes and properties
    // =========================================================================

    /// Returns the current mode.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Switches the armature to `mode`.
    pub fn set_mode(&mut self, mode: Mode) -> ArmatureResult<()> {
        check_transition(ObjectKind::Armature, &self.name, mode)?;
        self.mode = mode;
        Ok(())
    }

    /// Fails with `WrongMode` unless the armature is in `required` mode.
    pub fn require_mode(&self, operation: &'static str, required: Mode) -> ArmatureResult<()> {
        check_mode(operation, &self.name, required, self.mode)
    }

    pub fn properties(&self) -> &RigProperties {
        &self.properties
    }

    pub fn properties_mut(&mut self) -> &mut RigProperties {
        &mut self.properties
    }

    // =========================================================================
    // Bones
    // =========================================================================

    /// Resolves a bone name.
    pub fn bone_id(&self, name: &str) -> ArmatureResult<BoneId> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| ArmatureError::missing_bone(name))
    }

    /// Resolves a list of bone names.
    pub fn bone_ids<S: AsRef<str>>(&self, names: &[S]) -> ArmatureResult<Vec<BoneId>> {
        names.iter().map(|n| self.bone_id(n.as_ref())).collect()
    }

    /// Returns true if a bone with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn bone(&self, id: BoneId) -> ArmatureResult<&Bone> {
        self.bones
            .get(&id)
            .ok_or_else(|| ArmatureError::missing_bone(id.to_string()))
    }

    pub fn bone_mut(&mut self, id: BoneId) -> ArmatureResult<&mut Bone> {
        self.bones
            .get_mut(&id)
            .ok_or_else(|| ArmatureError::missing_bone(id.to_string()))
    }

    /// Looks a bone up by name.
    pub fn bone_named(&self, name: &str) -> ArmatureResult<&Bone> {
        self.bone(self.bone_id(name)?)
    }

    /// Returns the name of a bone, or its id if it no longer exists.
    pub fn name_of(&self, id: BoneId) -> String {
        self.bones
            .get(&id)
            .map(|b| b.name.clone())
            .unwrap_or_else(|| id.to_string())
    }

    /// Iterates over bones in id order.
    pub fn bones(&self) -> impl Iterator<Item = &Bone> {
        self.bones.values()
    }

    /// Returns all bone names, sorted.
    pub fn bone_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.index.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn bone_count(&self) -> usize {
        self.bones.len()
    }

    /// Adds a free, unparented bone.
    pub fn add_bone(&mut self, name: &str, head: DVec3, tail: DVec3) -> ArmatureResult<BoneId> {
        if self.contains(name) {
            return Err(ArmatureError::name_collision(name));
        }
        let id = BoneId(self.next_bone);
        self.next_bone += 1;
        self.bones.insert(id, Bone::new(id, name, head, tail));
        self.index.insert(name.to_string(), id);
        Ok(id)
    }

    /// Renames a bone. References by id are unaffected.
    pub fn rename_bone(&mut self, id: BoneId, new_name: &str) -> ArmatureResult<()> {
        let old = self.bone(id)?.name.clone();
        if old == new_name {
            return Ok(());
        }
        if self.contains(new_name) {
            return Err(ArmatureError::name_collision(new_name));
        }
        self.index.remove(&old);
        self.index.insert(new_name.to_string(), id);
        let bone = self.bone_mut(id)?;
        bone.name = new_name.to_string();
        bone.role = bone.bone_name().role();
        Ok(())
    }

    /// Returns the children of a bone in id order.
    pub fn children(&self, id: BoneId) -> Vec<BoneId> {
        self.bones
            .values()
            .filter(|b| b.parent == Some(id))
            .map(|b| b.id)
            .collect()
    }

    /// Returns true if `ancestor` is `id` or one of its ancestors.
    pub fn is_ancestor(&self, ancestor: BoneId, id: BoneId) -> bool {
        let mut current = Some(id);
        let mut steps = 0;
        while let Some(bone) = current {
            if bone == ancestor {
                return true;
            }
            steps += 1;
            if steps > self.bones.len() {
                return false;
            }
            current = self.bones.get(&bone).and_then(|b| b.parent);
        }
        false
    }

    /// Sets the parent link of a bone without moving its geometry.
    pub fn set_parent(
        &mut self,
        id: BoneId,
        parent: Option<BoneId>,
        connected: bool,
    ) -> ArmatureResult<()> {
        self.bone(id)?;
        if let Some(parent) = parent {
            self.bone(parent)?;
            if self.is_ancestor(id, parent) {
                return Err(ArmatureError::HierarchyCycle {
                    child: self.name_of(id),
                    parent: self.name_of(parent),
                });
            }
        }
        let bone = self.bone_mut(id)?;
        bone.parent = parent;
        bone.connected = connected && parent.is_some();
        Ok(())
    }

    /// Removes a bone.
    ///
    /// Children move to the removed bone's parent and lose their connection.
    /// Constraints owned by or targeting the bone, and drivers writing or
    /// reading it, are removed with it.
    pub fn remove_bone(&mut self, id: BoneId) -> ArmatureResult<Bone> {
        let parent = self.bone(id)?.parent;
        for child in self.children(id) {
            if let Some(bone) = self.bones.get_mut(&child) {
                bone.parent = parent;
                bone.connected = false;
            }
        }

        let dropped: Vec<ConstraintId> = self
            .constraints
            .iter()
            .filter(|c| c.owner == id || c.kind.referenced_bones().contains(&id))
            .map(|c| c.id)
            .collect();
        for constraint in dropped {
            self.remove_constraint(constraint)?;
        }
        self.drivers
            .retain(|d| d.target.bone() != Some(id) && !d.read_bones().any(|b| b == id));

        let bone = self
            .bones
            .remove(&id)
            .ok_or_else(|| ArmatureError::missing_bone(id.to_string()))?;
        self.index.remove(&bone.name);
        Ok(bone)
    }

    /// Keys a pose channel as an animator would. Locked channels refuse.
    pub fn keyframe(
        &mut self,
        id: BoneId,
        channel: TransformChannel,
        value: f64,
    ) -> ArmatureResult<()> {
        let bone = self.bone_mut(id)?;
        if bone.locks.is_locked(channel) {
            return Err(ArmatureError::LockedChannel {
                bone: bone.name.clone(),
                channel: channel.to_string(),
            });
        }
        bone.pose.set(channel, value);
        Ok(())
    }

    // =========================================================================
    // Constraints
    // =========================================================================

    /// Attaches a constraint to `owner`, naming it uniquely among the owner's
    /// constraints.
    pub fn add_constraint(
        &mut self,
        owner: BoneId,
        kind: ConstraintKind,
    ) -> ArmatureResult<ConstraintId> {
        self.bone(owner)?;
        for bone in kind.referenced_bones() {
            self.bone(bone)?;
        }
        let name = unique_name(
            kind.host_name(),
            self.constraints
                .iter()
                .filter(|c| c.owner == owner)
                .map(|c| c.name.as_str()),
        );
        let id = ConstraintId(self.next_constraint);
        self.next_constraint += 1;
        self.constraints.push(Constraint {
            id,
            name,
            owner,
            influence: 1.0,
            kind,
        });
        Ok(id)
    }

    pub fn constraint(&self, id: ConstraintId) -> ArmatureResult<&Constraint> {
        self.constraints
            .iter()
            .find(|c| c.id == id)
            .ok_or_else(|| no_constraint(id))
    }

    pub fn constraint_mut(&mut self, id: ConstraintId) -> ArmatureResult<&mut Constraint> {
        self.constraints
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| no_constraint(id))
    }

    /// All constraints in creation order.
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Constraints owned by a bone, in stack order.
    pub fn constraints_of(&self, owner: BoneId) -> impl Iterator<Item = &Constraint> {
        self.constraints.iter().filter(move |c| c.owner == owner)
    }

    /// Finds a constraint by owner and host name.
    pub fn constraint_named(&self, owner: BoneId, name: &str) -> Option<&Constraint> {
        self.constraints_of(owner).find(|c| c.name == name)
    }

    /// Removes a constraint and any driver on its influence.
    pub fn remove_constraint(&mut self, id: ConstraintId) -> ArmatureResult<Constraint> {
        let pos = self
            .constraints
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| no_constraint(id))?;
        self.drivers
            .retain(|d| d.target != DriverTarget::ConstraintInfluence { constraint: id });
        Ok(self.constraints.remove(pos))
    }

    /// Removes every constraint owned by a bone. Returns how many were removed.
    pub fn clear_constraints(&mut self, owner: BoneId) -> usize {
        let ids: Vec<ConstraintId> = self.constraints_of(owner).map(|c| c.id).collect();
        ids.iter().filter(|id| self.remove_constraint(**id).is_ok()).count()
    }

    // =========================================================================
    // Drivers
    // =========================================================================

    /// Attaches a driver. A driver already writing the same property is
    /// replaced.
    pub fn add_driver(
        &mut self,
        target: DriverTarget,
        variables: Vec<DriverVariable>,
        expression: &str,
    ) -> ArmatureResult<DriverId> {
        let parsed = Expression::parse(expression).map_err(|source| {
            ArmatureError::InvalidExpression {
                expression: expression.to_string(),
                source,
            }
        })?;
        match target {
            DriverTarget::BoneChannel { bone, .. } | DriverTarget::BoneHide { bone } => {
                self.bone(bone)?;
            }
            DriverTarget::ConstraintInfluence { constraint } => {
                self.constraint(constraint)?;
            }
        }
        for var in &variables {
            if let Some(bone) = var.binding.bone() {
                self.bone(bone)?;
            }
        }

        let id = DriverId(self.next_driver);
        let driver = Driver {
            id,
            target,
            variables,
            expression: parsed,
        };
        driver.validate()?;

        self.next_driver += 1;
        self.drivers.retain(|d| d.target != target);
        self.drivers.push(driver);
        Ok(id)
    }

    /// All drivers in creation order.
    pub fn drivers(&self) -> &[Driver] {
        &self.drivers
    }

    /// Returns the driver writing `target`, if any.
    pub fn driver_for(&self, target: DriverTarget) -> Option<&Driver> {
        self.drivers.iter().find(|d| d.target == target)
    }

    /// Removes every driver writing a channel or the visibility of `bone`, or
    /// the influence of one of its constraints. Returns how many were removed.
    pub fn clear_drivers(&mut self, bone: BoneId) -> usize {
        let owned: Vec<ConstraintId> = self.constraints_of(bone).map(|c| c.id).collect();
        let before = self.drivers.len();
        self.drivers.retain(|d| match d.target {
            DriverTarget::BoneChannel { bone: b, .. } | DriverTarget::BoneHide { bone: b } => {
                b != bone
            }
            DriverTarget::ConstraintInfluence { constraint } => !owned.contains(&constraint),
        });
        before - self.drivers.len()
    }

    // =========================================================================
    // Template snapshot
    // =========================================================================

    /// Records the current bone records as the template state.
    pub fn capture_template(&mut self) {
        self.template = Some(self.bones.values().cloned().collect());
    }

    /// Returns true if a template snapshot exists.
    pub fn has_template(&self) -> bool {
        self.template.is_some()
    }

    /// Restores every template bone record captured by [`capture_template`].
    ///
    /// Bones that are missing are re-inserted under their original id.
    /// Returns the number of records restored.
    ///
    /// [`capture_template`]: Armature::capture_template
    pub fn restore_template(&mut self) -> ArmatureResult<usize> {
        let Some(snapshot) = self.template.clone() else {
            return Ok(0);
        };
        for bone in &snapshot {
            if let Some(holder) = self.index.get(&bone.name) {
                if *holder != bone.id {
                    return Err(ArmatureError::name_collision(bone.name.clone()));
                }
            }
        }
        for bone in &snapshot {
            if let Some(existing) = self.bones.get(&bone.id) {
                let old = existing.name.clone();
                self.index.remove(&old);
            }
            self.index.insert(bone.name.clone(), bone.id);
            self.bones.insert(bone.id, bone.clone());
            self.next_bone = self.next_bone.max(bone.id.0 + 1);
        }
        Ok(snapshot.len())
    }
}

// =============================================================================
// Serialization
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ArmatureRepr {
    name: String,
    #[serde(default)]
    mode: Mode,
    #[serde(default)]
    properties: RigProperties,
    bones: Vec<Bone>,
    #[serde(default)]
    constraints: Vec<Constraint>,
    #[serde(default)]
    drivers: Vec<Driver>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    template: Option<Vec<Bone>>,
}

impl From<Armature> for ArmatureRepr {
    fn from(armature: Armature) -> Self {
        Self {
            name: armature.name,
            mode: armature.mode,
            properties: armature.properties,
            bones: armature.bones.into_values().collect(),
            constraints: armature.constraints,
            drivers: armature.drivers,
            template: armature.template,
        }
    }
}

impl TryFrom<ArmatureRepr> for Armature {
    type Error = ArmatureError;

    fn try_from(repr: ArmatureRepr) -> Result<Self, Self::Error> {
        let mut armature = Armature::new(repr.name);
        armature.mode = repr.mode;
        armature.properties = repr.properties;

        for bone in repr.bones {
            if armature.contains(&bone.name) {
                return Err(ArmatureError::name_collision(bone.name));
            }
            if armature.bones.contains_key(&bone.id) {
                return Err(ArmatureError::invalid_parameter(
                    "bones",
                    format!("duplicate bone id {}", bone.id),
                ));
            }
            armature.next_bone = armature.next_bone.max(bone.id.0 + 1);
            armature.index.insert(bone.name.clone(), bone.id);
            armature.bones.insert(bone.id, bone);
        }

        for bone in armature.bones.values() {
            let Some(parent) = bone.parent else {
                continue;
            };
            armature.bone(parent)?;
            // Walking up from the parent must reach a root without revisiting.
            let mut current = Some(parent);
            let mut steps = 0;
            while let Some(id) = current {
                if id == bone.id || steps > armature.bones.len() {
                    return Err(ArmatureError::HierarchyCycle {
                        child: bone.name.clone(),
                        parent: armature.name_of(parent),
                    });
                }
                steps += 1;
                current = armature.bones.get(&id).and_then(|b| b.parent);
            }
        }

        for constraint in &repr.constraints {
            armature.bone(constraint.owner)?;
            for bone in constraint.kind.referenced_bones() {
                armature.bone(bone)?;
            }
            armature.next_constraint = armature.next_constraint.max(constraint.id.0 + 1);
        }
        armature.constraints = repr.constraints;

        for driver in &repr.drivers {
            driver.validate()?;
            armature.next_driver = armature.next_driver.max(driver.id.0 + 1);
        }
        armature.drivers = repr.drivers;
        armature.template = repr.template;
        Ok(armature)
    }
}

fn no_constraint(id: ConstraintId) -> ArmatureError {
    ArmatureError::invalid_parameter("constraint", format!("no constraint {}", id.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{Axis, TransformLocks, TransformRead};
    use crate::constraint::Space;
    use crate::driver::VariableBinding;
    use crate::properties::SwitchProperty;
    use pretty_assertions::assert_eq;

    fn chain() -> (Armature, BoneId, BoneId, BoneId) {
        let mut arm = Armature::new("rig");
        let a = arm.add_bone("a_RST", DVec3::ZERO, DVec3::Z).unwrap();
        let b = arm.add_bone("b_RST", DVec3::Z, DVec3::Z * 2.0).unwrap();
        let c = arm.add_bone("c_RST", DVec3::Z * 2.0, DVec3::Z * 3.0).unwrap();
        arm.set_parent(b, Some(a), true).unwrap();
        arm.set_parent(c, Some(b), true).unwrap();
        (arm, a, b, c)
    }

    #[test]
    fn test_name_collision() {
        let (mut arm, a, _, _) = chain();
        let err = arm.add_bone("b_RST", DVec3::ZERO, DVec3::Y).unwrap_err();
        assert_eq!(err, ArmatureError::name_collision("b_RST"));
        assert!(arm.rename_bone(a, "c_RST").is_err());
        arm.rename_bone(a, "root_HDL").unwrap();
        assert_eq!(arm.bone_id("root_HDL").unwrap(), a);
        assert!(arm.bone_id("a_RST").is_err());
        assert_eq!(arm.bone(a).unwrap().role, crate::names::BoneRole::Handle);
    }

    #[test]
    fn test_parenting_rejects_cycles() {
        let (mut arm, a, _, c) = chain();
        let err = arm.set_parent(a, Some(c), false).unwrap_err();
        assert!(matches!(err, ArmatureError::HierarchyCycle { .. }));
        assert!(arm.set_parent(a, Some(a), false).is_err());
        assert_eq!(arm.bone(a).unwrap().parent, None);
    }

    #[test]
    fn test_remove_bone_reparents_children() {
        let (mut arm, a, b, c) = chain();
        arm.add_constraint(
            c,
            ConstraintKind::CopyTransforms {
                target: b,
                target_space: Space::World,
            },
        )
        .unwrap();
        arm.remove_bone(b).unwrap();
        let child = arm.bone(c).unwrap();
        assert_eq!(child.parent, Some(a));
        assert!(!child.connected);
        assert!(arm.constraints().is_empty());
        assert_eq!(arm.bone_names(), vec!["a_RST".to_string(), "c_RST".to_string()]);
    }

    #[test]
    fn test_constraint_names_are_unique_per_owner() {
        let (mut arm, a, b, c) = chain();
        let kind = |target| ConstraintKind::CopyTransforms {
            target,
            target_space: Space::World,
        };
        let first = arm.add_constraint(c, kind(a)).unwrap();
        let second = arm.add_constraint(c, kind(b)).unwrap();
        let other = arm.add_constraint(b, kind(a)).unwrap();
        assert_eq!(arm.constraint(first).unwrap().name, "Copy Transforms");
        assert_eq!(arm.constraint(second).unwrap().name, "Copy Transforms.001");
        assert_eq!(arm.constraint(other).unwrap().name, "Copy Transforms");
    }

    #[test]
    fn test_driver_replaces_same_target_and_follows_constraint() {
        let (mut arm, a, _, c) = chain();
        let con = arm
            .add_constraint(
                c,
                ConstraintKind::CopyTransforms {
                    target: a,
                    target_space: Space::World,
                },
            )
            .unwrap();
        let target = DriverTarget::ConstraintInfluence { constraint: con };
        let var = || vec![DriverVariable::new("var", VariableBinding::property(SwitchProperty::LeftArm))];
        arm.add_driver(target, var(), "1-var").unwrap();
        arm.add_driver(target, var(), "var").unwrap();
        assert_eq!(arm.drivers().len(), 1);
        assert_eq!(arm.driver_for(target).unwrap().expression.source(), "var");

        let err = arm.add_driver(target, var(), "var*").unwrap_err();
        assert_eq!(err.code(), "ARM_011");

        arm.remove_constraint(con).unwrap();
        assert!(arm.drivers().is_empty());
    }

    #[test]
    fn test_clear_drivers_of_bone() {
        let (mut arm, a, b, _) = chain();
        let read = vec![DriverVariable::new("var", VariableBinding::transform(a, TransformRead::RotY))];
        arm.add_driver(
            DriverTarget::BoneChannel {
                bone: b,
                channel: TransformChannel::rotation(Axis::Y),
            },
            read.clone(),
            "var",
        )
        .unwrap();
        arm.add_driver(DriverTarget::BoneHide { bone: a }, read, "var").unwrap();
        assert_eq!(arm.clear_drivers(b), 1);
        assert_eq!(arm.drivers().len(), 1);
    }

    #[test]
    fn test_keyframe_respects_locks() {
        let (mut arm, a, _, _) = chain();
        arm.bone_mut(a).unwrap().locks = TransformLocks::ROTATION_FREE;
        arm.keyframe(a, TransformChannel::rotation(Axis::X), 0.3).unwrap();
        let err = arm
            .keyframe(a, TransformChannel::location(Axis::Z), 1.0)
            .unwrap_err();
        assert_eq!(
            err,
            ArmatureError::LockedChannel {
                bone: "a_RST".into(),
                channel: "loc_z".into()
            }
        );
        assert_eq!(arm.bone(a).unwrap().pose.rotation[0], 0.3);
    }

    #[test]
    fn test_template_snapshot_restores_records() {
        let (mut arm, a, b, _) = chain();
        arm.capture_template();
        arm.bone_mut(a).unwrap().locks = TransformLocks::ALL;
        arm.set_parent(b, None, false).unwrap();
        assert_eq!(arm.restore_template().unwrap(), 3);
        assert_eq!(arm.bone(a).unwrap().locks, TransformLocks::NONE);
        assert_eq!(arm.bone(b).unwrap().parent, Some(a));
    }

    #[test]
    fn test_json_round_trip_rebuilds_index() {
        let (mut arm, a, b, _) = chain();
        arm.add_driver(
            DriverTarget::BoneHide { bone: b },
            vec![DriverVariable::new("var", VariableBinding::property(SwitchProperty::RightLeg))],
            "1-var",
        )
        .unwrap();
        let json = serde_json::to_string(&arm).unwrap();
        let back: Armature = serde_json::from_str(&json).unwrap();
        assert_eq!(back, arm);
        assert_eq!(back.bone_id("a_RST").unwrap(), a);

        let mut broken: serde_json::Value = serde_json::from_str(&json).unwrap();
        broken["bones"][0]["parent"] = serde_json::json!(2);
        assert!(serde_json::from_value::<Armature>(broken).is_err());
    }
}
