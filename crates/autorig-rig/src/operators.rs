//! Rig operators.
//!
//! The operators act on an explicit [`Workspace`] holding at most one active
//! rig. `clean` and `delete` are no-ops without an active rig.

use autorig_armature::{BoneId, Mode, ProductionState, RigInstance, TemplateAsset};
use serde::Serialize;

use crate::config::RigConfig;
use crate::error::{RigError, RigResult};
use crate::pipeline::{self, PopulateReport};

/// Holds the active rig.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Workspace {
    pub active: Option<RigInstance>,
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps an existing rig, e.g. one loaded from disk.
    pub fn with_rig(rig: RigInstance) -> Self {
        Self { active: Some(rig) }
    }

    pub fn active(&self) -> RigResult<&RigInstance> {
        self.active.as_ref().ok_or(RigError::NoActiveRig)
    }

    pub fn active_mut(&mut self) -> RigResult<&mut RigInstance> {
        self.active.as_mut().ok_or(RigError::NoActiveRig)
    }
}

/// What `clean` removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CleanReport {
    pub constraints_removed: usize,
    pub drivers_removed: usize,
    pub bones_removed: usize,
    pub curve_constraints_removed: usize,
    pub modifiers_removed: usize,
    pub bones_restored: usize,
}

/// Instantiates `template` as the active rig, replacing any previous one.
///
/// The template must be in the `Template` state. The new rig starts in
/// `BasicEdition`.
pub fn add_armature<'w>(
    workspace: &'w mut Workspace,
    template: &TemplateAsset,
) -> RigResult<&'w mut RigInstance> {
    if template.production_state != ProductionState::Template {
        return Err(RigError::InvalidState {
            operation: "instantiate",
            state: template.production_state,
        });
    }
    let mut rig = RigInstance::from_template(template)?;
    rig.armature.properties_mut().production_state = ProductionState::BasicEdition;
    if let Some(previous) = &workspace.active {
        tracing::warn!(
            previous = previous.armature.name(),
            bones = previous.armature.bone_count(),
            "Replacing active rig"
        );
    }
    tracing::info!(armature = rig.armature.name(), "Added armature");
    Ok(workspace.active.insert(rig))
}

/// Runs the assembly pipeline on the active rig.
///
/// The rig becomes `Ready` when every stage completed.
pub fn populate(workspace: &mut Workspace, config: &RigConfig) -> RigResult<PopulateReport> {
    let rig = workspace.active_mut()?;
    let state = rig.armature.properties().production_state;
    if state == ProductionState::Ready {
        return Err(RigError::InvalidState {
            operation: "populate",
            state,
        });
    }

    let report = pipeline::populate(rig, config)?;
    if report.is_complete() {
        rig.armature.properties_mut().production_state = ProductionState::Ready;
    }
    Ok(report)
}

/// Removes everything the pipeline built and restores the template bones.
///
/// Constraints and drivers are removed first, then deletable bones, then the
/// constraints and modifiers of every curve.
pub fn clean(workspace: &mut Workspace) -> RigResult<CleanReport> {
    let Some(rig) = workspace.active.as_mut() else {
        tracing::debug!("No active rig to clean");
        return Ok(CleanReport::default());
    };
    let mut report = CleanReport::default();
    let armature = &mut rig.armature;
    armature.set_mode(Mode::Object)?;

    let ids: Vec<BoneId> = armature.bones().map(|b| b.id).collect();
    for id in &ids {
        report.drivers_removed += armature.clear_drivers(*id);
        report.constraints_removed += armature.clear_constraints(*id);
    }

    let deletable: Vec<BoneId> = armature.bones().filter(|b| b.deletable).map(|b| b.id).collect();
    for id in deletable {
        armature.remove_bone(id)?;
        report.bones_removed += 1;
    }

    for curve in rig.curves.values_mut() {
        report.curve_constraints_removed += curve.constraints.len();
        report.modifiers_removed += curve.modifiers.len();
        curve.constraints.clear();
        curve.modifiers.clear();
        curve.set_mode(Mode::Object)?;
    }

    report.bones_restored = rig.armature.restore_template()?;
    rig.armature.properties_mut().production_state = ProductionState::BasicEdition;
    tracing::info!(
        bones_removed = report.bones_removed,
        constraints_removed = report.constraints_removed,
        drivers_removed = report.drivers_removed,
        "Cleaned rig"
    );
    Ok(report)
}

/// Drops the active rig and its curves. Returns the removed rig.
pub fn delete(workspace: &mut Workspace) -> Option<RigInstance> {
    let rig = workspace.active.take();
    match &rig {
        Some(rig) => tracing::info!(armature = rig.armature.name(), "Deleted rig"),
        None => tracing::debug!("No active rig to delete"),
    }
    rig
}
