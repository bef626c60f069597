//! Autorig Rig Library
//!
//! This crate turns an instantiated template skeleton into a complete
//! animation rig.
//!
//! # Overview
//!
//! - **Builder**: low-level bone graph primitives (duplicate, parent, lock,
//!   constrain, drive, spline chains and hooks) over an explicit armature
//! - **Pipeline**: the fixed sequence of stages that assembles spine,
//!   shoulders, neck, FK/IK limbs, forearm torsion, fingers and foot roll
//! - **Operators**: add, populate, clean and delete acting on a [`Workspace`]
//!
//! # Example
//!
//! ```
//! use autorig_armature::{evaluate, ProductionState, TemplateAsset};
//! use autorig_rig::{operators, RigConfig, Workspace};
//!
//! let mut workspace = Workspace::new();
//! operators::add_armature(&mut workspace, &TemplateAsset::humanoid()).unwrap();
//!
//! let report = operators::populate(&mut workspace, &RigConfig::default()).unwrap();
//! assert!(report.is_complete());
//!
//! let rig = workspace.active().unwrap();
//! assert_eq!(rig.armature.properties().production_state, ProductionState::Ready);
//! assert!(evaluate(&rig.armature).is_ok());
//! ```
//!
//! # Modules
//!
//! - [`builder`]: bone graph primitives
//! - [`config`]: pipeline configuration
//! - [`error`]: error types
//! - [`operators`]: rig lifecycle operators
//! - [`pipeline`]: rig assembly stages and the populate report

pub mod builder;
pub mod config;
pub mod error;
pub mod operators;
pub mod pipeline;

pub use config::{PerSide, RigConfig};
pub use error::{RigError, RigResult};
pub use operators::{CleanReport, Workspace};
pub use pipeline::{populate, PopulateReport, Side, Stage, StageOutcome, StageReport};
