//! Curve guide objects (`_SPL`), their constraints and hook modifiers.

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::bone::BoneId;
use crate::constraint::ChildOfInverse;
use crate::error::{ArmatureError, ArmatureResult};
use crate::mode::{check_transition, Mode, ObjectKind};

/// Default number of polyline samples per Bezier segment.
pub const DEFAULT_RESOLUTION: u32 = 12;

/// A Bezier control point with its two handles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BezierPoint {
    pub co: DVec3,
    pub handle_left: DVec3,
    pub handle_right: DVec3,
}

impl BezierPoint {
    /// Creates a point with handles collapsed onto it.
    pub fn new(co: DVec3) -> Self {
        Self {
            co,
            handle_left: co,
            handle_right: co,
        }
    }

    /// Creates a point with handles placed along `tangent` on either side.
    pub fn with_tangent(co: DVec3, tangent: DVec3) -> Self {
        Self {
            co,
            handle_left: co - tangent,
            handle_right: co + tangent,
        }
    }
}

/// A hook modifier: makes curve points follow an armature bone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HookModifier {
    /// Modifier name; matches the handle bone's name at creation.
    pub name: String,
    pub armature: String,
    pub subtarget: BoneId,
    /// Indices of the control points this hook moves.
    pub points: Vec<usize>,
}

/// Object-level `Child Of` constraint binding a curve to an armature bone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectChildOf {
    pub name: String,
    pub armature: String,
    pub subtarget: BoneId,
    pub channels: [bool; 9],
    pub inverse: ChildOfInverse,
}

/// A Bezier curve object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Curve {
    pub name: String,
    pub points: Vec<BezierPoint>,
    #[serde(default = "default_resolution")]
    pub resolution: u32,
    #[serde(default)]
    pub constraints: Vec<ObjectChildOf>,
    #[serde(default)]
    pub modifiers: Vec<HookModifier>,
    #[serde(default)]
    mode: Mode,
}

fn default_resolution() -> u32 {
    DEFAULT_RESOLUTION
}

impl Curve {
    /// Creates a curve from control points.
    pub fn new(name: impl Into<String>, points: Vec<BezierPoint>) -> Self {
        Self {
            name: name.into(),
            points,
            resolution: DEFAULT_RESOLUTION,
            constraints: Vec::new(),
            modifiers: Vec::new(),
            mode: Mode::Object,
        }
    }

    /// Returns the current mode.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Switches mode. Curves cannot enter pose mode.
    pub fn set_mode(&mut self, mode: Mode) -> ArmatureResult<()> {
        check_transition(ObjectKind::Curve, &self.name, mode)?;
        self.mode = mode;
        Ok(())
    }

    /// Samples the curve as a polyline.
    pub fn sample(&self) -> Vec<DVec3> {
        let Some(first) = self.points.first() else {
            return Vec::new();
        };
        let steps = self.resolution.max(1);
        let mut out = vec![first.co];
        for pair in self.points.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            for step in 1..=steps {
                let t = step as f64 / steps as f64;
                out.push(cubic_bezier(a.co, a.handle_right, b.handle_left, b.co, t));
            }
        }
        out
    }

    /// Returns the arc length of the sampled curve.
    pub fn length(&self) -> f64 {
        self.sample().windows(2).map(|w| w[0].distance(w[1])).sum()
    }

    /// Returns the point at `fraction` of the arc length, clamped to `[0, 1]`.
    pub fn point_at_fraction(&self, fraction: f64) -> ArmatureResult<DVec3> {
        let samples = self.sample();
        let Some(first) = samples.first().copied() else {
            return Err(ArmatureError::invalid_parameter(
                "curve",
                format!("curve '{}' has no control points", self.name),
            ));
        };

        let total: f64 = samples.windows(2).map(|w| w[0].distance(w[1])).sum();
        let wanted = fraction.clamp(0.0, 1.0) * total;
        let mut walked = 0.0;
        for w in samples.windows(2) {
            let segment = w[0].distance(w[1]);
            if segment > 0.0 && walked + segment >= wanted {
                return Ok(w[0].lerp(w[1], (wanted - walked) / segment));
            }
            walked += segment;
        }
        Ok(samples.last().copied().unwrap_or(first))
    }
}

fn cubic_bezier(p0: DVec3, p1: DVec3, p2: DVec3, p3: DVec3, t: f64) -> DVec3 {
    let u = 1.0 - t;
    p0 * (u * u * u) + p1 * (3.0 * u * u * t) + p2 * (3.0 * u * t * t) + p3 * (t * t * t)
}
