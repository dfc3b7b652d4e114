// Copyright 2025 John Brosnihan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//! Celestial body entity
//!
//! A [`CelestialBody`] is a point mass with a stable id. Bodies are created
//! and removed by the [`Simulation`](crate::simulation::Simulation); their
//! base fields change only through [`CelestialBody::update`], which applies a
//! partial update atomically and reports the fields that actually changed as
//! a [`BodyDelta`].

use crate::error::{Result, SimulationError};
use crate::integration::BodyKinematics;
use crate::math::Vector2D;
use serde::{Deserialize, Serialize};

/// Identifier of a body, unique within one simulation
pub type BodyId = u64;

/// Mass assigned to bodies created without an explicit mass
pub const DEFAULT_BODY_MASS: f64 = 1.0;

/// Largest id a body can carry
///
/// Ids travel through presets as non-negative `i64`, so they never exceed
/// `i64::MAX`.
pub const MAX_BODY_ID: BodyId = i64::MAX as BodyId;

/// Radial spacing of the default placement spiral
pub const DEFAULT_PLACEMENT_SPACING: f64 = 1.0;

/// Golden angle in radians, used to spread default positions around the origin
const GOLDEN_ANGLE: f64 = 2.399_963_229_728_653;

/// Deterministic near-origin position for a body created without one
///
/// Ids are laid out on a golden-angle spiral whose radius grows with
/// `sqrt(id + 1)`. The radius is strictly increasing in `id`, so no two ids
/// map to the same point and no body starts at the origin.
///
/// ```
/// use nbody_engine::body::default_position;
///
/// assert_ne!(default_position(0), default_position(1));
/// assert!(default_position(0).magnitude() > 0.0);
/// ```
pub fn default_position(id: BodyId) -> Vector2D {
    let radius = DEFAULT_PLACEMENT_SPACING * ((id as f64) + 1.0).sqrt();
    let angle = (id as f64) * GOLDEN_ANGLE;
    Vector2D::new(radius * angle.cos(), radius * angle.sin())
}

/// Initial field values for [`CelestialBody::new`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyInit {
    /// Whether the body takes part in force calculation
    pub enabled: bool,
    /// Mass (non-negative)
    pub mass: f64,
    /// Starting position; `None` uses [`default_position`]
    pub position: Option<Vector2D>,
    /// Starting velocity
    pub velocity: Vector2D,
}

impl Default for BodyInit {
    fn default() -> Self {
        BodyInit {
            enabled: false,
            mass: DEFAULT_BODY_MASS,
            position: None,
            velocity: Vector2D::zero(),
        }
    }
}

/// Partial update of a body's base fields
///
/// Unset fields are left untouched. `pos_x`/`pos_y` and `vel_x`/`vel_y`
/// override the matching component of `position`/`velocity` (or of the
/// current value when the full vector is not given).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BodyUpdate {
    /// New enabled flag
    pub enabled: Option<bool>,
    /// New mass
    pub mass: Option<f64>,
    /// New position
    pub position: Option<Vector2D>,
    /// New x coordinate
    pub pos_x: Option<f64>,
    /// New y coordinate
    pub pos_y: Option<f64>,
    /// New velocity
    pub velocity: Option<Vector2D>,
    /// New x velocity
    pub vel_x: Option<f64>,
    /// New y velocity
    pub vel_y: Option<f64>,
}

impl BodyUpdate {
    /// Update that sets the enabled flag
    pub fn enabled(enabled: bool) -> Self {
        BodyUpdate { enabled: Some(enabled), ..Default::default() }
    }

    /// Update that sets the mass
    pub fn mass(mass: f64) -> Self {
        BodyUpdate { mass: Some(mass), ..Default::default() }
    }

    /// Update that sets the position
    pub fn position(position: Vector2D) -> Self {
        BodyUpdate { position: Some(position), ..Default::default() }
    }

    /// Update that sets the velocity
    pub fn velocity(velocity: Vector2D) -> Self {
        BodyUpdate { velocity: Some(velocity), ..Default::default() }
    }

    /// Builder: also set the enabled flag
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    /// Builder: also set the mass
    pub fn with_mass(mut self, mass: f64) -> Self {
        self.mass = Some(mass);
        self
    }

    /// Builder: also set the position
    pub fn with_position(mut self, position: Vector2D) -> Self {
        self.position = Some(position);
        self
    }

    /// Builder: also set the velocity
    pub fn with_velocity(mut self, velocity: Vector2D) -> Self {
        self.velocity = Some(velocity);
        self
    }

    fn resolve(base: Vector2D, full: Option<Vector2D>, x: Option<f64>, y: Option<f64>) -> Option<Vector2D> {
        if full.is_none() && x.is_none() && y.is_none() {
            return None;
        }
        let mut v = full.unwrap_or(base);
        if let Some(x) = x {
            v = v.with_x(x);
        }
        if let Some(y) = y {
            v = v.with_y(y);
        }
        Some(v)
    }
}

/// Fields of a body that changed in one update
///
/// Unchanged fields are `None`, so an observer can forward a minimal diff.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BodyDelta {
    /// Id of the changed body
    pub id: BodyId,
    /// New enabled flag, if changed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    /// New mass, if changed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mass: Option<f64>,
    /// New position, if changed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Vector2D>,
    /// New velocity, if changed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub velocity: Option<Vector2D>,
}

impl BodyDelta {
    fn empty(id: BodyId) -> Self {
        BodyDelta { id, enabled: None, mass: None, position: None, velocity: None }
    }

    /// True if no field changed
    pub fn is_empty(&self) -> bool {
        self.enabled.is_none() && self.mass.is_none() && self.position.is_none() && self.velocity.is_none()
    }

    /// Fold a later delta for the same body into this one
    ///
    /// Fields present in `later` win.
    pub fn merge(&mut self, later: &BodyDelta) {
        debug_assert_eq!(self.id, later.id);
        self.enabled = later.enabled.or(self.enabled);
        self.mass = later.mass.or(self.mass);
        self.position = later.position.or(self.position);
        self.velocity = later.velocity.or(self.velocity);
    }
}

/// A point mass taking part in the simulation
#[derive(Debug, Clone, PartialEq)]
pub struct CelestialBody {
    id: BodyId,
    enabled: bool,
    mass: f64,
    position: Vector2D,
    velocity: Vector2D,
    velocity_half_step: Vector2D,
    acceleration: Vector2D,
}

impl CelestialBody {
    /// Create a body
    ///
    /// # Errors
    ///
    /// Fails if `id` is negative, the mass is negative or non-finite, or a
    /// vector is non-finite.
    ///
    /// # Examples
    ///
    /// ```
    /// use nbody_engine::body::{BodyInit, CelestialBody};
    ///
    /// let body = CelestialBody::new(3, BodyInit { mass: 2.0, ..Default::default() }).unwrap();
    /// assert_eq!(body.id(), 3);
    /// assert!(!body.is_enabled());
    /// assert!(CelestialBody::new(-1, BodyInit::default()).is_err());
    /// ```
    pub fn new(id: i64, init: BodyInit) -> Result<Self> {
        let id = u64::try_from(id).map_err(|_| SimulationError::InvalidBodyId(id))?;
        validate_mass(init.mass)?;
        let position = init.position.unwrap_or_else(|| default_position(id));
        validate_vector("position", position)?;
        validate_vector("velocity", init.velocity)?;

        Ok(CelestialBody {
            id,
            enabled: init.enabled,
            mass: init.mass,
            position,
            velocity: init.velocity,
            velocity_half_step: init.velocity,
            acceleration: Vector2D::zero(),
        })
    }

    /// Disabled body with default mass and placement
    pub(crate) fn spawn(id: BodyId) -> Self {
        debug_assert!(id <= MAX_BODY_ID);
        let velocity = Vector2D::zero();
        CelestialBody {
            id,
            enabled: false,
            mass: DEFAULT_BODY_MASS,
            position: default_position(id),
            velocity,
            velocity_half_step: velocity,
            acceleration: Vector2D::zero(),
        }
    }

    /// Body id
    pub fn id(&self) -> BodyId {
        self.id
    }

    /// Whether the body takes part in force calculation
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Mass
    pub fn mass(&self) -> f64 {
        self.mass
    }

    /// Current position
    pub fn position(&self) -> Vector2D {
        self.position
    }

    /// Current velocity
    pub fn velocity(&self) -> Vector2D {
        self.velocity
    }

    /// Velocity at the most recent half step (leapfrog bookkeeping)
    pub fn velocity_half_step(&self) -> Vector2D {
        self.velocity_half_step
    }

    /// Acceleration computed during the most recent tick
    pub fn acceleration(&self) -> Vector2D {
        self.acceleration
    }

    /// Apply a partial update atomically
    ///
    /// Every supplied value is validated before anything is written, so a
    /// rejected update leaves the body untouched. Returns `Ok(None)` if no
    /// field actually changed (exact comparison), otherwise the changed
    /// fields.
    pub fn update(&mut self, update: &BodyUpdate) -> Result<Option<BodyDelta>> {
        if let Some(mass) = update.mass {
            validate_mass(mass)?;
        }
        let position = BodyUpdate::resolve(self.position, update.position, update.pos_x, update.pos_y);
        let velocity = BodyUpdate::resolve(self.velocity, update.velocity, update.vel_x, update.vel_y);
        if let Some(p) = position {
            validate_vector("position", p)?;
        }
        if let Some(v) = velocity {
            validate_vector("velocity", v)?;
        }

        let mut delta = BodyDelta::empty(self.id);
        if let Some(enabled) = update.enabled.filter(|&e| e != self.enabled) {
            self.enabled = enabled;
            delta.enabled = Some(enabled);
        }
        if let Some(mass) = update.mass.filter(|&m| m != self.mass) {
            self.mass = mass;
            delta.mass = Some(mass);
        }
        if let Some(position) = position.filter(|&p| p != self.position) {
            self.position = position;
            delta.position = Some(position);
        }
        if let Some(velocity) = velocity.filter(|&v| v != self.velocity) {
            self.velocity = velocity;
            self.velocity_half_step = velocity;
            delta.velocity = Some(velocity);
        }

        Ok(if delta.is_empty() { None } else { Some(delta) })
    }

    /// Snapshot of the integrator-facing state
    pub fn kinematics(&self) -> BodyKinematics {
        BodyKinematics {
            position: self.position,
            velocity: self.velocity,
            velocity_half_step: self.velocity_half_step,
            acceleration: self.acceleration,
        }
    }

    /// Write back the result of an integration step
    ///
    /// A step that produced non-finite values is discarded: the body keeps
    /// its last finite position and velocity, its step bookkeeping is reset,
    /// and it is disabled. The returned delta reports that change.
    pub(crate) fn apply_kinematics(&mut self, k: &BodyKinematics) -> Option<BodyDelta> {
        let finite = k.position.is_finite()
            && k.velocity.is_finite()
            && k.velocity_half_step.is_finite()
            && k.acceleration.is_finite();
        if !finite {
            self.velocity_half_step = self.velocity;
            self.acceleration = Vector2D::zero();
            return self.disable();
        }
        self.position = k.position;
        self.velocity = k.velocity;
        self.velocity_half_step = k.velocity_half_step;
        self.acceleration = k.acceleration;
        None
    }

    /// Turn the body off without going through a user update
    pub(crate) fn disable(&mut self) -> Option<BodyDelta> {
        if !self.enabled {
            return None;
        }
        self.enabled = false;
        Some(BodyDelta { enabled: Some(false), ..BodyDelta::empty(self.id) })
    }

    /// Whether either coordinate exceeds `limit` in absolute value or is not finite
    pub fn is_out_of_bounds(&self, limit: f64) -> bool {
        !self.position.is_finite() || self.position.x().abs() > limit || self.position.y().abs() > limit
    }
}

fn validate_mass(mass: f64) -> Result<()> {
    if mass >= 0.0 && mass.is_finite() {
        Ok(())
    } else {
        Err(SimulationError::InvalidMass(mass))
    }
}

fn validate_vector(field: &'static str, v: Vector2D) -> Result<()> {
    if v.is_finite() {
        Ok(())
    } else {
        Err(SimulationError::NonFiniteValue { field })
    }
}
