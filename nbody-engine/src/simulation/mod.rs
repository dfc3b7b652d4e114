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
//! Simulation orchestration
//!
//! [`Simulation`] owns the body set, the physics parameters and the reusable
//! quadtree. A host drives it with [`Simulation::tick`] once per frame and
//! mutates bodies between ticks.
//!
//! # Tick order
//!
//! 1. Δt from `time_step × time_scale`, negated when time runs backwards
//! 2. Grid rebuild from the enabled bodies
//! 3. Accelerations and integration with the active scheme
//! 4. Out-of-bounds policy over every body
//! 5. `simulation_time += Δt`
//!
//! # Example
//!
//! ```
//! use nbody_engine::body::BodyUpdate;
//! use nbody_engine::math::Vector2D;
//! use nbody_engine::simulation::Simulation;
//!
//! let mut sim = Simulation::new();
//! let a = sim.add_new_body().unwrap();
//! let b = sim.add_new_body().unwrap();
//! sim.update_body(a, &BodyUpdate::enabled(true).with_position(Vector2D::new(-1.0, 0.0))).unwrap();
//! sim.update_body(b, &BodyUpdate::enabled(true).with_position(Vector2D::new(1.0, 0.0))).unwrap();
//!
//! let result = sim.tick(16.0);
//! assert_eq!(result.body_states.len(), 2);
//! assert!(result.body_states[0].velocity.x() > 0.0);
//! ```

mod params;
mod preset;
mod state;

pub use params::{
    OutOfBoundsPolicy, ParametersUpdate, SimulationConfig, SimulationParameters, DEFAULT_POSITION_LIMIT,
    MAX_TREE_DEPTH_LIMIT,
};
pub use preset::{Preset, PresetBody, PresetSimulation, PRESET_FORMAT_VERSION};
pub use state::{BodyState, Changeset, SimState, TickResult};

use crate::body::{BodyId, BodyInit, BodyUpdate, CelestialBody, MAX_BODY_ID};
use crate::error::{Result, SimulationError};
use crate::gravity::{self, BarnesHutField, PointMass};
use crate::integration::{self, AccelerationField, BodyKinematics, IntegratorWorkspace};
use crate::math::Vector2D;
use crate::quadtree::Grid;
use state::PendingChanges;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Per-tick buffers for the enabled bodies, reused across ticks
#[derive(Debug, Default)]
struct TickScratch {
    ids: Vec<BodyId>,
    masses: Vec<f64>,
    positions: Vec<Vector2D>,
    initial: Vec<Vector2D>,
    states: Vec<BodyKinematics>,
}

impl TickScratch {
    fn clear(&mut self) {
        self.ids.clear();
        self.masses.clear();
        self.positions.clear();
        self.initial.clear();
        self.states.clear();
    }
}

/// A gravitational N-body simulation
#[derive(Debug)]
pub struct Simulation {
    bodies: BTreeMap<BodyId, CelestialBody>,
    next_id: BodyId,
    params: SimulationParameters,
    config: SimulationConfig,
    grid: Grid,
    workspace: IntegratorWorkspace,
    scratch: TickScratch,
    changes: PendingChanges,
    tick_count: u64,
    last_timestamp: f64,
}

impl Simulation {
    /// Create an empty simulation with default parameters and configuration
    pub fn new() -> Self {
        let config = SimulationConfig::default();
        Simulation {
            bodies: BTreeMap::new(),
            next_id: 0,
            params: SimulationParameters::default(),
            config,
            grid: Grid::new(),
            workspace: IntegratorWorkspace::new(),
            scratch: TickScratch::default(),
            changes: PendingChanges::default(),
            tick_count: 0,
            last_timestamp: 0.0,
        }
    }

    /// Create an empty simulation with the given parameters
    ///
    /// # Errors
    ///
    /// Fails if a parameter is out of range.
    pub fn with_parameters(params: SimulationParameters) -> Result<Self> {
        Self::with_config(params, SimulationConfig::default())
    }

    /// Create an empty simulation with the given parameters and configuration
    pub fn with_config(params: SimulationParameters, config: SimulationConfig) -> Result<Self> {
        params.validate()?;
        config.validate()?;
        let mut sim = Self::new();
        sim.params = params;
        sim.config = config;
        sim.grid = Grid::with_max_depth(config.max_tree_depth)?;
        Ok(sim)
    }

    /// Current physics parameters
    pub fn parameters(&self) -> &SimulationParameters {
        &self.params
    }

    /// Current engine configuration
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Apply a partial parameter update
    ///
    /// The merged parameters are validated as a whole; on error nothing
    /// changes.
    pub fn update_parameters(&mut self, update: &ParametersUpdate) -> Result<()> {
        self.params = self.params.merged(update)?;
        debug!("Parameters updated: {:?}", self.params);
        Ok(())
    }

    /// Replace the engine configuration
    pub fn set_config(&mut self, config: SimulationConfig) -> Result<()> {
        config.validate()?;
        if config.max_tree_depth != self.config.max_tree_depth {
            self.grid = Grid::with_max_depth(config.max_tree_depth)?;
        }
        self.config = config;
        Ok(())
    }

    /// Number of bodies, enabled or not
    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    /// True if the simulation has no bodies
    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    /// Look up a body
    pub fn body(&self, id: BodyId) -> Option<&CelestialBody> {
        self.bodies.get(&id)
    }

    /// All bodies in id order
    pub fn bodies(&self) -> impl Iterator<Item = &CelestialBody> {
        self.bodies.values()
    }

    /// All body ids in ascending order
    pub fn body_ids(&self) -> Vec<BodyId> {
        self.bodies.keys().copied().collect()
    }

    /// Id the next created body will receive
    pub fn next_body_id(&self) -> BodyId {
        self.next_id
    }

    /// Create a disabled body at its default position
    ///
    /// Ids increase monotonically and are never reused, even after deletion.
    ///
    /// # Errors
    ///
    /// Fails with [`SimulationError::BodyIdsExhausted`] once every id up to
    /// [`MAX_BODY_ID`] has been handed out.
    pub fn add_new_body(&mut self) -> Result<BodyId> {
        let id = self.allocate_id()?;
        self.bodies.insert(id, CelestialBody::spawn(id));
        self.changes.created(id);
        debug!("Created body {}", id);
        Ok(id)
    }

    /// Create a body from explicit initial values
    ///
    /// A missing position falls back to the default placement for the new id.
    ///
    /// # Errors
    ///
    /// Fails if the mass or a vector is invalid, or if ids are exhausted; no
    /// id is consumed then.
    pub fn add_body(&mut self, init: BodyInit) -> Result<BodyId> {
        let raw = i64::try_from(self.next_id).map_err(|_| self.exhausted())?;
        let body = CelestialBody::new(raw, init)?;
        let id = self.allocate_id()?;
        self.bodies.insert(id, body);
        self.changes.created(id);
        debug!("Created body {} (mass {})", id, init.mass);
        Ok(id)
    }

    // next_id stays within MAX_BODY_ID + 1, so the increment cannot wrap
    fn allocate_id(&mut self) -> Result<BodyId> {
        let id = self.next_id;
        if id > MAX_BODY_ID {
            return Err(self.exhausted());
        }
        self.next_id = id + 1;
        Ok(id)
    }

    fn exhausted(&self) -> SimulationError {
        SimulationError::BodyIdsExhausted(MAX_BODY_ID)
    }

    /// Remove a body, returning whether it existed
    pub fn delete_body(&mut self, id: BodyId) -> bool {
        if self.bodies.remove(&id).is_none() {
            return false;
        }
        self.changes.deleted(id);
        debug!("Deleted body {}", id);
        true
    }

    /// Apply a partial update to a body
    ///
    /// Returns `Ok(false)` for an unknown id. Changed fields are reported in
    /// the next result's changeset; a no-op update reports nothing.
    ///
    /// # Errors
    ///
    /// Fails if a supplied value is invalid; the body is left untouched.
    pub fn update_body(&mut self, id: BodyId, update: &BodyUpdate) -> Result<bool> {
        let body = match self.bodies.get_mut(&id) {
            Some(body) => body,
            None => return Ok(false),
        };
        if let Some(delta) = body.update(update)? {
            self.changes.updated(delta);
        }
        Ok(true)
    }

    /// Advance the simulation by one step
    ///
    /// `timestamp_ms` is recorded in the sim state but does not influence
    /// the step size.
    pub fn tick(&mut self, timestamp_ms: f64) -> TickResult {
        let dt = self.params.signed_step();
        self.integrate(dt);
        self.enforce_bounds();

        self.params.simulation_time += dt;
        self.tick_count += 1;
        self.last_timestamp = timestamp_ms;
        self.result()
    }

    fn integrate(&mut self, dt: f64) {
        let scratch = &mut self.scratch;
        scratch.clear();
        for body in self.bodies.values().filter(|b| b.is_enabled()) {
            scratch.ids.push(body.id());
            scratch.masses.push(body.mass());
            scratch.positions.push(body.position());
            scratch.states.push(body.kinematics());
        }
        if scratch.ids.is_empty() {
            return;
        }
        scratch.initial.resize(scratch.ids.len(), Vector2D::zero());

        let mut field = BarnesHutField::new(&mut self.grid, &scratch.masses, self.params.gravity_law(), self.params.theta);
        field.accelerations(&scratch.positions, &mut scratch.initial);
        self.params
            .integration_algorithm
            .step(&mut scratch.states, &scratch.initial, &mut field, dt, &mut self.workspace);

        for (id, state) in scratch.ids.iter().zip(&scratch.states) {
            let Some(body) = self.bodies.get_mut(id) else { continue };
            if let Some(delta) = body.apply_kinematics(state) {
                warn!("Body {} produced a non-finite state, disabled", id);
                self.changes.updated(delta);
            }
        }
    }

    fn enforce_bounds(&mut self) {
        let limit = self.config.position_limit;
        let policy = self.config.out_of_bounds_policy;
        if policy == OutOfBoundsPolicy::FlagOnly {
            return;
        }
        let escaped: Vec<BodyId> = self
            .bodies
            .values()
            .filter(|b| b.is_out_of_bounds(limit))
            .map(CelestialBody::id)
            .collect();

        for id in escaped {
            match policy {
                OutOfBoundsPolicy::Disable => {
                    if let Some(delta) = self.bodies.get_mut(&id).and_then(CelestialBody::disable) {
                        warn!("Body {} left the position limit {}, disabled", id, limit);
                        self.changes.updated(delta);
                    }
                }
                OutOfBoundsPolicy::Remove => {
                    warn!("Body {} left the position limit {}, removed", id, limit);
                    self.delete_body(id);
                }
                OutOfBoundsPolicy::FlagOnly => {}
            }
        }
    }

    /// Simulation-level fields as of now
    pub fn sim_state(&self) -> SimState {
        SimState {
            parameters: self.params,
            tick_count: self.tick_count,
            last_timestamp: self.last_timestamp,
            body_count: self.bodies.len(),
            enabled_body_count: self.bodies.values().filter(|b| b.is_enabled()).count(),
        }
    }

    /// Snapshot of every body in id order
    pub fn body_states(&self) -> Vec<BodyState> {
        let limit = self.config.position_limit;
        self.bodies.values().map(|b| BodyState::of(b, limit)).collect()
    }

    fn result(&mut self) -> TickResult {
        TickResult {
            sim_state: self.sim_state(),
            body_states: self.body_states(),
            changes: self.changes.drain(),
        }
    }

    /// Field names of [`SimState::values`]
    pub fn sim_state_layout(&self) -> &'static [&'static str] {
        SimState::LAYOUT
    }

    /// Field names of [`BodyState::values`]
    pub fn body_state_layout(&self) -> &'static [&'static str] {
        BodyState::LAYOUT
    }

    /// Export parameters and base body fields
    pub fn get_preset(&self) -> Preset {
        Preset {
            version: PRESET_FORMAT_VERSION.to_string(),
            simulation: PresetSimulation { parameters: self.params, next_body_id: Some(self.next_id) },
            bodies: self.bodies.values().map(PresetBody::from).collect(),
        }
    }

    /// Export the preset as JSON
    pub fn get_preset_json(&self) -> Result<String> {
        self.get_preset().to_json()
    }

    /// Replace parameters and bodies from a preset
    ///
    /// The preset is validated completely before anything is replaced, so a
    /// failed load leaves the simulation as it was. Tick bookkeeping restarts
    /// and the returned changeset lists the old bodies as deleted and the new
    /// ones as created.
    pub fn load_preset(&mut self, preset: &Preset) -> Result<TickResult> {
        let loaded = preset.load()?;

        let old_ids: Vec<BodyId> = self.bodies.keys().copied().collect();
        for id in old_ids {
            self.changes.deleted(id);
        }
        self.bodies = loaded.bodies.into_iter().map(|b| (b.id(), b)).collect();
        for &id in self.bodies.keys() {
            self.changes.created(id);
        }
        self.params = loaded.parameters;
        self.next_id = loaded.next_body_id;
        self.tick_count = 0;
        self.last_timestamp = 0.0;

        info!(
            "Loaded preset: {} bodies, {} integrator",
            self.bodies.len(),
            self.params.integration_algorithm.name()
        );
        Ok(self.result())
    }

    /// Parse and load a JSON preset
    pub fn load_preset_json(&mut self, json: &str) -> Result<TickResult> {
        let preset = Preset::from_json(json)?;
        self.load_preset(&preset)
    }

    /// Kinetic plus softened potential energy of the enabled bodies
    pub fn total_energy(&self) -> f64 {
        let enabled = || self.bodies.values().filter(|b| b.is_enabled());
        let kinetic = integration::total_kinetic_energy(enabled().map(|b| (b.mass(), b.velocity())));
        let points: Vec<PointMass> = enabled().map(|b| PointMass::new(b.position(), b.mass())).collect();
        kinetic + gravity::potential_energy(&points, &self.params.gravity_law())
    }
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integration::IntegrationAlgorithm;

    fn enabled_at(sim: &mut Simulation, x: f64, y: f64) -> BodyId {
        let id = sim.add_new_body().unwrap();
        sim.update_body(id, &BodyUpdate::enabled(true).with_position(Vector2D::new(x, y)))
            .unwrap();
        id
    }

    #[test]
    fn test_ids_are_never_reused() {
        let mut sim = Simulation::new();
        let a = sim.add_new_body().unwrap();
        let b = sim.add_new_body().unwrap();
        assert!(sim.delete_body(b));
        let c = sim.add_new_body().unwrap();
        assert_eq!((a, b, c), (0, 1, 2));
        assert_eq!(sim.body_ids(), vec![0, 2]);
    }

    #[test]
    fn test_new_bodies_are_disabled_and_apart() {
        let mut sim = Simulation::new();
        let a = sim.add_new_body().unwrap();
        let b = sim.add_new_body().unwrap();
        assert!(!sim.body(a).unwrap().is_enabled());
        assert_ne!(sim.body(a).unwrap().position(), sim.body(b).unwrap().position());
    }

    #[test]
    fn test_disabled_bodies_do_not_move() {
        let mut sim = Simulation::new();
        let a = sim.add_new_body().unwrap();
        enabled_at(&mut sim, 0.0, 0.0);
        let before = sim.body(a).unwrap().position();
        sim.tick(0.0);
        assert_eq!(sim.body(a).unwrap().position(), before);
    }

    #[test]
    fn test_tick_advances_time_and_counts() {
        let mut sim = Simulation::new();
        let step = sim.parameters().signed_step();
        sim.tick(10.0);
        let result = sim.tick(26.0);
        assert_eq!(result.sim_state.tick_count, 2);
        assert_eq!(result.sim_state.last_timestamp, 26.0);
        assert!((result.sim_state.parameters.simulation_time - 2.0 * step).abs() < 1e-15);
    }

    #[test]
    fn test_backward_time_decreases_simulation_time() {
        let mut sim = Simulation::new();
        sim.update_parameters(&ParametersUpdate { is_time_forward: Some(false), ..Default::default() })
            .unwrap();
        sim.tick(0.0);
        assert!(sim.parameters().simulation_time < 0.0);
    }

    #[test]
    fn test_changeset_reports_once() {
        let mut sim = Simulation::new();
        let a = sim.add_new_body().unwrap();
        let first = sim.tick(0.0);
        assert_eq!(first.changes.created, vec![a]);

        sim.update_body(a, &BodyUpdate::mass(4.0)).unwrap();
        let second = sim.tick(0.0);
        assert!(second.changes.created.is_empty());
        assert_eq!(second.changes.updated.len(), 1);
        assert_eq!(second.changes.updated[0].mass, Some(4.0));

        assert!(sim.tick(0.0).changes.is_empty());
    }

    #[test]
    fn test_disable_policy() {
        let config = SimulationConfig::default().with_position_limit(10.0);
        let mut sim = Simulation::with_config(SimulationParameters::default(), config).unwrap();
        let id = enabled_at(&mut sim, 20.0, 0.0);
        sim.tick(0.0);
        let result = sim.tick(0.0);
        assert!(!sim.body(id).unwrap().is_enabled());
        assert!(result.body_states[0].out_of_bounds);
    }

    #[test]
    fn test_remove_policy() {
        let config = SimulationConfig::default()
            .with_position_limit(10.0)
            .with_out_of_bounds_policy(OutOfBoundsPolicy::Remove);
        let mut sim = Simulation::with_config(SimulationParameters::default(), config).unwrap();
        sim.tick(0.0);
        let id = enabled_at(&mut sim, 0.0, -50.0);
        let result = sim.tick(0.0);
        assert!(sim.body(id).is_none());
        assert!(result.changes.deleted.is_empty());
        assert!(result.changes.created.is_empty());
        assert_eq!(sim.add_new_body().unwrap(), id + 1);
    }

    #[test]
    fn test_total_energy_of_pair_at_rest() {
        let mut sim = Simulation::new();
        enabled_at(&mut sim, -1.0, 0.0);
        enabled_at(&mut sim, 1.0, 0.0);
        let eps2 = 0.01f64 * 0.01;
        let expected = -1.0 / (4.0 + eps2).sqrt();
        assert!((sim.total_energy() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_switching_integrator_between_ticks() {
        let mut sim = Simulation::new();
        enabled_at(&mut sim, -1.0, 0.0);
        enabled_at(&mut sim, 1.0, 0.0);
        for algorithm in IntegrationAlgorithm::ALL {
            sim.update_parameters(&ParametersUpdate { integration_algorithm: Some(algorithm), ..Default::default() })
                .unwrap();
            let result = sim.tick(0.0);
            assert!(result.body_states.iter().all(|b| b.position.is_finite()));
        }
        assert!(sim.body(0).unwrap().position().x() > -1.0);
    }
}
