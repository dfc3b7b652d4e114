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
//! Tick results, changesets and flat state layouts
//!
//! A host that mirrors the simulation into a flat numeric buffer reads the
//! field order once from [`SimState::LAYOUT`] and [`BodyState::LAYOUT`] and
//! then copies [`TickResult::flatten`] every frame. The order of both
//! layouts is fixed for a given build.

use crate::body::{BodyDelta, BodyId, CelestialBody};
use crate::math::Vector2D;
use crate::simulation::params::SimulationParameters;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Simulation-level fields reported after every tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimState {
    /// Parameters in effect after the tick
    #[serde(flatten)]
    pub parameters: SimulationParameters,
    /// Number of ticks since construction or the last preset load
    pub tick_count: u64,
    /// Timestamp passed to the latest tick
    pub last_timestamp: f64,
    /// Number of bodies, enabled or not
    pub body_count: usize,
    /// Number of enabled bodies
    pub enabled_body_count: usize,
}

impl SimState {
    /// Field order of [`SimState::values`]
    pub const LAYOUT: &'static [&'static str] = &[
        "simulationTime",
        "timeStep",
        "timeScale",
        "isTimeForward",
        "theta",
        "gravitationalConstant",
        "epsilon",
        "integrationAlgorithm",
        "tickCount",
        "lastTimestamp",
        "bodyCount",
        "enabledBodyCount",
    ];

    /// Numeric encoding in [`SimState::LAYOUT`] order
    ///
    /// Booleans become 0 or 1 and the integrator becomes its index.
    pub fn values(&self) -> Vec<f64> {
        let p = &self.parameters;
        vec![
            p.simulation_time,
            p.time_step,
            p.time_scale,
            flag(p.is_time_forward),
            p.theta,
            p.gravitational_constant,
            p.epsilon,
            p.integration_algorithm.index() as f64,
            self.tick_count as f64,
            self.last_timestamp,
            self.body_count as f64,
            self.enabled_body_count as f64,
        ]
    }
}

/// Per-body snapshot reported after every tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BodyState {
    /// Body id
    pub id: BodyId,
    /// Whether the body takes part in force calculation
    pub enabled: bool,
    /// Mass
    pub mass: f64,
    /// Position
    pub position: Vector2D,
    /// Velocity
    pub velocity: Vector2D,
    /// Acceleration from the latest tick
    pub acceleration: Vector2D,
    /// Whether the body is beyond the position limit
    pub out_of_bounds: bool,
}

impl BodyState {
    /// Field order of [`BodyState::values`]
    pub const LAYOUT: &'static [&'static str] =
        &["id", "enabled", "mass", "posX", "posY", "velX", "velY", "accX", "accY", "outOfBounds"];

    /// Snapshot a body
    pub fn of(body: &CelestialBody, position_limit: f64) -> Self {
        BodyState {
            id: body.id(),
            enabled: body.is_enabled(),
            mass: body.mass(),
            position: body.position(),
            velocity: body.velocity(),
            acceleration: body.acceleration(),
            out_of_bounds: body.is_out_of_bounds(position_limit),
        }
    }

    /// Numeric encoding in [`BodyState::LAYOUT`] order
    pub fn values(&self) -> [f64; 10] {
        [
            self.id as f64,
            flag(self.enabled),
            self.mass,
            self.position.x(),
            self.position.y(),
            self.velocity.x(),
            self.velocity.y(),
            self.acceleration.x(),
            self.acceleration.y(),
            flag(self.out_of_bounds),
        ]
    }
}

fn flag(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

/// Bodies created, changed, or deleted since the previous result
///
/// Position and velocity changes made by integration are not listed here;
/// they are carried by the body snapshots.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Changeset {
    /// Ids of new bodies
    pub created: Vec<BodyId>,
    /// Field-level changes of surviving bodies
    pub updated: Vec<BodyDelta>,
    /// Ids of removed bodies
    pub deleted: Vec<BodyId>,
}

impl Changeset {
    /// True if nothing changed
    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.updated.is_empty() && self.deleted.is_empty()
    }
}

/// Outcome of one tick or preset load
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TickResult {
    /// Simulation-level fields
    pub sim_state: SimState,
    /// Every body in id order
    pub body_states: Vec<BodyState>,
    /// Structural changes since the previous result
    pub changes: Changeset,
}

impl TickResult {
    /// Sim fields followed by each body's fields, in layout order
    pub fn flatten(&self) -> Vec<f64> {
        let mut out = self.sim_state.values();
        out.reserve(self.body_states.len() * BodyState::LAYOUT.len());
        for body in &self.body_states {
            out.extend_from_slice(&body.values());
        }
        out
    }
}

/// Changes accumulated between two results
#[derive(Debug, Default)]
pub(crate) struct PendingChanges {
    created: BTreeSet<BodyId>,
    updated: BTreeMap<BodyId, BodyDelta>,
    deleted: BTreeSet<BodyId>,
}

impl PendingChanges {
    pub(crate) fn created(&mut self, id: BodyId) {
        self.created.insert(id);
    }

    /// Record a delta; new bodies already report their full state
    pub(crate) fn updated(&mut self, delta: BodyDelta) {
        if self.created.contains(&delta.id) {
            return;
        }
        self.updated
            .entry(delta.id)
            .and_modify(|d| d.merge(&delta))
            .or_insert(delta);
    }

    /// Record a removal; a body created since the last drain vanishes silently
    pub(crate) fn deleted(&mut self, id: BodyId) {
        self.updated.remove(&id);
        if !self.created.remove(&id) {
            self.deleted.insert(id);
        }
    }

    pub(crate) fn drain(&mut self) -> Changeset {
        Changeset {
            created: std::mem::take(&mut self.created).into_iter().collect(),
            updated: std::mem::take(&mut self.updated).into_values().collect(),
            deleted: std::mem::take(&mut self.deleted).into_iter().collect(),
        }
    }
}
