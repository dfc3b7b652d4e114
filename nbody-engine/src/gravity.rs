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
//! Softened Newtonian gravity
//!
//! Every interaction in the engine, whether between two bodies or between a
//! body and an aggregated quadtree node, goes through [`GravityLaw`]:
//!
//! **a = -G * m * r / (|r|² + ε²)^(3/2)**
//!
//! where `r` is the offset from the source to the query point and ε is the
//! softening length. The ε² term keeps the acceleration finite as `|r| → 0`.
//!
//! # References
//!
//! - Dehnen, W. (2001). "Towards optimal softening in three-dimensional N-body codes"
//! - Aarseth, S. J. (2003). "Gravitational N-Body Simulations"
//!
//! Two [`AccelerationField`] implementations live here: [`DirectSummation`]
//! evaluates all pairs exactly and serves as the reference, while
//! [`BarnesHutField`] rebuilds a [`Grid`] at the requested positions and
//! answers through the Barnes-Hut approximation.

use crate::integration::AccelerationField;
use crate::math::Vector2D;
use crate::quadtree::Grid;

/// Gravitational constant in SI units (m³/(kg⋅s²)), CODATA 2018
pub const GRAVITATIONAL_CONSTANT: f64 = 6.67430e-11;

/// Default softening length in simulation units
pub const DEFAULT_SOFTENING: f64 = 0.01;

/// A mass at a position, the unit stored in the quadtree
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointMass {
    /// Position of the mass
    pub position: Vector2D,
    /// Mass value
    pub mass: f64,
}

impl PointMass {
    /// Create a point mass
    pub fn new(position: Vector2D, mass: f64) -> Self {
        PointMass { position, mass }
    }
}

/// Softened inverse-square gravity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GravityLaw {
    g: f64,
    epsilon: f64,
}

impl GravityLaw {
    /// Create a law with gravitational constant `g` and softening length `epsilon`
    ///
    /// Values are validated by the simulation parameters; this type trusts them.
    pub fn new(g: f64, epsilon: f64) -> Self {
        GravityLaw { g, epsilon }
    }

    /// Gravitational constant
    pub fn g(&self) -> f64 {
        self.g
    }

    /// Softening length
    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Acceleration at `query` caused by `mass` located at `source`
    ///
    /// A query exactly at the source yields zero: the numerator vanishes.
    /// A softened distance so small that its cube underflows also yields
    /// zero rather than an infinite factor times a vanishing offset.
    pub fn acceleration(&self, query: Vector2D, source: Vector2D, mass: f64) -> Vector2D {
        let r = query - source;
        let softened = r.magnitude_squared() + self.epsilon * self.epsilon;
        let inv_cube = 1.0 / (softened * softened.sqrt());
        if !inv_cube.is_finite() {
            return Vector2D::zero();
        }
        r * (-self.g * mass * inv_cube)
    }

    /// Softened potential energy of a pair
    ///
    /// `U = -G m₁ m₂ / sqrt(r² + ε²)`, the potential whose gradient is
    /// [`GravityLaw::acceleration`].
    pub fn potential_energy(&self, a: &PointMass, b: &PointMass) -> f64 {
        let softened = (a.position - b.position).magnitude_squared() + self.epsilon * self.epsilon;
        if softened == 0.0 {
            return 0.0;
        }
        -self.g * a.mass * b.mass / softened.sqrt()
    }
}

/// Total softened potential energy of a set of point masses (exact, O(n²))
pub fn potential_energy(points: &[PointMass], law: &GravityLaw) -> f64 {
    let mut total = 0.0;
    for (i, a) in points.iter().enumerate() {
        for b in &points[i + 1..] {
            total += law.potential_energy(a, b);
        }
    }
    total
}

/// Exact pairwise accelerations on every point
pub fn direct_accelerations(points: &[PointMass], law: &GravityLaw) -> Vec<Vector2D> {
    points
        .iter()
        .enumerate()
        .map(|(i, p)| {
            points
                .iter()
                .enumerate()
                .filter(|&(j, _)| j != i)
                .fold(Vector2D::zero(), |acc, (_, q)| {
                    acc + law.acceleration(p.position, q.position, q.mass)
                })
        })
        .collect()
}

/// Exact O(n²) acceleration field
///
/// Masses are fixed for the lifetime of the field; positions come from the
/// integrator at each evaluation.
pub struct DirectSummation<'a> {
    masses: &'a [f64],
    law: GravityLaw,
}

impl<'a> DirectSummation<'a> {
    /// Create a field over the given masses
    pub fn new(masses: &'a [f64], law: GravityLaw) -> Self {
        DirectSummation { masses, law }
    }
}

impl AccelerationField for DirectSummation<'_> {
    fn accelerations(&mut self, positions: &[Vector2D], out: &mut [Vector2D]) {
        debug_assert_eq!(positions.len(), self.masses.len());
        for (i, (slot, &p)) in out.iter_mut().zip(positions).enumerate() {
            let mut acc = Vector2D::zero();
            for (j, (&q, &m)) in positions.iter().zip(self.masses).enumerate() {
                if j != i {
                    acc += self.law.acceleration(p, q, m);
                }
            }
            *slot = acc;
        }
    }
}

/// Barnes-Hut acceleration field backed by a reusable [`Grid`]
///
/// Each evaluation rebuilds the grid from the given positions, so the tree
/// never outlives the positions it was built from.
pub struct BarnesHutField<'a> {
    grid: &'a mut Grid,
    masses: &'a [f64],
    law: GravityLaw,
    theta: f64,
}

impl<'a> BarnesHutField<'a> {
    /// Create a field over the given masses
    pub fn new(grid: &'a mut Grid, masses: &'a [f64], law: GravityLaw, theta: f64) -> Self {
        BarnesHutField { grid, masses, law, theta }
    }

    /// The grid as built by the latest evaluation
    pub fn grid(&self) -> &Grid {
        &*self.grid
    }
}

impl AccelerationField for BarnesHutField<'_> {
    fn accelerations(&mut self, positions: &[Vector2D], out: &mut [Vector2D]) {
        debug_assert_eq!(positions.len(), self.masses.len());
        self.grid.rebuild(
            positions
                .iter()
                .zip(self.masses)
                .map(|(&p, &m)| PointMass::new(p, m)),
        );
        for (i, slot) in out.iter_mut().enumerate() {
            *slot = self.grid.acceleration_on(i, &self.law, self.theta);
        }
    }
}
