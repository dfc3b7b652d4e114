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
//! Numerical integration schemes
//!
//! Three interchangeable schemes advance the enabled bodies by one time step.
//! Each one reads the accelerations at the starting positions (computed by
//! the caller) and asks an [`AccelerationField`] for any further evaluations
//! it needs.
//!
//! # Integrators
//!
//! - **Symplectic Euler**: first order, one force evaluation per step.
//!   Cheap, energy oscillates with an O(dt) amplitude.
//! - **Velocity Verlet**: second order, symplectic, one extra evaluation at
//!   the drifted positions. Bounded energy error over long runs.
//! - **RK4 (Runge-Kutta 4th order)**: fourth order accurate, not symplectic,
//!   three extra evaluations per step.
//!
//! # Choosing an Integrator
//!
//! - **Velocity Verlet**: best for long-running orbital simulations.
//! - **RK4**: best when short-term accuracy matters more than long-term
//!   energy behavior.
//! - **Symplectic Euler**: cheapest; adequate for interactive previews.
//!
//! # Scheme switching
//!
//! The active scheme can change between ticks. No scheme reads the
//! half-step velocity or acceleration left behind by a previous step, so
//! stale or zeroed bookkeeping fields from another scheme are harmless.
//! A negative `dt` integrates backwards in time.

use crate::math::Vector2D;
use serde::{Deserialize, Serialize};

pub mod euler;
pub mod rk4;
pub mod verlet;

/// Source of accelerations for a set of bodies
///
/// Implementations keep the masses fixed for their lifetime; the integrator
/// supplies positions for every evaluation. `out` has the same length as
/// `positions`.
pub trait AccelerationField {
    /// Write the acceleration of every body at the given positions into `out`
    fn accelerations(&mut self, positions: &[Vector2D], out: &mut [Vector2D]);
}

/// Integrator-facing state of one body
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BodyKinematics {
    /// Position
    pub position: Vector2D,
    /// Velocity
    pub velocity: Vector2D,
    /// Velocity at the middle of the most recent step
    pub velocity_half_step: Vector2D,
    /// Acceleration at the start of the most recent step
    pub acceleration: Vector2D,
}

impl BodyKinematics {
    /// State at rest at a position
    pub fn at_rest(position: Vector2D) -> Self {
        BodyKinematics { position, ..Default::default() }
    }

    /// State with a position and velocity
    pub fn new(position: Vector2D, velocity: Vector2D) -> Self {
        BodyKinematics { position, velocity, velocity_half_step: velocity, acceleration: Vector2D::zero() }
    }
}

/// Scratch buffers reused across steps to avoid per-tick allocation
#[derive(Debug, Default, Clone)]
pub struct IntegratorWorkspace {
    positions: Vec<Vector2D>,
    accelerations: Vec<Vector2D>,
    rk4: rk4::Rk4Buffers,
}

impl IntegratorWorkspace {
    /// Create an empty workspace
    pub fn new() -> Self {
        Self::default()
    }

    fn prepare(&mut self, len: usize) {
        self.positions.clear();
        self.positions.resize(len, Vector2D::zero());
        self.accelerations.clear();
        self.accelerations.resize(len, Vector2D::zero());
    }
}

/// The selectable integration schemes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IntegrationAlgorithm {
    /// `v' = v + a·dt; x' = x + v'·dt`
    SymplecticEuler,
    /// `x' = x + v·dt + ½a·dt²; v' = v + ½(a + a')·dt`
    #[default]
    VelocityVerlet,
    /// Classical four-stage Runge-Kutta on `ẋ = v, v̇ = a(x)`
    RungeKutta4,
}

impl IntegrationAlgorithm {
    /// All schemes in index order
    pub const ALL: [IntegrationAlgorithm; 3] = [
        IntegrationAlgorithm::SymplecticEuler,
        IntegrationAlgorithm::VelocityVerlet,
        IntegrationAlgorithm::RungeKutta4,
    ];

    /// Human-readable name
    pub fn name(self) -> &'static str {
        match self {
            IntegrationAlgorithm::SymplecticEuler => "Symplectic Euler",
            IntegrationAlgorithm::VelocityVerlet => "Velocity Verlet",
            IntegrationAlgorithm::RungeKutta4 => "Runge-Kutta 4",
        }
    }

    /// Stable numeric code used in flat state buffers
    pub fn index(self) -> usize {
        match self {
            IntegrationAlgorithm::SymplecticEuler => 0,
            IntegrationAlgorithm::VelocityVerlet => 1,
            IntegrationAlgorithm::RungeKutta4 => 2,
        }
    }

    /// Inverse of [`IntegrationAlgorithm::index`]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Force evaluations per step, including the one at the start position
    pub fn force_evaluations(self) -> usize {
        match self {
            IntegrationAlgorithm::SymplecticEuler => 1,
            IntegrationAlgorithm::VelocityVerlet => 2,
            IntegrationAlgorithm::RungeKutta4 => 4,
        }
    }

    /// Advance every state by `dt`
    ///
    /// `initial` holds the accelerations at the current positions, one per
    /// state. The field is consulted for any additional evaluations.
    pub fn step(
        self,
        states: &mut [BodyKinematics],
        initial: &[Vector2D],
        field: &mut dyn AccelerationField,
        dt: f64,
        workspace: &mut IntegratorWorkspace,
    ) {
        debug_assert_eq!(states.len(), initial.len());
        if states.is_empty() {
            return;
        }
        match self {
            IntegrationAlgorithm::SymplecticEuler => euler::step(states, initial, dt),
            IntegrationAlgorithm::VelocityVerlet => verlet::step(states, initial, field, dt, workspace),
            IntegrationAlgorithm::RungeKutta4 => rk4::step(states, initial, field, dt, workspace),
        }
    }
}

/// Kinetic energy of one body
///
/// KE = 0.5 * m * v²
pub fn kinetic_energy(mass: f64, velocity: Vector2D) -> f64 {
    0.5 * mass * velocity.magnitude_squared()
}

/// Total kinetic energy of a set of (mass, velocity) pairs
pub fn total_kinetic_energy<I>(bodies: I) -> f64
where
    I: IntoIterator<Item = (f64, Vector2D)>,
{
    bodies.into_iter().map(|(m, v)| kinetic_energy(m, v)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Harmonic spring pulling every body toward the origin: a = -(k/m) x
    pub(super) struct SpringField {
        pub omega_sq: f64,
    }

    impl AccelerationField for SpringField {
        fn accelerations(&mut self, positions: &[Vector2D], out: &mut [Vector2D]) {
            for (slot, p) in out.iter_mut().zip(positions) {
                *slot = *p * -self.omega_sq;
            }
        }
    }

    fn one_step_error(algorithm: IntegrationAlgorithm, dt: f64) -> f64 {
        let omega: f64 = 10.0;
        let mut field = SpringField { omega_sq: omega * omega };
        let mut states = [BodyKinematics::at_rest(Vector2D::new(1.0, 0.0))];
        let initial = [Vector2D::new(-omega * omega, 0.0)];
        let mut workspace = IntegratorWorkspace::new();
        algorithm.step(&mut states, &initial, &mut field, dt, &mut workspace);
        (states[0].position.x() - (omega * dt).cos()).abs()
    }

    #[test]
    fn test_local_error_ordering() {
        let euler = one_step_error(IntegrationAlgorithm::SymplecticEuler, 0.01);
        let verlet = one_step_error(IntegrationAlgorithm::VelocityVerlet, 0.01);
        let rk4 = one_step_error(IntegrationAlgorithm::RungeKutta4, 0.01);
        assert!(euler > verlet, "euler {} verlet {}", euler, verlet);
        assert!(verlet > rk4, "verlet {} rk4 {}", verlet, rk4);
        assert!(rk4 < 1e-7);
    }

    #[test]
    fn test_index_round_trip() {
        for algorithm in IntegrationAlgorithm::ALL {
            assert_eq!(IntegrationAlgorithm::from_index(algorithm.index()), Some(algorithm));
        }
        assert_eq!(IntegrationAlgorithm::from_index(3), None);
        assert_eq!(IntegrationAlgorithm::default(), IntegrationAlgorithm::VelocityVerlet);
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&IntegrationAlgorithm::RungeKutta4).unwrap();
        assert_eq!(json, "\"rungeKutta4\"");
        let parsed: IntegrationAlgorithm = serde_json::from_str("\"symplecticEuler\"").unwrap();
        assert_eq!(parsed, IntegrationAlgorithm::SymplecticEuler);
    }

    #[test]
    fn test_free_motion_all_schemes() {
        for algorithm in IntegrationAlgorithm::ALL {
            let mut field = SpringField { omega_sq: 0.0 };
            let mut states = [BodyKinematics::new(Vector2D::zero(), Vector2D::new(1.0, 2.0))];
            let mut workspace = IntegratorWorkspace::new();
            for _ in 0..10 {
                algorithm.step(&mut states, &[Vector2D::zero()], &mut field, 0.1, &mut workspace);
            }
            assert!((states[0].position.x() - 1.0).abs() < 1e-12, "{}", algorithm.name());
            assert!((states[0].position.y() - 2.0).abs() < 1e-12, "{}", algorithm.name());
            assert_eq!(states[0].velocity, Vector2D::new(1.0, 2.0));
        }
    }

    #[test]
    fn test_kinetic_energy() {
        assert_eq!(kinetic_energy(2.0, Vector2D::new(3.0, 4.0)), 25.0);
        let total = total_kinetic_energy([(1.0, Vector2D::new(1.0, 0.0)), (2.0, Vector2D::new(0.0, 1.0))]);
        assert_eq!(total, 1.5);
    }
}
