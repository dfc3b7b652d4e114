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
//! Runge-Kutta 4th order (RK4) integrator implementation
//!
//! The classical four-stage method applied to the coupled first-order system
//! `ẋ = v, v̇ = a(x)`:
//!
//! ```text
//! k1_x = v                     k1_v = a(x)
//! k2_x = v + k1_v*dt/2         k2_v = a(x + k1_x*dt/2)
//! k3_x = v + k2_v*dt/2         k3_v = a(x + k2_x*dt/2)
//! k4_x = v + k3_v*dt           k4_v = a(x + k3_x*dt)
//! x(t + dt) = x + (k1_x + 2*k2_x + 2*k3_x + k4_x)*dt/6
//! v(t + dt) = v + (k1_v + 2*k2_v + 2*k3_v + k4_v)*dt/6
//! ```
//!
//! Every stage is evaluated for all bodies at once, because the acceleration
//! of one body depends on the stage positions of all the others.
//!
//! # Properties
//!
//! - **Fourth-order accurate**: Local error O(dt⁵), global error O(dt⁴)
//! - **Not symplectic**: Energy may drift over long simulations
//! - **Four evaluations per step**: More expensive than Verlet
//!
//! # References
//!
//! - Butcher, J. C. (2016). Numerical Methods for Ordinary Differential Equations
//!   (3rd ed.). Wiley. Chapter 3.
//! - Press, W. H., Teukolsky, S. A., Vetterling, W. T., & Flannery, B. P. (2007).
//!   Numerical Recipes (3rd ed.). Cambridge University Press. Section 17.1.

use super::{AccelerationField, BodyKinematics, IntegratorWorkspace};
use crate::math::Vector2D;

/// Reusable per-body stage buffers
#[derive(Debug, Default, Clone)]
pub(super) struct Rk4Buffers {
    k_x: Vec<Vector2D>,
    k_v: Vec<Vector2D>,
    sum_x: Vec<Vector2D>,
    sum_v: Vec<Vector2D>,
}

impl Rk4Buffers {
    fn prepare(&mut self, len: usize) {
        for buf in [&mut self.k_x, &mut self.k_v, &mut self.sum_x, &mut self.sum_v] {
            buf.clear();
            buf.resize(len, Vector2D::zero());
        }
    }
}

/// Stage offsets (as a fraction of dt) and weights for stages 2 to 4
const STAGES: [(f64, f64); 3] = [(0.5, 2.0), (0.5, 2.0), (1.0, 1.0)];

pub(super) fn step(
    states: &mut [BodyKinematics],
    initial: &[Vector2D],
    field: &mut dyn AccelerationField,
    dt: f64,
    workspace: &mut IntegratorWorkspace,
) {
    let n = states.len();
    workspace.prepare(n);
    let IntegratorWorkspace { positions, accelerations, rk4 } = workspace;
    rk4.prepare(n);

    // k1
    for i in 0..n {
        rk4.k_x[i] = states[i].velocity;
        rk4.k_v[i] = initial[i];
        rk4.sum_x[i] = rk4.k_x[i];
        rk4.sum_v[i] = rk4.k_v[i];
    }

    // k2, k3, k4
    for (offset, weight) in STAGES {
        let h = offset * dt;
        for i in 0..n {
            positions[i] = states[i].position + rk4.k_x[i] * h;
        }
        field.accelerations(&positions[..], &mut accelerations[..]);
        for i in 0..n {
            let stage_velocity = states[i].velocity + rk4.k_v[i] * h;
            rk4.k_x[i] = stage_velocity;
            rk4.k_v[i] = accelerations[i];
            rk4.sum_x[i] += stage_velocity * weight;
            rk4.sum_v[i] += accelerations[i] * weight;
        }
    }

    let dt_6 = dt / 6.0;
    for (i, state) in states.iter_mut().enumerate() {
        let velocity = state.velocity + rk4.sum_v[i] * dt_6;
        *state = BodyKinematics {
            position: state.position + rk4.sum_x[i] * dt_6,
            velocity,
            velocity_half_step: state.velocity + initial[i] * (0.5 * dt),
            acceleration: initial[i],
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ConstantField(Vector2D);

    impl AccelerationField for ConstantField {
        fn accelerations(&mut self, _positions: &[Vector2D], out: &mut [Vector2D]) {
            out.fill(self.0);
        }
    }

    #[test]
    fn test_constant_acceleration_accuracy() {
        // x(t) = x0 + v0*t + 0.5*a*t², exact for a polynomial trajectory
        let a = Vector2D::new(5.0, -2.0);
        let mut states = [BodyKinematics::new(Vector2D::zero(), Vector2D::new(1.0, 0.0))];
        let mut workspace = IntegratorWorkspace::new();
        let dt = 0.1;
        for _ in 0..100 {
            step(&mut states, &[a], &mut ConstantField(a), dt, &mut workspace);
        }
        let t: f64 = 10.0;
        assert!((states[0].position.x() - (t + 0.5 * 5.0 * t * t)).abs() < 1e-9);
        assert!((states[0].position.y() - (-0.5 * 2.0 * t * t)).abs() < 1e-9);
        assert!((states[0].velocity.x() - (1.0 + 5.0 * t)).abs() < 1e-9);
    }

    #[test]
    fn test_coupled_bodies_see_each_other() {
        // a_i = x_j - x_i: the stage positions of one body drive the other
        struct Coupled;
        impl AccelerationField for Coupled {
            fn accelerations(&mut self, positions: &[Vector2D], out: &mut [Vector2D]) {
                out[0] = positions[1] - positions[0];
                out[1] = positions[0] - positions[1];
            }
        }

        let mut states = [
            BodyKinematics::at_rest(Vector2D::new(-1.0, 0.0)),
            BodyKinematics::at_rest(Vector2D::new(1.0, 0.0)),
        ];
        let initial = [Vector2D::new(2.0, 0.0), Vector2D::new(-2.0, 0.0)];
        let mut workspace = IntegratorWorkspace::new();
        let dt = 0.01;
        step(&mut states, &initial, &mut Coupled, dt, &mut workspace);

        // separation s'' = -2 s, s(0) = 2 => s(t) = 2 cos(sqrt(2) t)
        let separation = states[1].position.x() - states[0].position.x();
        let exact = 2.0 * (2.0_f64.sqrt() * dt).cos();
        assert!((separation - exact).abs() < 1e-12);
        // momentum stays zero
        assert!((states[0].velocity + states[1].velocity).magnitude() < 1e-15);
    }
}
