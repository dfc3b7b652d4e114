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
//! Symplectic (semi-implicit) Euler integrator
//!
//! ```text
//! v(t + dt) = v(t) + a(t)*dt
//! x(t + dt) = x(t) + v(t + dt)*dt
//! ```
//!
//! Updating velocity first makes the scheme symplectic: energy oscillates
//! around the true value instead of growing without bound, at first-order
//! accuracy and one force evaluation per step.

use super::BodyKinematics;
use crate::math::Vector2D;

/// Advance one body given its acceleration at the current position
pub fn advance(state: &BodyKinematics, acceleration: Vector2D, dt: f64) -> BodyKinematics {
    let velocity = state.velocity + acceleration * dt;
    BodyKinematics {
        position: state.position + velocity * dt,
        velocity,
        velocity_half_step: velocity,
        acceleration,
    }
}

pub(super) fn step(states: &mut [BodyKinematics], initial: &[Vector2D], dt: f64) {
    for (state, &a) in states.iter_mut().zip(initial) {
        *state = advance(state, a, dt);
    }
}
