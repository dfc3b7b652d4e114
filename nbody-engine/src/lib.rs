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
//! # N-Body Engine
//!
//! A 2D gravitational N-body engine built around a Barnes-Hut quadtree,
//! driven one tick at a time by an external host.
//!
//! ## Features
//!
//! - **Barnes-Hut**: arena-backed quadtree rebuilt every tick, `theta` trades accuracy for speed
//! - **Softened gravity**: `a = -G·m·r / (|r|² + ε²)^(3/2)` for bodies and aggregated nodes alike
//! - **Integrators**: symplectic Euler, velocity Verlet and RK4, switchable between ticks
//! - **Changesets**: body CRUD with field-level deltas reported in each tick result
//! - **Presets**: versioned JSON snapshots that load atomically
//!
//! ## Example
//!
//! ```rust
//! use nbody_engine::body::BodyInit;
//! use nbody_engine::math::Vector2D;
//! use nbody_engine::simulation::Simulation;
//!
//! let mut sim = Simulation::new();
//! sim.add_body(BodyInit {
//!     enabled: true,
//!     mass: 10.0,
//!     position: Some(Vector2D::zero()),
//!     velocity: Vector2D::zero(),
//! })
//! .unwrap();
//! sim.add_body(BodyInit {
//!     enabled: true,
//!     mass: 0.001,
//!     position: Some(Vector2D::new(1.0, 0.0)),
//!     velocity: Vector2D::new(0.0, 10.0f64.sqrt()),
//! })
//! .unwrap();
//!
//! let result = sim.tick(16.0);
//! assert_eq!(result.sim_state.tick_count, 1);
//! ```

#![warn(missing_docs)]

/// Celestial body entity and partial updates
pub mod body;

/// Error types
pub mod error;

/// Softened gravitational law and acceleration fields
pub mod gravity;

/// Numerical integration methods
pub mod integration;

/// 2D vector and bounding box primitives
pub mod math;

/// Barnes-Hut quadtree
pub mod quadtree;

/// Simulation orchestration, parameters and presets
pub mod simulation;

pub use body::{BodyDelta, BodyId, BodyInit, BodyUpdate, CelestialBody};
pub use error::{Result, SimulationError};
pub use integration::IntegrationAlgorithm;
pub use math::{Aabb, Vector2D};
pub use simulation::{Preset, Simulation, SimulationConfig, SimulationParameters, TickResult};
