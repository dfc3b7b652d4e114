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
//! Simulation parameters and engine configuration
//!
//! [`SimulationParameters`] are the physics settings persisted in presets.
//! [`SimulationConfig`] holds engine knobs that belong to the host rather
//! than to a scenario. Both validate eagerly and never clamp.

use crate::error::{Result, SimulationError};
use crate::gravity::{GravityLaw, DEFAULT_SOFTENING};
use crate::integration::IntegrationAlgorithm;
use crate::quadtree::DEFAULT_MAX_DEPTH;
use serde::{Deserialize, Serialize};

/// Default absolute coordinate limit beyond which a body is out of bounds
pub const DEFAULT_POSITION_LIMIT: f64 = 1.0e7;

/// Largest accepted quadtree depth limit
pub const MAX_TREE_DEPTH_LIMIT: u32 = 64;

/// Physics parameters of a simulation
///
/// # Example
///
/// ```
/// use nbody_engine::simulation::SimulationParameters;
/// use nbody_engine::integration::IntegrationAlgorithm;
///
/// let params = SimulationParameters::default()
///     .with_theta(0.3)
///     .with_integration_algorithm(IntegrationAlgorithm::RungeKutta4);
/// assert!(params.validate().is_ok());
/// assert!(params.with_theta(0.0).validate().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationParameters {
    /// Accumulated simulated time
    pub simulation_time: f64,
    /// Base step per tick (positive)
    pub time_step: f64,
    /// Multiplier applied to the step (non-negative; zero pauses)
    pub time_scale: f64,
    /// Direction of time; false integrates backwards
    pub is_time_forward: bool,
    /// Barnes-Hut opening threshold (positive; smaller is more accurate)
    pub theta: f64,
    /// Gravitational constant (non-negative)
    pub gravitational_constant: f64,
    /// Softening length (positive)
    pub epsilon: f64,
    /// Active integration scheme
    pub integration_algorithm: IntegrationAlgorithm,
}

impl Default for SimulationParameters {
    fn default() -> Self {
        SimulationParameters {
            simulation_time: 0.0,
            time_step: 0.01,
            time_scale: 1.0,
            is_time_forward: true,
            theta: 0.5,
            gravitational_constant: 1.0,
            epsilon: DEFAULT_SOFTENING,
            integration_algorithm: IntegrationAlgorithm::default(),
        }
    }
}

impl SimulationParameters {
    /// Set the base time step
    pub fn with_time_step(mut self, time_step: f64) -> Self {
        self.time_step = time_step;
        self
    }

    /// Set the time scale
    pub fn with_time_scale(mut self, time_scale: f64) -> Self {
        self.time_scale = time_scale;
        self
    }

    /// Set the direction of time
    pub fn with_time_forward(mut self, forward: bool) -> Self {
        self.is_time_forward = forward;
        self
    }

    /// Set the Barnes-Hut threshold
    pub fn with_theta(mut self, theta: f64) -> Self {
        self.theta = theta;
        self
    }

    /// Set the gravitational constant
    pub fn with_gravitational_constant(mut self, g: f64) -> Self {
        self.gravitational_constant = g;
        self
    }

    /// Set the softening length
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Set the integration scheme
    pub fn with_integration_algorithm(mut self, algorithm: IntegrationAlgorithm) -> Self {
        self.integration_algorithm = algorithm;
        self
    }

    /// Check every parameter against its constraint
    pub fn validate(&self) -> Result<()> {
        let finite = |v: f64| v.is_finite();
        let positive = |v: f64| v > 0.0 && v.is_finite();
        let non_negative = |v: f64| v >= 0.0 && v.is_finite();

        check("simulationTime", self.simulation_time, finite, "must be finite")?;
        check("timeStep", self.time_step, positive, "must be positive and finite")?;
        check("timeScale", self.time_scale, non_negative, "must be non-negative and finite")?;
        check("theta", self.theta, positive, "must be positive and finite")?;
        check(
            "gravitationalConstant",
            self.gravitational_constant,
            non_negative,
            "must be non-negative and finite",
        )?;
        check("epsilon", self.epsilon, positive, "must be positive and finite")
    }

    /// Simulated time advanced by one tick, negative when time runs backwards
    pub fn signed_step(&self) -> f64 {
        let dt = self.time_step * self.time_scale;
        if self.is_time_forward {
            dt
        } else {
            -dt
        }
    }

    /// Force law described by these parameters
    pub fn gravity_law(&self) -> GravityLaw {
        GravityLaw::new(self.gravitational_constant, self.epsilon)
    }

    /// Merge a partial update and validate the result
    ///
    /// `self` is not modified; the caller swaps in the returned value.
    pub fn merged(&self, update: &ParametersUpdate) -> Result<Self> {
        let merged = SimulationParameters {
            simulation_time: update.simulation_time.unwrap_or(self.simulation_time),
            time_step: update.time_step.unwrap_or(self.time_step),
            time_scale: update.time_scale.unwrap_or(self.time_scale),
            is_time_forward: update.is_time_forward.unwrap_or(self.is_time_forward),
            theta: update.theta.unwrap_or(self.theta),
            gravitational_constant: update.gravitational_constant.unwrap_or(self.gravitational_constant),
            epsilon: update.epsilon.unwrap_or(self.epsilon),
            integration_algorithm: update.integration_algorithm.unwrap_or(self.integration_algorithm),
        };
        merged.validate()?;
        Ok(merged)
    }
}

fn check(name: &'static str, value: f64, rule: impl Fn(f64) -> bool, reason: &'static str) -> Result<()> {
    if rule(value) {
        Ok(())
    } else {
        Err(SimulationError::InvalidParameter { name, value, reason })
    }
}

/// Partial update of [`SimulationParameters`]; unset fields stay unchanged
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParametersUpdate {
    /// New simulated time
    pub simulation_time: Option<f64>,
    /// New base step
    pub time_step: Option<f64>,
    /// New time scale
    pub time_scale: Option<f64>,
    /// New direction of time
    pub is_time_forward: Option<bool>,
    /// New Barnes-Hut threshold
    pub theta: Option<f64>,
    /// New gravitational constant
    pub gravitational_constant: Option<f64>,
    /// New softening length
    pub epsilon: Option<f64>,
    /// New integration scheme
    pub integration_algorithm: Option<IntegrationAlgorithm>,
}

/// What happens to a body whose position leaves the allowed region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OutOfBoundsPolicy {
    /// Turn the body off; it keeps its id and state
    #[default]
    Disable,
    /// Delete the body; its id is not reused
    Remove,
    /// Leave the body alone and only report the flag
    FlagOnly,
}

/// Engine configuration that is not part of a preset
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationConfig {
    /// Absolute coordinate limit per axis
    pub position_limit: f64,
    /// Policy applied to bodies beyond the limit
    pub out_of_bounds_policy: OutOfBoundsPolicy,
    /// Quadtree subdivision depth limit
    pub max_tree_depth: u32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            position_limit: DEFAULT_POSITION_LIMIT,
            out_of_bounds_policy: OutOfBoundsPolicy::default(),
            max_tree_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl SimulationConfig {
    /// Set the position limit
    pub fn with_position_limit(mut self, limit: f64) -> Self {
        self.position_limit = limit;
        self
    }

    /// Set the out-of-bounds policy
    pub fn with_out_of_bounds_policy(mut self, policy: OutOfBoundsPolicy) -> Self {
        self.out_of_bounds_policy = policy;
        self
    }

    /// Set the quadtree depth limit
    pub fn with_max_tree_depth(mut self, depth: u32) -> Self {
        self.max_tree_depth = depth;
        self
    }

    /// Check the configuration
    pub fn validate(&self) -> Result<()> {
        check(
            "positionLimit",
            self.position_limit,
            |v| v > 0.0 && v.is_finite(),
            "must be positive and finite",
        )?;
        let depth_ok = (1..=MAX_TREE_DEPTH_LIMIT).contains(&self.max_tree_depth);
        check("maxTreeDepth", f64::from(self.max_tree_depth), |_| depth_ok, "must be between 1 and 64")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(SimulationParameters::default().validate().is_ok());
        assert!(SimulationConfig::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_parameters_rejected() {
        let p = SimulationParameters::default();
        for bad in [
            p.with_theta(0.0),
            p.with_theta(-0.5),
            p.with_theta(f64::NAN),
            p.with_epsilon(-1e-3),
            p.with_epsilon(0.0),
            p.with_time_step(0.0),
            p.with_time_scale(-1.0),
            p.with_gravitational_constant(f64::INFINITY),
        ] {
            assert!(bad.validate().is_err(), "{:?}", bad);
        }
        assert!(p.with_epsilon(1e-9).validate().is_ok());
        assert!(p.with_time_scale(0.0).validate().is_ok());
    }

    #[test]
    fn test_signed_step() {
        let p = SimulationParameters::default().with_time_step(0.02).with_time_scale(3.0);
        assert!((p.signed_step() - 0.06).abs() < 1e-15);
        assert!((p.with_time_forward(false).signed_step() + 0.06).abs() < 1e-15);
    }

    #[test]
    fn test_merge_leaves_unset_fields() {
        let p = SimulationParameters::default();
        let update = ParametersUpdate { theta: Some(0.8), ..Default::default() };
        let merged = p.merged(&update).unwrap();
        assert_eq!(merged.theta, 0.8);
        assert_eq!(merged.time_step, p.time_step);
        assert_eq!(merged.integration_algorithm, p.integration_algorithm);
    }

    #[test]
    fn test_merge_rejects_whole_update() {
        let p = SimulationParameters::default();
        let update = ParametersUpdate { time_step: Some(0.5), epsilon: Some(-1.0), ..Default::default() };
        let err = p.merged(&update).unwrap_err();
        assert!(matches!(err, SimulationError::InvalidParameter { name: "epsilon", .. }));
    }

    #[test]
    fn test_update_from_json() {
        let update: ParametersUpdate =
            serde_json::from_str(r#"{"theta": 0.25, "integrationAlgorithm": "rungeKutta4"}"#).unwrap();
        assert_eq!(update.theta, Some(0.25));
        assert_eq!(update.integration_algorithm, Some(IntegrationAlgorithm::RungeKutta4));
        assert_eq!(update.time_step, None);
    }

    #[test]
    fn test_config_validation() {
        let c = SimulationConfig::default();
        assert!(c.with_position_limit(0.0).validate().is_err());
        assert!(c.with_max_tree_depth(0).validate().is_err());
        assert!(c.with_max_tree_depth(65).validate().is_err());
        assert!(c.with_max_tree_depth(64).validate().is_ok());
    }
}
