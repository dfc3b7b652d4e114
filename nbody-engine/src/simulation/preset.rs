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
//! Preset export and import
//!
//! A [`Preset`] is a complete snapshot of the physics parameters and the
//! body set, exchanged as JSON. Loading validates the whole document before
//! the live simulation is touched.

use crate::body::{BodyId, BodyInit, CelestialBody, MAX_BODY_ID};
use crate::error::{Result, SimulationError};
use crate::math::Vector2D;
use crate::simulation::params::SimulationParameters;
use semver::Version;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Format version written into every exported preset
pub const PRESET_FORMAT_VERSION: &str = "1.0.0";

/// Serializable snapshot of a simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preset {
    /// Format version of the document
    pub version: String,
    /// Simulation-level section
    pub simulation: PresetSimulation,
    /// Bodies in id order
    pub bodies: Vec<PresetBody>,
}

/// Simulation-level section of a preset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresetSimulation {
    /// Physics parameters
    #[serde(flatten)]
    pub parameters: SimulationParameters,
    /// Next id the simulation hands out; absent in hand-written presets
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_body_id: Option<BodyId>,
}

/// Base fields of one body
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresetBody {
    /// Body id (must be non-negative)
    pub id: i64,
    /// Enabled flag
    #[serde(default)]
    pub enabled: bool,
    /// Mass
    pub mass: f64,
    /// Position
    pub position: Vector2D,
    /// Velocity
    #[serde(default)]
    pub velocity: Vector2D,
}

impl From<&CelestialBody> for PresetBody {
    fn from(body: &CelestialBody) -> Self {
        PresetBody {
            // lossless: no body id exceeds MAX_BODY_ID
            id: body.id() as i64,
            enabled: body.is_enabled(),
            mass: body.mass(),
            position: body.position(),
            velocity: body.velocity(),
        }
    }
}

/// A validated preset ready to be swapped in
#[derive(Debug)]
pub(crate) struct LoadedPreset {
    pub(crate) parameters: SimulationParameters,
    pub(crate) bodies: Vec<CelestialBody>,
    pub(crate) next_body_id: BodyId,
}

impl Preset {
    /// Parse a preset from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize the preset as pretty-printed JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check the format version against [`PRESET_FORMAT_VERSION`]
    pub fn check_version(&self) -> Result<()> {
        if is_version_compatible(&self.version, PRESET_FORMAT_VERSION) {
            Ok(())
        } else {
            Err(SimulationError::IncompatiblePresetVersion {
                found: self.version.clone(),
                supported: PRESET_FORMAT_VERSION.to_string(),
            })
        }
    }

    /// Validate every section and build the bodies
    pub(crate) fn load(&self) -> Result<LoadedPreset> {
        self.check_version()?;
        let parameters = self.simulation.parameters;
        parameters.validate()?;

        let mut seen = BTreeSet::new();
        let mut bodies = Vec::with_capacity(self.bodies.len());
        for entry in &self.bodies {
            let body = CelestialBody::new(
                entry.id,
                BodyInit {
                    enabled: entry.enabled,
                    mass: entry.mass,
                    position: Some(entry.position),
                    velocity: entry.velocity,
                },
            )?;
            if !seen.insert(body.id()) {
                return Err(SimulationError::DuplicateBodyId(body.id()));
            }
            bodies.push(body);
        }
        bodies.sort_by_key(CelestialBody::id);

        // entry ids passed the i64 check, so max + 1 stays within MAX_BODY_ID + 1
        let after_last = seen.last().map_or(0, |&max| max + 1);
        let next_body_id = self.simulation.next_body_id.unwrap_or(0).max(after_last);
        if next_body_id > MAX_BODY_ID + 1 {
            return Err(SimulationError::InvalidPreset(format!(
                "nextBodyId {} exceeds the largest body id {}",
                next_body_id, MAX_BODY_ID
            )));
        }

        Ok(LoadedPreset { parameters, bodies, next_body_id })
    }
}

/// Check if a preset version can be read by this engine
///
/// Rules:
/// - Major version must match exactly
/// - Preset minor version must be <= engine minor version
/// - For 0.x.y, minor versions are breaking and must match
fn is_version_compatible(preset_version: &str, engine_version: &str) -> bool {
    let (preset, engine) = match (Version::parse(preset_version), Version::parse(engine_version)) {
        (Ok(p), Ok(e)) => (p, e),
        _ => return false,
    };
    if preset.major != engine.major {
        return false;
    }
    if preset.major != 0 {
        preset.minor <= engine.minor
    } else {
        preset.minor == engine.minor
    }
}
