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
//! Error types for the N-body engine
//!
//! Construction and configuration failures are reported through
//! [`SimulationError`]. Lookups of unknown body ids are not errors; they are
//! signalled through `bool`/`Option` results by the simulation.

use thiserror::Error;

/// Errors raised while constructing bodies, configuring the simulation, or
/// loading presets
#[derive(Debug, Error)]
pub enum SimulationError {
    /// Body ids must be non-negative
    #[error("Invalid body id {0}: ids must be non-negative")]
    InvalidBodyId(i64),

    /// Body masses must be non-negative and finite
    #[error("Invalid mass {0}: mass must be non-negative and finite")]
    InvalidMass(f64),

    /// A vector or scalar field was NaN or infinite
    #[error("Non-finite value for {field}")]
    NonFiniteValue {
        /// Name of the offending field
        field: &'static str,
    },

    /// A simulation parameter failed validation
    #[error("Invalid parameter {name} = {value}: {reason}")]
    InvalidParameter {
        /// Parameter name
        name: &'static str,
        /// Rejected value
        value: f64,
        /// Constraint that was violated
        reason: &'static str,
    },

    /// A bounding box with non-positive or non-finite half dimensions
    #[error("Degenerate bounds: half dimensions must be positive and finite")]
    DegenerateBounds,

    /// Every id up to the largest representable one has been handed out
    #[error("Body ids exhausted: no id left after {0}")]
    BodyIdsExhausted(u64),

    /// Two bodies in one body set share an id
    #[error("Duplicate body id {0}")]
    DuplicateBodyId(u64),

    /// A preset was structurally invalid
    #[error("Invalid preset: {0}")]
    InvalidPreset(String),

    /// A preset could not be parsed or serialized
    #[error("Preset JSON error: {0}")]
    PresetParse(#[from] serde_json::Error),

    /// A preset was written by an incompatible format version
    #[error("Incompatible preset version {found} (supported: {supported})")]
    IncompatiblePresetVersion {
        /// Version found in the preset
        found: String,
        /// Version supported by this engine
        supported: String,
    },
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, SimulationError>;
