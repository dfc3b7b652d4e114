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
//! Binary Star Example
//!
//! Two stars on a circular orbit with a ring of light test bodies around
//! them. Prints energy drift as the simulation runs, which makes the
//! difference between the integration schemes easy to see.
//!
//! # Running
//!
//! ```bash
//! # Velocity Verlet, 2000 ticks
//! cargo run --example binary_orbit --release
//!
//! # RK4 with a coarser Barnes-Hut threshold
//! cargo run --example binary_orbit --release -- --integrator rk4 --theta 1.0
//!
//! # Print the final preset as JSON
//! cargo run --example binary_orbit --release -- --steps 500 --preset
//! ```

use nbody_engine::body::BodyInit;
use nbody_engine::integration::IntegrationAlgorithm;
use nbody_engine::math::Vector2D;
use nbody_engine::simulation::{Simulation, SimulationParameters};

const STAR_MASS: f64 = 1.0;
const STAR_SEPARATION: f64 = 1.0;
const RING_BODIES: usize = 24;
const RING_RADIUS: f64 = 4.0;

struct Options {
    algorithm: IntegrationAlgorithm,
    steps: usize,
    theta: f64,
    print_preset: bool,
}

fn parse_args() -> Options {
    let mut options = Options {
        algorithm: IntegrationAlgorithm::VelocityVerlet,
        steps: 2000,
        theta: 0.5,
        print_preset: false,
    };

    let args: Vec<String> = std::env::args().collect();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--integrator" if i + 1 < args.len() => {
                options.algorithm = match args[i + 1].as_str() {
                    "euler" => IntegrationAlgorithm::SymplecticEuler,
                    "verlet" => IntegrationAlgorithm::VelocityVerlet,
                    "rk4" => IntegrationAlgorithm::RungeKutta4,
                    other => {
                        eprintln!("Warning: unknown integrator '{}', using verlet", other);
                        IntegrationAlgorithm::VelocityVerlet
                    }
                };
                i += 1;
            }
            "--steps" if i + 1 < args.len() => {
                options.steps = args[i + 1].parse().unwrap_or_else(|_| {
                    eprintln!("Warning: invalid step count '{}', using 2000", args[i + 1]);
                    2000
                });
                i += 1;
            }
            "--theta" if i + 1 < args.len() => {
                options.theta = args[i + 1].parse().unwrap_or_else(|_| {
                    eprintln!("Warning: invalid theta '{}', using 0.5", args[i + 1]);
                    0.5
                });
                i += 1;
            }
            "--preset" => options.print_preset = true,
            other => eprintln!("Warning: ignoring argument '{}'", other),
        }
        i += 1;
    }
    options
}

fn build(options: &Options) -> Result<Simulation, Box<dyn std::error::Error>> {
    let params = SimulationParameters::default()
        .with_theta(options.theta)
        .with_time_step(0.005)
        .with_integration_algorithm(options.algorithm);
    let mut sim = Simulation::with_parameters(params)?;

    // v² = G·m / (2d) for two equal masses
    let star_speed = (params.gravitational_constant * STAR_MASS / (2.0 * STAR_SEPARATION)).sqrt();
    for sign in [-1.0, 1.0] {
        sim.add_body(BodyInit {
            enabled: true,
            mass: STAR_MASS,
            position: Some(Vector2D::new(sign * STAR_SEPARATION / 2.0, 0.0)),
            velocity: Vector2D::new(0.0, sign * star_speed),
        })?;
    }

    // Ring bodies see the pair as a single mass of 2m at this distance
    let ring_speed = (params.gravitational_constant * 2.0 * STAR_MASS / RING_RADIUS).sqrt();
    for k in 0..RING_BODIES {
        let angle = k as f64 * std::f64::consts::TAU / RING_BODIES as f64;
        let (sin, cos) = angle.sin_cos();
        sim.add_body(BodyInit {
            enabled: true,
            mass: 1e-6,
            position: Some(Vector2D::new(RING_RADIUS * cos, RING_RADIUS * sin)),
            velocity: Vector2D::new(-ring_speed * sin, ring_speed * cos),
        })?;
    }
    Ok(sim)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let options = parse_args();

    println!("==========================================================");
    println!("       Binary Star N-Body Simulation");
    println!("==========================================================");
    println!("Integrator: {}", options.algorithm.name());
    println!("Theta:      {}", options.theta);
    println!("Ticks:      {}", options.steps);
    println!();

    let mut sim = build(&options)?;
    let initial = sim.total_energy();
    println!("Bodies: {}, initial energy: {:.9}", sim.len(), initial);

    let report_every = (options.steps / 10).max(1);
    let mut worst: f64 = 0.0;
    for step in 1..=options.steps {
        let result = sim.tick(step as f64 * 16.0);
        let drift = ((sim.total_energy() - initial) / initial).abs();
        worst = worst.max(drift);
        if step % report_every == 0 {
            println!(
                "t = {:8.3}  energy drift = {:.3e}  escaped = {}",
                result.sim_state.parameters.simulation_time,
                drift,
                result.body_states.iter().filter(|b| b.out_of_bounds).count()
            );
        }
    }

    println!();
    println!("Maximum relative energy drift: {:.3e}", worst);

    if options.print_preset {
        println!();
        println!("{}", sim.get_preset_json()?);
    }
    Ok(())
}
