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
//! Barnes-Hut accuracy and tree invariants on random body clouds

use approx::assert_relative_eq;
use nbody_engine::gravity::{direct_accelerations, GravityLaw, PointMass};
use nbody_engine::math::Vector2D;
use nbody_engine::quadtree::Grid;

fn cloud(seed: u64, count: usize) -> Vec<PointMass> {
    let rng = fastrand::Rng::with_seed(seed);
    (0..count)
        .map(|_| {
            let position = Vector2D::new(rng.f64() * 200.0 - 100.0, rng.f64() * 200.0 - 100.0);
            PointMass::new(position, 0.5 + rng.f64() * 1.5)
        })
        .collect()
}

/// Relative RMS deviation of the tree accelerations from the exact ones
fn relative_error(grid: &Grid, exact: &[Vector2D], law: &GravityLaw, theta: f64) -> f64 {
    let mut deviation = 0.0;
    let mut magnitude = 0.0;
    for (i, &a) in exact.iter().enumerate() {
        deviation += (grid.acceleration_on(i, law, theta) - a).magnitude_squared();
        magnitude += a.magnitude_squared();
    }
    (deviation / magnitude).sqrt()
}

#[test]
fn test_error_shrinks_with_theta() {
    let law = GravityLaw::new(1.0, 0.01);
    for seed in [1, 7, 42] {
        let points = cloud(seed, 300);
        let exact = direct_accelerations(&points, &law);
        let mut grid = Grid::new();
        grid.rebuild(points.iter().copied());

        let coarse = relative_error(&grid, &exact, &law, 1.0);
        let medium = relative_error(&grid, &exact, &law, 0.5);
        let fine = relative_error(&grid, &exact, &law, 0.1);
        let exact_walk = relative_error(&grid, &exact, &law, 0.0);

        assert!(coarse > medium, "seed {}: {} <= {}", seed, coarse, medium);
        assert!(medium > fine, "seed {}: {} <= {}", seed, medium, fine);
        assert!(coarse < 0.2, "seed {}: theta 1.0 error {}", seed, coarse);
        assert!(exact_walk < 1e-12, "seed {}: theta 0 error {}", seed, exact_walk);
    }
}

#[test]
fn test_root_aggregates_all_mass() {
    let points = cloud(3, 500);
    let mut grid = Grid::new();
    grid.rebuild(points.iter().copied());

    let total: f64 = points.iter().map(|p| p.mass).sum();
    let weighted = points.iter().fold(Vector2D::zero(), |acc, p| acc + p.position * p.mass) / total;

    let root = grid.root().unwrap();
    assert_relative_eq!(root.mass(), total, max_relative = 1e-12);
    assert_relative_eq!(root.center_of_mass().x(), weighted.x(), epsilon = 1e-9);
    assert_relative_eq!(root.center_of_mass().y(), weighted.y(), epsilon = 1e-9);
    assert_eq!(root.body_count(), points.len());
}

#[test]
fn test_every_point_inside_outer_bounds() {
    let points = cloud(11, 200);
    let mut grid = Grid::new();
    grid.rebuild(points.iter().copied());
    let bounds = grid.outer_bounds().unwrap();
    assert!(points.iter().all(|p| bounds.contains(p.position)));
}

#[test]
fn test_internal_nodes_sum_children() {
    let points = cloud(5, 150);
    let mut grid = Grid::new();
    grid.rebuild(points.iter().copied());

    for id in 0..grid.node_count() {
        let node = grid.node(id);
        if let Some(children) = node.children() {
            let mass: f64 = children.iter().map(|&c| grid.node(c).mass()).sum();
            let count: usize = children.iter().map(|&c| grid.node(c).body_count()).sum();
            assert_relative_eq!(node.mass(), mass, max_relative = 1e-12);
            assert_eq!(node.body_count(), count);
        } else {
            assert!(node.body_count() <= 1, "leaf above depth limit holds {}", node.body_count());
        }
    }
}

#[test]
fn test_rebuild_reuses_grid() {
    let law = GravityLaw::new(1.0, 0.01);
    let mut grid = Grid::new();
    grid.rebuild(cloud(1, 100));
    let small = cloud(2, 10);
    grid.rebuild(small.iter().copied());

    assert_eq!(grid.points().len(), 10);
    let exact = direct_accelerations(&small, &law);
    assert!(relative_error(&grid, &exact, &law, 0.0) < 1e-12);
}
