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
//! Barnes-Hut quadtree
//!
//! The [`Grid`] is rebuilt from scratch every tick from the enabled bodies'
//! positions. It is never updated incrementally, so aggregate masses and
//! centers of mass can never go stale.
//!
//! # Layout
//!
//! Nodes live in a single arena (`Vec<Node>`) and refer to each other by
//! index. A rebuild clears the arena but keeps its allocation, so steady-state
//! ticks do not allocate. Because children are always pushed after their
//! parent, walking the arena backwards visits every child before its parent;
//! that is how the bottom-up mass pass runs without recursion.
//!
//! # Algorithm
//!
//! 1. Compute the outer bounds: the smallest square enclosing every point,
//!    padded by a relative and an absolute margin.
//! 2. Insert points one at a time. An occupied leaf is split into four
//!    quadrants and its occupant moved down. Below `max_depth` a leaf holds at
//!    most one point; at the limit, coincident points share a leaf.
//! 3. Aggregate mass and center of mass bottom-up.
//! 4. Answer acceleration queries by walking from the root. A node of width
//!    `s` whose center of mass is at distance `d` is treated as a single mass
//!    when `s / d < theta` and the node does not contain the query point.
//!
//! # References
//!
//! - Barnes, J., & Hut, P. (1986). "A hierarchical O(N log N) force-calculation
//!   algorithm". Nature, 324, 446-449.

mod node;

pub use node::{Node, NodeId};

use crate::error::{Result, SimulationError};
use crate::gravity::{GravityLaw, PointMass};
use crate::math::{Aabb, Vector2D};
use tracing::{debug, trace, warn};

/// Default limit on subdivision depth
pub const DEFAULT_MAX_DEPTH: u32 = 48;

/// Relative margin added to the outer bounds
pub const RELATIVE_PADDING: f64 = 1e-3;

/// Absolute margin added to the outer bounds
pub const ABSOLUTE_PADDING: f64 = 1e-6;

const ROOT: NodeId = 0;

/// Spatial index over the enabled bodies of one tick
///
/// Points are addressed by their index in the slice passed to
/// [`Grid::rebuild`].
///
/// # Example
///
/// ```
/// use nbody_engine::gravity::{GravityLaw, PointMass};
/// use nbody_engine::math::Vector2D;
/// use nbody_engine::quadtree::Grid;
///
/// let mut grid = Grid::new();
/// grid.rebuild([
///     PointMass::new(Vector2D::new(-1.0, 0.0), 1.0),
///     PointMass::new(Vector2D::new(1.0, 0.0), 1.0),
/// ]);
/// assert_eq!(grid.root().unwrap().mass(), 2.0);
///
/// let a = grid.acceleration_on(0, &GravityLaw::new(1.0, 0.0), 0.5);
/// assert!(a.x() > 0.0);
/// ```
#[derive(Debug, Clone)]
pub struct Grid {
    nodes: Vec<Node>,
    points: Vec<PointMass>,
    next_in_leaf: Vec<Option<usize>>,
    outer_bounds: Option<Aabb>,
    max_depth: u32,
}

impl Grid {
    /// Create an empty grid with the default depth limit
    pub fn new() -> Self {
        Grid {
            nodes: Vec::new(),
            points: Vec::new(),
            next_in_leaf: Vec::new(),
            outer_bounds: None,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Create an empty grid with a custom depth limit
    ///
    /// # Errors
    ///
    /// Fails if `max_depth` is zero.
    pub fn with_max_depth(max_depth: u32) -> Result<Self> {
        if max_depth == 0 {
            return Err(SimulationError::InvalidParameter {
                name: "maxTreeDepth",
                value: 0.0,
                reason: "must be at least 1",
            });
        }
        Ok(Grid { max_depth, ..Self::new() })
    }

    /// Depth limit used when inserting
    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    /// Drop the current tree, keeping allocations for the next rebuild
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.points.clear();
        self.next_in_leaf.clear();
        self.outer_bounds = None;
    }

    /// Rebuild the tree from a fresh set of points
    ///
    /// Points with non-finite positions are kept addressable by index but are
    /// left out of the tree; they neither feel nor exert any force.
    pub fn rebuild<I>(&mut self, points: I)
    where
        I: IntoIterator<Item = PointMass>,
    {
        self.clear();
        self.points.extend(points);
        self.next_in_leaf.resize(self.points.len(), None);

        let finite = self.points.iter().map(|p| p.position).filter(Vector2D::is_finite);
        let bounds = match Aabb::enclosing(finite, RELATIVE_PADDING, ABSOLUTE_PADDING) {
            Ok(Some(bounds)) => bounds,
            Ok(None) => return,
            Err(e) => {
                warn!("Cannot bound {} points, leaving grid empty: {}", self.points.len(), e);
                return;
            }
        };
        self.outer_bounds = Some(bounds);
        self.nodes.push(Node::leaf(bounds, 0));

        let mut depth_limited = 0;
        for index in 0..self.points.len() {
            if self.points[index].position.is_finite() && self.insert(index) {
                depth_limited += 1;
            }
        }
        if depth_limited > 0 {
            debug!("{} points stored in shared leaves at depth limit {}", depth_limited, self.max_depth);
        }

        self.evaluate();
        trace!("Rebuilt grid: {} points, {} nodes", self.points.len(), self.nodes.len());
    }

    /// Insert one point, returning true if it landed in a depth-limited leaf
    /// that already had an occupant
    fn insert(&mut self, index: usize) -> bool {
        let position = self.points[index].position;
        let mut node_id = ROOT;
        loop {
            let node = &self.nodes[node_id];
            if let Some(first) = node.first_child {
                node_id = first + node.bounds.quadrant_of(position).index();
                continue;
            }
            let (head, depth, bounds) = (node.head, node.depth, node.bounds);
            match head {
                None => {
                    self.push_occupant(node_id, index);
                    return false;
                }
                Some(_) if depth >= self.max_depth => {
                    self.push_occupant(node_id, index);
                    return true;
                }
                Some(existing) => {
                    // Below the depth limit a leaf never holds more than one point
                    let quadrant = bounds.quadrant_of(self.points[existing].position);
                    let first = self.subdivide(node_id);
                    let leaf = &mut self.nodes[node_id];
                    leaf.head = None;
                    leaf.occupants = 0;
                    self.next_in_leaf[existing] = None;
                    self.push_occupant(first + quadrant.index(), existing);
                }
            }
        }
    }

    fn push_occupant(&mut self, node_id: NodeId, index: usize) {
        let node = &mut self.nodes[node_id];
        self.next_in_leaf[index] = node.head;
        node.head = Some(index);
        node.occupants += 1;
    }

    fn subdivide(&mut self, node_id: NodeId) -> NodeId {
        let first = self.nodes.len();
        let parent = &self.nodes[node_id];
        let depth = parent.depth + 1;
        let quadrants = parent.bounds.subdivide();
        self.nodes.extend(quadrants.into_iter().map(|b| Node::leaf(b, depth)));
        self.nodes[node_id].first_child = Some(first);
        first
    }

    /// Bottom-up pass computing mass, center of mass and body count
    fn evaluate(&mut self) {
        for id in (0..self.nodes.len()).rev() {
            let mut mass = 0.0;
            let mut weighted = Vector2D::zero();
            let mut position_sum = Vector2D::zero();
            let mut count = 0;

            match self.nodes[id].first_child {
                Some(first) => {
                    for child in &self.nodes[first..first + 4] {
                        if child.body_count == 0 {
                            continue;
                        }
                        mass += child.mass;
                        weighted += child.center_of_mass * child.mass;
                        position_sum += child.center_of_mass * child.body_count as f64;
                        count += child.body_count;
                    }
                }
                None => {
                    for index in self.occupants_of(id) {
                        let p = &self.points[index];
                        mass += p.mass;
                        weighted += p.position * p.mass;
                        position_sum += p.position;
                        count += 1;
                    }
                }
            }

            let node = &mut self.nodes[id];
            node.mass = mass;
            node.body_count = count;
            node.center_of_mass = if mass > 0.0 {
                weighted / mass
            } else if count > 0 {
                // Massless subtrees fall back to their mean position
                position_sum / count as f64
            } else {
                node.bounds.center()
            };
        }
    }

    /// Indices of the points stored directly in a leaf
    pub fn occupants_of(&self, node_id: NodeId) -> Occupants<'_> {
        Occupants {
            next: self.nodes[node_id].head,
            links: &self.next_in_leaf,
        }
    }

    /// The root node, or `None` if the grid holds no points
    pub fn root(&self) -> Option<&Node> {
        self.nodes.first()
    }

    /// A node by arena id
    ///
    /// # Panics
    ///
    /// Panics if `id` is out of range.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    /// Number of nodes in the arena
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Depth of the deepest node, or `None` for an empty grid
    pub fn depth(&self) -> Option<u32> {
        self.nodes.iter().map(Node::depth).max()
    }

    /// Bounds of the root node computed by the latest rebuild
    pub fn outer_bounds(&self) -> Option<Aabb> {
        self.outer_bounds
    }

    /// Points indexed by the latest rebuild
    pub fn points(&self) -> &[PointMass] {
        &self.points
    }

    /// Approximate acceleration on the point at `index` from all other points
    ///
    /// Returns zero for an unknown index, an empty grid, or a point that was
    /// left out of the tree.
    pub fn acceleration_on(&self, index: usize, law: &GravityLaw, theta: f64) -> Vector2D {
        match self.points.get(index) {
            Some(p) if p.position.is_finite() => self.acceleration_at(p.position, Some(index), law, theta),
            _ => Vector2D::zero(),
        }
    }

    /// Approximate acceleration at an arbitrary point
    ///
    /// `exclude` names a point index whose own contribution is skipped.
    /// `theta = 0` never approximates and yields the exact pairwise sum.
    pub fn acceleration_at(&self, query: Vector2D, exclude: Option<usize>, law: &GravityLaw, theta: f64) -> Vector2D {
        let mut acc = Vector2D::zero();
        if !self.nodes.is_empty() {
            self.accumulate(ROOT, query, exclude, law, theta, &mut acc);
        }
        acc
    }

    fn accumulate(
        &self,
        node_id: NodeId,
        query: Vector2D,
        exclude: Option<usize>,
        law: &GravityLaw,
        theta: f64,
        acc: &mut Vector2D,
    ) {
        let node = &self.nodes[node_id];
        if node.body_count == 0 {
            return;
        }

        let first = match node.first_child {
            Some(first) => first,
            None => {
                for index in self.occupants_of(node_id) {
                    if Some(index) == exclude {
                        continue;
                    }
                    let p = &self.points[index];
                    *acc += law.acceleration(query, p.position, p.mass);
                }
                return;
            }
        };

        // s / d < theta, written without the division so that d = 0 opens the node
        let distance = (query - node.center_of_mass).magnitude();
        if !node.bounds.contains(query) && node.bounds.width() < theta * distance {
            *acc += law.acceleration(query, node.center_of_mass, node.mass);
            return;
        }

        for child in first..first + 4 {
            self.accumulate(child, query, exclude, law, theta, acc);
        }
    }
}

impl Default for Grid {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over the point indices stored in one leaf
pub struct Occupants<'a> {
    next: Option<usize>,
    links: &'a [Option<usize>],
}

impl Iterator for Occupants<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let current = self.next?;
        self.next = self.links[current];
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gravity::direct_accelerations;
    use approx::assert_relative_eq;

    fn pm(x: f64, y: f64, m: f64) -> PointMass {
        PointMass::new(Vector2D::new(x, y), m)
    }

    #[test]
    fn test_empty_grid_has_no_root() {
        let mut grid = Grid::new();
        grid.rebuild(std::iter::empty());
        assert!(grid.root().is_none());
        assert!(grid.outer_bounds().is_none());
        let law = GravityLaw::new(1.0, 0.0);
        assert_eq!(grid.acceleration_at(Vector2D::zero(), None, &law, 0.5), Vector2D::zero());
        assert_eq!(grid.acceleration_on(0, &law, 0.5), Vector2D::zero());
    }

    #[test]
    fn test_single_point_feels_nothing() {
        let mut grid = Grid::new();
        grid.rebuild([pm(3.0, -2.0, 5.0)]);
        let root = grid.root().unwrap();
        assert!(root.is_leaf());
        assert_eq!(root.mass(), 5.0);
        assert_eq!(root.center_of_mass(), Vector2D::new(3.0, -2.0));
        let law = GravityLaw::new(1.0, 0.1);
        assert_eq!(grid.acceleration_on(0, &law, 0.5), Vector2D::zero());
    }

    #[test]
    fn test_second_insert_subdivides() {
        let mut grid = Grid::new();
        grid.rebuild([pm(-1.0, -1.0, 1.0), pm(1.0, 1.0, 1.0)]);
        let root = grid.root().unwrap();
        assert!(!root.is_leaf());
        let children = root.children().unwrap();
        assert_eq!(grid.node(children[0]).body_count(), 1); // NE
        assert_eq!(grid.node(children[3]).body_count(), 1); // SW
        assert_eq!(grid.node(children[1]).body_count(), 0);
    }

    #[test]
    fn test_mass_conservation_and_center_of_mass() {
        let points = [pm(0.0, 0.0, 1.0), pm(4.0, 0.0, 3.0), pm(0.0, 2.0, 2.0), pm(-1.0, -1.0, 4.0)];
        let mut grid = Grid::new();
        grid.rebuild(points);
        let root = grid.root().unwrap();
        assert_relative_eq!(root.mass(), 10.0, epsilon = 1e-12);
        assert_eq!(root.body_count(), 4);
        // (0 + 12 + 0 - 4) / 10, (0 + 0 + 4 - 4) / 10
        assert_relative_eq!(root.center_of_mass().x(), 0.8, epsilon = 1e-12);
        assert_relative_eq!(root.center_of_mass().y(), 0.0, epsilon = 1e-12);

        // every internal node aggregates its children
        for id in 0..grid.node_count() {
            let node = grid.node(id);
            if let Some(children) = node.children() {
                let sum: f64 = children.iter().map(|&c| grid.node(c).mass()).sum();
                assert_relative_eq!(node.mass(), sum, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_outer_bounds_contain_all_points() {
        let points = [pm(-5.0, 2.0, 1.0), pm(7.0, -3.0, 1.0), pm(7.0, 2.0, 1.0)];
        let mut grid = Grid::new();
        grid.rebuild(points);
        let bounds = grid.outer_bounds().unwrap();
        for p in &points {
            assert!(bounds.contains(p.position));
        }
    }

    #[test]
    fn test_zero_max_depth_rejected() {
        let err = Grid::with_max_depth(0).unwrap_err();
        assert!(matches!(err, SimulationError::InvalidParameter { name: "maxTreeDepth", .. }));
        assert_eq!(Grid::with_max_depth(1).unwrap().max_depth(), 1);
    }

    #[test]
    fn test_coincident_points_terminate() {
        let mut grid = Grid::with_max_depth(8).unwrap();
        grid.rebuild([pm(1.0, 1.0, 1.0), pm(1.0, 1.0, 2.0), pm(1.0, 1.0, 3.0), pm(0.0, 0.0, 1.0)]);
        assert!(grid.depth().unwrap() <= 8);
        assert_relative_eq!(grid.root().unwrap().mass(), 7.0, epsilon = 1e-12);

        let shared = (0..grid.node_count())
            .map(|id| grid.node(id))
            .find(|n| n.occupants() == 3)
            .expect("coincident points should share a leaf");
        assert_eq!(shared.depth(), 8);

        let law = GravityLaw::new(1.0, 0.1);
        for i in 0..4 {
            assert!(grid.acceleration_on(i, &law, 0.5).is_finite());
        }
    }

    #[test]
    fn test_theta_zero_is_exact() {
        let points: Vec<PointMass> = (0..40)
            .map(|i| {
                let t = i as f64;
                pm((t * 1.7).sin() * 10.0, (t * 0.9).cos() * 7.0, 1.0 + (i % 3) as f64)
            })
            .collect();
        let law = GravityLaw::new(1.0, 0.05);
        let mut grid = Grid::new();
        grid.rebuild(points.iter().copied());
        let exact = direct_accelerations(&points, &law);
        for (i, e) in exact.iter().enumerate() {
            let a = grid.acceleration_on(i, &law, 0.0);
            assert_relative_eq!(a.x(), e.x(), epsilon = 1e-10, max_relative = 1e-9);
            assert_relative_eq!(a.y(), e.y(), epsilon = 1e-10, max_relative = 1e-9);
        }
    }

    #[test]
    fn test_non_finite_points_ignored() {
        let mut grid = Grid::new();
        grid.rebuild([pm(0.0, 0.0, 1.0), pm(f64::NAN, 0.0, 1.0), pm(1.0, 0.0, 1.0)]);
        assert_eq!(grid.root().unwrap().body_count(), 2);
        let law = GravityLaw::new(1.0, 0.0);
        assert_eq!(grid.acceleration_on(1, &law, 0.5), Vector2D::zero());
    }

    #[test]
    fn test_massless_points_have_mean_center() {
        let mut grid = Grid::new();
        grid.rebuild([pm(0.0, 0.0, 0.0), pm(2.0, 4.0, 0.0)]);
        let root = grid.root().unwrap();
        assert_eq!(root.mass(), 0.0);
        assert_relative_eq!(root.center_of_mass().x(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(root.center_of_mass().y(), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rebuild_discards_previous_tree() {
        let mut grid = Grid::new();
        grid.rebuild([pm(0.0, 0.0, 1.0), pm(1.0, 1.0, 1.0), pm(-3.0, 2.0, 1.0)]);
        grid.rebuild([pm(10.0, 10.0, 2.0)]);
        assert_eq!(grid.node_count(), 1);
        assert_eq!(grid.points().len(), 1);
        assert_eq!(grid.root().unwrap().mass(), 2.0);
    }
}
