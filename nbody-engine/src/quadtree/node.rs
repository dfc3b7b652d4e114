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
//! Quadtree node stored in the [`Grid`](super::Grid) arena

use crate::math::{Aabb, Vector2D};

/// Index of a node inside the grid arena
pub type NodeId = usize;

/// One square region of the quadtree
///
/// Children are allocated as four consecutive arena slots in
/// [`Quadrant::ALL`](crate::math::Quadrant::ALL) order, so a node only needs
/// to remember the first of them. Leaves hold their bodies as a linked list
/// threaded through the grid.
#[derive(Debug, Clone)]
pub struct Node {
    pub(super) bounds: Aabb,
    pub(super) depth: u32,
    pub(super) first_child: Option<NodeId>,
    pub(super) head: Option<usize>,
    pub(super) occupants: usize,
    pub(super) body_count: usize,
    pub(super) mass: f64,
    pub(super) center_of_mass: Vector2D,
}

impl Node {
    pub(super) fn leaf(bounds: Aabb, depth: u32) -> Self {
        Node {
            bounds,
            depth,
            first_child: None,
            head: None,
            occupants: 0,
            body_count: 0,
            mass: 0.0,
            center_of_mass: bounds.center(),
        }
    }

    /// Region covered by this node
    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    /// Distance from the root (root = 0)
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// True if the node has not been subdivided
    pub fn is_leaf(&self) -> bool {
        self.first_child.is_none()
    }

    /// Arena ids of the four children, in quadrant order
    pub fn children(&self) -> Option<[NodeId; 4]> {
        self.first_child.map(|first| [first, first + 1, first + 2, first + 3])
    }

    /// Number of bodies stored directly in this leaf
    ///
    /// Greater than one only for leaves at the depth limit.
    pub fn occupants(&self) -> usize {
        self.occupants
    }

    /// Number of bodies in the whole subtree
    pub fn body_count(&self) -> usize {
        self.body_count
    }

    /// Total mass of the subtree
    pub fn mass(&self) -> f64 {
        self.mass
    }

    /// Mass-weighted mean position of the subtree
    ///
    /// For a subtree whose total mass is zero this is the plain mean
    /// position; for an empty leaf it is the region center.
    pub fn center_of_mass(&self) -> Vector2D {
        self.center_of_mass
    }
}
