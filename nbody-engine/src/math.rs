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
//! 2D vector and bounding box value types
//!
//! [`Vector2D`] is the position/velocity/acceleration type used everywhere in
//! the engine. [`Aabb`] describes the square regions of the quadtree.
//! Both are `Copy` value types; equality is exact floating-point equality,
//! which the body change detection relies on.

use crate::error::{Result, SimulationError};
use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

/// Immutable 2D vector with double-precision components
///
/// # Examples
///
/// ```
/// use nbody_engine::math::Vector2D;
///
/// let a = Vector2D::new(3.0, 4.0);
/// assert_eq!(a.magnitude(), 5.0);
/// assert_eq!(a + Vector2D::new(1.0, 1.0), Vector2D::new(4.0, 5.0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector2D {
    x: f64,
    y: f64,
}

impl Vector2D {
    /// Create a new vector
    pub const fn new(x: f64, y: f64) -> Self {
        Vector2D { x, y }
    }

    /// The zero vector
    pub const fn zero() -> Self {
        Vector2D::new(0.0, 0.0)
    }

    /// Get the x component
    pub fn x(&self) -> f64 {
        self.x
    }

    /// Get the y component
    pub fn y(&self) -> f64 {
        self.y
    }

    /// Copy of this vector with a different x component
    pub fn with_x(self, x: f64) -> Self {
        Vector2D::new(x, self.y)
    }

    /// Copy of this vector with a different y component
    pub fn with_y(self, y: f64) -> Self {
        Vector2D::new(self.x, y)
    }

    /// Dot product
    pub fn dot(self, other: Vector2D) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// Squared Euclidean length
    pub fn magnitude_squared(self) -> f64 {
        self.dot(self)
    }

    /// Euclidean length
    pub fn magnitude(self) -> f64 {
        self.magnitude_squared().sqrt()
    }

    /// Multiply by a scalar
    pub fn scale(self, factor: f64) -> Self {
        Vector2D::new(self.x * factor, self.y * factor)
    }

    /// Check that both components are finite (not NaN or infinite)
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Component-wise minimum
    pub fn min(self, other: Vector2D) -> Self {
        Vector2D::new(self.x.min(other.x), self.y.min(other.y))
    }

    /// Component-wise maximum
    pub fn max(self, other: Vector2D) -> Self {
        Vector2D::new(self.x.max(other.x), self.y.max(other.y))
    }

    /// Components as an array
    pub fn as_array(&self) -> [f64; 2] {
        [self.x, self.y]
    }
}

impl Add for Vector2D {
    type Output = Vector2D;

    fn add(self, rhs: Vector2D) -> Vector2D {
        Vector2D::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vector2D {
    fn add_assign(&mut self, rhs: Vector2D) {
        *self = *self + rhs;
    }
}

impl Sub for Vector2D {
    type Output = Vector2D;

    fn sub(self, rhs: Vector2D) -> Vector2D {
        Vector2D::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl SubAssign for Vector2D {
    fn sub_assign(&mut self, rhs: Vector2D) {
        *self = *self - rhs;
    }
}

impl Mul<f64> for Vector2D {
    type Output = Vector2D;

    fn mul(self, rhs: f64) -> Vector2D {
        self.scale(rhs)
    }
}

impl Mul<Vector2D> for f64 {
    type Output = Vector2D;

    fn mul(self, rhs: Vector2D) -> Vector2D {
        rhs.scale(self)
    }
}

impl Div<f64> for Vector2D {
    type Output = Vector2D;

    fn div(self, rhs: f64) -> Vector2D {
        Vector2D::new(self.x / rhs, self.y / rhs)
    }
}

impl Neg for Vector2D {
    type Output = Vector2D;

    fn neg(self) -> Vector2D {
        Vector2D::new(-self.x, -self.y)
    }
}

/// One of the four quadrants produced by [`Aabb::subdivide`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quadrant {
    /// +x, +y
    NorthEast = 0,
    /// -x, +y
    NorthWest = 1,
    /// +x, -y
    SouthEast = 2,
    /// -x, -y
    SouthWest = 3,
}

impl Quadrant {
    /// All quadrants in subdivision order
    pub const ALL: [Quadrant; 4] = [
        Quadrant::NorthEast,
        Quadrant::NorthWest,
        Quadrant::SouthEast,
        Quadrant::SouthWest,
    ];

    /// Index of this quadrant in subdivision order
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Axis-aligned bounding box described by its center and half extents
///
/// Half dimensions are always positive and finite; [`Aabb::new`] rejects
/// anything else.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    center: Vector2D,
    half_dimension: Vector2D,
}

impl Aabb {
    /// Create a bounding box
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::DegenerateBounds`] if either half dimension
    /// is not strictly positive and finite, or the center is not finite.
    pub fn new(center: Vector2D, half_dimension: Vector2D) -> Result<Self> {
        let valid = half_dimension.x > 0.0
            && half_dimension.y > 0.0
            && half_dimension.is_finite()
            && center.is_finite();
        if !valid {
            return Err(SimulationError::DegenerateBounds);
        }
        Ok(Aabb { center, half_dimension })
    }

    /// Smallest square box enclosing every point, grown by a relative and an
    /// absolute margin
    ///
    /// The padding is `relative_padding * half_extent + absolute_padding`, so
    /// points lying on the boundary stay inside after rounding and a single
    /// point still yields a box with positive extent. Returns `Ok(None)` for
    /// an empty iterator.
    pub fn enclosing<I>(points: I, relative_padding: f64, absolute_padding: f64) -> Result<Option<Self>>
    where
        I: IntoIterator<Item = Vector2D>,
    {
        let mut iter = points.into_iter();
        let first = match iter.next() {
            Some(p) => p,
            None => return Ok(None),
        };
        let (min, max) = iter.fold((first, first), |(lo, hi), p| (lo.min(p), hi.max(p)));

        let center = (min + max) * 0.5;
        let half_extent = ((max.x - min.x).max(max.y - min.y)) * 0.5;
        let half = half_extent * (1.0 + relative_padding) + absolute_padding;
        Aabb::new(center, Vector2D::new(half, half)).map(Some)
    }

    /// Center of the box
    pub fn center(&self) -> Vector2D {
        self.center
    }

    /// Half extents along each axis
    pub fn half_dimension(&self) -> Vector2D {
        self.half_dimension
    }

    /// Width of the region used by the Barnes-Hut criterion
    ///
    /// For rectangular boxes the longer side is used.
    pub fn width(&self) -> f64 {
        2.0 * self.half_dimension.x.max(self.half_dimension.y)
    }

    /// Check whether a point lies inside the box (boundary inclusive)
    pub fn contains(&self, point: Vector2D) -> bool {
        (point.x - self.center.x).abs() <= self.half_dimension.x
            && (point.y - self.center.y).abs() <= self.half_dimension.y
    }

    /// Quadrant of this box that a point belongs to
    ///
    /// Points on a dividing line go to the east/north side, matching the
    /// insertion rule of the quadtree.
    pub fn quadrant_of(&self, point: Vector2D) -> Quadrant {
        let east = point.x >= self.center.x;
        let north = point.y >= self.center.y;
        match (east, north) {
            (true, true) => Quadrant::NorthEast,
            (false, true) => Quadrant::NorthWest,
            (true, false) => Quadrant::SouthEast,
            (false, false) => Quadrant::SouthWest,
        }
    }

    /// Split into four equal quadrants in [`Quadrant::ALL`] order
    pub fn subdivide(&self) -> [Aabb; 4] {
        let half = self.half_dimension * 0.5;
        let offset = |q: Quadrant| match q {
            Quadrant::NorthEast => Vector2D::new(half.x, half.y),
            Quadrant::NorthWest => Vector2D::new(-half.x, half.y),
            Quadrant::SouthEast => Vector2D::new(half.x, -half.y),
            Quadrant::SouthWest => Vector2D::new(-half.x, -half.y),
        };
        Quadrant::ALL.map(|q| Aabb {
            center: self.center + offset(q),
            half_dimension: half,
        })
    }
}
