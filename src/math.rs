//! Simple math primitives for working with tile and pixel coordinates.

use std::ops;

macro_rules! define_vector {
    ($name:ident $T:ty) => {
        #[derive(Debug, PartialEq, Copy, Clone, Default)]
        #[allow(non_camel_case_types)]
        pub struct $name {
            pub x: $T,
            pub y: $T,
        }

        impl $name {
            pub const fn new(x: $T, y: $T) -> Self { Self { x, y } }
        }

        impl_op_ex!{+ |a: &$name, b: &$name| -> $name { $name::new(a.x + b.x, a.y + b.y )}}
        impl_op_ex!{- |a: &$name, b: &$name| -> $name { $name::new(a.x - b.x, a.y - b.y )}}
        impl_op_ex!{* |a: &$name, b: &$name| -> $name { $name::new(a.x * b.x, a.y * b.y )}}
        impl_op_ex!{/ |a: &$name, b: &$name| -> $name { $name::new(a.x / b.x, a.y / b.y )}}
    };
}

// Define vector of integers
define_vector!{ivec2 i32}
impl_op_ex_commutative!{* |a: &ivec2, f: &i32| -> ivec2 { ivec2::new(a.x * f, a.y * f )}}
impl Eq for ivec2 {}

impl std::hash::Hash for ivec2 {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.x.hash(state);
        self.y.hash(state);
    }
}

impl ivec2 {
    /// Number of cells in a grid of this size. Negative extents count as empty.
    pub fn area(&self) -> usize {
        self.x.max(0) as usize * self.y.max(0) as usize
    }
}

// Define vector of floats
define_vector!{fvec2 f32}
impl_op_ex_commutative!{* |a: &fvec2, f: &f32| -> fvec2 { fvec2::new(a.x * f, a.y * f )}}

impl fvec2 {
    /// Round both components towards negative infinity.
    pub fn floor(&self) -> ivec2 {
        ivec2::new(self.x.floor() as i32, self.y.floor() as i32)
    }
}

impl From<ivec2> for fvec2 {
    fn from(v: ivec2) -> Self {
        fvec2::new(v.x as f32, v.y as f32)
    }
}

/// Struct that defines a rectangle given by its upper left corner and extends.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub struct Rect {
    pub upper_left: ivec2,
    pub size: ivec2,
}

impl Rect {
    pub fn new(upper_left: ivec2, size: ivec2) -> Self { Self { upper_left, size } }

    /// Whether the point lies inside of the rectangle.
    /// The lower and right edge are exclusive.
    pub fn contains(&self, point: ivec2) -> bool {
        let lower_right = self.upper_left + self.size;
        point.x >= self.upper_left.x && point.y >= self.upper_left.y
            && point.x < lower_right.x && point.y < lower_right.y
    }
}
