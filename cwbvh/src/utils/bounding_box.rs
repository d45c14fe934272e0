use std::ops::{Add, AddAssign};

use glam::Vec3;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    min: Vec3,
    max: Vec3,
}

impl BoundingBox {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn min(&self) -> Vec3 {
        self.min
    }

    pub fn max(&self) -> Vec3 {
        self.max
    }

    pub fn extent(&self) -> Vec3 {
        self.max() - self.min()
    }

    pub fn center(&self) -> Vec3 {
        (self.min() + self.max()) * 0.5
    }

    pub fn half_area(&self) -> f32 {
        if !self.is_set() {
            return f32::MAX;
        }

        let extent = self.extent();

        extent.x * extent.y + extent.y * extent.z + extent.z * extent.x
    }

    pub fn is_set(&self) -> bool {
        self.min.x != Self::default().min.x
    }

    /// Returns whether `other` lies fully within this box, with some leeway
    /// for floating-point errors.
    pub fn contains(&self, other: &Self, epsilon: f32) -> bool {
        (other.min - self.min).min_element() >= -epsilon
            && (self.max - other.max).min_element() >= -epsilon
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::new(Vec3::MAX, Vec3::MIN)
    }
}

impl Add<Vec3> for BoundingBox {
    type Output = Self;

    fn add(mut self, rhs: Vec3) -> Self::Output {
        self += rhs;
        self
    }
}

impl AddAssign<Vec3> for BoundingBox {
    fn add_assign(&mut self, rhs: Vec3) {
        self.min = self.min.min(rhs);
        self.max = self.max.max(rhs);
    }
}

impl FromIterator<Vec3> for BoundingBox {
    fn from_iter<T>(iter: T) -> Self
    where
        T: IntoIterator<Item = Vec3>,
    {
        let mut this = Self::default();

        for item in iter {
            this += item;
        }

        this
    }
}

impl Add<Self> for BoundingBox {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self::Output {
        self += rhs;
        self
    }
}

impl AddAssign<Self> for BoundingBox {
    fn add_assign(&mut self, rhs: Self) {
        if rhs.is_set() {
            *self += rhs.min;
            *self += rhs.max;
        }
    }
}

impl FromIterator<Self> for BoundingBox {
    fn from_iter<T>(iter: T) -> Self
    where
        T: IntoIterator<Item = Self>,
    {
        let mut this = Self::default();

        for item in iter {
            this += item;
        }

        this
    }
}

#[cfg(test)]
mod tests {
    use glam::vec3;

    use super::*;

    #[test]
    fn empty() {
        let target = BoundingBox::default();

        assert!(!target.is_set());
        assert_eq!(f32::MAX, target.half_area());
    }

    #[test]
    fn from_points() {
        let target: BoundingBox = [
            vec3(1.0, -2.0, 3.0),
            vec3(-1.0, 2.0, 0.0),
            vec3(0.0, 0.0, 5.0),
        ]
        .into_iter()
        .collect();

        assert_eq!(vec3(-1.0, -2.0, 0.0), target.min());
        assert_eq!(vec3(1.0, 2.0, 5.0), target.max());
        assert_eq!(vec3(0.0, 0.0, 2.5), target.center());

        // 2*4 + 4*5 + 5*2
        assert_eq!(38.0, target.half_area());
    }

    #[test]
    fn union_ignores_empty_boxes() {
        let a = BoundingBox::new(Vec3::ZERO, Vec3::ONE);
        let target = a + BoundingBox::default();

        assert_eq!(a, target);
    }

    #[test]
    fn contains() {
        let outer = BoundingBox::new(Vec3::ZERO, Vec3::splat(2.0));
        let inner = BoundingBox::new(Vec3::splat(0.5), Vec3::ONE);

        assert!(outer.contains(&inner, 0.0));
        assert!(!inner.contains(&outer, 0.0));
    }
}
