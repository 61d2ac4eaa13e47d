use serde::{Deserialize, Serialize};

///Represents a vector in 2D space.
/// Screen coordinates: positive x is right, positive y is down.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    ///Returns the magnitude of the vector.
    pub fn magnitude(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    ///Returns the normalized vector, or zero for the zero vector.
    pub fn normalize(&self) -> Vec2 {
        let mag = self.magnitude();
        if mag == 0.0 {
            Vec2::ZERO
        } else {
            Vec2 {
                x: self.x / mag,
                y: self.y / mag,
            }
        }
    }

    ///Returns the scaled vector.
    pub fn scale(&self, scalar: f32) -> Vec2 {
        Vec2 {
            x: self.x * scalar,
            y: self.y * scalar,
        }
    }

    ///Returns the sum of two vectors.
    pub fn add(&self, other: &Vec2) -> Vec2 {
        Vec2 {
            x: self.x + other.x,
            y: self.y + other.y,
        }
    }

    ///Linear interpolation towards `target`. `t` is not clamped.
    pub fn lerp(&self, target: &Vec2, t: f32) -> Vec2 {
        Vec2 {
            x: self.x + (target.x - self.x) * t,
            y: self.y + (target.y - self.y) * t,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_normalize_diagonal() {
        let v = Vec2::new(1.0, -1.0).normalize();
        assert_approx_eq!(v.magnitude(), 1.0, 1e-6);
        assert_approx_eq!(v.x, std::f32::consts::FRAC_1_SQRT_2, 1e-6);
        assert_approx_eq!(v.y, -std::f32::consts::FRAC_1_SQRT_2, 1e-6);
    }

    #[test]
    fn test_normalize_zero_stays_zero() {
        assert_eq!(Vec2::ZERO.normalize(), Vec2::ZERO);
    }

    #[test]
    fn test_lerp() {
        let a = Vec2::new(10.0, -4.0);
        assert_eq!(a.lerp(&Vec2::ZERO, 0.0), a);
        assert_eq!(a.lerp(&Vec2::ZERO, 1.0), Vec2::ZERO);

        let half = a.lerp(&Vec2::ZERO, 0.5);
        assert_approx_eq!(half.x, 5.0);
        assert_approx_eq!(half.y, -2.0);
    }

    #[test]
    fn test_scale_and_add() {
        let v = Vec2::new(1.0, 2.0).scale(3.0).add(&Vec2::new(0.5, 0.5));
        assert_eq!(v, Vec2::new(3.5, 6.5));
    }
}
