//! Uniform random sampling used for spawn placement

use glam::{Quat, Vec2};
use rand::Rng;

/// Source of the uniform samples spawning needs
pub trait RandomSource {
    /// Uniform scalar in [0, 1)
    fn unit(&mut self) -> f32;

    /// Uniform point inside the unit disk
    fn in_unit_disk(&mut self) -> Vec2;

    /// Uniformly distributed rotation
    fn rotation(&mut self) -> Quat;
}

impl<R: Rng> RandomSource for R {
    fn unit(&mut self) -> f32 {
        self.random::<f32>()
    }

    fn in_unit_disk(&mut self) -> Vec2 {
        // sqrt keeps the area density uniform
        let r = self.random::<f32>().sqrt();
        let theta = self.random::<f32>() * std::f32::consts::TAU;
        Vec2::new(r * theta.cos(), r * theta.sin())
    }

    fn rotation(&mut self) -> Quat {
        // Shoemake's subgroup algorithm
        let u1 = self.random::<f32>();
        let u2 = self.random::<f32>() * std::f32::consts::TAU;
        let u3 = self.random::<f32>() * std::f32::consts::TAU;
        let a = (1.0 - u1).sqrt();
        let b = u1.sqrt();
        Quat::from_xyzw(a * u2.sin(), a * u2.cos(), b * u3.sin(), b * u3.cos()).normalize()
    }
}
