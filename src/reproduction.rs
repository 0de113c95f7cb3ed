use rand::Rng;
use rand::rngs::SmallRng;

use crate::genome::{Genome, clamp, rng_range};

pub const POINT_MUTATION_SPREAD: f32 = 0.05;
pub const WHEEL_SIZE_MUTATION_SPREAD: f32 = 0.02;
pub const MIN_WHEEL_SIZE: f32 = 0.05;
pub const MAX_WHEEL_SIZE: f32 = 0.4;

/// Uniform per-gene crossover: every vertex, wheel size and wheel position is
/// taken from `a` or `b` with equal odds, independently of its neighbours.
pub fn crossover(a: &Genome, b: &Genome, rng: &mut SmallRng) -> Genome {
    Genome {
        chassis_vertices: cross_points(&a.chassis_vertices, &b.chassis_vertices, rng),
        wheel_sizes: cross_scalars(&a.wheel_sizes, &b.wheel_sizes, rng),
        wheel_positions: cross_points(&a.wheel_positions, &b.wheel_positions, rng),
    }
}

/// Mutates each field with probability `rate`; untouched fields are left as is.
pub fn mutate(genome: &mut Genome, rate: f32, rng: &mut SmallRng) {
    mutate_points(&mut genome.chassis_vertices, rate, POINT_MUTATION_SPREAD, rng);
    mutate_scalars(
        &mut genome.wheel_sizes,
        rate,
        WHEEL_SIZE_MUTATION_SPREAD,
        (MIN_WHEEL_SIZE, MAX_WHEEL_SIZE),
        rng,
    );
    mutate_points(&mut genome.wheel_positions, rate, POINT_MUTATION_SPREAD, rng);
}

/// Picks each point from `a` or `b`. Indices missing from `b` keep `a`'s value.
pub fn cross_points(a: &[[f32; 2]], b: &[[f32; 2]], rng: &mut SmallRng) -> Vec<[f32; 2]> {
    a.iter()
        .enumerate()
        .map(|(i, &point)| match b.get(i) {
            Some(&other) if rng.random::<f32>() >= 0.5 => other,
            _ => point,
        })
        .collect()
}

pub fn cross_scalars(a: &[f32], b: &[f32], rng: &mut SmallRng) -> Vec<f32> {
    a.iter()
        .enumerate()
        .map(|(i, &value)| match b.get(i) {
            Some(&other) if rng.random::<f32>() >= 0.5 => other,
            _ => value,
        })
        .collect()
}

/// Nudges both coordinates of a selected point by up to `spread`.
pub fn mutate_points(points: &mut [[f32; 2]], rate: f32, spread: f32, rng: &mut SmallRng) {
    for point in points {
        if rng.random::<f32>() < rate {
            point[0] += rng_range(rng, -spread, spread);
            point[1] += rng_range(rng, -spread, spread);
        }
    }
}

/// Nudges a selected value by up to `spread`, then clamps it to `bounds`.
pub fn mutate_scalars(
    values: &mut [f32],
    rate: f32,
    spread: f32,
    bounds: (f32, f32),
    rng: &mut SmallRng,
) {
    for value in values {
        if rng.random::<f32>() < rate {
            *value = clamp(*value + rng_range(rng, -spread, spread), bounds.0, bounds.1);
        }
    }
}
