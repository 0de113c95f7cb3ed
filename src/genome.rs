use std::f32::consts::PI;

use rand::Rng;
use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};

use crate::config::{EvolutionConfig, TerrainConfig};

pub const CHASSIS_VERTEX_COUNT: usize = 6;
pub const WHEEL_COUNT: usize = 2;
const MIN_CHASSIS_RADIUS_PX: f32 = 10.0;
const MIN_WHEEL_RADIUS_PX: f32 = 5.0;
const WHEEL_OFFSET_X: f32 = 0.5;
const WHEEL_OFFSET_Y: f32 = 0.2;

/// Heritable description of one car. Points are `[x, y]` in metres relative
/// to the chassis centre.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Genome {
    pub chassis_vertices: Vec<[f32; 2]>,
    pub wheel_sizes: Vec<f32>,
    pub wheel_positions: Vec<[f32; 2]>,
}

impl Genome {
    /// Largest distance from the chassis centre to one of its vertices.
    pub fn chassis_radius(&self) -> f32 {
        self.chassis_vertices
            .iter()
            .map(|[x, y]| (x * x + y * y).sqrt())
            .fold(0.0, f32::max)
    }
}

/// Sampling ranges for fresh genomes, in metres.
#[derive(Clone, Debug, PartialEq)]
pub struct GenomeBounds {
    pub chassis_radius: (f32, f32),
    pub wheel_radius: (f32, f32),
}

impl GenomeBounds {
    pub fn from_config(config: &EvolutionConfig, terrain: &TerrainConfig) -> Self {
        let ppm = terrain.pixels_per_meter;
        Self {
            chassis_radius: (MIN_CHASSIS_RADIUS_PX / ppm, config.chassis_radius / ppm),
            wheel_radius: (MIN_WHEEL_RADIUS_PX / ppm, config.wheel_radius / ppm),
        }
    }
}

/// A regular-angle hexagon with a random radius per vertex, plus two wheels
/// of random size placed near the chassis centre. Nothing is validated here.
pub fn random_genome(bounds: &GenomeBounds, rng: &mut SmallRng) -> Genome {
    let (min_chassis, max_chassis) = bounds.chassis_radius;
    let chassis_vertices = (0..CHASSIS_VERTEX_COUNT)
        .map(|i| {
            let angle = i as f32 * PI * 2.0 / CHASSIS_VERTEX_COUNT as f32;
            let radius = rng_range(rng, min_chassis, max_chassis);
            [angle.cos() * radius, angle.sin() * radius]
        })
        .collect();

    let (min_wheel, max_wheel) = bounds.wheel_radius;
    let wheel_sizes = (0..WHEEL_COUNT)
        .map(|_| rng_range(rng, min_wheel, max_wheel))
        .collect();
    let wheel_positions = (0..WHEEL_COUNT)
        .map(|_| {
            [
                rng_range(rng, -WHEEL_OFFSET_X, WHEEL_OFFSET_X),
                rng_range(rng, -WHEEL_OFFSET_Y, WHEEL_OFFSET_Y),
            ]
        })
        .collect();

    Genome {
        chassis_vertices,
        wheel_sizes,
        wheel_positions,
    }
}

pub(crate) fn rng_range(rng: &mut SmallRng, min: f32, max: f32) -> f32 {
    min + rng.random::<f32>() * (max - min)
}

pub(crate) fn clamp(value: f32, min: f32, max: f32) -> f32 {
    value.max(min).min(max)
}
