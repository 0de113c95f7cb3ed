use std::fmt;

use libnoise::{Generator, Source};
use tracing::debug;

use crate::config::TerrainConfig;

/// Smooth scalar noise remapped to `[0, 1]`.
pub trait NoiseSource {
    fn sample(&self, x: f64) -> f32;
}

/// Seeded 1D Perlin noise.
pub struct PerlinNoise<G> {
    generator: G,
}

impl PerlinNoise<()> {
    pub fn seeded(seed: u64) -> PerlinNoise<impl Generator<1>> {
        PerlinNoise {
            generator: Source::<1>::perlin(seed),
        }
    }
}

impl<G: Generator<1>> NoiseSource for PerlinNoise<G> {
    fn sample(&self, x: f64) -> f32 {
        let raw = self.generator.sample([x]);
        (((raw + 1.0) * 0.5) as f32).clamp(0.0, 1.0)
    }
}

/// Procedural heightfield. Vertices are `[x, y]` in world metres, one per
/// screen-pixel column, with strictly increasing x.
pub struct Terrain {
    config: TerrainConfig,
    noise: Box<dyn NoiseSource>,
    vertices: Vec<[f32; 2]>,
    frontier_column: u32,
    noise_offset: f64,
}

impl fmt::Debug for Terrain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Terrain")
            .field("vertices", &self.vertices.len())
            .field("frontier_column", &self.frontier_column)
            .field("noise_offset", &self.noise_offset)
            .finish()
    }
}

impl Terrain {
    /// Fills one viewport width of terrain starting at x = 0.
    pub fn generate(config: TerrainConfig, noise: Box<dyn NoiseSource>) -> Self {
        let mut terrain = Self {
            vertices: Vec::with_capacity(config.viewport_width as usize),
            frontier_column: 0,
            noise_offset: 0.0,
            config,
            noise,
        };

        let height = terrain.config.viewport_height;
        let mut xoff = terrain.noise_offset;
        for column in 0..terrain.config.viewport_width {
            let y_px = terrain.noise.sample(xoff) * height * 0.5 + height * 0.25;
            terrain.push_column(column, y_px);
            xoff += terrain.config.noise_increment;
        }
        terrain.noise_offset += terrain.config.noise_increment;
        terrain
    }

    /// Appends almost one viewport width of columns after the frontier, with
    /// amplitude and frequency scaled by how far the terrain already reaches.
    /// Returns the number of vertices appended.
    pub fn extend(&mut self) -> usize {
        let Some(&[frontier_x, _]) = self.vertices.last() else {
            return 0;
        };
        let ppm = self.config.pixels_per_meter;
        let height = self.config.viewport_height;

        let difficulty = frontier_x * self.config.difficulty_per_meter;
        let amplitude = height * 0.5 + height * difficulty;
        let frequency =
            self.config.noise_increment + difficulty as f64 * self.config.frequency_per_difficulty;
        let mut xoff =
            self.noise_offset + frontier_x as f64 * self.config.noise_increment * ppm as f64;

        let first = self.frontier_column + 1;
        let end = self.frontier_column + self.config.viewport_width;
        for column in first..end {
            let y_px = self.noise.sample(xoff) * amplitude + height * 0.25;
            self.push_column(column, y_px);
            xoff += frequency;
        }
        self.noise_offset += frequency;

        let appended = end.saturating_sub(first) as usize;
        debug!(
            "terrain extended by {appended} vertices to x={:.2} (difficulty {difficulty:.3})",
            self.frontier_x()
        );
        appended
    }

    fn push_column(&mut self, column: u32, y_px: f32) {
        let ppm = self.config.pixels_per_meter;
        let height = self.config.viewport_height;
        self.vertices.push([column as f32 / ppm, (height - y_px) / ppm]);
        self.frontier_column = column;
    }

    pub fn vertices(&self) -> &[[f32; 2]] {
        &self.vertices
    }

    pub fn config(&self) -> &TerrainConfig {
        &self.config
    }

    /// World x of the most recently generated vertex.
    pub fn frontier_x(&self) -> f32 {
        self.vertices.last().map(|v| v[0]).unwrap_or(0.0)
    }

    /// True when a car at world x `leader_x` is within one viewport width of
    /// the frontier.
    pub fn needs_extension(&self, leader_x: f32) -> bool {
        let ppm = self.config.pixels_per_meter;
        leader_x * ppm > self.frontier_x() * ppm - self.config.viewport_width as f32
    }

    /// Ground height at world x, interpolated between the bracketing vertices.
    pub fn height_at(&self, x: f32) -> f32 {
        let vertices = &self.vertices;
        let Some(last) = vertices.last() else {
            return 0.0;
        };
        let upper = vertices.partition_point(|v| v[0] < x);
        if upper == 0 {
            return vertices[0][1];
        }
        if upper >= vertices.len() {
            return last[1];
        }
        let [x1, y1] = vertices[upper - 1];
        let [x2, y2] = vertices[upper];
        if (x2 - x1).abs() < f32::EPSILON {
            return y2;
        }
        y1 + (y2 - y1) * (x - x1) / (x2 - x1)
    }
}
