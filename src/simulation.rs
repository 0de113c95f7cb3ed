use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::{info, warn};

use crate::car::{Car, build_car};
use crate::config::{EvolutionConfig, TerrainConfig};
use crate::genome::{Genome, GenomeBounds, random_genome};
use crate::physics::{GroundError, PhysicsWorld};
use crate::reproduction::{crossover, mutate};
use crate::terrain::{NoiseSource, PerlinNoise, Terrain};

/// The current generation of cars plus run-wide progress.
#[derive(Debug, Default)]
pub struct Population {
    pub cars: Vec<Car>,
    pub generation: usize,
    /// Furthest display distance any car has reached during the run.
    pub best_distance: f32,
}

/// Everything a run mutates between ticks. Owned by the host and handed to
/// [`crate::GenerationController::step`] on every tick.
pub struct Simulation {
    pub physics: PhysicsWorld,
    pub terrain: Terrain,
    pub population: Population,
    bounds: GenomeBounds,
    rng: SmallRng,
    generation_ticks: u64,
    leading_distance: f32,
}

impl Simulation {
    /// Fresh run with Perlin terrain and `population_size` random cars.
    pub fn new(config: &EvolutionConfig, terrain: TerrainConfig) -> Result<Self, GroundError> {
        let noise = Box::new(PerlinNoise::seeded(terrain.noise_seed));
        Self::with_noise(config, terrain, noise)
    }

    pub fn with_noise(
        config: &EvolutionConfig,
        terrain: TerrainConfig,
        noise: Box<dyn NoiseSource>,
    ) -> Result<Self, GroundError> {
        let mut simulation = Self::empty(config, terrain, noise)?;
        let genomes: Vec<Genome> = (0..config.population_size)
            .map(|_| random_genome(&simulation.bounds, &mut simulation.rng))
            .collect();
        simulation.populate(genomes);
        Ok(simulation)
    }

    /// Run seeded with caller-supplied genomes instead of random ones.
    pub fn with_genomes(
        config: &EvolutionConfig,
        terrain: TerrainConfig,
        noise: Box<dyn NoiseSource>,
        genomes: Vec<Genome>,
    ) -> Result<Self, GroundError> {
        let mut simulation = Self::empty(config, terrain, noise)?;
        simulation.populate(genomes);
        Ok(simulation)
    }

    fn empty(
        config: &EvolutionConfig,
        terrain: TerrainConfig,
        noise: Box<dyn NoiseSource>,
    ) -> Result<Self, GroundError> {
        let seed = config.seed.unwrap_or_else(rand::random::<u64>);
        let bounds = GenomeBounds::from_config(config, &terrain);
        let terrain = Terrain::generate(terrain, noise);
        let mut physics = PhysicsWorld::new();
        physics.rebuild_ground(terrain.vertices())?;
        info!(
            "simulation seeded with {seed}; terrain reaches x={:.2}",
            terrain.frontier_x()
        );

        Ok(Self {
            physics,
            terrain,
            population: Population::default(),
            bounds,
            rng: SmallRng::seed_from_u64(seed),
            generation_ticks: 0,
            leading_distance: 0.0,
        })
    }

    fn populate(&mut self, genomes: Vec<Genome>) {
        for genome in genomes {
            match build_car(genome, &mut self.physics, &self.terrain) {
                Ok(car) => self.population.cars.push(car),
                Err(err) => warn!("initial car discarded: {err}"),
            }
        }
    }

    /// Breeds `count` offspring from `parents` into the population. Offspring
    /// that fail to build are dropped; returns how many were dropped.
    pub(crate) fn breed(&mut self, parents: &[Genome], count: usize, mutation_rate: f32) -> usize {
        let mut failed = 0;
        for _ in 0..count {
            let a = &parents[self.rng.random_range(0..parents.len())];
            let b = &parents[self.rng.random_range(0..parents.len())];
            let mut child = crossover(a, b, &mut self.rng);
            mutate(&mut child, mutation_rate, &mut self.rng);
            match build_car(child, &mut self.physics, &self.terrain) {
                Ok(car) => self.population.cars.push(car),
                Err(err) => {
                    warn!("offspring discarded: {err}");
                    failed += 1;
                }
            }
        }
        failed
    }

    /// Updates the leading and best-ever distances from the current car
    /// positions, extending the terrain when the leader nears its frontier.
    pub(crate) fn track_leader(&mut self) -> Result<(), GroundError> {
        let leader_x = self
            .population
            .cars
            .iter()
            .filter_map(|car| car.position(&self.physics))
            .map(|[x, _]| x)
            .fold(f32::NEG_INFINITY, f32::max);
        if !leader_x.is_finite() {
            return Ok(());
        }

        self.leading_distance = leader_x * self.distance_scale();
        if self.leading_distance > self.population.best_distance {
            self.population.best_distance = self.leading_distance;
        }
        if self.terrain.needs_extension(leader_x) {
            self.terrain.extend();
            self.physics.rebuild_ground(self.terrain.vertices())?;
        }
        Ok(())
    }

    pub(crate) fn start_generation(&mut self) {
        self.generation_ticks = 0;
        self.leading_distance = 0.0;
    }

    pub(crate) fn count_tick(&mut self) {
        self.generation_ticks += 1;
    }

    /// Factor converting world metres into reported distance.
    pub fn distance_scale(&self) -> f32 {
        self.terrain.config().pixels_per_meter
    }

    pub fn generation(&self) -> usize {
        self.population.generation
    }

    pub fn best_distance(&self) -> f32 {
        self.population.best_distance
    }

    /// Display distance of the car currently furthest along.
    pub fn leading_distance(&self) -> f32 {
        self.leading_distance
    }

    pub fn generation_ticks(&self) -> u64 {
        self.generation_ticks
    }

    /// Physics steps taken over the whole run.
    pub fn total_ticks(&self) -> u64 {
        self.physics.steps()
    }

    /// The car whose chassis is furthest along, if any.
    pub fn leading_car(&self) -> Option<&Car> {
        self.population.cars.iter().max_by(|a, b| {
            let ax = a.position(&self.physics).map(|p| p[0]).unwrap_or(f32::MIN);
            let bx = b.position(&self.physics).map(|p| p[0]).unwrap_or(f32::MIN);
            ax.total_cmp(&bx)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::tests::FlatNoise;

    fn config(population_size: usize) -> EvolutionConfig {
        EvolutionConfig {
            population_size,
            seed: Some(42),
            ..EvolutionConfig::default()
        }
    }

    #[test]
    fn new_run_builds_every_random_car() {
        let sim = Simulation::with_noise(
            &config(6),
            TerrainConfig::default(),
            Box::new(FlatNoise(0.5)),
        )
        .unwrap();
        assert_eq!(sim.population.cars.len(), 6);
        assert_eq!(sim.generation(), 0);
        assert!(sim.physics.ground().is_some());
    }

    #[test]
    fn invalid_seed_genomes_are_dropped() {
        let valid = Genome {
            chassis_vertices: vec![[0.3, 0.0], [0.0, 0.3], [-0.3, 0.0], [0.0, -0.3]],
            wheel_sizes: vec![0.2, 0.2],
            wheel_positions: vec![[-0.3, -0.1], [0.3, -0.1]],
        };
        let invalid = Genome {
            chassis_vertices: vec![[0.0, 0.0]],
            ..valid.clone()
        };
        let sim = Simulation::with_genomes(
            &config(2),
            TerrainConfig::default(),
            Box::new(FlatNoise(0.5)),
            vec![valid, invalid],
        )
        .unwrap();
        assert_eq!(sim.population.cars.len(), 1);
    }

    #[test]
    fn leader_tracking_raises_best_distance_and_extends_terrain() {
        let mut sim = Simulation::with_noise(
            &config(2),
            TerrainConfig::default(),
            Box::new(FlatNoise(0.5)),
        )
        .unwrap();
        let frontier = sim.terrain.frontier_x();
        sim.track_leader().unwrap();

        assert!((sim.leading_distance() - 100.0).abs() < 1e-3);
        assert_eq!(sim.best_distance(), sim.leading_distance());
        assert!(sim.terrain.frontier_x() > frontier);
    }

    #[test]
    fn unbuildable_offspring_are_dropped_without_leaking_bodies() {
        let mut sim = Simulation::with_genomes(
            &config(4),
            TerrainConfig::default(),
            Box::new(FlatNoise(0.5)),
            Vec::new(),
        )
        .unwrap();
        let collinear = Genome {
            chassis_vertices: vec![[0.0, 0.0], [0.2, 0.0], [0.4, 0.0]],
            wheel_sizes: vec![0.2, 0.2],
            wheel_positions: vec![[-0.3, -0.1], [0.3, -0.1]],
        };

        let failed = sim.breed(&[collinear], 4, 0.0);

        assert_eq!(failed, 4);
        assert!(sim.population.cars.is_empty());
        // Only the ground remains.
        assert_eq!(sim.physics.body_count(), 1);
    }

    #[test]
    fn leading_car_is_the_one_furthest_along() {
        let mut sim = Simulation::with_noise(
            &config(3),
            TerrainConfig::default(),
            Box::new(FlatNoise(0.5)),
        )
        .unwrap();
        let chassis = sim.population.cars[1].chassis;
        sim.physics
            .body_mut(chassis)
            .unwrap()
            .set_translation(rapier2d::prelude::vector![12.0, 8.0], true);

        assert_eq!(sim.leading_car().map(|car| car.chassis), Some(chassis));
    }
}
