use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::car::{DRIVE_FORCE, evaluate_fitness};
use crate::config::EvolutionConfig;
use crate::genome::Genome;
use crate::physics::GroundError;
use crate::selection::breeding_pool;
use crate::simulation::Simulation;

/// Chassis x-velocity at or below which a car counts as stopped.
pub const STALL_SPEED_EPSILON: f32 = 0.001;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Running,
    Stalled,
    Evolving,
    /// `max_generations` reached; the host should stop ticking.
    Finished,
    /// A fatal error stopped the run.
    Halted,
}

#[derive(Debug, Error, PartialEq)]
pub enum ControllerError {
    #[error("no cars left to breed from after generation {generation}")]
    EmptyBreedingPool { generation: usize },
    #[error("run halted after a fatal error")]
    Halted,
    #[error(transparent)]
    Ground(#[from] GroundError),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationSummary {
    /// Number of the generation that was just bred.
    pub generation: usize,
    pub best_fitness: f32,
    pub mean_fitness: f32,
    pub survivors: usize,
    pub offspring_built: usize,
    pub offspring_failed: usize,
    /// Ticks the previous generation ran before stalling.
    pub ticks: u64,
}

#[derive(Clone, Debug, PartialEq)]
pub enum StepOutcome {
    Running,
    GenerationComplete(GenerationSummary),
    Finished,
}

/// Drives the run-until-stalled / select / breed cycle, one tick per call.
#[derive(Debug)]
pub struct GenerationController {
    config: EvolutionConfig,
    phase: Phase,
}

impl GenerationController {
    pub fn new(config: EvolutionConfig) -> Self {
        Self {
            config,
            phase: Phase::Running,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn config(&self) -> &EvolutionConfig {
        &self.config
    }

    /// Advances `sim` by one tick. When every car has stalled the next
    /// generation is bred in the same call.
    pub fn step(&mut self, sim: &mut Simulation) -> Result<StepOutcome, ControllerError> {
        match self.phase {
            Phase::Halted => return Err(ControllerError::Halted),
            Phase::Finished => return Ok(StepOutcome::Finished),
            Phase::Running | Phase::Stalled | Phase::Evolving => {}
        }

        let stalled = self.tick(sim).inspect_err(|_| self.phase = Phase::Halted)?;
        if !stalled {
            return Ok(StepOutcome::Running);
        }

        self.phase = Phase::Stalled;
        match self.evolve(sim) {
            Ok(summary) => Ok(StepOutcome::GenerationComplete(summary)),
            Err(err) => {
                error!("evolution halted: {err}");
                self.phase = Phase::Halted;
                Err(err)
            }
        }
    }

    /// One physics step plus per-car drive and scoring. Returns whether the
    /// generation has stalled.
    fn tick(&mut self, sim: &mut Simulation) -> Result<bool, ControllerError> {
        self.phase = Phase::Running;
        if sim.population.cars.is_empty() {
            return Ok(true);
        }

        sim.physics.step();
        sim.count_tick();

        let scale = sim.distance_scale();
        let mut any_moving = false;
        for car in &mut sim.population.cars {
            car.apply_drive(&mut sim.physics, DRIVE_FORCE);
            car.sync_wheels(&mut sim.physics);
            car.fitness = evaluate_fitness(car, &sim.physics, scale);
            if car.horizontal_velocity(&sim.physics) > STALL_SPEED_EPSILON {
                any_moving = true;
            }
        }
        sim.track_leader()?;

        let timed_out = self
            .config
            .generation_tick_limit
            .is_some_and(|limit| sim.generation_ticks() >= limit);
        if timed_out && any_moving {
            debug!(
                "generation {} hit the {} tick limit",
                sim.generation(),
                sim.generation_ticks()
            );
        }
        Ok(!any_moving || timed_out)
    }

    fn evolve(&mut self, sim: &mut Simulation) -> Result<GenerationSummary, ControllerError> {
        let previous = std::mem::take(&mut sim.population.cars);
        let fitness: Vec<f32> = previous.iter().map(|car| car.fitness).collect();
        let pool = breeding_pool(&fitness, self.config.population_size);
        if pool.is_empty() {
            sim.population.cars = previous;
            return Err(ControllerError::EmptyBreedingPool {
                generation: sim.generation(),
            });
        }

        self.phase = Phase::Evolving;
        let parents: Vec<Genome> = pool
            .iter()
            .map(|&index| previous[index].genome.clone())
            .collect();
        let best_fitness = fitness[pool[0]];
        let mean_fitness = fitness.iter().sum::<f32>() / fitness.len() as f32;
        let ticks = sim.generation_ticks();

        for car in previous {
            car.destroy(&mut sim.physics);
        }
        let target = self.config.population_size;
        let offspring_failed = sim.breed(&parents, target, self.config.mutation_rate);
        sim.physics.rebuild_ground(sim.terrain.vertices())?;
        sim.population.generation += 1;
        sim.start_generation();

        let summary = GenerationSummary {
            generation: sim.generation(),
            best_fitness,
            mean_fitness,
            survivors: parents.len(),
            offspring_built: sim.population.cars.len(),
            offspring_failed,
            ticks,
        };
        info!(
            "generation {} bred from {} survivors: best={:.2}, mean={:.2}, best_ever={:.2}",
            summary.generation,
            summary.survivors,
            summary.best_fitness,
            summary.mean_fitness,
            sim.best_distance()
        );
        if summary.offspring_built < target {
            warn!(
                "generation {} shrank to {}/{} cars after construction failures",
                summary.generation, summary.offspring_built, target
            );
        }

        self.phase = if sim.generation() >= self.config.max_generations {
            info!("reached max generations ({})", self.config.max_generations);
            Phase::Finished
        } else {
            Phase::Running
        };
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TerrainConfig;
    use crate::terrain::tests::FlatNoise;

    fn config() -> EvolutionConfig {
        EvolutionConfig {
            population_size: 4,
            max_generations: 3,
            seed: Some(99),
            generation_tick_limit: Some(30),
            ..EvolutionConfig::default()
        }
    }

    fn flat_sim(config: &EvolutionConfig) -> Simulation {
        Simulation::with_noise(config, TerrainConfig::default(), Box::new(FlatNoise(0.5))).unwrap()
    }

    fn run_until_generation_completes(
        controller: &mut GenerationController,
        sim: &mut Simulation,
    ) -> GenerationSummary {
        for _ in 0..10_000 {
            if let StepOutcome::GenerationComplete(summary) = controller.step(sim).unwrap() {
                return summary;
            }
        }
        panic!("generation never completed");
    }

    #[test]
    fn tick_limit_forces_a_generation_transition() {
        let config = config();
        let mut sim = flat_sim(&config);
        let mut controller = GenerationController::new(config);

        let summary = run_until_generation_completes(&mut controller, &mut sim);

        assert_eq!(summary.generation, 1);
        assert!(summary.ticks <= 30);
        assert_eq!(summary.survivors, 2);
        assert_eq!(summary.offspring_built + summary.offspring_failed, 4);
        assert_eq!(sim.generation(), 1);
        assert_eq!(sim.generation_ticks(), 0);
        assert_eq!(controller.phase(), Phase::Running);
    }

    #[test]
    fn old_cars_are_removed_from_the_world() {
        let config = config();
        let mut sim = flat_sim(&config);
        let mut controller = GenerationController::new(config);
        let old_chassis: Vec<_> = sim.population.cars.iter().map(|car| car.chassis).collect();

        run_until_generation_completes(&mut controller, &mut sim);

        for handle in old_chassis {
            assert!(sim.physics.body(handle).is_none());
        }
        // Ground plus a chassis and two wheels per car.
        assert_eq!(sim.physics.body_count(), 1 + sim.population.cars.len() * 3);
    }

    #[test]
    fn stops_after_max_generations() {
        let config = config();
        let mut sim = flat_sim(&config);
        let mut controller = GenerationController::new(config);
        for _ in 0..3 {
            run_until_generation_completes(&mut controller, &mut sim);
        }
        assert_eq!(controller.phase(), Phase::Finished);

        let steps = sim.physics.steps();
        assert_eq!(controller.step(&mut sim).unwrap(), StepOutcome::Finished);
        assert_eq!(sim.physics.steps(), steps);
    }

    #[test]
    fn fitness_follows_chassis_position_each_tick() {
        let config = config();
        let mut sim = flat_sim(&config);
        let mut controller = GenerationController::new(config);
        controller.step(&mut sim).unwrap();
        for car in &sim.population.cars {
            let [x, _] = car.position(&sim.physics).unwrap();
            assert!((car.fitness - x * 30.0).abs() < 1e-3);
        }
    }

    #[test]
    fn best_distance_never_decreases() {
        let config = config();
        let mut sim = flat_sim(&config);
        let mut controller = GenerationController::new(config);
        let mut best = 0.0;
        for _ in 0..90 {
            controller.step(&mut sim).unwrap();
            assert!(sim.best_distance() >= best);
            best = sim.best_distance();
        }
    }

    #[test]
    fn reversing_cars_stall_the_generation_on_the_same_tick() {
        let config = EvolutionConfig {
            generation_tick_limit: None,
            ..config()
        };
        let mut sim = flat_sim(&config);
        let mut controller = GenerationController::new(config);
        assert_eq!(controller.config().generation_tick_limit, None);

        for car in &sim.population.cars {
            for &handle in std::iter::once(&car.chassis).chain(&car.wheels) {
                sim.physics
                    .body_mut(handle)
                    .unwrap()
                    .set_linvel(rapier2d::prelude::vector![-5.0, 0.0], true);
            }
        }

        match controller.step(&mut sim).unwrap() {
            StepOutcome::GenerationComplete(summary) => {
                assert_eq!(summary.generation, 1);
                assert_eq!(summary.ticks, 1);
            }
            other => panic!("expected a generation transition, got {other:?}"),
        }
        assert_eq!(sim.physics.steps(), 1);
        assert_eq!(controller.phase(), Phase::Running);
    }

    #[test]
    fn one_car_still_moving_keeps_the_generation_running() {
        let config = EvolutionConfig {
            generation_tick_limit: None,
            ..config()
        };
        let mut sim = flat_sim(&config);
        let mut controller = GenerationController::new(config);
        for (i, car) in sim.population.cars.iter().enumerate() {
            let vx = if i == 0 { 5.0 } else { -5.0 };
            for &handle in std::iter::once(&car.chassis).chain(&car.wheels) {
                sim.physics
                    .body_mut(handle)
                    .unwrap()
                    .set_linvel(rapier2d::prelude::vector![vx, 0.0], true);
            }
        }

        assert_eq!(controller.step(&mut sim).unwrap(), StepOutcome::Running);
        assert_eq!(sim.generation(), 0);
    }
}
